/*
 * This file is part of the mpp project.
 * Licensed under the GNU Affero General Public License v3.0 or later.
 */

use crate::header::HeaderList;

/// The command field of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    #[default]
    Invalid,
    Issing,
    Fof,
}

impl Command {
    pub fn as_verb_str(&self) -> &'static str {
        match self {
            Command::Issing => "ISSING",
            Command::Fof => "FOF",
            Command::Invalid => "INVALID",
        }
    }
}

/// A fully (or partially, while being built by the parser) parsed
/// request. Created empty by the parser's owning connection, mutated
/// exclusively by the parser during consumption, then handed read-only
/// to the engine.
#[derive(Debug, Clone, Default)]
pub struct Request {
    command: Command,
    headers: HeaderList,
    noun: String,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    pub fn noun(&self) -> &str {
        &self.noun
    }

    pub(crate) fn set_command(&mut self, c: Command) {
        self.command = c;
    }

    pub(crate) fn push_header(&mut self, name: String, value: crate::header::Header) {
        self.headers.push(name, value);
    }

    pub(crate) fn set_noun(&mut self, noun: String) {
        self.noun = noun;
    }

    /// Reset to an empty, invalid request so the owning parser's buffer
    /// can be reused without reallocating.
    pub(crate) fn clear(&mut self) {
        self.command = Command::Invalid;
        self.headers = HeaderList::new();
        self.noun.clear();
    }
}
