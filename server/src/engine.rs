/*
 * This file is part of the mpp project.
 * Licensed under the GNU Affero General Public License v3.0 or later.
 */

//! # Noun engine
//!
//! `NounEngine` is the collaborator that actually answers a parsed
//! [`Request`](mpp::Request) with a [`Reply`](mpp::Reply). The real
//! rule set that decides singular/plural forms for Malayalam nouns —
//! and any persistence behind it — is out of scope here; what's needed
//! is a stable seam a future engine can be dropped behind.
//!
//! [`TableNounEngine`] is the reference implementation: a fixed
//! in-memory lookup table, seeded with a handful of nouns, with no
//! schema and no migrations.

use mpp::{Command, Header, Reply, Request, Status, CONTENT_LENGTH};

/// Answers requests. Implementations must be usable from every reactor
/// concurrently, hence `Send + Sync`.
pub trait NounEngine: Send + Sync {
    fn handle(&self, req: &Request) -> Reply;
}

struct NounPair {
    singular: &'static str,
    plural: &'static str,
}

const TABLE: &[NounPair] = &[
    NounPair { singular: "\u{0D15}\u{0D41}\u{0D1F}\u{0D4D}\u{0D1F}\u{0D3F}", plural: "\u{0D15}\u{0D41}\u{0D1F}\u{0D4D}\u{0D1F}\u{0D3F}\u{0D15}\u{0D33}\u{0D4D}" },
    NounPair { singular: "\u{0D2A}\u{0D41}\u{0D38}\u{0D4D}\u{0D24}\u{0D15}\u{0D02}", plural: "\u{0D2A}\u{0D41}\u{0D38}\u{0D4D}\u{0D24}\u{0D15}\u{0D19}\u{0D4D}\u{0D19}\u{0D33}\u{0D4D}" },
    NounPair { singular: "\u{0D2E}\u{0D30}\u{0D02}", plural: "\u{0D2E}\u{0D30}\u{0D19}\u{0D4D}\u{0D19}\u{0D33}\u{0D4D}" },
];

/// An in-memory, fixed singular/plural lookup table.
pub struct TableNounEngine {
    rows: Vec<NounPair>,
}

impl TableNounEngine {
    pub fn new() -> Self {
        Self {
            rows: TABLE
                .iter()
                .map(|p| NounPair {
                    singular: p.singular,
                    plural: p.plural,
                })
                .collect(),
        }
    }

    fn find_by_singular(&self, noun: &str) -> Option<&NounPair> {
        self.rows.iter().find(|p| p.singular == noun)
    }

    fn find_by_plural(&self, noun: &str) -> Option<&NounPair> {
        self.rows.iter().find(|p| p.plural == noun)
    }
}

impl Default for TableNounEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn reply_with_content(status: Status, content: &str) -> Reply {
    let mut rep = Reply::new();
    rep.set_status(status);
    rep.add_header("Content-Type", Header::Text("text/plain;charset=utf-8".to_owned()));
    rep.add_header(CONTENT_LENGTH, Header::Int(content.len() as u64));
    rep.set_content(content.as_bytes().to_vec());
    rep
}

impl NounEngine for TableNounEngine {
    fn handle(&self, req: &Request) -> Reply {
        match req.command() {
            Command::Issing => match self.find_by_singular(req.noun()) {
                Some(_) => Reply::stock(Status::Singular),
                None => match self.find_by_plural(req.noun()) {
                    Some(pair) => reply_with_content(Status::PluralForm, pair.singular),
                    None => Reply::stock(Status::NoSingular),
                },
            },
            Command::Fof => match self.find_by_plural(req.noun()) {
                Some(_) => Reply::stock(Status::Plural),
                None => match self.find_by_singular(req.noun()) {
                    Some(pair) => reply_with_content(Status::SingularForm, pair.plural),
                    None => Reply::stock(Status::NoPlural),
                },
            },
            Command::Invalid => Reply::stock(Status::BadRequest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpp::build_request;

    #[test]
    fn issing_known_singular() {
        let engine = TableNounEngine::new();
        let req = build_request(Command::Issing, "\u{0D2E}\u{0D30}\u{0D02}");
        assert_eq!(engine.handle(&req).status(), Status::Singular);
    }

    #[test]
    fn issing_known_plural_returns_singular_form() {
        let engine = TableNounEngine::new();
        let req = build_request(Command::Issing, "\u{0D2E}\u{0D30}\u{0D19}\u{0D4D}\u{0D19}\u{0D33}\u{0D4D}");
        let rep = engine.handle(&req);
        assert_eq!(rep.status(), Status::PluralForm);
        assert_eq!(rep.content(), "\u{0D2E}\u{0D30}\u{0D02}".as_bytes());
    }

    #[test]
    fn fof_unknown_noun() {
        let engine = TableNounEngine::new();
        let req = build_request(Command::Fof, "\u{0D05}\u{0D05}\u{0D05}");
        assert_eq!(engine.handle(&req).status(), Status::NoPlural);
    }

    #[test]
    fn invalid_command_is_bad_request() {
        let engine = TableNounEngine::new();
        let req = Request::new();
        assert_eq!(engine.handle(&req).status(), Status::BadRequest);
    }
}
