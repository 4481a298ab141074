/*
 * This file is part of the mpp project.
 * Licensed under the GNU Affero General Public License v3.0 or later.
 */

use crate::header::{Header, HeaderList, CONTENT_LENGTH};

/// A reply status code, partitioned into the classes spec.md defines.
/// `Invalid` is the parser/builder default and is never transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Singular,
    Plural,
    PluralForm,
    SingularForm,
    BadRequest,
    BadMajor,
    BadMinor,
    BadPatch,
    UnknownVerb,
    InvalidUtf8,
    NoPlural,
    NoSingular,
    Invalid,
}

impl Status {
    pub const fn code(self) -> i32 {
        match self {
            Status::Singular => 200,
            Status::Plural => 201,
            Status::PluralForm => 202,
            Status::SingularForm => 203,
            Status::BadRequest => 400,
            Status::BadMajor => 401,
            Status::BadMinor => 402,
            Status::BadPatch => 403,
            Status::UnknownVerb => 404,
            Status::InvalidUtf8 => 405,
            Status::NoPlural => 406,
            Status::NoSingular => 407,
            Status::Invalid => -1,
        }
    }

    pub const fn reason(self) -> &'static str {
        match self {
            Status::Singular => "Singular",
            Status::Plural => "Plural",
            Status::PluralForm => "Plural Form",
            Status::SingularForm => "Singular Form",
            Status::BadRequest => "Bad Request",
            Status::BadMajor => "Unrecognised Protocol Major Version Number",
            Status::BadMinor => "Unrecognised Protocol Minor Version Number",
            Status::BadPatch => "Unrecognised Protocol Patch Number",
            Status::UnknownVerb => "Unrecognised Verb",
            Status::InvalidUtf8 => "Malformed UTF-8 Input",
            Status::NoPlural => "No Plural Form",
            Status::NoSingular => "No Singular Form",
            Status::Invalid => "Invalid Reply",
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            200 => Status::Singular,
            201 => Status::Plural,
            202 => Status::PluralForm,
            203 => Status::SingularForm,
            400 => Status::BadRequest,
            401 => Status::BadMajor,
            402 => Status::BadMinor,
            403 => Status::BadPatch,
            404 => Status::UnknownVerb,
            405 => Status::InvalidUtf8,
            406 => Status::NoPlural,
            407 => Status::NoSingular,
            _ => return None,
        })
    }

    pub const fn is_success(self) -> bool {
        self.code() >= 200 && self.code() < 300
    }
}

/// A server response: status, headers, and an opaque content body.
#[derive(Debug, Clone)]
pub struct Reply {
    status: Status,
    headers: HeaderList,
    content: Vec<u8>,
}

impl Default for Reply {
    fn default() -> Self {
        Self {
            status: Status::Invalid,
            headers: HeaderList::new(),
            content: Vec::new(),
        }
    }
}

impl Reply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn add_header(&mut self, name: impl Into<String>, value: Header) {
        self.headers.push(name, value);
    }

    pub fn set_content(&mut self, content: impl Into<Vec<u8>>) {
        self.content = content.into();
    }

    /// Build a minimal reply for a given status: `Content-Type:
    /// text/plain`, `Content-Length: 0`, and empty content — exactly
    /// what the original `Reply::stockReply` produces.
    pub fn stock(status: Status) -> Self {
        let mut r = Self::new();
        r.set_status(status);
        r.add_header("Content-Type", Header::Text("text/plain".to_owned()));
        r.add_header(CONTENT_LENGTH, Header::Int(0));
        r
    }
}
