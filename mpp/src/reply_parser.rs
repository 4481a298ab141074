/*
 * This file is part of the mpp project.
 * Licensed under the GNU Affero General Public License v3.0 or later.
 */

//! # Reply parser
//!
//! The client-side mirror of [`crate::request_parser::RequestParser`]:
//! same shape (byte-at-a-time Mealy machine, three-way `Outcome`), but
//! parsing a status line instead of a verb line, and a length-bounded
//! content phase instead of a noun phase. The numeric status code is
//! authoritative; the `<reason>` phrase is carried through unparsed.
//!
//! The original source left `RepParser::consume` mostly stubbed past
//! its first state; this is a complete implementation, inferred from
//! the symmetric request parser and the reply encoder.

use crate::header::{Header, CONTENT_LENGTH};
use crate::reply::{Reply, Status};
use crate::utf8;
use crate::version::ProtocolVersion;

pub const MAX_HEADERS: usize = 64;
pub const MAX_HEADER_LINE: usize = 4096;
pub const MAX_CONTENT_BYTES: u64 = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCode {
    BadReply,
    BadMajor,
    BadMinor,
    BadPatch,
    UnknownStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Malformed(FailureCode),
    NeedMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ProtoM,
    ProtoP1,
    ProtoP2,
    Slash,
    Major,
    Minor,
    Patch,
    CodeDigit1,
    CodeDigit2,
    CodeDigit3,
    SpaceAfterCode,
    Reason,
    LfAfterStatus,
    HeaderName,
    SpaceAfterName,
    HeaderValue,
    LfAfterHeaderValue,
    LfAfterHeaders,
    Content,
}

enum Step {
    Progress,
    Done,
    Malformed(FailureCode),
}

pub struct ReplyParser {
    state: State,
    halted: Option<FailureCode>,
    version_digits: String,
    code_digits: String,
    reason: Vec<u8>,
    header_name: String,
    header_value: Vec<u8>,
    header_count: usize,
    content_length: u64,
    remaining_content_bytes: u64,
    content_buf: Vec<u8>,
    expect_version: ProtocolVersion,
}

impl ReplyParser {
    pub fn new() -> Self {
        Self::with_version(ProtocolVersion::CURRENT)
    }

    pub fn with_version(expect_version: ProtocolVersion) -> Self {
        Self {
            state: State::ProtoM,
            halted: None,
            version_digits: String::new(),
            code_digits: String::new(),
            reason: Vec::new(),
            header_name: String::new(),
            header_value: Vec::new(),
            header_count: 0,
            content_length: 0,
            remaining_content_bytes: 0,
            content_buf: Vec::new(),
            expect_version,
        }
    }

    pub fn reset(&mut self) {
        self.state = State::ProtoM;
        self.halted = None;
        self.version_digits.clear();
        self.code_digits.clear();
        self.reason.clear();
        self.header_name.clear();
        self.header_value.clear();
        self.header_count = 0;
        self.content_length = 0;
        self.remaining_content_bytes = 0;
        self.content_buf.clear();
    }

    pub fn failure(&self) -> Option<FailureCode> {
        self.halted
    }

    /// Combined byte length of the header line currently being
    /// accumulated, checked against [`MAX_HEADER_LINE`] as one budget
    /// covering name and value together.
    fn header_line_len(&self) -> usize {
        self.header_name.len() + self.header_value.len()
    }

    pub fn consume(&mut self, bytes: &[u8], rep: &mut Reply) -> (Outcome, usize) {
        if let Some(code) = self.halted {
            return (Outcome::Malformed(code), 0);
        }
        for (i, &b) in bytes.iter().enumerate() {
            match self.step(b, rep) {
                Step::Progress => continue,
                Step::Done => return (Outcome::Done, i + 1),
                Step::Malformed(code) => {
                    self.halted = Some(code);
                    return (Outcome::Malformed(code), i + 1);
                }
            }
        }
        (Outcome::NeedMore, bytes.len())
    }

    fn step(&mut self, b: u8, rep: &mut Reply) -> Step {
        match self.state {
            State::ProtoM => self.literal(b, b'M', State::ProtoP1),
            State::ProtoP1 => self.literal(b, b'P', State::ProtoP2),
            State::ProtoP2 => self.literal(b, b'P', State::Slash),
            State::Slash => self.literal(b, b'/', State::Major),
            State::Major => self.version_component(
                b,
                b'.',
                |p, v| (v != p.expect_version.major).then_some(FailureCode::BadMajor),
                State::Minor,
            ),
            State::Minor => self.version_component(
                b,
                b'.',
                |p, v| (v != p.expect_version.minor).then_some(FailureCode::BadMinor),
                State::Patch,
            ),
            State::Patch => self.version_component(
                b,
                b' ',
                |p, v| (v != p.expect_version.patch).then_some(FailureCode::BadPatch),
                State::CodeDigit1,
            ),
            State::CodeDigit1 => self.code_digit(b, State::CodeDigit2),
            State::CodeDigit2 => self.code_digit(b, State::CodeDigit3),
            State::CodeDigit3 => {
                if !b.is_ascii_digit() {
                    return Step::Malformed(FailureCode::BadReply);
                }
                self.code_digits.push(b as char);
                let code: i32 = match self.code_digits.parse() {
                    Ok(c) => c,
                    Err(_) => return Step::Malformed(FailureCode::BadReply),
                };
                let status = match Status::from_code(code) {
                    Some(s) => s,
                    None => return Step::Malformed(FailureCode::UnknownStatus),
                };
                rep.set_status(status);
                self.code_digits.clear();
                self.state = State::SpaceAfterCode;
                Step::Progress
            }
            State::SpaceAfterCode => {
                if !b.is_ascii_whitespace() {
                    return Step::Malformed(FailureCode::BadReply);
                }
                self.state = State::Reason;
                Step::Progress
            }
            State::Reason => {
                if b == b'\r' {
                    self.reason.clear();
                    self.state = State::LfAfterStatus;
                    Step::Progress
                } else {
                    self.reason.push(b);
                    Step::Progress
                }
            }
            State::LfAfterStatus => self.literal(b, b'\n', State::HeaderName),
            State::HeaderName => self.header_name_byte(b),
            State::SpaceAfterName => {
                if !b.is_ascii_whitespace() {
                    return Step::Malformed(FailureCode::BadReply);
                }
                self.state = State::HeaderValue;
                Step::Progress
            }
            State::HeaderValue => self.header_value_byte(b, rep),
            State::LfAfterHeaderValue => self.literal(b, b'\n', State::HeaderName),
            State::LfAfterHeaders => {
                if b != b'\n' {
                    return Step::Malformed(FailureCode::BadReply);
                }
                if self.content_length == 0 {
                    rep.set_content(Vec::new());
                    return Step::Done;
                }
                self.remaining_content_bytes = self.content_length;
                self.state = State::Content;
                Step::Progress
            }
            State::Content => {
                self.content_buf.push(b);
                self.remaining_content_bytes -= 1;
                if self.remaining_content_bytes == 0 {
                    rep.set_content(std::mem::take(&mut self.content_buf));
                    Step::Done
                } else {
                    Step::Progress
                }
            }
        }
    }

    fn literal(&mut self, b: u8, expected: u8, next: State) -> Step {
        if b == expected {
            self.state = next;
            Step::Progress
        } else {
            Step::Malformed(FailureCode::BadReply)
        }
    }

    fn version_component(
        &mut self,
        b: u8,
        terminator: u8,
        check: impl Fn(&Self, u32) -> Option<FailureCode>,
        next: State,
    ) -> Step {
        if b == terminator {
            let value: u32 = match self.version_digits.parse() {
                Ok(v) => v,
                Err(_) => return Step::Malformed(FailureCode::BadReply),
            };
            self.version_digits.clear();
            if let Some(code) = check(self, value) {
                return Step::Malformed(code);
            }
            self.state = next;
            Step::Progress
        } else if b.is_ascii_digit() {
            self.version_digits.push(b as char);
            Step::Progress
        } else {
            Step::Malformed(FailureCode::BadReply)
        }
    }

    fn code_digit(&mut self, b: u8, next: State) -> Step {
        if !b.is_ascii_digit() {
            return Step::Malformed(FailureCode::BadReply);
        }
        self.code_digits.push(b as char);
        self.state = next;
        Step::Progress
    }

    fn header_name_byte(&mut self, b: u8) -> Step {
        if b == b':' {
            self.state = State::SpaceAfterName;
            Step::Progress
        } else if b == b'\r' {
            if self.header_name.is_empty() {
                self.state = State::LfAfterHeaders;
                Step::Progress
            } else {
                Step::Malformed(FailureCode::BadReply)
            }
        } else if b.is_ascii_alphabetic() || b == b'-' {
            if self.header_line_len() >= MAX_HEADER_LINE {
                return Step::Malformed(FailureCode::BadReply);
            }
            self.header_name.push(b as char);
            Step::Progress
        } else {
            Step::Malformed(FailureCode::BadReply)
        }
    }

    fn header_value_byte(&mut self, b: u8, rep: &mut Reply) -> Step {
        if b == b'\r' {
            if self.header_name == CONTENT_LENGTH {
                let n = std::str::from_utf8(&self.header_value)
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok());
                match n {
                    Some(n) if n <= MAX_CONTENT_BYTES => self.content_length = n,
                    _ => return Step::Malformed(FailureCode::BadReply),
                }
                rep.add_header(CONTENT_LENGTH.to_owned(), Header::Int(self.content_length));
            } else {
                self.header_count += 1;
                if self.header_count > MAX_HEADERS {
                    return Step::Malformed(FailureCode::BadReply);
                }
                if !utf8::is_valid_utf8(&self.header_value) {
                    return Step::Malformed(FailureCode::BadReply);
                }
                let value = String::from_utf8(std::mem::take(&mut self.header_value)).unwrap();
                rep.add_header(std::mem::take(&mut self.header_name), Header::Text(value));
            }
            self.header_name.clear();
            self.header_value.clear();
            self.state = State::LfAfterHeaderValue;
            Step::Progress
        } else {
            if self.header_line_len() >= MAX_HEADER_LINE {
                return Step::Malformed(FailureCode::BadReply);
            }
            self.header_value.push(b);
            Step::Progress
        }
    }
}

impl Default for ReplyParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(bytes: &[u8]) -> (Outcome, Reply) {
        let mut parser = ReplyParser::new();
        let mut rep = Reply::new();
        let (outcome, _) = parser.consume(bytes, &mut rep);
        (outcome, rep)
    }

    #[test]
    fn parses_stock_bad_major_reply() {
        let wire = "MPP/2.3.3 401 Unrecognised Protocol Major Version Number\r\n\
                     Content-Type: text/plain\r\nContent-Length: 0\r\n\r\n";
        let (outcome, rep) = parse_all(wire.as_bytes());
        assert_eq!(outcome, Outcome::Done);
        assert_eq!(rep.status(), Status::BadMajor);
        assert!(rep.content().is_empty());
    }

    #[test]
    fn parses_reply_with_content() {
        let wire = "MPP/2.3.3 201 Plural\r\nContent-Length: 3\r\n\r\n\u{0D05}\u{0D35}";
        let (outcome, rep) = parse_all(wire.as_bytes());
        assert_eq!(outcome, Outcome::Done);
        assert_eq!(rep.status(), Status::Plural);
        assert_eq!(rep.content().len(), 3);
    }

    #[test]
    fn unknown_status_code_is_malformed() {
        let wire = "MPP/2.3.3 999 Teapot\r\n\r\n";
        let (outcome, _) = parse_all(wire.as_bytes());
        assert_eq!(outcome, Outcome::Malformed(FailureCode::UnknownStatus));
    }

    #[test]
    fn chunk_independence() {
        let wire = "MPP/2.3.3 200 Singular\r\nContent-Length: 0\r\n\r\n";
        let bytes = wire.as_bytes();
        let (bulk_outcome, bulk_rep) = parse_all(bytes);

        let mut parser = ReplyParser::new();
        let mut rep = Reply::new();
        let mut outcome = Outcome::NeedMore;
        for &b in bytes {
            let (o, _) = parser.consume(&[b], &mut rep);
            outcome = o;
            if !matches!(o, Outcome::NeedMore) {
                break;
            }
        }
        assert_eq!(outcome, bulk_outcome);
        assert_eq!(rep.status(), bulk_rep.status());
    }

    #[test]
    fn reset_then_reuse() {
        let mut parser = ReplyParser::new();
        let mut rep = Reply::new();
        let bad = b"MPP/9.0.0 200 Singular\r\n\r\n";
        let (outcome, _) = parser.consume(bad, &mut rep);
        assert_eq!(outcome, Outcome::Malformed(FailureCode::BadMajor));
        parser.reset();
        let mut rep2 = Reply::new();
        let good = b"MPP/2.3.3 200 Singular\r\nContent-Length: 0\r\n\r\n";
        let (outcome2, _) = parser.consume(good, &mut rep2);
        assert_eq!(outcome2, Outcome::Done);
    }
}
