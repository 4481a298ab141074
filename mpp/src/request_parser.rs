/*
 * This file is part of the mpp project.
 * Licensed under the GNU Affero General Public License v3.0 or later.
 */

//! # Request parser
//!
//! A restartable, byte-at-a-time Mealy machine. `consume` drives it
//! over a byte range and returns how far it got and why it stopped —
//! a native three-way sum type (`Outcome`) rather than the source's
//! `boost::tribool`. The parser never looks ahead and never blocks; it
//! only ever inspects the one byte it was just handed.

use crate::header::{Header, CONTENT_LENGTH};
use crate::request::{Command, Request};
use crate::utf8;
use crate::version::ProtocolVersion;

/// The safety caps spec.md §4.3 invites implementations to add, since
/// the wire grammar itself places no bound on header count/size.
pub const MAX_HEADERS: usize = 64;
pub const MAX_HEADER_LINE: usize = 4096;
pub const MAX_NOUN_BYTES: u64 = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCode {
    BadReq,
    BadMajor,
    BadMinor,
    BadPatch,
    UnknownVerb,
    InvUtf8,
}

/// The result of driving the parser over a byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The request is fully and validly parsed.
    Done,
    /// The input is malformed; see the carried [`FailureCode`].
    Malformed(FailureCode),
    /// All bytes handed over were consumed; more are needed.
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
    VerbStart,
    IssingS1,
    IssingS2,
    IssingI2,
    IssingN,
    IssingG,
    FofO,
    FofF,
    CrAfterVerb,
    LfAfterVerb,
    HeaderName,
    SpaceAfterName,
    HeaderValue,
    LfAfterHeaderValue,
    LfAfterHeaders,
    Noun,
}

enum Step {
    Progress,
    Done,
    Malformed(FailureCode),
}

/// A restartable request parser. One instance is reused across calls to
/// [`RequestParser::consume`] for the same request; call
/// [`RequestParser::reset`] before reusing it for a different one.
pub struct RequestParser {
    state: State,
    halted: Option<FailureCode>,
    version_digits: String,
    header_name: String,
    header_value: Vec<u8>,
    header_count: usize,
    content_length: u64,
    remaining_noun_bytes: u64,
    noun_buf: Vec<u8>,
    expect_version: ProtocolVersion,
}

impl RequestParser {
    pub fn new() -> Self {
        Self::with_version(ProtocolVersion::CURRENT)
    }

    pub fn with_version(expect_version: ProtocolVersion) -> Self {
        Self {
            state: State::ProtoM,
            halted: None,
            version_digits: String::new(),
            header_name: String::new(),
            header_value: Vec::new(),
            header_count: 0,
            content_length: 0,
            remaining_noun_bytes: 0,
            noun_buf: Vec::new(),
            expect_version,
        }
    }

    /// Return the parser to its freshly-constructed state, discarding
    /// all accumulators. Must be called before reusing the parser for
    /// another request.
    pub fn reset(&mut self) {
        self.state = State::ProtoM;
        self.halted = None;
        self.version_digits.clear();
        self.header_name.clear();
        self.header_value.clear();
        self.header_count = 0;
        self.content_length = 0;
        self.remaining_noun_bytes = 0;
        self.noun_buf.clear();
    }

    /// Combined byte length of the header line currently being
    /// accumulated, checked against [`MAX_HEADER_LINE`] as one budget
    /// covering name and value together.
    fn header_line_len(&self) -> usize {
        self.header_name.len() + self.header_value.len()
    }

    /// The failure code from the most recent `Malformed` outcome, if
    /// any. Retained for the caller to retrieve after the fact.
    pub fn failure(&self) -> Option<FailureCode> {
        self.halted
    }

    /// Drive the parser over `bytes`, mutating `req` as the request
    /// comes together. Returns the outcome and how many bytes of
    /// `bytes` were consumed; on `Done`/`Malformed` the remainder is
    /// unread and belongs to whatever comes next on the connection.
    pub fn consume(&mut self, bytes: &[u8], req: &mut Request) -> (Outcome, usize) {
        if let Some(code) = self.halted {
            return (Outcome::Malformed(code), 0);
        }
        for (i, &b) in bytes.iter().enumerate() {
            match self.step(b, req) {
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

    fn step(&mut self, b: u8, req: &mut Request) -> Step {
        match self.state {
            State::ProtoM => self.literal(b, b'M', State::ProtoP1),
            State::ProtoP1 => self.literal(b, b'P', State::ProtoP2),
            State::ProtoP2 => self.literal(b, b'P', State::Slash),
            State::Slash => self.literal(b, b'/', State::Major),
            State::Major => self.version_component(b, b'.', |p, v| {
                if v != p.expect_version.major {
                    Some(FailureCode::BadMajor)
                } else {
                    None
                }
            }, State::Minor),
            State::Minor => self.version_component(b, b'.', |p, v| {
                if v != p.expect_version.minor {
                    Some(FailureCode::BadMinor)
                } else {
                    None
                }
            }, State::Patch),
            State::Patch => self.version_component(b, b' ', |p, v| {
                if v != p.expect_version.patch {
                    Some(FailureCode::BadPatch)
                } else {
                    None
                }
            }, State::VerbStart),
            State::VerbStart => match b.to_ascii_uppercase() {
                b'I' => {
                    self.state = State::IssingS1;
                    Step::Progress
                }
                b'F' => {
                    self.state = State::FofO;
                    Step::Progress
                }
                _ => Step::Malformed(FailureCode::UnknownVerb),
            },
            State::IssingS1 => self.verb_letter(b, b'S', State::IssingS2),
            State::IssingS2 => self.verb_letter(b, b'S', State::IssingI2),
            State::IssingI2 => self.verb_letter(b, b'I', State::IssingN),
            State::IssingN => self.verb_letter(b, b'N', State::IssingG),
            State::IssingG => {
                if b.to_ascii_uppercase() != b'G' {
                    return Step::Malformed(FailureCode::BadReq);
                }
                req.set_command(Command::Issing);
                self.state = State::CrAfterVerb;
                Step::Progress
            }
            State::FofO => self.verb_letter(b, b'O', State::FofF),
            State::FofF => {
                if b.to_ascii_uppercase() != b'F' {
                    return Step::Malformed(FailureCode::BadReq);
                }
                req.set_command(Command::Fof);
                self.state = State::CrAfterVerb;
                Step::Progress
            }
            State::CrAfterVerb => self.literal(b, b'\r', State::LfAfterVerb),
            State::LfAfterVerb => self.literal(b, b'\n', State::HeaderName),
            State::HeaderName => self.header_name_byte(b),
            State::SpaceAfterName => {
                if !b.is_ascii_whitespace() {
                    return Step::Malformed(FailureCode::BadReq);
                }
                self.state = State::HeaderValue;
                Step::Progress
            }
            State::HeaderValue => self.header_value_byte(b, req),
            State::LfAfterHeaderValue => self.literal(b, b'\n', State::HeaderName),
            State::LfAfterHeaders => {
                if b != b'\n' {
                    return Step::Malformed(FailureCode::BadReq);
                }
                if self.content_length == 0 {
                    req.set_noun(String::new());
                    return Step::Done;
                }
                self.remaining_noun_bytes = self.content_length;
                self.state = State::Noun;
                Step::Progress
            }
            State::Noun => self.noun_byte(b, req),
        }
    }

    fn literal(&mut self, b: u8, expected: u8, next: State) -> Step {
        if b == expected {
            self.state = next;
            Step::Progress
        } else {
            Step::Malformed(FailureCode::BadReq)
        }
    }

    fn verb_letter(&mut self, b: u8, expected: u8, next: State) -> Step {
        if b.to_ascii_uppercase() == expected {
            self.state = next;
            Step::Progress
        } else {
            Step::Malformed(FailureCode::BadReq)
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
                Err(_) => return Step::Malformed(FailureCode::BadReq),
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
            Step::Malformed(FailureCode::BadReq)
        }
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
                Step::Malformed(FailureCode::BadReq)
            }
        } else if b.is_ascii_alphabetic() || b == b'-' {
            if self.header_line_len() >= MAX_HEADER_LINE {
                return Step::Malformed(FailureCode::BadReq);
            }
            self.header_name.push(b as char);
            Step::Progress
        } else {
            Step::Malformed(FailureCode::BadReq)
        }
    }

    fn header_value_byte(&mut self, b: u8, req: &mut Request) -> Step {
        if b == b'\r' {
            if self.header_name == CONTENT_LENGTH {
                let n = std::str::from_utf8(&self.header_value)
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok());
                match n {
                    Some(n) if n <= MAX_NOUN_BYTES => self.content_length = n,
                    _ => return Step::Malformed(FailureCode::BadReq),
                }
                req.push_header(CONTENT_LENGTH.to_owned(), Header::Int(self.content_length));
            } else {
                self.header_count += 1;
                if self.header_count > MAX_HEADERS {
                    return Step::Malformed(FailureCode::BadReq);
                }
                if !utf8::is_valid_utf8(&self.header_value) {
                    return Step::Malformed(FailureCode::BadReq);
                }
                let value = String::from_utf8(std::mem::take(&mut self.header_value)).unwrap();
                req.push_header(std::mem::take(&mut self.header_name), Header::Text(value));
            }
            self.header_name.clear();
            self.header_value.clear();
            self.state = State::LfAfterHeaderValue;
            Step::Progress
        } else {
            if self.header_line_len() >= MAX_HEADER_LINE {
                return Step::Malformed(FailureCode::BadReq);
            }
            self.header_value.push(b);
            Step::Progress
        }
    }

    fn noun_byte(&mut self, b: u8, req: &mut Request) -> Step {
        if self.remaining_noun_bytes == 0 {
            return Step::Malformed(FailureCode::BadReq);
        }
        self.noun_buf.push(b);
        self.remaining_noun_bytes -= 1;
        if self.remaining_noun_bytes > 0 {
            return Step::Progress;
        }
        if !utf8::is_valid_utf8(&self.noun_buf) {
            return Step::Malformed(FailureCode::InvUtf8);
        }
        if !utf8::all_malayalam(&self.noun_buf) {
            return Step::Malformed(FailureCode::BadReq);
        }
        // Safety: just validated as UTF-8 above.
        let noun = String::from_utf8(std::mem::take(&mut self.noun_buf)).unwrap();
        req.set_noun(noun);
        Step::Done
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(bytes: &[u8]) -> (Outcome, Request) {
        let mut parser = RequestParser::new();
        let mut req = Request::new();
        let (outcome, consumed) = parser.consume(bytes, &mut req);
        assert_eq!(consumed.min(bytes.len()), consumed);
        (outcome, req)
    }

    #[test]
    fn happy_issing() {
        let wire = "MPP/2.3.3 ISSING\r\nContent-Type: text/plain\r\nContent-Length: 3\r\n\r\n\u{0D05}";
        let (outcome, req) = parse_all(wire.as_bytes());
        assert_eq!(outcome, Outcome::Done);
        assert_eq!(req.command(), Command::Issing);
        assert_eq!(req.noun(), "\u{0D05}");
    }

    #[test]
    fn bad_major() {
        let wire = "MPP/9.0.0 ISSING\r\nContent-Length: 0\r\n\r\n";
        let (outcome, _) = parse_all(wire.as_bytes());
        assert_eq!(outcome, Outcome::Malformed(FailureCode::BadMajor));
    }

    #[test]
    fn unknown_verb_first_letter() {
        let wire = "MPP/2.3.3 ZOO\r\n\r\n";
        let (outcome, _) = parse_all(wire.as_bytes());
        assert_eq!(outcome, Outcome::Malformed(FailureCode::UnknownVerb));
    }

    #[test]
    fn bad_req_mid_verb() {
        // F-O-O: first letter matches FOF's 'F', second matches 'O',
        // third fails to match the expected 'F'.
        let wire = "MPP/2.3.3 FOO\r\n\r\n";
        let (outcome, _) = parse_all(wire.as_bytes());
        assert_eq!(outcome, Outcome::Malformed(FailureCode::BadReq));
    }

    #[test]
    fn invalid_utf8_in_noun() {
        let mut wire = b"MPP/2.3.3 ISSING\r\nContent-Length: 2\r\n\r\n".to_vec();
        wire.extend_from_slice(&[0xC0, 0x20]);
        let (outcome, _) = parse_all(&wire);
        assert_eq!(outcome, Outcome::Malformed(FailureCode::InvUtf8));
    }

    #[test]
    fn non_malayalam_codepoint() {
        let wire = "MPP/2.3.3 ISSING\r\nContent-Length: 1\r\n\r\nA";
        let (outcome, _) = parse_all(wire.as_bytes());
        assert_eq!(outcome, Outcome::Malformed(FailureCode::BadReq));
    }

    #[test]
    fn chunk_independence() {
        let wire = "MPP/2.3.3 ISSING\r\nContent-Type: text/plain\r\nContent-Length: 6\r\n\r\n\u{0D05}\u{0D35}";
        let bytes = wire.as_bytes();
        let (bulk_outcome, bulk_req) = parse_all(bytes);

        let mut parser = RequestParser::new();
        let mut req = Request::new();
        let mut outcome = Outcome::NeedMore;
        for &b in bytes {
            let (o, consumed) = parser.consume(&[b], &mut req);
            outcome = o;
            assert_eq!(consumed, 1);
            if !matches!(o, Outcome::NeedMore) {
                break;
            }
        }
        assert_eq!(outcome, bulk_outcome);
        assert_eq!(req.noun(), bulk_req.noun());
        assert_eq!(req.command(), bulk_req.command());
    }

    #[test]
    fn reset_behaves_like_fresh_parser() {
        let mut parser = RequestParser::new();
        let mut req = Request::new();
        let wire = b"MPP/9.0.0 ISSING\r\n\r\n";
        let (outcome, _) = parser.consume(wire, &mut req);
        assert_eq!(outcome, Outcome::Malformed(FailureCode::BadMajor));
        parser.reset();
        assert_eq!(parser.failure(), None);

        let mut req2 = Request::new();
        let good = "MPP/2.3.3 ISSING\r\nContent-Length: 3\r\n\r\n\u{0D05}";
        let (outcome2, _) = parser.consume(good.as_bytes(), &mut req2);
        assert_eq!(outcome2, Outcome::Done);
    }

    #[test]
    fn length_conformance() {
        let wire = "MPP/2.3.3 FOF\r\nContent-Length: 9\r\n\r\n\u{0D05}\u{0D35}\u{0D7B}";
        let (outcome, req) = parse_all(wire.as_bytes());
        assert_eq!(outcome, Outcome::Done);
        assert_eq!(req.noun().len(), 9);
    }
}
