/*
 * This file is part of the mpp project.
 * Licensed under the GNU Affero General Public License v3.0 or later.
 */

//! # Wire codec
//!
//! Turns a [`Request`] or [`Reply`] into the bytes spec.md §4.2
//! describes. The source's `toBuffers` produces a list of spans that
//! borrow from the live object; here we take the alternative the
//! design notes explicitly sanction — consume the object into one
//! owned byte buffer at write time — since MPP's headers are few and
//! small, and it sidesteps a self-referential borrow for no real
//! win.

use crate::header::{Header, CONTENT_LENGTH};
use crate::reply::Reply;
use crate::request::{Command, Request};
use crate::version::ProtocolVersion;

const CRLF: &[u8] = b"\r\n";

fn push_header_line(buf: &mut Vec<u8>, name: &str, value: &Header) {
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(b": ");
    match value {
        Header::Int(n) => buf.extend_from_slice(n.to_string().as_bytes()),
        Header::Text(s) => buf.extend_from_slice(s.as_bytes()),
    }
    buf.extend_from_slice(CRLF);
}

/// Encode a client request: `MPP/v.v.v VERB\r\n(header\r\n)*\r\n<noun>`.
///
/// `Content-Length` is always emitted (and, if not already present as a
/// header, computed from `noun`'s byte length), per spec.md's
/// invariant that the noun's byte length equals `Content-Length`.
pub fn encode_request(req: &Request, version: ProtocolVersion) -> Vec<u8> {
    let noun = req.noun().as_bytes();
    let mut buf = Vec::with_capacity(64 + noun.len());
    buf.extend_from_slice(version.to_string().as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(req.command().as_verb_str().as_bytes());
    buf.extend_from_slice(CRLF);
    let mut wrote_length = false;
    for (name, value) in req.headers().iter() {
        if name == CONTENT_LENGTH {
            wrote_length = true;
        }
        push_header_line(&mut buf, name, value);
    }
    if !wrote_length {
        push_header_line(&mut buf, CONTENT_LENGTH, &Header::Int(noun.len() as u64));
    }
    buf.extend_from_slice(CRLF);
    buf.extend_from_slice(noun);
    buf
}

/// Build the request a client sends for a given verb and noun, filling
/// in `Content-Length` and a default `Content-Type`.
pub fn build_request(command: Command, noun: &str) -> Request {
    let mut req = Request::new();
    req.set_command(command);
    req.push_header(
        "Content-Type".to_owned(),
        Header::Text("text/plain;charset=utf-8".to_owned()),
    );
    req.push_header(CONTENT_LENGTH.to_owned(), Header::Int(noun.len() as u64));
    req.set_noun(noun.to_owned());
    req
}

/// Encode a server reply: `MPP/v.v.v CODE REASON\r\n(header\r\n)*\r\n<content>`.
pub fn encode_reply(rep: &Reply, version: ProtocolVersion) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64 + rep.content().len());
    buf.extend_from_slice(version.to_string().as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(format!("{:03}", rep.status().code().max(0)).as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(rep.status().reason().as_bytes());
    buf.extend_from_slice(CRLF);
    for (name, value) in rep.headers().iter() {
        push_header_line(&mut buf, name, value);
    }
    buf.extend_from_slice(CRLF);
    buf.extend_from_slice(rep.content());
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::Status;

    #[test]
    fn encodes_issing_request_with_length() {
        let req = build_request(Command::Issing, "\u{0D05}");
        let bytes = encode_request(&req, ProtocolVersion::CURRENT);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("MPP/2.3.3 ISSING\r\n"));
        assert!(text.contains("Content-Length: 3\r\n"));
        assert!(text.ends_with("\u{0D05}"));
    }

    #[test]
    fn encodes_stock_reply() {
        let rep = Reply::stock(Status::BadMajor);
        let bytes = encode_reply(&rep, ProtocolVersion::CURRENT);
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "MPP/2.3.3 401 Unrecognised Protocol Major Version Number\r\n\
             Content-Type: text/plain\r\n\
             Content-Length: 0\r\n\
             \r\n"
        );
    }
}
