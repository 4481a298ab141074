/*
 * This file is part of the mpp project.
 * Licensed under the GNU Affero General Public License v3.0 or later.
 */

//! # mpp
//!
//! The MPP (Malayalam Pluralisation Protocol) wire protocol: a UTF-8
//! scanner, request/reply types, a wire codec, and the two restartable
//! parsers that turn bytes arriving in arbitrary chunks into parsed
//! [`Request`]/[`Reply`] values.
//!
//! This crate has no knowledge of sockets, reactors, or the noun
//! engine that answers requests — it is pure protocol plumbing, shared
//! by both the server and the client.

pub mod codec;
pub mod header;
pub mod reply;
pub mod reply_parser;
pub mod request;
pub mod request_parser;
pub mod utf8;
pub mod version;

pub use codec::{build_request, encode_reply, encode_request};
pub use header::{Header, HeaderList, CONTENT_LENGTH};
pub use reply::{Reply, Status};
pub use reply_parser::{FailureCode as ReplyFailureCode, Outcome as ReplyOutcome, ReplyParser};
pub use request::{Command, Request};
pub use request_parser::{
    FailureCode as RequestFailureCode, Outcome as RequestOutcome, RequestParser,
};
pub use version::ProtocolVersion;
