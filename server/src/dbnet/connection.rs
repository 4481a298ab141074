/*
 * This file is part of the mpp project.
 * Licensed under the GNU Affero General Public License v3.0 or later.
 */

//! # Connection
//!
//! One TCP connection, owned outright by the Tokio task spawned for
//! it. There's no `Arc<Connection>` and no reference-counted
//! self-pointer the way the original source needs for its
//! `boost::asio` completion handlers — the task's own future already
//! owns everything it touches for as long as any operation on it is
//! outstanding, which is what that reference counting was simulating.
//!
//! The read loop mirrors the teacher's `read_again`/`read_query` pair:
//! fill a growable [`BytesMut`], try to parse, and only read more if
//! the parser asks for it. The protocol's baseline contract is
//! one-shot — exactly one request/response cycle per connection, then
//! the write half is shut down and the connection is done.

use std::io::{Error as IoError, ErrorKind};
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use mpp::{encode_reply, Reply, RequestFailureCode, RequestOutcome, RequestParser, Status};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::engine::NounEngine;

const INITIAL_BUF_CAP: usize = 8 * 1024;

fn stock_status_for(code: RequestFailureCode) -> Status {
    match code {
        RequestFailureCode::BadReq => Status::BadRequest,
        RequestFailureCode::BadMajor => Status::BadMajor,
        RequestFailureCode::BadMinor => Status::BadMinor,
        RequestFailureCode::BadPatch => Status::BadPatch,
        RequestFailureCode::UnknownVerb => Status::UnknownVerb,
        RequestFailureCode::InvUtf8 => Status::InvalidUtf8,
    }
}

/// Run one connection to completion: read exactly one request, answer
/// it, half-close, and return. Any I/O error at any stage is terminal
/// — there is no retry.
pub async fn handle(mut stream: TcpStream, engine: Arc<dyn NounEngine>) -> Result<(), IoError> {
    let mut buffer = BytesMut::with_capacity(INITIAL_BUF_CAP);
    let mut parser = RequestParser::new();
    let mut req = mpp::Request::new();

    let outcome = loop {
        if !buffer.is_empty() {
            let (outcome, consumed) = parser.consume(&buffer, &mut req);
            buffer.advance(consumed);
            match outcome {
                RequestOutcome::NeedMore => {}
                done_or_malformed => break done_or_malformed,
            }
        }
        match stream.read_buf(&mut buffer).await {
            Ok(0) => {
                if buffer.is_empty() {
                    return Ok(());
                }
                return Err(IoError::from(ErrorKind::ConnectionReset));
            }
            Ok(_) => {}
            Err(e) => return Err(e),
        }
    };

    let reply = match outcome {
        RequestOutcome::Done => engine.handle(&req),
        RequestOutcome::Malformed(code) => Reply::stock(stock_status_for(code)),
        RequestOutcome::NeedMore => unreachable!("loop only exits on Done or Malformed"),
    };

    let bytes = encode_reply(&reply, mpp::ProtocolVersion::CURRENT);
    stream.write_all(&bytes).await?;
    stream.shutdown().await?;
    Ok(())
}
