/*
 * This file is part of the mpp project.
 * Licensed under the GNU Affero General Public License v3.0 or later.
 */

//! # Acceptor
//!
//! Binds the listening socket and round-robins every accepted
//! connection out to the [`ReactorPool`](super::ReactorPool). Runs on
//! the process's bootstrap runtime, not inside any one reactor, the
//! same separation of "who accepts" from "who serves" the teacher's
//! `BaseListener`/`RawListener` split makes.

use std::cell::Cell;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time;

use crate::dbnet::ReactorPool;
use crate::util::error::{Error, MppResult};

/// Backoff for the accept loop: doubles on every failed `accept`,
/// capped, same as the teacher's `NetBackoff`.
struct AcceptBackoff {
    c: Cell<u8>,
}

impl AcceptBackoff {
    const MAX_BACKOFF: u8 = 64;

    const fn new() -> Self {
        Self { c: Cell::new(1) }
    }

    async fn spin(&self) {
        time::sleep(Duration::from_secs(self.c.get() as u64)).await;
        self.c.set(self.c.get().saturating_mul(2));
    }

    fn should_give_up(&self) -> bool {
        self.c.get() > Self::MAX_BACKOFF
    }
}

/// Bind the server's listening socket.
pub async fn bind(host: IpAddr, port: u16) -> MppResult<TcpListener> {
    TcpListener::bind(SocketAddr::new(host, port))
        .await
        .map_err(|e| Error::ioerror_extra(e, format!("binding to port {port}")))
}

/// Accept connections until `shutdown` fires, dispatching each one to
/// the reactor pool.
pub async fn run(
    listener: TcpListener,
    pool: &ReactorPool,
    mut shutdown: broadcast::Receiver<()>,
) {
    let backoff = AcceptBackoff::new();
    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                log::info!("acceptor shutting down");
                return;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _peer)) => pool.dispatch(stream),
                    Err(e) => {
                        log::warn!("accept() failed: {e}");
                        if backoff.should_give_up() {
                            log::error!("accept() failed too many times in a row, giving up");
                            return;
                        }
                        backoff.spin().await;
                    }
                }
            }
        }
    }
}
