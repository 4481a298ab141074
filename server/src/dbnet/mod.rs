/*
 * This file is part of the mpp project.
 * Licensed under the GNU Affero General Public License v3.0 or later.
 */

//! # Reactor pool
//!
//! Each reactor is a dedicated OS thread running a single-threaded
//! (`current_thread`) Tokio runtime — the idiomatic substitute for the
//! original source's `boost::asio::io_context` pool. A shared
//! `AtomicUsize` round-robins accepted connections across reactors
//! with a relaxed fetch-add, no mutex, so fairness (every reactor gets
//! every Nth connection) stays directly observable and testable,
//! rather than resting on Tokio's own work-stealing scheduler.

pub mod connection;
pub mod listener;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::net::TcpStream;
use tokio::runtime::Builder;
use tokio::sync::broadcast;

use crate::engine::NounEngine;

/// A single reactor: one OS thread, one `current_thread` runtime, fed
/// connections through an unbounded channel.
struct Reactor {
    handle: JoinHandle<()>,
    sender: tokio::sync::mpsc::UnboundedSender<TcpStream>,
}

/// N reactors plus the round-robin index used to assign new
/// connections to them.
pub struct ReactorPool {
    reactors: Vec<Reactor>,
    next: AtomicUsize,
}

impl ReactorPool {
    /// Spawn `n` reactor threads. Each one drains its channel of
    /// accepted sockets and runs [`connection::handle`] to completion
    /// for each, until `shutdown` fires.
    pub fn spawn(n: usize, engine: Arc<dyn NounEngine>, shutdown: broadcast::Sender<()>) -> Self {
        assert!(n > 0, "reactor pool size must be at least 1");
        let mut reactors = Vec::with_capacity(n);
        for id in 0..n {
            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<TcpStream>();
            let engine = engine.clone();
            let mut shutdown_rx = shutdown.subscribe();
            let (ready_tx, ready_rx) = std_mpsc::channel::<()>();
            let handle = thread::Builder::new()
                .name(format!("mpp-reactor-{id}"))
                .spawn(move || {
                    let rt = Builder::new_current_thread()
                        .enable_all()
                        .build()
                        .expect("failed to build reactor runtime");
                    let _ = ready_tx.send(());
                    rt.block_on(async move {
                        loop {
                            tokio::select! {
                                biased;
                                _ = shutdown_rx.recv() => break,
                                sock = rx.recv() => {
                                    match sock {
                                        Some(stream) => {
                                            let engine = engine.clone();
                                            tokio::spawn(async move {
                                                if let Err(e) = connection::handle(stream, engine).await {
                                                    log::warn!("connection on reactor {id} ended with error: {e}");
                                                }
                                            });
                                        }
                                        None => break,
                                    }
                                }
                            }
                        }
                    });
                })
                .expect("failed to spawn reactor thread");
            let _ = ready_rx.recv();
            reactors.push(Reactor { handle, sender: tx });
        }
        Self {
            reactors,
            next: AtomicUsize::new(0),
        }
    }

    /// Pick the next reactor in round-robin order.
    fn next_reactor(&self) -> &Reactor {
        let n = self.reactors.len();
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % n;
        &self.reactors[idx]
    }

    /// Hand an accepted socket to the next reactor in line.
    pub fn dispatch(&self, stream: TcpStream) {
        if self.next_reactor().sender.send(stream).is_err() {
            log::warn!("reactor channel closed, dropping accepted connection");
        }
    }

    /// Wait for every reactor thread to finish (after the shutdown
    /// signal has been broadcast).
    pub fn join(self) {
        for reactor in self.reactors {
            drop(reactor.sender);
            if reactor.handle.join().is_err() {
                log::error!("a reactor thread panicked");
            }
        }
    }

    /// Build a pool of `n` reactors without spawning any real runtime
    /// work, so tests can exercise [`next_reactor`](Self::next_reactor)
    /// directly instead of re-deriving its formula.
    #[cfg(test)]
    fn test_pool(n: usize) -> Self {
        let reactors = (0..n)
            .map(|_| {
                let (tx, _rx) = tokio::sync::mpsc::unbounded_channel::<TcpStream>();
                Reactor {
                    handle: thread::spawn(|| {}),
                    sender: tx,
                }
            })
            .collect();
        Self {
            reactors,
            next: AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Property 7: round-robin fairness — N reactors receive exactly
    /// one fetch-add slot each per full cycle, with no skips or
    /// repeats, regardless of how fast callers dispatch.
    #[test]
    fn next_reactor_is_round_robin() {
        let n = 4usize;
        let pool = ReactorPool::test_pool(n);
        let mut seen = vec![0usize; n];
        for _ in 0..(n * 3) {
            let reactor = pool.next_reactor();
            let idx = pool
                .reactors
                .iter()
                .position(|r| std::ptr::eq(r, reactor))
                .expect("reactor must belong to the pool");
            seen[idx] += 1;
        }
        assert!(seen.iter().all(|&c| c == 3));
    }
}
