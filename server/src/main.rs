/*
 * This file is part of the mpp project.
 * Licensed under the GNU Affero General Public License v3.0 or later.
 */

//! # mppd
//!
//! The MPP server: binds a TCP listener, round-robins accepted
//! connections across a pool of single-threaded reactors, and answers
//! each parsed request with whatever the configured [`NounEngine`]
//! returns.

mod config;
mod dbnet;
mod engine;
mod util;

use std::env;
use std::process;
use std::sync::Arc;

use env_logger::Builder;
use tokio::sync::broadcast;

use config::{parse_cli, CliError, ConfigSource, LayeredConfig};
use dbnet::{listener, ReactorPool};
use engine::{NounEngine, TableNounEngine};

#[cfg(all(not(target_env = "msvc"), not(miri)))]
use jemallocator::Jemalloc;

#[cfg(all(not(target_env = "msvc"), not(miri)))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() {
    Builder::new()
        .parse_filters(&env::var("MPP_LOG").unwrap_or_else(|_| "info".to_owned()))
        .init();

    let cli = match parse_cli(env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e @ CliError::Help) => {
            println!("{}", e.message());
            process::exit(e.exit_code());
        }
        Err(e) => {
            eprintln!("mppd: {}", e.message());
            process::exit(e.exit_code());
        }
    };

    let config = LayeredConfig::new(cli);
    match config.load_db_info() {
        Ok(Some(info)) => log::info!("loaded DB config info for user '{}'", info.user),
        Ok(None) => {}
        Err(e) => {
            log::error!("{e}");
            process::exit(1);
        }
    }

    let threads = config.threads();
    let address = config.address();
    let port = config.port();

    let engine: Arc<dyn NounEngine> = Arc::new(TableNounEngine::new());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build bootstrap runtime");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let pool = ReactorPool::spawn(threads, engine, shutdown_tx.clone());

    log::info!("mppd listening on {address}:{port} with {threads} reactors");

    runtime.block_on(async {
        let tcp_listener = match listener::bind(address, port).await {
            Ok(l) => l,
            Err(e) => {
                log::error!("{e}");
                process::exit(1);
            }
        };
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to bind to SIGTERM");
            let mut sigquit = signal(SignalKind::quit()).expect("failed to bind to SIGQUIT");
            tokio::select! {
                _ = listener::run(tcp_listener, &pool, shutdown_tx.subscribe()) => {}
                _ = tokio::signal::ctrl_c() => {
                    log::info!("received SIGINT, shutting down");
                }
                _ = sigterm.recv() => {
                    log::info!("received SIGTERM, shutting down");
                }
                _ = sigquit.recv() => {
                    log::info!("received SIGQUIT, shutting down");
                }
            }
        }
        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = listener::run(tcp_listener, &pool, shutdown_tx.subscribe()) => {}
                _ = tokio::signal::ctrl_c() => {
                    log::info!("received interrupt, shutting down");
                }
            }
        }
        let _ = shutdown_tx.send(());
    });

    drop(runtime);
    pool.join();
    log::info!("mppd stopped");
}
