/*
 * This file is part of the mpp project.
 * Licensed under the GNU Affero General Public License v3.0 or later.
 */

//! # mpp-client
//!
//! An interactive client: prompt for a Malayalam noun, pick a verb
//! (`ISSING` or `FOF`), send the request, print the parsed reply,
//! loop until the user types `quit`/`exit` (case-insensitive) or
//! sends EOF. Mirrors the prompt/validate/send loop of the original
//! `Client`, minus its always-`ISSING` restriction — both verbs are
//! reachable here since the reply parser understands either.

use std::io::{self, BufRead, Write};
use std::net::IpAddr;
use std::process;

use mpp::{build_request, encode_request, Command, ProtocolVersion, ReplyOutcome, ReplyParser};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const DEFAULT_ADDRESS: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 50001;

struct ClientArgs {
    address: IpAddr,
    port: u16,
}

impl Default for ClientArgs {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.parse().unwrap(),
            port: DEFAULT_PORT,
        }
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> ClientArgs {
    let mut out = ClientArgs::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--address" | "-a" => {
                if let Some(v) = it.next() {
                    match v.parse() {
                        Ok(addr) => out.address = addr,
                        Err(_) => {
                            eprintln!("mpp-client: invalid address '{v}'");
                            process::exit(2);
                        }
                    }
                }
            }
            "--port" | "-p" => {
                if let Some(v) = it.next() {
                    match v.parse() {
                        Ok(port) => out.port = port,
                        Err(_) => {
                            eprintln!("mpp-client: invalid port '{v}'");
                            process::exit(2);
                        }
                    }
                }
            }
            other => {
                eprintln!("mpp-client: unknown option '{other}'");
                process::exit(3);
            }
        }
    }
    out
}

fn should_quit(input: &str) -> bool {
    let lowered = input.trim().to_ascii_lowercase();
    lowered == "quit" || lowered == "exit"
}

fn prompt_noun(stdin: &mut impl BufRead) -> io::Result<Option<String>> {
    print!(
        "Please enter a Malayalam noun to send to the server in ISSING and FOF queries.\n\
         You may also type \"quit\" or \"exit\" (case-insensitive) to exit the client\n\
         mpp-client-{}> ",
        ProtocolVersion::CURRENT
    );
    io::stdout().flush()?;
    let mut line = String::new();
    if stdin.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
}

fn prompt_verb(stdin: &mut impl BufRead) -> io::Result<Command> {
    print!("Verb to send [issing/fof, default issing]> ");
    io::stdout().flush()?;
    let mut line = String::new();
    stdin.read_line(&mut line)?;
    Ok(match line.trim().to_ascii_lowercase().as_str() {
        "fof" => Command::Fof,
        _ => Command::Issing,
    })
}

async fn send_request(address: IpAddr, port: u16, command: Command, noun: &str) -> io::Result<()> {
    let req = build_request(command, noun);
    let bytes = encode_request(&req, ProtocolVersion::CURRENT);

    let mut stream = TcpStream::connect((address, port)).await?;
    stream.write_all(&bytes).await?;
    stream.flush().await?;

    let mut parser = ReplyParser::new();
    let mut rep = mpp::Reply::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            println!("server closed the connection before a full reply arrived");
            return Ok(());
        }
        let (outcome, _) = parser.consume(&buf[..n], &mut rep);
        match outcome {
            ReplyOutcome::Done => break,
            ReplyOutcome::NeedMore => continue,
            ReplyOutcome::Malformed(code) => {
                println!("received a malformed reply: {code:?}");
                return Ok(());
            }
        }
    }

    println!("{} {}", rep.status().code(), rep.status().reason());
    if !rep.content().is_empty() {
        match std::str::from_utf8(rep.content()) {
            Ok(text) => println!("{text}"),
            Err(_) => println!("<{} bytes of non-UTF-8 content>", rep.content().len()),
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::new()
        .parse_filters(&std::env::var("MPP_LOG").unwrap_or_else(|_| "warn".to_owned()))
        .init();

    let args = parse_args(std::env::args().skip(1));
    let stdin = io::stdin();
    let mut reader = stdin.lock();

    loop {
        let input = match prompt_noun(&mut reader) {
            Ok(Some(input)) => input,
            Ok(None) => {
                println!();
                break;
            }
            Err(e) => {
                eprintln!("mpp-client: failed to read input: {e}");
                break;
            }
        };

        if should_quit(&input) {
            println!("Exiting...");
            break;
        }
        if input.is_empty() {
            continue;
        }
        if !mpp::utf8::is_valid_utf8(input.as_bytes()) {
            eprintln!("Your input contains invalid UTF-8!");
            continue;
        }
        if !mpp::utf8::all_malayalam(input.as_bytes()) {
            eprintln!("You input contains code-points that are outside the Malayalam range!");
            continue;
        }

        let command = match prompt_verb(&mut reader) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("mpp-client: failed to read input: {e}");
                break;
            }
        };

        if let Err(e) = send_request(args.address, args.port, command, &input).await {
            eprintln!("mpp-client: request failed: {e}");
        }
    }
}
