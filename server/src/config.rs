/*
 * This file is part of the mpp project.
 * Licensed under the GNU Affero General Public License v3.0 or later.
 */

//! # Configuration
//!
//! Two layers feed the running server: command-line flags (parsed by
//! hand, see [`parse_cli`]) and a `key=value` config file read by
//! [`LayeredConfig`]. Neither layer is the real deal — the config file
//! just gates the presence of `user`/`password`/`host`/`db`, the same
//! four keys the original `DBInfo` loader required, without actually
//! opening a database with them.

use std::collections::HashMap;
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use crate::util::error::Error;

pub const DEFAULT_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));
pub const DEFAULT_PORT: u16 = 50001;
pub const DEFAULT_THREADS: usize = 5;

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub address: IpAddr,
    pub port: u16,
    pub threads: usize,
    pub db_config_file_path: Option<PathBuf>,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            port: DEFAULT_PORT,
            threads: DEFAULT_THREADS,
            db_config_file_path: None,
        }
    }
}

/// Mirrors `boost::program_options`' exception-to-exit-code mapping
/// from the original `main.cpp`: `0` normal, `1` help requested, `2`
/// invalid option value, `3` unknown option, `4` ambiguous option.
#[derive(Debug, PartialEq, Eq)]
pub enum CliError {
    Help,
    InvalidValue(String),
    UnknownOption(String),
    AmbiguousOption(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Help => 1,
            CliError::InvalidValue(_) => 2,
            CliError::UnknownOption(_) => 3,
            CliError::AmbiguousOption(_) => 4,
        }
    }

    pub fn message(&self) -> String {
        match self {
            CliError::Help => usage(),
            CliError::InvalidValue(v) => format!("invalid value given for option: {v}"),
            CliError::UnknownOption(o) => format!("received unknown option: {o}"),
            CliError::AmbiguousOption(o) => format!("ambiguous option argument: {o}"),
        }
    }
}

pub fn usage() -> String {
    "Usage: mppd [options]\n\n\
     Options:\n\
     \x20\x20-h, --help                      Print this help message\n\
     \x20\x20-p, --port <PORT>               Set the port to listen on (default: 50001)\n\
     \x20\x20-t, --threads <N>               Set the number of reactor threads to use (default: 5)\n\
     \x20\x20-a, --address <ADDR>            Set the address the server will run on (default: 127.0.0.1)\n\
     \x20\x20-d, --dbconfigfilepath <PATH>   Path to the file containing DB config info"
        .to_owned()
}

struct Flag {
    long: &'static str,
    short: Option<char>,
    takes_value: bool,
}

const FLAGS: &[Flag] = &[
    Flag { long: "help", short: Some('h'), takes_value: false },
    Flag { long: "port", short: Some('p'), takes_value: true },
    Flag { long: "threads", short: Some('t'), takes_value: true },
    Flag { long: "address", short: Some('a'), takes_value: true },
    Flag { long: "dbconfigfilepath", short: Some('d'), takes_value: true },
];

/// Resolve a long option by unambiguous-prefix matching, the way
/// `boost::program_options` does: `--addr` matches `--address` as long
/// as no other flag shares that prefix.
fn resolve_long(name: &str) -> Result<&'static Flag, CliError> {
    let matches: Vec<&Flag> = FLAGS.iter().filter(|f| f.long.starts_with(name)).collect();
    match matches.as_slice() {
        [] => Err(CliError::UnknownOption(format!("--{name}"))),
        [one] => Ok(one),
        _ => Err(CliError::AmbiguousOption(format!("--{name}"))),
    }
}

fn resolve_short(c: char) -> Result<&'static Flag, CliError> {
    FLAGS
        .iter()
        .find(|f| f.short == Some(c))
        .ok_or_else(|| CliError::UnknownOption(format!("-{c}")))
}

/// Parse `args` (e.g. from `std::env::args().skip(1)`) into [`CliArgs`].
pub fn parse_cli<I: IntoIterator<Item = String>>(args: I) -> Result<CliArgs, CliError> {
    let mut out = CliArgs::default();
    let mut it = args.into_iter().peekable();
    while let Some(arg) = it.next() {
        let (flag, inline_value) = if let Some(rest) = arg.strip_prefix("--") {
            match rest.split_once('=') {
                Some((name, value)) => (resolve_long(name)?, Some(value.to_owned())),
                None => (resolve_long(rest)?, None),
            }
        } else if let Some(rest) = arg.strip_prefix('-') {
            let mut chars = rest.chars();
            let c = chars
                .next()
                .ok_or_else(|| CliError::UnknownOption(arg.clone()))?;
            let flag = resolve_short(c)?;
            let remainder: String = chars.collect();
            (flag, (!remainder.is_empty()).then_some(remainder))
        } else {
            return Err(CliError::UnknownOption(arg));
        };

        if flag.long == "help" {
            return Err(CliError::Help);
        }

        let value = if flag.takes_value {
            match inline_value {
                Some(v) => v,
                None => it
                    .next()
                    .ok_or_else(|| CliError::InvalidValue(format!("--{}", flag.long)))?,
            }
        } else {
            continue;
        };

        match flag.long {
            "port" => {
                out.port = value
                    .parse()
                    .map_err(|_| CliError::InvalidValue(format!("--port={value}")))?;
            }
            "threads" => {
                out.threads = value
                    .parse()
                    .map_err(|_| CliError::InvalidValue(format!("--threads={value}")))?;
                if out.threads == 0 {
                    return Err(CliError::InvalidValue(format!("--threads={value}")));
                }
            }
            "address" => {
                out.address = value
                    .parse()
                    .map_err(|_| CliError::InvalidValue(format!("--address={value}")))?;
            }
            "dbconfigfilepath" => {
                out.db_config_file_path = Some(PathBuf::from(value));
            }
            _ => unreachable!(),
        }
    }
    Ok(out)
}

/// The four keys a DB config file must carry, mirroring the original
/// `DBInfo` loader's required-key check.
#[derive(Debug, Clone)]
pub struct DbInfo {
    pub user: String,
    pub password: String,
    pub host: String,
    pub db: String,
}

/// Merges defaults, a `key=value` config file, and CLI flags (in
/// increasing precedence) the way the teacher's `Configset` layers
/// file-then-CLI-then-env, minus the fields with no counterpart here.
pub trait ConfigSource {
    fn address(&self) -> IpAddr;
    fn port(&self) -> u16;
    fn threads(&self) -> usize;
}

pub struct LayeredConfig {
    cli: CliArgs,
}

impl LayeredConfig {
    pub fn new(cli: CliArgs) -> Self {
        Self { cli }
    }

    /// Load and validate the DB config file, if one was given. A
    /// missing key is fatal, exactly as the original `DBInfo`
    /// constructor treats it.
    pub fn load_db_info(&self) -> Result<Option<DbInfo>, Error> {
        let Some(path) = self.cli.db_config_file_path.as_deref() else {
            return Ok(None);
        };
        Ok(Some(parse_db_info(path)?))
    }
}

impl ConfigSource for LayeredConfig {
    fn address(&self) -> IpAddr {
        self.cli.address
    }

    fn port(&self) -> u16 {
        self.cli.port
    }

    fn threads(&self) -> usize {
        self.cli.threads
    }
}

fn parse_db_info(path: &Path) -> Result<DbInfo, Error> {
    let contents = fs::read_to_string(path)
        .map_err(|e| Error::ioerror_extra(e, format!("reading DB config file {}", path.display())))?;
    let mut map: HashMap<String, String> = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            map.insert(k.trim().to_owned(), v.trim().to_owned());
        }
    }
    let get = |key: &str| -> Result<String, Error> {
        map.get(key).cloned().ok_or_else(|| {
            Error::config(format!(
                "the configuration file {} doesn't contain the required key '{key}'",
                path.display()
            ))
        })
    };
    Ok(DbInfo {
        user: get("user")?,
        password: get("password")?,
        host: get("host")?,
        db: get("db")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_when_no_args() {
        let cli = parse_cli(args(&[])).unwrap();
        assert_eq!(cli.address, DEFAULT_ADDRESS);
        assert_eq!(cli.port, DEFAULT_PORT);
        assert_eq!(cli.threads, DEFAULT_THREADS);
    }

    #[test]
    fn long_flags_with_equals() {
        let cli = parse_cli(args(&["--port=9000", "--threads=8"])).unwrap();
        assert_eq!(cli.port, 9000);
        assert_eq!(cli.threads, 8);
    }

    #[test]
    fn short_flags_separate_value() {
        let cli = parse_cli(args(&["-p", "9000", "-a", "0.0.0.0"])).unwrap();
        assert_eq!(cli.port, 9000);
        assert_eq!(cli.address, IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
    }

    #[test]
    fn unambiguous_prefix_matches() {
        let cli = parse_cli(args(&["--addr", "10.0.0.1"])).unwrap();
        assert_eq!(cli.address, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[test]
    fn help_flag_short_circuits() {
        let err = parse_cli(args(&["--help"])).unwrap_err();
        assert_eq!(err, CliError::Help);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn invalid_value_is_exit_code_two() {
        let err = parse_cli(args(&["--port", "not-a-port"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unknown_option_is_exit_code_three() {
        let err = parse_cli(args(&["--bogus"])).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn threads_zero_is_invalid() {
        let err = parse_cli(args(&["--threads", "0"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn db_info_requires_all_keys() {
        let dir = std::env::temp_dir().join("mpp_test_dbinfo_partial.conf");
        fs::write(&dir, "user=alice\nhost=localhost\n").unwrap();
        let cli = CliArgs {
            db_config_file_path: Some(dir.clone()),
            ..CliArgs::default()
        };
        let cfg = LayeredConfig::new(cli);
        assert!(cfg.load_db_info().is_err());
        let _ = fs::remove_file(dir);
    }

    #[test]
    fn db_info_parses_when_complete() {
        let dir = std::env::temp_dir().join("mpp_test_dbinfo_full.conf");
        fs::write(&dir, "user=alice\npassword=secret\nhost=localhost\ndb=nouns\n").unwrap();
        let cli = CliArgs {
            db_config_file_path: Some(dir.clone()),
            ..CliArgs::default()
        };
        let cfg = LayeredConfig::new(cli);
        let info = cfg.load_db_info().unwrap().unwrap();
        assert_eq!(info.user, "alice");
        assert_eq!(info.db, "nouns");
        let _ = fs::remove_file(dir);
    }
}
