//! Command-line parsing.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Exit code for malformed command lines.
pub const EXIT_USAGE: u8 = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch a file from a responder.
    Receive {
        address: String,
        port: u16,
        output: Option<PathBuf>,
    },
    /// Serve a file.
    Send { path: PathBuf, port: Option<u16> },
    /// Receive a file, then serve it on a second port.
    Relay {
        address: String,
        port: u16,
        relay_port: Option<u16>,
    },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub config: Option<PathBuf>,
    pub command: Command,
}

pub fn print_usage() {
    eprintln!("usage:");
    eprintln!("  ncpy receive <ADDRESS> <PORT> [--output PATH]     (alias -r)");
    eprintln!("  ncpy send <PATH> [--port PORT]                    (alias -s)");
    eprintln!("  ncpy relay <ADDRESS> <PORT> [--port RELAY_PORT]");
    eprintln!();
    eprintln!("options:");
    eprintln!("  --config PATH    configuration file (default ~/.config/ncpy/ncpy.toml)");
    eprintln!();
    eprintln!("RUST_LOG controls log verbosity (default: info).");
}

/// Parses the arguments following the program name.
pub fn parse(args: &[String]) -> Result<Cli> {
    let mut config = None;
    let mut output = None;
    let mut port = None;
    let mut remaining: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                config = Some(PathBuf::from(
                    args.get(i).context("--config requires a value")?,
                ));
            }
            "--output" | "-o" => {
                i += 1;
                output = Some(PathBuf::from(
                    args.get(i).context("--output requires a value")?,
                ));
            }
            "--port" | "-p" => {
                i += 1;
                port = Some(parse_port(args.get(i).context("--port requires a value")?)?);
            }
            other => remaining.push(other),
        }
        i += 1;
    }

    let command = match remaining.as_slice() {
        ["receive" | "-r", address, remote_port] => {
            if port.is_some() {
                bail!("--port does not apply to receive; the port is positional");
            }
            Command::Receive {
                address: address.to_string(),
                port: parse_port(remote_port)?,
                output,
            }
        }
        ["send" | "-s", path] => {
            reject_output(&output, "send")?;
            Command::Send {
                path: PathBuf::from(path),
                port,
            }
        }
        ["relay", address, remote_port] => {
            reject_output(&output, "relay")?;
            Command::Relay {
                address: address.to_string(),
                port: parse_port(remote_port)?,
                relay_port: port,
            }
        }
        ["help" | "--help" | "-h"] | [] => Command::Help,
        other => bail!("unknown command: {}", other.join(" ")),
    };

    Ok(Cli { config, command })
}

fn parse_port(value: &str) -> Result<u16> {
    value
        .parse()
        .with_context(|| format!("invalid port: {value}"))
}

fn reject_output(output: &Option<PathBuf>, command: &str) -> Result<()> {
    if output.is_some() {
        bail!("--output does not apply to {command}");
    }
    Ok(())
}
