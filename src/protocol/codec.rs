//! Protocol codec
//!
//! Parsing command lines and rendering response lines.

use std::io::{BufRead, Write};

use crate::error::{QdevError, Result};
use super::{Command, Response};

/// Maximum accepted line length (bytes, excluding the newline)
pub const MAX_LINE_SIZE: usize = 64 * 1024;

// =============================================================================
// Command Decoding
// =============================================================================

/// Decode one command line
pub fn decode_command(line: &str) -> Result<Command> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.len() > MAX_LINE_SIZE {
        return Err(QdevError::Protocol(format!(
            "Line too long: {} bytes (max {})",
            line.len(),
            MAX_LINE_SIZE
        )));
    }

    let trimmed = line.trim_start();
    let (verb, rest) = split_word(trimmed);

    match verb.to_ascii_lowercase().as_str() {
        "write" => {
            let (device, rest) = split_word(rest);
            let (pos, rest) = split_word(rest);
            Ok(Command::Write {
                device: parse_number(device, "device")?,
                pos: parse_number(pos, "pos")?,
                data: rest.as_bytes().to_vec(),
            })
        }
        "read" => {
            let args = expect_args(rest, 3, "read <dev> <pos> <count>")?;
            Ok(Command::Read {
                device: parse_number(args[0], "device")?,
                pos: parse_number(args[1], "pos")?,
                count: parse_number(args[2], "count")?,
            })
        }
        "cat" => Ok(Command::Cat {
            device: parse_device(rest, "cat <dev>")?,
        }),
        "stat" => Ok(Command::Stat {
            device: parse_device(rest, "stat <dev>")?,
        }),
        "reset" => Ok(Command::Reset {
            device: parse_device(rest, "reset <dev>")?,
        }),
        "proc" => {
            if rest.is_empty() {
                Ok(Command::ProcRead)
            } else {
                Ok(Command::ProcWrite {
                    data: rest.as_bytes().to_vec(),
                })
            }
        }
        "ping" => {
            expect_args(rest, 0, "ping")?;
            Ok(Command::Ping)
        }
        "quit" | "exit" => Ok(Command::Quit),
        "" => Err(QdevError::Protocol("Empty command".to_string())),
        other => Err(QdevError::Protocol(format!("Unknown command: {}", other))),
    }
}

/// Read and decode the next non-blank line
///
/// Returns `Ok(None)` at end of input.
pub fn read_command<R: BufRead>(reader: &mut R) -> Result<Option<Command>> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if !line.trim().is_empty() {
            return decode_command(&line).map(Some);
        }
    }
}

/// Split off the first whitespace-delimited word; the rest keeps its spacing
/// after a single separator
fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(end) => {
            let rest = &input[end..];
            let mut chars = rest.chars();
            chars.next();
            (&input[..end], chars.as_str())
        }
        None => (input, ""),
    }
}

fn expect_args<'a>(rest: &'a str, count: usize, usage: &str) -> Result<Vec<&'a str>> {
    let args: Vec<&str> = rest.split_whitespace().collect();
    if args.len() != count {
        return Err(QdevError::Protocol(format!("Usage: {}", usage)));
    }
    Ok(args)
}

fn parse_device(rest: &str, usage: &str) -> Result<usize> {
    let args = expect_args(rest, 1, usage)?;
    parse_number(args[0], "device")
}

fn parse_number<T: std::str::FromStr>(word: &str, what: &str) -> Result<T> {
    word.parse()
        .map_err(|_| QdevError::Protocol(format!("Invalid {}: {:?}", what, word)))
}

// =============================================================================
// Response Encoding
// =============================================================================

/// Render a response as a single line (without newline)
pub fn encode_response(response: &Response) -> String {
    match response {
        Response::Count(n) => format!("OK {}", n),
        Response::Data(data) => {
            let text = String::from_utf8_lossy(data);
            format!("DATA {} {}", data.len(), text.escape_debug())
        }
        Response::Stat {
            name,
            size,
            block_sets,
            quanta,
        } => format!(
            "STAT {} size={} sets={} quanta={}",
            name, size, block_sets, quanta
        ),
        Response::Pong => "PONG".to_string(),
        Response::Bye => "BYE".to_string(),
        Response::Error { errno, message } => format!("ERR {} {}", errno, message),
    }
}

/// Write a response line and flush
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writeln!(writer, "{}", encode_response(response))?;
    writer.flush()?;
    Ok(())
}
