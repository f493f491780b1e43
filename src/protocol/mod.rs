//! Protocol Module
//!
//! Line-oriented command language spoken by `qdev-shell`.
//!
//! ## Request Format
//! One command per line, whitespace separated. Everything after the
//! position of `write` (or after `proc`) is taken verbatim as the payload.
//! ```text
//! write <dev> <pos> <text...>
//! read  <dev> <pos> <count>
//! cat   <dev>
//! stat  <dev>
//! reset <dev>
//! proc  [text...]
//! ping
//! quit
//! ```
//!
//! ## Response Format
//! ```text
//! OK <n>                              bytes written / block-sets freed
//! DATA <len> <text>                   bytes read (lossy UTF-8)
//! STAT <name> size=<n> sets=<n> quanta=<n>
//! PONG | BYE
//! ERR <errno> <message>
//! ```

mod codec;
mod command;
mod response;

pub use codec::{decode_command, encode_response, read_command, write_response};
pub use command::{Command, CommandType};
pub use response::Response;
