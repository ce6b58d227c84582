//! pwprobe core - password escaping and connection artifacts
//!
//! This crate holds everything the harness needs that does not talk to a
//! database or spawn a process:
//!
//! - [`escape`] - brace escaping for `;`-delimited strings, percent-encoding for URLs
//! - [`ConnectionTarget`] - builds the three connection artifacts
//! - [`parse_connection_string`] - turns either string style back into a [`ConnectionConfig`]
//! - [`Scenario`] - named password patterns
//! - [`DatabaseDriver`] / [`Connection`] - the adapter seam

mod connection;
mod driver;
mod error;
pub mod escape;
mod parse;
mod scenario;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use escape::{decode_cli, decode_url, encode_cli, encode_url};
pub use parse::*;
pub use scenario::*;
