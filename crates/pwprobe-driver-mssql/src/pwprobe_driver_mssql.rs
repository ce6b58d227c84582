//! MS SQL Server adapter for pwprobe
//!
//! Connects through tiberius. A structured [`pwprobe_core::ConnectionConfig`]
//! puts the raw password straight into the login packet. `;`-delimited
//! connection strings are handed to tiberius's own parser, so those probes
//! show how the client library reads the escaped password.

mod connection;
mod driver;

#[cfg(test)]
mod connection_tests;
#[cfg(test)]
mod driver_tests;

pub use connection::{MssqlConnection, MssqlConnectionError};
pub use driver::MssqlDriver;
