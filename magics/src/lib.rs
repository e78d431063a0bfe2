//! Snowflake SQL Magics
//!
//! Notebook-style commands for querying Snowflake: `%snowauth` opens a
//! key-pair authenticated connection, `%%snowsql [var]` runs the statements
//! of a cell and optionally binds the last result table to a variable.

pub mod auth;
pub mod client;
pub mod connection;
pub mod error;
pub mod executor;
pub mod extension;
pub mod protocol;
pub mod session;
pub mod splitter;
pub mod sql_rewriter;

#[cfg(test)]
mod test_utils;

pub use client::SqlApiConnector;
pub use connection::{AuthArgs, ConnectionParams, Connector};
pub use error::{Error, Result};
pub use extension::{ConnectionState, SnowflakeMagics};
pub use session::{Session, Shell};
