//! Notebook conversion for Snowflake SQL magics
//!
//! Turns a notebook whose SQL cells were written for a SQL-language kernel
//! into one that runs them through `%%snowsql`.

pub mod cells;
pub mod convert;
pub mod error;

pub use convert::{convert, convert_notebook};
pub use error::{Error, Result};
