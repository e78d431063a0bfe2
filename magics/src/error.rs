//! Error types for Snowflake SQL magics

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing connection parameters: {}", .0.join(", "))]
    MissingParameters(Vec<&'static str>),

    #[error("Private key error: {0}")]
    PrivateKey(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{code} ({sql_state}): {message}")]
    Api {
        code: String,
        message: String,
        sql_state: String,
    },

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Connection is closed")]
    Closed,

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Return the SQL State reported by the warehouse, if any
    pub fn sql_state(&self) -> &str {
        match self {
            Error::Api { sql_state, .. } => sql_state,
            Error::NotSupported(_) => "0A000",
            _ => "XX000",
        }
    }

    /// Render the error followed by its source chain
    pub fn trace(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str("\n  caused by: ");
            out.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }
        out
    }
}
