//! Error types for notebook conversion

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Input file not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Could not decode JSON from {}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed notebook: {0}")]
    Malformed(String),

    #[error("Error writing to output file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Message shown to the user for a failed conversion
    pub fn user_message(&self) -> String {
        match self {
            Error::Write { .. } => self.to_string(),
            _ => format!("Error: {}", self),
        }
    }
}
