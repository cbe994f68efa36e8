//! Errors of the outer surfaces (CLI, HTTP, option parsing).
//!
//! The analysis itself never fails; see [`crate::parser::analyse`].

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KampfberichtError {
    #[error("failed to read report {path}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown field: {name}")]
    UnknownField { name: String },

    #[error("unknown sort direction: {name} (expected asc or desc)")]
    UnknownDirection { name: String },

    #[error("at least one grouping field is required")]
    EmptyGrouping,

    #[error("failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error")]
    Serve(#[source] std::io::Error),

    #[error("failed to serialize analysis")]
    Serialize(#[from] serde_json::Error),
}

impl KampfberichtError {
    /// True for errors caused by the caller's input
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            KampfberichtError::UnknownField { .. }
                | KampfberichtError::UnknownDirection { .. }
                | KampfberichtError::EmptyGrouping
        )
    }
}

pub type Result<T> = std::result::Result<T, KampfberichtError>;
