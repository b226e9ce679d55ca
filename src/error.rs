use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::config::DUMP_INDEX_URL;

/// Errors raised while fetching, reading or converting a dump
#[derive(Debug, Error)]
pub enum DumpError {
    /// No dump has been published for the requested date
    #[error("dump not found for date {date} ({url}); available dates can be checked at {}", DUMP_INDEX_URL)]
    ResourceUnavailable { date: String, url: String },

    #[error("dump file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("invalid dump date {0:?}, expected YYYYMMDD or \"latest\"")]
    InvalidDate(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// The structured parser could not decode the stream at `position`
    #[error("malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    #[error("external cleaner failed: {0}")]
    Cleaner(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DumpError {
    /// True for the "nothing there" failures: an unpublished date or a missing local file.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DumpError::ResourceUnavailable { .. } | DumpError::MissingInput(_)
        )
    }

    pub(crate) fn from_xml(err: quick_xml::Error, position: usize) -> Self {
        match err {
            quick_xml::Error::Io(shared) => DumpError::Io(
                Arc::try_unwrap(shared)
                    .unwrap_or_else(|shared| io::Error::new(shared.kind(), shared.to_string())),
            ),
            other => DumpError::Malformed {
                position: position as u64,
                message: other.to_string(),
            },
        }
    }
}
