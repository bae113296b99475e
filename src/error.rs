use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid repository identifier '{value}': {reason}")]
    Config { value: String, reason: String },

    #[error("remote resource not found at {url}")]
    NotFound { url: String },

    #[error("request to {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("download of '{name}' did not complete: {reason}")]
    PartialDownload { name: String, reason: String },

    #[error("could not delete '{name}': {source}")]
    Deletion {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("state file {} is not usable", path.display())]
    StateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SyncError {
    pub(crate) fn fetch(url: &str, err: ureq::Error) -> Self {
        let reason = match err {
            ureq::Error::Status(code, response) => {
                format!("HTTP {code} {}", response.status_text())
            }
            ureq::Error::Transport(transport) => transport.to_string(),
        };
        SyncError::Fetch {
            url: url.to_string(),
            reason,
        }
    }
}
