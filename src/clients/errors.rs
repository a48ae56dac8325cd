use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Connection failure, timeout or a non-2xx response. Never retried.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response from {url}: HTTP {status}, body: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to parse server response: {0}")]
    Protocol(String),

    /// The server answered with `success: false`.
    #[error("Server rejected the request. Server response:\n{0}")]
    RemoteRejection(serde_json::Value),

    #[error("Filesystem error at {path:?}: {source}")]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to tag {path:?}: {reason}")]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("Invalid link: {0}")]
    InvalidLink(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A download task panicked or was cancelled before finishing.
    #[error("Download task aborted: {0}")]
    TaskAborted(String),
}

impl Error {
    pub(crate) fn fs(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::FileSystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// `true` for the transport family (`Transport` and `HttpStatus`).
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::HttpStatus { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Protocol(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::TaskAborted(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidLink(err.to_string())
    }
}
