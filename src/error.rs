// Error taxonomy shared by every library module. The binary wraps these in
// `anyhow` at the top level; inside the library we keep them typed so the
// review loop can tell a failed download apart from a fatal walk error.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or rejected credentials (GitHub token, Google credential blob).
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A remote repo, path, folder or file is absent or not readable. The
    /// message carries the identifying context and remediation hints.
    #[error("{0}")]
    NotFound(String),

    #[error("HTTP {status} from {url}")]
    Http {
        status: reqwest::StatusCode,
        url: String,
    },

    /// Malformed local state, e.g. an unparsable decision log.
    #[error("invalid {what}: {detail}")]
    Validation { what: String, detail: String },

    /// Network or chunk failure in the middle of a transfer.
    #[error("transfer interrupted: {0}")]
    TransientIo(#[source] std::io::Error),

    #[error(
        "Folder ID {folder_id} not found on Google Drive. Does not exist, or permissions do not allow read."
    )]
    InaccessibleFolder {
        folder_id: String,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(what: impl Into<String>, detail: impl ToString) -> Self {
        Error::Validation {
            what: what.into(),
            detail: detail.to_string(),
        }
    }

}
