use thiserror::Error;

/// Result type used throughout the crate
pub type SubsroResult<T> = Result<T, SubsroError>;

/// Errors produced while searching, downloading and matching subtitles
#[derive(Error, Debug)]
pub enum SubsroError {
    #[error("Invalid identifier format: {identifier}")]
    InvalidIdentifier { identifier: String },

    #[error("Unrecognized archive format")]
    UnrecognizedArchive,

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Subtitle not found: {id}")]
    NotFound { id: u64 },

    #[error("API key rejected by catalog service")]
    Unauthorized,

    #[error("Rate limited by catalog service")]
    RateLimited,

    #[error("Catalog API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Network error: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("File system error: {source}")]
    FileSystem {
        #[from]
        source: std::io::Error,
    },

    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl SubsroError {
    /// Whether this error means "no subtitle found" rather than a failure
    pub fn is_no_subtitle(&self) -> bool {
        matches!(self, SubsroError::UnrecognizedArchive | SubsroError::NotFound { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SubsroError::RateLimited)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SubsroError::Cancelled)
    }
}

impl From<zip::result::ZipError> for SubsroError {
    fn from(err: zip::result::ZipError) -> Self {
        SubsroError::Archive {
            message: err.to_string(),
        }
    }
}

impl From<unrar::error::UnrarError> for SubsroError {
    fn from(err: unrar::error::UnrarError) -> Self {
        SubsroError::Archive {
            message: err.to_string(),
        }
    }
}
