use reqwest::StatusCode;
use thiserror::Error;

use crate::validation::ValidationErrors;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Everything that can go wrong between a user action and a store dispatch.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Local schema check failed; the request was never sent.
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// The API answered with a non-success status.
    #[error("API returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("local storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An authenticated action was attempted without a session or token.
    #[error("not signed in")]
    NotSignedIn,

    /// Some other precondition checked before dispatching did not hold.
    #[error("{0}")]
    Prerequisite(&'static str),

    /// The owning view was torn down before the response arrived.
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }

    /// 409 is the one status the UI tells apart ("handle already taken").
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Issue;

    #[test]
    fn test_conflict_detection() {
        let err = ClientError::Status {
            status: StatusCode::CONFLICT,
            message: "handle taken".into(),
        };
        assert!(err.is_conflict());

        let err = ClientError::Status {
            status: StatusCode::BAD_REQUEST,
            message: "bad".into(),
        };
        assert!(!err.is_conflict());
        assert!(!ClientError::NotSignedIn.is_conflict());
    }

    #[test]
    fn test_validation_error_displays_first_issue() {
        let err: ClientError = ValidationErrors::new(vec![
            Issue::new("title", "Video Title is required"),
            Issue::new("thumbnailUrl", "Invalid Thumbnail URL"),
        ])
        .into();
        assert_eq!(err.to_string(), "Video Title is required");
    }
}
