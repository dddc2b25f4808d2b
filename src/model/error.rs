//! Failures reported by the remote library client

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LibraryError {
    /// The access token was rejected; the user has to sign in again
    #[error("Spotify rejected the access token")]
    Unauthorized,

    #[error("Spotify API error: {0}")]
    Api(String),
}

impl LibraryError {
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api(message.into())
    }
}

impl From<rspotify::ClientError> for LibraryError {
    fn from(err: rspotify::ClientError) -> Self {
        use rspotify::http::HttpError;

        if let rspotify::ClientError::Http(http_err) = &err {
            if let HttpError::StatusCode(response) = http_err.as_ref() {
                if response.status().as_u16() == 401 {
                    return Self::Unauthorized;
                }
            }
        }
        Self::Api(err.to_string())
    }
}

impl From<rspotify::model::IdError> for LibraryError {
    fn from(err: rspotify::model::IdError) -> Self {
        Self::Api(format!("invalid id: {}", err))
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Api(format!("unexpected response: {}", err))
    }
}

pub type LibraryResult<T> = Result<T, LibraryError>;
