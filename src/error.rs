//! Error types for content fetching and normalization

use std::time::Duration;

/// Failure talking to the CMS.
#[derive(Debug, thiserror::Error)]
pub enum ContentFetchError {
    /// The request never produced a response (DNS, TLS, connection reset...).
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// No response within the configured timeout.
    #[error("request to {url} timed out after {}ms", .after.as_millis())]
    Timeout { url: String, after: Duration },

    /// The CMS answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body was not the JSON document we expected.
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ContentFetchError {
    /// Map a reqwest error onto the fetch taxonomy
    pub fn from_reqwest(url: &str, err: reqwest::Error, timeout: Duration) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            Self::Timeout {
                url,
                after: timeout,
            }
        } else if let Some(status) = err.status() {
            Self::Status {
                url,
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            Self::Decode {
                url,
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                url,
                message: err.to_string(),
            }
        }
    }
}

/// Library error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    ContentFetch(#[from] ContentFetchError),

    /// A CMS record is missing structure we rely on.
    #[error("malformed content: {0}")]
    MalformedContent(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedContent(msg.into())
    }

    /// True for failures of the network call itself
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::ContentFetch(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = ContentFetchError::Timeout {
            url: "https://cms.test/page2".to_string(),
            after: Duration::from_millis(1500),
        };
        assert_eq!(
            err.to_string(),
            "request to https://cms.test/page2 timed out after 1500ms"
        );
    }

    #[test]
    fn test_is_fetch() {
        let fetch: Error = ContentFetchError::Status {
            url: "u".to_string(),
            status: 500,
        }
        .into();
        assert!(fetch.is_fetch());
        assert!(!Error::malformed("no data").is_fetch());
    }
}
