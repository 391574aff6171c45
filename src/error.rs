use serde_json::Value;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Non-success response from the API, carrying the `detail` message the
    /// server put in the body (or a generic fallback).
    #[error("API error ({status}): {detail}")]
    Api { status: u16, detail: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Response decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Download error: {0}")]
    Download(String),
}

impl Error {
    /// Builds an [`Error::Api`] from a status code and the decoded response
    /// body, extracting the `detail` field when present.
    pub(crate) fn api(status: u16, payload: &Value) -> Self {
        let detail = payload
            .get("detail")
            .and_then(Value::as_str)
            .unwrap_or("Request failed")
            .to_string();
        Self::Api { status, detail }
    }

    /// HTTP status carried by this error, if it came from an API response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this failure is an expired-credential rejection (status 401),
    /// the only failure the refresh-and-retry protocol acts on.
    #[must_use]
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }
}
