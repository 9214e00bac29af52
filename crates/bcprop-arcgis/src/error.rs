use thiserror::Error;

/// Errors returned by the feature-service and open-data clients.
#[derive(Debug, Error)]
pub enum ArcgisError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// ArcGIS reports request errors as HTTP 200 with an `error` body.
    /// `code` is 0 when the body omits it.
    #[error("service error {code}: {message}")]
    Service { code: i64, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid service URL: {0}")]
    InvalidUrl(String),
}

impl ArcgisError {
    /// HTTP status associated with the failure, when there was one.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ArcgisError::Http(e) => e.status().map(|s| s.as_u16()),
            ArcgisError::UnexpectedStatus { status, .. } => Some(*status),
            ArcgisError::Service { .. }
            | ArcgisError::Deserialize { .. }
            | ArcgisError::InvalidUrl(_) => None,
        }
    }
}
