use thiserror::Error;

/// Errors returned by the geocoding client.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The geocoder answered 429.
    #[error("geocoder rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("no geocoding results for '{query}'")]
    NoResults { query: String },

    /// The response did not have the expected shape.
    #[error("failed to parse geocoder response: {message}")]
    Parse { message: String },

    #[error("address must not be empty")]
    EmptyQuery,
}
