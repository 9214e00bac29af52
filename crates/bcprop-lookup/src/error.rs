use bcprop_arcgis::ArcgisError;
use bcprop_core::{ConfigError, CoordinateError};
use bcprop_geocode::GeocodeError;
use thiserror::Error;

/// Errors surfaced by [`crate::LookupService`].
///
/// Provider and zoning failures are never represented here; they are
/// recorded on the returned snapshot instead.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    InvalidCoordinate(#[from] CoordinateError),

    /// The address could not be turned into a coordinate.
    #[error("geocoding failed: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("provide an address or a latitude/longitude pair")]
    MissingInput,

    #[error("unknown OCP city '{0}'; expected burnaby, surrey or vancouver")]
    UnknownCity(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An outbound HTTP client could not be constructed.
    #[error("client setup failed: {0}")]
    Client(#[from] ArcgisError),
}

/// A snapshot cache backend failed. Callers log and carry on uncached.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("snapshot cache unavailable: {0}")]
    Unavailable(String),
}
