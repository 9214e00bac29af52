//! Forward geocoding of free-text addresses through a Nominatim endpoint.
//!
//! Calls are spaced by a [`RateLimiter`] that the composing process owns
//! and shares, and successful lookups are kept in a [`GeocodeCache`] that
//! is independent of the snapshot cache.

pub mod cache;
pub mod client;
pub mod error;
pub mod normalize;
pub mod rate_limit;
pub(crate) mod retry;
pub mod types;

pub use cache::GeocodeCache;
pub use client::NominatimClient;
pub use error::GeocodeError;
pub use normalize::{cache_key, normalize_address};
pub use rate_limit::RateLimiter;
pub use types::GeocodeResult;
