//! Clients for the geospatial services behind a property snapshot.
//!
//! [`SpatialQueryClient`] issues single point-intersection queries against
//! ArcGIS REST feature/map services and normalizes the response into an
//! attribute map plus optional polygon. [`OpenDataClient`] runs distance
//! searches against an open-data records API. Neither client retries;
//! callers decide which alternate encodings are worth another request.

pub mod client;
pub mod error;
pub mod opendata;
pub mod types;

pub use client::SpatialQueryClient;
pub use error::ArcgisError;
pub use opendata::{NearbyPage, NearbySearch, OpenDataClient, DEFAULT_SEARCH_URL};
pub use types::{OpenDataRecord, PointGeometry, PointQueryResult, SpatialQueryConfig};
