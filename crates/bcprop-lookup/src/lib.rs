//! Property snapshot resolution for British Columbia.
//!
//! [`LookupService`] composes the provincial provider adapters, the zoning
//! engine and the snapshot cache. The aggregator runs every branch
//! concurrently under one budget and reports partial failure on the
//! snapshot instead of failing the request.

pub mod aggregator;
pub mod cache;
pub mod error;
pub mod ocp;
pub mod providers;
pub mod service;
pub mod sources;
pub mod zoning;

pub use aggregator::SnapshotAggregator;
pub use cache::{address_key, coordinate_key, MemoryCache, SnapshotCache};
pub use error::{CacheError, LookupError};
pub use ocp::{OcpCity, OcpEndpoints, OcpLookup, OcpResult};
pub use providers::{Provider, ProviderAdapters, ProviderEndpoints};
pub use service::{LookupService, LookupSettings};
pub use sources::{ZoningEndpoint, ZoningSource, ZoningSourceTable};
pub use zoning::ZoningEngine;
