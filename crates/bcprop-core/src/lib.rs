//! Shared domain model for the property snapshot resolver.
//!
//! Holds the coordinate types and the UTM reprojector, the snapshot and
//! diagnostic records returned to callers, attribute-alias extraction, the
//! injectable clock, and environment-driven application configuration.

pub mod app_config;
pub mod attributes;
pub mod clock;
pub mod config;
pub mod error;
pub mod geo;
pub mod projection;
pub mod snapshot;

pub use app_config::{AppConfig, Environment};
pub use attributes::{pick_field, AttributeMap};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, CoordinateError};
pub use geo::{Coordinate, Polygon, ProjectedCoordinate, SpatialReference};
pub use projection::project;
pub use snapshot::{
    AlrStatus, AssessmentRecord, AttemptOutcome, BoundaryInfo, FloodplainInfo, GeometryEncoding,
    ParcelInfo, ProviderResult, QueryAttempt, Snapshot, ZoningHit, ZoningOutcome,
};
