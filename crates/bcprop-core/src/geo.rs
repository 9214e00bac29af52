use serde::{Deserialize, Serialize};

use crate::error::CoordinateError;

/// A WGS84 point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Builds a coordinate, rejecting non-finite or out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::InvalidCoordinate`] when either component is
    /// NaN/infinite, latitude is outside `[-90, 90]`, or longitude is outside
    /// `[-180, 180]`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        let coord = Self {
            latitude,
            longitude,
        };
        coord.validate()?;
        Ok(coord)
    }

    /// Checks the range invariants of an already-constructed coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::InvalidCoordinate`] on malformed input.
    pub fn validate(&self) -> Result<(), CoordinateError> {
        let lat_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let lon_ok = self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);
        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(CoordinateError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

/// Spatial references the resolver knows how to send to feature services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpatialReference {
    /// Geographic WGS84 (EPSG:4326).
    #[serde(rename = "4326")]
    Wgs84,
    /// NAD83 / UTM zone 10N (EPSG:26910).
    #[serde(rename = "26910")]
    Utm10N,
}

impl SpatialReference {
    /// The bare EPSG code as feature services expect it in `inSR`/`outSR`.
    #[must_use]
    pub fn epsg(self) -> &'static str {
        match self {
            SpatialReference::Wgs84 => "4326",
            SpatialReference::Utm10N => "26910",
        }
    }

    /// Parses a bare or `EPSG:`-prefixed code.
    #[must_use]
    pub fn from_epsg(code: &str) -> Option<Self> {
        let code = code.trim();
        let code = code
            .strip_prefix("EPSG:")
            .or_else(|| code.strip_prefix("epsg:"))
            .unwrap_or(code);
        match code {
            "4326" => Some(SpatialReference::Wgs84),
            "26910" => Some(SpatialReference::Utm10N),
            _ => None,
        }
    }
}

impl std::fmt::Display for SpatialReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// A point in a projected coordinate system, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedCoordinate {
    pub x: f64,
    pub y: f64,
    pub epsg: SpatialReference,
}

/// Polygon passed through from a feature service, as ArcGIS-style rings of
/// `[x, y]` positions. No geometric validation is performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub rings: Vec<Vec<[f64; 2]>>,
}

impl Polygon {
    /// Builds a polygon from raw ring arrays, dropping positions with fewer
    /// than two ordinates and any z/m values. Returns `None` when no ring
    /// survives.
    #[must_use]
    pub fn from_raw_rings(rings: &[Vec<Vec<f64>>]) -> Option<Self> {
        let rings: Vec<Vec<[f64; 2]>> = rings
            .iter()
            .map(|ring| {
                ring.iter()
                    .filter_map(|pos| match pos.as_slice() {
                        [x, y, ..] => Some([*x, *y]),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|ring| !ring.is_empty())
            .collect();
        if rings.is_empty() {
            None
        } else {
            Some(Self { rings })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accepts_downtown_vancouver() {
        let coord = Coordinate::new(49.2827, -123.1207).expect("valid coordinate");
        assert!((coord.latitude - 49.2827).abs() < f64::EPSILON);
    }

    #[test]
    fn new_rejects_nan_latitude() {
        let err = Coordinate::new(f64::NAN, -123.0).unwrap_err();
        assert!(matches!(err, CoordinateError::InvalidCoordinate { .. }));
    }

    #[test]
    fn new_rejects_out_of_range_longitude() {
        assert!(Coordinate::new(49.0, -181.0).is_err());
        assert!(Coordinate::new(91.0, -123.0).is_err());
    }

    #[test]
    fn spatial_reference_serializes_as_bare_code() {
        let json = serde_json::to_string(&SpatialReference::Utm10N).unwrap();
        assert_eq!(json, "\"26910\"");
    }

    #[test]
    fn spatial_reference_parses_prefixed_codes() {
        assert_eq!(
            SpatialReference::from_epsg("EPSG:26910"),
            Some(SpatialReference::Utm10N)
        );
        assert_eq!(
            SpatialReference::from_epsg("4326"),
            Some(SpatialReference::Wgs84)
        );
        assert_eq!(SpatialReference::from_epsg("3857"), None);
    }

    #[test]
    fn polygon_from_raw_rings_drops_z_values_and_short_positions() {
        let raw = vec![vec![
            vec![1.0, 2.0, 9.0],
            vec![3.0],
            vec![4.0, 5.0],
            vec![1.0, 2.0],
        ]];
        let polygon = Polygon::from_raw_rings(&raw).expect("polygon");
        assert_eq!(polygon.rings, vec![vec![[1.0, 2.0], [4.0, 5.0], [1.0, 2.0]]]);
    }

    #[test]
    fn polygon_from_empty_rings_is_none() {
        assert!(Polygon::from_raw_rings(&[]).is_none());
        assert!(Polygon::from_raw_rings(&[vec![]]).is_none());
    }
}
