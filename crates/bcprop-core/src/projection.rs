//! WGS84 → NAD83 / UTM zone 10N reprojection.
//!
//! Transverse Mercator forward projection (Snyder, *Map Projections: A
//! Working Manual*, eqs. 8-9 to 8-10) on the GRS80 ellipsoid. WGS84 and
//! NAD83 are treated as coincident, which matches the zero-shift datum
//! definition used by the municipal services we query.

use crate::error::CoordinateError;
use crate::geo::{Coordinate, ProjectedCoordinate, SpatialReference};

const GRS80_SEMI_MAJOR: f64 = 6_378_137.0;
const GRS80_INVERSE_FLATTENING: f64 = 298.257_222_101;
const UTM_SCALE_FACTOR: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_ZONE_10_CENTRAL_MERIDIAN: f64 = -123.0;

/// Projects a WGS84 coordinate into NAD83 / UTM zone 10N (EPSG:26910).
///
/// Pure and deterministic. Southern-hemisphere input yields negative
/// northings; the services we target are all in zone 10N.
///
/// # Errors
///
/// Returns [`CoordinateError::InvalidCoordinate`] for NaN or out-of-range
/// latitude/longitude.
pub fn project(coord: Coordinate) -> Result<ProjectedCoordinate, CoordinateError> {
    coord.validate()?;
    let (x, y) = transverse_mercator(
        coord.latitude,
        coord.longitude,
        UTM_ZONE_10_CENTRAL_MERIDIAN,
    );
    Ok(ProjectedCoordinate {
        x,
        y,
        epsg: SpatialReference::Utm10N,
    })
}

fn transverse_mercator(lat_deg: f64, lon_deg: f64, central_meridian_deg: f64) -> (f64, f64) {
    let a = GRS80_SEMI_MAJOR;
    let f = 1.0 / GRS80_INVERSE_FLATTENING;
    let e2 = f * (2.0 - f);
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let ep2 = e2 / (1.0 - e2);

    let phi = lat_deg.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let tan_phi = phi.tan();

    let n = a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let t = tan_phi * tan_phi;
    let c = ep2 * cos_phi * cos_phi;
    let big_a = (lon_deg - central_meridian_deg).to_radians() * cos_phi;

    // Meridional arc length from the equator.
    let m = a
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin());

    let a2 = big_a * big_a;
    let a3 = a2 * big_a;
    let a4 = a3 * big_a;
    let a5 = a4 * big_a;
    let a6 = a5 * big_a;

    let x = UTM_SCALE_FACTOR
        * n
        * (big_a
            + (1.0 - t + c) * a3 / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0)
        + UTM_FALSE_EASTING;

    let y = UTM_SCALE_FACTOR
        * (m + n
            * tan_phi
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected} ± {tolerance}, got {actual}"
        );
    }

    #[test]
    fn projects_downtown_vancouver() {
        let projected = project(Coordinate {
            latitude: 49.2827,
            longitude: -123.1207,
        })
        .expect("valid coordinate");
        assert_eq!(projected.epsg, SpatialReference::Utm10N);
        assert_close(projected.x, 491_221.77, 0.5);
        assert_close(projected.y, 5_458_889.98, 0.5);
    }

    #[test]
    fn projects_burnaby_east_of_central_meridian() {
        let projected = project(Coordinate {
            latitude: 49.2488,
            longitude: -122.9805,
        })
        .unwrap();
        assert_close(projected.x, 501_419.16, 0.5);
        assert_close(projected.y, 5_455_114.48, 0.5);
    }

    #[test]
    fn central_meridian_maps_to_false_easting() {
        let projected = project(Coordinate {
            latitude: 49.0,
            longitude: -123.0,
        })
        .unwrap();
        assert_close(projected.x, 500_000.0, 1e-6);
        assert_close(projected.y, 5_427_455.78, 0.5);
    }

    #[test]
    fn projection_is_deterministic() {
        let coord = Coordinate {
            latitude: 49.1913,
            longitude: -122.849,
        };
        assert_eq!(project(coord).unwrap(), project(coord).unwrap());
    }

    #[test]
    fn rejects_nan_and_out_of_range_input() {
        let nan = Coordinate {
            latitude: f64::NAN,
            longitude: -123.0,
        };
        assert!(matches!(
            project(nan),
            Err(CoordinateError::InvalidCoordinate { .. })
        ));

        let out_of_range = Coordinate {
            latitude: 49.0,
            longitude: 200.0,
        };
        assert!(project(out_of_range).is_err());
    }
}
