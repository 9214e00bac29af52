use bcprop_core::{GeometryEncoding, SpatialReference};

/// One query the engine may issue: which endpoint, in which reference,
/// with which geometry encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LadderStep {
    pub endpoint: usize,
    pub spatial_reference: SpatialReference,
    pub encoding: GeometryEncoding,
}

/// Encodings tried against a single endpoint, most specific first.
#[must_use]
pub fn encodings_for(preferred: Option<SpatialReference>) -> Vec<(SpatialReference, GeometryEncoding)> {
    let mut steps = Vec::with_capacity(4);
    if let Some(projected) = preferred.filter(|sr| *sr != SpatialReference::Wgs84) {
        steps.push((projected, GeometryEncoding::JsonObject));
        steps.push((projected, GeometryEncoding::PointPair));
    }
    steps.push((SpatialReference::Wgs84, GeometryEncoding::JsonObject));
    steps.push((SpatialReference::Wgs84, GeometryEncoding::PointPair));
    steps
}

/// The full trial order: every encoding for endpoint 0, then endpoint 1, ...
#[must_use]
pub fn build_ladder(endpoint_count: usize, preferred: Option<SpatialReference>) -> Vec<LadderStep> {
    let encodings = encodings_for(preferred);
    (0..endpoint_count)
        .flat_map(|endpoint| {
            encodings
                .iter()
                .map(move |&(spatial_reference, encoding)| LadderStep {
                    endpoint,
                    spatial_reference,
                    encoding,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projected_steps_come_first() {
        let ladder = build_ladder(1, Some(SpatialReference::Utm10N));
        let order: Vec<(SpatialReference, GeometryEncoding)> = ladder
            .iter()
            .map(|s| (s.spatial_reference, s.encoding))
            .collect();
        assert_eq!(
            order,
            vec![
                (SpatialReference::Utm10N, GeometryEncoding::JsonObject),
                (SpatialReference::Utm10N, GeometryEncoding::PointPair),
                (SpatialReference::Wgs84, GeometryEncoding::JsonObject),
                (SpatialReference::Wgs84, GeometryEncoding::PointPair),
            ]
        );
    }

    #[test]
    fn without_preference_only_wgs84_is_tried() {
        let ladder = build_ladder(1, None);
        assert_eq!(ladder.len(), 2);
        assert!(ladder
            .iter()
            .all(|s| s.spatial_reference == SpatialReference::Wgs84));
    }

    #[test]
    fn wgs84_preference_does_not_duplicate_steps() {
        assert_eq!(build_ladder(1, Some(SpatialReference::Wgs84)).len(), 2);
    }

    #[test]
    fn ladder_repeats_per_endpoint_in_order() {
        let ladder = build_ladder(2, Some(SpatialReference::Utm10N));
        assert_eq!(ladder.len(), 8);
        assert!(ladder[..4].iter().all(|s| s.endpoint == 0));
        assert!(ladder[4..].iter().all(|s| s.endpoint == 1));
        assert_eq!(ladder[4].spatial_reference, SpatialReference::Utm10N);
    }

    #[test]
    fn no_endpoints_means_no_steps() {
        assert!(build_ladder(0, Some(SpatialReference::Utm10N)).is_empty());
    }
}
