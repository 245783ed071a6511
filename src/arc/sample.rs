//! Arc waypoint sampling.
//!
//! An arc between two geographic endpoints is approximated by linearly
//! stepping longitude and latitude while raising the elevation along a
//! half-sine profile: zero at both ends, highest at the midpoint.

use geo_types::Coord;
use geojson::{Feature, FeatureCollection, Geometry, Value};
use glam::DVec3;
use std::f64::consts::PI;

/// Number of intervals an arc is split into by default.
pub const DEFAULT_ARC_INTERVALS: usize = 20;

/// Peak elevation in meters per unit of `sqrt(|Δlng·Δlat|)`.
pub const ELEVATION_SCALE: f64 = 80_000.0;

/// Samples `intervals + 1` waypoints (lng, lat, elevation) from `start` to `end`.
pub fn sample_arc(start: Coord<f64>, end: Coord<f64>, intervals: usize) -> Vec<DVec3> {
    let intervals = intervals.max(1);
    let n = intervals as f64;

    let lng_diff = end.x - start.x;
    let lat_diff = end.y - start.y;
    let lng_step = lng_diff / n;
    let lat_step = lat_diff / n;
    let peak = (lng_diff * lat_diff).abs().sqrt() * ELEVATION_SCALE;

    (0..=intervals)
        .map(|j| {
            let j = j as f64;
            let elevation = (PI * j / n).sin() * peak;
            DVec3::new(start.x + lng_step * j, start.y + lat_step * j, elevation)
        })
        .collect()
}

/// A sampled arc and the feature it was built from.
///
/// The feature's geometry has been replaced by the 3D waypoints.
#[derive(Debug, Clone)]
pub struct ArcLine {
    pub feature: Feature,
    pub waypoints: Vec<DVec3>,
}

/// Returns the start and end coordinate of a two-point feature.
pub fn endpoints(feature: &Feature) -> Option<(Coord<f64>, Coord<f64>)> {
    let positions = match &feature.geometry.as_ref()?.value {
        Value::LineString(coords) | Value::MultiPoint(coords) => coords,
        _ => return None,
    };

    let to_coord = |p: &Vec<f64>| -> Option<Coord<f64>> {
        Some(Coord {
            x: *p.first()?,
            y: *p.get(1)?,
        })
    };

    let start = to_coord(positions.first()?)?;
    let end = to_coord(positions.get(1)?)?;
    Some((start, end))
}

/// Samples every two-point feature of a collection.
///
/// Features that do not have two endpoints are skipped.
pub fn sample_collection(collection: &FeatureCollection, intervals: usize) -> Vec<ArcLine> {
    let mut lines = Vec::with_capacity(collection.features.len());

    for (idx, feature) in collection.features.iter().enumerate() {
        let Some((start, end)) = endpoints(feature) else {
            log::warn!("Skipping arc feature {}: expected two endpoints", idx);
            continue;
        };

        let waypoints = sample_arc(start, end, intervals);
        let mut feature = feature.clone();
        feature.geometry = Some(Geometry::new(Value::LineString(
            waypoints.iter().map(|w| vec![w.x, w.y, w.z]).collect(),
        )));

        lines.push(ArcLine { feature, waypoints });
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_point_feature(start: [f64; 2], end: [f64; 2]) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::LineString(vec![
                start.to_vec(),
                end.to_vec(),
            ]))),
            id: None,
            properties: None,
            foreign_members: None,
        }
    }

    #[test]
    fn test_flat_arc_for_same_latitude() {
        let points = sample_arc(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 0.0 }, 20);

        assert_eq!(points.len(), 21);
        assert_eq!(points[0].z, 0.0);
        assert_eq!(points[10].z, 0.0);
        assert_eq!(points[20].z, 0.0);
        assert!((points[10].x - 5.0).abs() < 1e-9);
        assert!((points[20].x - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_half_sine_profile() {
        let points = sample_arc(Coord { x: 121.0, y: 25.0 }, Coord { x: 122.0, y: 26.0 }, 20);
        let peak = 1.0_f64.sqrt() * ELEVATION_SCALE;

        assert!(points[0].z.abs() < 1e-6);
        assert!((points[10].z - peak).abs() < 1e-6);
        assert!(points[20].z.abs() < 1e-6);

        for j in 0..=20 {
            assert!((points[j].z - points[20 - j].z).abs() < 1e-6);
            assert!(points[j].z <= points[10].z + 1e-6);
        }
    }

    #[test]
    fn test_waypoints_are_monotonic() {
        let points = sample_arc(Coord { x: 10.0, y: 5.0 }, Coord { x: 2.0, y: 9.0 }, 8);
        assert_eq!(points.len(), 9);
        for pair in points.windows(2) {
            assert!(pair[1].x < pair[0].x);
            assert!(pair[1].y > pair[0].y);
        }
        assert!((points[8].x - 2.0).abs() < 1e-9);
        assert!((points[8].y - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_intervals_clamped() {
        let points = sample_arc(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }, 0);
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn test_sample_collection_replaces_geometry() {
        let collection = FeatureCollection {
            bbox: None,
            features: vec![
                two_point_feature([0.0, 0.0], [4.0, 4.0]),
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::Point(vec![1.0, 1.0]))),
                    id: None,
                    properties: None,
                    foreign_members: None,
                },
            ],
            foreign_members: None,
        };

        let lines = sample_collection(&collection, 20);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].waypoints.len(), 21);

        match &lines[0].feature.geometry.as_ref().unwrap().value {
            Value::LineString(coords) => {
                assert_eq!(coords.len(), 21);
                assert_eq!(coords[0].len(), 3);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }
}
