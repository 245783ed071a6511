//! Generated demo datasets.
//!
//! Used by native builds when no dataset directory is configured, so the
//! workbench has something to show. Positions are laid out deterministically
//! around a fixed center.

use super::MemorySource;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;
use std::f64::consts::TAU;

/// Center of the generated data (lon, lat).
pub const SAMPLE_CENTER: (f64, f64) = (121.54, 25.05);

fn feature(geometry: Value, properties: serde_json::Value) -> Feature {
    let properties: Option<JsonObject> = properties.as_object().cloned();
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geometry)),
        id: None,
        properties,
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Point events with a magnitude and a depth class.
pub fn earthquakes(count: usize) -> FeatureCollection {
    let (lon0, lat0) = SAMPLE_CENTER;
    let features = (0..count)
        .map(|i| {
            let t = i as f64;
            // Golden-angle spiral spreads points evenly
            let angle = t * 2.399_963;
            let radius = 0.01 * t.sqrt();
            let magnitude = 2.0 + (t * 0.73).sin().abs() * 4.0;
            let depth = if i % 3 == 0 { "shallow" } else { "deep" };
            feature(
                Value::Point(vec![
                    lon0 + radius * angle.cos(),
                    lat0 + radius * angle.sin(),
                ]),
                json!({
                    "name": format!("Event {}", i + 1),
                    "magnitude": (magnitude * 10.0).round() / 10.0,
                    "depth": depth
                }),
            )
        })
        .collect();
    collection(features)
}

/// Two-point flows from a hub to stations around it.
pub fn commute_flows(count: usize) -> FeatureCollection {
    let (lon0, lat0) = SAMPLE_CENTER;
    let features = (0..count)
        .map(|i| {
            let angle = TAU * i as f64 / count.max(1) as f64;
            let reach = 0.05 + 0.03 * ((i % 4) as f64);
            let mode = if i % 2 == 0 { "metro" } else { "bus" };
            feature(
                Value::LineString(vec![
                    vec![lon0, lat0],
                    vec![lon0 + reach * angle.cos(), lat0 + reach * angle.sin()],
                ]),
                json!({
                    "name": format!("Route {}", i + 1),
                    "mode": mode,
                    "riders": 1000 + 250 * i
                }),
            )
        })
        .collect();
    collection(features)
}

/// Square districts on a grid.
pub fn districts(columns: usize, rows: usize) -> FeatureCollection {
    let (lon0, lat0) = SAMPLE_CENTER;
    let size = 0.04;
    let mut features = Vec::with_capacity(columns * rows);

    for row in 0..rows {
        for col in 0..columns {
            let west = lon0 - size * columns as f64 / 2.0 + size * col as f64;
            let south = lat0 - size * rows as f64 / 2.0 + size * row as f64;
            let ring = vec![
                vec![west, south],
                vec![west + size, south],
                vec![west + size, south + size],
                vec![west, south + size],
                vec![west, south],
            ];
            features.push(feature(
                Value::Polygon(vec![ring]),
                json!({
                    "name": format!("District {}{}", (b'A' + row as u8) as char, col + 1),
                    "population": 20000 + 1500 * (row * columns + col)
                }),
            ));
        }
    }

    collection(features)
}

/// Bike stations along a line through the center.
pub fn bike_stations(count: usize) -> FeatureCollection {
    let (lon0, lat0) = SAMPLE_CENTER;
    let features = (0..count)
        .map(|i| {
            let t = i as f64 / count.max(1) as f64 - 0.5;
            let status = match i % 3 {
                0 => "available",
                1 => "low",
                _ => "empty",
            };
            feature(
                Value::Point(vec![lon0 + t * 0.2, lat0 - t * 0.08]),
                json!({ "name": format!("Station {}", i + 1), "status": status }),
            )
        })
        .collect();
    collection(features)
}

/// Memory source with every demo dataset under its index.
pub fn sample_source() -> MemorySource {
    MemorySource::new()
        .with("earthquake", earthquakes(60))
        .with("commute_flow", commute_flows(12))
        .with("district", districts(4, 3))
        .with("bike_station", bike_stations(15))
}
