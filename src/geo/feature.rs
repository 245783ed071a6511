//! GeoJSON geometry flattening and hit-testing.

use super::MapProjection;
use eframe::egui::Pos2;
use geo_types::Coord;
use geojson::{Geometry, Value};

/// A drawable primitive extracted from a GeoJSON geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Coord<f64>),
    Line(Vec<Coord<f64>>),
    Polygon {
        exterior: Vec<Coord<f64>>,
        holes: Vec<Vec<Coord<f64>>>,
    },
}

fn coord(position: &[f64]) -> Option<Coord<f64>> {
    Some(Coord {
        x: *position.first()?,
        y: *position.get(1)?,
    })
}

fn line(positions: &[Vec<f64>]) -> Vec<Coord<f64>> {
    positions.iter().filter_map(|p| coord(p)).collect()
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> Option<Shape> {
    let (exterior, holes) = rings.split_first()?;
    Some(Shape::Polygon {
        exterior: line(exterior),
        holes: holes.iter().map(|ring| line(ring)).collect(),
    })
}

/// Flattens a geometry into shapes. Multi-geometries and collections
/// contribute one shape per member; malformed positions are dropped.
pub fn shapes(geometry: &Geometry) -> Vec<Shape> {
    let mut out = Vec::new();
    collect_shapes(&geometry.value, &mut out);
    out
}

fn collect_shapes(value: &Value, out: &mut Vec<Shape>) {
    match value {
        Value::Point(p) => out.extend(coord(p).map(Shape::Point)),
        Value::MultiPoint(points) => {
            out.extend(points.iter().filter_map(|p| coord(p)).map(Shape::Point));
        }
        Value::LineString(coords) => out.push(Shape::Line(line(coords))),
        Value::MultiLineString(lines) => {
            out.extend(lines.iter().map(|l| Shape::Line(line(l))));
        }
        Value::Polygon(rings) => out.extend(polygon(rings)),
        Value::MultiPolygon(polygons) => {
            out.extend(polygons.iter().filter_map(|rings| polygon(rings)));
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_shapes(&g.value, out);
            }
        }
    }
}

/// Distance in pixels from `p` to the segment `a`-`b`.
pub fn distance_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Even-odd point-in-ring test in screen space.
pub fn point_in_ring(p: Pos2, ring: &[Pos2]) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Whether `point` strikes `shape` as drawn under `projection`.
///
/// Points and lines are hit within `tolerance` pixels; polygons are hit
/// inside their exterior ring and outside every hole.
pub fn hit_test(shape: &Shape, projection: &MapProjection, point: Pos2, tolerance: f32) -> bool {
    let project = |coords: &[Coord<f64>]| -> Vec<Pos2> {
        coords.iter().map(|c| projection.geo_to_screen(*c)).collect()
    };

    match shape {
        Shape::Point(c) => projection.geo_to_screen(*c).distance(point) <= tolerance,
        Shape::Line(coords) => {
            let pts = project(coords);
            match pts.as_slice() {
                [single] => single.distance(point) <= tolerance,
                _ => pts
                    .windows(2)
                    .any(|w| distance_to_segment(point, w[0], w[1]) <= tolerance),
            }
        }
        Shape::Polygon { exterior, holes } => {
            point_in_ring(point, &project(exterior))
                && !holes.iter().any(|h| point_in_ring(point, &project(h)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{Rect, Vec2};

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Vec<f64>> {
        vec![
            vec![x0, y0],
            vec![x0 + size, y0],
            vec![x0 + size, y0 + size],
            vec![x0, y0 + size],
            vec![x0, y0],
        ]
    }

    fn projection() -> MapProjection {
        let mut projection = MapProjection::new(0.0, 0.0);
        projection.update(
            1.0,
            Vec2::ZERO,
            Rect::from_min_size(Pos2::ZERO, Vec2::new(400.0, 400.0)),
        );
        projection
    }

    #[test]
    fn test_shapes_flatten_multi_geometries() {
        let geometry = Geometry::new(Value::GeometryCollection(vec![
            Geometry::new(Value::MultiPoint(vec![vec![0.0, 0.0], vec![1.0, 1.0]])),
            Geometry::new(Value::Polygon(vec![square(0.0, 0.0, 1.0)])),
            Geometry::new(Value::Point(vec![5.0])),
        ]));

        let shapes = shapes(&geometry);
        assert_eq!(shapes.len(), 3);
        assert_eq!(shapes[1], Shape::Point(Coord { x: 1.0, y: 1.0 }));
        assert!(matches!(shapes[2], Shape::Polygon { .. }));
    }

    #[test]
    fn test_distance_to_segment() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);
        assert_eq!(distance_to_segment(Pos2::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_to_segment(Pos2::new(13.0, 4.0), a, b), 5.0);
        assert_eq!(distance_to_segment(Pos2::new(3.0, 4.0), a, a), 5.0);
    }

    #[test]
    fn test_polygon_with_hole() {
        let projection = projection();
        let shape = polygon(&[square(-1.0, -1.0, 2.0), square(-0.5, -0.5, 1.0)]).unwrap();

        let inside_hole = projection.geo_to_screen(Coord { x: 0.0, y: 0.0 });
        let inside_ring = projection.geo_to_screen(Coord { x: 0.75, y: 0.75 });
        let outside = projection.geo_to_screen(Coord { x: 1.5, y: 0.0 });

        assert!(!hit_test(&shape, &projection, inside_hole, 0.0));
        assert!(hit_test(&shape, &projection, inside_ring, 0.0));
        assert!(!hit_test(&shape, &projection, outside, 0.0));
    }

    #[test]
    fn test_point_and_line_tolerance() {
        let projection = projection();
        let origin = projection.geo_to_screen(Coord { x: 0.0, y: 0.0 });

        let point = Shape::Point(Coord { x: 0.0, y: 0.0 });
        assert!(hit_test(&point, &projection, origin + Vec2::new(3.0, 0.0), 4.0));
        assert!(!hit_test(&point, &projection, origin + Vec2::new(5.0, 0.0), 4.0));

        let line = Shape::Line(vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }]);
        assert!(hit_test(&line, &projection, origin + Vec2::new(10.0, 2.0), 3.0));
        assert!(!hit_test(&line, &projection, origin + Vec2::new(10.0, 8.0), 3.0));
    }
}
