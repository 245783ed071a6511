//! Map layer rendering.
//!
//! Paints the visible layers of a `CanvasEngine` onto an egui canvas, back to
//! front. Style layers are drawn from their (filtered) source features with
//! their resolved paint; custom layers are drawn from their scene meshes.

use super::feature::{shapes, Shape};
use super::MapProjection;
use crate::engine::{style_color, style_number, CanvasEngine, LayerSpec, LayerView, LineMesh};
use crate::layers::LayerKind;
use eframe::egui::{
    epaint::PathShape, Align2, Color32, FontId, Painter, Pos2, Stroke, Vec2,
};
use geo_types::Coord;
use geojson::Feature;

/// Renders all visible layers of `engine` to the canvas.
pub fn render_engine(painter: &Painter, engine: &CanvasEngine) {
    let projection = engine.projection();
    for layer in engine.visible_layers() {
        match layer {
            LayerView::Style { spec, features } => {
                for feature in features {
                    render_feature(painter, spec, feature, projection);
                }
            }
            LayerView::Custom { id } => {
                engine.with_meshes(id, |meshes| {
                    for mesh in meshes {
                        render_mesh(painter, mesh, projection);
                    }
                });
            }
        }
    }
}

fn render_feature(
    painter: &Painter,
    spec: &LayerSpec,
    feature: &Feature,
    projection: &MapProjection,
) {
    let Some(geometry) = &feature.geometry else {
        return;
    };

    for shape in shapes(geometry) {
        match (&shape, spec.kind) {
            (Shape::Point(coord), LayerKind::Symbol) => {
                let label = feature
                    .properties
                    .as_ref()
                    .and_then(|p| p.get("name"))
                    .and_then(|v| v.as_str());
                render_symbol(painter, spec, *coord, label, projection);
            }
            (Shape::Point(coord), LayerKind::Heatmap) => {
                render_heat(painter, spec, *coord, projection);
            }
            (Shape::Point(coord), _) => render_circle(painter, spec, *coord, projection),
            (Shape::Line(coords), _) => {
                let stroke = line_stroke(spec);
                render_line_string(painter, coords, projection, stroke);
            }
            (Shape::Polygon { exterior, .. }, LayerKind::Line) => {
                render_line_string(painter, exterior, projection, line_stroke(spec));
            }
            (Shape::Polygon { exterior, .. }, _) => {
                render_polygon(painter, spec, exterior, projection);
            }
        }
    }
}

fn line_stroke(spec: &LayerSpec) -> Stroke {
    let color = style_color(
        &spec.paint,
        "line-color",
        "line-opacity",
        Color32::from_rgb(90, 160, 230),
    );
    Stroke::new(style_number(&spec.paint, "line-width").unwrap_or(1.0), color)
}

fn render_circle(painter: &Painter, spec: &LayerSpec, coord: Coord<f64>, projection: &MapProjection) {
    let pos = projection.geo_to_screen(coord);
    if !painter.clip_rect().expand(20.0).contains(pos) {
        return;
    }

    let radius = style_number(&spec.paint, "circle-radius").unwrap_or(3.0);
    let fill = style_color(
        &spec.paint,
        "circle-color",
        "circle-opacity",
        Color32::from_rgb(245, 200, 96),
    );
    painter.circle_filled(pos, radius, fill);

    let stroke_width = style_number(&spec.paint, "circle-stroke-width").unwrap_or(0.0);
    if stroke_width > 0.0 {
        let stroke_color =
            style_color(&spec.paint, "circle-stroke-color", "", Color32::BLACK);
        painter.circle_stroke(pos, radius, Stroke::new(stroke_width, stroke_color));
    }
}

fn render_heat(painter: &Painter, spec: &LayerSpec, coord: Coord<f64>, projection: &MapProjection) {
    let pos = projection.geo_to_screen(coord);
    let radius = style_number(&spec.paint, "heatmap-radius").unwrap_or(8.0);
    let opacity = style_number(&spec.paint, "heatmap-opacity").unwrap_or(1.0);

    // Concentric discs fake a soft falloff
    for (scale, alpha) in [(1.0, 0.15), (0.6, 0.25), (0.3, 0.4)] {
        let color = Color32::from_rgb(230, 90, 60).gamma_multiply(alpha * opacity);
        painter.circle_filled(pos, radius * scale, color);
    }
}

/// Colors icons by name so distinct images stay distinguishable.
fn icon_color(name: &str) -> Color32 {
    if name.contains("red") {
        Color32::from_rgb(220, 70, 70)
    } else if name.contains("orange") {
        Color32::from_rgb(235, 150, 60)
    } else if name.contains("green") {
        Color32::from_rgb(90, 190, 110)
    } else if name.contains("white") {
        Color32::from_rgb(235, 235, 235)
    } else {
        Color32::from_rgb(120, 170, 240)
    }
}

fn render_symbol(
    painter: &Painter,
    spec: &LayerSpec,
    coord: Coord<f64>,
    label: Option<&str>,
    projection: &MapProjection,
) {
    let pos = projection.geo_to_screen(coord);
    if !painter.clip_rect().expand(20.0).contains(pos) {
        return;
    }

    let size = 6.0 * style_number(&spec.layout, "icon-size").unwrap_or(1.0);
    let icon = spec
        .layout
        .get("icon-image")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let color = icon_color(icon);

    // Triangle marker pointing up
    let points = vec![
        pos + Vec2::new(0.0, -size),
        pos + Vec2::new(size * 0.87, size * 0.5),
        pos + Vec2::new(-size * 0.87, size * 0.5),
    ];
    painter.add(PathShape::convex_polygon(
        points,
        color,
        Stroke::new(1.0, Color32::from_black_alpha(160)),
    ));

    if let Some(text) = label {
        let text_color = style_color(&spec.paint, "text-color", "", Color32::LIGHT_GRAY);
        painter.text(
            Pos2::new(pos.x + size + 2.0, pos.y - 2.0),
            Align2::LEFT_BOTTOM,
            text,
            FontId::proportional(10.0),
            text_color,
        );
    }
}

fn render_polygon(
    painter: &Painter,
    spec: &LayerSpec,
    exterior: &[Coord<f64>],
    projection: &MapProjection,
) {
    if exterior.len() < 3 || !ring_visible(exterior, projection) {
        return;
    }

    let (fill, outline) = if spec.kind == LayerKind::FillExtrusion {
        let color = style_color(
            &spec.paint,
            "fill-extrusion-color",
            "fill-extrusion-opacity",
            Color32::from_rgb(154, 154, 180),
        );
        (color, color)
    } else {
        let fill = style_color(
            &spec.paint,
            "fill-color",
            "fill-opacity",
            Color32::from_rgb(110, 154, 110),
        );
        let outline = style_color(&spec.paint, "fill-outline-color", "", fill);
        (fill, outline)
    };

    let mut points: Vec<Pos2> = exterior.iter().map(|c| projection.geo_to_screen(*c)).collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    // Fills assume convex rings; concave ones would need tessellation
    painter.add(PathShape::convex_polygon(points, fill, Stroke::new(1.0, outline)));
}

fn ring_visible(coords: &[Coord<f64>], projection: &MapProjection) -> bool {
    let (min_lon, max_lon, min_lat, max_lat) = coords.iter().fold(
        (f64::MAX, f64::MIN, f64::MAX, f64::MIN),
        |(min_x, max_x, min_y, max_y), c| {
            (
                min_x.min(c.x),
                max_x.max(c.x),
                min_y.min(c.y),
                max_y.max(c.y),
            )
        },
    );
    projection.bbox_visible(min_lon, min_lat, max_lon, max_lat)
}

/// Renders a line string (route, boundary, etc.).
fn render_line_string(
    painter: &Painter,
    coords: &[Coord<f64>],
    projection: &MapProjection,
    stroke: Stroke,
) {
    if coords.len() < 2 || !ring_visible(coords, projection) {
        return;
    }

    let screen_points: Vec<Pos2> = coords
        .iter()
        .map(|c| projection.geo_to_screen(*c))
        .collect();

    for window in screen_points.windows(2) {
        if let [p1, p2] = window {
            // Skip sub-pixel segments
            let dist_sq = (p2.x - p1.x).powi(2) + (p2.y - p1.y).powi(2);
            if dist_sq > 0.5 {
                painter.line_segment([*p1, *p2], stroke);
            }
        }
    }
}

/// Renders a 3D line mesh with per-vertex colors.
fn render_mesh(painter: &Painter, mesh: &LineMesh, projection: &MapProjection) {
    let points: Vec<Pos2> = mesh.geometry.iter().map(|p| projection.project(*p)).collect();

    for (i, pair) in points.windows(2).enumerate() {
        let color = mesh.color_at(i).gamma_multiply(mesh.opacity.clamp(0.0, 1.0));
        painter.line_segment([pair[0], pair[1]], Stroke::new(mesh.width, color));
    }
}
