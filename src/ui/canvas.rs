//! Central canvas UI: map layers and pointer interaction.

use super::colors::map as colors;
use crate::engine::ClickEvent;
use crate::state::AppState;
use crate::MapManager;
use eframe::egui::{self, Rect, RichText, Sense, Vec2};

/// Renders the map and handles pan, zoom and click.
pub fn render_canvas(ctx: &egui::Context, state: &mut AppState, manager: &mut MapManager) {
    egui::CentralPanel::default().show(ctx, |ui| {
        let available_size = ui.available_size();
        let (response, painter) = ui.allocate_painter(available_size, Sense::click_and_drag());
        let rect = response.rect;

        painter.rect_filled(rect, 0.0, colors::BACKGROUND);

        let Some(engine) = manager.engine_mut() else {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No map loaded",
                egui::FontId::proportional(14.0),
                colors::OVERLAY_TEXT,
            );
            return;
        };

        engine
            .projection_mut()
            .update(state.view.zoom, state.view.pan_offset, rect);
        engine.render_frame();
        crate::geo::render_engine(&painter, engine);

        // The first painted frame stands in for graphics context creation
        engine.set_graphics_ready(true);

        let projection = engine.projection().clone();
        let cursor = response
            .hover_pos()
            .map(|pos| projection.screen_to_geo(pos));
        draw_overlay_info(ui, &rect, state, cursor);

        if let Some(popup) = manager.popup() {
            let anchor = projection.geo_to_screen(popup.lng_lat);
            painter.circle_filled(anchor, 3.0, colors::POPUP_ANCHOR);
        }

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let event = ClickEvent {
                    point: pos,
                    lng_lat: projection.screen_to_geo(pos),
                };
                let hits = manager.on_click(event).map(|p| p.entries.len());
                log::debug!("Click at {:?}: {:?} popup entries", event.lng_lat, hits);
            }
        }

        handle_canvas_interaction(&response, &rect, state);
    });
}

fn draw_overlay_info(
    ui: &mut egui::Ui,
    rect: &Rect,
    state: &AppState,
    cursor: Option<geo_types::Coord<f64>>,
) {
    let overlay_pos = rect.left_top() + Vec2::new(10.0, 10.0);
    let overlay_rect = Rect::from_min_size(overlay_pos, Vec2::new(180.0, 40.0));

    ui.scope_builder(egui::UiBuilder::new().max_rect(overlay_rect), |ui| {
        ui.vertical(|ui| {
            ui.label(
                RichText::new(format!("Zoom: {:.2}x", state.view.zoom))
                    .monospace()
                    .size(12.0)
                    .color(colors::OVERLAY_TEXT),
            );
            if let Some(coord) = cursor {
                ui.label(
                    RichText::new(format!("{:.4}, {:.4}", coord.x, coord.y))
                        .monospace()
                        .size(12.0)
                        .color(colors::OVERLAY_TEXT),
                );
            }
        });
    });
}

fn handle_canvas_interaction(response: &egui::Response, rect: &Rect, state: &mut AppState) {
    if response.dragged() {
        state.view.pan_offset += response.drag_delta();
    }

    // Scroll zooms relative to the cursor position
    if response.hovered() {
        let scroll_delta = response.ctx.input(|i| i.raw_scroll_delta);
        if scroll_delta.y != 0.0 {
            let zoom_factor = 1.0 + scroll_delta.y * 0.001;
            let cursor_rel = response
                .hover_pos()
                .map(|pos| pos - rect.center())
                .unwrap_or(Vec2::ZERO);
            state.view.zoom_around(zoom_factor, cursor_rel);
        }
    }

    if response.double_clicked() {
        state.view.reset();
    }
}
