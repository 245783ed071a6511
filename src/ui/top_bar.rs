//! Top bar UI: app title, loading indicator and status.

use super::colors::ui as colors;
use crate::state::AppState;
use crate::MapManager;
use eframe::egui::{self, Color32, RichText};

pub fn render_top_bar(ctx: &egui::Context, state: &AppState, manager: &MapManager) {
    egui::TopBottomPanel::top("top_bar")
        .exact_height(36.0)
        .show(ctx, |ui| {
            ui.horizontal_centered(|ui| {
                ui.label(
                    RichText::new("Map Layer Workbench")
                        .strong()
                        .size(16.0)
                        .color(Color32::WHITE),
                );

                ui.separator();

                let pending = manager.registry().pending();
                if pending.is_loading() {
                    ui.spinner();
                    ui.label(
                        RichText::new(format!("Loading ({})", pending.len()))
                            .size(13.0)
                            .color(colors::LOADING),
                    );
                } else {
                    ui.label(
                        RichText::new(&state.status_message)
                            .size(13.0)
                            .color(Color32::GRAY),
                    );
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let registry = manager.registry();
                    ui.label(
                        RichText::new(format!(
                            "{} visible / {} layers",
                            registry.visible().len(),
                            registry.existing().len()
                        ))
                        .size(12.0)
                        .color(colors::LABEL),
                    );
                });
            });
        });
}
