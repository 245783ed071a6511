//! Feature popup presenter.

use super::colors::ui as colors;
use crate::layers::PopupEntry;
use crate::MapManager;
use eframe::egui::{self, RichText};
use serde_json::Value;

/// Shows the open popup, if any, as a window near its anchor.
pub fn render_popup(ctx: &egui::Context, manager: &mut MapManager) {
    let Some(popup) = manager.popup() else {
        return;
    };
    let Some(projection) = manager.engine().map(|e| e.projection()) else {
        return;
    };

    let anchor = projection.geo_to_screen(popup.lng_lat) + egui::vec2(12.0, -12.0);
    let mut open = true;

    egui::Window::new("Features")
        .id(egui::Id::new("feature_popup"))
        .fixed_pos(anchor)
        .collapsible(false)
        .resizable(false)
        .open(&mut open)
        .show(ctx, |ui| {
            for (i, entry) in popup.entries.iter().enumerate() {
                if i > 0 {
                    ui.separator();
                }
                render_entry(ui, entry);
            }
        });

    if !open {
        manager.remove_popup();
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn render_entry(ui: &mut egui::Ui, entry: &PopupEntry) {
    let title = entry
        .config
        .title
        .clone()
        .unwrap_or_else(|| entry.layer_id.to_string());
    ui.label(RichText::new(title).strong().color(colors::ACTIVE));

    let Some(props) = &entry.feature.properties else {
        return;
    };

    egui::Grid::new(entry.layer_id.as_str())
        .num_columns(2)
        .show(ui, |ui| {
            if entry.config.properties.is_empty() {
                for (key, value) in props {
                    ui.label(RichText::new(key).color(colors::LABEL));
                    ui.label(RichText::new(format_value(value)).color(colors::VALUE));
                    ui.end_row();
                }
            } else {
                for property in &entry.config.properties {
                    let value = props.get(&property.key).map(format_value);
                    ui.label(RichText::new(&property.name).color(colors::LABEL));
                    ui.label(
                        RichText::new(value.unwrap_or_else(|| "-".to_string()))
                            .color(colors::VALUE),
                    );
                    ui.end_row();
                }
            }
        });
}
