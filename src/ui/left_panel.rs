//! Left panel UI: map components, filters and settings.

use super::colors::ui as colors;
use crate::state::{AppState, MapComponent};
use crate::MapManager;
use eframe::egui::{self, RichText};
use serde_json::Value;

pub fn render_left_panel(ctx: &egui::Context, state: &mut AppState, manager: &mut MapManager) {
    egui::SidePanel::left("left_panel")
        .resizable(true)
        .default_width(260.0)
        .min_width(200.0)
        .max_width(400.0)
        .show(ctx, |ui| {
            ui.heading("Layers");
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                for component in &mut state.catalog.components {
                    render_component(ui, component, manager);
                    ui.add_space(6.0);
                }

                ui.separator();
                if ui.button("Clear all layers").clicked() {
                    state.clear_requested = true;
                }

                ui.add_space(10.0);
                render_settings(ui, state, manager);
            });
        });
}

fn render_component(ui: &mut egui::Ui, component: &mut MapComponent, manager: &mut MapManager) {
    ui.group(|ui| {
        let mut enabled = component.enabled;
        if ui
            .checkbox(&mut enabled, RichText::new(&component.name).strong())
            .changed()
        {
            component.enabled = enabled;
            if enabled {
                log::info!("Turning on {}", component.name);
                manager.add_layers(component.layers.clone());
            } else {
                log::info!("Turning off {}", component.name);
                manager.turn_off_layers(&component.layers);
                component.selected_filter = None;
            }
        }

        if !component.description.is_empty() {
            ui.label(
                RichText::new(&component.description)
                    .small()
                    .color(colors::LABEL),
            );
        }

        let loading = component
            .layers
            .iter()
            .any(|c| manager.registry().pending().is_pending(c.layer_id().as_str()));
        if loading {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(RichText::new("Loading...").small());
            });
        }

        let Some(filter) = component.filter.clone() else {
            return;
        };
        ui.add_enabled_ui(component.enabled, |ui| {
            let current = component
                .selected_filter
                .clone()
                .unwrap_or_else(|| "All".to_string());
            let mut selected = component.selected_filter.clone();

            egui::ComboBox::from_id_salt(&component.name)
                .selected_text(format!("{}: {}", filter.property, current))
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut selected, None, "All");
                    for option in &filter.options {
                        ui.selectable_value(&mut selected, Some(option.clone()), option);
                    }
                });

            if selected != component.selected_filter {
                for config in &component.layers {
                    let id = config.layer_id();
                    match &selected {
                        Some(value) => manager.add_layer_filter(
                            id.as_str(),
                            &filter.property,
                            Value::String(value.clone()),
                        ),
                        None => manager.clear_layer_filter(id.as_str()),
                    }
                }
                component.selected_filter = selected;
            }
        });
    });
}

fn render_settings(ui: &mut egui::Ui, state: &mut AppState, manager: &mut MapManager) {
    egui::CollapsingHeader::new("Settings").show(ui, |ui| {
        let settings = &mut state.settings;

        ui.horizontal(|ui| {
            ui.label(RichText::new("Arc intervals").color(colors::LABEL));
            ui.add(egui::Slider::new(&mut settings.arc_intervals, 1..=64));
        });
        ui.horizontal(|ui| {
            ui.label(RichText::new("Popup layers").color(colors::LABEL));
            ui.add(egui::Slider::new(&mut settings.popup_max_layers, 1..=10));
        });
        ui.horizontal(|ui| {
            ui.label(RichText::new("Attach grace (ms)").color(colors::LABEL));
            let grace = if state.is_mobile {
                &mut settings.mobile_grace_ms
            } else {
                &mut settings.desktop_grace_ms
            };
            ui.add(egui::DragValue::new(grace).range(0..=10_000));
        });
        ui.horizontal(|ui| {
            ui.label(RichText::new("Data URL").color(colors::LABEL));
            ui.text_edit_singleline(&mut settings.data_base_url);
        });

        ui.horizontal(|ui| {
            if ui.button("Apply").clicked() {
                manager.set_options(settings.manager_options(state.is_mobile));
                state.status_message = "Settings applied".to_string();
            }
            if ui.button("Save").clicked() {
                settings.save();
                state.status_message = "Settings saved".to_string();
            }
            if ui
                .button(RichText::new("Reload map").color(colors::ACTIVE))
                .clicked()
            {
                state.reload_requested = true;
            }
        });
    });
}
