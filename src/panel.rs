use bevy::prelude::*;
use bevy_egui::{
    egui::{self, RichText},
    EguiContexts, EguiPreUpdateSet,
};

use crate::types::VenueRegistry;
use crate::venue::{LoadTracker, VenueSelected, VenueSession, ViewToggles};

pub struct PanelPlugin;

impl Plugin for PanelPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, venue_panel.after(EguiPreUpdateSet::InitContexts));
    }
}

fn venue_panel(
    mut contexts: EguiContexts,
    registry: Res<VenueRegistry>,
    session: Res<VenueSession>,
    tracker: Res<LoadTracker>,
    mut toggles: ResMut<ViewToggles>,
    mut events: EventWriter<VenueSelected>,
) {
    let ctx = contexts.ctx_mut();

    let panel_width = 210.0;
    let panel_pos = egui::pos2(10.0, 10.0);

    egui::Area::new("venue_panel".into())
        .fixed_pos(panel_pos)
        .show(ctx, |ui| {
            egui::Frame::new()
                .fill(egui::Color32::from_rgba_premultiplied(30, 30, 30, 255))
                .corner_radius(10.0)
                .shadow(egui::epaint::Shadow {
                    color: egui::Color32::from_black_alpha(60),
                    offset: [5, 5],
                    blur: 10,
                    spread: 5,
                })
                .show(ui, |ui| {
                    ui.set_width(panel_width);
                    ui.spacing_mut().item_spacing = egui::vec2(8.0, 10.0);

                    let mut selected = session.key.clone();
                    egui::ComboBox::from_label("Venue")
                        .selected_text(selected.as_deref().unwrap_or("— none —").to_string())
                        .show_ui(ui, |ui| {
                            for key in registry.keys() {
                                ui.selectable_value(&mut selected, Some(key.clone()), key);
                            }
                        });
                    if selected != session.key {
                        events.write(VenueSelected(selected));
                    }

                    if session.missing {
                        ui.label(
                            RichText::new("No data for this venue")
                                .color(egui::Color32::from_rgb(220, 120, 120)),
                        );
                    } else if tracker.total() > 0 && !tracker.is_settled() {
                        ui.label(format!(
                            "Loading: {} of {} remaining",
                            tracker.remaining(),
                            tracker.total()
                        ));
                    } else if tracker.total() > 0 {
                        ui.label("Loaded");
                    }

                    ui.separator();

                    let floor_keys: Vec<i32> = toggles.floors.keys().copied().collect();
                    for floor in floor_keys {
                        if let Some(on) = toggles.floors.get_mut(&floor) {
                            let label = if floor < 0 {
                                format!("Floor B{}", -floor)
                            } else {
                                format!("Floor {}", floor)
                            };
                            ui.checkbox(on, label);
                        }
                    }
                    if let Some(on) = toggles.network.as_mut() {
                        ui.checkbox(on, "Pedestrian network");
                    }
                    if let Some(on) = toggles.imagery.as_mut() {
                        ui.checkbox(on, "Aerial imagery");
                    }

                    if let Some(venue) = &session.descriptor {
                        if !venue.attribution.text.is_empty() {
                            ui.separator();
                            ui.hyperlink_to(
                                RichText::new(&venue.attribution.text).small(),
                                &venue.attribution.url,
                            );
                        }
                    }
                });
        });
}
