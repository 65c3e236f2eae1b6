use bevy::{
    prelude::*,
    winit::{UpdateMode, WinitSettings},
};

use bevy_egui::EguiPlugin;
use camera::CameraSystemPlugin;
use debug::DebugPlugin;
use panel::PanelPlugin;
use venue::VenuePlugin;

pub mod camera;
pub mod debug;
pub mod imagery;
pub mod panel;
pub mod types;
pub mod venue;

/// Venue shown when the viewer starts.
pub const STARTING_VENUE: &str = "umeda-station";

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Indoor Map Viewer".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }))
        .add_plugins(DebugPlugin)
        .add_plugins(EguiPlugin {
            enable_multipass_for_primary_context: false,
        })
        .insert_resource(EguiBlockInputState::default())
        .add_plugins(CameraSystemPlugin)
        .insert_resource(WinitSettings {
            unfocused_mode: UpdateMode::Reactive {
                wait: std::time::Duration::from_secs(1),
                react_to_device_events: true,
                react_to_user_events: true,
                react_to_window_events: true,
            },
            ..Default::default()
        })
        .insert_resource(ClearColor(Color::from(Srgba {
            red: 0.08,
            green: 0.09,
            blue: 0.12,
            alpha: 1.0,
        })))
        .add_plugins(VenuePlugin)
        .add_plugins(PanelPlugin)
        .add_systems(Update, absorb_egui_inputs)
        .run();
}

#[derive(Resource, Default)]
pub struct EguiBlockInputState {
    pub block_input: bool,
}

fn absorb_egui_inputs(
    mut contexts: bevy_egui::EguiContexts,
    mut state: ResMut<EguiBlockInputState>,
) {
    let ctx = contexts.ctx_mut();
    state.block_input = ctx.wants_pointer_input() || ctx.is_pointer_over_area();
}
