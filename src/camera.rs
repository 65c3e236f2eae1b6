use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;

use crate::EguiBlockInputState;

pub struct CameraSystemPlugin;

impl Plugin for CameraSystemPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OrbitState>()
            .add_systems(Startup, setup_camera)
            .add_systems(Update, orbit_camera);
    }
}

/// Spherical-orbit rig around the scene origin, where every venue is
/// re-centered to.
#[derive(Resource)]
struct OrbitState {
    yaw: f32,
    pitch: f32,
    distance: f32,
}

impl Default for OrbitState {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.9,
            distance: 700.0,
        }
    }
}

fn setup_camera(mut commands: Commands, state: Res<OrbitState>) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(orbit_translation(&state)).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 9_000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -1.1, 0.6, 0.0)),
    ));
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 250.0,
        ..default()
    });
}

fn orbit_camera(
    mut state: ResMut<OrbitState>,
    buttons: Res<ButtonInput<MouseButton>>,
    mut motion: EventReader<MouseMotion>,
    mut scroll: EventReader<MouseWheel>,
    block: Res<EguiBlockInputState>,
    mut camera: Query<&mut Transform, With<Camera3d>>,
) {
    if block.block_input {
        motion.clear();
        scroll.clear();
        return;
    }

    let dragging = buttons.pressed(MouseButton::Middle) || buttons.pressed(MouseButton::Right);
    for event in motion.read() {
        if dragging {
            state.yaw -= event.delta.x * 0.005;
            state.pitch = (state.pitch + event.delta.y * 0.005).clamp(0.1, 1.5);
        }
    }
    for event in scroll.read() {
        state.distance = (state.distance * (1.0 - event.y * 0.1)).clamp(40.0, 5_000.0);
    }

    let Ok(mut transform) = camera.single_mut() else {
        return;
    };
    *transform =
        Transform::from_translation(orbit_translation(&state)).looking_at(Vec3::ZERO, Vec3::Y);
}

fn orbit_translation(state: &OrbitState) -> Vec3 {
    Vec3::new(
        state.distance * state.pitch.cos() * state.yaw.sin(),
        state.distance * state.pitch.sin(),
        state.distance * state.pitch.cos() * state.yaw.cos(),
    )
}
