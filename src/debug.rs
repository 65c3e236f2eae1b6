use bevy::{
    color::palettes::css::GOLD,
    diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin},
    prelude::*,
};

pub struct DebugPlugin;

impl Plugin for DebugPlugin {
    fn build(&self, app: &mut App) {
        if cfg!(debug_assertions) {
            app.add_plugins(FrameTimeDiagnosticsPlugin::default())
                .add_systems(Startup, spawn_overlay)
                .add_systems(Update, (update_fps, update_entity_count));
        }
    }
}

#[derive(Component)]
struct FpsText;

#[derive(Component)]
struct EntityText;

fn spawn_overlay(mut commands: Commands) {
    commands
        .spawn((
            Text::new("FPS: "),
            TextFont {
                font_size: 18.0,
                ..default()
            },
            Node {
                position_type: PositionType::Absolute,
                top: Val::Px(5.0),
                right: Val::Px(5.0),
                ..default()
            },
        ))
        .with_child((
            TextSpan::default(),
            TextFont {
                font_size: 16.0,
                ..default()
            },
            TextColor(GOLD.into()),
            FpsText,
        ));

    commands
        .spawn((
            Text::new("Entities: "),
            TextFont {
                font_size: 18.0,
                ..default()
            },
            Node {
                position_type: PositionType::Absolute,
                bottom: Val::Px(5.0),
                right: Val::Px(5.0),
                ..default()
            },
        ))
        .with_child((
            TextSpan::default(),
            TextFont {
                font_size: 16.0,
                ..default()
            },
            TextColor(GOLD.into()),
            EntityText,
        ));
}

fn update_fps(
    diagnostics: Res<DiagnosticsStore>,
    mut query: Query<&mut TextSpan, With<FpsText>>,
) {
    for mut span in &mut query {
        if let Some(fps) = diagnostics
            .get(&FrameTimeDiagnosticsPlugin::FPS)
            .and_then(|fps| fps.smoothed())
        {
            **span = format!("{fps:.2}");
        }
    }
}

fn update_entity_count(
    entities: Query<Entity>,
    mut query: Query<&mut TextSpan, With<EntityText>>,
) {
    for mut span in &mut query {
        **span = format!("{}", entities.iter().count());
    }
}
