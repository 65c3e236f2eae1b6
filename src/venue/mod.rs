use std::collections::HashMap;

use bevy::asset::RenderAssetUsages;
use bevy::math::DVec2;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::imagery::{self, FetchedTexture, ImageryPlaneSpec};
use crate::types::{VenueDescriptor, VenueRegistry};

pub mod center;
pub mod floors;
pub mod loader;
pub mod mesh;
pub mod network;
pub mod progress;

pub use floors::{DatasetKind, FloorGroup, NetworkGroup, TerrainGroup, ViewToggles};
pub use progress::LoadTracker;

use floors::{floor_elevation, FLOOR_SPACING};
use loader::SceneFeature;

/// Everything the worker threads report back to the scene. Every message
/// carries the session generation it was produced for; drain drops messages
/// from discarded sessions so a late fetch can never touch a torn-down scene.
pub enum SceneMessage {
    OriginResolved {
        generation: u64,
        origin: DVec2,
    },
    FileLoaded {
        generation: u64,
        file: String,
        floor: i32,
        kind: DatasetKind,
        features: Vec<SceneFeature>,
    },
    NetworkLoaded {
        generation: u64,
        segments: Vec<[Vec3; 2]>,
    },
    ImageryAligned {
        generation: u64,
        plane: Option<ImageryPlaneSpec>,
    },
}

impl SceneMessage {
    fn generation(&self) -> u64 {
        match self {
            SceneMessage::OriginResolved { generation, .. }
            | SceneMessage::FileLoaded { generation, .. }
            | SceneMessage::NetworkLoaded { generation, .. }
            | SceneMessage::ImageryAligned { generation, .. } => *generation,
        }
    }
}

#[derive(Resource)]
pub struct SceneStream {
    pub tx: Sender<SceneMessage>,
    rx: Receiver<SceneMessage>,
}

/// State of the active venue session. The origin is written once per
/// session, before any geometry load is dispatched, and only read afterward.
#[derive(Resource, Default)]
pub struct VenueSession {
    pub generation: u64,
    pub key: Option<String>,
    pub descriptor: Option<VenueDescriptor>,
    pub origin: Option<DVec2>,
    /// The selected key had no manifest entry ("no data" state).
    pub missing: bool,
}

/// Owned handles to the session's scene groups, keyed by typed identifiers
/// rather than name strings.
#[derive(Resource, Default)]
pub struct SceneGroups {
    pub floors: HashMap<i32, Entity>,
    pub network: Option<Entity>,
    pub terrain: Option<Entity>,
}

#[derive(Event, Debug, Clone)]
pub struct VenueSelected(pub Option<String>);

pub struct VenuePlugin;

impl Plugin for VenuePlugin {
    fn build(&self, app: &mut App) {
        let (tx, rx): (Sender<SceneMessage>, Receiver<SceneMessage>) = bounded(64);
        app.insert_resource(SceneStream { tx, rx })
            .insert_resource(VenueRegistry::default())
            .init_resource::<VenueSession>()
            .init_resource::<SceneGroups>()
            .init_resource::<ViewToggles>()
            .init_resource::<LoadTracker>()
            .add_event::<VenueSelected>()
            .add_systems(Startup, (load_external_manifest, select_starting_venue).chain())
            .add_systems(Update, (switch_venue, drain_scene_messages).chain())
            .add_systems(Update, sync_group_visibility);
    }
}

/// Venues beyond the built-ins can ship as a JSON manifest next to the
/// binary's assets.
fn load_external_manifest(mut registry: ResMut<VenueRegistry>) {
    let manifest = std::path::Path::new("assets/venues.json");
    if manifest.exists() {
        match registry.merge_manifest(manifest) {
            Ok(count) => info!("merged {} venue(s) from {}", count, manifest.display()),
            Err(e) => warn!("could not read {}: {}", manifest.display(), e),
        }
    }
}

fn select_starting_venue(mut events: EventWriter<VenueSelected>) {
    events.write(VenueSelected(Some(crate::STARTING_VENUE.to_string())));
}

/// Tears down the previous session and starts the next one. No geometry
/// load is dispatched until the scene origin is known: declared centers
/// dispatch immediately, computed centers wait for the resolver's message.
fn switch_venue(
    mut commands: Commands,
    mut events: EventReader<VenueSelected>,
    registry: Res<VenueRegistry>,
    mut session: ResMut<VenueSession>,
    mut groups: ResMut<SceneGroups>,
    mut toggles: ResMut<ViewToggles>,
    mut tracker: ResMut<LoadTracker>,
    stream: Res<SceneStream>,
) {
    let Some(VenueSelected(key)) = events.read().last().cloned() else {
        return;
    };
    if key == session.key && session.descriptor.is_some() {
        return;
    }

    for (_, entity) in groups.floors.drain() {
        commands.entity(entity).despawn();
    }
    if let Some(entity) = groups.network.take() {
        commands.entity(entity).despawn();
    }
    if let Some(entity) = groups.terrain.take() {
        commands.entity(entity).despawn();
    }
    toggles.clear();
    tracker.reset(0);
    session.generation += 1;
    session.origin = None;
    session.descriptor = None;
    session.missing = false;
    session.key = key.clone();

    let Some(key) = key else {
        return;
    };
    let Some(venue) = registry.get(&key) else {
        warn!("no venue data for key '{}'", key);
        session.missing = true;
        return;
    };

    info!(
        "loading venue '{}': {} tracked operations",
        key,
        venue.expected_loads()
    );
    tracker.reset(venue.expected_loads());
    session.descriptor = Some(venue.clone());

    if let Some(origin) = venue.declared_center() {
        session.origin = Some(origin);
        dispatch_loads(venue, origin, session.generation, &stream.tx);
    } else {
        center::spawn_center_resolution(venue, session.generation, stream.tx.clone());
    }
}

fn dispatch_loads(
    venue: &VenueDescriptor,
    origin: DVec2,
    generation: u64,
    tx: &Sender<SceneMessage>,
) {
    for file in &venue.geo_files {
        loader::spawn_file_load(venue, file.clone(), origin, generation, tx.clone());
    }
    network::spawn_network_load(venue, origin, generation, tx.clone());
    imagery::spawn_imagery_load(venue, origin, generation, tx.clone());
}

/// Drains worker results into the scene. Completions arrive in any order;
/// each one joins (or creates) its group and settles the tracker exactly
/// once.
fn drain_scene_messages(
    mut commands: Commands,
    stream: Res<SceneStream>,
    mut session: ResMut<VenueSession>,
    mut groups: ResMut<SceneGroups>,
    mut toggles: ResMut<ViewToggles>,
    mut tracker: ResMut<LoadTracker>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut images: ResMut<Assets<Image>>,
) {
    while let Ok(message) = stream.rx.try_recv() {
        if message.generation() != session.generation {
            debug!("dropping a result from a discarded venue session");
            continue;
        }
        match message {
            SceneMessage::OriginResolved { origin, .. } => {
                session.origin = Some(origin);
                if let Some(venue) = session.descriptor.clone() {
                    dispatch_loads(&venue, origin, session.generation, &stream.tx);
                }
            }
            SceneMessage::FileLoaded {
                file,
                floor,
                kind,
                features,
                ..
            } => {
                spawn_floor_features(
                    &mut commands,
                    &mut groups,
                    &mut toggles,
                    &mut meshes,
                    &mut materials,
                    floor,
                    kind,
                    &features,
                    &file,
                );
                tracker.complete_one();
            }
            SceneMessage::NetworkLoaded { segments, .. } => {
                spawn_network(
                    &mut commands,
                    &mut groups,
                    &mut toggles,
                    &mut meshes,
                    &mut materials,
                    &segments,
                );
                tracker.complete_one();
            }
            SceneMessage::ImageryAligned { plane, .. } => {
                if let Some(plane) = plane {
                    place_imagery(
                        &mut commands,
                        &mut groups,
                        &mut toggles,
                        &mut meshes,
                        &mut materials,
                        &mut images,
                        plane,
                    );
                }
                tracker.complete_one();
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_floor_features(
    commands: &mut Commands,
    groups: &mut SceneGroups,
    toggles: &mut ViewToggles,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    floor: i32,
    kind: DatasetKind,
    features: &[SceneFeature],
    file: &str,
) {
    if features.is_empty() {
        debug!("{} contributed no meshes", file);
        return;
    }

    let group = *groups.floors.entry(floor).or_insert_with(|| {
        commands
            .spawn((
                Name::new(format!("floor {}", floor)),
                FloorGroup(floor),
                Transform::default(),
                Visibility::default(),
            ))
            .id()
    });
    toggles.register_floor(floor);

    let material = materials.add(StandardMaterial {
        base_color: match kind {
            DatasetKind::FloorOutline => Color::srgb(0.82, 0.80, 0.76),
            DatasetKind::General => Color::srgb(0.38, 0.55, 0.78),
        },
        perceptual_roughness: 0.9,
        cull_mode: None,
        ..default()
    });

    let base = floor_elevation(floor);
    let mut spawned = 0;
    for feature in features {
        let built = if feature.closed {
            mesh::extrude_ring_mesh(&feature.points, base, kind.depth())
        } else {
            mesh::ribbon_mesh(&feature.points, base + kind.depth(), 1.5)
        };
        if built.count_vertices() == 0 {
            continue;
        }
        let child = commands
            .spawn((
                Mesh3d(meshes.add(built)),
                MeshMaterial3d(material.clone()),
                Transform::default(),
                Visibility::default(),
            ))
            .id();
        commands.entity(group).add_child(child);
        spawned += 1;
    }
    debug!("{}: {} meshes on floor {}", file, spawned, floor);
}

fn spawn_network(
    commands: &mut Commands,
    groups: &mut SceneGroups,
    toggles: &mut ViewToggles,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    segments: &[[Vec3; 2]],
) {
    if segments.is_empty() {
        return;
    }
    let group = *groups.network.get_or_insert_with(|| {
        commands
            .spawn((
                Name::new("pedestrian network"),
                NetworkGroup,
                Transform::default(),
                Visibility::default(),
            ))
            .id()
    });
    toggles.register_network();

    let material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.95, 0.55, 0.15),
        unlit: true,
        ..default()
    });
    let child = commands
        .spawn((
            Mesh3d(meshes.add(mesh::line_segments_mesh(segments))),
            MeshMaterial3d(material),
            Transform::default(),
            Visibility::default(),
        ))
        .id();
    commands.entity(group).add_child(child);
    info!("network: {} link segments", segments.len());
}

/// Places the backdrop plane under the venue. The terrain group and its
/// toggle are created at most once per session; a further plane only adds
/// a sibling to the existing group.
fn place_imagery(
    commands: &mut Commands,
    groups: &mut SceneGroups,
    toggles: &mut ViewToggles,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    images: &mut Assets<Image>,
    plane: ImageryPlaneSpec,
) {
    let group = *groups.terrain.get_or_insert_with(|| {
        commands
            .spawn((
                Name::new("terrain"),
                TerrainGroup,
                Transform::default(),
                Visibility::default(),
            ))
            .id()
    });
    toggles.register_imagery();

    let material = materials.add(StandardMaterial {
        base_color_texture: Some(images.add(texture_to_image(plane.texture))),
        unlit: true,
        cull_mode: None,
        ..default()
    });
    let child = commands
        .spawn((
            Mesh3d(meshes.add(Rectangle::new(plane.width, plane.height))),
            MeshMaterial3d(material),
            Transform {
                // Just below floor 0 so slabs never z-fight the backdrop
                translation: Vec3::new(plane.center.x, -0.05 * FLOOR_SPACING, plane.center.y),
                rotation: Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
                ..default()
            },
            Visibility::default(),
        ))
        .id();
    commands.entity(group).add_child(child);
    info!(
        "imagery plane placed: {:.0}x{:.0} ({})",
        plane.width,
        plane.height,
        if plane.placeholder { "placeholder" } else { "fetched" }
    );
}

fn texture_to_image(texture: FetchedTexture) -> Image {
    Image::new(
        Extent3d {
            width: texture.width,
            height: texture.height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        texture.data,
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}

fn sync_group_visibility(
    toggles: Res<ViewToggles>,
    groups: Res<SceneGroups>,
    mut query: Query<&mut Visibility>,
) {
    if !toggles.is_changed() {
        return;
    }
    for (floor, entity) in &groups.floors {
        if let Ok(mut visibility) = query.get_mut(*entity) {
            *visibility = as_visibility(toggles.floors.get(floor).copied().unwrap_or(true));
        }
    }
    if let (Some(entity), Some(on)) = (groups.network, toggles.network) {
        if let Ok(mut visibility) = query.get_mut(entity) {
            *visibility = as_visibility(on);
        }
    }
    if let (Some(entity), Some(on)) = (groups.terrain, toggles.imagery) {
        if let Ok(mut visibility) = query.get_mut(entity) {
            *visibility = as_visibility(on);
        }
    }
}

fn as_visibility(on: bool) -> Visibility {
    if on {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}
