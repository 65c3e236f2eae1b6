use std::thread;

use bevy::math::{DVec2, Vec2, Vec3Swizzles};
use bevy::prelude::*;
use crossbeam_channel::Sender;

use crate::types::{
    calculate_lat_lon_bounds, calculate_zoom_level, planar_to_scene, GeoCoord, PlanarBounds,
    VenueDescriptor,
};
use crate::venue::{loader, SceneMessage};

use super::placeholder::placeholder_texture;
use super::provider::{configured_provider, fetch_texture, FetchedTexture, IMAGE_SIZE};

/// Progress of one imagery alignment. Linear except for the texture fork;
/// both texture outcomes converge on `Placed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignStage {
    Idle,
    BoundsComputed,
    ProviderSelected,
    TextureReady,
    TextureFailed,
    Placed,
}

/// Everything the scene side needs to place the backdrop: plane extent and
/// midpoint in the scene frame, plus the texture to drape over it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageryPlaneSpec {
    pub width: f32,
    pub height: f32,
    /// Scene-frame (x, z) midpoint of the planar bounds.
    pub center: Vec2,
    pub texture: FetchedTexture,
    pub placeholder: bool,
}

fn advance(stage: &mut AlignStage, next: AlignStage) {
    debug!("imagery aligner: {:?} -> {:?}", stage, next);
    *stage = next;
}

/// Planar bounds of a terrain document, re-centered by the scene origin.
pub fn terrain_bounds(terrain_data: &str, origin: DVec2) -> PlanarBounds {
    let mut bounds = PlanarBounds::default();
    match loader::parse_feature_collection(terrain_data) {
        Ok(features) => {
            for feature in &features {
                for coord in &feature.geometry.0 {
                    let offset = crate::types::translate(DVec2::new(coord.x, coord.y), origin);
                    bounds.extend(offset.x, offset.y);
                }
            }
        }
        Err(e) => warn!("terrain file did not parse: {}", e),
    }
    bounds
}

/// Runs the alignment pipeline over already-computed bounds. The fetcher is
/// injected so the failure path is exercisable without a network; any error
/// it returns — and a venue with no geographic anchor — degrades to the
/// generated placeholder. This function cannot fail.
pub fn assemble_plane<F>(
    bounds: &PlanarBounds,
    anchor: Option<GeoCoord>,
    fetcher: F,
) -> (ImageryPlaneSpec, AlignStage)
where
    F: Fn(&str, &str) -> Result<FetchedTexture, Box<dyn std::error::Error>>,
{
    let mut stage = AlignStage::Idle;
    advance(&mut stage, AlignStage::BoundsComputed);

    let mut placeholder = true;
    let texture = match anchor {
        Some(anchor) => {
            let geo_bounds = calculate_lat_lon_bounds(
                bounds.min_x,
                bounds.max_x,
                bounds.min_y,
                bounds.max_y,
                anchor.lat,
                anchor.lon,
            );
            let zoom = calculate_zoom_level(&geo_bounds, IMAGE_SIZE, IMAGE_SIZE);
            let provider = configured_provider();
            advance(&mut stage, AlignStage::ProviderSelected);

            let url = provider.request_url(&geo_bounds, zoom);
            match fetcher(&url, &provider.cache_file(&geo_bounds, zoom)) {
                Ok(texture) => {
                    advance(&mut stage, AlignStage::TextureReady);
                    placeholder = false;
                    texture
                }
                Err(e) => {
                    warn!("imagery fetch failed, using placeholder: {}", e);
                    advance(&mut stage, AlignStage::TextureFailed);
                    placeholder_texture(IMAGE_SIZE, IMAGE_SIZE)
                }
            }
        }
        None => {
            // No anchor coordinate: nothing to ask a map service for.
            advance(&mut stage, AlignStage::TextureFailed);
            placeholder_texture(IMAGE_SIZE, IMAGE_SIZE)
        }
    };

    let center = planar_to_scene(bounds.center(), 0.0).xz();
    let spec = ImageryPlaneSpec {
        width: bounds.width() as f32,
        height: bounds.height() as f32,
        center,
        texture,
        placeholder,
    };
    advance(&mut stage, AlignStage::Placed);
    (spec, stage)
}

/// Loads the terrain file and aligns the backdrop on a worker thread.
/// Always sends exactly one `ImageryAligned` message; a terrain file with no
/// usable coordinates yields `plane: None` (nothing to size a plane from)
/// but still settles the counter.
pub fn spawn_imagery_load(
    venue: &VenueDescriptor,
    origin: DVec2,
    generation: u64,
    tx: Sender<SceneMessage>,
) {
    let Some(terrain_file) = venue.terrain_file.clone() else {
        return;
    };
    let root = venue.root_path.clone();
    let anchor = venue.coordinate;
    thread::spawn(move || {
        let plane = match loader::fetch_text(&root, &terrain_file) {
            Ok(data) => {
                let bounds = terrain_bounds(&data, origin);
                if bounds.is_valid() {
                    let (spec, _) = assemble_plane(&bounds, anchor, fetch_texture);
                    Some(spec)
                } else {
                    warn!("terrain file {} has no coordinates; skipping backdrop", terrain_file);
                    None
                }
            }
            Err(e) => {
                warn!("failed to load terrain {}/{}: {}", root, terrain_file, e);
                None
            }
        };
        let _ = tx.send(SceneMessage::ImageryAligned { generation, plane });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> PlanarBounds {
        let mut bounds = PlanarBounds::default();
        bounds.extend(-200.0, -100.0);
        bounds.extend(200.0, 300.0);
        bounds
    }

    #[test]
    fn rejected_fetch_falls_back_to_placeholder() {
        let (spec, stage) = assemble_plane(
            &bounds(),
            Some(GeoCoord::new(34.70, 135.49)),
            |_, _| Err("connection refused".into()),
        );
        assert_eq!(stage, AlignStage::Placed);
        assert!(spec.placeholder);
        assert_eq!(spec.texture.width, IMAGE_SIZE);
        assert_eq!(spec.width, 400.0);
        assert_eq!(spec.height, 400.0);
        // Midpoint (0, 100) north maps to scene (0, -100)
        assert_eq!(spec.center, Vec2::new(0.0, -100.0));
    }

    #[test]
    fn successful_fetch_keeps_the_real_texture() {
        let (spec, stage) = assemble_plane(
            &bounds(),
            Some(GeoCoord::new(34.70, 135.49)),
            |_, _| {
                Ok(FetchedTexture {
                    data: vec![255; 4],
                    width: 1,
                    height: 1,
                })
            },
        );
        assert_eq!(stage, AlignStage::Placed);
        assert!(!spec.placeholder);
        assert_eq!(spec.texture.width, 1);
    }

    #[test]
    fn missing_anchor_skips_the_fetch_entirely() {
        let (spec, stage) = assemble_plane(&bounds(), None, |_, _| {
            panic!("fetcher must not be called without an anchor")
        });
        assert_eq!(stage, AlignStage::Placed);
        assert!(spec.placeholder);
    }

    #[test]
    fn terrain_bounds_are_recentred() {
        let data = r#"{"type": "FeatureCollection", "features": [{
            "type": "Feature", "properties": {},
            "geometry": {"type": "Polygon",
                "coordinates": [[[0.0, 0.0], [100.0, 0.0], [100.0, 50.0], [0.0, 50.0], [0.0, 0.0]]]}
        }]}"#;
        let bounds = terrain_bounds(data, DVec2::new(50.0, 25.0));
        assert!(bounds.is_valid());
        assert_eq!(bounds.min_x, -50.0);
        assert_eq!(bounds.max_x, 50.0);
        assert_eq!(bounds.center(), DVec2::ZERO);
    }
}
