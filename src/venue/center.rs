use std::thread;

use bevy::math::DVec2;
use bevy::prelude::*;
use crossbeam_channel::Sender;

use crate::types::{PlanarBounds, VenueDescriptor};

use super::{loader, SceneMessage};

/// Accumulates the coordinate extremes over a set of already-fetched
/// geometry documents. Files that fail to parse are skipped; they cannot
/// shrink the bounds of the ones that succeed.
pub fn planar_extremes(documents: &[String]) -> PlanarBounds {
    let mut bounds = PlanarBounds::default();
    for data in documents {
        match loader::parse_feature_collection(data) {
            Ok(features) => {
                for feature in &features {
                    for coord in &feature.geometry.0 {
                        bounds.extend(coord.x, coord.y);
                    }
                }
            }
            Err(e) => warn!("skipping unparsable file during center scan: {}", e),
        }
    }
    bounds
}

/// Midpoint-of-extremes centroid: deterministic for a given file set and
/// independent of file or feature order.
pub fn centroid_of(documents: &[String]) -> Option<DVec2> {
    let bounds = planar_extremes(documents);
    bounds.is_valid().then(|| bounds.center())
}

/// Scans the venue's geometry files on a worker thread and reports the
/// computed origin. Only called for venues without a declared center; the
/// declared-center path never reads a file. Loads are dispatched by the
/// receiver once the origin message lands, which is what gives every
/// geometry load its happens-after-origin ordering.
pub fn spawn_center_resolution(
    venue: &VenueDescriptor,
    generation: u64,
    tx: Sender<SceneMessage>,
) {
    let root = venue.root_path.clone();
    let files = venue.geo_files.clone();
    thread::spawn(move || {
        let documents: Vec<String> = files
            .iter()
            .filter_map(|file| match loader::fetch_text(&root, file) {
                Ok(data) => Some(data),
                Err(e) => {
                    warn!("center scan could not read {}/{}: {}", root, file, e);
                    None
                }
            })
            .collect();

        let origin = centroid_of(&documents).unwrap_or_else(|| {
            warn!("no usable coordinates under {}; defaulting origin to (0, 0)", root);
            DVec2::ZERO
        });

        let _ = tx.send(SceneMessage::OriginResolved { generation, origin });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(coords: &str) -> String {
        format!(
            r#"{{"type": "FeatureCollection", "features": [{{
                "type": "Feature", "properties": {{}},
                "geometry": {{"type": "LineString", "coordinates": {coords}}}
            }}]}}"#
        )
    }

    #[test]
    fn centroid_is_midpoint_of_extremes() {
        let documents = vec![doc("[[0.0, 0.0], [100.0, 200.0]]")];
        assert_eq!(centroid_of(&documents), Some(DVec2::new(50.0, 100.0)));
    }

    #[test]
    fn centroid_spans_multiple_files_order_independently() {
        let a = doc("[[-40.0, 10.0], [0.0, 0.0]]");
        let b = doc("[[60.0, 90.0]]");
        let forward = centroid_of(&[a.clone(), b.clone()]);
        let reverse = centroid_of(&[b, a]);
        assert_eq!(forward, Some(DVec2::new(10.0, 45.0)));
        assert_eq!(forward, reverse);
    }

    #[test]
    fn unparsable_files_are_ignored() {
        let documents = vec!["garbage".to_string(), doc("[[2.0, 4.0], [6.0, 8.0]]")];
        assert_eq!(centroid_of(&documents), Some(DVec2::new(4.0, 6.0)));
    }

    #[test]
    fn no_coordinates_means_no_centroid() {
        assert_eq!(centroid_of(&[]), None);
        let empty = vec![r#"{"type": "FeatureCollection", "features": []}"#.to_string()];
        assert_eq!(centroid_of(&empty), None);
    }
}
