use std::{fs, io::Read, thread};

use bevy::math::{DVec2, Vec2};
use bevy::prelude::*;
use crossbeam_channel::Sender;
use geojson::GeoJson;

use crate::types::{planar_to_scene, translate, VenueDescriptor};

use super::{
    floors::{classify_dataset, floor_index_from_name},
    SceneMessage,
};

/// One parsed feature with its geometry still in the source's planar frame.
#[derive(Debug, Clone)]
pub struct VenueFeature {
    pub id: String,
    pub properties: serde_json::Value,
    pub geometry: geo::LineString<f64>,
    pub closed: bool,
}

/// A feature re-centered into the scene frame, ready for meshing.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneFeature {
    /// Scene-frame (x, z) pairs.
    pub points: Vec<Vec2>,
    pub closed: bool,
}

/// Parses a GeoJSON document into planar features. Polygons contribute their
/// exterior ring (one feature per polygon of a MultiPolygon); line strings
/// stay open paths. Point features carry no renderable outline here and are
/// skipped.
pub fn parse_feature_collection(
    data: &str,
) -> Result<Vec<VenueFeature>, Box<dyn std::error::Error>> {
    let geojson: GeoJson = data.parse()?;

    let mut features = Vec::new();
    if let GeoJson::FeatureCollection(collection) = geojson {
        for feature in collection.features {
            let Some(geometry) = feature.geometry else {
                continue;
            };
            let id = feature
                .id
                .as_ref()
                .map_or_else(|| String::from("unknown"), |id| format!("{:?}", id));
            let properties = serde_json::Value::Object(feature.properties.unwrap_or_default());

            let mut push = |ring: &[Vec<f64>], closed: bool| {
                let line = geo::LineString(
                    ring.iter()
                        .filter(|p| p.len() >= 2)
                        .map(|p| geo::Coord { x: p[0], y: p[1] })
                        .collect(),
                );
                if !line.0.is_empty() {
                    features.push(VenueFeature {
                        id: id.clone(),
                        properties: properties.clone(),
                        geometry: line,
                        closed,
                    });
                }
            };

            match geometry.value {
                geojson::Value::Polygon(rings) => {
                    if let Some(exterior) = rings.first() {
                        push(exterior, true);
                    }
                }
                geojson::Value::MultiPolygon(polys) => {
                    for rings in &polys {
                        if let Some(exterior) = rings.first() {
                            push(exterior, true);
                        }
                    }
                }
                geojson::Value::LineString(line) => push(&line, false),
                geojson::Value::MultiLineString(lines) => {
                    for line in &lines {
                        push(line, false);
                    }
                }
                _ => continue,
            }
        }
    }

    Ok(features)
}

/// Applies the shared re-centering transform to every coordinate of every
/// feature, producing scene-frame outlines.
pub fn to_scene_features(features: &[VenueFeature], origin: DVec2) -> Vec<SceneFeature> {
    features
        .iter()
        .map(|feature| SceneFeature {
            points: feature
                .geometry
                .0
                .iter()
                .map(|c| {
                    let offset = translate(DVec2::new(c.x, c.y), origin);
                    planar_to_scene(offset, 0.0).xz()
                })
                .collect(),
            closed: feature.closed,
        })
        .collect()
}

/// Reads one venue file, from disk or over HTTP depending on the root path.
pub fn fetch_text(root: &str, file: &str) -> Result<String, Box<dyn std::error::Error>> {
    if root.starts_with("http://") || root.starts_with("https://") {
        let url = format!("{}/{}", root.trim_end_matches('/'), file);
        let mut response = ureq::get(&url).call()?;
        if response.status() != 200 {
            return Err(format!("HTTP {} for {}", response.status(), url).into());
        }
        let mut text = String::new();
        response.body_mut().as_reader().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(fs::read_to_string(format!("{}/{}", root, file))?)
    }
}

/// Fetches and parses one geometry file on a worker thread. Always sends
/// exactly one `FileLoaded` message; parse or fetch failures degrade to an
/// empty feature list so the load counter still settles.
pub fn spawn_file_load(
    venue: &VenueDescriptor,
    file: String,
    origin: DVec2,
    generation: u64,
    tx: Sender<SceneMessage>,
) {
    let root = venue.root_path.clone();
    thread::spawn(move || {
        let features = match fetch_text(&root, &file).and_then(|data| {
            parse_feature_collection(&data)
        }) {
            Ok(parsed) => to_scene_features(&parsed, origin),
            Err(e) => {
                warn!("failed to load {}/{}: {}", root, file, e);
                Vec::new()
            }
        };
        let floor = floor_index_from_name(&file);
        let kind = classify_dataset(&file);
        if tx
            .send(SceneMessage::FileLoaded {
                generation,
                file,
                floor,
                kind,
                features,
            })
            .is_err()
        {
            debug!("scene channel closed; dropping a finished file load");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"category": "shop"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [100.0, 0.0], [100.0, 200.0], [0.0, 200.0], [0.0, 0.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[10.0, 10.0], [20.0, 30.0]]
                }
            }
        ]
    }"#;

    #[test]
    fn parses_polygons_and_lines() {
        let features = parse_feature_collection(COLLECTION).unwrap();
        assert_eq!(features.len(), 2);
        assert!(features[0].closed);
        assert_eq!(features[0].geometry.0.len(), 5);
        assert!(!features[1].closed);
        assert_eq!(features[0].properties["category"], "shop");
    }

    #[test]
    fn malformed_document_is_an_error_not_a_panic() {
        assert!(parse_feature_collection("{ not geojson").is_err());
    }

    #[test]
    fn empty_collection_yields_no_features() {
        let features =
            parse_feature_collection(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
        assert!(features.is_empty());
    }

    #[test]
    fn scene_features_are_recentred() {
        let features = parse_feature_collection(COLLECTION).unwrap();
        let scene = to_scene_features(&features, DVec2::new(50.0, 100.0));
        // (0, 0) - (50, 100) -> east -50, north -100 -> scene (-50, +100)
        assert_eq!(scene[0].points[0], Vec2::new(-50.0, 100.0));
        // (100, 200) - (50, 100) -> scene (50, -100)
        assert_eq!(scene[0].points[2], Vec2::new(50.0, -100.0));
    }
}
