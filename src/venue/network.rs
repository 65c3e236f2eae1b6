use std::{collections::HashMap, thread};

use bevy::math::{DVec2, Vec3};
use bevy::prelude::*;
use crossbeam_channel::Sender;
use geojson::GeoJson;

use crate::types::{planar_to_scene, translate, VenueDescriptor};

use super::SceneMessage;

/// Height above floor 0 at which network lines are drawn, so they stay
/// visible over the floor slabs.
pub const NETWORK_LIFT: f32 = 1.0;

/// Node positions by id, from a GeoJSON file of Point features carrying a
/// `node_id` property (string or number).
pub fn parse_network_nodes(
    data: &str,
) -> Result<HashMap<String, DVec2>, Box<dyn std::error::Error>> {
    let geojson: GeoJson = data.parse()?;
    let mut nodes = HashMap::new();
    if let GeoJson::FeatureCollection(collection) = geojson {
        for feature in collection.features {
            let Some(geometry) = feature.geometry else {
                continue;
            };
            let geojson::Value::Point(point) = geometry.value else {
                continue;
            };
            if point.len() < 2 {
                continue;
            }
            let Some(id) = feature
                .properties
                .as_ref()
                .and_then(|p| p.get("node_id"))
                .map(property_id)
            else {
                continue;
            };
            nodes.insert(id, DVec2::new(point[0], point[1]));
        }
    }
    Ok(nodes)
}

/// Link endpoint id pairs, from a GeoJSON file of features carrying
/// `start_id` / `end_id` properties.
pub fn parse_network_links(
    data: &str,
) -> Result<Vec<(String, String)>, Box<dyn std::error::Error>> {
    let geojson: GeoJson = data.parse()?;
    let mut links = Vec::new();
    if let GeoJson::FeatureCollection(collection) = geojson {
        for feature in collection.features {
            let Some(properties) = feature.properties.as_ref() else {
                continue;
            };
            if let (Some(start), Some(end)) = (
                properties.get("start_id").map(property_id),
                properties.get("end_id").map(property_id),
            ) {
                links.push((start, end));
            }
        }
    }
    Ok(links)
}

fn property_id(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One scene-frame line segment per link whose endpoints both resolve to a
/// node. Dangling references are skipped, not fatal.
pub fn build_segments(
    nodes: &HashMap<String, DVec2>,
    links: &[(String, String)],
    origin: DVec2,
) -> Vec<[Vec3; 2]> {
    let mut segments = Vec::with_capacity(links.len());
    for (start, end) in links {
        match (nodes.get(start), nodes.get(end)) {
            (Some(a), Some(b)) => segments.push([
                planar_to_scene(translate(*a, origin), NETWORK_LIFT),
                planar_to_scene(translate(*b, origin), NETWORK_LIFT),
            ]),
            _ => info!("skipping network link {} -> {}: unknown node id", start, end),
        }
    }
    segments
}

/// Loads the node/link pair on one worker thread. The pair is one logical
/// operation: exactly one `NetworkLoaded` message is sent (and so exactly
/// one counter decrement happens) whether the files load or not.
pub fn spawn_network_load(
    venue: &VenueDescriptor,
    origin: DVec2,
    generation: u64,
    tx: Sender<SceneMessage>,
) {
    let Some(pair) = venue.network_file.clone() else {
        return;
    };
    let root = venue.root_path.clone();
    thread::spawn(move || {
        let segments = load_pair(&root, &pair.node, &pair.link, origin).unwrap_or_else(|e| {
            warn!("failed to load network {}/{{{},{}}}: {}", root, pair.node, pair.link, e);
            Vec::new()
        });
        let _ = tx.send(SceneMessage::NetworkLoaded {
            generation,
            segments,
        });
    });
}

fn load_pair(
    root: &str,
    node_file: &str,
    link_file: &str,
    origin: DVec2,
) -> Result<Vec<[Vec3; 2]>, Box<dyn std::error::Error>> {
    let nodes = parse_network_nodes(&super::loader::fetch_text(root, node_file)?)?;
    let links = parse_network_links(&super::loader::fetch_text(root, link_file)?)?;
    Ok(build_segments(&nodes, &links, origin))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"node_id": "a"},
             "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}},
            {"type": "Feature", "properties": {"node_id": 7},
             "geometry": {"type": "Point", "coordinates": [10.0, 20.0]}}
        ]
    }"#;

    const LINKS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"start_id": "a", "end_id": 7}, "geometry": null},
            {"type": "Feature", "properties": {"start_id": "a", "end_id": "missing"}, "geometry": null}
        ]
    }"#;

    #[test]
    fn nodes_parse_with_string_and_numeric_ids() {
        let nodes = parse_network_nodes(NODES).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes["a"], DVec2::new(0.0, 0.0));
        assert_eq!(nodes["7"], DVec2::new(10.0, 20.0));
    }

    #[test]
    fn dangling_links_are_skipped() {
        let nodes = parse_network_nodes(NODES).unwrap();
        let links = parse_network_links(LINKS).unwrap();
        assert_eq!(links.len(), 2);

        let segments = build_segments(&nodes, &links, DVec2::ZERO);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0][0], Vec3::new(0.0, NETWORK_LIFT, 0.0));
        assert_eq!(segments[0][1], Vec3::new(10.0, NETWORK_LIFT, -20.0));
    }

    #[test]
    fn segments_are_recentred_by_origin() {
        let nodes = parse_network_nodes(NODES).unwrap();
        let links = vec![("a".to_string(), "7".to_string())];
        let segments = build_segments(&nodes, &links, DVec2::new(5.0, 10.0));
        assert_eq!(segments[0][0], Vec3::new(-5.0, NETWORK_LIFT, 10.0));
        assert_eq!(segments[0][1], Vec3::new(5.0, NETWORK_LIFT, -10.0));
    }
}
