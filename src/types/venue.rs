use std::{collections::HashMap, fs, path::Path};

use bevy::math::DVec2;
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use super::GeoCoord;

/// Data-source credit shown in the panel for the active venue.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribution {
    pub text: String,
    pub url: String,
}

/// The node/link file pair describing a pedestrian network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkFiles {
    pub node: String,
    pub link: String,
}

/// Static manifest for one mapped indoor location. Immutable; looked up by
/// venue key and consumed read-only by the loaders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueDescriptor {
    /// Directory or URL prefix the file names below are resolved against.
    pub root_path: String,
    /// Geometry files, in manifest order. Must be non-empty.
    pub geo_files: Vec<String>,
    #[serde(default)]
    pub network_file: Option<NetworkFiles>,
    #[serde(default)]
    pub terrain_file: Option<String>,
    /// Declared planar center. When absent the resolver scans `geo_files`.
    #[serde(default)]
    pub center: Option<(f64, f64)>,
    /// Geographic anchor the planar frame is pinned to. Without it the
    /// imagery backdrop degrades to the generated placeholder.
    #[serde(default)]
    pub coordinate: Option<GeoCoord>,
    /// Shown in the panel; empty when the manifest omits it.
    #[serde(default)]
    pub attribution: Attribution,
}

impl VenueDescriptor {
    pub fn declared_center(&self) -> Option<DVec2> {
        self.center.map(|(x, y)| DVec2::new(x, y))
    }

    /// Count of independently tracked load operations: one per geometry
    /// file, one per network pair, one per terrain file.
    pub fn expected_loads(&self) -> u32 {
        self.geo_files.len() as u32
            + u32::from(self.network_file.is_some())
            + u32::from(self.terrain_file.is_some())
    }
}

/// Venue manifests by key. The built-in demo venues live in `Default`;
/// external manifests can be merged in from JSON.
#[derive(Resource, Debug, Clone)]
pub struct VenueRegistry {
    venues: HashMap<String, VenueDescriptor>,
}

impl VenueRegistry {
    pub fn get(&self, key: &str) -> Option<&VenueDescriptor> {
        self.venues.get(key)
    }

    /// Keys in a stable order for the selector UI.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.venues.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Merges venues from a JSON manifest ({ key: descriptor, ... }).
    /// Manifest entries override built-ins with the same key.
    pub fn merge_manifest(&mut self, path: &Path) -> Result<usize, Box<dyn std::error::Error>> {
        let data = fs::read_to_string(path)?;
        let parsed: HashMap<String, VenueDescriptor> = serde_json::from_str(&data)?;
        let count = parsed.len();
        self.venues.extend(parsed);
        Ok(count)
    }
}

impl Default for VenueRegistry {
    fn default() -> Self {
        let mut venues = HashMap::new();
        venues.insert(
            "umeda-station".to_string(),
            VenueDescriptor {
                root_path: "assets/venues/umeda".to_string(),
                geo_files: vec![
                    "Building_1.geojson".to_string(),
                    "Building_2.geojson".to_string(),
                    "Facility_1.geojson".to_string(),
                    "Floor_1.geojson".to_string(),
                    "Floor_B1.geojson".to_string(),
                ],
                network_file: Some(NetworkFiles {
                    node: "Network_Node.geojson".to_string(),
                    link: "Network_Link.geojson".to_string(),
                }),
                terrain_file: Some("Terrain.geojson".to_string()),
                center: Some((-45250.0, -38200.0)),
                coordinate: Some(GeoCoord::new(34.7025, 135.4959)),
                attribution: Attribution {
                    text: "Indoor map data: MLIT Japan".to_string(),
                    url: "https://www.mlit.go.jp/".to_string(),
                },
            },
        );
        venues.insert(
            "harborland-mall".to_string(),
            VenueDescriptor {
                root_path: "assets/venues/harborland".to_string(),
                geo_files: vec![
                    "Building_1.geojson".to_string(),
                    "Floor_1.geojson".to_string(),
                ],
                network_file: None,
                terrain_file: Some("Terrain.geojson".to_string()),
                // No declared center: the resolver scans the geometry files.
                center: None,
                coordinate: Some(GeoCoord::new(34.6801, 135.1780)),
                attribution: Attribution {
                    text: "Indoor map data: MLIT Japan".to_string(),
                    url: "https://www.mlit.go.jp/".to_string(),
                },
            },
        );
        Self { venues }
    }
}
