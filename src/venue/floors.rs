use std::collections::BTreeMap;

use bevy::prelude::*;

/// Vertical spacing between stacked floor layers, in scene units.
pub const FLOOR_SPACING: f32 = 12.0;

/// Tags a group entity holding every mesh for one floor.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloorGroup(pub i32);

/// Tags the single group holding the pedestrian network lines.
#[derive(Component, Debug, Clone, Copy)]
pub struct NetworkGroup;

/// Tags the single group holding the aligned imagery plane(s).
#[derive(Component, Debug, Clone, Copy)]
pub struct TerrainGroup;

/// What a dataset file contributes, derived from its filename. Floor
/// outlines render as thin slabs; buildings and facilities as thick prisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    FloorOutline,
    General,
}

impl DatasetKind {
    pub fn depth(&self) -> f32 {
        match self {
            DatasetKind::FloorOutline => 0.4,
            DatasetKind::General => 3.0,
        }
    }
}

pub fn classify_dataset(file_name: &str) -> DatasetKind {
    if stem(file_name).to_ascii_lowercase().contains("floor") {
        DatasetKind::FloorOutline
    } else {
        DatasetKind::General
    }
}

/// Floor index from the filename suffix tag: `Building_2.geojson` is floor 2,
/// `Floor_B1.geojson` is basement 1 (floor -1), untagged files are floor 0.
pub fn floor_index_from_name(file_name: &str) -> i32 {
    let stem = stem(file_name);
    let Some(tag) = stem.rsplit('_').next() else {
        return 0;
    };
    if let Ok(n) = tag.parse::<i32>() {
        return n;
    }
    if let Some(rest) = tag.strip_prefix(['B', 'b']) {
        if let Ok(n) = rest.parse::<i32>() {
            return -n;
        }
    }
    0
}

fn stem(file_name: &str) -> &str {
    file_name.rsplit('/').next().unwrap_or(file_name)
        .split('.')
        .next()
        .unwrap_or(file_name)
}

/// Elevation of a floor's base plane.
pub fn floor_elevation(floor: i32) -> f32 {
    floor as f32 * FLOOR_SPACING
}

/// Per-session checkbox state for the panel. An entry is registered once
/// when its group first appears and survives until the venue changes;
/// re-registering an existing toggle is a no-op so a second imagery plane
/// never produces a second checkbox.
#[derive(Resource, Debug, Default, Clone, PartialEq, Eq)]
pub struct ViewToggles {
    pub floors: BTreeMap<i32, bool>,
    pub network: Option<bool>,
    pub imagery: Option<bool>,
}

impl ViewToggles {
    pub fn register_floor(&mut self, floor: i32) {
        self.floors.entry(floor).or_insert(true);
    }

    pub fn register_network(&mut self) {
        self.network.get_or_insert(true);
    }

    pub fn register_imagery(&mut self) {
        self.imagery.get_or_insert(true);
    }

    pub fn clear(&mut self) {
        self.floors.clear();
        self.network = None;
        self.imagery = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_suffixes_classify() {
        assert_eq!(floor_index_from_name("Building_1.geojson"), 1);
        assert_eq!(floor_index_from_name("Facility_3.geojson"), 3);
        assert_eq!(floor_index_from_name("Floor_B1.geojson"), -1);
        assert_eq!(floor_index_from_name("Concourse_B2.geojson"), -2);
        assert_eq!(floor_index_from_name("Terrain.geojson"), 0);
        assert_eq!(floor_index_from_name("assets/venues/u/Floor_2.geojson"), 2);
    }

    #[test]
    fn dataset_kinds_from_names() {
        assert_eq!(classify_dataset("Floor_1.geojson"), DatasetKind::FloorOutline);
        assert_eq!(classify_dataset("floor_B1.geojson"), DatasetKind::FloorOutline);
        assert_eq!(classify_dataset("Building_1.geojson"), DatasetKind::General);
        assert!(DatasetKind::FloorOutline.depth() < DatasetKind::General.depth());
    }

    #[test]
    fn toggles_register_once() {
        let mut toggles = ViewToggles::default();
        toggles.register_imagery();
        toggles.imagery = Some(false);
        // A second plane joining the terrain group must not reset the toggle.
        toggles.register_imagery();
        assert_eq!(toggles.imagery, Some(false));

        toggles.register_floor(1);
        toggles.floors.insert(1, false);
        toggles.register_floor(1);
        assert_eq!(toggles.floors.get(&1), Some(&false));
    }

    #[test]
    fn floors_stack_by_spacing() {
        assert_eq!(floor_elevation(0), 0.0);
        assert_eq!(floor_elevation(2), 2.0 * FLOOR_SPACING);
        assert_eq!(floor_elevation(-1), -FLOOR_SPACING);
    }
}
