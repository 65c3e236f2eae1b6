use bevy::math::{DVec2, Vec3};
use serde::{Deserialize, Serialize};

/// Meters per degree of latitude, constant over the planet to within ~1%.
const METERS_PER_DEG_LAT: f64 = 111_320.0;
/// Meters per degree of longitude, calibrated near 35°N where the source
/// datasets live. Accuracy degrades away from that latitude.
const METERS_PER_DEG_LON: f64 = 91_290.0;

pub const MIN_ZOOM: u32 = 1;
pub const MAX_ZOOM: u32 = 20;

/// A geographic coordinate in WGS84 degrees.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoCoord {
    pub lat: f64,
    pub lon: f64,
}

impl GeoCoord {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Standard slippy-map tile indices containing this coordinate.
    pub fn to_tile_coords(&self, zoom: u32) -> (u32, u32) {
        let n = 2_u32.pow(zoom) as f64;
        let x = ((self.lon + 180.0) / 360.0 * n).floor();
        let lat_rad = self.lat.to_radians();
        let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0
            * n)
            .floor();
        (
            (x as u32).min(n as u32 - 1),
            (y as u32).min(n as u32 - 1),
        )
    }
}

/// Planar bounds accumulated by scanning coordinate pairs. Each point can
/// only widen the bounds, never shrink them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Default for PlanarBounds {
    fn default() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }
}

impl PlanarBounds {
    pub fn extend(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    /// False until at least one point has been accumulated.
    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Geographic bounding box with its midpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoLatLonBounds {
    pub southwest: GeoCoord,
    pub northeast: GeoCoord,
    pub center: GeoCoord,
}

/// Converts a planar offset in meters (east, north) relative to a geographic
/// anchor into latitude/longitude. A constant-factor linear approximation,
/// not a geodetic projection.
pub fn transform_to_lat_lon(x: f64, y: f64, center_lat: f64, center_lon: f64) -> GeoCoord {
    GeoCoord {
        lat: center_lat + y / METERS_PER_DEG_LAT,
        lon: center_lon + x / METERS_PER_DEG_LON,
    }
}

/// Geographic bounds for a planar extent anchored at (center_lat, center_lon).
/// Assumes min_x <= max_x and min_y <= max_y; the caller accumulates bounds
/// via min/max so ordering holds by construction.
pub fn calculate_lat_lon_bounds(
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
    center_lat: f64,
    center_lon: f64,
) -> GeoLatLonBounds {
    let southwest = transform_to_lat_lon(min_x, min_y, center_lat, center_lon);
    let northeast = transform_to_lat_lon(max_x, max_y, center_lat, center_lon);
    GeoLatLonBounds {
        southwest,
        northeast,
        center: GeoCoord {
            lat: (southwest.lat + northeast.lat) / 2.0,
            lon: (southwest.lon + northeast.lon) / 2.0,
        },
    }
}

/// Picks the web-map zoom level at which the whole bounding box fits into a
/// width x height image built from 256px tiles. Each axis yields a candidate
/// `log2(360 / span) + log2(pixels / 256)`; the smaller one wins so the full
/// extent fits, floored and clamped to [1, 20]. A zero-extent axis is treated
/// as maximum zoom rather than letting the logarithm blow up.
pub fn calculate_zoom_level(bounds: &GeoLatLonBounds, width: u32, height: u32) -> u32 {
    let d_lon = (bounds.northeast.lon - bounds.southwest.lon).abs();
    let d_lat = (bounds.northeast.lat - bounds.southwest.lat).abs();

    let axis_zoom = |span: f64, pixels: u32| -> f64 {
        if span <= 0.0 {
            return MAX_ZOOM as f64;
        }
        (360.0 / span).log2() + (pixels as f64 / 256.0).log2()
    };

    let candidate = axis_zoom(d_lon, width).min(axis_zoom(d_lat, height));
    (candidate.floor() as i64).clamp(MIN_ZOOM as i64, MAX_ZOOM as i64) as u32
}

/// The one shared re-centering step: planar point minus the scene origin.
/// Every loader goes through this so all geometry agrees on the frame.
pub fn translate(point: DVec2, origin: DVec2) -> DVec2 {
    point - origin
}

/// Maps a translated planar offset (east, north) into the Y-up scene frame
/// at the given elevation. North runs toward -Z, matching the orientation of
/// the imagery plane.
pub fn planar_to_scene(offset: DVec2, elevation: f32) -> Vec3 {
    Vec3::new(offset.x as f32, elevation, -offset.y as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_is_deterministic() {
        let a = transform_to_lat_lon(153.2, -87.5, 34.70, 135.49);
        let b = transform_to_lat_lon(153.2, -87.5, 34.70, 135.49);
        assert_eq!(a, b);
    }

    #[test]
    fn transform_moves_in_expected_directions() {
        let anchor = transform_to_lat_lon(0.0, 0.0, 34.70, 135.49);
        assert_eq!(anchor, GeoCoord::new(34.70, 135.49));

        let ne = transform_to_lat_lon(1000.0, 1000.0, 34.70, 135.49);
        assert!(ne.lat > anchor.lat);
        assert!(ne.lon > anchor.lon);
        // 1km is roughly 0.009 degrees of latitude here
        assert!((ne.lat - anchor.lat - 0.008983).abs() < 1e-4);
    }

    #[test]
    fn bounds_are_ordered() {
        let bounds = calculate_lat_lon_bounds(-250.0, 420.0, -100.0, 380.0, 34.70, 135.49);
        assert!(bounds.southwest.lat <= bounds.northeast.lat);
        assert!(bounds.southwest.lon <= bounds.northeast.lon);
        assert!((bounds.center.lat - (bounds.southwest.lat + bounds.northeast.lat) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn zoom_level_stays_in_range() {
        for span in [0.0001, 0.01, 1.0, 45.0, 180.0, 360.0] {
            let bounds = calculate_lat_lon_bounds(
                0.0,
                span * METERS_PER_DEG_LON,
                0.0,
                span * METERS_PER_DEG_LAT,
                35.0,
                135.0,
            );
            let zoom = calculate_zoom_level(&bounds, 640, 640);
            assert!((MIN_ZOOM..=MAX_ZOOM).contains(&zoom), "span {span} -> zoom {zoom}");
        }
    }

    #[test]
    fn zoom_level_large_box_is_low() {
        let bounds = GeoLatLonBounds {
            southwest: GeoCoord::new(30.0, 130.0),
            northeast: GeoCoord::new(40.0, 140.0),
            center: GeoCoord::new(35.0, 135.0),
        };
        let zoom = calculate_zoom_level(&bounds, 640, 640);
        assert!((4..=6).contains(&zoom), "got {zoom}");
    }

    #[test]
    fn zoom_level_tiny_box_is_near_max() {
        let bounds = GeoLatLonBounds {
            southwest: GeoCoord::new(35.0, 135.0),
            northeast: GeoCoord::new(35.001, 135.001),
            center: GeoCoord::new(35.0005, 135.0005),
        };
        let zoom = calculate_zoom_level(&bounds, 640, 640);
        assert!(zoom >= 17 && zoom <= MAX_ZOOM, "got {zoom}");
    }

    #[test]
    fn zoom_level_degenerate_box_clamps_to_max() {
        let bounds = GeoLatLonBounds {
            southwest: GeoCoord::new(35.0, 135.0),
            northeast: GeoCoord::new(35.0, 135.0),
            center: GeoCoord::new(35.0, 135.0),
        };
        assert_eq!(calculate_zoom_level(&bounds, 640, 640), MAX_ZOOM);
    }

    #[test]
    fn planar_bounds_only_widen() {
        let mut bounds = PlanarBounds::default();
        assert!(!bounds.is_valid());
        bounds.extend(10.0, -5.0);
        bounds.extend(-3.0, 20.0);
        bounds.extend(0.0, 0.0);
        assert_eq!(bounds.min_x, -3.0);
        assert_eq!(bounds.max_x, 10.0);
        assert_eq!(bounds.min_y, -5.0);
        assert_eq!(bounds.max_y, 20.0);
        assert_eq!(bounds.center(), DVec2::new(3.5, 7.5));
    }

    #[test]
    fn slippy_tile_indices_for_known_location() {
        // Osaka at zoom 14 lands in the expected tile neighbourhood.
        let (x, y) = GeoCoord::new(34.70, 135.49).to_tile_coords(14);
        assert!((14350..14370).contains(&x), "got x {x}");
        assert!((6495..6515).contains(&y), "got y {y}");
    }

    #[test]
    fn translate_and_scene_mapping() {
        let offset = translate(DVec2::new(150.0, 300.0), DVec2::new(50.0, 100.0));
        assert_eq!(offset, DVec2::new(100.0, 200.0));
        let scene = planar_to_scene(offset, 12.0);
        assert_eq!(scene, Vec3::new(100.0, 12.0, -200.0));
    }
}
