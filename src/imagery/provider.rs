use std::{fs, io::Read, path::Path};

use crate::types::{GeoLatLonBounds, MAX_ZOOM, MIN_ZOOM};

/// Environment variable holding the keyed static-map credential. Read at
/// request time; its absence selects the tile fallback, it is not an error.
pub const API_KEY_VAR: &str = "MAPS_API_KEY";

/// Pixel size requested from the keyed provider, and the size the zoom
/// selection is computed against.
pub const IMAGE_SIZE: u32 = 640;

const TILE_URL: &str = "https://tile.openstreetmap.org";
const STATIC_MAP_URL: &str = "https://maps.googleapis.com/maps/api/staticmap";

/// Decoded RGBA image ready to become a texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedTexture {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Where the backdrop image comes from: the keyed static-map endpoint when a
/// credential is configured, otherwise the public slippy-tile server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageryProvider {
    StaticMap { key: String },
    TileServer,
}

pub fn select_provider(api_key: Option<String>) -> ImageryProvider {
    match api_key {
        Some(key) if !key.is_empty() => ImageryProvider::StaticMap { key },
        _ => ImageryProvider::TileServer,
    }
}

pub fn configured_provider() -> ImageryProvider {
    select_provider(std::env::var(API_KEY_VAR).ok())
}

impl ImageryProvider {
    pub fn request_url(&self, bounds: &GeoLatLonBounds, zoom: u32) -> String {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        match self {
            ImageryProvider::StaticMap { key } => format!(
                "{}?center={},{}&zoom={}&size={}x{}&maptype=satellite&key={}",
                STATIC_MAP_URL,
                bounds.center.lat,
                bounds.center.lon,
                zoom,
                IMAGE_SIZE,
                IMAGE_SIZE,
                key
            ),
            ImageryProvider::TileServer => {
                let (x, y) = bounds.center.to_tile_coords(zoom);
                format!("{}/{}/{}/{}.png", TILE_URL, zoom, x, y)
            }
        }
    }

    /// Cache path for this request, mirroring how the tile cache lays files
    /// out on disk.
    pub fn cache_file(&self, bounds: &GeoLatLonBounds, zoom: u32) -> String {
        match self {
            ImageryProvider::StaticMap { .. } => format!(
                "cache/staticmap/{:.5}_{:.5}_{}.png",
                bounds.center.lat, bounds.center.lon, zoom
            ),
            ImageryProvider::TileServer => {
                let (x, y) = bounds.center.to_tile_coords(zoom);
                format!("cache/tiles/{}_{}_{}.png", zoom, x, y)
            }
        }
    }
}

/// Fetches and decodes one backdrop image, consulting the on-disk cache
/// first and retrying politely on 429 like the tile fetcher does.
pub fn fetch_texture(
    url: &str,
    cache_file: &str,
) -> Result<FetchedTexture, Box<dyn std::error::Error>> {
    if Path::new(cache_file).exists() {
        return decode(&fs::read(cache_file)?);
    }

    let bytes = loop {
        let mut response = ureq::get(url).call()?;
        if response.status() == 429 {
            std::thread::sleep(std::time::Duration::from_secs(5));
            continue;
        }
        if response.status() != 200 {
            return Err(format!("HTTP {} for {}", response.status(), url).into());
        }
        let mut bytes = Vec::new();
        response.body_mut().as_reader().read_to_end(&mut bytes)?;
        break bytes;
    };

    if let Some(dir) = Path::new(cache_file).parent() {
        fs::create_dir_all(dir)?;
        fs::write(cache_file, &bytes)?;
    }
    decode(&bytes)
}

fn decode(bytes: &[u8]) -> Result<FetchedTexture, Box<dyn std::error::Error>> {
    let decoded = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = decoded.dimensions();
    Ok(FetchedTexture {
        data: decoded.into_raw(),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeoCoord;

    fn bounds() -> GeoLatLonBounds {
        GeoLatLonBounds {
            southwest: GeoCoord::new(34.69, 135.48),
            northeast: GeoCoord::new(34.71, 135.50),
            center: GeoCoord::new(34.70, 135.49),
        }
    }

    #[test]
    fn credential_selects_the_keyed_provider() {
        assert_eq!(
            select_provider(Some("abc123".to_string())),
            ImageryProvider::StaticMap { key: "abc123".to_string() }
        );
        assert_eq!(select_provider(None), ImageryProvider::TileServer);
        assert_eq!(select_provider(Some(String::new())), ImageryProvider::TileServer);
    }

    #[test]
    fn static_map_url_carries_all_parameters() {
        let provider = ImageryProvider::StaticMap { key: "abc123".to_string() };
        let url = provider.request_url(&bounds(), 16);
        assert!(url.contains("center=34.7,135.49"));
        assert!(url.contains("zoom=16"));
        assert!(url.contains("size=640x640"));
        assert!(url.contains("maptype=satellite"));
        assert!(url.contains("key=abc123"));
    }

    #[test]
    fn tile_url_uses_slippy_indices() {
        let url = ImageryProvider::TileServer.request_url(&bounds(), 14);
        let (x, y) = bounds().center.to_tile_coords(14);
        assert_eq!(url, format!("https://tile.openstreetmap.org/14/{}/{}.png", x, y));
    }

    #[test]
    fn zoom_is_clamped_into_provider_range() {
        let url = ImageryProvider::TileServer.request_url(&bounds(), 99);
        assert!(url.contains("/20/"));
    }

    #[test]
    fn decode_accepts_png_bytes() {
        let mut png = Vec::new();
        image::RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 255]))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let texture = decode(&png).unwrap();
        assert_eq!((texture.width, texture.height), (2, 2));
        assert_eq!(texture.data.len(), 2 * 2 * 4);
    }
}
