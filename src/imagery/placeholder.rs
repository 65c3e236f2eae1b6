use rand::Rng;

use super::provider::FetchedTexture;

/// Stand-in backdrop for when no real imagery can be fetched: a green-to-gray
/// gradient with scattered darker patches for vegetation and lighter blocks
/// for built-up texture. Random placement, fixed palette.
pub fn placeholder_texture(width: u32, height: u32) -> FetchedTexture {
    let mut data = vec![0u8; (width * height * 4) as usize];

    for y in 0..height {
        let t = y as f32 / height.max(1) as f32;
        let r = lerp(96.0, 138.0, t);
        let g = lerp(142.0, 136.0, t);
        let b = lerp(88.0, 130.0, t);
        for x in 0..width {
            put_pixel(&mut data, width, x, y, [r as u8, g as u8, b as u8]);
        }
    }

    let mut rng = rand::rng();

    // Vegetation: soft dark-green discs
    for _ in 0..24 {
        let cx = rng.random_range(0..width) as i64;
        let cy = rng.random_range(0..height) as i64;
        let lo = (width / 40).max(2);
        let radius = rng.random_range(lo..lo + (width / 12).max(1)) as i64;
        for y in (cy - radius).max(0)..(cy + radius).min(height as i64) {
            for x in (cx - radius).max(0)..(cx + radius).min(width as i64) {
                let dx = x - cx;
                let dy = y - cy;
                if dx * dx + dy * dy <= radius * radius {
                    put_pixel(&mut data, width, x as u32, y as u32, [62, 108, 58]);
                }
            }
        }
    }

    // Urban texture: small light-gray blocks
    for _ in 0..40 {
        let bw = rng.random_range(2..(width / 20).max(3));
        let bh = rng.random_range(2..(height / 20).max(3));
        let bx = rng.random_range(0..width.saturating_sub(bw).max(1));
        let by = rng.random_range(0..height.saturating_sub(bh).max(1));
        for y in by..(by + bh).min(height) {
            for x in bx..(bx + bw).min(width) {
                put_pixel(&mut data, width, x, y, [168, 164, 158]);
            }
        }
    }

    FetchedTexture {
        data,
        width,
        height,
    }
}

fn put_pixel(data: &mut [u8], width: u32, x: u32, y: u32, rgb: [u8; 3]) {
    let idx = ((y * width + x) * 4) as usize;
    data[idx] = rgb[0];
    data[idx + 1] = rgb[1];
    data[idx + 2] = rgb[2];
    data[idx + 3] = 255;
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_has_expected_dimensions() {
        let texture = placeholder_texture(128, 96);
        assert_eq!(texture.width, 128);
        assert_eq!(texture.height, 96);
        assert_eq!(texture.data.len(), 128 * 96 * 4);
    }

    #[test]
    fn texture_is_fully_opaque() {
        let texture = placeholder_texture(32, 32);
        assert!(texture.data.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn small_sizes_do_not_panic() {
        let texture = placeholder_texture(4, 4);
        assert_eq!(texture.data.len(), 4 * 4 * 4);
    }
}
