//! Fallback tiles for symbols whose image could not be loaded.

use font8x8::legacy::BASIC_LEGACY;
use image::{Rgba, RgbaImage};

use crate::Color;

/// Fill colors for fallback tiles whose descriptor does not pick one.
pub const FALLBACK_PALETTE: [u32; 8] = [
    0xC0392B, 0x2980B9, 0x27AE60, 0x8E44AD, 0xD35400, 0x16A085, 0xF39C12, 0x7F8C8D,
];

fn glyph_for_char(ch: char) -> [u8; 8] {
    let index = ch as usize;
    if index < BASIC_LEGACY.len() {
        BASIC_LEGACY[index]
    } else {
        BASIC_LEGACY[b'?' as usize]
    }
}

/// Palette color picked by a stable FNV-1a hash of the symbol ID.
pub fn fallback_color_for(id: &str) -> Color {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in id.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    Color::from_hex(FALLBACK_PALETTE[hash as usize % FALLBACK_PALETTE.len()])
}

/// Render a `size`x`size` tile filled with `fill` and the first character of
/// `id` drawn in white, scaled up from the 8x8 bitmap font.
pub fn render_fallback_tile(id: &str, fill: Color, size: u32) -> RgbaImage {
    let mut tile = RgbaImage::from_pixel(size, size, Rgba(fill.to_rgba_u8()));

    let Some(ch) = id.chars().next().map(|c| c.to_ascii_uppercase()) else {
        return tile;
    };
    let glyph = glyph_for_char(ch);

    // Glyph covers roughly 60% of the tile.
    let scale = (size * 3 / 5 / 8).max(1);
    let glyph_size = scale * 8;
    let origin = size.saturating_sub(glyph_size) / 2;
    let ink = Rgba([255, 255, 255, 255]);

    for (row, bits) in glyph.iter().enumerate() {
        for col in 0..8u32 {
            if (bits >> col) & 0x01 == 0 {
                continue;
            }
            let x0 = origin + col * scale;
            let y0 = origin + row as u32 * scale;
            for y in y0..(y0 + scale).min(size) {
                for x in x0..(x0 + scale).min(size) {
                    tile.put_pixel(x, y, ink);
                }
            }
        }
    }
    tile
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_color_is_stable() {
        assert_eq!(fallback_color_for("A"), fallback_color_for("A"));
        assert!(FALLBACK_PALETTE.iter().any(|&hex| Color::from_hex(hex) == fallback_color_for("WILD")));
    }

    #[test]
    fn test_fallback_tile_has_glyph_ink() {
        let fill = Color::from_hex(0x000080);
        let tile = render_fallback_tile("a", fill, 64);
        let white = tile.pixels().filter(|p| p.0 == [255, 255, 255, 255]).count();
        let filled = tile.pixels().filter(|p| p.0 == fill.to_rgba_u8()).count();
        assert!(white > 0, "glyph should draw some pixels");
        assert_eq!(white + filled, 64 * 64);
        // Corners keep the fill color.
        assert_eq!(tile.get_pixel(0, 0).0, fill.to_rgba_u8());
    }

    #[test]
    fn test_empty_id_is_plain_fill() {
        let tile = render_fallback_tile("", Color::BLACK, 8);
        assert!(tile.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }
}
