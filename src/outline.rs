//! Edge highlight generation.
//!
//! Hovering an object or unit draws a thin outline around its current frame.
//! The outline is derived purely from the frame's alpha channel: a pixel is on
//! the edge when it is visible and at least one of its four direct neighbors
//! is transparent or lies outside the frame.

/// Highlight color used by [`crate::spritecodec::DecodedSprite::edge`].
pub const DEFAULT_EDGE_COLOR: [u8; 4] = [255, 255, 0, 255];

/// Alpha at or below which a pixel counts as transparent.
const ALPHA_CUTOFF: u8 = 0;

fn is_opaque(pixels: &[u8], width: usize, x: usize, y: usize) -> bool {
    pixels
        .get((y * width + x) * 4 + 3)
        .is_some_and(|a| *a > ALPHA_CUTOFF)
}

/// Whether the pixel at `(x, y)` sits on the visible border of the frame.
pub fn is_edge_pixel(pixels: &[u8], width: usize, height: usize, x: usize, y: usize) -> bool {
    if x >= width || y >= height || !is_opaque(pixels, width, x, y) {
        return false;
    }
    if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
        return true;
    }
    !is_opaque(pixels, width, x - 1, y)
        || !is_opaque(pixels, width, x + 1, y)
        || !is_opaque(pixels, width, x, y - 1)
        || !is_opaque(pixels, width, x, y + 1)
}

/// Build an RGBA image of the same size as the frame holding `color` on
/// every edge pixel and transparency everywhere else.
///
/// A buffer shorter than `width * height * 4` is treated as transparent past
/// its end.
pub fn edge_image(pixels: &[u8], width: usize, height: usize, color: [u8; 4]) -> Vec<u8> {
    let mut out = vec![0u8; width * height * 4];
    for y in 0..height {
        for x in 0..width {
            if is_edge_pixel(pixels, width, height, x, y) {
                let i = (y * width + x) * 4;
                out[i..i + 4].copy_from_slice(&color);
            }
        }
    }
    out
}

/// Number of edge pixels in a frame; cheap check used by hit tests.
pub fn edge_pixel_count(pixels: &[u8], width: usize, height: usize) -> usize {
    (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .filter(|(x, y)| is_edge_pixel(pixels, width, height, *x, *y))
        .count()
}
