//! Decoder for the run-length encoded sprite animation container.
//!
//! A sprite file holds every facing of one animation (for example "walk") as a
//! flat list of palette-indexed frames. The layout is:
//!
//! ```text
//! offset  size        field
//! 0       16          signature ("ASF 1.0" + padding)
//! 16      4 x 8       width, height, frame_count, directions,
//!                     color_count, interval_ms, left, bottom (i32 LE)
//! 48      16          reserved
//! 64      3 x colors  palette, stored B,G,R
//! ..      8 x frames  frame table: absolute offset (u32 LE), length (u32 LE)
//! ..                  RLE frame bodies
//! ```
//!
//! Each frame body is a stream of `(count, alpha)` byte pairs. An alpha of
//! zero emits `count` transparent pixels. Any other alpha is followed by
//! `count` palette indices, each emitted with that alpha.
//!
//! Decoding never fails halfway: a bad signature yields `None`, while a
//! truncated table or frame stream simply stops producing data. The rest of
//! the frame stays transparent.
//!
//! # Related
//!
//! - [`crate::resources::spritestore::SpriteStore`] – per-path cache of decoded sprites
//! - [`crate::components::animation::SpriteAnimator`] – frame selection over a decoded sprite
//! - [`crate::outline`] – edge highlight derived from a decoded frame

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::outline;

/// Leading bytes every sprite file starts with.
pub const SIGNATURE: &[u8; 7] = b"ASF 1.0";
/// Size of the signature field including its padding.
pub const SIGNATURE_FIELD_LEN: usize = 16;
/// Byte offset where the palette begins.
pub const HEADER_LEN: usize = 64;
/// Bytes per palette entry (B, G, R).
pub const PALETTE_ENTRY_LEN: usize = 3;
/// Bytes per frame table entry (offset + length).
pub const FRAME_ENTRY_LEN: usize = 8;

/// Largest single frame accepted, in RGBA bytes.
const MAX_FRAME_BYTES: usize = 4096 * 4096 * 4;
/// Largest total of decoded pixel data accepted for one sprite.
const MAX_DECODED_BYTES: usize = 256 * 1024 * 1024;

/// Color written for palette indices past the end of the palette.
const INVALID_COLOR: [u8; 4] = [255, 0, 255, 255];

/// Metadata block of a sprite file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteHeader {
    pub width: u32,
    pub height: u32,
    pub frame_count: u32,
    pub directions: u32,
    pub color_count: u32,
    /// Display time of one frame in milliseconds.
    pub interval: u32,
    /// Horizontal anchor used to align the sprite on the unit's foot position.
    pub left: i32,
    /// Vertical anchor used to align the sprite on the unit's foot position.
    pub bottom: i32,
}

impl SpriteHeader {
    /// Number of frames belonging to one facing, never less than one.
    pub fn frames_per_direction(&self) -> u32 {
        if self.directions > 0 {
            (self.frame_count / self.directions).max(1)
        } else {
            self.frame_count.max(1)
        }
    }
}

/// Premultiplied RGBA pixels ready to be handed to a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// One decoded frame. The drawable surface and the edge image are built on
/// first request.
#[derive(Debug)]
pub struct DecodedFrame {
    pixels: Vec<u8>,
    surface: OnceLock<Surface>,
    edge: OnceLock<Vec<u8>>,
}

impl DecodedFrame {
    fn new(pixels: Vec<u8>) -> Self {
        Self {
            pixels,
            surface: OnceLock::new(),
            edge: OnceLock::new(),
        }
    }

    /// Straight (non-premultiplied) RGBA pixels, row major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Whether the drawable surface has been built yet.
    pub fn is_materialized(&self) -> bool {
        self.surface.get().is_some()
    }
}

/// Immutable result of decoding one sprite file.
#[derive(Debug)]
pub struct DecodedSprite {
    pub header: SpriteHeader,
    frames: Vec<DecodedFrame>,
}

impl DecodedSprite {
    pub fn width(&self) -> u32 {
        self.header.width
    }

    pub fn height(&self) -> u32 {
        self.header.height
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn directions(&self) -> u32 {
        self.header.directions
    }

    pub fn interval(&self) -> u32 {
        self.header.interval
    }

    pub fn frames_per_direction(&self) -> usize {
        self.header.frames_per_direction() as usize
    }

    pub fn frame(&self, index: usize) -> Option<&DecodedFrame> {
        self.frames.get(index)
    }

    /// Pixel dimensions and RGBA buffer of a frame.
    pub fn frame_pixels(&self, index: usize) -> Option<&[u8]> {
        self.frames.get(index).map(|f| f.pixels())
    }

    /// Drawable surface for a frame, materialized on the first call.
    pub fn surface(&self, index: usize) -> Option<&Surface> {
        let frame = self.frames.get(index)?;
        Some(
            frame
                .surface
                .get_or_init(|| premultiply(self.header.width, self.header.height, &frame.pixels)),
        )
    }

    /// Edge highlight image for a frame in the default highlight color.
    pub fn edge(&self, index: usize) -> Option<&[u8]> {
        let frame = self.frames.get(index)?;
        Some(frame.edge.get_or_init(|| {
            outline::edge_image(
                &frame.pixels,
                self.header.width as usize,
                self.header.height as usize,
                outline::DEFAULT_EDGE_COLOR,
            )
        }))
    }
}

fn premultiply(width: u32, height: u32, pixels: &[u8]) -> Surface {
    let mut rgba = Vec::with_capacity(pixels.len());
    for px in pixels.chunks_exact(4) {
        let a = px[3] as u16;
        rgba.push(((px[0] as u16 * a) / 255) as u8);
        rgba.push(((px[1] as u16 * a) / 255) as u8);
        rgba.push(((px[2] as u16 * a) / 255) as u8);
        rgba.push(px[3]);
    }
    Surface {
        width,
        height,
        rgba,
    }
}

fn read_i32(data: &[u8], offset: usize) -> Option<i32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    read_i32(data, offset).map(|v| v as u32)
}

/// Check the signature and read the metadata block without decoding frames.
pub fn parse_header(data: &[u8]) -> Option<SpriteHeader> {
    if data.len() < HEADER_LEN || !data.starts_with(SIGNATURE) {
        return None;
    }
    let base = SIGNATURE_FIELD_LEN;
    let field = |i: usize| read_i32(data, base + i * 4);
    Some(SpriteHeader {
        width: field(0)?.max(0) as u32,
        height: field(1)?.max(0) as u32,
        frame_count: field(2)?.max(0) as u32,
        directions: field(3)?.max(0) as u32,
        color_count: field(4)?.max(0) as u32,
        interval: field(5)?.max(0) as u32,
        left: field(6)?,
        bottom: field(7)?,
    })
}

/// Read up to `color_count` B,G,R entries starting at the palette offset.
fn read_palette(data: &[u8], color_count: usize) -> Vec<[u8; 4]> {
    data[HEADER_LEN..]
        .chunks_exact(PALETTE_ENTRY_LEN)
        .take(color_count)
        .map(|bgr| [bgr[2], bgr[1], bgr[0], 255])
        .collect()
}

/// Decode a whole sprite file.
///
/// Returns `None` when the signature or metadata block is missing, or when
/// the declared dimensions would decode to an unreasonable amount of pixel
/// data. A frame table cut short yields fewer frames, a frame stream cut
/// short yields a partially transparent frame.
pub fn decode_sprite(data: &[u8]) -> Option<DecodedSprite> {
    let header = parse_header(data)?;
    let color_count = header.color_count as usize;
    let palette = read_palette(data, color_count);

    let table_start = HEADER_LEN.saturating_add(color_count.saturating_mul(PALETTE_ENTRY_LEN));
    let Some(frame_size) = (header.width as usize)
        .checked_mul(header.height as usize)
        .and_then(|px| px.checked_mul(4))
        .filter(|size| *size <= MAX_FRAME_BYTES)
    else {
        log::warn!(target: "sprites", "rejecting {}x{} sprite", header.width, header.height);
        return None;
    };
    // Only entries actually present in the table can become frames.
    let present = data.len().saturating_sub(table_start) / FRAME_ENTRY_LEN;
    let frame_count = (header.frame_count as usize).min(present);
    if frame_size.saturating_mul(frame_count) > MAX_DECODED_BYTES {
        log::warn!(
            target: "sprites",
            "rejecting sprite with {} frames of {} bytes",
            frame_count,
            frame_size
        );
        return None;
    }
    let mut frames = Vec::with_capacity(frame_count);

    for i in 0..frame_count {
        let entry = table_start + i * FRAME_ENTRY_LEN;
        let (Some(offset), Some(length)) = (read_u32(data, entry), read_u32(data, entry + 4))
        else {
            log::debug!(target: "sprites", "frame table truncated at frame {}", i);
            break;
        };
        let mut pixels = vec![0u8; frame_size];
        decode_rle_frame(data, &palette, offset as usize, length as usize, &mut pixels);
        frames.push(DecodedFrame::new(pixels));
    }

    Some(DecodedSprite { header, frames })
}

/// Expand one RLE frame body into `pixels`, stopping quietly on truncation.
fn decode_rle_frame(
    data: &[u8],
    palette: &[[u8; 4]],
    offset: usize,
    length: usize,
    pixels: &mut [u8],
) {
    let end = offset.saturating_add(length).min(data.len());
    let mut cursor = offset;
    let mut out = 0usize;

    while cursor + 1 < end && out < pixels.len() {
        let count = data[cursor] as usize;
        let alpha = data[cursor + 1];
        cursor += 2;

        if alpha == 0 {
            out = (out + count * 4).min(pixels.len());
            continue;
        }

        for _ in 0..count {
            if out >= pixels.len() || cursor >= end {
                return;
            }
            let index = data[cursor] as usize;
            cursor += 1;
            let color = palette.get(index).copied().unwrap_or(INVALID_COLOR);
            pixels[out..out + 3].copy_from_slice(&color[..3]);
            pixels[out + 3] = if palette.get(index).is_some() {
                alpha
            } else {
                color[3]
            };
            out += 4;
        }
    }
}
