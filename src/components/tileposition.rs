//! Tile and pixel coordinates on the staggered isometric grid.
//!
//! Tiles are diamonds 64 pixels wide and 32 pixels tall. Odd rows are shifted
//! half a tile to the right, so the center of tile `(x, y)` sits at
//! `(64 * x + 32 * (y & 1), 16 * y)` in world pixels.
//!
//! [`Placement`] stores both representations of an entity's position and keeps
//! them in sync: writing one recomputes the other.

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub const TILE_WIDTH: i32 = 64;
pub const TILE_HEIGHT: i32 = 32;

/// Integer grid coordinate of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// World pixel position of the tile center.
    pub fn to_pixel(self) -> Vec2 {
        Vec2::new(
            (TILE_WIDTH * self.x + (self.y & 1) * (TILE_WIDTH / 2)) as f32,
            ((TILE_HEIGHT / 2) * self.y) as f32,
        )
    }

    /// Tile containing the given world pixel. Negative pixels map to the origin.
    pub fn from_pixel(pixel: Vec2) -> Self {
        if pixel.x < 0.0 || pixel.y < 0.0 {
            return Self::new(0, 0);
        }
        let px = pixel.x as i32;
        let py = pixel.y as i32;

        // Start from the odd-row diamond whose bounding box holds the pixel,
        // then step into a corner neighbor when the pixel is outside it.
        let mut nx = px / TILE_WIDTH;
        let mut ny = 1 + (py / TILE_HEIGHT) * 2;
        let dx = px - nx * TILE_WIDTH;
        let dy = py - (ny / 2) * TILE_HEIGHT;

        if dx < 32 {
            if dy < (32 - dx) / 2 {
                ny -= 1;
            } else if dy > dx / 2 + 16 {
                ny += 1;
            }
        } else if dx > 32 {
            if dy < (dx - 32) / 2 {
                nx += 1;
                ny -= 1;
            } else if dy > (64 - dx) / 2 + 16 {
                nx += 1;
                ny += 1;
            }
        }
        Self::new(nx, ny)
    }

    /// Coordinates on the diamond axes: one step along either axis is one
    /// diagonal screen step (south-east or south-west).
    pub fn diamond(self) -> (i32, i32) {
        let shifted = 2 * self.x + (self.y & 1);
        ((shifted + self.y) / 2, (self.y - shifted) / 2)
    }

    /// Number of 8-directional steps between two tiles.
    pub fn distance(self, other: TilePos) -> i32 {
        let (a0, b0) = self.diamond();
        let (a1, b1) = other.diamond();
        (a1 - a0).abs().max((b1 - b0).abs())
    }
}

impl From<(i32, i32)> for TilePos {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Position of an entity, stored as tile and world pixel at once.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    tile: TilePos,
    pixel: Vec2,
}

impl Placement {
    pub fn at_tile(tile: TilePos) -> Self {
        Self {
            tile,
            pixel: tile.to_pixel(),
        }
    }

    pub fn at_pixel(pixel: Vec2) -> Self {
        Self {
            tile: TilePos::from_pixel(pixel),
            pixel,
        }
    }

    pub fn tile(&self) -> TilePos {
        self.tile
    }

    pub fn pixel(&self) -> Vec2 {
        self.pixel
    }

    /// Move to the center of `tile`.
    pub fn set_tile(&mut self, tile: TilePos) {
        self.tile = tile;
        self.pixel = tile.to_pixel();
    }

    /// Move to an arbitrary pixel; the tile follows.
    pub fn set_pixel(&mut self, pixel: Vec2) {
        self.pixel = pixel;
        self.tile = TilePos::from_pixel(pixel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_center_round_trips() {
        for y in 0..12 {
            for x in 0..6 {
                let tile = TilePos::new(x, y);
                assert_eq!(TilePos::from_pixel(tile.to_pixel()), tile, "tile {:?}", tile);
            }
        }
    }

    #[test]
    fn odd_rows_are_shifted() {
        assert_eq!(TilePos::new(0, 0).to_pixel(), Vec2::new(0.0, 0.0));
        assert_eq!(TilePos::new(0, 1).to_pixel(), Vec2::new(32.0, 16.0));
        assert_eq!(TilePos::new(2, 4).to_pixel(), Vec2::new(128.0, 64.0));
    }

    #[test]
    fn negative_pixel_maps_to_origin() {
        assert_eq!(TilePos::from_pixel(Vec2::new(-5.0, 10.0)), TilePos::new(0, 0));
    }

    #[test]
    fn distance_counts_diagonal_steps() {
        let c = TilePos::new(5, 10);
        assert_eq!(c.distance(c), 0);
        assert_eq!(c.distance(TilePos::new(5, 12)), 1); // south
        assert_eq!(c.distance(TilePos::new(6, 10)), 1); // east
        assert_eq!(c.distance(TilePos::new(5, 11)), 1); // south-east
        assert_eq!(c.distance(TilePos::new(4, 11)), 1); // south-west
        assert_eq!(c.distance(TilePos::new(5, 14)), 2);
        assert_eq!(c.distance(TilePos::new(7, 10)), 2);
    }

    #[test]
    fn placement_keeps_both_in_sync() {
        let mut p = Placement::at_tile(TilePos::new(3, 3));
        assert_eq!(p.pixel(), Vec2::new(224.0, 48.0));
        p.set_pixel(TilePos::new(1, 2).to_pixel() + Vec2::new(3.0, 2.0));
        assert_eq!(p.tile(), TilePos::new(1, 2));
        p.set_tile(TilePos::new(0, 1));
        assert_eq!(p.pixel(), Vec2::new(32.0, 16.0));
    }
}
