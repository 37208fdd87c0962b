//! Map obstacle grid.
//!
//! Each tile carries a soft and a hard obstacle flag. Hard obstacles are
//! walls and cliffs that nothing crosses; soft ones block walking but not,
//! for example, flying projectiles. Tiles outside the map count as hard.
//!
//! Units and objects standing on a tile are not recorded here; the managers
//! layer those on top through [`OccupiedGrid`].

use bevy_ecs::prelude::Resource;
use rustc_hash::FxHashSet;

use crate::adjacency::TileBlocker;
use crate::components::tileposition::TilePos;

const SOFT: u8 = 0b01;
const HARD: u8 = 0b10;

#[derive(Resource, Debug, Clone, Default)]
pub struct MapGrid {
    width: i32,
    height: i32,
    flags: Vec<u8>,
}

impl MapGrid {
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            flags: vec![0; (width * height) as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    fn index(&self, tile: TilePos) -> Option<usize> {
        if tile.x < 0 || tile.y < 0 || tile.x >= self.width || tile.y >= self.height {
            return None;
        }
        Some((tile.y * self.width + tile.x) as usize)
    }

    pub fn in_bounds(&self, tile: TilePos) -> bool {
        self.index(tile).is_some()
    }

    pub fn set_soft(&mut self, tile: TilePos, blocked: bool) {
        self.set_flag(tile, SOFT, blocked);
    }

    pub fn set_hard(&mut self, tile: TilePos, blocked: bool) {
        self.set_flag(tile, HARD, blocked);
    }

    fn set_flag(&mut self, tile: TilePos, flag: u8, on: bool) {
        if let Some(i) = self.index(tile) {
            if on {
                self.flags[i] |= flag;
            } else {
                self.flags[i] &= !flag;
            }
        }
    }

    /// Build a grid from text rows: `#` hard, `x` soft, anything else open.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as i32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32;
        let mut grid = MapGrid::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                let tile = TilePos::new(x as i32, y as i32);
                match c {
                    '#' => grid.set_hard(tile, true),
                    'x' => grid.set_soft(tile, true),
                    _ => {}
                }
            }
        }
        grid
    }
}

impl TileBlocker for MapGrid {
    fn is_obstacle(&self, tile: TilePos) -> bool {
        self.index(tile).is_none_or(|i| self.flags[i] != 0)
    }

    fn is_hard_obstacle(&self, tile: TilePos) -> bool {
        self.index(tile).is_none_or(|i| self.flags[i] & HARD != 0)
    }
}

/// A map grid plus tiles currently occupied by units or objects.
///
/// Occupants are soft: they block stepping onto their tile but never the
/// corner rule.
pub struct OccupiedGrid<'a> {
    pub grid: &'a MapGrid,
    pub occupied: FxHashSet<TilePos>,
}

impl<'a> OccupiedGrid<'a> {
    pub fn new(grid: &'a MapGrid) -> Self {
        Self {
            grid,
            occupied: FxHashSet::default(),
        }
    }
}

impl TileBlocker for OccupiedGrid<'_> {
    fn is_obstacle(&self, tile: TilePos) -> bool {
        self.occupied.contains(&tile) || self.grid.is_obstacle(tile)
    }

    fn is_hard_obstacle(&self, tile: TilePos) -> bool {
        self.grid.is_hard_obstacle(tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::{neighbors, walkable_neighbors, Facing};

    #[test]
    fn outside_is_hard() {
        let grid = MapGrid::new(4, 4);
        assert!(grid.is_hard_obstacle(TilePos::new(-1, 0)));
        assert!(grid.is_hard_obstacle(TilePos::new(4, 0)));
        assert!(!grid.is_obstacle(TilePos::new(1, 1)));
    }

    #[test]
    fn rows_parse_flags() {
        let grid = MapGrid::from_rows(&["#x.", "..."]);
        assert!(grid.is_hard_obstacle(TilePos::new(0, 0)));
        assert!(grid.is_obstacle(TilePos::new(1, 0)));
        assert!(!grid.is_hard_obstacle(TilePos::new(1, 0)));
        assert!(!grid.is_obstacle(TilePos::new(2, 1)));
    }

    #[test]
    fn occupant_does_not_cut_corners() {
        let grid = MapGrid::new(10, 10);
        let center = TilePos::new(4, 4);
        let mut occupied = OccupiedGrid::new(&grid);
        occupied.occupied.insert(neighbors(center)[Facing::NorthWest.index()]);
        let walkable = walkable_neighbors(center, &occupied);
        assert_eq!(walkable.len(), 7);
    }
}
