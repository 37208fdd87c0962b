//! Neighbor tiles on the staggered isometric grid.
//!
//! Every tile has eight neighbors, always listed in the same order:
//!
//! ```text
//!        N(4)
//!   NW(3)    NE(5)
//! W(2)   tile   E(6)
//!   SW(1)    SE(7)
//!        S(0)
//! ```
//!
//! Because odd rows are shifted half a tile right, the diagonal neighbors use
//! different column offsets on even and odd rows. North and south are two rows
//! away, east and west share the row.
//!
//! Walkability filtering applies a corner rule: a diagonal neighbor that is a
//! hard (map-defined) obstacle also blocks the two cardinal neighbors beside
//! it, so units cannot cut the corner of a wall.

use arrayvec::ArrayVec;

use crate::components::tileposition::TilePos;

/// The eight facings, in neighbor order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facing {
    South = 0,
    SouthWest = 1,
    West = 2,
    NorthWest = 3,
    North = 4,
    NorthEast = 5,
    East = 6,
    SouthEast = 7,
}

impl Facing {
    pub const ALL: [Facing; 8] = [
        Facing::South,
        Facing::SouthWest,
        Facing::West,
        Facing::NorthWest,
        Facing::North,
        Facing::NorthEast,
        Facing::East,
        Facing::SouthEast,
    ];

    pub fn from_index(index: usize) -> Facing {
        Self::ALL[index % 8]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_diagonal(self) -> bool {
        self.index() % 2 == 1
    }

    /// Cardinal facings beside a diagonal one; empty for cardinals.
    pub fn flanking_cardinals(self) -> Option<(Facing, Facing)> {
        if !self.is_diagonal() {
            return None;
        }
        let i = self.index();
        Some((Facing::from_index(i - 1), Facing::from_index(i + 1)))
    }

    pub fn opposite(self) -> Facing {
        Facing::from_index(self.index() + 4)
    }

    /// Whether a unit limited to `direction_count` facings may step this way.
    ///
    /// One facing allows south only, two add north, four allow the
    /// cardinals, anything else allows the first `direction_count` facings.
    pub fn allowed_for(self, direction_count: usize) -> bool {
        match direction_count {
            1 => self == Facing::South,
            2 => matches!(self, Facing::South | Facing::North),
            4 => !self.is_diagonal(),
            n => self.index() < n,
        }
    }
}

/// Something that knows which tiles are blocked.
pub trait TileBlocker {
    /// Tile cannot be entered, for any reason (walls, units, objects).
    fn is_obstacle(&self, tile: TilePos) -> bool;
    /// Tile is blocked by the map itself rather than by an occupant.
    fn is_hard_obstacle(&self, tile: TilePos) -> bool;
}

/// The eight neighbors of `tile`, indexed by [`Facing`].
pub fn neighbors(tile: TilePos) -> [TilePos; 8] {
    let TilePos { x, y } = tile;
    if y & 1 == 0 {
        [
            TilePos::new(x, y + 2),
            TilePos::new(x - 1, y + 1),
            TilePos::new(x - 1, y),
            TilePos::new(x - 1, y - 1),
            TilePos::new(x, y - 2),
            TilePos::new(x, y - 1),
            TilePos::new(x + 1, y),
            TilePos::new(x, y + 1),
        ]
    } else {
        [
            TilePos::new(x, y + 2),
            TilePos::new(x, y + 1),
            TilePos::new(x - 1, y),
            TilePos::new(x, y - 1),
            TilePos::new(x, y - 2),
            TilePos::new(x + 1, y - 1),
            TilePos::new(x + 1, y),
            TilePos::new(x + 1, y + 1),
        ]
    }
}

/// Facing that leads from `from` to an adjacent `to`, if they are neighbors.
pub fn facing_between(from: TilePos, to: TilePos) -> Option<Facing> {
    neighbors(from)
        .iter()
        .position(|n| *n == to)
        .map(Facing::from_index)
}

/// Bit mask (bit `i` = facing `i`) of neighbors that cannot be entered.
pub fn blocked_mask(neighbors: &[TilePos; 8], blocker: &impl TileBlocker) -> u8 {
    let mut mask = 0u8;
    for (i, n) in neighbors.iter().enumerate() {
        if !blocker.is_obstacle(*n) && !blocker.is_hard_obstacle(*n) {
            continue;
        }
        mask |= 1 << i;
        if let Some((a, b)) = Facing::from_index(i).flanking_cardinals() {
            if blocker.is_hard_obstacle(*n) {
                mask |= 1 << a.index();
                mask |= 1 << b.index();
            }
        }
    }
    mask
}

/// Neighbors of `tile` a unit may step onto.
pub fn walkable_neighbors(
    tile: TilePos,
    blocker: &impl TileBlocker,
) -> ArrayVec<(Facing, TilePos), 8> {
    walkable_neighbors_limited(tile, blocker, 8)
}

/// Like [`walkable_neighbors`] for units limited to `direction_count` facings.
pub fn walkable_neighbors_limited(
    tile: TilePos,
    blocker: &impl TileBlocker,
    direction_count: usize,
) -> ArrayVec<(Facing, TilePos), 8> {
    let all = neighbors(tile);
    let mask = blocked_mask(&all, blocker);
    all.iter()
        .enumerate()
        .filter(|(i, _)| mask & (1 << i) == 0)
        .map(|(i, n)| (Facing::from_index(i), *n))
        .filter(|(f, _)| f.allowed_for(direction_count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[derive(Default)]
    struct Walls {
        soft: FxHashSet<TilePos>,
        hard: FxHashSet<TilePos>,
    }

    impl TileBlocker for Walls {
        fn is_obstacle(&self, tile: TilePos) -> bool {
            self.soft.contains(&tile) || self.hard.contains(&tile)
        }
        fn is_hard_obstacle(&self, tile: TilePos) -> bool {
            self.hard.contains(&tile)
        }
    }

    #[test]
    fn neighbors_match_pixel_geometry() {
        for tile in [TilePos::new(4, 6), TilePos::new(4, 7)] {
            let center = tile.to_pixel();
            let n = neighbors(tile);
            let expect = [
                (0.0, 32.0),
                (-32.0, 16.0),
                (-64.0, 0.0),
                (-32.0, -16.0),
                (0.0, -32.0),
                (32.0, -16.0),
                (64.0, 0.0),
                (32.0, 16.0),
            ];
            for (i, (dx, dy)) in expect.iter().enumerate() {
                let d = n[i].to_pixel() - center;
                assert_eq!((d.x, d.y), (*dx, *dy), "facing {} of {:?}", i, tile);
            }
        }
    }

    #[test]
    fn all_neighbors_walkable_on_open_ground() {
        let walls = Walls::default();
        assert_eq!(walkable_neighbors(TilePos::new(3, 3), &walls).len(), 8);
    }

    #[test]
    fn hard_diagonal_blocks_flanking_cardinals() {
        let center = TilePos::new(5, 8);
        let n = neighbors(center);
        let mut walls = Walls::default();
        walls.hard.insert(n[Facing::NorthEast.index()]);

        let walkable: Vec<Facing> = walkable_neighbors(center, &walls)
            .iter()
            .map(|(f, _)| *f)
            .collect();
        assert!(!walkable.contains(&Facing::NorthEast));
        assert!(!walkable.contains(&Facing::North));
        assert!(!walkable.contains(&Facing::East));
        assert_eq!(walkable.len(), 5);
    }

    #[test]
    fn soft_diagonal_blocks_only_itself() {
        let center = TilePos::new(5, 9);
        let n = neighbors(center);
        let mut walls = Walls::default();
        walls.soft.insert(n[Facing::SouthWest.index()]);

        let walkable: Vec<Facing> = walkable_neighbors(center, &walls)
            .iter()
            .map(|(f, _)| *f)
            .collect();
        assert_eq!(walkable.len(), 7);
        assert!(walkable.contains(&Facing::South));
        assert!(walkable.contains(&Facing::West));
    }

    #[test]
    fn hard_cardinal_does_not_spread() {
        let center = TilePos::new(2, 2);
        let mut walls = Walls::default();
        walls.hard.insert(neighbors(center)[Facing::West.index()]);
        assert_eq!(walkable_neighbors(center, &walls).len(), 7);
    }

    #[test]
    fn direction_limits() {
        let walls = Walls::default();
        let tile = TilePos::new(1, 1);
        assert_eq!(walkable_neighbors_limited(tile, &walls, 1).len(), 1);
        assert_eq!(walkable_neighbors_limited(tile, &walls, 2).len(), 2);
        assert_eq!(walkable_neighbors_limited(tile, &walls, 4).len(), 4);
    }

    #[test]
    fn facing_between_neighbors() {
        let a = TilePos::new(3, 4);
        assert_eq!(facing_between(a, TilePos::new(3, 6)), Some(Facing::South));
        assert_eq!(facing_between(a, TilePos::new(3, 5)), Some(Facing::SouthEast));
        assert_eq!(facing_between(a, TilePos::new(9, 9)), None);
        assert_eq!(Facing::NorthWest.opposite(), Facing::SouthEast);
    }
}
