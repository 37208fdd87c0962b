//! Tile paths on the staggered isometric grid.
//!
//! Every search walks [`walkable_neighbors_limited`], so the corner rule and
//! a unit's direction limit apply to each step. Costs and the heuristic are
//! pixel distances between tile centers.
//!
//! | [`PathType`]            | search              | tile expansions |
//! |-------------------------|---------------------|-----------------|
//! | `OneStep`               | greedy walk         | 10 steps        |
//! | `SimpleMaxNpcTry`       | greedy best-first   | 100             |
//! | `PerfectMaxNpcTry`      | A*                  | 100             |
//! | `PerfectMaxPlayerTry`   | A*                  | 500             |
//! | `StraightLine`          | none, for flyers    | unbounded       |
//!
//! A returned path starts at the start tile and, except for `OneStep`, ends
//! at the goal.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::adjacency::{Facing, TileBlocker, neighbors, walkable_neighbors_limited};
use crate::components::animation::direction_from_vector;
use crate::components::tileposition::TilePos;
use crate::resources::mapgrid::{MapGrid, OccupiedGrid};

/// How hard a unit tries to reach its goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathType {
    /// Walk toward the goal a few steps at a time; the path may stop short.
    OneStep,
    SimpleMaxNpcTry,
    PerfectMaxNpcTry,
    PerfectMaxPlayerTry,
    /// Ignore obstacles entirely.
    StraightLine,
}

impl PathType {
    /// Steps or tile expansions allowed before the search gives up.
    pub fn max_tries(self) -> Option<usize> {
        match self {
            PathType::OneStep => Some(10),
            PathType::SimpleMaxNpcTry | PathType::PerfectMaxNpcTry => Some(100),
            PathType::PerfectMaxPlayerTry => Some(500),
            PathType::StraightLine => None,
        }
    }
}

/// Frontier entry. Ordered so that `BinaryHeap` pops the lowest priority.
#[derive(Debug, Clone, Copy)]
struct PathNode {
    tile: TilePos,
    priority: f32,
    cost: f32,
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PathNode {}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.tile.cmp(&self.tile))
    }
}

fn pixel_distance(a: TilePos, b: TilePos) -> f32 {
    a.to_pixel().distance(b.to_pixel())
}

/// Path from `start` to `goal` for a unit limited to `direction_count` facings.
///
/// Returns `None` when start and goal coincide, when the goal itself is
/// blocked, or when the try budget of `path_type` runs out first.
pub fn find_path(
    start: TilePos,
    goal: TilePos,
    blocker: &impl TileBlocker,
    path_type: PathType,
    direction_count: usize,
) -> Option<Vec<TilePos>> {
    if start == goal || blocker.is_obstacle(goal) {
        return None;
    }
    let tries = path_type.max_tries();
    let path = match (path_type, tries) {
        (PathType::StraightLine, _) | (_, None) => straight_line(start, goal),
        (PathType::OneStep, Some(steps)) => {
            walk_toward(start, goal, blocker, steps, direction_count)
        }
        (PathType::SimpleMaxNpcTry, Some(max)) => {
            greedy(start, goal, blocker, max, direction_count)
        }
        (_, Some(max)) => astar(start, goal, blocker, max, direction_count),
    };
    if path.is_none() {
        log::debug!(
            target: "npc",
            "no {:?} path from {:?} to {:?}",
            path_type,
            start,
            goal
        );
    }
    path
}

/// [`find_path`] with `occupants` standing on the map as soft obstacles.
///
/// The start tile is never treated as occupied, so a unit may pass its own
/// tile in the occupant list.
pub fn find_path_among(
    start: TilePos,
    goal: TilePos,
    grid: &MapGrid,
    occupants: impl IntoIterator<Item = TilePos>,
    path_type: PathType,
    direction_count: usize,
) -> Option<Vec<TilePos>> {
    let mut blocker = OccupiedGrid::new(grid);
    blocker.occupied.extend(occupants);
    blocker.occupied.remove(&start);
    find_path(start, goal, &blocker, path_type, direction_count)
}

/// Neighbor of `tile` whose center is closest to `goal`.
fn closest_neighbor(tile: TilePos, goal: TilePos) -> TilePos {
    let target = goal.to_pixel();
    let mut best = tile;
    let mut best_distance = f32::INFINITY;
    for n in neighbors(tile) {
        let d = n.to_pixel().distance_squared(target);
        if d < best_distance {
            best = n;
            best_distance = d;
        }
    }
    best
}

fn straight_line(start: TilePos, goal: TilePos) -> Option<Vec<TilePos>> {
    let mut path = vec![start];
    let mut current = start;
    // Each step strictly closes the pixel distance, so the walk ends.
    let limit = 4 * start.distance(goal) as usize + 8;
    for _ in 0..limit {
        if current == goal {
            break;
        }
        current = closest_neighbor(current, goal);
        path.push(current);
    }
    (current == goal).then_some(path)
}

fn walk_toward(
    start: TilePos,
    goal: TilePos,
    blocker: &impl TileBlocker,
    steps: usize,
    direction_count: usize,
) -> Option<Vec<TilePos>> {
    let mut path = vec![start];
    let mut visited: FxHashSet<TilePos> = FxHashSet::default();
    visited.insert(start);
    let mut current = start;

    for _ in 0..steps {
        let heading = direction_from_vector(goal.to_pixel() - current.to_pixel(), 8);
        let open = walkable_neighbors_limited(current, blocker, direction_count);
        // Straight ahead first, then fanning out to either side.
        let next = [0, 1, 7, 2, 6, 3, 5, 4]
            .iter()
            .map(|turn| Facing::from_index(heading + turn))
            .find_map(|facing| {
                open.iter()
                    .find(|(f, t)| *f == facing && !visited.contains(t))
                    .map(|(_, t)| *t)
            });
        let Some(next) = next else {
            break;
        };
        path.push(next);
        visited.insert(next);
        current = next;
        if current == goal {
            break;
        }
    }

    (path.len() > 1).then_some(path)
}

fn greedy(
    start: TilePos,
    goal: TilePos,
    blocker: &impl TileBlocker,
    max_tries: usize,
    direction_count: usize,
) -> Option<Vec<TilePos>> {
    let mut frontier = BinaryHeap::new();
    let mut came_from: FxHashMap<TilePos, TilePos> = FxHashMap::default();
    frontier.push(PathNode {
        tile: start,
        priority: 0.0,
        cost: 0.0,
    });

    let mut tries = 0;
    while let Some(node) = frontier.pop() {
        if tries >= max_tries {
            return None;
        }
        tries += 1;
        for (_, next) in walkable_neighbors_limited(node.tile, blocker, direction_count) {
            if next == start || came_from.contains_key(&next) {
                continue;
            }
            came_from.insert(next, node.tile);
            if next == goal {
                return Some(reconstruct(&came_from, start, goal));
            }
            frontier.push(PathNode {
                tile: next,
                priority: pixel_distance(next, goal),
                cost: 0.0,
            });
        }
    }
    None
}

fn astar(
    start: TilePos,
    goal: TilePos,
    blocker: &impl TileBlocker,
    max_tries: usize,
    direction_count: usize,
) -> Option<Vec<TilePos>> {
    let mut frontier = BinaryHeap::new();
    let mut came_from: FxHashMap<TilePos, TilePos> = FxHashMap::default();
    let mut cost_so_far: FxHashMap<TilePos, f32> = FxHashMap::default();
    cost_so_far.insert(start, 0.0);
    frontier.push(PathNode {
        tile: start,
        priority: pixel_distance(start, goal),
        cost: 0.0,
    });

    let mut tries = 0;
    while let Some(node) = frontier.pop() {
        if node.tile == goal {
            return Some(reconstruct(&came_from, start, goal));
        }
        // Superseded by a cheaper entry for the same tile.
        if cost_so_far
            .get(&node.tile)
            .is_some_and(|best| node.cost > *best)
        {
            continue;
        }
        if tries >= max_tries {
            return None;
        }
        tries += 1;

        for (_, next) in walkable_neighbors_limited(node.tile, blocker, direction_count) {
            let cost = node.cost + pixel_distance(node.tile, next);
            if cost_so_far.get(&next).is_some_and(|best| *best <= cost) {
                continue;
            }
            cost_so_far.insert(next, cost);
            came_from.insert(next, node.tile);
            frontier.push(PathNode {
                tile: next,
                priority: cost + pixel_distance(next, goal),
                cost,
            });
        }
    }
    None
}

fn reconstruct(came_from: &FxHashMap<TilePos, TilePos>, start: TilePos, goal: TilePos) -> Vec<TilePos> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(prev) => {
                current = *prev;
                path.push(current);
            }
            None => break,
        }
    }
    path.reverse();
    path
}
