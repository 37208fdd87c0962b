//! Loot resolution requests and answers.
//!
//! When a unit's death is finalized the unit systems send a [`DropRequest`]
//! to the drop resolver thread. The answer may arrive several ticks later,
//! after the map has changed or the requesting unit is gone, so each request
//! carries the map generation it was issued in.

use crate::components::tileposition::TilePos;
use crate::resources::definitions::ObjDefinition;

#[derive(Debug, Clone, PartialEq)]
pub struct DropRequest {
    pub npc_name: String,
    pub level: i32,
    pub tile: TilePos,
    /// The dead unit fought the player.
    pub is_enemy: bool,
    /// Explicit loot template configured on the unit.
    pub drop_ini: Option<String>,
    pub map_generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropResult {
    pub request: DropRequest,
    pub definition: Option<ObjDefinition>,
}

/// Commands for the drop resolver thread.
#[derive(Debug, Clone, PartialEq)]
pub enum DropCmd {
    Resolve(DropRequest),
    Shutdown,
}
