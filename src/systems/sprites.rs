//! Sprite loading system.
//!
//! Applies sprites decoded on the loader thread at the start of a tick, so
//! units and objects waiting on them pick them up in the same tick.

use bevy_ecs::prelude::*;
use log::debug;

use crate::resources::spritestore::SpriteStore;

/// Move finished loads from the loader thread into the cache.
pub fn poll_sprite_loads(mut sprites: ResMut<SpriteStore>) {
    let applied = sprites.poll();
    if applied > 0 {
        debug!(target: "sprites", "{} sprite loads applied, {} pending", applied, sprites.pending_count());
    }
}
