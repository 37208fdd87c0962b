//! Object update system.
//!
//! Rebuilds the visible object set, then advances every object and forwards
//! the script and audio commands it produced.
//!
//! # Related
//!
//! - [`crate::resources::objmanager::ObjManager`]

use bevy_ecs::prelude::*;
use log::debug;

use crate::events::audio::AudioCmd;
use crate::events::script::ScriptCmd;
use crate::resources::objmanager::ObjManager;
use crate::resources::spritestore::SpriteStore;
use crate::resources::viewrect::ViewRect;
use crate::resources::worldtime::WorldTime;

pub fn update_objects(
    time: Res<WorldTime>,
    view: Res<ViewRect>,
    mut objs: ResMut<ObjManager>,
    mut sprites: ResMut<SpriteStore>,
    mut scripts: MessageWriter<ScriptCmd>,
    mut audio: MessageWriter<AudioCmd>,
) {
    objs.update_visible(&view);
    let tick = objs.update(time.delta_ms, &mut *sprites);
    for id in &tick.removed {
        debug!(target: "obj", "{} removed", id);
    }
    scripts.write_batch(tick.scripts);
    audio.write_batch(tick.audio);
}
