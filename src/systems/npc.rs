//! Unit update system.
//!
//! Runs the per-tick unit protocol and turns finalized deaths into world
//! changes: a body object where the unit fell and a loot request for the
//! drop resolver thread.
//!
//! # Related
//!
//! - [`crate::resources::npcmanager::NpcManager`]
//! - [`crate::systems::drops::apply_drop_results`] – places the loot later

use bevy_ecs::prelude::*;
use log::{debug, warn};

use crate::components::obj::ObjKind;
use crate::events::npc::NpcMessage;
use crate::events::script::ScriptCmd;
use crate::resources::definitions::{DefinitionStore, ObjDefinition};
use crate::resources::dropbridge::DropBridge;
use crate::resources::npcmanager::{FinalizedDeath, NpcManager};
use crate::resources::objmanager::ObjManager;
use crate::resources::spritestore::SpriteStore;
use crate::resources::viewrect::ViewRect;
use crate::resources::worldtime::WorldTime;

#[allow(clippy::too_many_arguments)]
pub fn update_npcs(
    time: Res<WorldTime>,
    view: Res<ViewRect>,
    mut npcs: ResMut<NpcManager>,
    mut objs: ResMut<ObjManager>,
    mut sprites: ResMut<SpriteStore>,
    mut defs: ResMut<DefinitionStore>,
    bridge: Option<Res<DropBridge>>,
    mut messages: MessageWriter<NpcMessage>,
    mut scripts: MessageWriter<ScriptCmd>,
) {
    npcs.update_visible(&view);
    let out = npcs.update(time.delta_ms, &mut *sprites);

    for death in &out.finalized {
        if let Some(path) = &death.body {
            match defs.single_obj(path) {
                Some(template) => {
                    let def = place_body(death, &template);
                    if objs.add_obj(&def).is_some() {
                        debug!(target: "npc", "{} left a body", death.name);
                    }
                }
                None => warn!(target: "npc", "body template {} for {} not found", path, death.name),
            }
        }
        if let Some(request) = &death.drop {
            match &bridge {
                Some(bridge) => bridge.request(request.clone()),
                None => debug!(target: "npc", "no drop resolver, {} drops nothing", death.name),
            }
        }
    }

    scripts.write_batch(out.scripts);
    messages.write_batch(out.messages);
}

/// Turn a body template into the object left where the unit fell.
pub fn place_body(death: &FinalizedDeath, template: &ObjDefinition) -> ObjDefinition {
    let mut def = template.clone();
    def.id = format!("body:{}:{},{}", death.name, death.tile.x, death.tile.y);
    def.kind = ObjKind::Body;
    def.tile = death.tile;
    def.direction = death.direction as i32;
    if def.name.is_empty() {
        def.name = format!("{} body", death.name);
    }
    def
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::npc::{Npc, NpcKind, Relation};
    use crate::components::tileposition::TilePos;
    use crate::resources::arena::Arena;

    #[test]
    fn body_takes_place_and_facing() {
        let mut arena = Arena::new();
        let id = arena.insert(Npc::new("wolf", NpcKind::Fighter, Relation::Hostile, TilePos::new(2, 3)));
        let death = FinalizedDeath {
            id,
            name: "wolf".into(),
            tile: TilePos::new(2, 3),
            direction: 5,
            body: Some("wolf-body.ini".into()),
            drop: None,
            removed: true,
        };
        let template = ObjDefinition {
            image: Some("wolf-dead.asf".into()),
            kind: ObjKind::Static,
            ..Default::default()
        };
        let def = place_body(&death, &template);
        assert_eq!(def.kind, ObjKind::Body);
        assert_eq!(def.tile, TilePos::new(2, 3));
        assert_eq!(def.direction, 5);
        assert_eq!(def.name, "wolf body");
        assert_eq!(def.image.as_deref(), Some("wolf-dead.asf"));
    }
}
