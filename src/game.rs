//! Simulation setup and the tick loop.
//!
//! [`Simulation`] owns a `bevy_ecs` [`World`] holding every manager as a
//! resource and the [`Schedule`] that advances them. One call to
//! [`Simulation::tick`] runs:
//!
//! 1. [`update_world_time`] with the tick length
//! 2. [`poll_sprite_loads`] – sprites decoded since the last tick
//! 3. [`update_npcs`] – visible set, unit updates, finalized deaths
//! 4. [`update_objects`] – visible set, timers, animation, sound emitters
//! 5. [`apply_drop_results`] – loot resolved on the drop thread
//!
//! and returns the commands the tick produced for the script runner and the
//! audio collaborator.

use std::sync::Arc;

use bevy_ecs::prelude::*;
use glam::Vec2;
use log::{info, warn};

use crate::components::npc::{Npc, NpcId};
use crate::components::obj::ObjId;
use crate::events::audio::AudioCmd;
use crate::events::npc::NpcMessage;
use crate::events::script::ScriptCmd;
use crate::resources::definitions::{DefinitionStore, ObjDefinition};
use crate::resources::dropbridge::{setup_drops, shutdown_drops, DropResolver, TemplateDropResolver};
use crate::resources::gameconfig::SimConfig;
use crate::resources::npcmanager::NpcManager;
use crate::resources::objmanager::ObjManager;
use crate::resources::overrides::ObjOverrides;
use crate::resources::spriteset::SpriteSet;
use crate::resources::spritestore::SpriteStore;
use crate::resources::viewrect::ViewRect;
use crate::resources::worldtime::WorldTime;
use crate::systems::drops::apply_drop_results;
use crate::systems::npc::update_npcs;
use crate::systems::obj::update_objects;
use crate::systems::sprites::poll_sprite_loads;
use crate::systems::time::update_world_time;

/// Commands and notifications produced by one tick, in emission order.
#[derive(Debug, Default)]
pub struct TickOutput {
    pub scripts: Vec<ScriptCmd>,
    pub audio: Vec<AudioCmd>,
    pub npc_events: Vec<NpcMessage>,
}

pub struct Simulation {
    world: World,
    schedule: Schedule,
}

impl Simulation {
    /// Simulation reading assets under the configured root, with sprites
    /// decoded and loot resolved on background threads.
    pub fn new(config: SimConfig) -> Self {
        let sprites = SpriteStore::threaded(config.asset_root.clone());
        let resolver = TemplateDropResolver::new(config.asset_root.clone(), config.seed)
            .with_chance(config.drop_chance)
            .with_level_table(config.drop_table.clone());
        Self::with_parts(config, sprites, Some(Box::new(resolver)))
    }

    /// Simulation built from explicit parts. Without a resolver no loot is
    /// ever dropped.
    pub fn with_parts(
        config: SimConfig,
        sprites: SpriteStore,
        resolver: Option<Box<dyn DropResolver>>,
    ) -> Self {
        let mut world = World::new();
        let (width, height) = config.view_size();

        let mut npcs = NpcManager::new();
        npcs.update_offscreen = config.update_offscreen_npcs;

        world.insert_resource(WorldTime::default());
        world.insert_resource(ViewRect::new(0.0, 0.0, width, height));
        world.insert_resource(DefinitionStore::new(config.asset_root.clone()));
        world.insert_resource(ObjManager::new(config.seed, config.random_sound_chance));
        world.insert_resource(npcs);
        world.insert_resource(sprites);
        world.insert_resource(config);
        world.insert_resource(Messages::<ScriptCmd>::default());
        world.insert_resource(Messages::<AudioCmd>::default());
        world.insert_resource(Messages::<NpcMessage>::default());
        if let Some(resolver) = resolver {
            setup_drops(&mut world, resolver);
        }

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                poll_sprite_loads,
                update_npcs,
                update_objects,
                apply_drop_results,
            )
                .chain(),
        );

        Self { world, schedule }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    pub fn time(&self) -> &WorldTime {
        self.world.resource::<WorldTime>()
    }

    pub fn npcs(&self) -> &NpcManager {
        self.world.resource::<NpcManager>()
    }

    pub fn npcs_mut(&mut self) -> Mut<'_, NpcManager> {
        self.world.resource_mut::<NpcManager>()
    }

    pub fn objs(&self) -> &ObjManager {
        self.world.resource::<ObjManager>()
    }

    pub fn objs_mut(&mut self) -> Mut<'_, ObjManager> {
        self.world.resource_mut::<ObjManager>()
    }

    pub fn sprites_mut(&mut self) -> Mut<'_, SpriteStore> {
        self.world.resource_mut::<SpriteStore>()
    }

    pub fn definitions_mut(&mut self) -> Mut<'_, DefinitionStore> {
        self.world.resource_mut::<DefinitionStore>()
    }

    pub fn view(&self) -> ViewRect {
        *self.world.resource::<ViewRect>()
    }

    pub fn set_view(&mut self, view: ViewRect) {
        self.world.insert_resource(view);
    }

    pub fn center_view_on(&mut self, pixel: Vec2) {
        self.world.resource_mut::<ViewRect>().center_on(pixel);
    }

    /// Center the view on the player, if there is one.
    pub fn follow_player(&mut self) {
        let npcs = self.npcs();
        if let Some(pixel) = npcs.player().and_then(|id| npcs.get(id)).map(|p| p.pixel()) {
            self.center_view_on(pixel);
        }
    }

    /// Load a map from definition files under the asset root.
    ///
    /// Returns the number of objects and units created.
    pub fn load_map(
        &mut self,
        map: &str,
        obj_file: Option<&str>,
        npc_file: Option<&str>,
    ) -> Result<(usize, usize), String> {
        let mut defs = self.world.resource_mut::<DefinitionStore>();
        let obj_defs = match obj_file {
            Some(path) => defs
                .obj_file(path)
                .ok_or_else(|| format!("Failed to load object file {}", path))?,
            None => Arc::new(Vec::new()),
        };
        let npc_defs = match npc_file {
            Some(path) => defs
                .npc_file(path)
                .ok_or_else(|| format!("Failed to load npc file {}", path))?,
            None => Arc::new(Vec::new()),
        };
        let npcs: Vec<Npc> = npc_defs
            .iter()
            .map(|def| {
                let appearance = def
                    .appearance
                    .as_deref()
                    .and_then(|path| defs.sprite_set(path))
                    .unwrap_or_else(|| Arc::new(SpriteSet::new()));
                Npc::from_definition(def, appearance)
            })
            .collect();
        Ok(self.load_map_with(map, &obj_defs, npcs))
    }

    /// Load a map from definitions already in memory.
    pub fn load_map_with(
        &mut self,
        map: &str,
        objs: &[ObjDefinition],
        npcs: Vec<Npc>,
    ) -> (usize, usize) {
        let mut obj_mgr = self.world.resource_mut::<ObjManager>();
        let obj_count = obj_mgr.load_map(map, objs);
        let generation = obj_mgr.generation();
        let npc_count = self
            .world
            .resource_mut::<NpcManager>()
            .load(npcs, generation);
        info!("map {} loaded: {} objects, {} units", map, obj_count, npc_count);
        (obj_count, npc_count)
    }

    /// Play an object forward to its last frame.
    pub fn open_obj(&mut self, id: ObjId) -> bool {
        self.world
            .resource_scope(|world, mut objs: Mut<ObjManager>| {
                let mut sprites = world.resource_mut::<SpriteStore>();
                objs.open(id, &mut *sprites)
            })
    }

    /// Play an object backwards to its first frame.
    pub fn close_obj(&mut self, id: ObjId) -> bool {
        self.world
            .resource_scope(|world, mut objs: Mut<ObjManager>| {
                let mut sprites = world.resource_mut::<SpriteStore>();
                objs.close(id, &mut *sprites)
            })
    }

    /// Deal damage to a unit. Returns true when the blow killed it.
    pub fn damage_npc(&mut self, id: NpcId, amount: i32, attacker: Option<&str>) -> bool {
        self.world
            .resource_scope(|world, mut npcs: Mut<NpcManager>| {
                let mut sprites = world.resource_mut::<SpriteStore>();
                npcs.damage(id, amount, attacker, &mut *sprites)
            })
    }

    /// Override table as JSON, for save games.
    pub fn save_overrides(&self) -> Result<String, String> {
        self.objs().overrides().to_json()
    }

    /// Restore the override table; it applies from the next map load.
    pub fn restore_overrides(&mut self, json: &str) -> Result<(), String> {
        let table = ObjOverrides::from_json(json)?;
        self.objs_mut().set_overrides(table);
        Ok(())
    }

    /// Advance the simulation by `dt_ms` milliseconds.
    pub fn tick(&mut self, dt_ms: f32) -> TickOutput {
        update_world_time(&mut self.world, dt_ms);
        self.schedule.run(&mut self.world);
        TickOutput {
            scripts: self
                .world
                .resource_mut::<Messages<ScriptCmd>>()
                .drain()
                .collect(),
            audio: self
                .world
                .resource_mut::<Messages<AudioCmd>>()
                .drain()
                .collect(),
            npc_events: self
                .world
                .resource_mut::<Messages<NpcMessage>>()
                .drain()
                .collect(),
        }
    }

    /// Stop the background threads. Safe to call more than once.
    pub fn shutdown(&mut self) {
        shutdown_drops(&mut self.world);
        match self.world.get_resource_mut::<SpriteStore>() {
            Some(mut sprites) => sprites.shutdown(),
            None => warn!("sprite store missing at shutdown"),
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.shutdown();
    }
}
