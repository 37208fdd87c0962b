//! ECS resources that bridge the main thread with the background drop
//! resolver thread.
//!
//! Use [`setup_drops`] once during initialization to spawn the resolver
//! thread and insert the [`DropBridge`] resource. Call [`shutdown_drops`]
//! during teardown to stop and join the thread.
//!
//! What a unit drops is decided by a [`DropResolver`]. The default
//! [`TemplateDropResolver`] reads loot templates from disk, so it runs off
//! the main thread and its answers arrive a few ticks later.

use std::path::PathBuf;

use bevy_ecs::prelude::*;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;

use crate::components::obj::ObjKind;
use crate::events::drop::{DropCmd, DropRequest, DropResult};
use crate::resources::definitions::{DefinitionStore, ObjDefinition};
use crate::systems::drops::drop_thread;

/// Decides what, if anything, a dead unit leaves behind.
pub trait DropResolver: Send {
    fn resolve(&mut self, request: &DropRequest) -> Option<ObjDefinition>;
}

/// One row of the random loot table: units up to `max_level` use `template`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelDrop {
    pub max_level: i32,
    pub template: String,
}

/// Resolves loot from object templates on disk.
///
/// A unit with an explicit drop template always drops it. Other enemies
/// roll `chance_percent` and pick the first level table row that covers
/// their level, or the last row when none does.
pub struct TemplateDropResolver {
    defs: DefinitionStore,
    table: Vec<LevelDrop>,
    chance_percent: u32,
    rng: fastrand::Rng,
}

impl TemplateDropResolver {
    pub fn new(root: impl Into<PathBuf>, seed: u64) -> Self {
        Self {
            defs: DefinitionStore::new(root),
            table: Vec::new(),
            chance_percent: 0,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    pub fn with_level_table(mut self, mut table: Vec<LevelDrop>) -> Self {
        table.sort_by_key(|row| row.max_level);
        self.table = table;
        self
    }

    pub fn with_chance(mut self, percent: u32) -> Self {
        self.chance_percent = percent.min(100);
        self
    }

    /// Register a template without touching the disk.
    pub fn insert_template(&mut self, path: impl Into<String>, def: ObjDefinition) {
        self.defs.insert_single_obj(path, def);
    }

    fn template(&mut self, path: &str) -> Option<ObjDefinition> {
        self.defs.single_obj(path).map(|def| (*def).clone())
    }
}

impl DropResolver for TemplateDropResolver {
    fn resolve(&mut self, request: &DropRequest) -> Option<ObjDefinition> {
        if let Some(path) = &request.drop_ini {
            return self.template(path);
        }
        if !request.is_enemy || self.table.is_empty() {
            return None;
        }
        if self.rng.u32(0..100) >= self.chance_percent {
            return None;
        }
        let path = self
            .table
            .iter()
            .find(|row| request.level <= row.max_level)
            .or(self.table.last())
            .map(|row| row.template.clone())?;
        self.template(&path)
    }
}

/// Shared bridge between the ECS world and the drop resolver thread.
#[derive(Resource)]
pub struct DropBridge {
    /// Sender for [`DropCmd`] messages (ECS -> resolver thread).
    pub tx_cmd: Sender<DropCmd>,
    /// Receiver for [`DropResult`] answers (resolver thread -> ECS).
    pub rx_result: Receiver<DropResult>,
    /// Join handle for the resolver thread.
    pub handle: std::thread::JoinHandle<()>,
}

impl DropBridge {
    pub fn request(&self, request: DropRequest) {
        debug!(target: "drop", "request loot for {}", request.npc_name);
        // Ignore send error on shutdown.
        let _ = self.tx_cmd.send(DropCmd::Resolve(request));
    }
}

/// Spawn the resolver thread and register the bridge resource.
pub fn setup_drops(world: &mut World, resolver: Box<dyn DropResolver>) {
    let (tx_cmd, rx_cmd) = unbounded::<DropCmd>();
    let (tx_result, rx_result) = unbounded::<DropResult>();

    let handle = std::thread::spawn(move || drop_thread(resolver, rx_cmd, tx_result));

    world.insert_resource(DropBridge {
        tx_cmd,
        rx_result,
        handle,
    });
}

/// Request shutdown of the resolver thread and join it.
pub fn shutdown_drops(world: &mut World) {
    if let Some(bridge) = world.remove_resource::<DropBridge>() {
        let _ = bridge.tx_cmd.send(DropCmd::Shutdown);
        let _ = bridge.handle.join();
    }
}

/// Turn a resolved template into the object placed on the map.
///
/// The id is derived from the unit and tile, so a result delivered twice
/// maps onto the same object.
pub fn place_drop(request: &DropRequest, template: &ObjDefinition) -> ObjDefinition {
    let mut def = template.clone();
    def.id = format!(
        "drop:{}:{},{}",
        request.npc_name, request.tile.x, request.tile.y
    );
    def.kind = ObjKind::Drop;
    def.tile = request.tile;
    if def.name.is_empty() {
        def.name = format!("{} loot", request.npc_name);
    }
    def
}
