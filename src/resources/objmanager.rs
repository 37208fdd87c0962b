//! Interactive object registry.
//!
//! [`ObjManager`] owns every object of the current map, the per-map override
//! table and the per-tick visible set.
//!
//! # How It Works
//!
//! - [`ObjManager::load_map`] creates objects from definitions after patching
//!   them with the override table; removed objects are skipped.
//! - Scripting operations ([`ObjManager::open`], [`ObjManager::close`],
//!   [`ObjManager::set_script`], [`ObjManager::delete`]) record the change in
//!   the override table first and then apply it to the live object.
//! - [`ObjManager::update`] runs timers, removal countdowns, animation and
//!   sound emitters, and returns the script and audio commands they produced.
//! - [`ObjManager::update_visible`] rebuilds the visible set and its row
//!   grouping once per tick for the renderer.
//!
//! # Related
//!
//! - [`crate::resources::overrides::ObjOverrides`] – the persisted table
//! - [`crate::systems::obj::update_objects`] – per-tick driver

use bevy_ecs::prelude::Resource;
use glam::Vec2;
use log::{debug, warn};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::components::obj::{Obj, ObjId, ObjKind};
use crate::components::tileposition::TilePos;
use crate::events::audio::AudioCmd;
use crate::events::script::{ScriptCmd, ScriptOwner};
use crate::resources::arena::Arena;
use crate::resources::definitions::ObjDefinition;
use crate::resources::overrides::ObjOverrides;
use crate::resources::spritestore::SpriteSource;
use crate::resources::viewrect::ViewRect;

/// Default odds of a random sound emitter triggering on a given tick.
pub const DEFAULT_RANDOM_SOUND_ONE_IN: u32 = 200;

/// Commands produced by one [`ObjManager::update`].
#[derive(Debug, Default)]
pub struct ObjTick {
    pub scripts: Vec<ScriptCmd>,
    pub audio: Vec<AudioCmd>,
    /// Objects pruned this tick.
    pub removed: Vec<String>,
}

#[derive(Resource)]
pub struct ObjManager {
    map: String,
    generation: u64,
    objs: Arena<Obj>,
    by_id: FxHashMap<String, ObjId>,
    by_tile: FxHashMap<TilePos, SmallVec<[ObjId; 2]>>,
    overrides: ObjOverrides,
    visible: Vec<ObjId>,
    rows: FxHashMap<i32, SmallVec<[ObjId; 4]>>,
    rng: fastrand::Rng,
    random_sound_one_in: u32,
    audio_out: Vec<AudioCmd>,
}

impl Default for ObjManager {
    fn default() -> Self {
        Self::new(0, DEFAULT_RANDOM_SOUND_ONE_IN)
    }
}

impl ObjManager {
    pub fn new(seed: u64, random_sound_one_in: u32) -> Self {
        Self {
            map: String::new(),
            generation: 0,
            objs: Arena::new(),
            by_id: FxHashMap::default(),
            by_tile: FxHashMap::default(),
            overrides: ObjOverrides::new(),
            visible: Vec::new(),
            rows: FxHashMap::default(),
            rng: fastrand::Rng::with_seed(seed),
            random_sound_one_in: random_sound_one_in.max(1),
            audio_out: Vec::new(),
        }
    }

    pub fn map_name(&self) -> &str {
        &self.map
    }

    /// Bumped on every map load; stale asynchronous results compare against it.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.objs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objs.is_empty()
    }

    pub fn overrides(&self) -> &ObjOverrides {
        &self.overrides
    }

    /// Replace the override table, e.g. from a save game. Takes effect on
    /// the next map load.
    pub fn set_overrides(&mut self, overrides: ObjOverrides) {
        self.overrides = overrides;
    }

    /// Drop every live object. Overrides are kept.
    pub fn unload(&mut self) {
        for (_, obj) in self.objs.iter() {
            if obj.sound_started {
                self.audio_out.push(AudioCmd::Stop {
                    emitter: emitter_name(&self.map, &obj.id),
                });
            }
        }
        self.objs.clear();
        self.by_id.clear();
        self.by_tile.clear();
        self.visible.clear();
        self.rows.clear();
    }

    /// Replace the live objects with those of `map`.
    ///
    /// Each definition is patched with the recorded override; removed ones
    /// are skipped. Returns how many objects were created.
    pub fn load_map(&mut self, map: &str, defs: &[ObjDefinition]) -> usize {
        self.unload();
        self.map = map.to_string();
        self.generation += 1;
        for def in defs {
            let mut def = def.clone();
            if !self.overrides.apply(map, &mut def) {
                debug!(target: "obj", "{} {} stays removed", map, def.id);
                continue;
            }
            self.insert(Obj::from_definition(&def));
        }
        debug!(target: "obj", "loaded {} objects for {}", self.objs.len(), map);
        self.objs.len()
    }

    fn insert(&mut self, obj: Obj) -> ObjId {
        let key = obj.id.clone();
        let tile = obj.tile();
        let id = self.objs.insert(obj);
        self.by_id.insert(key, id);
        self.by_tile.entry(tile).or_default().push(id);
        id
    }

    /// Add an object at runtime (bodies, loot). Ignored when an object with
    /// the same id already exists on this map.
    pub fn add_obj(&mut self, def: &ObjDefinition) -> Option<ObjId> {
        if self.by_id.contains_key(&def.id) || self.overrides.is_removed(&self.map, &def.id) {
            debug!(target: "obj", "skip duplicate {}", def.id);
            return None;
        }
        let mut def = def.clone();
        self.overrides.apply(&self.map, &mut def);
        Some(self.insert(Obj::from_definition(&def)))
    }

    pub fn get(&self, id: ObjId) -> Option<&Obj> {
        self.objs.get(id).filter(|o| !o.removed)
    }

    pub fn get_mut(&mut self, id: ObjId) -> Option<&mut Obj> {
        self.objs.get_mut(id).filter(|o| !o.removed)
    }

    /// Object by its map id.
    pub fn find(&self, obj_id: &str) -> Option<ObjId> {
        self.by_id
            .get(obj_id)
            .copied()
            .filter(|id| self.get(*id).is_some())
    }

    /// First live object with the given display name.
    pub fn find_by_name(&self, name: &str) -> Option<ObjId> {
        self.objs
            .iter()
            .find(|(_, o)| !o.removed && o.name == name)
            .map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjId, &Obj)> {
        self.objs.iter().filter(|(_, o)| !o.removed)
    }

    pub fn at_tile(&self, tile: TilePos) -> impl Iterator<Item = (ObjId, &Obj)> {
        self.by_tile
            .get(&tile)
            .into_iter()
            .flatten()
            .filter_map(|id| self.get(*id).map(|o| (*id, o)))
    }

    /// Some live object on `tile` blocks movement.
    pub fn is_obstacle(&self, tile: TilePos) -> bool {
        self.at_tile(tile).any(|(_, o)| o.is_obstacle())
    }

    /// Trap on `tile`, if any.
    pub fn trap_at(&self, tile: TilePos) -> Option<ObjId> {
        self.at_tile(tile)
            .find(|(_, o)| o.kind == ObjKind::Trap)
            .map(|(id, _)| id)
    }

    /// Closest interactive object within `max_distance` pixels of `pixel`.
    pub fn closest_interactive(&self, pixel: Vec2, max_distance: f32) -> Option<ObjId> {
        self.iter()
            .filter(|(_, o)| o.is_interactive())
            .map(|(id, o)| (id, o.pixel().distance(pixel)))
            .filter(|(_, d)| *d <= max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    fn ensure_sprite(obj: &mut Obj, sprites: &mut impl SpriteSource) {
        if obj.anim.has_sprite() {
            return;
        }
        if let Some(sprite) = obj.image.as_deref().and_then(|p| sprites.fetch(p)) {
            obj.attach_sprite(sprite);
        }
    }

    /// Play forward to the last frame of the current facing.
    ///
    /// The final frame is recorded before the animation starts. Objects
    /// without a decoded sprite cannot be opened.
    pub fn open(&mut self, id: ObjId, sprites: &mut impl SpriteSource) -> bool {
        self.open_or_close(id, sprites, false)
    }

    /// Play backwards to the first frame of the current facing.
    pub fn close(&mut self, id: ObjId, sprites: &mut impl SpriteSource) -> bool {
        self.open_or_close(id, sprites, true)
    }

    fn open_or_close(&mut self, id: ObjId, sprites: &mut impl SpriteSource, reverse: bool) -> bool {
        let Some(obj) = self.objs.get_mut(id).filter(|o| !o.removed) else {
            return false;
        };
        Self::ensure_sprite(obj, sprites);
        if !obj.anim.has_sprite() {
            warn!(target: "obj", "{} has no sprite to animate", obj.id);
            return false;
        }
        let current = obj.anim.current_frame();
        let (target, steps) = if reverse {
            let begin = obj.anim.frame_begin();
            (begin, current - begin)
        } else {
            let end = obj.anim.frame_end();
            (end, end - current)
        };
        self.overrides.set_frame(&self.map, &obj.id, target);
        obj.anim.end_playing();
        obj.anim.play_frames(steps as u32, reverse);
        true
    }

    /// Change the interaction script; an empty script disables interaction.
    pub fn set_script(&mut self, id: ObjId, script: &str) -> bool {
        let Some(obj) = self.objs.get_mut(id).filter(|o| !o.removed) else {
            return false;
        };
        self.overrides.set_script(&self.map, &obj.id, script);
        obj.script = Some(script.to_string()).filter(|s| !s.is_empty());
        true
    }

    /// Remove the object for good; it will not come back with the map.
    pub fn delete(&mut self, id: ObjId) -> bool {
        let Some(obj) = self.objs.get_mut(id).filter(|o| !o.removed) else {
            return false;
        };
        self.overrides.set_removed(&self.map, &obj.id);
        obj.removed = true;
        true
    }

    /// Rebuild the visible set and its per-row grouping.
    pub fn update_visible(&mut self, view: &ViewRect) {
        self.visible.clear();
        self.rows.clear();
        for (id, obj) in self.objs.iter() {
            if obj.is_visible() && obj.bounds().intersects(view) {
                self.visible.push(id);
                self.rows.entry(obj.tile().y).or_default().push(id);
            }
        }
    }

    pub fn visible(&self) -> &[ObjId] {
        &self.visible
    }

    /// Visible objects standing on row `y`.
    pub fn row(&self, y: i32) -> &[ObjId] {
        self.rows.get(&y).map(|r| r.as_slice()).unwrap_or(&[])
    }

    pub fn rows(&self) -> &FxHashMap<i32, SmallVec<[ObjId; 4]>> {
        &self.rows
    }

    /// Advance every object by `delta_ms`.
    pub fn update(&mut self, delta_ms: f32, sprites: &mut impl SpriteSource) -> ObjTick {
        let mut tick = ObjTick {
            audio: std::mem::take(&mut self.audio_out),
            ..Default::default()
        };
        let map = self.map.clone();

        for (_, obj) in self.objs.iter_mut() {
            if obj.removed {
                continue;
            }
            Self::ensure_sprite(obj, sprites);

            if let Some(timer) = obj.timer.as_mut() {
                if timer.tick(delta_ms) {
                    tick.scripts.push(ScriptCmd::Queue {
                        path: timer.script.clone(),
                        owner: ScriptOwner::Obj {
                            map: map.clone(),
                            id: obj.id.clone(),
                        },
                    });
                }
            }

            if let Some(left) = obj.remove_countdown_ms.as_mut() {
                *left -= delta_ms;
                if *left <= 0.0 {
                    obj.removed = true;
                    continue;
                }
            }

            if obj.kind.auto_plays() || obj.anim.is_playing() {
                obj.anim.advance(delta_ms, 1.0);
            }

            if obj.kind.is_sound() {
                if let Some(cmd) = sound_command(&map, obj, &mut self.rng, self.random_sound_one_in) {
                    tick.audio.push(cmd);
                }
            }
        }

        self.prune(&mut tick);
        tick
    }

    fn prune(&mut self, tick: &mut ObjTick) {
        let gone: Vec<ObjId> = self
            .objs
            .iter()
            .filter(|(_, o)| o.removed)
            .map(|(id, _)| id)
            .collect();
        for id in gone {
            let Some(obj) = self.objs.remove(id) else {
                continue;
            };
            if obj.sound_started {
                tick.audio.push(AudioCmd::Stop {
                    emitter: emitter_name(&self.map, &obj.id),
                });
            }
            self.by_id.remove(&obj.id);
            if let Some(bucket) = self.by_tile.get_mut(&obj.tile()) {
                bucket.retain(|b| *b != id);
            }
            self.visible.retain(|v| *v != id);
            tick.removed.push(obj.id);
        }
    }
}

fn sound_command(
    map: &str,
    obj: &mut Obj,
    rng: &mut fastrand::Rng,
    one_in: u32,
) -> Option<AudioCmd> {
    let path = obj.sound.clone()?;
    let emitter = emitter_name(map, &obj.id);
    let position = obj.pixel();
    match obj.kind {
        ObjKind::LoopingSound if !obj.sound_started => {
            obj.sound_started = true;
            Some(AudioCmd::PlayLoopAt {
                emitter,
                path,
                position,
            })
        }
        ObjKind::RandomSound if rng.u32(0..one_in) == 0 => {
            obj.sound_started = true;
            Some(AudioCmd::PlayRandomAt {
                emitter,
                path,
                position,
            })
        }
        _ if obj.sound_started => Some(AudioCmd::UpdatePosition { emitter, position }),
        _ => None,
    }
}

/// Audio emitter name of an object.
pub fn emitter_name(map: &str, obj_id: &str) -> String {
    format!("{}/{}", map, obj_id)
}
