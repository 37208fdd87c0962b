//! Unit registry and relational queries.
//!
//! [`NpcManager`] owns every unit of the current map in a generational
//! arena. Names are a secondary, non-unique index built on first lookup and
//! dropped whenever the registry may have changed.
//!
//! # Per-tick protocol
//!
//! 1. [`NpcManager::update_visible`] scans all units once, recording which
//!    ones intersect the view and grouping them by tile row.
//! 2. [`NpcManager::update`] advances visible living units (or all of them
//!    when off-screen updates are enabled), plays out death animations and
//!    finalizes deaths exactly once. A finalized unit either leaves the
//!    registry or waits for its revive timer.
//!
//! Queries made later in the same tick reuse the visible set.
//!
//! # Related
//!
//! - [`crate::components::npc::Npc`] – the unit itself
//! - [`crate::systems::npc::update_npcs`] – spawns bodies and requests loot

use std::sync::OnceLock;

use bevy_ecs::prelude::Resource;
use glam::Vec2;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::adjacency::neighbors;
use crate::components::npc::{Npc, NpcId};
use crate::components::tileposition::TilePos;
use crate::events::drop::DropRequest;
use crate::events::npc::NpcMessage;
use crate::events::script::{ScriptCmd, ScriptOwner};
use crate::resources::arena::Arena;
use crate::resources::spritestore::SpriteSource;
use crate::resources::viewrect::ViewRect;

/// Updates a death record stays in the recently-dead ring.
pub const RECENT_DEATH_FRAMES: u32 = 10;

/// Which units a closest-unit query accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFilter {
    /// Units opposed to the given one.
    EnemyOf(NpcId),
    /// Fighters on the same side as the given one.
    FriendOf(NpcId),
    NeutralFighter,
    AnyFighter,
}

/// The parts of a unit that decide who it fights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allegiance {
    pub can_fight: bool,
    pub player: bool,
    pub partner: bool,
    pub fighter_friend: bool,
    pub group: i32,
}

impl Allegiance {
    pub fn of(npc: &Npc) -> Self {
        Self {
            can_fight: npc.can_fight(),
            player: npc.is_player(),
            partner: npc.is_partner(),
            fighter_friend: npc.is_fighter_friend(),
            group: npc.group,
        }
    }

    /// The player or an allied fighter.
    fn leads_player_side(&self) -> bool {
        self.player || self.fighter_friend
    }

    /// Anyone fighting along with the player, partners included.
    fn with_player(&self) -> bool {
        self.player || self.partner || self.fighter_friend
    }

    /// Opposition between two allegiances; symmetric in its arguments.
    ///
    /// The player and allied fighters oppose any fighter not with the
    /// player. Every other pair of fighters is opposed when their groups
    /// differ.
    pub fn opposes(&self, other: &Allegiance) -> bool {
        if !self.can_fight || !other.can_fight {
            return false;
        }
        (self.leads_player_side() && !other.with_player())
            || (other.leads_player_side() && !self.with_player())
            || self.group != other.group
    }
}

#[derive(Debug, Clone)]
struct DeathRecord {
    id: NpcId,
    allegiance: Allegiance,
    killer: Option<String>,
    frames_left: u32,
}

/// What happened to one unit whose death was finalized this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedDeath {
    pub id: NpcId,
    pub name: String,
    pub tile: TilePos,
    pub direction: usize,
    /// Body template to place, unless the unit leaves no body.
    pub body: Option<String>,
    pub drop: Option<DropRequest>,
    /// The unit left the registry; otherwise it waits to be revived.
    pub removed: bool,
}

/// Everything one [`NpcManager::update`] produced.
#[derive(Debug, Default)]
pub struct NpcUpdate {
    pub messages: Vec<NpcMessage>,
    pub scripts: Vec<ScriptCmd>,
    pub finalized: Vec<FinalizedDeath>,
}

#[derive(Resource, Default)]
pub struct NpcManager {
    npcs: Arena<Npc>,
    name_index: OnceLock<FxHashMap<String, SmallVec<[NpcId; 1]>>>,
    visible: Vec<NpcId>,
    visible_set: FxHashSet<NpcId>,
    rows: FxHashMap<i32, SmallVec<[NpcId; 4]>>,
    recent: Vec<DeathRecord>,
    outbox: NpcUpdate,
    map_generation: u64,
    /// Living units outside the view keep updating.
    pub update_offscreen: bool,
}

impl NpcManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.npcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.npcs.is_empty()
    }

    pub fn map_generation(&self) -> u64 {
        self.map_generation
    }

    /// Replace every unit, e.g. on map change.
    pub fn load(&mut self, npcs: impl IntoIterator<Item = Npc>, map_generation: u64) -> usize {
        self.clear();
        self.map_generation = map_generation;
        for npc in npcs {
            self.npcs.insert(npc);
        }
        debug!(target: "npc", "loaded {} units", self.npcs.len());
        self.npcs.len()
    }

    pub fn clear(&mut self) {
        self.npcs.clear();
        self.name_index = OnceLock::new();
        self.visible.clear();
        self.visible_set.clear();
        self.rows.clear();
        self.recent.clear();
        self.outbox = NpcUpdate::default();
    }

    pub fn add(&mut self, npc: Npc) -> NpcId {
        self.name_index = OnceLock::new();
        self.npcs.insert(npc)
    }

    pub fn remove(&mut self, id: NpcId) -> Option<Npc> {
        let npc = self.npcs.remove(id)?;
        self.name_index = OnceLock::new();
        self.visible.retain(|v| *v != id);
        self.visible_set.remove(&id);
        for row in self.rows.values_mut() {
            row.retain(|v| *v != id);
        }
        Some(npc)
    }

    pub fn get(&self, id: NpcId) -> Option<&Npc> {
        self.npcs.get(id)
    }

    /// Mutable access. The name index is rebuilt on the next lookup in
    /// case the name changes.
    pub fn get_mut(&mut self, id: NpcId) -> Option<&mut Npc> {
        self.name_index = OnceLock::new();
        self.npcs.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NpcId, &Npc)> {
        self.npcs.iter()
    }

    fn name_index(&self) -> &FxHashMap<String, SmallVec<[NpcId; 1]>> {
        self.name_index.get_or_init(|| {
            let mut index: FxHashMap<String, SmallVec<[NpcId; 1]>> = FxHashMap::default();
            for (id, npc) in self.npcs.iter() {
                index.entry(npc.name.clone()).or_default().push(id);
            }
            index
        })
    }

    pub fn find_by_name(&self, name: &str) -> Option<NpcId> {
        self.name_index().get(name).and_then(|ids| ids.first().copied())
    }

    pub fn find_all_by_name(&self, name: &str) -> &[NpcId] {
        self.name_index()
            .get(name)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn player(&self) -> Option<NpcId> {
        self.npcs
            .iter()
            .find(|(_, npc)| npc.is_player())
            .map(|(id, _)| id)
    }

    /// Recompute the visible set and its per-row grouping.
    pub fn update_visible(&mut self, view: &ViewRect) {
        self.visible.clear();
        self.visible_set.clear();
        self.rows.clear();
        for (id, npc) in self.npcs.iter() {
            if !npc.hidden && npc.bounds().intersects(view) {
                self.visible.push(id);
                self.visible_set.insert(id);
                self.rows.entry(npc.tile().y).or_default().push(id);
            }
        }
    }

    pub fn visible(&self) -> &[NpcId] {
        &self.visible
    }

    pub fn is_visible(&self, id: NpcId) -> bool {
        self.visible_set.contains(&id)
    }

    /// Visible units standing on row `y`.
    pub fn row(&self, y: i32) -> &[NpcId] {
        self.rows.get(&y).map(|r| r.as_slice()).unwrap_or(&[])
    }

    pub fn rows(&self) -> &FxHashMap<i32, SmallVec<[NpcId; 4]>> {
        &self.rows
    }

    /// Opposition rule shared by every combat decision.
    ///
    /// Only units able to fight can be opposed. See [`Allegiance::opposes`].
    pub fn is_opposed(a: &Npc, b: &Npc) -> bool {
        Allegiance::of(a).opposes(&Allegiance::of(b))
    }

    fn record_death(&mut self, id: NpcId) {
        let Some(npc) = self.npcs.get(id) else {
            return;
        };
        self.recent.push(DeathRecord {
            id,
            allegiance: Allegiance::of(npc),
            killer: npc.last_attacker.clone(),
            frames_left: RECENT_DEATH_FRAMES,
        });
        self.outbox.messages.push(NpcMessage::Died {
            id,
            name: npc.name.clone(),
            killer: npc.last_attacker.clone(),
        });
        if let Some(script) = npc.death_script.clone() {
            self.outbox.scripts.push(ScriptCmd::Run {
                path: script,
                owner: ScriptOwner::Npc(npc.name.clone()),
            });
        }
    }

    /// Deal `amount` damage. Returns true when the blow killed the unit.
    pub fn damage(
        &mut self,
        id: NpcId,
        amount: i32,
        attacker: Option<&str>,
        sprites: &mut impl SpriteSource,
    ) -> bool {
        let Some(npc) = self.npcs.get_mut(id) else {
            return false;
        };
        if !npc.take_damage(amount, attacker, sprites) {
            return false;
        }
        self.record_death(id);
        true
    }

    /// A living unit opposed to `observer` just killed one of its friends.
    pub fn friend_killed_by_live_enemy(&self, observer: NpcId) -> Option<NpcId> {
        let obs = self.npcs.get(observer)?;
        let mine = Allegiance::of(obs);
        for record in &self.recent {
            if record.id == observer || !record.allegiance.can_fight {
                continue;
            }
            if mine.opposes(&record.allegiance) {
                continue;
            }
            let Some(killer) = record.killer.as_deref() else {
                continue;
            };
            let found = self.find_all_by_name(killer).iter().copied().find(|k| {
                self.npcs
                    .get(*k)
                    .is_some_and(|kn| !kn.is_dead() && Self::is_opposed(obs, kn))
            });
            if found.is_some() {
                return found;
            }
        }
        None
    }

    pub fn recent_death_count(&self) -> usize {
        self.recent.len()
    }

    /// Closest living unit to `pixel` accepted by `filter`.
    pub fn closest(
        &self,
        pixel: Vec2,
        filter: TargetFilter,
        include_invisible: bool,
        ignore: &[NpcId],
    ) -> Option<NpcId> {
        let reference = match filter {
            TargetFilter::EnemyOf(r) | TargetFilter::FriendOf(r) => Some((r, self.npcs.get(r)?)),
            _ => None,
        };
        let accepts = |id: NpcId, npc: &Npc| -> bool {
            if npc.is_dead() || ignore.contains(&id) {
                return false;
            }
            match (filter, reference) {
                (TargetFilter::EnemyOf(_), Some((r, rn))) => r != id && Self::is_opposed(rn, npc),
                (TargetFilter::FriendOf(_), Some((r, rn))) => {
                    r != id && npc.can_fight() && !Self::is_opposed(rn, npc)
                }
                (TargetFilter::NeutralFighter, _) => npc.is_neutral_fighter(),
                (TargetFilter::AnyFighter, _) => npc.can_fight(),
                _ => false,
            }
        };
        let candidates: Box<dyn Iterator<Item = (NpcId, &Npc)> + '_> = if include_invisible {
            Box::new(self.npcs.iter())
        } else {
            Box::new(
                self.visible
                    .iter()
                    .filter_map(|id| self.npcs.get(*id).map(|n| (*id, n))),
            )
        };
        candidates
            .filter(|(id, npc)| accepts(*id, npc))
            .map(|(id, npc)| (id, npc.pixel().distance_squared(pixel)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Living units on the eight tiles around `tile`.
    pub fn neighbors_of(&self, tile: TilePos) -> SmallVec<[NpcId; 8]> {
        let around = neighbors(tile);
        self.npcs
            .iter()
            .filter(|(_, npc)| !npc.is_dead() && around.contains(&npc.tile()))
            .map(|(id, _)| id)
            .collect()
    }

    /// Living units within `max_distance` tiles of `tile`, nearest first.
    pub fn within_tile_distance(&self, tile: TilePos, max_distance: i32) -> Vec<NpcId> {
        let mut found: Vec<(NpcId, i32)> = self
            .npcs
            .iter()
            .filter(|(_, npc)| !npc.is_dead())
            .map(|(id, npc)| (id, npc.tile().distance(tile)))
            .filter(|(_, d)| *d <= max_distance)
            .collect();
        found.sort_by_key(|(_, d)| *d);
        found.into_iter().map(|(id, _)| id).collect()
    }

    /// Tiles standing units block.
    pub fn occupied_tiles(&self) -> FxHashSet<TilePos> {
        self.npcs
            .iter()
            .filter(|(_, npc)| !npc.is_dead())
            .map(|(_, npc)| npc.tile())
            .collect()
    }

    /// Advance units by `delta_ms` and finalize finished deaths.
    pub fn update(&mut self, delta_ms: f32, sprites: &mut impl SpriteSource) -> NpcUpdate {
        self.recent.retain_mut(|r| {
            r.frames_left = r.frames_left.saturating_sub(1);
            r.frames_left > 0
        });

        for id in self.npcs.handles() {
            let visible = self.visible_set.contains(&id);
            let Some(npc) = self.npcs.get_mut(id) else {
                continue;
            };

            if npc.is_death_finalized() {
                if npc.tick_revival(delta_ms) {
                    npc.revive(sprites);
                    self.outbox.messages.push(NpcMessage::Revived {
                        id,
                        name: npc.name.clone(),
                    });
                }
                continue;
            }

            if npc.is_dead() {
                if visible {
                    npc.update(delta_ms, sprites);
                }
            } else if visible || self.update_offscreen {
                let tick = npc.update(delta_ms, sprites);
                let name = npc.name.clone();
                if let Some(amount) = tick.poison_damage {
                    self.outbox.messages.push(NpcMessage::PoisonDamage {
                        id,
                        name: name.clone(),
                        amount,
                    });
                }
                for effect in tick.expired {
                    self.outbox
                        .messages
                        .push(NpcMessage::EffectExpired { id, effect });
                }
                if tick.died {
                    self.record_death(id);
                }
            }

            self.try_finalize(id, visible);
        }

        std::mem::take(&mut self.outbox)
    }

    fn try_finalize(&mut self, id: NpcId, visible: bool) {
        let generation = self.map_generation;
        let Some(npc) = self.npcs.get_mut(id) else {
            return;
        };
        if !npc.is_dead() || npc.is_death_finalized() {
            return;
        }
        if visible && npc.anim.is_playing() {
            return;
        }
        npc.finalize_death();

        let body = npc
            .body_ini
            .clone()
            .filter(|_| !npc.summoned && !npc.no_body);
        let drop = (!npc.no_drop).then(|| DropRequest {
            npc_name: npc.name.clone(),
            level: npc.stats.level,
            tile: npc.tile(),
            is_enemy: npc.is_enemy(),
            drop_ini: npc.drop_ini.clone(),
            map_generation: generation,
        });
        let removed = npc.revive_ms <= 0.0;
        let name = npc.name.clone();
        self.outbox.finalized.push(FinalizedDeath {
            id,
            name: name.clone(),
            tile: npc.tile(),
            direction: npc.direction(),
            body,
            drop,
            removed,
        });
        self.outbox.messages.push(NpcMessage::DeathFinalized {
            id,
            name: name.clone(),
        });
        if removed {
            self.remove(id);
            self.outbox.messages.push(NpcMessage::Removed { id, name });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::npc::{NpcKind, Relation};
    use crate::resources::spritestore::SpriteStore;

    fn unit(name: &str, kind: NpcKind, relation: Relation, tile: TilePos) -> Npc {
        Npc::new(name, kind, relation, tile)
    }

    fn everyone_visible(mgr: &mut NpcManager) {
        mgr.update_visible(&ViewRect::new(-10_000.0, -10_000.0, 20_000.0, 20_000.0));
    }

    #[test]
    fn opposition_cases() {
        let t = TilePos::new(0, 0);
        let player = unit("hero", NpcKind::Player, Relation::Friendly, t);
        let enemy = unit("bandit", NpcKind::Fighter, Relation::Hostile, t);
        let ally = unit("guard", NpcKind::Fighter, Relation::Friendly, t);
        let follower = unit("dog", NpcKind::Follower, Relation::Partner, t);
        let villager = unit("farmer", NpcKind::Normal, Relation::Hostile, t);
        let red = unit("red", NpcKind::Fighter, Relation::Neutral, t).with_group(1);
        let blue = unit("blue", NpcKind::Fighter, Relation::Neutral, t).with_group(2);
        let blue2 = unit("blue2", NpcKind::Fighter, Relation::Neutral, t).with_group(2);

        assert!(NpcManager::is_opposed(&player, &enemy));
        assert!(NpcManager::is_opposed(&ally, &enemy));
        assert!(!NpcManager::is_opposed(&player, &ally));
        assert!(!NpcManager::is_opposed(&player, &follower));
        assert!(!NpcManager::is_opposed(&player, &villager));
        assert!(NpcManager::is_opposed(&red, &blue));
        assert!(!NpcManager::is_opposed(&blue, &blue2));
    }

    #[test]
    fn partners_fall_back_to_groups() {
        let t = TilePos::new(0, 0);
        let player = unit("hero", NpcKind::Player, Relation::Friendly, t);
        let partner = unit("merc", NpcKind::Fighter, Relation::Partner, t);
        let enemy = unit("bandit", NpcKind::Fighter, Relation::Hostile, t);
        let rival = unit("raider", NpcKind::Fighter, Relation::Hostile, t).with_group(3);
        let far_partner = unit("scout", NpcKind::Fighter, Relation::Partner, t).with_group(3);

        // Neither a partner nor a hostile fighter leads the player side.
        assert!(!NpcManager::is_opposed(&partner, &enemy));
        assert!(!NpcManager::is_opposed(&enemy, &partner));
        assert!(NpcManager::is_opposed(&partner, &rival));
        // The player never opposes partners on its own, only across groups.
        assert!(!NpcManager::is_opposed(&player, &partner));
        assert!(NpcManager::is_opposed(&player, &far_partner));
        assert!(NpcManager::is_opposed(&far_partner, &player));
    }

    #[test]
    fn name_index_follows_changes() {
        let mut mgr = NpcManager::new();
        let a = mgr.add(unit("wolf", NpcKind::Fighter, Relation::Hostile, TilePos::new(1, 1)));
        let b = mgr.add(unit("wolf", NpcKind::Fighter, Relation::Hostile, TilePos::new(2, 2)));
        assert_eq!(mgr.find_all_by_name("wolf"), &[a, b]);
        if let Some(npc) = mgr.get_mut(b) {
            npc.name = "alpha".into();
        }
        assert_eq!(mgr.find_by_name("alpha"), Some(b));
        mgr.remove(a);
        assert!(mgr.find_by_name("wolf").is_none());
        assert!(mgr.get(a).is_none());
    }

    #[test]
    fn visible_rows() {
        let mut mgr = NpcManager::new();
        let a = mgr.add(unit("a", NpcKind::Normal, Relation::Friendly, TilePos::new(1, 4)));
        let b = mgr.add(unit("b", NpcKind::Normal, Relation::Friendly, TilePos::new(2, 4)));
        let mut hidden = unit("c", NpcKind::Normal, Relation::Friendly, TilePos::new(3, 4));
        hidden.hidden = true;
        mgr.add(hidden);
        mgr.add(unit("far", NpcKind::Normal, Relation::Friendly, TilePos::new(90, 90)));
        mgr.update_visible(&ViewRect::new(0.0, 0.0, 400.0, 300.0));
        assert_eq!(mgr.visible(), &[a, b]);
        assert_eq!(mgr.row(4), &[a, b]);
        assert!(mgr.row(90).is_empty());
    }

    #[test]
    fn closest_respects_filters() {
        let mut mgr = NpcManager::new();
        let hero = mgr.add(unit("hero", NpcKind::Player, Relation::Friendly, TilePos::new(5, 5)));
        let near = mgr.add(unit("near", NpcKind::Fighter, Relation::Hostile, TilePos::new(6, 5)));
        let far = mgr.add(unit("far", NpcKind::Fighter, Relation::Hostile, TilePos::new(9, 5)));
        let guard = mgr.add(unit("guard", NpcKind::Fighter, Relation::Friendly, TilePos::new(5, 7)));
        let neutral = mgr.add(unit("n", NpcKind::Fighter, Relation::Neutral, TilePos::new(40, 40)));
        everyone_visible(&mut mgr);
        let origin = TilePos::new(5, 5).to_pixel();

        assert_eq!(mgr.closest(origin, TargetFilter::EnemyOf(hero), false, &[]), Some(near));
        assert_eq!(mgr.closest(origin, TargetFilter::EnemyOf(hero), false, &[near]), Some(far));
        assert_eq!(mgr.closest(origin, TargetFilter::FriendOf(hero), false, &[]), Some(guard));
        assert_eq!(mgr.closest(origin, TargetFilter::AnyFighter, false, &[]), Some(hero));
        assert_eq!(mgr.closest(origin, TargetFilter::NeutralFighter, false, &[]), Some(neutral));

        mgr.update_visible(&ViewRect::new(0.0, 0.0, 800.0, 600.0));
        assert_eq!(mgr.closest(origin, TargetFilter::NeutralFighter, false, &[]), None);
        assert_eq!(mgr.closest(origin, TargetFilter::NeutralFighter, true, &[]), Some(neutral));
    }

    #[test]
    fn tile_queries() {
        let mut mgr = NpcManager::new();
        let center = TilePos::new(4, 4);
        let around = neighbors(center);
        let a = mgr.add(unit("a", NpcKind::Normal, Relation::Friendly, around[0]));
        let b = mgr.add(unit("b", NpcKind::Normal, Relation::Friendly, around[5]));
        let far = mgr.add(unit("c", NpcKind::Normal, Relation::Friendly, TilePos::new(4, 12)));
        let found = mgr.neighbors_of(center);
        assert_eq!(found.as_slice(), &[a, b]);
        let within = mgr.within_tile_distance(center, 10);
        assert_eq!(within.len(), 3);
        assert_eq!(within.last(), Some(&far));
        assert_eq!(mgr.within_tile_distance(center, 1).len(), 2);
        assert!(mgr.occupied_tiles().contains(&around[0]));
    }

    #[test]
    fn death_without_sprites_finalizes_and_removes() {
        let mut sprites = SpriteStore::new();
        let mut mgr = NpcManager::new();
        let mut wolf = unit("wolf", NpcKind::Fighter, Relation::Hostile, TilePos::new(3, 3));
        wolf.body_ini = Some("wolf-body.ini".into());
        wolf.death_script = Some("wolf_died.txt".into());
        let id = mgr.add(wolf);
        everyone_visible(&mut mgr);

        assert!(mgr.damage(id, 500, Some("hero"), &mut sprites));
        assert!(!mgr.damage(id, 500, Some("hero"), &mut sprites));
        let out = mgr.update(16.0, &mut sprites);
        assert!(matches!(
            out.messages.first(),
            Some(NpcMessage::Died { killer: Some(k), .. }) if k == "hero"
        ));
        assert_eq!(out.scripts.len(), 1);
        assert_eq!(out.finalized.len(), 1);
        let fin = &out.finalized[0];
        assert_eq!(fin.body.as_deref(), Some("wolf-body.ini"));
        assert!(fin.drop.as_ref().is_some_and(|d| d.is_enemy));
        assert!(fin.removed);
        assert!(mgr.get(id).is_none());

        let again = mgr.update(16.0, &mut sprites);
        assert!(again.finalized.is_empty());
    }

    #[test]
    fn summoned_units_leave_no_body_but_still_drop() {
        let mut sprites = SpriteStore::new();
        let mut mgr = NpcManager::new();
        let mut imp = unit("imp", NpcKind::Fighter, Relation::Hostile, TilePos::new(3, 3));
        imp.body_ini = Some("imp-body.ini".into());
        imp.summoned = true;
        let id = mgr.add(imp);
        mgr.damage(id, 500, None, &mut sprites);
        let out = mgr.update(16.0, &mut sprites);
        assert_eq!(out.finalized[0].body, None);
        assert!(out.finalized[0].drop.is_some());
    }

    #[test]
    fn revivable_units_wait_and_return() {
        let mut sprites = SpriteStore::new();
        let mut mgr = NpcManager::new();
        let mut troll = unit("troll", NpcKind::Fighter, Relation::Hostile, TilePos::new(3, 3));
        troll.revive_ms = 100.0;
        troll.no_drop = true;
        let id = mgr.add(troll);
        mgr.damage(id, 500, None, &mut sprites);
        let out = mgr.update(16.0, &mut sprites);
        assert!(!out.finalized[0].removed);
        assert!(out.finalized[0].drop.is_none());
        assert!(mgr.get(id).is_some_and(|n| n.is_death_finalized()));

        mgr.update(50.0, &mut sprites);
        let out = mgr.update(60.0, &mut sprites);
        assert!(out
            .messages
            .iter()
            .any(|m| matches!(m, NpcMessage::Revived { .. })));
        let troll = mgr.get(id).expect("still registered");
        assert!(!troll.is_dead());
        assert_eq!(troll.stats.life, troll.stats.life_max);
    }

    #[test]
    fn offscreen_units_pause_unless_enabled() {
        let mut sprites = SpriteStore::new();
        let mut mgr = NpcManager::new();
        let id = mgr.add(unit("ghost", NpcKind::Fighter, Relation::Hostile, TilePos::new(3, 3)));
        if let Some(npc) = mgr.get_mut(id) {
            npc.effects
                .get_or_insert_with(Default::default)
                .set_poison_seconds(5.0, Some("hero"));
        }
        let out = mgr.update(300.0, &mut sprites);
        assert!(out.messages.is_empty());

        mgr.update_offscreen = true;
        let out = mgr.update(300.0, &mut sprites);
        assert!(matches!(
            out.messages.as_slice(),
            [NpcMessage::PoisonDamage { amount: 10, .. }]
        ));
    }

    #[test]
    fn friend_killed_ring_expires() {
        let mut sprites = SpriteStore::new();
        let mut mgr = NpcManager::new();
        let hero = mgr.add(unit("hero", NpcKind::Player, Relation::Friendly, TilePos::new(1, 1)));
        let guard = mgr.add(unit("guard", NpcKind::Fighter, Relation::Friendly, TilePos::new(2, 2)));
        let mut victim = unit("scout", NpcKind::Fighter, Relation::Friendly, TilePos::new(3, 3));
        victim.revive_ms = 1_000_000.0;
        let victim = mgr.add(victim);
        let bandit = mgr.add(unit("bandit", NpcKind::Fighter, Relation::Hostile, TilePos::new(4, 4)));

        mgr.damage(victim, 1000, Some("bandit"), &mut sprites);
        assert_eq!(mgr.friend_killed_by_live_enemy(guard), Some(bandit));
        assert_eq!(mgr.friend_killed_by_live_enemy(hero), Some(bandit));
        assert_eq!(mgr.friend_killed_by_live_enemy(bandit), None);

        for _ in 0..RECENT_DEATH_FRAMES {
            mgr.update(16.0, &mut sprites);
        }
        assert_eq!(mgr.recent_death_count(), 0);
        assert_eq!(mgr.friend_killed_by_live_enemy(guard), None);
    }
}
