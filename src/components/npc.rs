//! Non-player character state.
//!
//! An [`Npc`] owns everything about one unit: where it stands, its stats,
//! which appearance it wears, how it is animated, which timed effects it
//! carries and where it is in the two-stage death lifecycle.
//!
//! # Death lifecycle
//!
//! 1. Life reaches zero: [`Npc::is_dead`] turns true and the death animation
//!    is played once.
//! 2. Once that animation is over (or immediately when nobody can see the
//!    unit), the manager finalizes the death exactly once: body, loot,
//!    removal or revival countdown. [`Npc::is_death_finalized`] stays true
//!    until the unit is revived.
//!
//! # Related
//!
//! - [`crate::resources::npcmanager::NpcManager`] – owns every `Npc`
//! - [`crate::components::statuseffects::StatusEffects`] – timed effects

use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::components::animation::SpriteAnimator;
use crate::components::statuseffects::{ExpiredEffect, StatusEffects, Vitals};
use crate::components::tileposition::{Placement, TilePos, TILE_HEIGHT, TILE_WIDTH};
use crate::resources::arena::Handle;
use crate::resources::definitions::NpcDefinition;
use crate::resources::spriteset::{CharacterState, SpriteSet};
use crate::resources::spritestore::SpriteSource;
use crate::resources::viewrect::ViewRect;

pub type NpcId = Handle<Npc>;

/// Behavior class of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NpcKind {
    #[default]
    Normal,
    Fighter,
    Player,
    Follower,
    GroundAnimal,
    Eventer,
    AfraidPlayerAnimal,
    Flyer,
}

impl NpcKind {
    /// Numeric kind used by definition files. Unknown values are `Normal`.
    pub fn from_i64(v: i64) -> NpcKind {
        match v {
            1 => NpcKind::Fighter,
            2 => NpcKind::Player,
            3 => NpcKind::Follower,
            4 => NpcKind::GroundAnimal,
            5 => NpcKind::Eventer,
            6 => NpcKind::AfraidPlayerAnimal,
            7 => NpcKind::Flyer,
            _ => NpcKind::Normal,
        }
    }

    /// Kinds that take part in fights.
    pub fn is_fighter(self) -> bool {
        matches!(self, NpcKind::Fighter | NpcKind::Follower | NpcKind::Flyer)
    }
}

/// Attitude towards the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Relation {
    #[default]
    Friendly,
    Hostile,
    Neutral,
    Partner,
}

impl Relation {
    pub fn from_i64(v: i64) -> Relation {
        match v {
            1 => Relation::Hostile,
            2 => Relation::Neutral,
            3 => Relation::Partner,
            _ => Relation::Friendly,
        }
    }

    /// Relation while under a faction flip.
    pub fn flipped(self) -> Relation {
        match self {
            Relation::Hostile => Relation::Friendly,
            _ => Relation::Hostile,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CombatStats {
    pub life: i32,
    pub life_max: i32,
    pub mana: i32,
    pub mana_max: i32,
    pub thew: i32,
    pub thew_max: i32,
    pub attack: i32,
    pub defend: i32,
    pub evade: i32,
    pub level: i32,
    pub exp: i32,
}

impl CombatStats {
    /// Stats with `life` as both current and maximum life.
    pub fn with_life(life: i32) -> Self {
        Self {
            life,
            life_max: life,
            ..Default::default()
        }
    }

    pub fn restore_full(&mut self) {
        self.life = self.life_max;
        self.mana = self.mana_max;
        self.thew = self.thew_max;
    }
}

impl Vitals for CombatStats {
    fn add_life(&mut self, amount: i32) {
        self.life = (self.life + amount).clamp(0, self.life_max.max(0));
    }

    fn is_dead(&self) -> bool {
        self.life <= 0
    }
}

/// What happened to a unit during one [`Npc::update`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NpcTick {
    pub poison_damage: Option<i32>,
    /// Poison killed the unit this tick.
    pub died: bool,
    pub poison_killer: Option<String>,
    pub petrified: bool,
    pub expired: Vec<ExpiredEffect>,
}

#[derive(Debug, Clone)]
pub struct Npc {
    pub name: String,
    pub kind: NpcKind,
    pub relation: Relation,
    pub group: i32,
    pub ai: i32,
    pub placement: Placement,
    pub stats: CombatStats,
    pub anim: SpriteAnimator,
    pub effects: Option<StatusEffects>,
    /// Unit this one follows or attacks. Cleared when the handle goes stale.
    pub target: Option<NpcId>,
    pub last_attacker: Option<String>,
    pub summoned: bool,
    pub no_body: bool,
    pub no_drop: bool,
    pub body_ini: Option<String>,
    pub drop_ini: Option<String>,
    pub death_script: Option<String>,
    pub script: Option<String>,
    /// Time a finalized corpse waits before reviving; zero removes it.
    pub revive_ms: f32,
    pub hidden: bool,
    state: CharacterState,
    appearance: Arc<SpriteSet>,
    saved_appearance: Option<Arc<SpriteSet>>,
    saved_relation: Option<Relation>,
    one_shot: bool,
    revive_left_ms: f32,
    dead: bool,
    death_finalized: bool,
}

impl Npc {
    pub fn new(name: impl Into<String>, kind: NpcKind, relation: Relation, tile: TilePos) -> Self {
        Self {
            name: name.into(),
            kind,
            relation,
            group: 0,
            ai: 0,
            placement: Placement::at_tile(tile),
            stats: CombatStats::with_life(100),
            anim: SpriteAnimator::new(),
            effects: None,
            target: None,
            last_attacker: None,
            summoned: false,
            no_body: false,
            no_drop: false,
            body_ini: None,
            drop_ini: None,
            death_script: None,
            script: None,
            revive_ms: 0.0,
            hidden: false,
            state: CharacterState::Stand,
            appearance: Arc::new(SpriteSet::new()),
            saved_appearance: None,
            saved_relation: None,
            one_shot: false,
            revive_left_ms: 0.0,
            dead: false,
            death_finalized: false,
        }
    }

    pub fn from_definition(def: &NpcDefinition, appearance: Arc<SpriteSet>) -> Self {
        let mut npc = Npc::new(def.name.clone(), def.kind, def.relation, def.tile);
        npc.group = def.group;
        npc.ai = def.ai;
        npc.stats = def.stats;
        npc.body_ini = def.body_ini.clone();
        npc.drop_ini = def.drop_ini.clone();
        npc.no_drop = def.no_drop;
        npc.death_script = def.death_script.clone();
        npc.script = def.script.clone();
        npc.revive_ms = def.revive_ms;
        npc.hidden = def.hidden;
        npc.appearance = appearance;
        npc.anim.set_direction(def.direction);
        npc
    }

    pub fn with_appearance(mut self, appearance: Arc<SpriteSet>) -> Self {
        self.appearance = appearance;
        self.anim.set_sprite(None);
        self
    }

    pub fn with_stats(mut self, stats: CombatStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_group(mut self, group: i32) -> Self {
        self.group = group;
        self
    }

    pub fn tile(&self) -> TilePos {
        self.placement.tile()
    }

    pub fn pixel(&self) -> Vec2 {
        self.placement.pixel()
    }

    pub fn set_tile(&mut self, tile: TilePos) {
        self.placement.set_tile(tile);
    }

    pub fn direction(&self) -> usize {
        self.anim.direction()
    }

    pub fn state(&self) -> CharacterState {
        self.state
    }

    pub fn appearance(&self) -> &Arc<SpriteSet> {
        &self.appearance
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_death_finalized(&self) -> bool {
        self.death_finalized
    }

    pub fn revive_left_ms(&self) -> f32 {
        self.revive_left_ms
    }

    pub fn is_player(&self) -> bool {
        self.kind == NpcKind::Player
    }

    /// The player or a fighter kind; only these can be opposed.
    pub fn can_fight(&self) -> bool {
        self.is_player() || self.kind.is_fighter()
    }

    pub fn is_fighter_friend(&self) -> bool {
        self.kind.is_fighter() && self.relation == Relation::Friendly
    }

    pub fn is_partner(&self) -> bool {
        self.relation == Relation::Partner || self.kind == NpcKind::Follower
    }

    pub fn is_enemy(&self) -> bool {
        self.kind.is_fighter() && self.relation == Relation::Hostile
    }

    pub fn is_neutral_fighter(&self) -> bool {
        self.kind.is_fighter() && self.relation == Relation::Neutral
    }

    /// Bounding box in world pixels, anchored on the foot position.
    pub fn bounds(&self) -> ViewRect {
        let p = self.pixel();
        match self.anim.sprite() {
            Some(sprite) => ViewRect::new(
                p.x - sprite.header.left as f32,
                p.y - sprite.header.bottom as f32,
                sprite.width() as f32,
                sprite.height() as f32,
            ),
            None => ViewRect::new(
                p.x - (TILE_WIDTH / 2) as f32,
                p.y - (TILE_HEIGHT / 2) as f32,
                TILE_WIDTH as f32,
                TILE_HEIGHT as f32,
            ),
        }
    }

    /// Switch state and show the best available sprite for it.
    ///
    /// The animator keeps its progress when the resolved sprite is the one
    /// already shown.
    pub fn set_state(&mut self, state: CharacterState, sprites: &mut impl SpriteSource) {
        self.state = state;
        self.one_shot = false;
        self.refresh_sprite(sprites);
    }

    /// Re-resolve the sprite for the current state.
    pub fn refresh_sprite(&mut self, sprites: &mut impl SpriteSource) {
        let resolved = self.appearance.resolve(self.state, sprites).map(|(_, s)| s);
        let same = match (&resolved, self.anim.sprite()) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if !same {
            self.anim.set_sprite(resolved);
        }
    }

    /// Play `state` once, then fall back to standing. A one-shot already
    /// running on the same sprite keeps going.
    pub fn play_state_once(&mut self, state: CharacterState, sprites: &mut impl SpriteSource) {
        self.set_state(state, sprites);
        self.anim.play_current_direction_once();
        self.one_shot = true;
    }

    /// Wear another appearance until the transform named `source` expires.
    pub fn apply_transform(
        &mut self,
        source: &str,
        duration_ms: f32,
        appearance_name: &str,
        appearance: Arc<SpriteSet>,
        sprites: &mut impl SpriteSource,
    ) {
        if self.saved_appearance.is_none() {
            self.saved_appearance = Some(Arc::clone(&self.appearance));
        }
        self.appearance = appearance;
        self.effects
            .get_or_insert_with(StatusEffects::new)
            .apply_transform(source, duration_ms, appearance_name);
        self.refresh_sprite(sprites);
    }

    /// Fight for the other side for a while.
    pub fn apply_faction_flip(&mut self, source: &str, duration_ms: f32) {
        if self.saved_relation.is_none() {
            self.saved_relation = Some(self.relation);
            self.relation = self.relation.flipped();
        }
        self.effects
            .get_or_insert_with(StatusEffects::new)
            .apply_faction_flip(source, duration_ms);
    }

    fn restore_appearance(&mut self, sprites: &mut impl SpriteSource) {
        if let Some(saved) = self.saved_appearance.take() {
            self.appearance = saved;
            self.refresh_sprite(sprites);
        }
    }

    fn restore_relation(&mut self) {
        if let Some(saved) = self.saved_relation.take() {
            self.relation = saved;
        }
    }

    /// Remove `amount` life. Returns true when this blow killed the unit.
    pub fn take_damage(
        &mut self,
        amount: i32,
        attacker: Option<&str>,
        sprites: &mut impl SpriteSource,
    ) -> bool {
        if self.dead || amount <= 0 {
            return false;
        }
        if let Some(name) = attacker {
            self.last_attacker = Some(name.to_string());
        }
        self.stats.add_life(-amount);
        if self.stats.is_dead() {
            self.begin_death(sprites);
            return true;
        }
        if self.appearance.image(CharacterState::Hurt).is_some() {
            self.play_state_once(CharacterState::Hurt, sprites);
        }
        false
    }

    /// First stage of dying: flag dead and play the death animation once.
    pub fn begin_death(&mut self, sprites: &mut impl SpriteSource) {
        if self.dead {
            return;
        }
        self.dead = true;
        self.stats.life = 0;
        self.target = None;
        if let Some(fx) = self.effects.as_mut() {
            fx.clear_ailments();
        }
        self.restore_relation();
        // Death interrupts whatever one-shot animation is running.
        self.anim.end_playing();
        self.play_state_once(CharacterState::Death, sprites);
    }

    /// Second stage of dying. Returns false when already finalized.
    pub fn finalize_death(&mut self) -> bool {
        if !self.dead || self.death_finalized {
            return false;
        }
        self.death_finalized = true;
        self.revive_left_ms = self.revive_ms;
        true
    }

    /// Count down the revival timer; true once the unit is ready to revive.
    pub fn tick_revival(&mut self, delta_ms: f32) -> bool {
        if !self.death_finalized || self.revive_ms <= 0.0 {
            return false;
        }
        self.revive_left_ms -= delta_ms;
        self.revive_left_ms <= 0.0
    }

    /// Back to life with full stats, standing where it fell.
    pub fn revive(&mut self, sprites: &mut impl SpriteSource) {
        self.dead = false;
        self.death_finalized = false;
        self.revive_left_ms = 0.0;
        self.last_attacker = None;
        self.stats.restore_full();
        if self.stats.life <= 0 {
            self.stats.life = 1;
        }
        self.effects = None;
        self.restore_appearance(sprites);
        self.anim.end_playing();
        self.set_state(CharacterState::Stand, sprites);
    }

    /// Advance effects and animation by `delta_ms`.
    pub fn update(&mut self, delta_ms: f32, sprites: &mut impl SpriteSource) -> NpcTick {
        let mut tick = NpcTick::default();

        if self.dead {
            // The death animation plays out, then the corpse holds its frame.
            if self.anim.is_playing() {
                self.anim.advance(delta_ms, 1.0);
            }
            return tick;
        }

        if !self.anim.has_sprite() {
            self.refresh_sprite(sprites);
        }

        let mut delta = delta_ms;
        if let Some(fx) = self.effects.as_mut() {
            let result = fx.update(delta_ms, &mut self.stats);
            tick.poison_damage = result.poison_damage;
            tick.poison_killer = result.poison_killer;
            tick.petrified = result.petrified;
            tick.expired = result.expired.into_vec();
            delta = result.effective_delta_ms;
        }

        for expired in &tick.expired {
            match expired {
                ExpiredEffect::Transform { .. } => self.restore_appearance(sprites),
                ExpiredEffect::FactionFlip { .. } => self.restore_relation(),
                _ => {}
            }
        }
        if self.effects.as_ref().is_some_and(StatusEffects::is_empty) {
            self.effects = None;
        }

        if self.stats.is_dead() {
            if let Some(killer) = &tick.poison_killer {
                self.last_attacker = Some(killer.clone());
            }
            self.begin_death(sprites);
            tick.died = true;
            return tick;
        }

        if tick.petrified {
            return tick;
        }

        self.anim.advance(delta, 1.0);
        if self.one_shot && !self.anim.is_playing() {
            self.set_state(CharacterState::Stand, sprites);
        }
        tick
    }
}
