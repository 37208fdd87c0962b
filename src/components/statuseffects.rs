//! Timed status effects on a unit.
//!
//! [`StatusEffects`] is a ledger of independent countdowns. It never touches
//! rendering and never owns the things that caused an effect: timed effects
//! only remember the *name* of their source (a spell, an item), so the
//! source can disappear while the effect runs on.
//!
//! # Channels
//!
//! | effect | rule on re-application | on expiry |
//! |---|---|---|
//! | poison | ignored while active | poisoner forgotten |
//! | petrify | ignored while active | - |
//! | freeze | ignored while active | - |
//! | weaken | replaces | reported |
//! | speed | refreshes same source, stacks others | reported |
//! | transform | replaces | reported, caller restores appearance |
//! | faction flip | replaces | reported, caller restores relation |
//! | projectile swap | replaces | reported |
//!
//! # Tick order
//!
//! [`StatusEffects::update`] runs poison, then petrify (which ends the tick
//! early), then freeze, then the timed effects, and finally derives the speed
//! multiplier and the effective delta for the unit's own update.

use smallvec::SmallVec;

/// Life lost per poison tick.
pub const POISON_DAMAGE: i32 = 10;
/// Poison deals damage each time this many milliseconds have accumulated.
pub const POISON_TICK_MS: f32 = 250.0;

/// Access to the life pool of whoever carries the effects.
pub trait Vitals {
    fn add_life(&mut self, amount: i32);
    /// Death has been triggered (life reached zero).
    fn is_dead(&self) -> bool;
}

/// An effect with a countdown and the name of whatever caused it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEffect<T> {
    pub source: String,
    pub remaining_ms: f32,
    pub data: T,
}

impl<T> TimedEffect<T> {
    fn new(source: impl Into<String>, duration_ms: f32, data: T) -> Self {
        Self {
            source: source.into(),
            remaining_ms: duration_ms,
            data,
        }
    }

    /// Count down; true once expired.
    fn tick(&mut self, delta_ms: f32) -> bool {
        self.remaining_ms -= delta_ms;
        self.remaining_ms <= 0.0
    }
}

/// Attack and defense reduction, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Weaken {
    pub attack_percent: i32,
    pub defend_percent: i32,
}

/// An effect that ran out this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiredEffect {
    Weaken { source: String },
    Speed { source: String },
    Transform { source: String },
    FactionFlip { source: String },
    ProjectileSwap { source: String },
}

/// Outcome of one [`StatusEffects::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct EffectTick {
    /// The unit is stone this tick and must skip movement and attacks.
    pub petrified: bool,
    pub frozen: bool,
    /// `1.0` plus the sum of active speed percentages, as a fraction.
    pub speed_multiplier: f32,
    /// Delta the unit should use for its own update.
    pub effective_delta_ms: f32,
    /// Damage dealt by poison this tick, if a poison tick landed.
    pub poison_damage: Option<i32>,
    /// Who gets credit when this tick's poison killed the unit.
    pub poison_killer: Option<String>,
    pub expired: SmallVec<[ExpiredEffect; 2]>,
}

impl EffectTick {
    fn new(delta_ms: f32) -> Self {
        Self {
            petrified: false,
            frozen: false,
            speed_multiplier: 1.0,
            effective_delta_ms: delta_ms,
            poison_damage: None,
            poison_killer: None,
            expired: SmallVec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusEffects {
    poison_seconds: f32,
    poisoned_ms: f32,
    poison_by: Option<String>,
    petrify_seconds: f32,
    frozen_seconds: f32,
    weaken: Option<TimedEffect<Weaken>>,
    speed: SmallVec<[TimedEffect<i32>; 2]>,
    transform: Option<TimedEffect<String>>,
    faction_flip: Option<TimedEffect<()>>,
    projectile_swap: Option<TimedEffect<String>>,
}

impl StatusEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poison for `seconds`. Ignored while already poisoned.
    pub fn set_poison_seconds(&mut self, seconds: f32, poisoner: Option<&str>) -> bool {
        if self.poison_seconds > 0.0 || seconds <= 0.0 {
            return false;
        }
        self.poison_seconds = seconds;
        self.poisoned_ms = 0.0;
        self.poison_by = poisoner.map(str::to_string);
        true
    }

    pub fn poison_seconds(&self) -> f32 {
        self.poison_seconds
    }

    pub fn is_poisoned(&self) -> bool {
        self.poison_seconds > 0.0
    }

    /// Name of whoever applied the running poison.
    pub fn poison_by_character_name(&self) -> Option<&str> {
        self.poison_by.as_deref()
    }

    /// Turn to stone for `seconds`. Ignored while already petrified.
    pub fn set_petrify_seconds(&mut self, seconds: f32) -> bool {
        if self.petrify_seconds > 0.0 || seconds <= 0.0 {
            return false;
        }
        self.petrify_seconds = seconds;
        true
    }

    pub fn petrify_seconds(&self) -> f32 {
        self.petrify_seconds
    }

    pub fn is_petrified(&self) -> bool {
        self.petrify_seconds > 0.0
    }

    /// Freeze for `seconds`. Ignored while already frozen.
    pub fn set_frozen_seconds(&mut self, seconds: f32) -> bool {
        if self.frozen_seconds > 0.0 || seconds <= 0.0 {
            return false;
        }
        self.frozen_seconds = seconds;
        true
    }

    pub fn frozen_seconds(&self) -> f32 {
        self.frozen_seconds
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen_seconds > 0.0
    }

    pub fn apply_weaken(&mut self, source: &str, duration_ms: f32, weaken: Weaken) {
        self.weaken = Some(TimedEffect::new(source, duration_ms, weaken));
    }

    pub fn weaken(&self) -> Option<&TimedEffect<Weaken>> {
        self.weaken.as_ref()
    }

    /// Percentage of attack that remains after weakening.
    pub fn attack_percent(&self) -> i32 {
        100 - self.weaken.as_ref().map_or(0, |w| w.data.attack_percent)
    }

    /// Percentage of defense that remains after weakening.
    pub fn defend_percent(&self) -> i32 {
        100 - self.weaken.as_ref().map_or(0, |w| w.data.defend_percent)
    }

    /// Change walk and animation speed by `percent`. A second application
    /// from the same source refreshes it, other sources add up.
    pub fn apply_speed(&mut self, source: &str, duration_ms: f32, percent: i32) {
        if let Some(existing) = self.speed.iter_mut().find(|e| e.source == source) {
            existing.remaining_ms = duration_ms;
            existing.data = percent;
        } else {
            self.speed.push(TimedEffect::new(source, duration_ms, percent));
        }
    }

    /// Sum of all active speed percentages.
    pub fn speed_percent(&self) -> i32 {
        self.speed.iter().map(|e| e.data).sum()
    }

    /// Take on the appearance named `appearance`.
    pub fn apply_transform(&mut self, source: &str, duration_ms: f32, appearance: &str) {
        self.transform = Some(TimedEffect::new(source, duration_ms, appearance.to_string()));
    }

    pub fn transform(&self) -> Option<&TimedEffect<String>> {
        self.transform.as_ref()
    }

    pub fn is_transformed(&self) -> bool {
        self.transform.is_some()
    }

    /// Fight for the other side for a while.
    pub fn apply_faction_flip(&mut self, source: &str, duration_ms: f32) {
        self.faction_flip = Some(TimedEffect::new(source, duration_ms, ()));
    }

    pub fn is_faction_flipped(&self) -> bool {
        self.faction_flip.is_some()
    }

    /// Fire `projectile` instead of the usual attack projectile.
    pub fn apply_projectile_swap(&mut self, source: &str, duration_ms: f32, projectile: &str) {
        self.projectile_swap = Some(TimedEffect::new(source, duration_ms, projectile.to_string()));
    }

    pub fn replacement_projectile(&self) -> Option<&str> {
        self.projectile_swap.as_ref().map(|e| e.data.as_str())
    }

    /// Drop poison, petrify and freeze, keeping timed effects.
    pub fn clear_ailments(&mut self) {
        self.poison_seconds = 0.0;
        self.poisoned_ms = 0.0;
        self.poison_by = None;
        self.petrify_seconds = 0.0;
        self.frozen_seconds = 0.0;
    }

    /// Nothing is active.
    pub fn is_empty(&self) -> bool {
        !self.is_poisoned()
            && !self.is_petrified()
            && !self.is_frozen()
            && self.weaken.is_none()
            && self.speed.is_empty()
            && self.transform.is_none()
            && self.faction_flip.is_none()
            && self.projectile_swap.is_none()
    }

    fn update_poison(&mut self, delta_ms: f32, vitals: &mut impl Vitals, tick: &mut EffectTick) {
        if self.poison_seconds <= 0.0 {
            return;
        }
        self.poison_seconds -= delta_ms / 1000.0;
        self.poisoned_ms += delta_ms;
        if self.poisoned_ms > POISON_TICK_MS {
            self.poisoned_ms = 0.0;
            if !vitals.is_dead() {
                vitals.add_life(-POISON_DAMAGE);
                tick.poison_damage = Some(POISON_DAMAGE);
                if vitals.is_dead() {
                    tick.poison_killer = self.poison_by.take();
                }
            }
        }
        if self.poison_seconds <= 0.0 {
            self.poison_seconds = 0.0;
            self.poisoned_ms = 0.0;
            self.poison_by = None;
        }
    }

    fn update_timed(&mut self, delta_ms: f32, tick: &mut EffectTick) {
        if self.weaken.as_mut().is_some_and(|e| e.tick(delta_ms)) {
            if let Some(e) = self.weaken.take() {
                tick.expired.push(ExpiredEffect::Weaken { source: e.source });
            }
        }

        let mut i = 0;
        while i < self.speed.len() {
            if self.speed[i].tick(delta_ms) {
                let e = self.speed.remove(i);
                tick.expired.push(ExpiredEffect::Speed { source: e.source });
            } else {
                i += 1;
            }
        }

        if self.transform.as_mut().is_some_and(|e| e.tick(delta_ms)) {
            if let Some(e) = self.transform.take() {
                tick.expired.push(ExpiredEffect::Transform { source: e.source });
            }
        }
        if self.faction_flip.as_mut().is_some_and(|e| e.tick(delta_ms)) {
            if let Some(e) = self.faction_flip.take() {
                tick.expired.push(ExpiredEffect::FactionFlip { source: e.source });
            }
        }
        if self.projectile_swap.as_mut().is_some_and(|e| e.tick(delta_ms)) {
            if let Some(e) = self.projectile_swap.take() {
                tick.expired.push(ExpiredEffect::ProjectileSwap { source: e.source });
            }
        }
    }

    /// Advance every countdown by `delta_ms` and report what the unit should
    /// do this tick.
    ///
    /// Poison damage goes straight to `vitals`. When that damage kills the
    /// unit, the poisoner's name is handed out once in
    /// [`EffectTick::poison_killer`] and forgotten.
    pub fn update(&mut self, delta_ms: f32, vitals: &mut impl Vitals) -> EffectTick {
        let mut tick = EffectTick::new(delta_ms);
        let seconds = delta_ms / 1000.0;

        self.update_poison(delta_ms, vitals, &mut tick);

        if self.petrify_seconds > 0.0 {
            self.petrify_seconds = (self.petrify_seconds - seconds).max(0.0);
            tick.petrified = true;
            tick.effective_delta_ms = 0.0;
            return tick;
        }

        if self.frozen_seconds > 0.0 {
            self.frozen_seconds = (self.frozen_seconds - seconds).max(0.0);
            tick.frozen = true;
        }

        self.update_timed(delta_ms, &mut tick);

        tick.speed_multiplier = ((100 + self.speed_percent()).max(0)) as f32 / 100.0;
        tick.effective_delta_ms = delta_ms * tick.speed_multiplier;
        if tick.frozen {
            tick.effective_delta_ms /= 2.0;
        }
        tick
    }
}
