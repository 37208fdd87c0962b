//! Character appearance: which sprite to show in which state.
//!
//! A unit's appearance file lists one section per [`CharacterState`] with an
//! `image=` path (and optionally `sound=`). Few units ship every state, so
//! each state has an ordered fallback chain ending at `Stand`; resolving a
//! state walks the chain and returns the first sprite that is available.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::resources::spritestore::SpriteSource;
use crate::spritecodec::DecodedSprite;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterState {
    Stand,
    Stand1,
    Walk,
    Run,
    Jump,
    FightStand,
    FightWalk,
    FightRun,
    FightJump,
    Attack,
    Attack1,
    Attack2,
    Magic,
    Hurt,
    Death,
    Sit,
    Special,
}

impl CharacterState {
    pub const ALL: [CharacterState; 17] = [
        CharacterState::Stand,
        CharacterState::Stand1,
        CharacterState::Walk,
        CharacterState::Run,
        CharacterState::Jump,
        CharacterState::FightStand,
        CharacterState::FightWalk,
        CharacterState::FightRun,
        CharacterState::FightJump,
        CharacterState::Attack,
        CharacterState::Attack1,
        CharacterState::Attack2,
        CharacterState::Magic,
        CharacterState::Hurt,
        CharacterState::Death,
        CharacterState::Sit,
        CharacterState::Special,
    ];

    /// States to try, in order, when this one has to be shown.
    pub fn fallback_chain(self) -> &'static [CharacterState] {
        use CharacterState::*;
        match self {
            Stand => &[Stand],
            Stand1 => &[Stand1, Stand],
            Walk => &[Walk, Stand],
            Run => &[Run, Walk, Stand],
            Jump => &[Jump, Walk, Stand],
            FightStand => &[FightStand, Stand],
            FightWalk => &[FightWalk, Walk, Stand],
            FightRun => &[FightRun, Run, Walk, Stand],
            FightJump => &[FightJump, Jump, Walk, Stand],
            Attack => &[Attack, FightStand, Stand],
            Attack1 => &[Attack1, Attack, FightStand, Stand],
            Attack2 => &[Attack2, Attack, FightStand, Stand],
            Magic => &[Magic, Attack, FightStand, Stand],
            Hurt => &[Hurt, Stand],
            Death => &[Death, Stand],
            Sit => &[Sit, Stand],
            Special => &[Special, Stand],
        }
    }

    /// Section name in an appearance file, lowercased.
    pub fn section_name(self) -> &'static str {
        use CharacterState::*;
        match self {
            Stand => "stand",
            Stand1 => "stand1",
            Walk => "walk",
            Run => "run",
            Jump => "jump",
            FightStand => "fightstand",
            FightWalk => "fightwalk",
            FightRun => "fightrun",
            FightJump => "fightjump",
            Attack => "attack",
            Attack1 => "attack1",
            Attack2 => "attack2",
            Magic => "magic",
            Hurt => "hurt",
            Death => "death",
            Sit => "sit",
            Special => "special",
        }
    }

    pub fn from_section_name(name: &str) -> Option<CharacterState> {
        let lower = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|s| s.section_name() == lower)
    }
}

/// One state's resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateResources {
    pub image: Option<String>,
    pub sound: Option<String>,
}

/// Sprite and sound paths per character state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteSet {
    states: FxHashMap<CharacterState, StateResources>,
}

impl SpriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, state: CharacterState, image: impl Into<String>) -> Self {
        self.set_image(state, image);
        self
    }

    pub fn set_image(&mut self, state: CharacterState, image: impl Into<String>) {
        self.states.entry(state).or_default().image = Some(image.into());
    }

    pub fn set_sound(&mut self, state: CharacterState, sound: impl Into<String>) {
        self.states.entry(state).or_default().sound = Some(sound.into());
    }

    pub fn image(&self, state: CharacterState) -> Option<&str> {
        self.states.get(&state).and_then(|r| r.image.as_deref())
    }

    pub fn sound(&self, state: CharacterState) -> Option<&str> {
        self.states.get(&state).and_then(|r| r.sound.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.states.values().all(|r| r.image.is_none())
    }

    /// Whether some state in the fallback chain of `state` has an image.
    pub fn has_state(&self, state: CharacterState) -> bool {
        state
            .fallback_chain()
            .iter()
            .any(|s| self.image(*s).is_some())
    }

    /// First available sprite along the fallback chain of `state`.
    ///
    /// Images still loading are skipped, so the result can improve on a
    /// later call once they arrive.
    pub fn resolve(
        &self,
        state: CharacterState,
        sprites: &mut impl SpriteSource,
    ) -> Option<(CharacterState, Arc<DecodedSprite>)> {
        state.fallback_chain().iter().find_map(|s| {
            self.image(*s)
                .and_then(|path| sprites.fetch(path))
                .map(|sprite| (*s, sprite))
        })
    }
}
