//! Interactive map objects.
//!
//! Doors, chests, traps, corpses, dropped loot and invisible sound emitters
//! are all [`Obj`]s. What an object can do follows from its [`ObjKind`]:
//!
//! | kind | obstacle | animates on its own | visible |
//! |---|---|---|---|
//! | Dynamic | yes | yes | yes |
//! | Static | yes | no | yes |
//! | Body | no | no | yes |
//! | LoopingSound | no | no | no |
//! | RandomSound | no | no | no |
//! | Door | yes | no | yes |
//! | Trap | no | yes | yes |
//! | Drop | no | yes | yes |

use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::components::animation::SpriteAnimator;
use crate::components::tileposition::{Placement, TilePos, TILE_HEIGHT, TILE_WIDTH};
use crate::components::timer::ScriptTimer;
use crate::resources::arena::Handle;
use crate::resources::definitions::ObjDefinition;
use crate::resources::viewrect::ViewRect;
use crate::spritecodec::DecodedSprite;

pub type ObjId = Handle<Obj>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ObjKind {
    #[default]
    Dynamic,
    Static,
    Body,
    LoopingSound,
    RandomSound,
    Door,
    Trap,
    Drop,
}

impl ObjKind {
    pub fn from_i64(v: i64) -> ObjKind {
        match v {
            1 => ObjKind::Static,
            2 => ObjKind::Body,
            3 => ObjKind::LoopingSound,
            4 => ObjKind::RandomSound,
            5 => ObjKind::Door,
            6 => ObjKind::Trap,
            7 => ObjKind::Drop,
            _ => ObjKind::Dynamic,
        }
    }

    pub fn is_obstacle(self) -> bool {
        matches!(self, ObjKind::Dynamic | ObjKind::Static | ObjKind::Door)
    }

    /// Loops its animation without being asked.
    pub fn auto_plays(self) -> bool {
        matches!(self, ObjKind::Dynamic | ObjKind::Trap | ObjKind::Drop)
    }

    pub fn is_sound(self) -> bool {
        matches!(self, ObjKind::LoopingSound | ObjKind::RandomSound)
    }
}

#[derive(Debug, Clone)]
pub struct Obj {
    /// Identifier within its map, stable across reloads.
    pub id: String,
    pub name: String,
    pub kind: ObjKind,
    pub placement: Placement,
    /// Pixel offset from the tile center.
    pub offset: Vec2,
    pub anim: SpriteAnimator,
    pub image: Option<String>,
    pub script: Option<String>,
    pub timer: Option<ScriptTimer>,
    pub remove_countdown_ms: Option<f32>,
    pub sound: Option<String>,
    pub damage: i32,
    pub level: i32,
    pub hidden: bool,
    pub removed: bool,
    /// Frame to show once the sprite arrives.
    pub pending_frame: Option<usize>,
    pub(crate) sound_started: bool,
}

impl Obj {
    pub fn new(id: impl Into<String>, kind: ObjKind, tile: TilePos) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind,
            placement: Placement::at_tile(tile),
            offset: Vec2::ZERO,
            anim: SpriteAnimator::new(),
            image: None,
            script: None,
            timer: None,
            remove_countdown_ms: None,
            sound: None,
            damage: 0,
            level: 0,
            hidden: kind.is_sound(),
            removed: false,
            pending_frame: None,
            sound_started: false,
        }
    }

    pub fn from_definition(def: &ObjDefinition) -> Self {
        let mut obj = Obj::new(def.id.clone(), def.kind, def.tile);
        obj.name = def.name.clone();
        obj.offset = def.offset;
        obj.image = def.image.clone();
        obj.script = def.script.clone();
        obj.timer = def
            .timer_script
            .as_ref()
            .filter(|_| def.timer_interval_ms > 0)
            .map(|s| ScriptTimer::new(def.timer_interval_ms as f32, s.clone()));
        obj.remove_countdown_ms = def.remove_after_ms.map(|ms| ms as f32);
        obj.sound = def.sound.clone();
        obj.damage = def.damage;
        obj.level = def.level;
        obj.anim.set_direction(def.direction);
        obj.pending_frame = Some(def.frame);
        obj
    }

    pub fn tile(&self) -> TilePos {
        self.placement.tile()
    }

    /// World position including the offset.
    pub fn pixel(&self) -> Vec2 {
        self.placement.pixel() + self.offset
    }

    pub fn is_obstacle(&self) -> bool {
        !self.removed && self.kind.is_obstacle()
    }

    /// Has a script to run when the player interacts with it.
    pub fn is_interactive(&self) -> bool {
        !self.removed && self.script.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn is_visible(&self) -> bool {
        !self.removed && !self.hidden
    }

    /// Set the current frame now if a sprite is present, otherwise as soon
    /// as one arrives.
    pub fn show_frame(&mut self, frame: usize) {
        if self.anim.has_sprite() {
            self.anim.set_current_frame(frame);
            self.pending_frame = None;
        } else {
            self.pending_frame = Some(frame);
        }
    }

    /// Install a freshly loaded sprite and apply any pending frame.
    pub fn attach_sprite(&mut self, sprite: Arc<DecodedSprite>) {
        let direction = self.anim.direction() as i32;
        self.anim.set_sprite(Some(sprite));
        self.anim.set_direction(direction);
        if let Some(frame) = self.pending_frame.take() {
            self.anim.set_current_frame(frame);
        }
    }

    /// Bounding box in world pixels.
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_capabilities() {
        assert!(ObjKind::Door.is_obstacle());
        assert!(!ObjKind::Trap.is_obstacle());
        assert!(ObjKind::Drop.auto_plays());
        assert!(!ObjKind::Door.auto_plays());
        assert!(Obj::new("s", ObjKind::LoopingSound, TilePos::new(0, 0)).hidden);
        assert_eq!(ObjKind::from_i64(5), ObjKind::Door);
        assert_eq!(ObjKind::from_i64(99), ObjKind::Dynamic);
    }

    #[test]
    fn interactive_needs_script() {
        let mut obj = Obj::new("chest", ObjKind::Static, TilePos::new(1, 1));
        assert!(!obj.is_interactive());
        obj.script = Some(String::new());
        assert!(!obj.is_interactive());
        obj.script = Some("open_chest.txt".into());
        assert!(obj.is_interactive());
        obj.removed = true;
        assert!(!obj.is_interactive());
        assert!(!obj.is_obstacle());
    }

    #[test]
    fn frame_waits_for_sprite() {
        let mut obj = Obj::new("door", ObjKind::Door, TilePos::new(1, 1));
        obj.show_frame(3);
        assert_eq!(obj.pending_frame, Some(3));
    }
}
