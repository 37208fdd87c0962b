//! Positional audio commands.
//!
//! Sound-emitting objects report to the audio collaborator through these
//! messages each tick. Emitters are identified by a stable string so the
//! audio side can keep one voice per emitter across ticks.

use bevy_ecs::message::Message;
use glam::Vec2;

/// Commands sent *to* the audio collaborator.
#[derive(Message, Debug, Clone, PartialEq)]
pub enum AudioCmd {
    /// Start (or keep) a looping sound at a world position.
    PlayLoopAt {
        emitter: String,
        path: String,
        position: Vec2,
    },
    /// Trigger a one-shot sound at a world position.
    PlayRandomAt {
        emitter: String,
        path: String,
        position: Vec2,
    },
    /// Move an emitter that is already playing.
    UpdatePosition { emitter: String, position: Vec2 },
    Stop { emitter: String },
}

impl AudioCmd {
    pub fn emitter(&self) -> &str {
        match self {
            AudioCmd::PlayLoopAt { emitter, .. }
            | AudioCmd::PlayRandomAt { emitter, .. }
            | AudioCmd::UpdatePosition { emitter, .. }
            | AudioCmd::Stop { emitter } => emitter,
        }
    }
}
