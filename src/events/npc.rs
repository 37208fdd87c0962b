//! Unit lifecycle notifications.
//!
//! Written by the unit systems whenever something a host might react to
//! happens: damage from poison, deaths, finalization, revival and removal.

use bevy_ecs::message::Message;

use crate::components::npc::NpcId;
use crate::components::statuseffects::ExpiredEffect;

#[derive(Message, Debug, Clone, PartialEq)]
pub enum NpcMessage {
    PoisonDamage {
        id: NpcId,
        name: String,
        amount: i32,
    },
    Died {
        id: NpcId,
        name: String,
        /// Who gets credit for the kill, if anyone.
        killer: Option<String>,
    },
    DeathFinalized {
        id: NpcId,
        name: String,
    },
    Revived {
        id: NpcId,
        name: String,
    },
    Removed {
        id: NpcId,
        name: String,
    },
    EffectExpired {
        id: NpcId,
        effect: ExpiredEffect,
    },
}
