//! Requests for the scripting collaborator.
//!
//! The simulation never runs scripts itself. It emits a [`ScriptCmd`] and the
//! host decides how to execute it: `Run` is awaited by the host before the
//! owner continues, `Queue` is fire-and-forget and keeps emission order.

use bevy_ecs::message::Message;

/// Who a script runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOwner {
    None,
    /// A unit, by name.
    Npc(String),
    /// A map object, by map and object id.
    Obj { map: String, id: String },
}

#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub enum ScriptCmd {
    Run { path: String, owner: ScriptOwner },
    Queue { path: String, owner: ScriptOwner },
}

impl ScriptCmd {
    pub fn path(&self) -> &str {
        match self {
            ScriptCmd::Run { path, .. } | ScriptCmd::Queue { path, .. } => path,
        }
    }

    pub fn owner(&self) -> &ScriptOwner {
        match self {
            ScriptCmd::Run { owner, .. } | ScriptCmd::Queue { owner, .. } => owner,
        }
    }
}
