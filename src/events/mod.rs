//! Messages exchanged between the simulation and its collaborators.
//!
//! Submodules:
//! - [`audio`] – positional sound commands for the audio collaborator
//! - [`drop`] – loot requests and answers for the drop resolver thread
//! - [`npc`] – unit lifecycle notifications
//! - [`script`] – run/queue requests for the scripting collaborator
pub mod audio;
pub mod drop;
pub mod npc;
pub mod script;
