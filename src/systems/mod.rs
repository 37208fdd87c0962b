//! Simulation systems.
//!
//! Submodules overview
//! - [`drops`] – the loot resolver thread and placing its answers
//! - [`npc`] – unit updates, bodies and loot requests
//! - [`obj`] – object updates and their script and audio commands
//! - [`sprites`] – apply sprites decoded on the loader thread
//! - [`time`] – update simulation time and delta

pub mod drops;
pub mod npc;
pub mod obj;
pub mod sprites;
pub mod time;
