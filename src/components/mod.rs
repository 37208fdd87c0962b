//! Per-entity state.
//!
//! Units and objects are not ECS entities; they live in generational arenas
//! owned by their managers. The types here are what those arenas hold.
//!
//! Submodules overview:
//! - [`animation`] – sprite playback state shared by units and objects
//! - [`npc`] – units, their kinds, relations and combat stats
//! - [`obj`] – interactive map objects and their kinds
//! - [`statuseffects`] – poison, petrify, freeze and timed effects
//! - [`tileposition`] – tile and pixel coordinates on the isometric grid
//! - [`timer`] – interval timer that fires an object's script

pub mod animation;
pub mod npc;
pub mod obj;
pub mod statuseffects;
pub mod tileposition;
pub mod timer;
