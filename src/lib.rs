//! Isometric action-RPG simulation core.
//!
//! Sprite decoding, per-entity animation, unit and object registries with
//! spatial and relational queries, timed status effects, walkable neighbors
//! and tile paths on a staggered isometric grid. Rendering, scripting and
//! audio are collaborators reached through messages.
//!
//! # Project Structure
//!
//! - [`spritecodec`] – decoder for the RLE sprite-animation format
//! - [`outline`] – edge highlight images for hovered sprites
//! - [`adjacency`] – the eight neighbors of a tile and diagonal blocking
//! - [`pathfinder`] – budgeted tile paths built on [`adjacency`]
//! - [`components`] – units, objects, animation and status effects
//! - [`resources`] – managers, caches, definitions and configuration
//! - [`events`] – messages to and from collaborators
//! - [`systems`] – per-tick systems
//! - [`game`] – the [`game::Simulation`] driver

pub mod adjacency;
pub mod components;
pub mod events;
pub mod game;
pub mod outline;
pub mod pathfinder;
pub mod resources;
pub mod spritecodec;
pub mod systems;
