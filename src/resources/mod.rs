//! ECS resources made available to systems.
//!
//! Overview
//! - `arena` – generational arena and handles for units and objects
//! - `definitions` – parsed object, unit and appearance definitions
//! - `dropbridge` – bridge and resolver for the background loot thread
//! - `gameconfig` – simulation settings loaded from INI
//! - `mapgrid` – soft and hard map obstacles
//! - `npcmanager` – unit registry, visibility and relation queries
//! - `objmanager` – object registry, scripting operations and overrides
//! - `overrides` – persisted per-map object changes
//! - `spriteset` – per-state sprite paths with fallback chains
//! - `spritestore` – decoded sprite cache fed by the loader thread
//! - `viewrect` – the visible world rectangle
//! - `worldtime` – simulation time and delta
pub mod arena;
pub mod definitions;
pub mod dropbridge;
pub mod gameconfig;
pub mod mapgrid;
pub mod npcmanager;
pub mod objmanager;
pub mod overrides;
pub mod spriteset;
pub mod spritestore;
pub mod viewrect;
pub mod worldtime;
