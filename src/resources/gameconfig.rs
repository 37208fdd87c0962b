//! Simulation configuration resource.
//!
//! Settings loaded from an INI file. Defaults are safe for a headless run,
//! so a missing file only costs a warning.
//!
//! # Configuration File Format
//!
//! ```ini
//! [view]
//! width = 800
//! height = 600
//!
//! [sim]
//! tick_ms = 16
//! update_offscreen_npcs = false
//! random_sound_chance = 200
//! seed = 1
//!
//! [assets]
//! root = ./assets
//!
//! [drops]
//! chance = 20
//! level_10 = drop/low.ini
//! level_99 = drop/high.ini
//! ```
//!
//! `random_sound_chance` is the one-in-N odds per tick of a random sound
//! emitter triggering. Each `level_N` entry under `[drops]` adds a loot table
//! row for units up to level N.

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

use crate::resources::dropbridge::LevelDrop;

const DEFAULT_VIEW_WIDTH: u32 = 800;
const DEFAULT_VIEW_HEIGHT: u32 = 600;
const DEFAULT_TICK_MS: u32 = 16;
const DEFAULT_RANDOM_SOUND_CHANCE: u32 = 200;
const DEFAULT_SEED: u64 = 1;
const DEFAULT_ASSET_ROOT: &str = "./assets";
const DEFAULT_CONFIG_PATH: &str = "./isorpg.ini";

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// View rectangle width in world pixels.
    pub view_width: u32,
    pub view_height: u32,
    /// Fixed tick length used by the headless harness.
    pub tick_ms: u32,
    pub update_offscreen_npcs: bool,
    pub random_sound_chance: u32,
    pub seed: u64,
    pub asset_root: PathBuf,
    /// Percent chance of a random loot drop from a dead enemy.
    pub drop_chance: u32,
    pub drop_table: Vec<LevelDrop>,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SimConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            view_width: DEFAULT_VIEW_WIDTH,
            view_height: DEFAULT_VIEW_HEIGHT,
            tick_ms: DEFAULT_TICK_MS,
            update_offscreen_npcs: false,
            random_sound_chance: DEFAULT_RANDOM_SOUND_CHANCE,
            seed: DEFAULT_SEED,
            asset_root: PathBuf::from(DEFAULT_ASSET_ROOT),
            drop_chance: 0,
            drop_table: Vec::new(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current values.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply(&config);
        info!(
            "Loaded config: view {}x{}, tick {}ms, offscreen={}, seed={}, assets={:?}",
            self.view_width,
            self.view_height,
            self.tick_ms,
            self.update_offscreen_npcs,
            self.seed,
            self.asset_root
        );
        Ok(())
    }

    /// Load configuration from INI text.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .read(text.to_string())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    fn apply(&mut self, config: &Ini) {
        // [view] section
        if let Some(width) = config.getuint("view", "width").ok().flatten() {
            self.view_width = width as u32;
        }
        if let Some(height) = config.getuint("view", "height").ok().flatten() {
            self.view_height = height as u32;
        }

        // [sim] section
        if let Some(tick) = config.getuint("sim", "tick_ms").ok().flatten() {
            self.tick_ms = (tick as u32).max(1);
        }
        if let Some(flag) = config.getbool("sim", "update_offscreen_npcs").ok().flatten() {
            self.update_offscreen_npcs = flag;
        }
        if let Some(chance) = config.getuint("sim", "random_sound_chance").ok().flatten() {
            self.random_sound_chance = (chance as u32).max(1);
        }
        if let Some(seed) = config.getuint("sim", "seed").ok().flatten() {
            self.seed = seed;
        }

        // [assets] section
        if let Some(root) = config.get("assets", "root") {
            self.asset_root = PathBuf::from(root);
        }

        // [drops] section
        if let Some(chance) = config.getuint("drops", "chance").ok().flatten() {
            self.drop_chance = (chance as u32).min(100);
        }
        if let Some(keys) = config.get_map_ref().get("drops") {
            let mut table: Vec<LevelDrop> = keys
                .iter()
                .filter_map(|(key, value)| {
                    let level = key.strip_prefix("level_")?.parse::<i32>().ok()?;
                    let template = value.clone().filter(|v| !v.is_empty())?;
                    Some(LevelDrop {
                        max_level: level,
                        template,
                    })
                })
                .collect();
            if !table.is_empty() {
                table.sort_by_key(|row| row.max_level);
                self.drop_table = table;
            }
        }
    }

    /// Save configuration to the INI file.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        // [view] section
        config.set("view", "width", Some(self.view_width.to_string()));
        config.set("view", "height", Some(self.view_height.to_string()));

        // [sim] section
        config.set("sim", "tick_ms", Some(self.tick_ms.to_string()));
        config.set(
            "sim",
            "update_offscreen_npcs",
            Some(self.update_offscreen_npcs.to_string()),
        );
        config.set(
            "sim",
            "random_sound_chance",
            Some(self.random_sound_chance.to_string()),
        );
        config.set("sim", "seed", Some(self.seed.to_string()));

        // [assets] section
        config.set(
            "assets",
            "root",
            Some(self.asset_root.to_string_lossy().into_owned()),
        );

        // [drops] section
        config.set("drops", "chance", Some(self.drop_chance.to_string()));
        for row in &self.drop_table {
            config.set(
                "drops",
                &format!("level_{}", row.max_level),
                Some(row.template.clone()),
            );
        }

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }

    /// View size as a pair.
    pub fn view_size(&self) -> (f32, f32) {
        (self.view_width as f32, self.view_height as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_safe() {
        let cfg = SimConfig::new();
        assert_eq!(cfg.view_size(), (800.0, 600.0));
        assert!(!cfg.update_offscreen_npcs);
        assert!(cfg.drop_table.is_empty());
    }

    #[test]
    fn text_overrides_only_present_keys() {
        let mut cfg = SimConfig::new();
        cfg.load_from_str(
            "[view]\nwidth = 640\n[sim]\nupdate_offscreen_npcs = true\nrandom_sound_chance = 0\n\
             [drops]\nchance = 150\nlevel_50 = high.ini\nLevel_5 = low.ini\nnotalevel = x.ini\n",
        )
        .expect("parses");
        assert_eq!(cfg.view_width, 640);
        assert_eq!(cfg.view_height, 600);
        assert!(cfg.update_offscreen_npcs);
        assert_eq!(cfg.random_sound_chance, 1);
        assert_eq!(cfg.drop_chance, 100);
        let rows: Vec<_> = cfg.drop_table.iter().map(|r| r.max_level).collect();
        assert_eq!(rows, vec![5, 50]);
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("isorpg-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("sim.ini");
        let mut cfg = SimConfig::with_path(&path);
        cfg.tick_ms = 33;
        cfg.seed = 42;
        cfg.drop_table = vec![LevelDrop {
            max_level: 7,
            template: "coin.ini".into(),
        }];
        cfg.save_to_file().expect("saves");

        let mut back = SimConfig::with_path(&path);
        back.load_from_file().expect("loads");
        assert_eq!(back.tick_ms, 33);
        assert_eq!(back.seed, 42);
        assert_eq!(back.drop_table, cfg.drop_table);
        let _ = std::fs::remove_dir_all(&dir);
        assert!(SimConfig::with_path(dir.join("missing.ini")).load_from_file().is_err());
    }
}
