//! Headless simulation harness.
//!
//! Loads a map from an asset root, runs a fixed number of ticks and prints a
//! summary of what the tick loop produced. Can also print the header of a
//! sprite file as JSON.
//!
//! # Running
//!
//! ```sh
//! cargo run -- --config isorpg.ini --map map_003 --objs ini/obj/map_003_obj.ini \
//!     --npcs ini/save/map_003.npc --ticks 600
//! cargo run -- --inspect asf/character/wolf.asf
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;
use log::{error, info};

use isorpg_core::game::Simulation;
use isorpg_core::resources::gameconfig::SimConfig;
use isorpg_core::spritecodec::parse_header;

/// Isometric RPG simulation core
#[derive(Parser)]
#[command(version, about = "Runs the isometric RPG simulation core headless.")]
struct Cli {
    /// Configuration file; defaults are used when it is missing.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Asset root, overriding the configuration.
    #[arg(long, value_name = "DIR")]
    assets: Option<PathBuf>,

    /// Map name used to key object overrides.
    #[arg(long, default_value = "map")]
    map: String,

    /// Object definition file, relative to the asset root.
    #[arg(long, value_name = "PATH")]
    objs: Option<String>,

    /// Unit definition file, relative to the asset root.
    #[arg(long, value_name = "PATH")]
    npcs: Option<String>,

    /// Number of ticks to run.
    #[arg(long, default_value_t = 60)]
    ticks: u32,

    /// Print the header of a sprite file as JSON and exit.
    #[arg(long, value_name = "PATH")]
    inspect: Option<PathBuf>,
}

fn inspect(path: &Path) -> Result<String, String> {
    let data = std::fs::read(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let header = parse_header(&data).ok_or_else(|| format!("{} is not a sprite file", path.display()))?;
    serde_json::to_string_pretty(&header).map_err(|e| format!("Failed to serialize header: {}", e))
}

fn run(cli: Cli) -> Result<(), String> {
    if let Some(path) = &cli.inspect {
        println!("{}", inspect(path)?);
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => SimConfig::with_path(path),
        None => SimConfig::new(),
    };
    if let Err(e) = config.load_from_file() {
        info!("{}; using defaults", e);
    }
    if let Some(root) = cli.assets {
        config.asset_root = root;
    }
    let tick_ms = config.tick_ms as f32;

    let mut sim = Simulation::new(config);
    let (objs, npcs) = sim.load_map(&cli.map, cli.objs.as_deref(), cli.npcs.as_deref())?;
    info!("{} objects, {} units", objs, npcs);

    let (mut scripts, mut audio, mut events) = (0usize, 0usize, 0usize);
    for _ in 0..cli.ticks {
        sim.follow_player();
        let out = sim.tick(tick_ms);
        for cmd in &out.scripts {
            info!(target: "script", "{:?}", cmd);
        }
        for event in &out.npc_events {
            info!(target: "npc", "{:?}", event);
        }
        scripts += out.scripts.len();
        audio += out.audio.len();
        events += out.npc_events.len();
    }

    println!(
        "{} ticks ({} ms simulated): {} units, {} objects, {} visible units, {} script requests, {} audio commands, {} unit events",
        cli.ticks,
        sim.time().elapsed_ms,
        sim.npcs().len(),
        sim.objs().len(),
        sim.npcs().visible().len(),
        scripts,
        audio,
        events
    );
    println!("{}", sim.save_overrides()?);
    sim.shutdown();
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
