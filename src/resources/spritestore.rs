//! Decoded sprite cache with a background loader thread.
//!
//! Every sprite path is decoded at most once per process. The first
//! [`SpriteSource::fetch`] of an unknown path marks it pending and, when a
//! loader thread is attached, hands the path to that thread. Finished decodes
//! come back over a channel and are applied by [`SpriteStore::poll`] at the
//! start of the next tick, so the simulation never waits on disk.
//!
//! A path whose file is unreadable or malformed becomes
//! [`SpriteSlot::Missing`]; callers treat that exactly like "no sprite".
//!
//! # Related
//!
//! - [`crate::spritecodec::decode_sprite`] – the decoder run on the loader thread
//! - [`crate::systems::sprites::poll_sprite_loads`] – applies finished loads

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use bevy_ecs::prelude::Resource;
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::spritecodec::{DecodedSprite, decode_sprite};

/// Anything that can hand out decoded sprites by path.
pub trait SpriteSource {
    /// Sprite for `path` if it is already decoded. Unknown paths are queued
    /// for loading and yield `None` until they arrive.
    fn fetch(&mut self, path: &str) -> Option<Arc<DecodedSprite>>;
}

/// Load state of one path.
#[derive(Clone)]
pub enum SpriteSlot {
    Pending,
    Loaded(Arc<DecodedSprite>),
    Missing,
}

struct LoadResult {
    path: String,
    sprite: Result<DecodedSprite, String>,
}

struct SpriteLoader {
    tx_req: Sender<(String, PathBuf)>,
    rx_done: Receiver<LoadResult>,
    handle: JoinHandle<()>,
}

/// Read and decode one sprite file.
pub fn load_sprite_file(path: &Path) -> Result<DecodedSprite, String> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("Failed to read sprite {}: {}", path.display(), e))?;
    decode_sprite(&bytes).ok_or_else(|| format!("Malformed sprite {}", path.display()))
}

fn loader_thread(rx_req: Receiver<(String, PathBuf)>, tx_done: Sender<LoadResult>) {
    debug!(target: "sprites", "loader thread starting");
    for (path, full) in rx_req.iter() {
        let sprite = load_sprite_file(&full);
        if tx_done.send(LoadResult { path, sprite }).is_err() {
            break;
        }
    }
    debug!(target: "sprites", "loader thread exiting");
}

/// Process-wide sprite cache keyed by relative path.
#[derive(Resource, Default)]
pub struct SpriteStore {
    root: PathBuf,
    slots: FxHashMap<String, SpriteSlot>,
    loader: Option<SpriteLoader>,
}

impl SpriteStore {
    /// Store without a loader; only [`SpriteStore::insert`]ed sprites resolve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that decodes files below `root` on a background thread.
    pub fn threaded(root: impl Into<PathBuf>) -> Self {
        let (tx_req, rx_req) = unbounded::<(String, PathBuf)>();
        let (tx_done, rx_done) = unbounded::<LoadResult>();
        let handle = std::thread::spawn(move || loader_thread(rx_req, tx_done));
        Self {
            root: root.into(),
            slots: FxHashMap::default(),
            loader: Some(SpriteLoader {
                tx_req,
                rx_done,
                handle,
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register an already decoded sprite under `path`.
    pub fn insert(&mut self, path: impl Into<String>, sprite: DecodedSprite) -> Arc<DecodedSprite> {
        let sprite = Arc::new(sprite);
        self.slots
            .insert(path.into(), SpriteSlot::Loaded(Arc::clone(&sprite)));
        sprite
    }

    pub fn slot(&self, path: &str) -> Option<&SpriteSlot> {
        self.slots.get(path)
    }

    pub fn get(&self, path: &str) -> Option<Arc<DecodedSprite>> {
        match self.slots.get(path) {
            Some(SpriteSlot::Loaded(sprite)) => Some(Arc::clone(sprite)),
            _ => None,
        }
    }

    pub fn is_pending(&self, path: &str) -> bool {
        matches!(self.slots.get(path), Some(SpriteSlot::Pending))
    }

    /// Number of paths still waiting on the loader.
    pub fn pending_count(&self) -> usize {
        self.slots
            .values()
            .filter(|s| matches!(s, SpriteSlot::Pending))
            .count()
    }

    /// Apply loads finished since the last call. Returns how many arrived.
    pub fn poll(&mut self) -> usize {
        let Some(loader) = &self.loader else {
            return 0;
        };
        let done: Vec<LoadResult> = loader.rx_done.try_iter().collect();
        let count = done.len();
        for result in done {
            let slot = match result.sprite {
                Ok(sprite) => {
                    debug!(target: "sprites", "loaded {}", result.path);
                    SpriteSlot::Loaded(Arc::new(sprite))
                }
                Err(e) => {
                    warn!(target: "sprites", "{}", e);
                    SpriteSlot::Missing
                }
            };
            self.slots.insert(result.path, slot);
        }
        count
    }

    /// Stop the loader thread and wait for it.
    pub fn shutdown(&mut self) {
        if let Some(loader) = self.loader.take() {
            drop(loader.tx_req);
            let _ = loader.handle.join();
        }
    }
}

impl SpriteSource for SpriteStore {
    fn fetch(&mut self, path: &str) -> Option<Arc<DecodedSprite>> {
        if path.is_empty() {
            return None;
        }
        match self.slots.get(path) {
            Some(SpriteSlot::Loaded(sprite)) => return Some(Arc::clone(sprite)),
            Some(SpriteSlot::Pending) | Some(SpriteSlot::Missing) => return None,
            None => {}
        }
        match &self.loader {
            Some(loader) => {
                let sent = loader
                    .tx_req
                    .send((path.to_string(), self.root.join(path)))
                    .is_ok();
                let slot = if sent {
                    SpriteSlot::Pending
                } else {
                    SpriteSlot::Missing
                };
                self.slots.insert(path.to_string(), slot);
            }
            None => {
                self.slots.insert(path.to_string(), SpriteSlot::Missing);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spritecodec::tests::{build_sprite, simple_body};

    #[test]
    fn inserted_sprite_is_shared() {
        let mut store = SpriteStore::new();
        let bytes = build_sprite(2, 2, 1, 100, &[[0, 0, 255]], &[simple_body(0)]);
        let sprite = decode_sprite(&bytes).expect("decodes");
        let a = store.insert("npc/guard.asf", sprite);
        let b = store.fetch("npc/guard.asf").expect("cached");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn unknown_path_without_loader_is_missing() {
        let mut store = SpriteStore::new();
        assert!(store.fetch("nope.asf").is_none());
        assert!(matches!(store.slot("nope.asf"), Some(SpriteSlot::Missing)));
        assert!(store.fetch("").is_none());
        assert!(store.slot("").is_none());
    }

    #[test]
    fn threaded_loader_reports_missing_file() {
        let dir = std::env::temp_dir().join(format!("isorpg-sprites-{}", std::process::id()));
        let mut store = SpriteStore::threaded(&dir);
        assert!(store.fetch("absent.asf").is_none());
        assert!(store.is_pending("absent.asf"));
        // The loader answers eventually; wait for it.
        let mut arrived = 0;
        for _ in 0..200 {
            arrived += store.poll();
            if arrived > 0 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(arrived, 1);
        assert!(matches!(store.slot("absent.asf"), Some(SpriteSlot::Missing)));
        store.shutdown();
    }

    #[test]
    fn threaded_loader_decodes_file() {
        let dir = std::env::temp_dir().join(format!("isorpg-sprites-ok-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let bytes = build_sprite(2, 1, 1, 50, &[[1, 2, 3]], &[simple_body(0)]);
        std::fs::write(dir.join("one.asf"), bytes).expect("write sprite");

        let mut store = SpriteStore::threaded(&dir);
        assert!(store.fetch("one.asf").is_none());
        for _ in 0..200 {
            if store.poll() > 0 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        let sprite = store.fetch("one.asf").expect("loaded");
        assert_eq!(sprite.interval(), 50);
        assert_eq!(store.pending_count(), 0);
        store.shutdown();
        let _ = std::fs::remove_dir_all(&dir);
    }
}
