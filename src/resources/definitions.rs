//! Definition files for objects, units and appearances.
//!
//! All definition files are INI text read with `configparser`, which
//! lowercases section and key names. Map files hold one section per entry
//! with a numeric suffix (`[OBJ000]`, `[NPC007]`); single-object files (body
//! and loot templates) use an `[Init]` section; appearance files use one
//! section per character state.
//!
//! # Object keys
//!
//! `objname`, `kind`, `dir`, `frame`, `mapx`, `mapy`, `offx`, `offy`,
//! `image`, `scriptfile`, `timerscriptfile`, `timerscriptinterval`,
//! `wavfile`, `millisecondstoremove`, `damage`, `level`
//!
//! # Unit keys
//!
//! `name`, `kind`, `relation`, `group`, `ai`, `dir`, `mapx`, `mapy`, `life`,
//! `lifemax`, `mana`, `manamax`, `thew`, `thewmax`, `attack`, `defend`,
//! `evade`, `level`, `exp`, `npcini`, `bodyini`, `dropini`,
//! `nodropwhendie`, `deathscript`, `scriptfile`, `revivemilliseconds`,
//! `hide`
//!
//! Parsed files are memoized per path by [`DefinitionStore`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use configparser::ini::Ini;
use glam::Vec2;
use log::warn;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::components::npc::{CombatStats, NpcKind, Relation};
use crate::components::obj::ObjKind;
use crate::components::tileposition::TilePos;
use crate::resources::spriteset::{CharacterState, SpriteSet};

/// Everything needed to create one object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjDefinition {
    pub id: String,
    pub name: String,
    pub kind: ObjKind,
    pub tile: TilePos,
    pub offset: Vec2,
    pub direction: i32,
    pub frame: usize,
    pub image: Option<String>,
    pub script: Option<String>,
    pub timer_script: Option<String>,
    pub timer_interval_ms: u32,
    pub sound: Option<String>,
    pub remove_after_ms: Option<u32>,
    pub damage: i32,
    pub level: i32,
}

/// Everything needed to create one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NpcDefinition {
    pub id: String,
    pub name: String,
    pub kind: NpcKind,
    pub relation: Relation,
    pub group: i32,
    pub ai: i32,
    pub tile: TilePos,
    pub direction: i32,
    pub stats: CombatStats,
    /// Appearance file with one section per character state.
    pub appearance: Option<String>,
    pub body_ini: Option<String>,
    pub drop_ini: Option<String>,
    pub no_drop: bool,
    pub death_script: Option<String>,
    pub script: Option<String>,
    pub revive_ms: f32,
    pub hidden: bool,
}

fn read_ini(text: &str) -> Result<Ini, String> {
    let mut ini = Ini::new();
    ini.read(text.to_string())
        .map_err(|e| format!("Failed to parse definition: {}", e))?;
    Ok(ini)
}

fn text(ini: &Ini, section: &str, key: &str) -> Option<String> {
    ini.get(section, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn int(ini: &Ini, section: &str, key: &str) -> Option<i64> {
    ini.getint(section, key).ok().flatten()
}

fn int_or(ini: &Ini, section: &str, key: &str, default: i64) -> i32 {
    int(ini, section, key).unwrap_or(default) as i32
}

fn flag(ini: &Ini, section: &str, key: &str) -> bool {
    int(ini, section, key).is_some_and(|v| v != 0)
        || ini.getbool(section, key).ok().flatten().unwrap_or(false)
}

/// Sections sorted by name, so entries keep their file order.
fn sorted_sections(ini: &Ini) -> Vec<String> {
    let mut sections = ini.sections();
    sections.retain(|s| s != "head" && s != "default");
    sections.sort();
    sections
}

/// Object from one section; `None` when the section is absent.
pub fn parse_obj_section(ini: &Ini, section: &str) -> Option<ObjDefinition> {
    if !ini.sections().iter().any(|s| s == section) {
        return None;
    }
    Some(ObjDefinition {
        id: section.to_string(),
        name: text(ini, section, "objname").unwrap_or_default(),
        kind: ObjKind::from_i64(int(ini, section, "kind").unwrap_or(0)),
        tile: TilePos::new(
            int_or(ini, section, "mapx", 0),
            int_or(ini, section, "mapy", 0),
        ),
        offset: Vec2::new(
            int_or(ini, section, "offx", 0) as f32,
            int_or(ini, section, "offy", 0) as f32,
        ),
        direction: int_or(ini, section, "dir", 0),
        frame: int(ini, section, "frame").unwrap_or(0).max(0) as usize,
        image: text(ini, section, "image"),
        script: text(ini, section, "scriptfile"),
        timer_script: text(ini, section, "timerscriptfile"),
        timer_interval_ms: int(ini, section, "timerscriptinterval")
            .unwrap_or(0)
            .max(0) as u32,
        sound: text(ini, section, "wavfile"),
        remove_after_ms: int(ini, section, "millisecondstoremove")
            .filter(|v| *v > 0)
            .map(|v| v as u32),
        damage: int_or(ini, section, "damage", 0),
        level: int_or(ini, section, "level", 0),
    })
}

/// Every object of a map object file.
pub fn parse_obj_file(text: &str) -> Result<Vec<ObjDefinition>, String> {
    let ini = read_ini(text)?;
    Ok(sorted_sections(&ini)
        .iter()
        .filter_map(|s| parse_obj_section(&ini, s))
        .collect())
}

/// Single-object template: the `[Init]` section, or the first section.
pub fn parse_single_obj(text: &str) -> Result<ObjDefinition, String> {
    let ini = read_ini(text)?;
    let section = if ini.sections().iter().any(|s| s == "init") {
        "init".to_string()
    } else {
        sorted_sections(&ini)
            .into_iter()
            .next()
            .ok_or_else(|| "Object template has no sections".to_string())?
    };
    parse_obj_section(&ini, &section).ok_or_else(|| format!("Missing section [{}]", section))
}

/// Unit from one section; `None` when the section is absent.
pub fn parse_npc_section(ini: &Ini, section: &str) -> Option<NpcDefinition> {
    if !ini.sections().iter().any(|s| s == section) {
        return None;
    }
    let life = int_or(ini, section, "life", 100);
    let mana = int_or(ini, section, "mana", 0);
    let thew = int_or(ini, section, "thew", 0);
    let stats = CombatStats {
        life,
        life_max: int(ini, section, "lifemax")
            .filter(|v| *v > 0)
            .map(|v| v as i32)
            .unwrap_or(life),
        mana,
        mana_max: int(ini, section, "manamax")
            .filter(|v| *v > 0)
            .map(|v| v as i32)
            .unwrap_or(mana),
        thew,
        thew_max: int(ini, section, "thewmax")
            .filter(|v| *v > 0)
            .map(|v| v as i32)
            .unwrap_or(thew),
        attack: int_or(ini, section, "attack", 0),
        defend: int_or(ini, section, "defend", 0),
        evade: int_or(ini, section, "evade", 0),
        level: int_or(ini, section, "level", 1),
        exp: int_or(ini, section, "exp", 0),
    };
    Some(NpcDefinition {
        id: section.to_string(),
        name: text(ini, section, "name").unwrap_or_else(|| section.to_string()),
        kind: NpcKind::from_i64(int(ini, section, "kind").unwrap_or(0)),
        relation: Relation::from_i64(int(ini, section, "relation").unwrap_or(0)),
        group: int_or(ini, section, "group", 0),
        ai: int_or(ini, section, "ai", 0),
        tile: TilePos::new(
            int_or(ini, section, "mapx", 0),
            int_or(ini, section, "mapy", 0),
        ),
        direction: int_or(ini, section, "dir", 0),
        stats,
        appearance: text(ini, section, "npcini"),
        body_ini: text(ini, section, "bodyini"),
        drop_ini: text(ini, section, "dropini"),
        no_drop: flag(ini, section, "nodropwhendie"),
        death_script: text(ini, section, "deathscript"),
        script: text(ini, section, "scriptfile"),
        revive_ms: int(ini, section, "revivemilliseconds").unwrap_or(0).max(0) as f32,
        hidden: flag(ini, section, "hide"),
    })
}

/// Every unit of a map unit file.
pub fn parse_npc_file(text: &str) -> Result<Vec<NpcDefinition>, String> {
    let ini = read_ini(text)?;
    Ok(sorted_sections(&ini)
        .iter()
        .filter_map(|s| parse_npc_section(&ini, s))
        .collect())
}

/// Appearance file: `image=` and `sound=` per state section. Unknown
/// sections are ignored.
pub fn parse_sprite_set(text_in: &str) -> Result<SpriteSet, String> {
    let ini = read_ini(text_in)?;
    let mut set = SpriteSet::new();
    for section in ini.sections() {
        let Some(state) = CharacterState::from_section_name(&section) else {
            continue;
        };
        if let Some(image) = text(&ini, &section, "image") {
            set.set_image(state, image);
        }
        if let Some(sound) = text(&ini, &section, "sound") {
            set.set_sound(state, sound);
        }
    }
    Ok(set)
}

type Memo<T> = FxHashMap<String, Option<Arc<T>>>;

/// Parse `path` once; later calls return the cached result (or failure).
fn memoized<T>(
    cache: &mut Memo<T>,
    root: &Path,
    path: &str,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Option<Arc<T>> {
    if let Some(entry) = cache.get(path) {
        return entry.clone();
    }
    let full = root.join(path);
    let parsed = std::fs::read_to_string(&full)
        .map_err(|e| format!("Failed to read {}: {}", full.display(), e))
        .and_then(|t| parse(&t));
    let entry = match parsed {
        Ok(value) => Some(Arc::new(value)),
        Err(e) => {
            warn!("{}", e);
            None
        }
    };
    cache.insert(path.to_string(), entry.clone());
    entry
}

/// Parsed definition files, memoized by path relative to the asset root.
#[derive(Resource, Default)]
pub struct DefinitionStore {
    root: PathBuf,
    obj_files: Memo<Vec<ObjDefinition>>,
    single_objs: Memo<ObjDefinition>,
    npc_files: Memo<Vec<NpcDefinition>>,
    sprite_sets: Memo<SpriteSet>,
}

impl DefinitionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn obj_file(&mut self, path: &str) -> Option<Arc<Vec<ObjDefinition>>> {
        memoized(&mut self.obj_files, &self.root, path, parse_obj_file)
    }

    pub fn single_obj(&mut self, path: &str) -> Option<Arc<ObjDefinition>> {
        memoized(&mut self.single_objs, &self.root, path, parse_single_obj)
    }

    pub fn npc_file(&mut self, path: &str) -> Option<Arc<Vec<NpcDefinition>>> {
        memoized(&mut self.npc_files, &self.root, path, parse_npc_file)
    }

    pub fn sprite_set(&mut self, path: &str) -> Option<Arc<SpriteSet>> {
        memoized(&mut self.sprite_sets, &self.root, path, parse_sprite_set)
    }

    /// Register an object template without touching disk.
    pub fn insert_single_obj(&mut self, path: impl Into<String>, def: ObjDefinition) {
        self.single_objs.insert(path.into(), Some(Arc::new(def)));
    }

    /// Register an appearance without touching disk.
    pub fn insert_sprite_set(&mut self, path: impl Into<String>, set: SpriteSet) {
        self.sprite_sets.insert(path.into(), Some(Arc::new(set)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBJ_FILE: &str = "\
[Head]
Map=town.map
Count=2

[OBJ001]
ObjName=Chest
Kind=1
Dir=2
Frame=0
MapX=10
MapY=21
OffX=4
OffY=-2
Image=obj/chest.asf
ScriptFile=chest.txt

[OBJ000]
ObjName=Fountain
Kind=3
MapX=3
MapY=4
WavFile=water.wav
TimerScriptFile=bubble.txt
TimerScriptInterval=500
MillisecondsToRemove=0
";

    const NPC_FILE: &str = "\
[NPC000]
Name=Bandit
Kind=1
Relation=1
Group=2
MapX=5
MapY=6
Life=50
Level=3
NpcIni=bandit.ini
BodyIni=body-bandit.ini
NoDropWhenDie=1
ReviveMilliseconds=3000
";

    #[test]
    fn objects_in_section_order() {
        let objs = parse_obj_file(OBJ_FILE).expect("parses");
        assert_eq!(objs.len(), 2);
        assert_eq!(objs[0].id, "obj000");
        assert_eq!(objs[0].kind, ObjKind::LoopingSound);
        assert_eq!(objs[0].timer_interval_ms, 500);
        assert_eq!(objs[0].remove_after_ms, None);
        let chest = &objs[1];
        assert_eq!(chest.name, "Chest");
        assert_eq!(chest.kind, ObjKind::Static);
        assert_eq!(chest.tile, TilePos::new(10, 21));
        assert_eq!(chest.offset, Vec2::new(4.0, -2.0));
        assert_eq!(chest.direction, 2);
        assert_eq!(chest.image.as_deref(), Some("obj/chest.asf"));
        assert_eq!(chest.script.as_deref(), Some("chest.txt"));
    }

    #[test]
    fn npc_fields_and_defaults() {
        let npcs = parse_npc_file(NPC_FILE).expect("parses");
        assert_eq!(npcs.len(), 1);
        let n = &npcs[0];
        assert_eq!(n.name, "Bandit");
        assert_eq!(n.kind, NpcKind::Fighter);
        assert_eq!(n.relation, Relation::Hostile);
        assert_eq!(n.group, 2);
        assert_eq!(n.stats.life_max, 50);
        assert_eq!(n.stats.level, 3);
        assert!(n.no_drop);
        assert_eq!(n.revive_ms, 3000.0);
        assert_eq!(n.appearance.as_deref(), Some("bandit.ini"));
    }

    #[test]
    fn single_obj_prefers_init() {
        let def = parse_single_obj("[Init]\nObjName=Corpse\nKind=2\nImage=body.asf\n").expect("parses");
        assert_eq!(def.kind, ObjKind::Body);
        assert_eq!(def.id, "init");
        assert!(parse_single_obj("; nothing here\n").is_err());
    }

    #[test]
    fn sprite_set_sections() {
        let set = parse_sprite_set(
            "[Stand]\nImage=stand.asf\n[FightStand]\nImage=fight.asf\nSound=grunt.wav\n[Other]\nImage=x.asf\n",
        )
        .expect("parses");
        assert_eq!(set.image(CharacterState::Stand), Some("stand.asf"));
        assert_eq!(set.image(CharacterState::FightStand), Some("fight.asf"));
        assert_eq!(set.sound(CharacterState::FightStand), Some("grunt.wav"));
        assert_eq!(set.image(CharacterState::Walk), None);
    }

    #[test]
    fn missing_file_is_memoized_as_absent() {
        let mut store = DefinitionStore::new(std::env::temp_dir().join("isorpg-no-such-dir"));
        assert!(store.sprite_set("ghost.ini").is_none());
        store.insert_sprite_set("ghost.ini", SpriteSet::new().with_image(CharacterState::Stand, "g.asf"));
        assert!(store.sprite_set("ghost.ini").is_some());
    }
}
