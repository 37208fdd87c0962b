//! Persisted per-map object overrides.
//!
//! Whatever scripts do to map objects (change their script, delete them,
//! open or close them) is written here first, keyed by map and object id.
//! The table outlives the objects: when a map is loaded again, each object
//! definition is patched with its override, and removed objects are not
//! created at all. The whole table serializes to JSON for save games.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::resources::definitions::ObjDefinition;

/// Changes recorded for one object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjOverride {
    /// Replacement interaction script; `Some("")` disables interaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default)]
    pub removed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<usize>,
}

/// Override table for every map visited so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjOverrides {
    maps: FxHashMap<String, FxHashMap<String, ObjOverride>>,
}

impl ObjOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, map: &str, obj_id: &str) -> Option<&ObjOverride> {
        self.maps.get(map).and_then(|m| m.get(obj_id))
    }

    /// Override record for an object, created empty on first use.
    pub fn entry(&mut self, map: &str, obj_id: &str) -> &mut ObjOverride {
        self.maps
            .entry(map.to_string())
            .or_default()
            .entry(obj_id.to_string())
            .or_default()
    }

    pub fn set_script(&mut self, map: &str, obj_id: &str, script: &str) {
        self.entry(map, obj_id).script = Some(script.to_string());
    }

    pub fn set_removed(&mut self, map: &str, obj_id: &str) {
        self.entry(map, obj_id).removed = true;
    }

    pub fn set_frame(&mut self, map: &str, obj_id: &str, frame: usize) {
        self.entry(map, obj_id).frame = Some(frame);
    }

    pub fn is_removed(&self, map: &str, obj_id: &str) -> bool {
        self.get(map, obj_id).is_some_and(|o| o.removed)
    }

    /// Patch a definition in place. Returns false when the object was
    /// removed and must not be created.
    pub fn apply(&self, map: &str, def: &mut ObjDefinition) -> bool {
        let Some(o) = self.get(map, &def.id) else {
            return true;
        };
        if o.removed {
            return false;
        }
        if let Some(script) = &o.script {
            def.script = Some(script.clone()).filter(|s| !s.is_empty());
        }
        if let Some(frame) = o.frame {
            def.frame = frame;
        }
        true
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("Failed to serialize overrides: {}", e))
    }

    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("Failed to parse overrides: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chest() -> ObjDefinition {
        ObjDefinition {
            id: "obj003".into(),
            script: Some("chest.txt".into()),
            ..Default::default()
        }
    }

    #[test]
    fn untouched_definition_passes() {
        let table = ObjOverrides::new();
        let mut def = chest();
        assert!(table.apply("town.map", &mut def));
        assert_eq!(def, chest());
    }

    #[test]
    fn overrides_patch_script_and_frame() {
        let mut table = ObjOverrides::new();
        table.set_frame("town.map", "obj003", 4);
        table.set_script("town.map", "obj003", "");
        let mut def = chest();
        assert!(table.apply("town.map", &mut def));
        assert_eq!(def.frame, 4);
        assert_eq!(def.script, None);
        // Another map is unaffected.
        let mut other = chest();
        assert!(table.apply("cave.map", &mut other));
        assert_eq!(other.frame, 0);
    }

    #[test]
    fn removed_blocks_creation() {
        let mut table = ObjOverrides::new();
        table.set_removed("town.map", "obj003");
        assert!(table.is_removed("town.map", "obj003"));
        assert!(!table.apply("town.map", &mut chest()));
    }

    #[test]
    fn json_keeps_records() {
        let mut table = ObjOverrides::new();
        table.set_removed("a.map", "obj001");
        table.set_frame("b.map", "obj002", 7);
        let json = table.to_json().expect("serializes");
        let back = ObjOverrides::from_json(&json).expect("parses");
        assert_eq!(back, table);
        assert!(ObjOverrides::from_json("{nope").is_err());
    }
}
