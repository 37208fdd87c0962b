//! Simulation tick integration tests: object overrides across reloads, the
//! poison-death lifecycle, loot resolution and object side effects.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};

use isorpg_core::components::npc::{CombatStats, Npc, NpcKind, Relation};
use isorpg_core::components::obj::ObjKind;
use isorpg_core::components::tileposition::TilePos;
use isorpg_core::events::audio::AudioCmd;
use isorpg_core::events::drop::DropRequest;
use isorpg_core::events::npc::NpcMessage;
use isorpg_core::events::script::{ScriptCmd, ScriptOwner};
use isorpg_core::game::Simulation;
use isorpg_core::resources::definitions::ObjDefinition;
use isorpg_core::resources::dropbridge::{DropBridge, DropResolver, TemplateDropResolver};
use isorpg_core::resources::gameconfig::SimConfig;
use isorpg_core::resources::spritestore::SpriteStore;
use isorpg_core::spritecodec::{
    FRAME_ENTRY_LEN, HEADER_LEN, SIGNATURE, SIGNATURE_FIELD_LEN, decode_sprite,
};

/// A 2x1 sprite with `frames` identical frames.
fn sprite_bytes(frames: usize, directions: i32, interval: i32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(SIGNATURE);
    out.resize(SIGNATURE_FIELD_LEN, 0);
    for v in [2, 1, frames as i32, directions, 1, interval, 1, 1] {
        out.extend(v.to_le_bytes());
    }
    out.resize(HEADER_LEN, 0);
    out.extend_from_slice(&[0, 0, 255]);
    let body = [1u8, 0, 1, 255, 0];
    let mut offset = out.len() + frames * FRAME_ENTRY_LEN;
    for _ in 0..frames {
        out.extend((offset as u32).to_le_bytes());
        out.extend((body.len() as u32).to_le_bytes());
        offset += body.len();
    }
    for _ in 0..frames {
        out.extend_from_slice(&body);
    }
    out
}

fn headless(resolver: Option<Box<dyn DropResolver>>) -> Simulation {
    let mut sprites = SpriteStore::new();
    if let Some(chest) = decode_sprite(&sprite_bytes(8, 2, 50)) {
        sprites.insert("chest.asf", chest);
    }
    Simulation::with_parts(SimConfig::new(), sprites, resolver)
}

fn chest(id: &str, tile: TilePos) -> ObjDefinition {
    ObjDefinition {
        id: id.into(),
        name: "chest".into(),
        kind: ObjKind::Static,
        tile,
        direction: 1,
        image: Some("chest.asf".into()),
        script: Some("open_chest.txt".into()),
        ..Default::default()
    }
}

fn wolf(tile: TilePos, life: i32) -> Npc {
    let mut wolf = Npc::new("wolf", NpcKind::Fighter, Relation::Hostile, tile)
        .with_stats(CombatStats::with_life(life));
    wolf.body_ini = Some("body/wolf.ini".into());
    wolf.drop_ini = Some("drop/fang.ini".into());
    wolf
}

fn hero() -> Npc {
    Npc::new("hero", NpcKind::Player, Relation::Friendly, TilePos::new(2, 4))
}

#[test]
fn deleted_object_stays_gone_after_reload() {
    let mut sim = headless(None);
    let defs = [chest("obj000", TilePos::new(2, 2)), chest("obj001", TilePos::new(4, 4))];
    sim.load_map_with("town.map", &defs, vec![]);
    let id = sim.objs().find("obj001").expect("loaded");
    assert!(sim.objs_mut().delete(id));
    sim.tick(16.0);
    assert!(sim.objs().find("obj001").is_none());

    sim.load_map_with("cave.map", &[], vec![]);
    let (objs, _) = sim.load_map_with("town.map", &defs, vec![]);
    assert_eq!(objs, 1);
    assert!(sim.objs().find("obj001").is_none());
    assert!(sim.objs().find("obj000").is_some());
}

#[test]
fn opened_chest_reloads_open() {
    let mut sim = headless(None);
    let defs = [chest("obj000", TilePos::new(2, 2))];
    sim.load_map_with("town.map", &defs, vec![]);
    let id = sim.objs().find("obj000").expect("loaded");
    assert!(sim.open_obj(id));

    // Reload before the animation has finished.
    sim.load_map_with("town.map", &defs, vec![]);
    sim.tick(16.0);
    let id = sim.objs().find("obj000").expect("reloaded");
    let obj = sim.objs().get(id).expect("live");
    assert_eq!(obj.anim.frame_begin(), 4);
    assert_eq!(obj.anim.current_frame(), 7);

    assert!(sim.close_obj(id));
    for _ in 0..10 {
        sim.tick(50.0);
    }
    let obj = sim.objs().get(id).expect("live");
    assert_eq!(obj.anim.current_frame(), 4);
    assert!(!obj.anim.is_playing());
}

#[test]
fn overrides_survive_save_and_restore() {
    let defs = [chest("obj000", TilePos::new(2, 2))];
    let json = {
        let mut sim = headless(None);
        sim.load_map_with("town.map", &defs, vec![]);
        let id = sim.objs().find("obj000").expect("loaded");
        sim.objs_mut().set_script(id, "");
        sim.save_overrides().expect("serializes")
    };

    let mut sim = headless(None);
    sim.restore_overrides(&json).expect("parses");
    sim.load_map_with("town.map", &defs, vec![]);
    let id = sim.objs().find("obj000").expect("loaded");
    assert!(!sim.objs().get(id).is_some_and(|o| o.is_interactive()));
    assert!(sim.restore_overrides("not json").is_err());
}

fn wait_for<F: FnMut(&mut Simulation) -> bool>(sim: &mut Simulation, mut done: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done(sim) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn poison_kill_credits_poisoner_and_leaves_remains() {
    let mut resolver = TemplateDropResolver::new("/nonexistent", 1);
    resolver.insert_template(
        "drop/fang.ini",
        ObjDefinition {
            name: "fang".into(),
            ..Default::default()
        },
    );
    let mut sim = headless(Some(Box::new(resolver)));
    sim.definitions_mut().insert_single_obj(
        "body/wolf.ini",
        ObjDefinition {
            image: Some("wolf-body.asf".into()),
            ..Default::default()
        },
    );
    sim.load_map_with("forest.map", &[], vec![hero(), wolf(TilePos::new(3, 5), 15)]);
    let wolf_id = sim.npcs().find_by_name("wolf").expect("loaded");
    if let Some(npc) = sim.npcs_mut().get_mut(wolf_id) {
        npc.effects
            .get_or_insert_with(Default::default)
            .set_poison_seconds(1.0, Some("hero"));
    }

    let mut events = Vec::new();
    for _ in 0..6 {
        events.extend(sim.tick(100.0).npc_events);
    }

    let damage: Vec<i32> = events
        .iter()
        .filter_map(|e| match e {
            NpcMessage::PoisonDamage { amount, .. } => Some(*amount),
            _ => None,
        })
        .collect();
    assert_eq!(damage, vec![10, 10]);
    assert!(events.iter().any(|e| matches!(
        e,
        NpcMessage::Died { killer: Some(k), .. } if k == "hero"
    )));
    let finalized = events
        .iter()
        .filter(|e| matches!(e, NpcMessage::DeathFinalized { .. }))
        .count();
    assert_eq!(finalized, 1);
    assert!(sim.npcs().find_by_name("wolf").is_none());

    let body = sim.objs().find("body:wolf:3,5").expect("body placed");
    assert_eq!(sim.objs().get(body).map(|o| o.kind), Some(ObjKind::Body));

    let dropped = wait_for(&mut sim, |sim| {
        sim.tick(16.0);
        sim.objs().find("drop:wolf:3,5").is_some()
    });
    assert!(dropped, "loot never arrived");
    let loot = sim.objs().find("drop:wolf:3,5").and_then(|id| sim.objs().get(id));
    assert_eq!(loot.map(|o| o.name.as_str()), Some("fang"));

    for _ in 0..5 {
        assert!(sim.tick(16.0).npc_events.is_empty());
    }
    sim.shutdown();
}

/// Answers only after the test opens the gate.
struct GatedResolver {
    gate: Receiver<()>,
}

impl DropResolver for GatedResolver {
    fn resolve(&mut self, request: &DropRequest) -> Option<ObjDefinition> {
        let _ = self.gate.recv();
        Some(ObjDefinition {
            name: format!("{} loot", request.npc_name),
            ..Default::default()
        })
    }
}

#[test]
fn loot_for_an_unloaded_map_is_discarded() {
    let (open, gate): (Sender<()>, Receiver<()>) = unbounded();
    let mut sim = headless(Some(Box::new(GatedResolver { gate })));
    let mut victim = wolf(TilePos::new(3, 5), 5);
    victim.body_ini = None;
    sim.load_map_with("forest.map", &[], vec![victim]);
    let id = sim.npcs().find_by_name("wolf").expect("loaded");
    assert!(sim.damage_npc(id, 50, Some("hero")));
    sim.tick(16.0);

    sim.load_map_with("town.map", &[], vec![]);
    open.send(()).expect("resolver waiting");
    let answered = wait_for(&mut sim, |sim| {
        sim.world().resource::<DropBridge>().rx_result.len() == 1
    });
    assert!(answered);
    sim.tick(16.0);
    assert!(sim.world().resource::<DropBridge>().rx_result.is_empty());
    assert!(sim.objs().is_empty());
}

#[test]
fn object_timers_and_sound_emitters() {
    let mut sim = headless(None);
    let fountain = ObjDefinition {
        id: "obj010".into(),
        kind: ObjKind::Static,
        tile: TilePos::new(3, 3),
        timer_script: Some("bubble.txt".into()),
        timer_interval_ms: 200,
        ..Default::default()
    };
    let brook = ObjDefinition {
        id: "obj011".into(),
        kind: ObjKind::LoopingSound,
        tile: TilePos::new(5, 5),
        sound: Some("brook.wav".into()),
        ..Default::default()
    };
    sim.load_map_with("glade.map", &[fountain, brook], vec![]);

    let first = sim.tick(100.0);
    assert!(first.scripts.is_empty());
    assert!(matches!(
        first.audio.as_slice(),
        [AudioCmd::PlayLoopAt { path, .. }] if path == "brook.wav"
    ));
    // Sound emitters are never drawn.
    assert_eq!(sim.objs().visible().len(), 1);

    let second = sim.tick(100.0);
    assert_eq!(
        second.scripts,
        vec![ScriptCmd::Queue {
            path: "bubble.txt".into(),
            owner: ScriptOwner::Obj {
                map: "glade.map".into(),
                id: "obj010".into(),
            },
        }]
    );
    assert!(matches!(
        second.audio.as_slice(),
        [AudioCmd::UpdatePosition { .. }]
    ));
    assert_eq!(sim.time().frame_count, 2);
}

#[test]
fn death_script_runs_for_its_owner() {
    let mut sim = headless(None);
    let mut boss = wolf(TilePos::new(3, 5), 5);
    boss.name = "boss".into();
    boss.death_script = Some("boss_died.txt".into());
    sim.load_map_with("lair.map", &[], vec![hero(), boss]);
    let id = sim.npcs().find_by_name("boss").expect("loaded");
    sim.damage_npc(id, 100, Some("hero"));
    let out = sim.tick(16.0);
    assert_eq!(
        out.scripts,
        vec![ScriptCmd::Run {
            path: "boss_died.txt".into(),
            owner: ScriptOwner::Npc("boss".into()),
        }]
    );
}
