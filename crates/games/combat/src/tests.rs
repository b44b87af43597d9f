use sim_core::Micros;

use crate::anchor::{AnchorId, AnchorState};
use crate::assets::{AssetBundle, AssetId, CharacterDef};
use crate::camera::{CameraFollowUp, CameraTarget, CameraWork};
use crate::character::{Character, CharacterId, DestroyHook, MoveKind, Role};
use crate::config::{CombatData, EncounterConfig, SpawnMode, WaveSpec};
use crate::events::{CombatEvent, SpawnFailure};
use crate::geometry::{Transform, Vec3};
use crate::manager::CombatManager;
use crate::phase::CombatPhase;
use crate::sandbox::{CameraCommand, SandboxWorld};
use crate::services::{ActorSpawner, MovementDriver, OverlapProbe};
use crate::waves::WaveQueue;

const DT: Micros = Micros::tick_period(60);

fn manager() -> CombatManager<SandboxWorld> {
    let config = EncounterConfig::default();
    let mut sandbox = config.sandbox.clone();
    sandbox.load_latency = 0.0;
    let world = SandboxWorld::new(&sandbox, &config.stages);
    let mut manager = CombatManager::new(config.layout, config.heroes, world, 11);
    manager.place_anchors();
    manager
}

fn add_character(manager: &mut CombatManager<SandboxWorld>, role: Role, at: Vec3) -> CharacterId {
    let def = CharacterDef::new("EnemyData:Grunt", 40.0);
    let id = manager.characters.insert(Character::new(def.clone(), role));
    assert!(manager.services.spawn_character(id, &def, Transform::at(at)));
    if role == Role::Enemy {
        manager.characters[id].on_destroyed.push(DestroyHook::ForgetEnemy);
        manager.enemies_in_scene.push(id);
    } else {
        manager.characters[id].on_destroyed.push(DestroyHook::ForgetHero);
        manager.heroes_in_scene.push(id);
    }
    id
}

fn location(manager: &CombatManager<SandboxWorld>, anchor: AnchorId) -> Vec3 {
    manager.anchors[anchor].location()
}

fn wave(mode: SpawnMode, enemies: &[&str]) -> WaveSpec {
    WaveSpec {
        spawn_mode: mode,
        spawn_delay: 0.0,
        enemies: enemies.iter().map(|e| AssetId::from(*e)).collect(),
    }
}

fn assert_anchor_invariant(manager: &CombatManager<SandboxWorld>) {
    for (_, anchor) in manager.anchors.iter() {
        let owner = anchor.owner();
        let overlaps = owner.is_some_and(|c| manager.services.overlaps(c, anchor.volume()));
        let holds = match anchor.state() {
            AnchorState::Free => owner.is_none(),
            AnchorState::Reserved => owner.is_some() && !overlaps,
            AnchorState::Occupied => owner.is_some() && overlaps,
        };
        assert!(holds, "{} is {:?} with owner {:?}", anchor.name, anchor.state(), owner);
    }
}

#[test]
fn anchors_are_snapped_and_linked_tail_first() {
    let manager = manager();
    assert_eq!(manager.hero_line.len(), 2);
    assert_eq!(manager.enemy_line.len(), 3);

    let line = manager.enemy_line.clone();
    assert_eq!(manager.anchors[line[0]].successor(), Some(line[1]));
    assert_eq!(manager.anchors[line[1]].successor(), Some(line[2]));
    assert_eq!(manager.anchors[line[2]].successor(), None);

    // Origin sits at z=100 over flat ground at z=0.
    assert_eq!(location(&manager, line[0]), Vec3::new(150.0, 0.0, 99.0));
    assert_eq!(location(&manager, manager.hero_line[1]), Vec3::new(-250.0, -125.0, 99.0));
}

#[test]
fn placing_again_repositions_unless_count_changes() {
    let mut manager = manager();
    let before = manager.enemy_line.clone();

    manager.layout.origin.location.x = 1000.0;
    manager.place_anchors();
    assert_eq!(manager.enemy_line, before);
    assert_eq!(location(&manager, before[0]).x, 1150.0);

    manager.layout.enemy_anchor_offsets.pop();
    manager.place_anchors();
    assert_eq!(manager.enemy_line.len(), 2);
    assert!(before.iter().all(|id| !manager.anchors.contains_key(*id)));
    let line = manager.enemy_line.clone();
    assert_eq!(manager.anchors[line[0]].successor(), Some(line[1]));
}

#[test]
fn owner_tracks_overlap() {
    let mut manager = manager();
    let mut events = Vec::new();
    let front = manager.enemy_line[0];
    let enemy = add_character(&mut manager, Role::Enemy, Vec3::new(900.0, 0.0, 100.0));

    manager.set_new_owner(front, Some(enemy), &mut events);
    assert_eq!(manager.anchors[front].state(), AnchorState::Reserved);
    assert_eq!(manager.owner(front), Some(enemy));
    assert_eq!(manager.characters[enemy].anchor, Some(front));
    assert_eq!(manager.characters[enemy].moving, MoveKind::Run);

    let at = location(&manager, front);
    manager.services.set_position(enemy, at);
    assert!(manager.update_anchor(front, &mut events));
    assert_eq!(manager.anchors[front].state(), AnchorState::Occupied);
    assert!(events.contains(&CombatEvent::CharacterReachedAnchor {
        character: enemy,
        kind: MoveKind::Run
    }));
    assert_eq!(manager.characters[enemy].moving, MoveKind::None);
    assert!(!manager.update_anchor(front, &mut events));
    assert_anchor_invariant(&manager);

    manager.set_new_owner(front, None, &mut events);
    assert_eq!(manager.anchors[front].state(), AnchorState::Free);
    assert!(manager.characters[enemy].death_watchers.is_empty());
}

#[test]
fn claiming_releases_the_previous_anchor() {
    let mut manager = manager();
    let mut events = Vec::new();
    let line = manager.enemy_line.clone();
    let enemy = add_character(&mut manager, Role::Enemy, Vec3::new(900.0, 0.0, 100.0));

    manager.set_new_owner(line[2], Some(enemy), &mut events);
    manager.set_new_owner(line[0], Some(enemy), &mut events);
    assert_eq!(manager.owner(line[2]), None);
    assert_eq!(manager.owner(line[0]), Some(enemy));
    assert_eq!(manager.characters[enemy].death_watchers, vec![line[0]]);
    assert_anchor_invariant(&manager);
}

#[test]
fn releasing_a_slot_moves_each_successor_one_forward() {
    let mut manager = manager();
    let mut events = Vec::new();
    let line = manager.enemy_line.clone();
    let occupants: Vec<CharacterId> = line
        .iter()
        .map(|anchor| {
            let at = location(&manager, *anchor);
            add_character(&mut manager, Role::Enemy, at)
        })
        .collect();
    for (anchor, enemy) in line.iter().zip(&occupants) {
        manager.set_new_owner(*anchor, Some(*enemy), &mut events);
        assert_eq!(manager.anchors[*anchor].state(), AnchorState::Occupied);
    }

    let change = manager.apply_damage(occupants[0], 100.0, &mut events).unwrap();
    assert!(change.died);

    assert_eq!(manager.owner(line[0]), Some(occupants[1]));
    assert_eq!(manager.owner(line[1]), Some(occupants[2]));
    assert_eq!(manager.owner(line[2]), None);
    assert_eq!(manager.anchors[line[2]].state(), AnchorState::Free);
    assert_eq!(manager.characters[occupants[1]].anchor, Some(line[0]));
    assert_eq!(manager.characters[occupants[2]].anchor, Some(line[1]));
    assert!(!manager.characters.contains_key(occupants[0]));
    assert_eq!(manager.enemies_in_scene, vec![occupants[1], occupants[2]]);
    assert_anchor_invariant(&manager);
}

#[test]
fn all_free_gate_waits_for_the_whole_line_then_relaxes() {
    let mut manager = manager();
    let mut events = Vec::new();
    manager.waves = WaveQueue::from_specs(&[wave(
        SpawnMode::OnAllAnchorsFree,
        &["EnemyData:Grunt", "EnemyData:Grunt", "EnemyData:Grunt"],
    )]);
    manager.create_next_wave(&mut events);

    let front = manager.enemy_line[0];
    let at = location(&manager, front);
    let blocker = add_character(&mut manager, Role::Enemy, at);
    manager.set_new_owner(front, Some(blocker), &mut events);
    assert!(!manager.try_spawn_enemy(&mut events));
    assert_eq!(manager.waves.spawn_queue_len(), 3);

    manager.destroy_character(blocker, &mut events);
    assert!(manager.try_spawn_enemy(&mut events));
    assert!(manager.enemy_spawn_in_flight);
    assert!(!manager.try_spawn_enemy(&mut events), "one spawn in flight at a time");

    // The spawn lands on the tail, leaving two anchors free.
    manager.resolve_loads(&mut events);
    assert!(!manager.enemy_spawn_in_flight);
    let tail = *manager.enemy_line.last().unwrap();
    assert_eq!(manager.anchors[tail].state(), AnchorState::Reserved);
    assert!(manager.try_spawn_enemy(&mut events));
    assert_eq!(manager.waves.spawn_queue_len(), 1);
}

#[test]
fn spawn_requests_use_the_spawn_bundle() {
    let mut manager = manager();
    let mut events = Vec::new();
    assert!(manager.spawn_enemy(&AssetId::from("EnemyData:Grunt"), &mut events));
    assert_eq!(
        manager.services.bundle_requests(),
        &[(AssetId::from("EnemyData:Grunt"), vec![AssetBundle::Spawn])]
    );
}

#[test]
fn spawning_needs_spawn_points() {
    let mut manager = manager();
    let mut events = Vec::new();
    manager.layout.enemy_spawns.clear();
    assert!(!manager.spawn_enemy(&AssetId::from("EnemyData:Grunt"), &mut events));
    assert!(!manager.enemy_spawn_in_flight);
    assert!(events.is_empty());
}

#[test]
fn empty_wave_is_skipped_into_the_next() {
    let mut manager = manager();
    let mut events = Vec::new();
    manager.waves = WaveQueue::from_specs(&[
        wave(SpawnMode::OnOneAnchorFree, &[]),
        wave(SpawnMode::OnTwoAnchorsFree, &["EnemyData:A", "EnemyData:B"]),
    ]);
    manager.create_next_wave(&mut events);

    let queued: Vec<&str> = manager.waves.spawn_queue().map(AssetId::as_str).collect();
    assert_eq!(queued, ["EnemyData:A", "EnemyData:B"]);
    assert!(events.contains(&CombatEvent::WaveStarted {
        number: 2,
        enemies: 2,
        spawn_delay: Micros::ZERO
    }));
}

#[test]
fn invalid_ids_are_reported_when_the_wave_starts() {
    let mut manager = manager();
    let mut events = Vec::new();
    manager.waves = WaveQueue::from_specs(&[wave(SpawnMode::OnOneAnchorFree, &["Broken", "EnemyData:Grunt"])]);
    manager.create_next_wave(&mut events);

    assert!(events.contains(&CombatEvent::SpawnSkipped {
        asset: AssetId::from("Broken")
    }));
    assert_eq!(manager.waves.spawn_queue_len(), 1);
    assert!(manager.try_spawn_enemy(&mut events));
    assert_eq!(manager.waves.spawn_queue_len(), 0);
}

#[test]
fn all_free_gate_needs_three_free_on_a_four_anchor_line() {
    let mut manager = manager();
    let mut events = Vec::new();
    manager.layout.enemy_anchor_offsets.push(Vec3::new(520.0, 0.0, 0.0));
    manager.place_anchors();
    assert_eq!(manager.enemy_line.len(), 4);
    manager.waves = WaveQueue::from_specs(&[wave(SpawnMode::OnAllAnchorsFree, &["EnemyData:Grunt"])]);
    manager.create_next_wave(&mut events);

    let front = manager.enemy_line[0];
    let at = location(&manager, front);
    let blocker = add_character(&mut manager, Role::Enemy, at);
    manager.set_new_owner(front, Some(blocker), &mut events);
    assert_eq!(manager.anchors[front].state(), AnchorState::Occupied);
    assert!(manager.try_spawn_enemy(&mut events), "3 free of 4 is enough");
}

#[test]
fn all_free_gate_stays_shut_on_a_two_anchor_line() {
    let mut manager = manager();
    let mut events = Vec::new();
    manager.layout.enemy_anchor_offsets.truncate(2);
    manager.place_anchors();
    assert_eq!(manager.enemy_line.len(), 2);
    manager.waves = WaveQueue::from_specs(&[wave(SpawnMode::OnAllAnchorsFree, &["EnemyData:Grunt"])]);
    manager.create_next_wave(&mut events);

    assert!(!manager.try_spawn_enemy(&mut events));
    assert_eq!(manager.waves.spawn_queue_len(), 1);
    assert!(!manager.enemy_spawn_in_flight);
}

#[test]
fn failed_load_clears_in_flight() {
    let mut manager = manager();
    let mut events = Vec::new();
    manager.services.fail_asset(AssetId::from("EnemyData:Grunt"));
    manager.spawn_enemy(&AssetId::from("EnemyData:Grunt"), &mut events);
    manager.resolve_loads(&mut events);

    assert!(!manager.enemy_spawn_in_flight);
    assert!(manager.enemies_in_scene.is_empty());
    assert!(events.contains(&CombatEvent::SpawnFailed {
        asset: AssetId::from("EnemyData:Grunt"),
        role: Role::Enemy,
        reason: SpawnFailure::LoadFailed,
    }));
}

#[test]
fn active_ends_once_no_enemy_is_alive() {
    let mut manager = manager();
    let mut events = Vec::new();
    manager.phase.set(CombatPhase::Active, &mut events);
    let hero = add_character(&mut manager, Role::PlayerHero, Vec3::new(-150.0, 0.0, 99.0));
    let enemy = add_character(&mut manager, Role::Enemy, Vec3::new(900.0, 0.0, 100.0));

    manager.create_next_wave(&mut events);
    assert_eq!(manager.phase(), CombatPhase::Active);

    manager.characters[enemy].health.apply_delta(-1000.0);
    manager.create_next_wave(&mut events);
    assert_eq!(manager.phase(), CombatPhase::Ending);
    assert!(events.contains(&CombatEvent::StageAdvanced {
        stage: Some(AssetId::from("CombatData:Bridge"))
    }));
    let pending = manager.camera.pending(CameraWork::Move).unwrap();
    assert_eq!(pending.follow_up, CameraFollowUp::FinishEnding);
    assert_eq!(
        manager.services.camera_log().last(),
        Some(&CameraCommand::Blend {
            target: CameraTarget::Character(hero),
            duration: manager.layout.outro_blend(),
        })
    );
}

#[test]
fn ending_without_outro_closes_after_the_blend() {
    let mut manager = manager();
    let mut events = Vec::new();
    manager.phase.set(CombatPhase::Active, &mut events);
    add_character(&mut manager, Role::PlayerHero, Vec3::new(-150.0, 0.0, 99.0));
    manager.create_next_wave(&mut events);
    assert_eq!(manager.phase(), CombatPhase::Ending);

    for _ in 0..(60 * 2) {
        manager.tick(DT, &mut events);
    }
    assert!(events.contains(&CombatEvent::PhaseEnded {
        phase: CombatPhase::Ending
    }));
    assert_eq!(manager.phase(), CombatPhase::Ended);
    assert!(manager.is_finished());
    assert!(!manager.was_aborted());
}

#[test]
fn outro_shorter_than_the_blend_still_announces_ending() {
    let mut manager = manager();
    let mut events = Vec::new();
    manager.layout.outro_blend_time = 2.0;
    manager.combat = Some(CombatData {
        id: AssetId::from("CombatData:Short"),
        outro_traversal: Some(AssetId::new("Ability", "OutroLeap")),
        ..CombatData::default()
    });
    manager.phase.set(CombatPhase::Active, &mut events);
    add_character(&mut manager, Role::PlayerHero, Vec3::new(-150.0, 0.0, 99.0));
    manager.create_next_wave(&mut events);
    assert_eq!(manager.phase(), CombatPhase::Ending);
    assert!(manager.milestones.outro_active);

    // The outro (1 s) lands first; the encounter waits for the blend.
    for _ in 0..90 {
        manager.services.advance(DT);
        manager.tick(DT, &mut events);
    }
    assert!(!manager.milestones.outro_active);
    assert_eq!(manager.phase(), CombatPhase::Ending);

    for _ in 0..(60 * 3) {
        manager.services.advance(DT);
        manager.tick(DT, &mut events);
    }
    let ending_ended = events
        .iter()
        .position(|e| *e == CombatEvent::PhaseEnded { phase: CombatPhase::Ending })
        .expect("Ending announced");
    let entered_ended = events
        .iter()
        .position(|e| matches!(e, CombatEvent::PhaseChanged { to: CombatPhase::Ended, .. }))
        .expect("Ended entered");
    assert!(ending_ended < entered_ended);
    assert!(manager.is_finished());
    assert!(!manager.was_aborted());
}

#[test]
fn ending_with_no_hero_ends_immediately() {
    let mut manager = manager();
    let mut events = Vec::new();
    manager.phase.set(CombatPhase::Active, &mut events);
    manager.create_next_wave(&mut events);
    assert_eq!(manager.phase(), CombatPhase::Ended);
}

#[test]
fn end_combat_twice_resolves_each_fade_once() {
    let mut manager = manager();
    let mut events = Vec::new();
    manager.end_combat(&mut events);
    manager.end_combat(&mut events);
    assert_eq!(manager.phase(), CombatPhase::Ended);

    for _ in 0..(60 * 2) {
        manager.tick(DT, &mut events);
    }

    let fades: Vec<bool> = events
        .iter()
        .filter_map(|e| match e {
            CombatEvent::CameraFinished {
                work: CameraWork::Fade,
                completed,
                ..
            } => Some(*completed),
            _ => None,
        })
        .collect();
    assert_eq!(fades, vec![false, true]);

    let ended_changes = events
        .iter()
        .filter(|e| matches!(e, CombatEvent::PhaseChanged { to: CombatPhase::Ended, .. }))
        .count();
    assert_eq!(ended_changes, 1);
    let announced = events
        .iter()
        .filter(|e| matches!(e, CombatEvent::PhaseEnded { phase: CombatPhase::Ended }))
        .count();
    assert_eq!(announced, 1);
    assert_eq!(manager.phase(), CombatPhase::Ended);
    assert!(manager.is_finished());
    assert!(manager.was_aborted());
}

#[test]
fn new_camera_move_fails_the_pending_one_first() {
    let mut manager = manager();
    let mut events = Vec::new();
    let target = CameraTarget::Point(Vec3::ZERO);
    manager.move_camera_command(target, Micros::from_secs(1), CameraFollowUp::Token(1), &mut events);
    manager.move_camera_command(target, Micros::from_secs(1), CameraFollowUp::Token(2), &mut events);

    assert_eq!(
        events,
        vec![CombatEvent::CameraFinished {
            work: CameraWork::Move,
            follow_up: CameraFollowUp::Token(1),
            completed: false,
        }]
    );
    assert_eq!(
        manager.camera.pending(CameraWork::Move).map(|p| p.follow_up),
        Some(CameraFollowUp::Token(2))
    );

    events.clear();
    for _ in 0..61 {
        manager.tick(DT, &mut events);
    }
    let resolved: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, CombatEvent::CameraFinished { .. }))
        .collect();
    assert_eq!(
        resolved,
        vec![&CombatEvent::CameraFinished {
            work: CameraWork::Move,
            follow_up: CameraFollowUp::Token(2),
            completed: true,
        }]
    );
}

#[test]
fn begin_combat_blends_into_active() {
    let mut manager = manager();
    let mut events = Vec::new();
    // A living enemy keeps Active from closing on the same tick.
    add_character(&mut manager, Role::Enemy, Vec3::new(2000.0, 0.0, 100.0));
    assert!(manager.begin_combat(&mut events));
    assert_eq!(manager.phase(), CombatPhase::Beginning);
    assert!(!manager.begin_combat(&mut events));

    for _ in 0..31 {
        manager.tick(DT, &mut events);
    }
    assert_eq!(manager.phase(), CombatPhase::Active);
    assert!(events.contains(&CombatEvent::PhaseEnded {
        phase: CombatPhase::Beginning
    }));
}

#[test]
fn passive_pauses_the_spawn_gate() {
    let mut manager = manager();
    let mut events = Vec::new();
    manager.phase.set(CombatPhase::Active, &mut events);
    manager.waves = WaveQueue::from_specs(&[wave(SpawnMode::OnOneAnchorFree, &["EnemyData:Grunt"])]);
    manager.create_next_wave(&mut events);
    add_character(&mut manager, Role::Enemy, Vec3::new(2000.0, 0.0, 100.0));

    assert!(manager.enter_passive(&mut events));
    manager.tick(DT, &mut events);
    assert_eq!(manager.waves.spawn_queue_len(), 1);
    assert!(!manager.enemy_spawn_in_flight);

    assert!(manager.exit_passive(&mut events));
    assert_eq!(manager.phase(), CombatPhase::Active);
    manager.tick(DT, &mut events);
    assert_eq!(manager.waves.spawn_queue_len(), 0);
    assert!(manager.enemy_spawn_in_flight);
}

#[test]
fn init_requires_spawn_points() {
    let mut manager = manager();
    let mut events = Vec::new();
    manager.layout.hero_spawns.clear();
    assert!(!manager.init_combat(CombatData::default(), &mut events));
    assert!(manager.combat.is_none());
    assert!(events.is_empty());
}

#[test]
fn init_replaces_previous_characters() {
    let mut manager = manager();
    let mut events = Vec::new();
    let old_hero = add_character(&mut manager, Role::PlayerHero, Vec3::ZERO);
    let old_enemy = add_character(&mut manager, Role::Enemy, Vec3::ZERO);
    manager.phase.set(CombatPhase::Ended, &mut events);

    assert!(manager.init_combat(
        CombatData {
            id: AssetId::from("CombatData:Retry"),
            waves: vec![wave(SpawnMode::OnOneAnchorFree, &["EnemyData:Grunt"])],
            ..CombatData::default()
        },
        &mut events
    ));
    assert_eq!(manager.phase(), CombatPhase::Opening);
    assert!(!manager.characters.contains_key(old_hero));
    assert!(!manager.characters.contains_key(old_enemy));
    assert!(manager.heroes_in_scene.is_empty());
    assert_eq!(manager.waves.waves_remaining(), 1);
    assert!(events.contains(&CombatEvent::SpawnRequested {
        asset: AssetId::from("HeroData:Kibaru"),
        role: Role::PlayerHero,
    }));
}

#[test]
fn player_without_intro_runs_to_the_front_anchor() {
    let mut manager = manager();
    let mut events = Vec::new();
    manager.init_combat(
        CombatData {
            id: AssetId::from("CombatData:Plain"),
            ..CombatData::default()
        },
        &mut events,
    );
    manager.tick(DT, &mut events);

    let hero = manager.heroes_in_scene[0];
    assert!(events.contains(&CombatEvent::PlayerSpawned { character: hero }));
    assert_eq!(manager.characters[hero].moving, MoveKind::Run);
    assert_eq!(manager.characters[hero].speed, 450.0);
    assert_eq!(manager.owner(manager.hero_line[0]), Some(hero));
}

#[test]
fn dead_characters_are_not_damaged_again() {
    let mut manager = manager();
    let mut events = Vec::new();
    let enemy = add_character(&mut manager, Role::Enemy, Vec3::ZERO);
    assert!(manager.apply_damage(enemy, 50.0, &mut events).unwrap().died);
    assert!(manager.apply_damage(enemy, 50.0, &mut events).is_none());
    let deaths = events
        .iter()
        .filter(|e| matches!(e, CombatEvent::CharacterDied { .. }))
        .count();
    assert_eq!(deaths, 1);
}

#[test]
fn teleport_signals_arrival_immediately() {
    let mut manager = manager();
    let mut events = Vec::new();
    let anchor = manager.hero_line[1];
    let ally = add_character(&mut manager, Role::AllyHero, Vec3::new(-700.0, -150.0, 100.0));
    manager.set_new_owner(anchor, Some(ally), &mut events);

    assert!(manager.try_move_to_anchor(ally, MoveKind::Teleport, &mut events));
    assert!(events.contains(&CombatEvent::CharacterReachedAnchor {
        character: ally,
        kind: MoveKind::Teleport
    }));
    manager.update_anchor(anchor, &mut events);
    assert_eq!(manager.anchors[anchor].state(), AnchorState::Occupied);
}
