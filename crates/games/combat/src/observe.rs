use serde::Serialize;
use sim_core::Tick;
use slotmap::Key;

use crate::anchor::{AnchorId, AnchorLine, AnchorState};
use crate::camera::{CameraFollowUp, CameraWork};
use crate::character::{CharacterId, MoveKind, Role};
use crate::config::SpawnMode;
use crate::geometry::Vec3;
use crate::manager::CombatManager;
use crate::phase::CombatPhase;
use crate::services::Services;

pub fn character_id_to_string(id: CharacterId) -> String {
    id.data().as_ffi().to_string()
}

pub fn string_to_character_id(s: &str) -> Result<CharacterId, String> {
    let ffi: u64 = s.parse().map_err(|_| format!("Invalid character id: {}", s))?;
    Ok(CharacterId::from(slotmap::KeyData::from_ffi(ffi)))
}

pub fn anchor_id_to_string(id: AnchorId) -> String {
    id.data().as_ffi().to_string()
}

#[derive(Clone, Debug, Serialize)]
pub struct ObsAnchor {
    pub id: String,
    pub name: String,
    pub line: AnchorLine,
    pub state: AnchorState,
    pub occupant: Option<String>,
    pub location: Vec3,
}

#[derive(Clone, Debug, Serialize)]
pub struct ObsCharacter {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub health: f32,
    pub max_health: f32,
    pub anchor: Option<String>,
    pub moving: MoveKind,
    pub position: Option<Vec3>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ObsWaves {
    pub waves_started: u32,
    pub waves_remaining: usize,
    pub spawn_mode: SpawnMode,
    pub has_begun_spawning: bool,
    pub spawn_queue: Vec<String>,
    pub spawn_timer_secs: f32,
    pub spawn_in_flight: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct ObsCamera {
    pub work: CameraWork,
    pub follow_up: CameraFollowUp,
    pub remaining_secs: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct CombatObservation {
    pub tick: Tick,
    pub phase: CombatPhase,
    pub combat: Option<String>,
    pub hero_anchors: Vec<ObsAnchor>,
    pub enemy_anchors: Vec<ObsAnchor>,
    pub waves: ObsWaves,
    pub heroes: Vec<ObsCharacter>,
    pub enemies: Vec<ObsCharacter>,
    pub camera: Vec<ObsCamera>,
    pub stage: Option<String>,
}

pub fn build_observation<S: Services>(manager: &CombatManager<S>, tick: Tick) -> CombatObservation {
    let anchors = |line: &[AnchorId]| -> Vec<ObsAnchor> {
        line.iter()
            .filter_map(|id| manager.anchor(*id).map(|a| (*id, a)))
            .map(|(id, anchor)| ObsAnchor {
                id: anchor_id_to_string(id),
                name: anchor.name.clone(),
                line: anchor.line,
                state: anchor.state(),
                occupant: anchor.owner().map(character_id_to_string),
                location: anchor.location(),
            })
            .collect()
    };
    let characters = |ids: &[CharacterId]| -> Vec<ObsCharacter> {
        ids.iter()
            .filter_map(|id| manager.character(*id).map(|c| (*id, c)))
            .map(|(id, c)| ObsCharacter {
                id: character_id_to_string(id),
                name: c.def.name.clone(),
                role: c.role,
                health: c.health.current(),
                max_health: c.health.max(),
                anchor: c.anchor.map(anchor_id_to_string),
                moving: c.moving,
                position: manager.services().position(id),
            })
            .collect()
    };

    let waves = manager.waves();
    let camera = [CameraWork::Move, CameraWork::Fade]
        .into_iter()
        .filter_map(|work| {
            manager.camera().pending(work).map(|p| ObsCamera {
                work,
                follow_up: p.follow_up,
                remaining_secs: p.remaining.as_secs_f32(),
            })
        })
        .collect();

    CombatObservation {
        tick,
        phase: manager.phase(),
        combat: manager.combat().map(|c| c.id.to_string()),
        hero_anchors: anchors(manager.hero_anchors()),
        enemy_anchors: anchors(manager.enemy_anchors()),
        waves: ObsWaves {
            waves_started: waves.waves_started(),
            waves_remaining: waves.waves_remaining(),
            spawn_mode: waves.spawn_mode(),
            has_begun_spawning: waves.has_begun_spawning(),
            spawn_queue: waves.spawn_queue().map(|id| id.to_string()).collect(),
            spawn_timer_secs: waves.timer_remaining().as_secs_f32(),
            spawn_in_flight: manager.enemy_spawn_in_flight(),
        },
        heroes: characters(manager.heroes_in_scene()),
        enemies: characters(manager.enemies_in_scene()),
        camera,
        stage: manager.services().current_stage_id().map(|s| s.to_string()),
    }
}
