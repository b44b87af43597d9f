//! In-process world that implements every collaborator deterministically.
//!
//! Loads resolve from a catalog after a fixed latency, characters walk in
//! straight lines, the ground is a flat plane and camera commands are
//! recorded rather than rendered.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use sim_core::Micros;
use slotmap::SecondaryMap;

use crate::anchor::TriggerVolume;
use crate::assets::{AbilityDef, AssetBundle, AssetId, CharacterDef};
use crate::camera::{CameraTarget, ScreenFade};
use crate::character::CharacterId;
use crate::config::StageList;
use crate::geometry::{Transform, Vec3};
use crate::services::{
    AbilityHandle, AbilitySystem, ActorSpawner, AssetLoader, CameraController, LoadHandle, LoadPoll, MovementDriver,
    OverlapProbe, StageRegistry,
};
use crate::stages::LevelStages;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Seconds between a load request and its completion.
    pub load_latency: f32,
    pub ground_height: f32,
    pub characters: Vec<CharacterDef>,
    pub abilities: Vec<AbilityDef>,
    /// Assets whose loads finish without a definition.
    pub failing_assets: Vec<AssetId>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    pub position: Vec3,
    pub yaw_deg: f32,
    walk: Option<(Vec3, f32)>,
}

impl Body {
    pub fn is_walking(&self) -> bool {
        self.walk.is_some()
    }
}

#[derive(Clone, Debug)]
struct SandboxLoad {
    asset: AssetId,
    remaining: Micros,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraCommand {
    Blend { target: CameraTarget, duration: Micros },
    Fade(ScreenFade),
}

#[derive(Clone, Debug)]
pub struct SandboxWorld {
    catalog: BTreeMap<AssetId, CharacterDef>,
    abilities: BTreeMap<AssetId, AbilityDef>,
    resident: HashSet<AssetId>,
    failing: HashSet<AssetId>,
    load_latency: Micros,
    ground_height: f32,
    loads: BTreeMap<LoadHandle, SandboxLoad>,
    next_load: u64,
    bodies: SecondaryMap<CharacterId, Body>,
    running: BTreeMap<AbilityHandle, Micros>,
    finished: Vec<AbilityHandle>,
    next_ability: u64,
    stages: LevelStages,
    camera_log: Vec<CameraCommand>,
    bundle_requests: Vec<(AssetId, Vec<AssetBundle>)>,
    reject_spawns: bool,
}

impl SandboxWorld {
    pub fn new(config: &SandboxConfig, stages: &StageList) -> Self {
        Self {
            catalog: config.characters.iter().map(|c| (c.id.clone(), c.clone())).collect(),
            abilities: config.abilities.iter().map(|a| (a.id.clone(), a.clone())).collect(),
            resident: config.abilities.iter().filter(|a| a.resident).map(|a| a.id.clone()).collect(),
            failing: config.failing_assets.iter().cloned().collect(),
            load_latency: Micros::from_secs_f32(config.load_latency),
            ground_height: config.ground_height,
            loads: BTreeMap::new(),
            next_load: 0,
            bodies: SecondaryMap::new(),
            running: BTreeMap::new(),
            finished: Vec::new(),
            next_ability: 0,
            stages: LevelStages::new(stages),
            camera_log: Vec::new(),
            bundle_requests: Vec::new(),
            reject_spawns: false,
        }
    }

    /// Advance loads, walking and running abilities by `dt`.
    pub fn advance(&mut self, dt: Micros) {
        for load in self.loads.values_mut() {
            load.remaining = load.remaining.saturating_sub(dt);
        }

        let secs = dt.as_secs_f32();
        for (_, body) in self.bodies.iter_mut() {
            if let Some((target, speed)) = body.walk {
                let (position, arrived) = body.position.step_toward(target, speed * secs);
                body.position = position;
                if arrived {
                    body.walk = None;
                }
            }
        }

        let mut done = Vec::new();
        for (handle, remaining) in self.running.iter_mut() {
            *remaining = remaining.saturating_sub(dt);
            if remaining.is_zero() {
                done.push(*handle);
            }
        }
        for handle in done {
            self.running.remove(&handle);
            self.finished.push(handle);
        }
    }

    pub fn body(&self, id: CharacterId) -> Option<&Body> {
        self.bodies.get(id)
    }

    pub fn camera_log(&self) -> &[CameraCommand] {
        &self.camera_log
    }

    pub fn bundle_requests(&self) -> &[(AssetId, Vec<AssetBundle>)] {
        &self.bundle_requests
    }

    pub fn stages(&self) -> &LevelStages {
        &self.stages
    }

    pub fn stages_mut(&mut self) -> &mut LevelStages {
        &mut self.stages
    }

    pub fn fail_asset(&mut self, id: AssetId) {
        self.failing.insert(id);
    }

    pub fn set_load_latency(&mut self, latency: Micros) {
        self.load_latency = latency;
    }

    pub fn set_reject_spawns(&mut self, reject: bool) {
        self.reject_spawns = reject;
    }

    pub fn add_character(&mut self, def: CharacterDef) {
        self.catalog.insert(def.id.clone(), def);
    }
}

impl AssetLoader for SandboxWorld {
    fn request_load(&mut self, id: &AssetId, bundles: &[AssetBundle]) -> LoadHandle {
        self.next_load += 1;
        let handle = LoadHandle(self.next_load);
        self.bundle_requests.push((id.clone(), bundles.to_vec()));
        self.loads.insert(
            handle,
            SandboxLoad {
                asset: id.clone(),
                remaining: self.load_latency,
            },
        );
        handle
    }

    fn poll_load(&mut self, handle: LoadHandle) -> LoadPoll {
        match self.loads.get(&handle) {
            None => LoadPoll::Ready(None),
            Some(load) if !load.remaining.is_zero() => LoadPoll::Pending,
            Some(_) => {
                let Some(load) = self.loads.remove(&handle) else {
                    return LoadPoll::Ready(None);
                };
                if self.failing.contains(&load.asset) {
                    return LoadPoll::Ready(None);
                }
                LoadPoll::Ready(self.catalog.get(&load.asset).cloned())
            }
        }
    }
}

impl ActorSpawner for SandboxWorld {
    fn spawn_character(&mut self, id: CharacterId, _def: &CharacterDef, at: Transform) -> bool {
        if self.reject_spawns {
            return false;
        }
        self.bodies.insert(
            id,
            Body {
                position: at.location,
                yaw_deg: at.yaw_deg,
                walk: None,
            },
        );
        true
    }

    fn destroy_character(&mut self, id: CharacterId) {
        self.bodies.remove(id);
    }
}

impl MovementDriver for SandboxWorld {
    fn position(&self, id: CharacterId) -> Option<Vec3> {
        self.bodies.get(id).map(|b| b.position)
    }

    fn walk_to(&mut self, id: CharacterId, target: Vec3, speed: f32) -> bool {
        let Some(body) = self.bodies.get_mut(id) else {
            return false;
        };
        body.walk = Some((target, speed.max(0.0)));
        true
    }

    fn set_position(&mut self, id: CharacterId, at: Vec3) {
        if let Some(body) = self.bodies.get_mut(id) {
            body.position = at;
            body.walk = None;
        }
    }
}

impl OverlapProbe for SandboxWorld {
    fn overlaps(&self, id: CharacterId, volume: &TriggerVolume) -> bool {
        self.bodies.get(id).is_some_and(|b| volume.contains(b.position))
    }

    fn trace_ground(&self, from: Vec3, distance: f32) -> Option<Vec3> {
        let depth = from.z - self.ground_height;
        (depth >= 0.0 && depth <= distance).then_some(Vec3::new(from.x, from.y, self.ground_height))
    }
}

impl CameraController for SandboxWorld {
    fn blend_view_to(&mut self, target: CameraTarget, duration: Micros) {
        self.camera_log.push(CameraCommand::Blend { target, duration });
    }

    fn fade_screen(&mut self, fade: ScreenFade) {
        self.camera_log.push(CameraCommand::Fade(fade));
    }
}

impl StageRegistry for SandboxWorld {
    fn current_stage_id(&self) -> Option<AssetId> {
        self.stages.current_stage().cloned()
    }

    fn advance_stage(&mut self, delta: i32) -> bool {
        self.stages.move_to_stage(delta)
    }

    fn is_final_stage(&self) -> bool {
        self.stages.is_last_stage()
    }
}

impl AbilitySystem for SandboxWorld {
    fn resident_ability(&self, id: &AssetId) -> Option<AbilityDef> {
        if !self.resident.contains(id) {
            return None;
        }
        self.abilities.get(id).cloned()
    }

    fn load_ability_blocking(&mut self, id: &AssetId) -> Option<AbilityDef> {
        let ability = self.abilities.get(id).cloned()?;
        self.resident.insert(id.clone());
        Some(ability)
    }

    fn give_and_activate_once(&mut self, owner: CharacterId, ability: &AbilityDef) -> Option<AbilityHandle> {
        if !self.bodies.contains_key(owner) {
            return None;
        }
        self.next_ability += 1;
        let handle = AbilityHandle(self.next_ability);
        self.running.insert(handle, Micros::from_secs_f32(ability.duration));
        Some(handle)
    }

    fn drain_finished_abilities(&mut self) -> Vec<AbilityHandle> {
        std::mem::take(&mut self.finished)
    }
}
