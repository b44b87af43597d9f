//! Contracts for the collaborators the encounter drives but does not own.

use sim_core::Micros;

use crate::anchor::TriggerVolume;
use crate::assets::{AbilityDef, AssetBundle, AssetId, CharacterDef};
use crate::camera::{CameraTarget, ScreenFade};
use crate::character::CharacterId;
use crate::geometry::{Transform, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbilityHandle(pub u64);

#[derive(Clone, Debug, PartialEq)]
pub enum LoadPoll {
    Pending,
    /// Finished; `None` when the asset could not be resolved.
    Ready(Option<CharacterDef>),
}

pub trait AssetLoader {
    fn request_load(&mut self, id: &AssetId, bundles: &[AssetBundle]) -> LoadHandle;
    fn poll_load(&mut self, handle: LoadHandle) -> LoadPoll;
}

pub trait ActorSpawner {
    fn spawn_character(&mut self, id: CharacterId, def: &CharacterDef, at: Transform) -> bool;
    fn destroy_character(&mut self, id: CharacterId);
}

pub trait MovementDriver {
    fn position(&self, id: CharacterId) -> Option<Vec3>;
    /// Path toward `target` at `speed` units per second.
    fn walk_to(&mut self, id: CharacterId, target: Vec3, speed: f32) -> bool;
    fn set_position(&mut self, id: CharacterId, at: Vec3);
}

pub trait OverlapProbe {
    fn overlaps(&self, id: CharacterId, volume: &TriggerVolume) -> bool;
    /// Trace straight down from `from`; returns the ground hit within `distance`.
    fn trace_ground(&self, from: Vec3, distance: f32) -> Option<Vec3>;
}

pub trait CameraController {
    fn blend_view_to(&mut self, target: CameraTarget, duration: Micros);
    fn fade_screen(&mut self, fade: ScreenFade);
}

pub trait StageRegistry {
    fn current_stage_id(&self) -> Option<AssetId>;
    fn advance_stage(&mut self, delta: i32) -> bool;
    fn is_final_stage(&self) -> bool;
}

pub trait AbilitySystem {
    fn resident_ability(&self, id: &AssetId) -> Option<AbilityDef>;
    fn load_ability_blocking(&mut self, id: &AssetId) -> Option<AbilityDef>;
    fn give_and_activate_once(&mut self, owner: CharacterId, ability: &AbilityDef) -> Option<AbilityHandle>;
    fn drain_finished_abilities(&mut self) -> Vec<AbilityHandle>;
}

/// Everything the combat manager needs from its world.
pub trait Services:
    AssetLoader + ActorSpawner + MovementDriver + OverlapProbe + CameraController + StageRegistry + AbilitySystem
{
}

impl<T> Services for T where
    T: AssetLoader + ActorSpawner + MovementDriver + OverlapProbe + CameraController + StageRegistry + AbilitySystem
{
}
