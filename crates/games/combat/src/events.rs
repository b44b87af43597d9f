use sim_core::Micros;

use crate::anchor::{AnchorId, AnchorLine, AnchorState};
use crate::assets::AssetId;
use crate::camera::{CameraFollowUp, CameraWork};
use crate::character::{CharacterId, MoveKind, Role};
use crate::phase::CombatPhase;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnFailure {
    /// The load finished without a definition.
    LoadFailed,
    /// The spawner refused to place the actor.
    Rejected,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CombatEvent {
    PhaseChanged {
        from: CombatPhase,
        to: CombatPhase,
    },
    /// A phase finished its work: Opening when the enemy line first fills,
    /// Beginning and Ending when their camera blends land, Ended after the fade.
    PhaseEnded {
        phase: CombatPhase,
    },
    AnchorStateChanged {
        anchor: AnchorId,
        line: AnchorLine,
        index: usize,
        from: AnchorState,
        to: AnchorState,
    },
    AnchorAssigned {
        character: CharacterId,
        anchor: AnchorId,
        previous: Option<AnchorId>,
    },
    CharacterReachedAnchor {
        character: CharacterId,
        kind: MoveKind,
    },
    CharacterLeftAnchor {
        character: CharacterId,
        anchor: AnchorId,
    },
    WaveStarted {
        number: u32,
        enemies: usize,
        spawn_delay: Micros,
    },
    SpawnRequested {
        asset: AssetId,
        role: Role,
    },
    SpawnSkipped {
        asset: AssetId,
    },
    SpawnFailed {
        asset: AssetId,
        role: Role,
        reason: SpawnFailure,
    },
    CharacterSpawned {
        character: CharacterId,
        asset: AssetId,
        role: Role,
    },
    PlayerSpawned {
        character: CharacterId,
    },
    HealthChanged {
        character: CharacterId,
        delta: f32,
        new_value: f32,
        hit_limit: bool,
    },
    CharacterDied {
        character: CharacterId,
    },
    CharacterDestroyed {
        character: CharacterId,
        role: Role,
    },
    AbilityActivated {
        character: CharacterId,
        ability: AssetId,
    },
    CameraFinished {
        work: CameraWork,
        follow_up: CameraFollowUp,
        completed: bool,
    },
    StageAdvanced {
        stage: Option<AssetId>,
    },
}
