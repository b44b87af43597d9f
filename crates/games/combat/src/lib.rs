//! Wave-based combat encounter: anchor slots, enemy waves, a combat phase
//! machine and camera follow-ups, advanced one fixed tick at a time.

pub mod actions;
pub mod anchor;
mod anchoring;
pub mod assets;
pub mod camera;
pub mod character;
pub mod config;
pub mod events;
pub mod game;
pub mod geometry;
pub mod manager;
mod motion;
pub mod observe;
pub mod phase;
pub mod sandbox;
pub mod services;
pub mod spawning;
pub mod stages;
pub mod waves;

#[cfg(test)]
mod tests;

pub use actions::CombatAction;
pub use anchor::{Anchor, AnchorId, AnchorLine, AnchorState};
pub use assets::{AbilityDef, AssetBundle, AssetId, CharacterDef};
pub use camera::{CameraFollowUp, CameraTarget, CameraWork};
pub use character::{Character, CharacterId, MoveKind, Role};
pub use config::{CombatData, ConfigError, EncounterConfig, EncounterLayout, HeroRoster, SpawnMode, WaveSpec};
pub use events::CombatEvent;
pub use game::CombatGame;
pub use manager::CombatManager;
pub use observe::CombatObservation;
pub use phase::CombatPhase;
pub use sandbox::SandboxWorld;
pub use services::Services;
