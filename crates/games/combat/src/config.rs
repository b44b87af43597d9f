use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sim_core::Micros;

use crate::assets::{AbilityDef, AssetId, CharacterDef};
use crate::character::MoveKind;
use crate::geometry::{Transform, Vec3};
use crate::sandbox::SandboxConfig;

/// When a wave's spawn gate opens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnMode {
    #[default]
    None,
    OnAllAnchorsFree,
    OnTwoAnchorsFree,
    OnOneAnchorFree,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveSpec {
    pub spawn_mode: SpawnMode,
    /// Seconds between the wave starting and its first spawn.
    pub spawn_delay: f32,
    pub enemies: Vec<AssetId>,
}

/// One authored encounter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatData {
    pub id: AssetId,
    pub waves: Vec<WaveSpec>,
    pub intro_traversal: Option<AssetId>,
    pub outro_traversal: Option<AssetId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroRoster {
    pub player: AssetId,
    pub ally: Option<AssetId>,
}

/// Where the encounter sits and how its slots are laid out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterLayout {
    pub origin: Transform,
    pub hero_anchor_offsets: Vec<Vec3>,
    pub enemy_anchor_offsets: Vec<Vec3>,
    pub anchor_half_extents: Vec3,
    pub snap_distance: f32,
    pub snap_elevation: f32,
    pub hero_spawns: Vec<Transform>,
    pub enemy_spawns: Vec<Transform>,
    /// Seconds for the Beginning camera blend.
    pub camera_blend_time: f32,
    /// Seconds for the Ending camera blend to the surviving hero.
    pub outro_blend_time: f32,
    /// Seconds for the fade that closes the encounter.
    pub camera_fade_time: f32,
    pub enemy_advance: MoveKind,
    pub auto_init: bool,
}

impl EncounterLayout {
    pub fn camera_blend(&self) -> Micros {
        Micros::from_secs_f32(self.camera_blend_time)
    }

    pub fn outro_blend(&self) -> Micros {
        Micros::from_secs_f32(self.outro_blend_time)
    }

    pub fn camera_fade(&self) -> Micros {
        Micros::from_secs_f32(self.camera_fade_time)
    }
}

impl Default for EncounterLayout {
    fn default() -> Self {
        Self {
            origin: Transform::at(Vec3::new(0.0, 0.0, 100.0)),
            hero_anchor_offsets: vec![Vec3::new(-150.0, 0.0, 0.0), Vec3::new(-250.0, -125.0, 0.0)],
            enemy_anchor_offsets: vec![
                Vec3::new(150.0, 0.0, 0.0),
                Vec3::new(320.0, -175.0, 0.0),
                Vec3::new(420.0, 125.0, 0.0),
            ],
            anchor_half_extents: Vec3::new(32.0, 32.0, 100.0),
            snap_distance: 1000.0,
            snap_elevation: 99.0,
            hero_spawns: vec![
                Transform::at(Vec3::new(-700.0, 0.0, 0.0)),
                Transform::at(Vec3::new(-700.0, -150.0, 0.0)),
            ],
            enemy_spawns: vec![
                Transform {
                    location: Vec3::new(900.0, -200.0, 0.0),
                    yaw_deg: 180.0,
                },
                Transform {
                    location: Vec3::new(950.0, 0.0, 0.0),
                    yaw_deg: 170.0,
                },
                Transform {
                    location: Vec3::new(900.0, 200.0, 0.0),
                    yaw_deg: 190.0,
                },
            ],
            camera_blend_time: 0.5,
            outro_blend_time: 0.5,
            camera_fade_time: 1.0,
            enemy_advance: MoveKind::Run,
            auto_init: true,
        }
    }
}

/// Ordered combats of the level; the index points at the current one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageList {
    pub combats: Vec<AssetId>,
    pub start_index: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    pub tick_hz: u32,
    pub layout: EncounterLayout,
    pub combat: Option<CombatData>,
    pub heroes: HeroRoster,
    pub stages: StageList,
    pub sandbox: SandboxConfig,
}

impl EncounterConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_hz == 0 {
            return Err(ConfigError::Invalid {
                field: "tick_hz",
                reason: "must be positive".into(),
            });
        }
        if self.layout.snap_distance < 0.0 {
            return Err(ConfigError::Invalid {
                field: "layout.snap_distance",
                reason: "must not be negative".into(),
            });
        }
        if let Some(combat) = &self.combat {
            if let Some(wave) = combat.waves.iter().position(|w| !(w.spawn_delay >= 0.0)) {
                return Err(ConfigError::Invalid {
                    field: "combat.waves.spawn_delay",
                    reason: format!("wave {wave} has a negative or NaN delay"),
                });
            }
        }
        if !self.stages.combats.is_empty() && self.stages.start_index >= self.stages.combats.len() {
            return Err(ConfigError::Invalid {
                field: "stages.start_index",
                reason: format!("{} is past the last stage", self.stages.start_index),
            });
        }
        Ok(())
    }
}

impl Default for EncounterConfig {
    fn default() -> Self {
        let grunt = AssetId::new("EnemyData", "Grunt");
        let brute = AssetId::new("EnemyData", "Brute");
        let combat_id = AssetId::new("CombatData", "Courtyard");
        Self {
            tick_hz: 60,
            layout: EncounterLayout::default(),
            combat: Some(CombatData {
                id: combat_id.clone(),
                waves: vec![
                    WaveSpec {
                        spawn_mode: SpawnMode::OnAllAnchorsFree,
                        spawn_delay: 0.0,
                        enemies: vec![grunt.clone(), grunt.clone(), grunt.clone()],
                    },
                    WaveSpec {
                        spawn_mode: SpawnMode::OnTwoAnchorsFree,
                        spawn_delay: 1.5,
                        enemies: vec![grunt.clone(), brute.clone()],
                    },
                    WaveSpec {
                        spawn_mode: SpawnMode::OnOneAnchorFree,
                        spawn_delay: 0.5,
                        enemies: vec![brute.clone(), grunt.clone()],
                    },
                ],
                intro_traversal: Some(AssetId::new("Ability", "IntroLeap")),
                outro_traversal: Some(AssetId::new("Ability", "OutroLeap")),
            }),
            heroes: HeroRoster {
                player: AssetId::new("HeroData", "Kibaru"),
                ally: Some(AssetId::new("HeroData", "Combi")),
            },
            stages: StageList {
                combats: vec![combat_id, AssetId::new("CombatData", "Bridge")],
                start_index: 0,
            },
            sandbox: SandboxConfig {
                load_latency: 0.25,
                ground_height: 0.0,
                characters: vec![
                    CharacterDef::new("HeroData:Kibaru", 300.0),
                    CharacterDef::new("HeroData:Combi", 250.0),
                    CharacterDef::new(grunt, 40.0),
                    CharacterDef::new(brute, 90.0),
                ],
                abilities: vec![
                    AbilityDef {
                        id: AssetId::new("Ability", "IntroLeap"),
                        duration: 0.8,
                        resident: false,
                    },
                    AbilityDef {
                        id: AssetId::new("Ability", "OutroLeap"),
                        duration: 1.0,
                        resident: true,
                    },
                ],
                failing_assets: Vec::new(),
            },
        }
    }
}

/// Error when loading an encounter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// File could not be read.
    Io { path: String, reason: String },
    /// Not valid JSON for this schema.
    Parse(String),
    /// Parsed, but a value is out of range.
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, reason } => write!(f, "cannot read {path}: {reason}"),
            ConfigError::Parse(reason) => write!(f, "invalid config: {reason}"),
            ConfigError::Invalid { field, reason } => write!(f, "invalid {field}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}
