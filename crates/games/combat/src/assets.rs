//! Asset identifiers and the character/ability definitions they resolve to.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Easing;

/// Primary asset id in `Kind:Name` form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(kind: &str, name: &str) -> Self {
        Self(format!("{kind}:{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Valid iff both the kind and the name are non-empty.
    pub fn is_valid(&self) -> bool {
        matches!(self.0.split_once(':'), Some((kind, name)) if !kind.is_empty() && !name.is_empty())
    }

    pub fn kind(&self) -> Option<&str> {
        self.0.split_once(':').map(|(kind, _)| kind)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.split_once(':').map(|(_, name)| name)
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for AssetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Loadable slices of a character's assets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetBundle {
    Infos,
    #[serde(rename = "UI")]
    Ui,
    Spawn,
    Accessories,
}

impl AssetBundle {
    pub const ALL: [AssetBundle; 4] = [
        AssetBundle::Infos,
        AssetBundle::Ui,
        AssetBundle::Spawn,
        AssetBundle::Accessories,
    ];

    pub const fn flag(self) -> u8 {
        match self {
            AssetBundle::Infos => 1 << 0,
            AssetBundle::Ui => 1 << 1,
            AssetBundle::Spawn => 1 << 2,
            AssetBundle::Accessories => 1 << 3,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            AssetBundle::Infos => "Infos",
            AssetBundle::Ui => "UI",
            AssetBundle::Spawn => "Spawn",
            AssetBundle::Accessories => "Accessories",
        }
    }
}

/// Expand a bundle bitmask into bundle values, in declaration order.
pub fn bundles_from_flags(flags: u8) -> Vec<AssetBundle> {
    AssetBundle::ALL
        .into_iter()
        .filter(|bundle| flags & bundle.flag() != 0)
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundSpeeds {
    pub walk: f32,
    pub run: f32,
    pub sprint: f32,
}

impl Default for GroundSpeeds {
    fn default() -> Self {
        Self {
            walk: 250.0,
            run: 450.0,
            sprint: 600.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterStats {
    pub max_health: f32,
    pub on_ground_speeds: GroundSpeeds,
    /// Seconds a dash toward the anchor takes.
    pub dash_time: f32,
    pub dash_easing: Easing,
}

impl Default for CharacterStats {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            on_ground_speeds: GroundSpeeds::default(),
            dash_time: 1.35,
            dash_easing: Easing::InOutExpo,
        }
    }
}

/// What a character asset resolves to once loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterDef {
    pub id: AssetId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stats: CharacterStats,
}

impl CharacterDef {
    pub fn new(id: impl Into<AssetId>, max_health: f32) -> Self {
        let id = id.into();
        Self {
            name: id.name().unwrap_or_default().to_owned(),
            id,
            stats: CharacterStats {
                max_health,
                ..CharacterStats::default()
            },
        }
    }
}

/// A grantable ability, such as a traversal in or out of the encounter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbilityDef {
    pub id: AssetId,
    /// Seconds the activation runs before it reports finished.
    #[serde(default)]
    pub duration: f32,
    /// Already in memory; otherwise it is loaded on first use.
    #[serde(default)]
    pub resident: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_id_validity() {
        assert!(AssetId::new("EnemyData", "Grunt").is_valid());
        assert!(!AssetId::from("EnemyData:").is_valid());
        assert!(!AssetId::from(":Grunt").is_valid());
        assert!(!AssetId::from("Grunt").is_valid());
        assert!(!AssetId::default().is_valid());

        let id = AssetId::from("HeroData:Kibaru");
        assert_eq!(id.kind(), Some("HeroData"));
        assert_eq!(id.name(), Some("Kibaru"));
    }

    #[test]
    fn bundle_flags_expand_in_order() {
        let flags = AssetBundle::Spawn.flag() | AssetBundle::Infos.flag();
        assert_eq!(
            bundles_from_flags(flags),
            vec![AssetBundle::Infos, AssetBundle::Spawn]
        );
        assert!(bundles_from_flags(0).is_empty());
        assert_eq!(bundles_from_flags(0xff).len(), 4);
    }

    #[test]
    fn character_def_takes_name_from_id() {
        let def = CharacterDef::new("EnemyData:Brute", 90.0);
        assert_eq!(def.name, "Brute");
        assert_eq!(def.stats.max_health, 90.0);
        assert_eq!(def.stats.on_ground_speeds.run, 450.0);
    }
}
