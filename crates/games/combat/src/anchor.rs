use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::character::CharacterId;
use crate::geometry::Vec3;

new_key_type! {
    pub struct AnchorId;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnchorState {
    #[default]
    Free,
    /// Owned, occupant not yet inside the volume.
    Reserved,
    Occupied,
}

impl AnchorState {
    pub fn resolve(has_occupant: bool, overlapping: bool) -> Self {
        match (has_occupant, overlapping) {
            (false, _) => AnchorState::Free,
            (true, false) => AnchorState::Reserved,
            (true, true) => AnchorState::Occupied,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnchorLine {
    Hero,
    Enemy,
}

/// Axis-aligned box trigger.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggerVolume {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl TriggerVolume {
    pub fn contains(&self, point: Vec3) -> bool {
        let d = point - self.center;
        d.x.abs() <= self.half_extents.x
            && d.y.abs() <= self.half_extents.y
            && d.z.abs() <= self.half_extents.z
    }
}

#[derive(Clone, Debug)]
pub struct Anchor {
    pub name: String,
    pub line: AnchorLine,
    pub index: usize,
    pub(crate) state: AnchorState,
    pub(crate) occupant: Option<CharacterId>,
    pub(crate) successor: Option<AnchorId>,
    pub(crate) volume: TriggerVolume,
}

impl Anchor {
    pub fn new(
        line: AnchorLine,
        index: usize,
        location: Vec3,
        half_extents: Vec3,
        successor: Option<AnchorId>,
    ) -> Self {
        let prefix = match line {
            AnchorLine::Hero => "HeroAnchor",
            AnchorLine::Enemy => "EnemyAnchor",
        };
        Self {
            name: format!("{prefix}_{}", index + 1),
            line,
            index,
            state: AnchorState::Free,
            occupant: None,
            successor,
            volume: TriggerVolume {
                center: location,
                half_extents,
            },
        }
    }

    pub fn state(&self) -> AnchorState {
        self.state
    }

    pub fn owner(&self) -> Option<CharacterId> {
        self.occupant
    }

    pub fn successor(&self) -> Option<AnchorId> {
        self.successor
    }

    pub fn location(&self) -> Vec3 {
        self.volume.center
    }

    pub fn volume(&self) -> &TriggerVolume {
        &self.volume
    }

    pub fn set_location(&mut self, location: Vec3) {
        self.volume.center = location;
    }
}
