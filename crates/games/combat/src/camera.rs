use serde::Serialize;
use sim_core::Micros;

use crate::character::CharacterId;
use crate::geometry::Vec3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraTarget {
    /// View framing the whole encounter.
    EncounterArea,
    Character(CharacterId),
    Point(Vec3),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenFade {
    pub from_alpha: f32,
    pub to_alpha: f32,
    pub duration: Micros,
    pub color: Color,
    pub hold_when_finished: bool,
}

impl ScreenFade {
    pub fn to_solid(color: Color, duration: Micros) -> Self {
        Self {
            from_alpha: 0.0,
            to_alpha: 1.0,
            duration,
            color,
            hold_when_finished: true,
        }
    }
}

/// What the encounter does when a camera command settles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CameraFollowUp {
    /// Beginning blend done; enter Active.
    EnterActive,
    /// Ending blend done; close the encounter unless an outro is running.
    FinishEnding,
    /// Final fade done; the encounter is over.
    AnnounceEnded,
    /// Operator-issued command, reported back by token.
    Token(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CameraWork {
    Move,
    Fade,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingCamera {
    pub follow_up: CameraFollowUp,
    pub remaining: Micros,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CameraDone {
    pub work: CameraWork,
    pub follow_up: CameraFollowUp,
}

/// At most one pending move and one pending fade.
#[derive(Clone, Debug, Default)]
pub struct CameraDirector {
    moving: Option<PendingCamera>,
    fading: Option<PendingCamera>,
}

impl CameraDirector {
    pub fn take(&mut self, work: CameraWork) -> Option<CameraFollowUp> {
        self.slot(work).take().map(|p| p.follow_up)
    }

    pub fn arm(&mut self, work: CameraWork, follow_up: CameraFollowUp, duration: Micros) {
        *self.slot(work) = Some(PendingCamera {
            follow_up,
            remaining: duration,
        });
    }

    pub fn pending(&self, work: CameraWork) -> Option<&PendingCamera> {
        match work {
            CameraWork::Move => self.moving.as_ref(),
            CameraWork::Fade => self.fading.as_ref(),
        }
    }

    /// Count down both slots; returns what finished, moves first.
    pub fn advance(&mut self, dt: Micros) -> Vec<CameraDone> {
        let mut done = Vec::new();
        for work in [CameraWork::Move, CameraWork::Fade] {
            let slot = self.slot(work);
            let Some(pending) = slot.as_mut() else {
                continue;
            };
            pending.remaining = pending.remaining.saturating_sub(dt);
            if pending.remaining.is_zero() {
                let follow_up = pending.follow_up;
                *slot = None;
                done.push(CameraDone { work, follow_up });
            }
        }
        done
    }

    fn slot(&mut self, work: CameraWork) -> &mut Option<PendingCamera> {
        match work {
            CameraWork::Move => &mut self.moving,
            CameraWork::Fade => &mut self.fading,
        }
    }
}
