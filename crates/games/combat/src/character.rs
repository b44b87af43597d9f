use serde::{Deserialize, Serialize};
use sim_core::Micros;
use slotmap::new_key_type;

use crate::anchor::AnchorId;
use crate::assets::CharacterDef;
use crate::geometry::{Easing, Vec3};

new_key_type! {
    pub struct CharacterId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    PlayerHero,
    AllyHero,
    Enemy,
}

impl Role {
    pub fn is_hero(self) -> bool {
        matches!(self, Role::PlayerHero | Role::AllyHero)
    }
}

/// How a character travels to its anchor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveKind {
    #[default]
    None,
    Walk,
    Run,
    Dash,
    Teleport,
}

/// Result of one health modification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HealthChange {
    /// Delta actually applied after clamping.
    pub delta: f32,
    pub new_value: f32,
    /// The clamp to `[0, max]` engaged.
    pub hit_limit: bool,
    /// Crossed from above zero to zero.
    pub died: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Health {
    pub fn full(max: f32) -> Self {
        let max = max.max(0.0);
        Self { current: max, max }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    pub fn apply_delta(&mut self, delta: f32) -> HealthChange {
        let raw = self.current + delta;
        let new_value = raw.clamp(0.0, self.max);
        let applied = new_value - self.current;
        let old_value = new_value - applied;
        self.current = new_value;
        HealthChange {
            delta: applied,
            new_value,
            hit_limit: raw != new_value,
            died: new_value <= 0.0 && old_value > 0.0,
        }
    }
}

/// Eased, timed interpolation toward an anchor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DashMotion {
    pub from: Vec3,
    pub to: Vec3,
    pub elapsed: Micros,
    pub duration: Micros,
    pub easing: Easing,
}

impl DashMotion {
    pub fn new(from: Vec3, to: Vec3, duration: Micros, easing: Easing) -> Self {
        Self {
            from,
            to,
            elapsed: Micros::ZERO,
            duration,
            easing,
        }
    }

    /// Advance by `dt`; returns the eased position and whether the dash is done.
    pub fn advance(&mut self, dt: Micros) -> (Vec3, bool) {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
        let t = self.elapsed.fraction_of(self.duration);
        let done = self.elapsed >= self.duration;
        if done {
            return (self.to, true);
        }
        (self.from.lerp(self.to, self.easing.apply(t)), false)
    }
}

/// Bookkeeping to run when a character goes away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DestroyHook {
    ForgetEnemy,
    ForgetHero,
}

#[derive(Clone, Debug)]
pub struct Character {
    pub def: CharacterDef,
    pub role: Role,
    pub health: Health,
    pub anchor: Option<AnchorId>,
    pub moving: MoveKind,
    pub speed: f32,
    pub dash: Option<DashMotion>,
    /// Anchors that release this character when it dies or is destroyed.
    pub death_watchers: Vec<AnchorId>,
    pub on_destroyed: Vec<DestroyHook>,
}

impl Character {
    pub fn new(def: CharacterDef, role: Role) -> Self {
        Self {
            health: Health::full(def.stats.max_health),
            speed: def.stats.on_ground_speeds.walk,
            def,
            role,
            anchor: None,
            moving: MoveKind::None,
            dash: None,
            death_watchers: Vec::new(),
            on_destroyed: Vec::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    /// Returns the previous anchor.
    pub fn set_new_anchor(&mut self, anchor: AnchorId) -> Option<AnchorId> {
        self.anchor.replace(anchor)
    }

    pub fn watch(&mut self, anchor: AnchorId) {
        if !self.death_watchers.contains(&anchor) {
            self.death_watchers.push(anchor);
        }
    }

    pub fn unwatch(&mut self, anchor: AnchorId) {
        self.death_watchers.retain(|a| *a != anchor);
    }

    /// Arrival at the anchor. Only a pending move is settled; returns whether
    /// one was pending.
    pub fn on_anchor_reached(&mut self) -> bool {
        if self.moving == MoveKind::None {
            return false;
        }
        self.speed = self.def.stats.on_ground_speeds.walk;
        self.moving = MoveKind::None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_reports_death_once() {
        let mut health = Health::full(50.0);
        let change = health.apply_delta(-20.0);
        assert_eq!(change.new_value, 30.0);
        assert!(!change.died);
        assert!(!change.hit_limit);

        let change = health.apply_delta(-45.0);
        assert_eq!(change.new_value, 0.0);
        assert_eq!(change.delta, -30.0);
        assert!(change.hit_limit);
        assert!(change.died);

        let change = health.apply_delta(-5.0);
        assert!(!change.died);
        assert!(change.hit_limit);
        assert!(!health.is_alive());
    }

    #[test]
    fn healing_clamps_at_max() {
        let mut health = Health::full(100.0);
        health.apply_delta(-10.0);
        let change = health.apply_delta(25.0);
        assert_eq!(change.new_value, 100.0);
        assert_eq!(change.delta, 10.0);
        assert!(change.hit_limit);
    }

    #[test]
    fn arrival_only_settles_pending_moves() {
        let mut character = Character::new(CharacterDef::new("HeroData:Kibaru", 100.0), Role::PlayerHero);
        assert!(!character.on_anchor_reached());

        character.moving = MoveKind::Run;
        character.speed = 450.0;
        assert!(character.on_anchor_reached());
        assert_eq!(character.moving, MoveKind::None);
        assert_eq!(character.speed, 250.0);
    }

    #[test]
    fn dash_lands_exactly_on_target() {
        let target = Vec3::new(100.0, 0.0, 0.0);
        let mut dash = DashMotion::new(Vec3::ZERO, target, Micros::from_secs(1), Easing::Linear);
        let (mid, done) = dash.advance(Micros::from_millis(500));
        assert!(!done);
        assert!((mid.x - 50.0).abs() < 1e-3);

        let (end, done) = dash.advance(Micros::from_secs(2));
        assert!(done);
        assert_eq!(end, target);
    }
}
