//! Movement toward anchors, health and character teardown.

use sim_core::Micros;
use tracing::{debug, info};

use crate::character::{CharacterId, DashMotion, DestroyHook, HealthChange, MoveKind};
use crate::events::CombatEvent;
use crate::manager::CombatManager;
use crate::services::Services;

impl<S: Services> CombatManager<S> {
    /// Send `id` toward its current anchor. False when it has none.
    pub fn try_move_to_anchor(&mut self, id: CharacterId, kind: MoveKind, events: &mut Vec<CombatEvent>) -> bool {
        let Some(anchor) = self.characters.get(id).and_then(|c| c.anchor) else {
            return false;
        };
        let Some(target) = self.anchors.get(anchor).map(|a| a.location()) else {
            return false;
        };
        let Some(character) = self.characters.get_mut(id) else {
            return false;
        };
        let speeds = character.def.stats.on_ground_speeds;
        match kind {
            MoveKind::None => {}
            MoveKind::Walk | MoveKind::Run => {
                let speed = if kind == MoveKind::Walk { speeds.walk } else { speeds.run };
                character.moving = kind;
                character.speed = speed;
                self.services.walk_to(id, target, speed);
            }
            MoveKind::Dash => {
                let duration = Micros::from_secs_f32(character.def.stats.dash_time);
                let easing = character.def.stats.dash_easing;
                let from = self.services.position(id).unwrap_or(target);
                character.moving = kind;
                character.dash = Some(DashMotion::new(from, target, duration, easing));
            }
            MoveKind::Teleport => {
                character.moving = kind;
                character.dash = None;
                self.services.set_position(id, target);
                self.notify_reached(id, events);
            }
        }
        true
    }

    /// Settle a pending move on arrival.
    pub(crate) fn notify_reached(&mut self, id: CharacterId, events: &mut Vec<CombatEvent>) {
        let Some(character) = self.characters.get_mut(id) else {
            return;
        };
        let kind = character.moving;
        if character.on_anchor_reached() {
            events.push(CombatEvent::CharacterReachedAnchor { character: id, kind });
        }
    }

    pub(crate) fn advance_dashes(&mut self, dt: Micros, events: &mut Vec<CombatEvent>) {
        let dashing: Vec<CharacterId> = self
            .characters
            .iter()
            .filter(|(_, c)| c.dash.is_some())
            .map(|(id, _)| id)
            .collect();
        for id in dashing {
            let Some(dash) = self.characters.get_mut(id).and_then(|c| c.dash.as_mut()) else {
                continue;
            };
            let (position, done) = dash.advance(dt);
            self.services.set_position(id, position);
            if done {
                if let Some(character) = self.characters.get_mut(id) {
                    character.dash = None;
                }
                self.notify_reached(id, events);
            }
        }
    }

    /// Apply damage (negative amounts heal). Death releases the character's
    /// anchors and destroys it.
    pub fn apply_damage(&mut self, id: CharacterId, amount: f32, events: &mut Vec<CombatEvent>) -> Option<HealthChange> {
        let character = self.characters.get_mut(id)?;
        let change = character.health.apply_delta(-amount);
        events.push(CombatEvent::HealthChanged {
            character: id,
            delta: change.delta,
            new_value: change.new_value,
            hit_limit: change.hit_limit,
        });
        if change.died {
            info!(character = ?id, "character died");
            events.push(CombatEvent::CharacterDied { character: id });
            let watchers = character.death_watchers.clone();
            self.release_watchers(id, &watchers, events);
            self.destroy_character(id, events);
        }
        Some(change)
    }

    /// Remove a character from the world and every list that tracks it.
    pub fn destroy_character(&mut self, id: CharacterId, events: &mut Vec<CombatEvent>) {
        let Some(character) = self.characters.remove(id) else {
            return;
        };
        for anchor_id in &character.death_watchers {
            if let Some(anchor) = self.anchors.get_mut(*anchor_id) {
                if anchor.occupant == Some(id) {
                    anchor.occupant = None;
                }
            }
        }
        for hook in &character.on_destroyed {
            match hook {
                DestroyHook::ForgetEnemy => self.enemies_in_scene.retain(|c| *c != id),
                DestroyHook::ForgetHero => self.heroes_in_scene.retain(|c| *c != id),
            }
        }
        self.abilities.retain(|a| a.character != id);
        self.services.destroy_character(id);
        for anchor_id in character.death_watchers {
            self.update_anchor(anchor_id, events);
        }
        debug!(character = ?id, role = ?character.role, "character destroyed");
        events.push(CombatEvent::CharacterDestroyed {
            character: id,
            role: character.role,
        });
    }
}
