//! Anchor placement and the ownership protocol.

use tracing::{debug, trace};

use crate::anchor::{Anchor, AnchorId, AnchorLine, AnchorState};
use crate::character::{CharacterId, MoveKind, Role};
use crate::events::CombatEvent;
use crate::geometry::Vec3;
use crate::manager::CombatManager;
use crate::services::Services;

impl<S: Services> CombatManager<S> {
    /// Lay out both anchor lines around the encounter origin. Lines whose
    /// count is unchanged are only repositioned.
    pub fn place_anchors(&mut self) {
        let hero_offsets = self.layout.hero_anchor_offsets.clone();
        let enemy_offsets = self.layout.enemy_anchor_offsets.clone();
        if hero_offsets.is_empty() || enemy_offsets.is_empty() {
            debug!("anchor offsets missing, nothing placed");
            return;
        }

        if self.hero_line.len() != hero_offsets.len() {
            for id in std::mem::take(&mut self.hero_line) {
                self.remove_anchor(id);
            }
        }
        let rebuild = self.hero_line.is_empty();
        for (index, offset) in hero_offsets.iter().enumerate() {
            let location = self.anchor_location(*offset);
            if rebuild {
                let half = self.layout.anchor_half_extents;
                let id = self.anchors.insert(Anchor::new(AnchorLine::Hero, index, location, half, None));
                self.hero_line.push(id);
            } else if let Some(anchor) = self.anchors.get_mut(self.hero_line[index]) {
                anchor.set_location(location);
            }
        }

        if self.enemy_line.len() != enemy_offsets.len() {
            for id in std::mem::take(&mut self.enemy_line) {
                self.remove_anchor(id);
            }
        }
        let rebuild = self.enemy_line.is_empty();
        // Tail first, so every anchor can link to the one behind it.
        let mut line = Vec::with_capacity(enemy_offsets.len());
        for (index, offset) in enemy_offsets.iter().enumerate().rev() {
            let location = self.anchor_location(*offset);
            if rebuild {
                let half = self.layout.anchor_half_extents;
                let successor = line.last().copied();
                let id = self
                    .anchors
                    .insert(Anchor::new(AnchorLine::Enemy, index, location, half, successor));
                line.push(id);
            } else if let Some(anchor) = self.anchors.get_mut(self.enemy_line[index]) {
                anchor.set_location(location);
            }
        }
        if rebuild {
            line.reverse();
            self.enemy_line = line;
        }
        debug!(
            heroes = self.hero_line.len(),
            enemies = self.enemy_line.len(),
            "anchors placed"
        );
    }

    fn anchor_location(&self, offset: Vec3) -> Vec3 {
        let world = self.layout.origin.transform_position(offset);
        match self.services.trace_ground(world, self.layout.snap_distance) {
            Some(ground) => ground + Vec3::UP * self.layout.snap_elevation,
            None => world,
        }
    }

    fn remove_anchor(&mut self, id: AnchorId) {
        let Some(anchor) = self.anchors.remove(id) else {
            return;
        };
        if let Some(character) = anchor.occupant.and_then(|c| self.characters.get_mut(c)) {
            character.unwatch(id);
            if character.anchor == Some(id) {
                character.anchor = None;
            }
        }
        trace!(anchor = %anchor.name, "anchor removed");
    }

    pub fn owner(&self, anchor: AnchorId) -> Option<CharacterId> {
        self.anchors.get(anchor).and_then(Anchor::owner)
    }

    /// Recompute the anchor state from its occupant and the overlap probe.
    /// Returns whether the state changed.
    pub fn update_anchor(&mut self, id: AnchorId, events: &mut Vec<CombatEvent>) -> bool {
        let Some(anchor) = self.anchors.get_mut(id) else {
            return false;
        };
        if anchor.occupant.is_some_and(|c| !self.characters.contains_key(c)) {
            anchor.occupant = None;
        }
        let occupant = anchor.occupant;
        let overlapping = occupant.is_some_and(|c| self.services.overlaps(c, &anchor.volume));
        let from = anchor.state;
        let to = AnchorState::resolve(occupant.is_some(), overlapping);
        anchor.state = to;
        let (line, index, successor) = (anchor.line, anchor.index, anchor.successor);

        let changed = from != to;
        if changed {
            trace!(anchor = %anchor.name, ?from, ?to, "anchor state changed");
            events.push(CombatEvent::AnchorStateChanged {
                anchor: id,
                line,
                index,
                from,
                to,
            });
            if let Some(character) = occupant {
                if to == AnchorState::Occupied {
                    self.notify_reached(character, events);
                } else if from == AnchorState::Occupied {
                    events.push(CombatEvent::CharacterLeftAnchor { character, anchor: id });
                }
            }
            if to == AnchorState::Occupied {
                self.on_anchor_occupied(id, line, index, events);
            }
        }

        if to == AnchorState::Free {
            if let Some(successor) = successor {
                self.pull_forward(id, successor, events);
            }
        }
        changed
    }

    fn on_anchor_occupied(&mut self, id: AnchorId, line: AnchorLine, index: usize, events: &mut Vec<CombatEvent>) {
        match line {
            AnchorLine::Hero if index == 0 => self.on_hero_front_occupied(events),
            AnchorLine::Enemy if self.enemy_line.last() == Some(&id) => self.on_enemy_tail_occupied(events),
            _ => {}
        }
    }

    /// Move the occupant of `from` into `to`. Returns whether anyone moved.
    pub fn pull_forward(&mut self, to: AnchorId, from: AnchorId, events: &mut Vec<CombatEvent>) -> bool {
        let Some(candidate) = self
            .owner(from)
            .filter(|c| self.characters.contains_key(*c))
        else {
            return false;
        };
        trace!(?candidate, "pulling occupant forward");
        self.set_new_owner(from, None, events);
        self.set_new_owner(to, Some(candidate), events);
        true
    }

    /// Hand the anchor to `owner`, or release it with `None`. Any other
    /// anchor holding the new owner is released first.
    pub fn set_new_owner(&mut self, id: AnchorId, owner: Option<CharacterId>, events: &mut Vec<CombatEvent>) {
        if !self.anchors.contains_key(id) {
            return;
        }
        let owner = owner.filter(|c| self.characters.contains_key(*c));
        if let Some(character) = owner {
            let holders: Vec<AnchorId> = self
                .anchors
                .iter()
                .filter(|(other, a)| *other != id && a.occupant == Some(character))
                .map(|(other, _)| other)
                .collect();
            for holder in holders {
                self.set_new_owner(holder, None, events);
            }
        }

        let Some(anchor) = self.anchors.get_mut(id) else {
            return;
        };
        let previous = std::mem::replace(&mut anchor.occupant, owner);
        if let Some(prev) = previous.filter(|p| Some(*p) != owner) {
            if let Some(character) = self.characters.get_mut(prev) {
                character.unwatch(id);
            }
        }
        if let Some(character) = owner.and_then(|c| self.characters.get_mut(c)) {
            character.watch(id);
        }

        self.update_anchor(id, events);

        if let Some(character) = owner {
            self.assign_anchor(character, id, events);
        }
    }

    fn assign_anchor(&mut self, id: CharacterId, anchor: AnchorId, events: &mut Vec<CombatEvent>) {
        let advance = self.layout.enemy_advance;
        let Some(character) = self.characters.get_mut(id) else {
            return;
        };
        let previous = character.set_new_anchor(anchor);
        let role = character.role;
        events.push(CombatEvent::AnchorAssigned {
            character: id,
            anchor,
            previous,
        });
        let settled = self.anchors.get(anchor).is_some_and(|a| a.state() == AnchorState::Occupied);
        if role == Role::Enemy && previous != Some(anchor) && !settled && advance != MoveKind::None {
            self.try_move_to_anchor(id, advance, events);
        }
    }

    /// Release every anchor that watches a dead or departing character.
    pub(crate) fn release_watchers(&mut self, id: CharacterId, watchers: &[AnchorId], events: &mut Vec<CombatEvent>) {
        for anchor_id in watchers {
            let Some(anchor) = self.anchors.get_mut(*anchor_id) else {
                continue;
            };
            if anchor.occupant != Some(id) {
                continue;
            }
            anchor.occupant = None;
            if let Some(character) = self.characters.get_mut(id) {
                character.unwatch(*anchor_id);
            }
            self.update_anchor(*anchor_id, events);
        }
    }

    /// Walk the enemy line front to back, pulling occupants forward and
    /// letting a free tail open the spawn gate.
    pub(crate) fn update_enemy_line(&mut self, gate_open: bool, events: &mut Vec<CombatEvent>) {
        let line = self.enemy_line.clone();
        for (index, id) in line.iter().enumerate() {
            self.update_anchor(*id, events);
            let free = self.anchors.get(*id).is_some_and(|a| a.state() == AnchorState::Free);
            if !free {
                continue;
            }
            match line.get(index + 1) {
                Some(next) => {
                    self.pull_forward(*id, *next, events);
                }
                None if gate_open => {
                    self.try_spawn_enemy(events);
                }
                None => {}
            }
        }
    }
}
