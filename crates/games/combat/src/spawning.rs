//! Load-then-spawn for heroes and enemies, plus traversal abilities.

use rand::Rng;
use tracing::{debug, info, warn};

use crate::anchor::AnchorId;
use crate::assets::{AssetBundle, AssetId, CharacterDef};
use crate::character::{Character, CharacterId, DestroyHook, MoveKind, Role};
use crate::events::{CombatEvent, SpawnFailure};
use crate::geometry::Transform;
use crate::manager::CombatManager;
use crate::phase::CombatPhase;
use crate::services::{AbilityHandle, LoadHandle, LoadPoll, Services};

#[derive(Clone, Debug, PartialEq)]
pub struct SpawnRequest {
    pub asset: AssetId,
    pub role: Role,
    pub at: Transform,
    pub anchor: Option<AnchorId>,
}

#[derive(Clone, Debug)]
pub(crate) struct PendingLoad {
    pub handle: LoadHandle,
    pub request: SpawnRequest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraversalKind {
    Intro,
    Outro,
}

#[derive(Clone, Debug)]
pub(crate) struct RunningAbility {
    pub handle: AbilityHandle,
    pub character: CharacterId,
    pub kind: TraversalKind,
}

impl<S: Services> CombatManager<S> {
    pub(crate) fn spawn_player_hero(&mut self, events: &mut Vec<CombatEvent>) {
        let asset = self.heroes.player.clone();
        if !asset.is_valid() {
            warn!(%asset, "no valid player hero configured");
            return;
        }
        let Some(spawn) = self.layout.hero_spawns.first() else {
            return;
        };
        let at = self.layout.origin.transform(spawn);
        let anchor = self.hero_line.first().copied();
        self.request_spawn(
            SpawnRequest {
                asset,
                role: Role::PlayerHero,
                at,
                anchor,
            },
            events,
        );
    }

    /// Load the ally hero at the second hero spawn, bound to the second hero anchor.
    pub fn spawn_allies(&mut self, events: &mut Vec<CombatEvent>) {
        let Some(asset) = self.heroes.ally.clone().filter(AssetId::is_valid) else {
            debug!("no ally configured");
            return;
        };
        let Some(spawn) = self.layout.hero_spawns.get(1) else {
            warn!("no spawn point for the ally hero");
            return;
        };
        let at = self.layout.origin.transform(spawn);
        let anchor = self.hero_line.get(1).copied();
        self.request_spawn(
            SpawnRequest {
                asset,
                role: Role::AllyHero,
                at,
                anchor,
            },
            events,
        );
    }

    /// Request an enemy at a random spawn point, bound to the tail anchor.
    /// Location and rotation are drawn independently.
    pub fn spawn_enemy(&mut self, asset: &AssetId, events: &mut Vec<CombatEvent>) -> bool {
        let spawns = &self.layout.enemy_spawns;
        if spawns.is_empty() {
            warn!("no enemy spawn points");
            return false;
        }
        let location = spawns[self.rng.gen_range(0..spawns.len())].location;
        let yaw = spawns[self.rng.gen_range(0..spawns.len())].yaw_deg;
        let at = self.layout.origin.transform(&Transform {
            location,
            yaw_deg: yaw,
        });
        let anchor = self.enemy_line.last().copied();

        self.enemy_spawn_in_flight = true;
        self.request_spawn(
            SpawnRequest {
                asset: asset.clone(),
                role: Role::Enemy,
                at,
                anchor,
            },
            events,
        );
        true
    }

    fn request_spawn(&mut self, request: SpawnRequest, events: &mut Vec<CombatEvent>) {
        let handle = self.services.request_load(&request.asset, &[AssetBundle::Spawn]);
        debug!(asset = %request.asset, role = ?request.role, ?handle, "spawn requested");
        events.push(CombatEvent::SpawnRequested {
            asset: request.asset.clone(),
            role: request.role,
        });
        self.loads.push(PendingLoad { handle, request });
    }

    pub(crate) fn resolve_loads(&mut self, events: &mut Vec<CombatEvent>) {
        for load in std::mem::take(&mut self.loads) {
            match self.services.poll_load(load.handle) {
                LoadPoll::Pending => self.loads.push(load),
                LoadPoll::Ready(def) => self.complete_spawn(load.request, def, events),
            }
        }
    }

    fn complete_spawn(&mut self, request: SpawnRequest, def: Option<CharacterDef>, events: &mut Vec<CombatEvent>) {
        if request.role == Role::Enemy {
            self.enemy_spawn_in_flight = false;
        }
        let Some(def) = def else {
            warn!(asset = %request.asset, "load finished without a definition");
            events.push(CombatEvent::SpawnFailed {
                asset: request.asset,
                role: request.role,
                reason: SpawnFailure::LoadFailed,
            });
            return;
        };
        let Some(id) = self.materialize(def, request.role, request.at, events) else {
            warn!(asset = %request.asset, "spawner rejected the character");
            events.push(CombatEvent::SpawnFailed {
                asset: request.asset,
                role: request.role,
                reason: SpawnFailure::Rejected,
            });
            return;
        };

        if let Some(anchor) = request.anchor {
            self.set_new_owner(anchor, Some(id), events);
        }

        match request.role {
            Role::PlayerHero => {
                if !self.activate_traversal(id, TraversalKind::Intro, events) {
                    self.try_move_to_anchor(id, MoveKind::Run, events);
                }
                info!(character = ?id, "player hero spawned");
                events.push(CombatEvent::PlayerSpawned { character: id });
            }
            Role::AllyHero => {
                self.try_move_to_anchor(id, MoveKind::Teleport, events);
            }
            Role::Enemy => {}
        }
    }

    fn materialize(
        &mut self,
        def: CharacterDef,
        role: Role,
        at: Transform,
        events: &mut Vec<CombatEvent>,
    ) -> Option<CharacterId> {
        let asset = def.id.clone();
        let id = self.characters.insert(Character::new(def, role));
        if !self.services.spawn_character(id, &self.characters[id].def, at) {
            self.characters.remove(id);
            return None;
        }
        let (list, hook) = match role {
            Role::Enemy => (&mut self.enemies_in_scene, DestroyHook::ForgetEnemy),
            Role::PlayerHero | Role::AllyHero => (&mut self.heroes_in_scene, DestroyHook::ForgetHero),
        };
        list.push(id);
        self.characters[id].on_destroyed.push(hook);
        debug!(character = ?id, %asset, ?role, "character spawned");
        events.push(CombatEvent::CharacterSpawned {
            character: id,
            asset,
            role,
        });
        Some(id)
    }

    /// Grant and run the combat's intro or outro traversal on `id`. Abilities
    /// not resident are loaded synchronously.
    pub(crate) fn activate_traversal(
        &mut self,
        id: CharacterId,
        kind: TraversalKind,
        events: &mut Vec<CombatEvent>,
    ) -> bool {
        let ability_id = self.combat.as_ref().and_then(|c| match kind {
            TraversalKind::Intro => c.intro_traversal.clone(),
            TraversalKind::Outro => c.outro_traversal.clone(),
        });
        let Some(ability_id) = ability_id else {
            return false;
        };
        let Some(ability) = self
            .services
            .resident_ability(&ability_id)
            .or_else(|| self.services.load_ability_blocking(&ability_id))
        else {
            warn!(ability = %ability_id, "traversal ability could not be loaded");
            return false;
        };
        let Some(handle) = self.services.give_and_activate_once(id, &ability) else {
            warn!(ability = %ability_id, "traversal ability did not activate");
            return false;
        };
        debug!(character = ?id, ability = %ability_id, ?kind, "traversal activated");
        self.abilities.push(RunningAbility {
            handle,
            character: id,
            kind,
        });
        events.push(CombatEvent::AbilityActivated {
            character: id,
            ability: ability_id,
        });
        true
    }

    pub(crate) fn resolve_abilities(&mut self, events: &mut Vec<CombatEvent>) {
        for handle in self.services.drain_finished_abilities() {
            let Some(pos) = self.abilities.iter().position(|a| a.handle == handle) else {
                continue;
            };
            let finished = self.abilities.remove(pos);
            match finished.kind {
                TraversalKind::Intro => {
                    self.try_move_to_anchor(finished.character, MoveKind::Dash, events);
                }
                TraversalKind::Outro => {
                    self.milestones.outro_active = false;
                    // With the blend still running, its completion closes the encounter.
                    if self.phase.current() == CombatPhase::Ending && !self.ending_blend_pending() {
                        self.end_combat(events);
                    }
                }
            }
        }
    }
}
