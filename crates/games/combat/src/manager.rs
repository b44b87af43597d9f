//! The encounter: phase machine, wave sequencing and camera follow-ups.
//!
//! Anchor ownership lives in `anchoring`, load-then-spawn in `spawning`,
//! movement and health in `motion`. All of them are `impl` blocks on
//! [`CombatManager`].

use rand::rngs::StdRng;
use rand::SeedableRng;
use sim_core::Micros;
use slotmap::SlotMap;
use tracing::{debug, info, warn};

use crate::anchor::{Anchor, AnchorId, AnchorState};
use crate::camera::{CameraDirector, CameraFollowUp, CameraTarget, CameraWork, Color, ScreenFade};
use crate::character::{Character, CharacterId};
use crate::config::{CombatData, EncounterLayout, HeroRoster};
use crate::events::CombatEvent;
use crate::phase::{CombatPhase, PhaseTracker};
use crate::services::Services;
use crate::spawning::{PendingLoad, RunningAbility, TraversalKind};
use crate::waves::{spawn_gate_allows, WaveAdvance, WaveQueue};

/// Once-per-encounter flags.
#[derive(Clone, Debug, Default)]
pub(crate) struct Milestones {
    pub allies_summoned: bool,
    pub opening_closed: bool,
    pub outro_active: bool,
    pub ended_announced: bool,
    /// `end_combat` was called before the encounter reached Ending.
    pub aborted: bool,
}

pub struct CombatManager<S: Services> {
    pub(crate) layout: EncounterLayout,
    pub(crate) heroes: HeroRoster,
    pub(crate) combat: Option<CombatData>,
    pub(crate) services: S,
    pub(crate) rng: StdRng,

    pub(crate) anchors: SlotMap<AnchorId, Anchor>,
    pub(crate) hero_line: Vec<AnchorId>,
    pub(crate) enemy_line: Vec<AnchorId>,

    pub(crate) characters: SlotMap<CharacterId, Character>,
    pub(crate) heroes_in_scene: Vec<CharacterId>,
    pub(crate) enemies_in_scene: Vec<CharacterId>,

    pub(crate) waves: WaveQueue,
    pub(crate) phase: PhaseTracker,
    pub(crate) camera: CameraDirector,
    pub(crate) loads: Vec<PendingLoad>,
    pub(crate) abilities: Vec<RunningAbility>,
    pub(crate) enemy_spawn_in_flight: bool,
    pub(crate) milestones: Milestones,
}

impl<S: Services> CombatManager<S> {
    pub fn new(layout: EncounterLayout, heroes: HeroRoster, services: S, seed: u64) -> Self {
        Self {
            layout,
            heroes,
            combat: None,
            services,
            rng: StdRng::seed_from_u64(seed),
            anchors: SlotMap::with_key(),
            hero_line: Vec::new(),
            enemy_line: Vec::new(),
            characters: SlotMap::with_key(),
            heroes_in_scene: Vec::new(),
            enemies_in_scene: Vec::new(),
            waves: WaveQueue::default(),
            phase: PhaseTracker::default(),
            camera: CameraDirector::default(),
            loads: Vec::new(),
            abilities: Vec::new(),
            enemy_spawn_in_flight: false,
            milestones: Milestones::default(),
        }
    }

    // ---- accessors ----

    pub fn phase(&self) -> CombatPhase {
        self.phase.current()
    }

    pub fn combat(&self) -> Option<&CombatData> {
        self.combat.as_ref()
    }

    pub fn layout(&self) -> &EncounterLayout {
        &self.layout
    }

    pub fn anchor(&self, id: AnchorId) -> Option<&Anchor> {
        self.anchors.get(id)
    }

    pub fn hero_anchors(&self) -> &[AnchorId] {
        &self.hero_line
    }

    pub fn enemy_anchors(&self) -> &[AnchorId] {
        &self.enemy_line
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(id)
    }

    pub fn characters(&self) -> impl Iterator<Item = (CharacterId, &Character)> {
        self.characters.iter()
    }

    pub fn heroes_in_scene(&self) -> &[CharacterId] {
        &self.heroes_in_scene
    }

    pub fn enemies_in_scene(&self) -> &[CharacterId] {
        &self.enemies_in_scene
    }

    pub fn waves(&self) -> &WaveQueue {
        &self.waves
    }

    pub fn camera(&self) -> &CameraDirector {
        &self.camera
    }

    pub fn services(&self) -> &S {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut S {
        &mut self.services
    }

    pub fn enemy_spawn_in_flight(&self) -> bool {
        self.enemy_spawn_in_flight
    }

    pub fn pending_loads(&self) -> usize {
        self.loads.len()
    }

    /// The Ended fade has landed.
    pub fn is_finished(&self) -> bool {
        self.phase.current() == CombatPhase::Ended && self.milestones.ended_announced
    }

    pub fn was_aborted(&self) -> bool {
        self.milestones.aborted
    }

    /// Occupant of the front enemy anchor, else the first living enemy.
    pub fn front_enemy(&self) -> Option<CharacterId> {
        self.enemy_line
            .first()
            .and_then(|id| self.anchors.get(*id))
            .and_then(|a| a.owner())
            .filter(|c| self.characters.get(*c).is_some_and(Character::is_alive))
            .or_else(|| {
                self.enemies_in_scene
                    .iter()
                    .copied()
                    .find(|c| self.characters.get(*c).is_some_and(Character::is_alive))
            })
    }

    // ---- lifecycle ----

    /// Start an encounter from `data`. Requires hero and enemy spawn points.
    pub fn init_combat(&mut self, data: CombatData, events: &mut Vec<CombatEvent>) -> bool {
        if self.layout.hero_spawns.is_empty() || self.layout.enemy_spawns.is_empty() {
            warn!("cannot init combat without hero and enemy spawn points");
            return false;
        }
        info!(combat = %data.id, waves = data.waves.len(), "initialising combat");

        self.place_anchors();

        for hero in std::mem::take(&mut self.heroes_in_scene) {
            self.destroy_character(hero, events);
        }
        for enemy in std::mem::take(&mut self.enemies_in_scene) {
            self.destroy_character(enemy, events);
        }
        self.loads.clear();
        self.abilities.clear();
        self.enemy_spawn_in_flight = false;
        self.milestones = Milestones::default();
        self.camera = CameraDirector::default();

        self.phase.reset(events);
        self.waves = WaveQueue::from_specs(&data.waves);
        self.combat = Some(data);

        self.spawn_player_hero(events);
        true
    }

    /// Operator action; only valid while Opening.
    pub fn begin_combat(&mut self, events: &mut Vec<CombatEvent>) -> bool {
        if self.phase.current() != CombatPhase::Opening {
            warn!(phase = ?self.phase.current(), "begin_combat outside Opening ignored");
            return false;
        }
        self.phase.set(CombatPhase::Beginning, events);
        let blend = self.layout.camera_blend();
        self.move_camera_command(CameraTarget::EncounterArea, blend, CameraFollowUp::EnterActive, events);
        true
    }

    pub fn enter_passive(&mut self, events: &mut Vec<CombatEvent>) -> bool {
        self.phase.enter_passive(events)
    }

    pub fn exit_passive(&mut self, events: &mut Vec<CombatEvent>) -> bool {
        if !self.phase.exit_passive(events) {
            return false;
        }
        // The front hero anchor may have filled while paused.
        if self.phase.current() == CombatPhase::Opening {
            if let Some(front) = self.hero_line.first().copied() {
                if self.anchors.get(front).is_some_and(|a| a.state() == AnchorState::Occupied) {
                    self.on_hero_front_occupied(events);
                }
            }
        }
        true
    }

    /// Fade out and enter Ended. Safe to call repeatedly.
    pub fn end_combat(&mut self, events: &mut Vec<CombatEvent>) {
        let current = self.phase.current();
        if current != CombatPhase::Ended {
            self.milestones.aborted = current != CombatPhase::Ending;
            self.milestones.ended_announced = false;
        }
        self.phase.set(CombatPhase::Ended, events);
        let fade = ScreenFade::to_solid(Color::BLACK, self.layout.camera_fade());
        self.fade_camera_command(fade, CameraFollowUp::AnnounceEnded, events);
    }

    // ---- per tick ----

    pub fn tick(&mut self, dt: Micros, events: &mut Vec<CombatEvent>) {
        self.resolve_loads(events);
        self.resolve_abilities(events);
        for done in self.camera.advance(dt) {
            self.resolve_camera(done.work, done.follow_up, true, events);
        }
        self.advance_dashes(dt, events);

        let gate_open = self.phase.current().runs_spawn_gate();
        if gate_open {
            self.waves.tick_timer(dt);
        }

        for anchor in self.hero_line.clone() {
            self.update_anchor(anchor, events);
        }
        self.update_enemy_line(gate_open, events);

        if self.phase.current() == CombatPhase::Active
            && self.waves.is_drained()
            && !self.enemy_spawn_in_flight
        {
            self.create_next_wave(events);
        }
    }

    // ---- waves ----

    /// Move to the next non-empty wave, or close the encounter once every
    /// wave is spent and no enemy is left standing.
    pub fn create_next_wave(&mut self, events: &mut Vec<CombatEvent>) {
        let advance = self.waves.advance();
        for asset in self.waves.take_skipped() {
            events.push(CombatEvent::SpawnSkipped { asset });
        }
        match advance {
            WaveAdvance::Started {
                number,
                enemies,
                spawn_delay,
            } => {
                info!(number, enemies, delay = spawn_delay.as_secs_f32(), "wave started");
                events.push(CombatEvent::WaveStarted {
                    number,
                    enemies,
                    spawn_delay,
                });
            }
            WaveAdvance::Exhausted => {
                if self.phase.current() != CombatPhase::Active {
                    return;
                }
                let alive = self.living_enemies();
                if alive > 0 {
                    debug!(alive, "waves exhausted, waiting on living enemies");
                    return;
                }
                self.enter_ending(events);
            }
        }
    }

    /// Spawn the next queued enemy if the tail gate allows it.
    pub fn try_spawn_enemy(&mut self, events: &mut Vec<CombatEvent>) -> bool {
        let mode = self.waves.spawn_mode();
        if mode == crate::config::SpawnMode::None
            || self.enemy_spawn_in_flight
            || self.waves.timer_running()
        {
            return false;
        }
        let free = self
            .enemy_line
            .iter()
            .filter(|id| self.anchors.get(**id).is_some_and(|a| a.state() == AnchorState::Free))
            .count();
        if !spawn_gate_allows(mode, self.waves.has_begun_spawning(), free) {
            return false;
        }
        match self.waves.dequeue() {
            None => {
                self.create_next_wave(events);
                false
            }
            Some(asset) => {
                self.waves.mark_begun();
                self.spawn_enemy(&asset, events)
            }
        }
    }

    /// The camera blend that closes Ending has not landed yet.
    pub(crate) fn ending_blend_pending(&self) -> bool {
        self.camera
            .pending(CameraWork::Move)
            .is_some_and(|p| p.follow_up == CameraFollowUp::FinishEnding)
    }

    pub fn living_enemies(&self) -> usize {
        self.enemies_in_scene
            .iter()
            .filter(|c| self.characters.get(**c).is_some_and(Character::is_alive))
            .count()
    }

    fn enter_ending(&mut self, events: &mut Vec<CombatEvent>) {
        if !self.phase.set(CombatPhase::Ending, events) {
            return;
        }
        if !self.services.is_final_stage() && self.services.advance_stage(1) {
            let stage = self.services.current_stage_id();
            info!(stage = ?stage, "advanced to next stage");
            events.push(CombatEvent::StageAdvanced { stage });
        }

        let survivor = self
            .heroes_in_scene
            .iter()
            .copied()
            .find(|h| self.characters.get(*h).is_some_and(Character::is_alive));
        let Some(hero) = survivor else {
            info!("no surviving hero for the outro");
            self.end_combat(events);
            return;
        };
        self.milestones.outro_active = self.activate_traversal(hero, TraversalKind::Outro, events);
        let blend = self.layout.outro_blend();
        self.move_camera_command(CameraTarget::Character(hero), blend, CameraFollowUp::FinishEnding, events);
    }

    pub(crate) fn on_hero_front_occupied(&mut self, events: &mut Vec<CombatEvent>) {
        if self.milestones.allies_summoned || self.phase.current() != CombatPhase::Opening {
            return;
        }
        self.milestones.allies_summoned = true;
        debug!("player hero reached the front anchor");
        self.spawn_allies(events);
        self.create_next_wave(events);
    }

    pub(crate) fn on_enemy_tail_occupied(&mut self, events: &mut Vec<CombatEvent>) {
        if self.milestones.opening_closed {
            return;
        }
        self.milestones.opening_closed = true;
        info!("enemy line filled, opening ended");
        events.push(CombatEvent::PhaseEnded {
            phase: CombatPhase::Opening,
        });
    }

    // ---- camera ----

    /// Blend the view. A pending move is resolved as failed first.
    pub fn move_camera_command(
        &mut self,
        target: CameraTarget,
        blend: Micros,
        follow_up: CameraFollowUp,
        events: &mut Vec<CombatEvent>,
    ) {
        if let Some(previous) = self.camera.take(CameraWork::Move) {
            debug!(?previous, "camera move replaced");
            self.resolve_camera(CameraWork::Move, previous, false, events);
        }
        self.services.blend_view_to(target, blend);
        self.camera.arm(CameraWork::Move, follow_up, blend);
    }

    /// Fade the screen. A pending fade is resolved as failed first.
    pub fn fade_camera_command(&mut self, fade: ScreenFade, follow_up: CameraFollowUp, events: &mut Vec<CombatEvent>) {
        if let Some(previous) = self.camera.take(CameraWork::Fade) {
            debug!(?previous, "camera fade replaced");
            self.resolve_camera(CameraWork::Fade, previous, false, events);
        }
        self.services.fade_screen(fade);
        self.camera.arm(CameraWork::Fade, follow_up, fade.duration);
    }

    fn resolve_camera(
        &mut self,
        work: CameraWork,
        follow_up: CameraFollowUp,
        completed: bool,
        events: &mut Vec<CombatEvent>,
    ) {
        events.push(CombatEvent::CameraFinished {
            work,
            follow_up,
            completed,
        });
        if !completed {
            return;
        }
        match follow_up {
            CameraFollowUp::EnterActive => {
                if self.phase.advance(CombatPhase::Beginning, CombatPhase::Active, events) {
                    events.push(CombatEvent::PhaseEnded {
                        phase: CombatPhase::Beginning,
                    });
                }
            }
            CameraFollowUp::FinishEnding => {
                if self.phase.current() != CombatPhase::Ending {
                    return;
                }
                events.push(CombatEvent::PhaseEnded {
                    phase: CombatPhase::Ending,
                });
                if !self.milestones.outro_active {
                    self.end_combat(events);
                }
            }
            CameraFollowUp::AnnounceEnded => {
                self.milestones.ended_announced = true;
                info!("encounter ended");
                events.push(CombatEvent::PhaseEnded {
                    phase: CombatPhase::Ended,
                });
            }
            CameraFollowUp::Token(_) => {}
        }
    }
}
