use sim_core::{ActionEnvelope, Game, Micros, PlayerId, TerminalOutcome, Tick};
use tracing::warn;

use crate::actions::CombatAction;
use crate::camera::CameraFollowUp;
use crate::config::EncounterConfig;
use crate::events::CombatEvent;
use crate::manager::CombatManager;
use crate::observe::{build_observation, CombatObservation};
use crate::sandbox::SandboxWorld;

/// The encounter run headless against the sandbox world.
pub struct CombatGame {
    manager: CombatManager<SandboxWorld>,
    tick_hz: u32,
    tick: Tick,
    /// Events raised during construction, handed out with the first step.
    startup_events: Vec<CombatEvent>,
}

impl CombatGame {
    pub fn manager(&self) -> &CombatManager<SandboxWorld> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut CombatManager<SandboxWorld> {
        &mut self.manager
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    fn apply(&mut self, action: &CombatAction, out_events: &mut Vec<CombatEvent>) {
        let manager = &mut self.manager;
        match action {
            CombatAction::BeginCombat => {
                manager.begin_combat(out_events);
            }
            CombatAction::EnterPassive => {
                if !manager.enter_passive(out_events) {
                    warn!(phase = ?manager.phase(), "cannot enter passive");
                }
            }
            CombatAction::ExitPassive => {
                manager.exit_passive(out_events);
            }
            CombatAction::EndCombat => manager.end_combat(out_events),
            CombatAction::Damage { character, amount } => {
                if manager.apply_damage(*character, *amount, out_events).is_none() {
                    warn!(?character, "damage target not found");
                }
            }
            CombatAction::DamageFrontEnemy { amount } => {
                if let Some(enemy) = manager.front_enemy() {
                    manager.apply_damage(enemy, *amount, out_events);
                }
            }
            CombatAction::MoveCamera { target, seconds, token } => {
                manager.move_camera_command(
                    *target,
                    Micros::from_secs_f32(*seconds),
                    CameraFollowUp::Token(*token),
                    out_events,
                );
            }
        }
    }
}

impl Game for CombatGame {
    type Config = EncounterConfig;
    type Action = CombatAction;
    type Observation = CombatObservation;
    type Event = CombatEvent;

    fn new(config: Self::Config, seed: u64) -> Self {
        let world = SandboxWorld::new(&config.sandbox, &config.stages);
        let mut manager = CombatManager::new(config.layout, config.heroes, world, seed);
        let mut startup_events = Vec::new();
        if manager.layout().auto_init {
            match config.combat {
                Some(data) => {
                    manager.init_combat(data, &mut startup_events);
                }
                None => warn!("auto init requested without combat data"),
            }
        }
        Self {
            manager,
            tick_hz: config.tick_hz.max(1),
            tick: 0,
            startup_events,
        }
    }

    fn tick_hz(&self) -> u32 {
        self.tick_hz
    }

    fn step(&mut self, tick: Tick, actions: &[ActionEnvelope<Self::Action>], out_events: &mut Vec<Self::Event>) {
        self.tick = tick;
        out_events.append(&mut self.startup_events);

        for action in actions {
            self.apply(&action.payload, out_events);
        }

        let dt = Micros::tick_period(self.tick_hz);
        self.manager.services_mut().advance(dt);
        self.manager.tick(dt, out_events);
    }

    fn observe(&self, tick: Tick, _player: PlayerId) -> Self::Observation {
        build_observation(&self.manager, tick)
    }

    fn is_terminal(&self) -> Option<TerminalOutcome> {
        if !self.manager.is_finished() {
            return None;
        }
        if self.manager.was_aborted() {
            Some(TerminalOutcome::Aborted)
        } else {
            Some(TerminalOutcome::Completed)
        }
    }
}
