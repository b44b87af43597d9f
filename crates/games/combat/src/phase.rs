use serde::Serialize;

use crate::events::CombatEvent;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum CombatPhase {
    #[default]
    Opening,
    Beginning,
    Passive,
    Active,
    Ending,
    Ended,
}

impl CombatPhase {
    /// Phases in which the tail anchor may request spawns.
    pub fn runs_spawn_gate(self) -> bool {
        matches!(
            self,
            CombatPhase::Opening | CombatPhase::Beginning | CombatPhase::Active
        )
    }
}

/// Current phase plus the phase to restore when Passive ends.
#[derive(Clone, Debug, Default)]
pub struct PhaseTracker {
    current: CombatPhase,
    resume: Option<CombatPhase>,
}

impl PhaseTracker {
    pub fn current(&self) -> CombatPhase {
        self.current
    }

    pub fn resume_phase(&self) -> Option<CombatPhase> {
        self.resume
    }

    /// Returns whether the phase changed. Ended is only left through `reset`.
    pub fn set(&mut self, phase: CombatPhase, events: &mut Vec<CombatEvent>) -> bool {
        if self.current == CombatPhase::Ended && phase != CombatPhase::Ended {
            tracing::warn!(?phase, "encounter has ended; phase change ignored");
            return false;
        }
        self.change(phase, events)
    }

    /// Back to Opening for a fresh encounter.
    pub fn reset(&mut self, events: &mut Vec<CombatEvent>) {
        self.resume = None;
        self.change(CombatPhase::Opening, events);
    }

    pub fn enter_passive(&mut self, events: &mut Vec<CombatEvent>) -> bool {
        if !matches!(
            self.current,
            CombatPhase::Opening | CombatPhase::Beginning | CombatPhase::Active
        ) {
            return false;
        }
        self.resume = Some(self.current);
        self.change(CombatPhase::Passive, events)
    }

    pub fn exit_passive(&mut self, events: &mut Vec<CombatEvent>) -> bool {
        if self.current != CombatPhase::Passive {
            return false;
        }
        let resume = self.resume.take().unwrap_or(CombatPhase::Active);
        self.change(resume, events)
    }

    /// Move `from -> to`. While paused the transition lands in the resume slot.
    pub fn advance(&mut self, from: CombatPhase, to: CombatPhase, events: &mut Vec<CombatEvent>) -> bool {
        if self.current == from {
            return self.change(to, events);
        }
        if self.current == CombatPhase::Passive && self.resume == Some(from) {
            self.resume = Some(to);
            return true;
        }
        false
    }

    fn change(&mut self, phase: CombatPhase, events: &mut Vec<CombatEvent>) -> bool {
        if self.current == phase {
            return false;
        }
        let from = self.current;
        self.current = phase;
        if phase != CombatPhase::Passive {
            self.resume = None;
        }
        tracing::info!(?from, to = ?phase, "combat phase changed");
        events.push(CombatEvent::PhaseChanged { from, to: phase });
        true
    }
}
