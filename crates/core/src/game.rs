use crate::envelope::ActionEnvelope;
use crate::types::{PlayerId, Tick};

/// How a finished game ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalOutcome {
    /// The game ran through its normal ending.
    Completed,
    /// The game was stopped before reaching its normal ending.
    Aborted,
}

/// A deterministic, tick-stepped game.
///
/// All state changes happen inside [`Game::step`]; anything asynchronous is
/// modelled by the game itself as work that completes on a later tick.
pub trait Game: Sized {
    type Config: Clone + Send + Sync + 'static;
    type Action: Clone + Send + Sync + 'static;
    type Observation: Clone + Send + Sync + 'static;
    type Event: Clone + Send + Sync + 'static;

    fn new(config: Self::Config, seed: u64) -> Self;

    /// Tick rate the game expects to be stepped at.
    fn tick_hz(&self) -> u32;

    fn step(
        &mut self,
        tick: Tick,
        actions: &[ActionEnvelope<Self::Action>],
        out_events: &mut Vec<Self::Event>,
    );

    fn observe(&self, tick: Tick, player: PlayerId) -> Self::Observation;

    fn is_terminal(&self) -> Option<TerminalOutcome>;
}
