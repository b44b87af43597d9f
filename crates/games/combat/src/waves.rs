use std::collections::VecDeque;

use sim_core::Micros;

use crate::assets::AssetId;
use crate::config::{SpawnMode, WaveSpec};

#[derive(Clone, Debug, PartialEq)]
pub struct Wave {
    pub spawn_mode: SpawnMode,
    pub spawn_delay: Micros,
    pub enemies: Vec<AssetId>,
    pub has_begun_spawning: bool,
}

impl From<&WaveSpec> for Wave {
    fn from(spec: &WaveSpec) -> Self {
        Self {
            spawn_mode: spec.spawn_mode,
            spawn_delay: Micros::from_secs_f32(spec.spawn_delay),
            enemies: spec.enemies.clone(),
            has_begun_spawning: false,
        }
    }
}

/// Outcome of moving to the next wave.
#[derive(Clone, Debug, PartialEq)]
pub enum WaveAdvance {
    Started {
        number: u32,
        enemies: usize,
        spawn_delay: Micros,
    },
    Exhausted,
}

/// Pending waves, the wave being spawned and its countdown.
#[derive(Clone, Debug, Default)]
pub struct WaveQueue {
    pending: VecDeque<Wave>,
    current: Option<Wave>,
    spawn_queue: VecDeque<AssetId>,
    spawn_timer: Option<Micros>,
    started: u32,
    /// Invalid ids dropped while copying waves, not yet reported.
    skipped: Vec<AssetId>,
}

impl WaveQueue {
    pub fn from_specs(specs: &[WaveSpec]) -> Self {
        Self {
            pending: specs.iter().map(Wave::from).collect(),
            ..Self::default()
        }
    }

    /// Pop waves until one yields spawnable ids. Empty waves, and waves of
    /// nothing but invalid ids, are skipped.
    pub fn advance(&mut self) -> WaveAdvance {
        while let Some(wave) = self.pending.pop_front() {
            self.started += 1;
            let (valid, invalid): (Vec<AssetId>, Vec<AssetId>) =
                wave.enemies.iter().cloned().partition(AssetId::is_valid);
            if !invalid.is_empty() {
                tracing::warn!(wave = self.started, invalid = invalid.len(), "dropping invalid enemy ids");
                self.skipped.extend(invalid);
            }
            self.spawn_queue.extend(valid);
            if self.spawn_queue.is_empty() {
                tracing::debug!(wave = self.started, "skipping empty wave");
                continue;
            }
            self.spawn_timer = (!wave.spawn_delay.is_zero()).then_some(wave.spawn_delay);
            let advance = WaveAdvance::Started {
                number: self.started,
                enemies: self.spawn_queue.len(),
                spawn_delay: wave.spawn_delay,
            };
            self.current = Some(wave);
            return advance;
        }
        WaveAdvance::Exhausted
    }

    pub fn dequeue(&mut self) -> Option<AssetId> {
        self.spawn_queue.pop_front()
    }

    /// Invalid ids dropped since the last call.
    pub fn take_skipped(&mut self) -> Vec<AssetId> {
        std::mem::take(&mut self.skipped)
    }

    pub fn tick_timer(&mut self, dt: Micros) {
        if let Some(remaining) = self.spawn_timer {
            let remaining = remaining.saturating_sub(dt);
            self.spawn_timer = (!remaining.is_zero()).then_some(remaining);
        }
    }

    pub fn timer_running(&self) -> bool {
        self.spawn_timer.is_some()
    }

    pub fn timer_remaining(&self) -> Micros {
        self.spawn_timer.unwrap_or(Micros::ZERO)
    }

    pub fn current(&self) -> Option<&Wave> {
        self.current.as_ref()
    }

    pub fn spawn_mode(&self) -> SpawnMode {
        self.current.as_ref().map_or(SpawnMode::None, |w| w.spawn_mode)
    }

    pub fn has_begun_spawning(&self) -> bool {
        self.current.as_ref().is_some_and(|w| w.has_begun_spawning)
    }

    pub fn mark_begun(&mut self) {
        if let Some(wave) = self.current.as_mut() {
            wave.has_begun_spawning = true;
        }
    }

    pub fn spawn_queue(&self) -> impl Iterator<Item = &AssetId> {
        self.spawn_queue.iter()
    }

    pub fn spawn_queue_len(&self) -> usize {
        self.spawn_queue.len()
    }

    pub fn waves_remaining(&self) -> usize {
        self.pending.len()
    }

    /// Waves popped so far, empty ones included.
    pub fn waves_started(&self) -> u32 {
        self.started
    }

    pub fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.spawn_queue.is_empty()
    }
}

/// Free-anchor threshold for a spawn: 3, 2 or 1 free anchors. Once a wave
/// has begun only the one-free mode keeps its threshold.
pub fn spawn_gate_allows(mode: SpawnMode, has_begun: bool, free: usize) -> bool {
    match mode {
        SpawnMode::None => false,
        SpawnMode::OnAllAnchorsFree => has_begun || free >= 3,
        SpawnMode::OnTwoAnchorsFree => has_begun || free >= 2,
        SpawnMode::OnOneAnchorFree => free >= 1,
    }
}
