//! Headless encounter runner.
//!
//! Plays one encounter against the sandbox world with a scripted operator:
//! combat begins as soon as the enemy line fills, then the front enemy is
//! struck on a fixed cadence until the encounter closes.

use clap::Parser;
use sim_combat::{CombatAction, CombatEvent, CombatGame, CombatPhase, EncounterConfig};
use sim_core::{Game, PlayerId, Tick};
use sim_host::MatchHost;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "headless-runner")]
#[command(about = "Run a combat encounter headless with a scripted operator")]
struct Args {
    /// Encounter config (JSON). Uses the built-in demo encounter when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "12345")]
    seed: u64,

    /// Give up after this many ticks.
    #[arg(long, default_value = "36000")]
    max_ticks: Tick,

    /// Pace ticks at wall-clock rate and print status every second.
    #[arg(long, short)]
    realtime: bool,

    /// Ticks between strikes on the front enemy while combat is active.
    #[arg(long, default_value = "20")]
    strike_every: Tick,

    #[arg(long, default_value = "50")]
    strike_damage: f32,

    /// Begin combat after this many ticks even if the enemy line never fills.
    #[arg(long, default_value = "1800")]
    begin_after: Tick,

    /// Print the final observation as JSON.
    #[arg(long)]
    dump_observation: bool,
}

/// Scripted stand-in for the player driving the encounter.
struct Operator {
    player: PlayerId,
    strike_every: Tick,
    strike_damage: f32,
    begin_after: Tick,
    begun: bool,
}

impl Operator {
    fn react(&mut self, host: &mut MatchHost<CombatGame>, events: &[CombatEvent]) {
        let tick = host.current_tick();
        let phase = host.game().manager().phase();
        let line_filled = events.contains(&CombatEvent::PhaseEnded {
            phase: CombatPhase::Opening,
        });
        if !self.begun && phase == CombatPhase::Opening && (line_filled || tick >= self.begin_after) {
            if !line_filled {
                warn!(tick, "enemy line never filled, beginning anyway");
            }
            host.submit_now(self.player, CombatAction::BeginCombat);
            self.begun = true;
        }
        if phase == CombatPhase::Active && self.strike_every > 0 && tick % self.strike_every == 0 {
            host.submit_now(
                self.player,
                CombatAction::DamageFrontEnemy {
                    amount: self.strike_damage,
                },
            );
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EncounterConfig::from_path(path)?,
        None => EncounterConfig::default(),
    };
    info!(
        combat = ?config.combat.as_ref().map(|c| c.id.to_string()),
        tick_hz = config.tick_hz,
        seed = args.seed,
        "starting encounter"
    );

    let mut host = MatchHost::<CombatGame>::new(config, args.seed);
    let mut operator = Operator {
        player: host.join_player(),
        strike_every: args.strike_every,
        strike_damage: args.strike_damage,
        begin_after: args.begin_after,
        begun: false,
    };

    let events = if args.realtime {
        run_realtime(&mut host, &mut operator, args.max_ticks).await
    } else {
        run_fast(&mut host, &mut operator, args.max_ticks)
    };

    println!("\n=== Encounter Complete ===");
    println!("Outcome: {:?}", host.is_terminal());
    println!("Final tick: {}", host.current_tick());
    print_status(&host);
    print_event_summary(&events);

    if args.dump_observation {
        let observation = host.game().observe(host.current_tick(), operator.player);
        println!("{}", serde_json::to_string_pretty(&observation)?);
    }
    Ok(())
}

fn run_fast(host: &mut MatchHost<CombatGame>, operator: &mut Operator, max_ticks: Tick) -> Vec<CombatEvent> {
    let mut all_events = Vec::new();
    for _ in 0..max_ticks {
        let Some(events) = host.step_one_tick() else {
            break;
        };
        operator.react(host, &events);
        all_events.extend(events);
    }
    all_events
}

async fn run_realtime(
    host: &mut MatchHost<CombatGame>,
    operator: &mut Operator,
    max_ticks: Tick,
) -> Vec<CombatEvent> {
    let tick_duration = Duration::from_secs_f64(1.0 / host.tick_hz() as f64);
    let mut interval = interval(tick_duration);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_status = Instant::now();
    let mut all_events = Vec::new();

    println!("=== Running in Real-Time Mode ({}Hz) ===", host.tick_hz());
    println!("Press Ctrl+C to stop\n");

    for _ in 0..max_ticks {
        interval.tick().await;

        let Some(events) = host.step_one_tick() else {
            break;
        };
        for event in &events {
            print_event(host.current_tick(), event);
        }
        operator.react(host, &events);
        all_events.extend(events);

        if last_status.elapsed() >= Duration::from_secs(1) {
            print_status(host);
            last_status = Instant::now();
        }
    }
    all_events
}

fn print_event(tick: Tick, event: &CombatEvent) {
    match event {
        CombatEvent::PhaseChanged { from, to } => println!("[{:>6}] Phase {:?} -> {:?}", tick, from, to),
        CombatEvent::PhaseEnded { phase } => println!("[{:>6}] {:?} finished", tick, phase),
        CombatEvent::WaveStarted { number, enemies, .. } => {
            println!("[{:>6}] === Wave {} started ({} enemies) ===", tick, number, enemies)
        }
        CombatEvent::CharacterSpawned { asset, role, .. } => {
            println!("[{:>6}] Spawned {} as {:?}", tick, asset, role)
        }
        CombatEvent::SpawnFailed { asset, reason, .. } => {
            println!("[{:>6}] Spawn of {} failed: {:?}", tick, asset, reason)
        }
        CombatEvent::SpawnSkipped { asset } => println!("[{:>6}] Skipped invalid id {}", tick, asset),
        CombatEvent::CharacterDied { character } => println!("[{:>6}] {:?} died", tick, character),
        CombatEvent::StageAdvanced { stage } => println!("[{:>6}] Stage advanced to {:?}", tick, stage),
        _ => {}
    }
}

fn print_status(host: &MatchHost<CombatGame>) {
    let manager = host.game().manager();
    let time_secs = host.current_tick() as f64 / host.tick_hz() as f64;
    let waves = manager.waves();
    println!(
        "  [{:>5.1}s] {:?}, Waves started: {}, Queue: {}, Heroes: {}, Enemies: {}",
        time_secs,
        manager.phase(),
        waves.waves_started(),
        waves.spawn_queue_len(),
        manager.heroes_in_scene().len(),
        manager.enemies_in_scene().len(),
    );
}

fn print_event_summary(events: &[CombatEvent]) {
    let mut spawned = 0;
    let mut failed = 0;
    let mut died = 0;
    let mut hits = 0;
    let mut waves = 0;

    for event in events {
        match event {
            CombatEvent::CharacterSpawned { .. } => spawned += 1,
            CombatEvent::SpawnFailed { .. } | CombatEvent::SpawnSkipped { .. } => failed += 1,
            CombatEvent::CharacterDied { .. } => died += 1,
            CombatEvent::HealthChanged { .. } => hits += 1,
            CombatEvent::WaveStarted { .. } => waves += 1,
            _ => {}
        }
    }

    println!("\n=== Event Summary ===");
    println!("Waves started: {}", waves);
    println!("Characters spawned: {}", spawned);
    println!("Spawns failed or skipped: {}", failed);
    println!("Health changes: {}", hits);
    println!("Deaths: {}", died);
}
