//! End-to-end decision loop example.
//!
//! Demonstrates: build config → orchestrator → spawn agents → tick in
//! real time against a slow backend → watch the ceiling adapt → reset.
//!
//! Run with `RUST_LOG=debug` to see ceiling changes and throttled ticks.

use std::thread;
use std::time::{Duration, Instant};

use log::info;
use warden_bench::{reference_profile, role_mix};
use warden_engine::{CycleOrchestrator, TickOutcome};
use warden_test_utils::{SeededWorldProvider, SleepBackend};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    println!("=== Warden Decision Loop Example ===\n");

    let mut config = reference_profile();
    config.cycle.decision_interval = Duration::from_millis(20);
    config.admission.reestimate_interval = Duration::from_millis(500);
    let backend = SleepBackend::new(Duration::from_micros(500), Duration::from_micros(400));
    let mut warden =
        CycleOrchestrator::new(config, Box::new(backend), Box::new(SeededWorldProvider::new(42)))
            .unwrap();

    // --- Session 1: a wave of 80 spawn requests ---
    let mut admitted = 0;
    for role in role_mix(80, 42) {
        if warden.on_agent_spawn_requested(role).is_admitted() {
            admitted += 1;
        }
    }
    println!("Session 1: {admitted}/80 agents admitted at the initial ceiling");

    let start = Instant::now();
    let mut decisions = 0usize;
    while start.elapsed() < Duration::from_secs(3) {
        match warden.tick(Instant::now()) {
            TickOutcome::Throttled => thread::sleep(Duration::from_millis(1)),
            TickOutcome::Ran(report) => {
                decisions += warden.drain_decisions().count();
                if let Some(r) = report.reestimate {
                    info!(
                        "cycle {}: ceiling {} -> {}, cost/agent {:?}, latency {:?}",
                        report.cycle,
                        r.old_ceiling,
                        r.new_ceiling,
                        r.estimated_cost,
                        r.recent_latency
                    );
                }
            }
        }
    }

    let limiter = warden.limiter_stats();
    let batching = warden.batching_stats();
    let cycles = warden.cycle_stats();
    println!("  cycles run:        {}", cycles.cycles_run);
    println!("  ticks throttled:   {}", cycles.cycles_throttled);
    println!("  decisions:         {decisions}");
    println!("  ceiling:           {}", limiter.ceiling);
    println!("  active agents:     {}", limiter.active_agents);
    println!("  fallbacks:         {}", limiter.fallback_count);
    println!("  ema latency:       {:?}", limiter.ema_latency);
    println!("  p95 latency:       {:?}", limiter.window_p95);
    println!("  utilization:       {:.2}", limiter.utilization);
    println!("  avg batch size:    {:.1}", batching.avg_batch_size);
    println!("  avg dispatch:      {:?}", batching.avg_dispatch_latency);

    // --- Session 2: reset and spawn again under the fresh ceiling ---
    warden.reset_session(Instant::now());
    let readmitted = role_mix(80, 43)
        .into_iter()
        .filter(|&role| warden.on_agent_spawn_requested(role).is_admitted())
        .count();
    println!("\nSession 2: {readmitted}/80 agents admitted after reset");
    println!("\n=== Done ===");
}
