use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use ulid::Ulid;

use bayline::clock::FixedClock;
use bayline::config::{Config, LockScope};
use bayline::engine::{Collaborators, Engine, EngineError, InMemoryStore};
use bayline::ledger::InMemoryLedger;
use bayline::model::*;

const D0: Ms = 20_000 * ONE_DAY;
/// One-hour slots in a full day.
const SLOTS_PER_DAY: i64 = (DAY_END - DAY_START) / HOUR;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.3}ms, p50={:.3}ms, p95={:.3}ms, p99={:.3}ms, max={:.3}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().unwrap().as_secs_f64() * 1000.0,
    );
}

/// `i`-th one-hour slot counting forward from tomorrow.
fn slot(i: i64) -> (Ms, Ms, Ms) {
    let date = D0 + ONE_DAY + (i / SLOTS_PER_DAY) * ONE_DAY;
    let start = DAY_START + (i % SLOTS_PER_DAY) * HOUR;
    (date, start, start + HOUR)
}

struct Setup {
    engine: Arc<Engine>,
    resources: Vec<Ulid>,
}

async fn setup(config: Config, n_resources: usize) -> Setup {
    let store = Arc::new(InMemoryStore::new());
    let ledger = Arc::new(InMemoryLedger::new(config.service_fee_rate));
    let owner = Ulid::new();
    ledger.open_account(owner, "062-000", "00000001");
    let engine = Arc::new(Engine::with_clock(
        Collaborators::in_memory(store.clone(), ledger),
        config,
        Arc::new(FixedClock::new(D0)),
    ));

    let mut resources = Vec::with_capacity(n_resources);
    for _ in 0..n_resources {
        let id = Ulid::new();
        store.put_resource(Resource {
            id,
            owner_id: owner,
            price_per_hour: Decimal::new(650, 2),
        });
        engine
            .add_window(
                owner,
                id,
                NewWindow {
                    start_date: D0,
                    end_date: None,
                    start_time: DAY_START,
                    end_time: DAY_END,
                },
            )
            .await
            .unwrap();
        resources.push(id);
    }
    Setup { engine, resources }
}

async fn phase1_sequential(config: &Config) {
    let s = setup(config.clone(), 1).await;
    let rid = s.resources[0];

    let n = 2000;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();

    for i in 0..n {
        let (date, from, to) = slot(i as i64);
        let t = Instant::now();
        s.engine
            .create_booking(Ulid::new(), rid, date, from, to)
            .await
            .unwrap();
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} bookings in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("create latency", &mut latencies);
}

async fn phase2_concurrent(config: &Config, scope: LockScope) {
    let config = Config {
        lock_scope: scope,
        ..config.clone()
    };
    let n_tasks = 10;
    let n_per_task = 200;
    let s = setup(config, n_tasks).await;

    let start = Instant::now();
    let mut handles = Vec::new();
    for rid in s.resources.iter().copied() {
        let engine = s.engine.clone();
        handles.push(tokio::spawn(async move {
            let mut latencies = Vec::with_capacity(n_per_task);
            for j in 0..n_per_task {
                let (date, from, to) = slot(j as i64);
                let t = Instant::now();
                engine
                    .create_booking(Ulid::new(), rid, date, from, to)
                    .await
                    .unwrap();
                latencies.push(t.elapsed());
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for h in handles {
        all_latencies.extend(h.await.unwrap());
    }

    let elapsed = start.elapsed();
    let total = n_tasks * n_per_task;
    let ops = total as f64 / elapsed.as_secs_f64();
    println!(
        "  {scope:?}: {n_tasks} tasks x {n_per_task} bookings = {total} total in {:.2}s = {ops:.0} ops/sec",
        elapsed.as_secs_f64()
    );
    print_latency("create latency", &mut all_latencies);
}

async fn phase3_week_under_load(config: &Config) {
    let s = setup(config.clone(), 6).await;
    let read_rid = s.resources[0];

    // Make the week non-trivial: every other hour booked.
    for i in (0..7 * SLOTS_PER_DAY).step_by(2) {
        let (date, from, to) = slot(i);
        s.engine
            .create_booking(Ulid::new(), read_rid, date, from, to)
            .await
            .unwrap();
    }

    let stop = Arc::new(AtomicBool::new(false));
    let mut writer_handles = Vec::new();
    for &wrid in &s.resources[1..] {
        let engine = s.engine.clone();
        let stop = stop.clone();
        writer_handles.push(tokio::spawn(async move {
            let mut i = 0i64;
            while !stop.load(Ordering::Relaxed) {
                let (date, from, to) = slot(i);
                let _ = engine.create_booking(Ulid::new(), wrid, date, from, to).await;
                i += 1;
            }
        }));
    }

    let n_readers = 10;
    let reads_per_reader = 500;
    let mut reader_handles = Vec::new();
    for _ in 0..n_readers {
        let engine = s.engine.clone();
        reader_handles.push(tokio::spawn(async move {
            let mut latencies = Vec::with_capacity(reads_per_reader);
            for _ in 0..reads_per_reader {
                let t = Instant::now();
                engine.week_availability(read_rid, D0 + ONE_DAY).await.unwrap();
                latencies.push(t.elapsed());
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for h in reader_handles {
        all_latencies.extend(h.await.unwrap());
    }

    stop.store(true, Ordering::Relaxed);
    for h in writer_handles {
        let _ = h.await;
    }

    print_latency("week availability", &mut all_latencies);
}

async fn phase4_same_slot_storm(config: &Config) {
    let s = setup(config.clone(), 1).await;
    let rid = s.resources[0];
    let n_requests = 500;
    let (date, from, to) = slot(0);

    let start = Instant::now();
    let mut handles = Vec::new();
    for _ in 0..n_requests {
        let engine = s.engine.clone();
        handles.push(tokio::spawn(async move {
            engine.create_booking(Ulid::new(), rid, date, from, to).await
        }));
    }

    let (mut created, mut conflicts, mut timeouts) = (0, 0, 0);
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => created += 1,
            Err(EngineError::SchedulingConflict(_)) => conflicts += 1,
            Err(EngineError::LockTimeout) => timeouts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(created, 1, "slot double-booked");

    println!(
        "  {n_requests} requests for one slot in {:.2}s: created={created}, conflicts={conflicts}, timeouts={timeouts}",
        start.elapsed().as_secs_f64()
    );
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    println!("=== bayline stress benchmark ===");
    println!(
        "lock_timeout={:?}, lock_scope={:?}\n",
        config.lock_timeout, config.lock_scope
    );

    println!("[phase 1] sequential booking throughput");
    phase1_sequential(&config).await;

    println!("\n[phase 2] concurrent booking throughput");
    phase2_concurrent(&config, LockScope::PerResource).await;
    phase2_concurrent(&config, LockScope::Global).await;

    println!("\n[phase 3] week availability under write load");
    phase3_week_under_load(&config).await;

    println!("\n[phase 4] same-slot storm");
    phase4_same_slot_storm(&config).await;

    println!("\n=== benchmark complete ===");
}
