// src/lib.rs

pub mod cli;
pub mod clock;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod model;
pub mod queue;
pub mod scheduler;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::clock::{Clock, SystemClock};
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{CoreRuntime, Runtime, RuntimeOptions, SchedulerEvent};
use crate::exec::SimulatedExecutorBackend;
use crate::model::Routine;
use crate::scheduler::Scheduler;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - scheduler / core / runtime
/// - the simulated executor
/// - device registration and routine triggers from the config
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg)?;
        return Ok(());
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scheduler = Scheduler::new(cfg.scheduler.decomposer(), Arc::clone(&clock));

    let (rt_tx, rt_rx) = mpsc::channel::<SchedulerEvent>(64);

    let executor = SimulatedExecutorBackend::new(rt_tx.clone(), cfg.executor.action_duration());

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(SchedulerEvent::ShutdownRequested).await;
        });
    }

    // Devices first, so the routines find their queues.
    info!(devices = ?cfg.devices, "registering device queues");
    for device in &cfg.devices {
        rt_tx
            .send(SchedulerEvent::DeviceRegistered {
                device: device.clone(),
            })
            .await?;
    }

    let now = clock.now();
    for (id, routine) in cfg.routine.iter() {
        rt_tx
            .send(SchedulerEvent::RoutineTriggered(
                routine.trigger_request(id, now)?,
            ))
            .await?;
    }

    let options = RuntimeOptions {
        exit_when_idle: args.once,
    };

    let core = CoreRuntime::new(scheduler, options);
    let runtime = Runtime::new(core, rt_rx, executor);
    runtime.run().await?;
    Ok(())
}

/// Dry-run output: print every routine's decomposition.
fn print_dry_run(cfg: &ConfigFile) -> Result<()> {
    let decomposer = cfg.scheduler.decomposer();
    let now = SystemClock.now();

    println!("rascal dry-run");
    println!("  scheduler.step_increment_ms = {}", cfg.scheduler.step_increment_ms);
    println!("  executor.action_duration_ms = {}", cfg.executor.action_duration_ms);
    println!("  devices = {:?}", cfg.devices);
    println!();

    println!("routines ({}):", cfg.routine.len());
    for (id, rc) in cfg.routine.iter() {
        let routine = Routine::from_request(rc.trigger_request(id, now)?, &SystemClock);
        let subroutines = decomposer.decompose(&routine)?;

        println!("  - {id} ({} steps)", subroutines.len());
        for s in &subroutines {
            let offset = s.start_time() - routine.trigger_time();
            println!(
                "      {} +{}ms target={} actions={}",
                s.id(),
                offset.num_milliseconds(),
                s.target().unwrap_or_default(),
                s.actions().len()
            );
            if !s.predecessors().is_empty() {
                println!("        after: {:?}", s.predecessors());
            }
        }
    }

    debug!("dry-run complete (nothing dispatched)");
    Ok(())
}
