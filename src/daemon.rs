//! Background escalation daemon.
//!
//! Runs the sweep once at startup and then on a fixed period, so tickets
//! that breached while no process was running are caught immediately. The
//! loop is single-threaded: one sweep pass can never overlap another.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::db::Database;
use crate::engine::Engine;

pub const DEFAULT_PERIOD_SECS: u64 = 60;

fn pid_path(dir: &Path) -> PathBuf {
    dir.join("daemon.pid")
}

fn stop_path(dir: &Path) -> PathBuf {
    dir.join("daemon.stop")
}

pub fn start(dir: &Path, period_secs: u64) -> Result<()> {
    if let Some(pid) = read_pid(dir) {
        bail!(
            "Daemon already running (pid {}). Run 'gridline daemon stop' first.",
            pid
        );
    }

    let exe = std::env::current_exe().context("Failed to locate gridline binary")?;
    let child = Command::new(exe)
        .arg("daemon")
        .arg("run")
        .arg("--dir")
        .arg(dir)
        .arg("--period-secs")
        .arg(period_secs.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("Failed to spawn daemon process")?;

    println!("Started escalation daemon (pid {})", child.id());
    println!("Sweep period: {}s", period_secs);
    Ok(())
}

pub fn stop(dir: &Path) -> Result<()> {
    let pid = match read_pid(dir) {
        Some(p) => p,
        None => {
            println!("Daemon not running.");
            return Ok(());
        }
    };

    fs::write(stop_path(dir), b"stop").context("Failed to write stop file")?;
    println!("Stop requested for daemon (pid {}).", pid);
    println!("The daemon exits at its next tick (within a second).");
    Ok(())
}

pub fn status(dir: &Path) -> Result<()> {
    match read_pid(dir) {
        Some(pid) => println!("Daemon running (pid {})", pid),
        None => println!("Daemon not running."),
    }
    Ok(())
}

/// The daemon loop itself, invoked via the hidden `daemon run` subcommand.
pub fn run_daemon(dir: &Path, period_secs: u64) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let term = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&term))?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&term))?;

    fs::write(pid_path(dir), std::process::id().to_string())
        .context("Failed to write pid file")?;
    let _ = fs::remove_file(stop_path(dir));

    let db_path = dir.join("tickets.db");
    let db = Database::open(&db_path)?;
    let engine = Engine::new(&db);
    let period = Duration::from_secs(period_secs.max(1));

    info!(period_secs, "escalation daemon started");

    // Immediate pass so tickets breached before startup don't wait a period
    run_sweep_pass(&engine);

    let mut last_sweep = Instant::now();
    loop {
        if term.load(Ordering::Relaxed) {
            info!("received shutdown signal");
            break;
        }
        if stop_path(dir).exists() {
            info!("stop requested");
            break;
        }

        if last_sweep.elapsed() >= period {
            run_sweep_pass(&engine);
            last_sweep = Instant::now();
        }

        std::thread::sleep(Duration::from_secs(1));
    }

    let _ = fs::remove_file(pid_path(dir));
    let _ = fs::remove_file(stop_path(dir));
    info!("escalation daemon stopped");
    Ok(())
}

/// A failed sweep logs and waits for the next tick; it never kills the loop.
fn run_sweep_pass(engine: &Engine) {
    match engine.sweep(Utc::now()) {
        Ok(escalated) => {
            if escalated.is_empty() {
                info!("sweep complete, nothing to escalate");
            } else {
                for ticket in &escalated {
                    warn!(
                        ticket = %ticket.ticket_number,
                        priority = %ticket.priority,
                        zone = %ticket.zone,
                        "ticket escalated after SLA breach"
                    );
                }
                info!(count = escalated.len(), "sweep complete");
            }
        }
        Err(e) => error!("sweep failed: {:#}", e),
    }
}

fn read_pid(dir: &Path) -> Option<u32> {
    let raw = fs::read_to_string(pid_path(dir)).ok()?;
    raw.trim().parse().ok()
}
