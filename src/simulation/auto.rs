use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::Context as _;
use humantime::format_duration;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::AutoParams;

use super::handle::FleetHandle;

/// Background worker that ticks the fleet while auto mode is on.
///
/// The worker lives until [`AutoLoop::shutdown`]; `start_auto`/`stop_auto`
/// on the fleet only decide whether a wake-up does any work. A tick that has
/// started always runs to completion.
#[derive(Debug)]
pub struct AutoLoop {
    shutdown: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl AutoLoop {
    pub fn spawn(fleet: FleetHandle, params: AutoParams) -> anyhow::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        info!(
            interval = %format_duration(params.tick_interval),
            jitter = %format_duration(params.tick_jitter),
            "starting auto loop"
        );
        let thread = thread::Builder::new()
            .name("fleet-auto".into())
            .spawn(move || run(fleet, params, flag))
            .context("unable to spawn the auto loop thread")?;
        Ok(Self { shutdown, thread })
    }

    /// Stops the worker after any in-flight tick and waits for it to exit.
    pub fn shutdown(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.thread.thread().unpark();
        if self.thread.join().is_err() {
            tracing::error!("auto loop thread panicked");
        }
    }
}

fn next_delay(params: &AutoParams, rng: &mut SmallRng) -> Duration {
    if params.tick_jitter.is_zero() {
        return params.tick_interval;
    }
    params.tick_interval + rng.random_range(Duration::ZERO..=params.tick_jitter)
}

fn run(fleet: FleetHandle, params: AutoParams, shutdown: Arc<AtomicBool>) {
    let mut rng = SmallRng::from_os_rng();
    let mut ticks = 0u64;
    while !shutdown.load(Ordering::SeqCst) {
        if let Some(outcome) = fleet.tick_if_running() {
            ticks += 1;
            debug!(
                tick = ticks,
                filled = ?outcome.filled.as_ref().map(|b| (b.id, b.fill())),
                assigned = outcome.dispatch.assignment().is_some(),
                "auto tick"
            );
        }
        thread::park_timeout(next_delay(&params, &mut rng));
    }
    info!(ticks, "auto loop stopped");
}
