use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use bin_dispatch::{
    callbacks::dump_json,
    config::FleetConfig,
    simulation::{auto::AutoLoop, driver::RouteDriver, fleet::Fleet, handle::FleetHandle},
};
use chrono::Local;
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless campus bin dispatch simulation", long_about = None)]
struct Args {
    /// TOML config file; `FLEET__*` environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for every random decision
    #[arg(short, long)]
    seed: Option<u64>,

    /// How long to run, e.g. `30s` or `2m`
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    run_for: Duration,

    /// Write the final state as JSON
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut config = FleetConfig::load(args.config.as_deref())?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let fleet = FleetHandle::new(Fleet::from_config(&config)?);
    let mut driver = RouteDriver::from_config(&config);
    fleet.start_auto();
    let auto = AutoLoop::spawn(fleet.clone(), config.auto.clone())?;

    info!(run_for = %humantime::format_duration(args.run_for), "simulation running");
    let started = Instant::now();
    while started.elapsed() < args.run_for {
        let completed = driver.poll(&fleet, Local::now().naive_local())?;
        if completed > 0 {
            info!(completed, en_route = driver.pending(), "trips finished");
        }
        thread::sleep(config.driver.poll_interval);
    }

    fleet.stop_auto();
    auto.shutdown();

    let stats = fleet.stats();
    info!(
        completed = stats.completed,
        distance_m = stats.distance_m,
        avg_eta_s = stats.avg_eta_s,
        "simulation finished"
    );
    for problem in fleet.with(|fleet| fleet.audit()) {
        warn!("{problem}");
    }

    if let Some(path) = &args.snapshot {
        dump_json(path, &fleet.snapshot())?;
        info!(path = %path.display(), "snapshot written");
    }
    Ok(())
}
