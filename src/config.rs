use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context as _};
use serde::{Deserialize, Deserializer};

use crate::utils::geo::LatLng;

/// Inclusive range of fill percentage added by one fill event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FillRange {
    pub min: u8,
    pub max: u8,
}

impl FillRange {
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    fn validate(&self, name: &str) -> anyhow::Result<()> {
        if self.max == 0 || self.min > self.max {
            bail!("{name} must satisfy 0 < max and min <= max, got {}..={}", self.min, self.max);
        }
        Ok(())
    }
}

/// Parameters the fleet itself consults while running.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub campus_center: LatLng,
    pub vehicle_count: u32,
    /// Vehicles spawn within this many degrees of the campus centre.
    pub vehicle_spread_deg: f64,
    /// Fill added by an explicit `fill_random_bin` call.
    pub manual_fill: FillRange,
    /// Fill added by one autonomous tick.
    pub auto_fill: FillRange,
    pub driver_speed_kmh: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            campus_center: LatLng::new(22.0509, 88.0725),
            vehicle_count: 3,
            vehicle_spread_deg: 0.001,
            manual_fill: FillRange::new(20, 40),
            auto_fill: FillRange::new(10, 25),
            driver_speed_kmh: 20.0,
        }
    }
}

impl SimulationParams {
    pub fn driver_speed_mps(&self) -> f64 {
        self.driver_speed_kmh * 1000.0 / 3600.0
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AutoParams {
    #[serde(deserialize_with = "humantime_duration")]
    pub tick_interval: Duration,
    /// Upper bound of the random delay added to every tick.
    #[serde(deserialize_with = "humantime_duration")]
    pub tick_jitter: Duration,
}

impl Default for AutoParams {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(2),
            tick_jitter: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DriverParams {
    /// How many simulated seconds pass per wall-clock second.
    pub time_scale: f64,
    #[serde(deserialize_with = "humantime_duration")]
    pub poll_interval: Duration,
}

impl Default for DriverParams {
    fn default() -> Self {
        Self {
            time_scale: 10.0,
            poll_interval: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub simulation: SimulationParams,
    pub auto: AutoParams,
    pub driver: DriverParams,
    /// CSV with `id,latitude,longitude,fill`; the campus defaults are used if unset.
    pub bins_csv: Option<PathBuf>,
    pub seed: Option<u64>,
    pub dispatch_log_dir: Option<PathBuf>,
}

impl FleetConfig {
    /// Reads an optional TOML file, then `FLEET__*` environment variables
    /// (`FLEET__AUTO__TICK_INTERVAL=500ms`), on top of the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config: FleetConfig = builder
            .add_source(config::Environment::with_prefix("FLEET").separator("__"))
            .build()
            .context("unable to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let sim = &self.simulation;
        if sim.vehicle_count == 0 {
            bail!("simulation.vehicle_count must be at least 1");
        }
        if !(sim.driver_speed_kmh > 0.0) {
            bail!("simulation.driver_speed_kmh must be positive");
        }
        if !(sim.vehicle_spread_deg >= 0.0) {
            bail!("simulation.vehicle_spread_deg must not be negative");
        }
        sim.manual_fill.validate("simulation.manual_fill")?;
        sim.auto_fill.validate("simulation.auto_fill")?;
        if !(self.driver.time_scale > 0.0) {
            bail!("driver.time_scale must be positive");
        }
        if self.auto.tick_interval.is_zero() {
            bail!("auto.tick_interval must be non-zero");
        }
        Ok(())
    }
}

fn humantime_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(&s).map_err(serde::de::Error::custom)
}
