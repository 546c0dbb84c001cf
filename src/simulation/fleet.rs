use std::collections::BTreeSet;

use anyhow::bail;
use chrono::{Local, NaiveDateTime};
use derivative::Derivative;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    callbacks::log_dispatch::DispatchLogCallback,
    config::{FleetConfig, SimulationParams},
    dispatch::{self, nearest::NearestIdleDispatcher, DispatchArgs, Dispatcher},
    error::{FleetError, Result},
    model::{
        bin::{Bin, BinId, BinMap},
        records::{
            AlertRecord, AssignmentRecord, CandidateDistance, ComparisonRecord,
            DispatchComparison, RouteComparison, SystemStats,
        },
        vehicle::{TripRecord, Vehicle, VehicleId, VehicleMap, VehicleStats},
        Map as _,
    },
    utils::{geo::LatLng, round1},
};

use super::{
    callback::FleetCallback,
    event::FleetEvent,
    random::{RandomSource, RngSource},
};

/// Route summary sent back by the routing collaborator once it has computed
/// the actual path for a trip.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteReport {
    pub vehicle_id: VehicleId,
    pub bin_id: BinId,
    pub distance_m: f64,
    pub duration_s: f64,
    /// Alternatives the collaborator evaluated, if it reports any.
    pub others: Vec<CandidateDistance>,
}

impl RouteReport {
    pub fn new(vehicle_id: VehicleId, bin_id: BinId, distance_m: f64, duration_s: f64) -> Self {
        Self {
            vehicle_id,
            bin_id,
            distance_m,
            duration_s,
            others: Vec::new(),
        }
    }

    fn validate(&self) -> Result<()> {
        let valid = |x: f64| x.is_finite() && x >= 0.0;
        if !valid(self.distance_m) {
            return Err(FleetError::InvalidInput(format!(
                "route distance must be a non-negative number, got {}",
                self.distance_m
            )));
        }
        if !valid(self.duration_s) {
            return Err(FleetError::InvalidInput(format!(
                "route duration must be a non-negative number, got {}",
                self.duration_s
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub assignment: AssignmentRecord,
    pub comparison: DispatchComparison,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssignmentOutcome {
    Assigned(Assignment),
    /// No full, untargeted bin or no idle vehicle. Not a failure.
    NothingToDo,
}

impl AssignmentOutcome {
    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            Self::Assigned(a) => Some(a),
            Self::NothingToDo => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TripCompletion {
    /// The pair was the vehicle's active assignment and counts as a trip.
    Completed,
    /// The pair was not an active assignment; vehicle and bin were reset
    /// without counting a trip.
    Released,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickOutcome {
    /// The bin after filling, if the tick picked a bin that was not full yet.
    pub filled: Option<Bin>,
    pub dispatch: AssignmentOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "UPPERCASE")]
pub enum DriverStatus {
    Idle {
        vehicle_id: VehicleId,
        location: LatLng,
        stats: VehicleStats,
    },
    Assigned {
        vehicle_id: VehicleId,
        location: LatLng,
        assigned_bin: Bin,
        distance_m: f64,
        eta_s: f64,
        stats: VehicleStats,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSnapshot {
    pub bins: Vec<Bin>,
    pub vehicles: Vec<Vehicle>,
    pub assignments: Vec<AssignmentRecord>,
    pub comparisons: Vec<ComparisonRecord>,
    pub alerts: Vec<AlertRecord>,
    pub stats: SystemStats,
    pub running: bool,
}

/// The canonical fleet state and every operation on it.
///
/// `Fleet` is a plain single-owner value; share it between threads through
/// [`super::handle::FleetHandle`].
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Fleet {
    params: SimulationParams,
    bins: BinMap,
    vehicles: VehicleMap,
    assignments: Vec<AssignmentRecord>,
    comparisons: Vec<ComparisonRecord>,
    alerts: Vec<AlertRecord>,
    stats: SystemStats,
    running: bool,
    #[derivative(Debug = "ignore")]
    rng: Box<dyn RandomSource>,
    #[derivative(Debug = "ignore")]
    dispatcher: Box<dyn Dispatcher>,
    #[derivative(Debug = "ignore")]
    callbacks: Vec<Box<dyn FleetCallback>>,
}

impl Fleet {
    pub fn new(
        params: SimulationParams,
        bins: Vec<Bin>,
        vehicles: Vec<Vehicle>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Self {
            params,
            bins: bins.into_iter().collect(),
            vehicles: vehicles.into_iter().collect(),
            assignments: Vec::new(),
            comparisons: Vec::new(),
            alerts: Vec::new(),
            stats: SystemStats::default(),
            running: false,
            rng,
            dispatcher: Box::new(NearestIdleDispatcher),
            callbacks: Vec::new(),
        }
    }

    /// Creates `params.vehicle_count` idle vehicles around the campus centre.
    pub fn spawn(params: SimulationParams, bins: Vec<Bin>, mut rng: Box<dyn RandomSource>) -> Self {
        let vehicles = (1..=params.vehicle_count)
            .map(|id| {
                let position = rng.spawn_position(params.campus_center, params.vehicle_spread_deg);
                Vehicle::new(VehicleId(id), position)
            })
            .collect();
        Self::new(params, bins, vehicles, rng)
    }

    pub fn from_config(config: &FleetConfig) -> anyhow::Result<Self> {
        let bins = match &config.bins_csv {
            Some(path) => Bin::load(path)?,
            None => Bin::campus_defaults(),
        };
        if bins.is_empty() {
            bail!("at least one bin is required");
        }
        let mut fleet = Self::spawn(
            config.simulation.clone(),
            bins,
            Box::new(RngSource::seeded(config.seed)),
        );
        if let Some(dir) = &config.dispatch_log_dir {
            fleet.add_callback(Box::new(DispatchLogCallback::new(dir.clone(), "fleet")));
        }
        info!(
            bins = fleet.bins.len(),
            vehicles = fleet.vehicles.len(),
            seed = ?config.seed,
            "fleet initialised"
        );
        Ok(fleet)
    }

    pub fn with_dispatcher(mut self, dispatcher: Box<dyn Dispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn add_callback(&mut self, callback: Box<dyn FleetCallback>) {
        self.callbacks.push(callback);
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn bins(&self) -> &BinMap {
        &self.bins
    }

    pub fn vehicles(&self) -> &VehicleMap {
        &self.vehicles
    }

    pub fn bin(&self, id: BinId) -> Result<&Bin> {
        self.bins.find(id)
    }

    pub fn vehicle(&self, id: VehicleId) -> Result<&Vehicle> {
        self.vehicles.find(id)
    }

    pub fn assignments(&self) -> &[AssignmentRecord] {
        &self.assignments
    }

    pub fn comparisons(&self) -> &[ComparisonRecord] {
        &self.comparisons
    }

    pub fn alerts(&self) -> &[AlertRecord] {
        &self.alerts
    }

    pub fn stats(&self) -> &SystemStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn snapshot(&self) -> FleetSnapshot {
        FleetSnapshot {
            bins: self.bins.values().cloned().collect(),
            vehicles: self.vehicles.values().cloned().collect(),
            assignments: self.assignments.clone(),
            comparisons: self.comparisons.clone(),
            alerts: self.alerts.clone(),
            stats: self.stats.clone(),
            running: self.running,
        }
    }

    fn now() -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn emit(&mut self, event: FleetEvent, time: NaiveDateTime) {
        match &event {
            FleetEvent::BinFilled { .. } => debug!(?event, "fleet event"),
            _ => info!(?event, "fleet event"),
        }
        if let Some(message) = event.alert_message() {
            self.alerts.push(AlertRecord { time, message });
        }
        for callback in self.callbacks.iter_mut() {
            callback.visit_event(&event, time);
        }
    }

    fn random_bin_id(&mut self) -> Option<BinId> {
        let ids: Vec<BinId> = self.bins.keys().copied().collect();
        if ids.is_empty() {
            return None;
        }
        Some(ids[self.rng.choose_index(ids.len())])
    }

    /// Adds `amount` percent to a bin, marking it full (and alerting) when it
    /// reaches 100.
    pub fn fill_bin(&mut self, bin_id: BinId, amount: u8) -> Result<Bin> {
        let time = Self::now();
        let bin = self.bins.find_mut(bin_id)?;
        let became_full = bin.add_fill(amount);
        let bin = bin.clone();
        self.emit(
            FleetEvent::BinFilled {
                bin_id,
                amount,
                fill: bin.fill(),
            },
            time,
        );
        if became_full {
            self.emit(FleetEvent::BinFull { bin_id }, time);
        }
        Ok(bin)
    }

    /// Fills a uniformly chosen bin by a random amount from the manual fill
    /// range. `None` only when the fleet has no bins.
    pub fn fill_random_bin(&mut self) -> Option<Bin> {
        let bin_id = self.random_bin_id()?;
        let amount = self.rng.fill_amount(self.params.manual_fill);
        self.fill_bin(bin_id, amount).ok()
    }

    /// Pairs at most one idle vehicle with one full, untargeted bin.
    pub fn assign_nearest_full(&mut self) -> AssignmentOutcome {
        let Some(plan) = dispatch::plan(
            self.dispatcher.as_mut(),
            DispatchArgs::new(&self.bins, &self.vehicles),
            self.rng.as_mut(),
        ) else {
            debug!("no full bin or idle vehicle to pair");
            return AssignmentOutcome::NothingToDo;
        };

        let chosen = plan.chosen();
        let bin_id = plan.bin_id;
        match self.vehicles.get_mut(&chosen.vehicle_id) {
            Some(vehicle) if vehicle.is_idle() => vehicle.assign(bin_id),
            _ => {
                warn!(vehicle_id = %chosen.vehicle_id, "dispatcher chose an ineligible vehicle");
                return AssignmentOutcome::NothingToDo;
            }
        }

        let time = Self::now();
        let assignment = AssignmentRecord {
            time,
            vehicle_id: chosen.vehicle_id,
            bin_id,
        };
        let comparison = DispatchComparison {
            time,
            bin_id,
            assigned_vehicle: chosen.vehicle_id,
            assigned_distance_m: round1(chosen.distance_m),
            others: plan
                .others()
                .iter()
                .map(|c| CandidateDistance {
                    distance_m: round1(c.distance_m),
                    ..*c
                })
                .collect(),
        };
        self.assignments.push(assignment.clone());
        self.comparisons
            .push(ComparisonRecord::Dispatch(comparison.clone()));
        for callback in self.callbacks.iter_mut() {
            callback.visit_dispatch(&comparison);
        }
        self.emit(
            FleetEvent::VehicleAssigned {
                vehicle_id: chosen.vehicle_id,
                bin_id,
                distance_m: chosen.distance_m,
            },
            time,
        );

        AssignmentOutcome::Assigned(Assignment {
            assignment,
            comparison,
        })
    }

    /// Ends a trip: the vehicle goes idle and the bin is emptied. Only a pair
    /// matching the vehicle's active assignment counts towards the completed
    /// total; any other known pair is reset and reported as
    /// [`TripCompletion::Released`].
    pub fn complete_trip(&mut self, vehicle_id: VehicleId, bin_id: BinId) -> Result<TripCompletion> {
        let bin_position = self.bins.find(bin_id)?.position;
        let vehicle = self.vehicles.find_mut(vehicle_id)?;
        let matched = vehicle.release() == Some(bin_id);
        if matched {
            vehicle.position = bin_position;
        }
        self.bins.find_mut(bin_id)?.empty();

        let time = Self::now();
        let (completion, event) = if matched {
            self.stats.completed += 1;
            (
                TripCompletion::Completed,
                FleetEvent::TripCompleted { vehicle_id, bin_id },
            )
        } else {
            (
                TripCompletion::Released,
                FleetEvent::VehicleReleased { vehicle_id, bin_id },
            )
        };
        self.emit(event, time);
        Ok(completion)
    }

    /// Records the route the collaborator computed for a trip: history and
    /// distance for the vehicle, distance and average ETA for the system.
    pub fn record_route_assignment(&mut self, report: RouteReport) -> Result<()> {
        report.validate()?;
        self.bins.find(report.bin_id)?;
        let time = Self::now();
        let distance_m = round1(report.distance_m);
        let duration_s = round1(report.duration_s);

        self.vehicles
            .find_mut(report.vehicle_id)?
            .stats
            .record(TripRecord {
                time,
                bin_id: report.bin_id,
                distance_m,
                duration_s,
            });
        self.stats.distance_m += distance_m;
        self.refresh_avg_eta();

        self.comparisons.push(ComparisonRecord::Route(RouteComparison {
            time,
            bin_id: report.bin_id,
            assigned_vehicle: report.vehicle_id,
            route_distance_m: distance_m,
            route_duration_s: duration_s,
            others: report.others,
        }));
        self.emit(
            FleetEvent::RouteRecorded {
                vehicle_id: report.vehicle_id,
                bin_id: report.bin_id,
                distance_m,
                duration_s,
            },
            time,
        );
        Ok(())
    }

    fn refresh_avg_eta(&mut self) {
        let (trips, duration) = self
            .vehicles
            .values()
            .fold((0u32, 0.0), |(trips, duration), v| {
                (trips + v.stats.completed, duration + v.stats.total_duration_s())
            });
        self.stats.avg_eta_s = if trips == 0 {
            0.0
        } else {
            round1(duration / f64::from(trips))
        };
    }

    /// Moves a vehicle to the position the external layer reports for it.
    pub fn report_position(&mut self, vehicle_id: VehicleId, position: LatLng) -> Result<()> {
        let in_range = position.lat.is_finite()
            && position.lng.is_finite()
            && (-90.0..=90.0).contains(&position.lat)
            && (-180.0..=180.0).contains(&position.lng);
        if !in_range {
            return Err(FleetError::InvalidInput(format!(
                "position ({}, {}) is not a valid coordinate",
                position.lat, position.lng
            )));
        }
        self.vehicles.find_mut(vehicle_id)?.position = position;
        Ok(())
    }

    /// Clears every log and stat, re-spawns all vehicles idle and stops auto
    /// mode. Bins keep their fill levels.
    pub fn reset(&mut self) {
        let center = self.params.campus_center;
        let spread = self.params.vehicle_spread_deg;
        for vehicle in self.vehicles.values_mut() {
            vehicle.reset(self.rng.spawn_position(center, spread));
        }
        self.assignments.clear();
        self.comparisons.clear();
        self.alerts.clear();
        self.stats = SystemStats::default();
        self.running = false;
        self.emit(FleetEvent::FleetReset { vehicles_only: false }, Self::now());
    }

    /// Re-spawns all vehicles idle; logs and stats are kept.
    pub fn reset_vehicles_only(&mut self) {
        let center = self.params.campus_center;
        let spread = self.params.vehicle_spread_deg;
        for vehicle in self.vehicles.values_mut() {
            vehicle.release();
            vehicle.position = self.rng.spawn_position(center, spread);
        }
        self.emit(FleetEvent::FleetReset { vehicles_only: true }, Self::now());
    }

    pub fn start_auto(&mut self) {
        self.set_running(true);
    }

    pub fn stop_auto(&mut self) {
        self.set_running(false);
    }

    fn set_running(&mut self, running: bool) {
        if self.running != running {
            self.running = running;
            self.emit(FleetEvent::AutoToggled { running }, Self::now());
        }
    }

    /// One autonomous step: raise a random bin that is not yet full, then try
    /// a single dispatch.
    pub fn tick(&mut self) -> TickOutcome {
        let mut filled = None;
        if let Some(bin_id) = self.random_bin_id() {
            if self.bins.get(&bin_id).is_some_and(|b| !b.is_full()) {
                let amount = self.rng.fill_amount(self.params.auto_fill);
                filled = self.fill_bin(bin_id, amount).ok();
            }
        }
        TickOutcome {
            filled,
            dispatch: self.assign_nearest_full(),
        }
    }

    /// Runs [`Fleet::tick`] only while auto mode is on.
    pub fn tick_if_running(&mut self) -> Option<TickOutcome> {
        self.running.then(|| self.tick())
    }

    /// Where the driver of `vehicle_id` should be heading, with a straight-line
    /// distance and ETA at the configured driver speed.
    pub fn driver_status(&self, vehicle_id: VehicleId) -> Result<DriverStatus> {
        let vehicle = self.vehicles.find(vehicle_id)?;
        let Some(bin_id) = vehicle.target_bin() else {
            return Ok(DriverStatus::Idle {
                vehicle_id,
                location: vehicle.position,
                stats: vehicle.stats.clone(),
            });
        };
        let bin = self.bins.find(bin_id)?;
        let distance_m = vehicle.position.distance_to(&bin.position);
        Ok(DriverStatus::Assigned {
            vehicle_id,
            location: vehicle.position,
            assigned_bin: bin.clone(),
            distance_m: round1(distance_m),
            eta_s: round1(distance_m / self.params.driver_speed_mps()),
            stats: vehicle.stats.clone(),
        })
    }

    pub fn driver_stats(&self, vehicle_id: VehicleId) -> Result<VehicleStats> {
        Ok(self.vehicles.find(vehicle_id)?.stats.clone())
    }

    /// Consistency problems in the current state; empty when healthy.
    pub fn audit(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for bin in self.bins.values() {
            if bin.is_full() != (bin.fill() >= crate::model::bin::FULL_LEVEL) {
                problems.push(format!("bin {} has fill {} but status {:?}", bin.id, bin.fill(), bin.status()));
            }
        }
        let mut targeted = BTreeSet::new();
        for vehicle in self.vehicles.values() {
            if let Some(bin_id) = vehicle.target_bin() {
                if !targeted.insert(bin_id) {
                    problems.push(format!("bin {bin_id} is targeted by more than one vehicle"));
                }
                if !self.bins.contains_key(&bin_id) {
                    problems.push(format!("vehicle {} targets unknown bin {bin_id}", vehicle.id));
                }
            }
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        model::{bin::BinStatus, vehicle::VehicleStatus, Map as _},
        simulation::random::ScriptedSource,
    };

    use super::*;

    const BIN_1: LatLng = LatLng::new(22.0513, 88.0721);

    fn north_of(p: LatLng, meters: f64) -> LatLng {
        LatLng::new(p.lat + meters / 111_195.0, p.lng)
    }

    /// Bin 1 full; vehicle 1 ("A") 10 m away, vehicle 2 ("B") 50 m away.
    fn two_vehicle_fleet() -> Fleet {
        let bins = vec![
            Bin::new(BinId(1), BIN_1, 100),
            Bin::new(BinId(2), LatLng::new(22.0506, 88.0712), 30),
        ];
        let vehicles = vec![
            Vehicle::new(VehicleId(1), north_of(BIN_1, 10.0)),
            Vehicle::new(VehicleId(2), north_of(BIN_1, 50.0)),
        ];
        Fleet::new(
            SimulationParams::default(),
            bins,
            vehicles,
            Box::new(ScriptedSource::default()),
        )
    }

    fn campus_fleet(source: ScriptedSource) -> Fleet {
        Fleet::spawn(
            SimulationParams::default(),
            Bin::campus_defaults(),
            Box::new(source),
        )
    }

    #[test]
    fn test_spawn_creates_idle_vehicles() {
        let fleet = campus_fleet(ScriptedSource::default());
        assert_eq!(fleet.vehicles().len(), 3);
        assert!(fleet.vehicles().values().all(Vehicle::is_idle));
        assert!(!fleet.is_running());
        assert!(fleet.audit().is_empty());
    }

    #[test]
    fn test_fill_random_until_full_alerts_once() {
        // bin 3 is the third bin in id order
        let mut fleet = campus_fleet(ScriptedSource::picking([2]).with_fill(25));
        fleet.bins.find_mut(BinId(3)).unwrap().add_fill(40);
        assert_eq!(fleet.bin(BinId(3)).unwrap().fill(), 90);

        let bin = fleet.fill_random_bin().unwrap();
        assert_eq!(bin.id, BinId(3));
        assert_eq!(bin.fill(), 100);
        assert_eq!(bin.status(), BinStatus::Full);
        assert_eq!(fleet.alerts().len(), 1);
        assert_eq!(fleet.alerts()[0].message, "Bin 3 is FULL and sent an alert");

        // filling a full bin neither overflows nor alerts again
        let bin = fleet.fill_random_bin().unwrap();
        assert_eq!(bin.fill(), 100);
        assert_eq!(fleet.alerts().len(), 1);
    }

    #[test]
    fn test_fill_unknown_bin() {
        let mut fleet = two_vehicle_fleet();
        assert_eq!(
            fleet.fill_bin(BinId(99), 10),
            Err(FleetError::BinNotFound(BinId(99)))
        );
    }

    #[test]
    fn test_assign_picks_nearest() {
        let mut fleet = two_vehicle_fleet();
        let outcome = fleet.assign_nearest_full();
        let assigned = outcome.assignment().expect("an assignment");

        assert_eq!(assigned.assignment.vehicle_id, VehicleId(1));
        assert_eq!(assigned.assignment.bin_id, BinId(1));
        assert_eq!(
            fleet.vehicle(VehicleId(1)).unwrap().status(),
            VehicleStatus::Busy(BinId(1))
        );
        assert!(fleet.vehicle(VehicleId(2)).unwrap().is_idle());

        let comparison = &assigned.comparison;
        assert!((comparison.assigned_distance_m - 10.0).abs() < 0.2);
        assert_eq!(comparison.others.len(), 1);
        assert_eq!(comparison.others[0].vehicle_id, VehicleId(2));
        assert!((comparison.others[0].distance_m - 50.0).abs() < 0.2);

        assert_eq!(fleet.assignments().len(), 1);
        assert_eq!(fleet.comparisons().len(), 1);
        assert_eq!(fleet.alerts().len(), 1);
        assert!(fleet.alerts()[0].message.starts_with("Vehicle 1 accepted task for Bin 1"));
    }

    #[test]
    fn test_assign_orders_others_by_distance() {
        let vehicles = [(1, 80.0), (2, 30.0), (3, 200.0), (4, 55.0), (5, 120.0)]
            .into_iter()
            .map(|(id, meters)| Vehicle::new(VehicleId(id), north_of(BIN_1, meters)))
            .collect();
        let mut fleet = Fleet::new(
            SimulationParams::default(),
            vec![Bin::new(BinId(1), BIN_1, 100)],
            vehicles,
            Box::new(ScriptedSource::default()),
        );

        let outcome = fleet.assign_nearest_full();
        let comparison = &outcome.assignment().expect("an assignment").comparison;
        assert_eq!(comparison.assigned_vehicle, VehicleId(2));
        assert_eq!(
            comparison.others.iter().map(|c| c.vehicle_id).collect::<Vec<_>>(),
            vec![VehicleId(4), VehicleId(1), VehicleId(5), VehicleId(3)]
        );
        assert!(comparison
            .others
            .windows(2)
            .all(|w| w[0].distance_m <= w[1].distance_m));
        assert!(comparison
            .others
            .iter()
            .all(|c| c.distance_m >= comparison.assigned_distance_m));
    }

    #[test]
    fn test_assign_never_double_targets() {
        let mut fleet = two_vehicle_fleet();
        assert!(fleet.assign_nearest_full().assignment().is_some());
        // bin 1 is already targeted and bin 2 is not full
        assert_eq!(fleet.assign_nearest_full(), AssignmentOutcome::NothingToDo);
        assert_eq!(fleet.assignments().len(), 1);
        assert!(fleet.audit().is_empty());
    }

    #[test]
    fn test_assign_with_no_idle_vehicle() {
        let mut fleet = two_vehicle_fleet();
        fleet.fill_bin(BinId(2), 100).unwrap();
        assert!(fleet.assign_nearest_full().assignment().is_some());
        assert!(fleet.assign_nearest_full().assignment().is_some());
        fleet.complete_trip(VehicleId(1), BinId(1)).unwrap();
        fleet.fill_bin(BinId(1), 100).unwrap();
        fleet.vehicles.find_mut(VehicleId(1)).unwrap().assign(BinId(1));
        assert_eq!(fleet.assign_nearest_full(), AssignmentOutcome::NothingToDo);
    }

    #[test]
    fn test_complete_trip_after_assignment() {
        let mut fleet = two_vehicle_fleet();
        fleet.assign_nearest_full();
        let completion = fleet.complete_trip(VehicleId(1), BinId(1)).unwrap();

        assert_eq!(completion, TripCompletion::Completed);
        let vehicle = fleet.vehicle(VehicleId(1)).unwrap();
        assert!(vehicle.is_idle());
        assert_eq!(vehicle.target_bin(), None);
        assert_eq!(vehicle.position, BIN_1);
        let bin = fleet.bin(BinId(1)).unwrap();
        assert_eq!(bin.fill(), 0);
        assert_eq!(bin.status(), BinStatus::Ok);
        assert_eq!(fleet.stats().completed, 1);
        assert_eq!(
            fleet.alerts().last().unwrap().message,
            "Vehicle 1 completed trip for Bin 1"
        );
    }

    #[test]
    fn test_complete_trip_without_assignment_is_not_counted() {
        let mut fleet = two_vehicle_fleet();
        let before = fleet.vehicle(VehicleId(2)).unwrap().position;
        let completion = fleet.complete_trip(VehicleId(2), BinId(1)).unwrap();

        assert_eq!(completion, TripCompletion::Released);
        assert!(fleet.vehicle(VehicleId(2)).unwrap().is_idle());
        assert_eq!(fleet.vehicle(VehicleId(2)).unwrap().position, before);
        assert_eq!(fleet.bin(BinId(1)).unwrap().fill(), 0);
        assert_eq!(fleet.stats().completed, 0);
        assert_eq!(fleet.alerts().len(), 1);
    }

    #[test]
    fn test_complete_trip_unknown_ids() {
        let mut fleet = two_vehicle_fleet();
        assert_eq!(
            fleet.complete_trip(VehicleId(9), BinId(1)),
            Err(FleetError::VehicleNotFound(VehicleId(9)))
        );
        assert_eq!(
            fleet.complete_trip(VehicleId(1), BinId(9)),
            Err(FleetError::BinNotFound(BinId(9)))
        );
        // nothing was touched
        assert!(fleet.bin(BinId(1)).unwrap().is_full());
        assert!(fleet.alerts().is_empty());
    }

    #[test]
    fn test_record_route_updates_stats() {
        let mut fleet = two_vehicle_fleet();
        fleet
            .record_route_assignment(RouteReport::new(VehicleId(1), BinId(1), 300.04, 60.0))
            .unwrap();
        fleet
            .record_route_assignment(RouteReport::new(VehicleId(2), BinId(2), 100.0, 30.0))
            .unwrap();

        let stats = fleet.driver_stats(VehicleId(1)).unwrap();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.distance_m, 300.0);
        assert_eq!(stats.history[0].bin_id, BinId(1));
        assert_eq!(stats.history[0].duration_s, 60.0);

        assert_eq!(fleet.stats().distance_m, 400.0);
        assert_eq!(fleet.stats().avg_eta_s, 45.0);
        // completed trips are counted by complete_trip only
        assert_eq!(fleet.stats().completed, 0);

        let route = match &fleet.comparisons()[1] {
            ComparisonRecord::Route(route) => route,
            other => panic!("expected a route comparison, got {other:?}"),
        };
        assert_eq!(route.assigned_vehicle, VehicleId(2));
        assert_eq!(route.route_duration_s, 30.0);
    }

    #[test]
    fn test_record_route_rejects_negative_values() {
        let mut fleet = two_vehicle_fleet();
        for report in [
            RouteReport::new(VehicleId(1), BinId(1), -1.0, 10.0),
            RouteReport::new(VehicleId(1), BinId(1), 10.0, -0.5),
            RouteReport::new(VehicleId(1), BinId(1), f64::NAN, 10.0),
            RouteReport::new(VehicleId(1), BinId(1), 10.0, f64::INFINITY),
        ] {
            assert!(matches!(
                fleet.record_route_assignment(report),
                Err(FleetError::InvalidInput(_))
            ));
        }
        assert_eq!(fleet.stats(), &SystemStats::default());
        assert!(fleet.comparisons().is_empty());
    }

    #[test]
    fn test_record_route_unknown_vehicle() {
        let mut fleet = two_vehicle_fleet();
        assert_eq!(
            fleet.record_route_assignment(RouteReport::new(VehicleId(7), BinId(1), 1.0, 1.0)),
            Err(FleetError::VehicleNotFound(VehicleId(7)))
        );
        assert_eq!(fleet.stats().distance_m, 0.0);
    }

    #[test]
    fn test_reset_restores_everything() {
        let mut fleet = two_vehicle_fleet();
        fleet.start_auto();
        fleet.assign_nearest_full();
        fleet
            .record_route_assignment(RouteReport::new(VehicleId(1), BinId(1), 50.0, 10.0))
            .unwrap();
        fleet.complete_trip(VehicleId(1), BinId(1)).unwrap();

        fleet.reset();

        assert!(fleet.vehicles().values().all(Vehicle::is_idle));
        assert!(fleet
            .vehicles()
            .values()
            .all(|v| v.stats == VehicleStats::default()));
        assert!(fleet.assignments().is_empty());
        assert!(fleet.comparisons().is_empty());
        assert!(fleet.alerts().is_empty());
        assert_eq!(fleet.stats(), &SystemStats::default());
        assert!(!fleet.is_running());
        // scripted source spawns on the campus centre
        assert!(fleet
            .vehicles()
            .values()
            .all(|v| v.position == SimulationParams::default().campus_center));
    }

    #[test]
    fn test_reset_vehicles_only_keeps_logs() {
        let mut fleet = two_vehicle_fleet();
        fleet.start_auto();
        fleet.assign_nearest_full();
        fleet.reset_vehicles_only();

        assert!(fleet.vehicles().values().all(Vehicle::is_idle));
        assert_eq!(fleet.assignments().len(), 1);
        assert!(fleet.is_running());
        // bin 1 is still full and untargeted, so it can be dispatched again
        assert!(fleet.assign_nearest_full().assignment().is_some());
    }

    #[test]
    fn test_tick_only_fills_bins_that_are_not_full() {
        // always picks bin 1, which is already full
        let mut fleet = two_vehicle_fleet();
        fleet.start_auto();
        let outcome = fleet.tick_if_running().unwrap();
        assert!(outcome.filled.is_none());
        assert!(outcome.dispatch.assignment().is_some());

        fleet.stop_auto();
        assert!(fleet.tick_if_running().is_none());
    }

    #[test]
    fn test_tick_fills_and_dispatches() {
        let mut fleet = campus_fleet(ScriptedSource::picking([2]).with_fill(25));
        fleet.start_auto();
        let mut dispatched = None;
        for _ in 0..3 {
            let outcome = fleet.tick();
            if let Some(a) = outcome.dispatch.assignment() {
                dispatched = Some(a.assignment.bin_id);
            }
        }
        // 50 + 25 + 25 = 100 on the second tick
        assert_eq!(dispatched, Some(BinId(3)));
        assert_eq!(fleet.bin(BinId(3)).unwrap().fill(), 100);
        assert_eq!(fleet.vehicles().idle().count(), 2);
    }

    #[test]
    fn test_driver_status() {
        let mut fleet = two_vehicle_fleet();
        assert!(matches!(
            fleet.driver_status(VehicleId(1)).unwrap(),
            DriverStatus::Idle { .. }
        ));
        fleet.assign_nearest_full();
        match fleet.driver_status(VehicleId(1)).unwrap() {
            DriverStatus::Assigned {
                assigned_bin,
                distance_m,
                eta_s,
                ..
            } => {
                assert_eq!(assigned_bin.id, BinId(1));
                assert!((distance_m - 10.0).abs() < 0.2);
                // 10 m at 20 km/h
                assert!((eta_s - 1.8).abs() < 0.1);
            }
            other => panic!("expected an assignment, got {other:?}"),
        }
        assert_eq!(
            fleet.driver_status(VehicleId(5)),
            Err(FleetError::VehicleNotFound(VehicleId(5)))
        );
    }

    #[test]
    fn test_report_position() {
        let mut fleet = two_vehicle_fleet();
        let p = LatLng::new(22.05, 88.07);
        fleet.report_position(VehicleId(2), p).unwrap();
        assert_eq!(fleet.vehicle(VehicleId(2)).unwrap().position, p);
        assert!(matches!(
            fleet.report_position(VehicleId(2), LatLng::new(91.0, 0.0)),
            Err(FleetError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_snapshot_is_stable() {
        let fleet = campus_fleet(ScriptedSource::default());
        assert_eq!(fleet.snapshot(), fleet.snapshot());
        assert_eq!(fleet.snapshot().bins.len(), 5);
    }

    #[derive(Default)]
    struct Recorder(std::sync::Arc<parking_lot::Mutex<Vec<FleetEvent>>>);

    impl FleetCallback for Recorder {
        fn visit_event(&mut self, event: &FleetEvent, _time: NaiveDateTime) {
            self.0.lock().push(event.clone());
        }
    }

    #[test]
    fn test_callbacks_see_events_in_order() {
        let events = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut fleet = two_vehicle_fleet();
        fleet.add_callback(Box::new(Recorder(events.clone())));
        fleet.assign_nearest_full();
        fleet.complete_trip(VehicleId(1), BinId(1)).unwrap();

        let events = events.lock();
        assert!(matches!(events[0], FleetEvent::VehicleAssigned { vehicle_id: VehicleId(1), .. }));
        assert_eq!(
            events[1],
            FleetEvent::TripCompleted {
                vehicle_id: VehicleId(1),
                bin_id: BinId(1)
            }
        );
    }
}
