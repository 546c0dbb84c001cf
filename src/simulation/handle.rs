use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    error::Result,
    model::{
        bin::{Bin, BinId},
        records::{AlertRecord, AssignmentRecord, ComparisonRecord, SystemStats},
        vehicle::{Vehicle, VehicleId, VehicleStats},
    },
    utils::geo::LatLng,
};

use super::fleet::{
    AssignmentOutcome, DriverStatus, Fleet, FleetSnapshot, RouteReport, TickOutcome,
    TripCompletion,
};

/// Shared access to one [`Fleet`]. Every call holds the same lock for its
/// whole duration, so no caller ever observes a half-applied change and reset
/// never interleaves with a dispatch.
#[derive(Debug, Clone)]
pub struct FleetHandle {
    inner: Arc<Mutex<Fleet>>,
}

impl FleetHandle {
    pub fn new(fleet: Fleet) -> Self {
        Self {
            inner: Arc::new(Mutex::new(fleet)),
        }
    }

    /// Runs `f` inside the critical section. Use this to combine several
    /// operations into one atomic step.
    pub fn with<T>(&self, f: impl FnOnce(&mut Fleet) -> T) -> T {
        let mut fleet = self.inner.lock();
        f(&mut *fleet)
    }

    pub fn list_bins(&self) -> Vec<Bin> {
        self.with(|fleet| fleet.bins().values().cloned().collect())
    }

    pub fn list_vehicles(&self) -> Vec<Vehicle> {
        self.with(|fleet| fleet.vehicles().values().cloned().collect())
    }

    pub fn list_assignments(&self) -> Vec<AssignmentRecord> {
        self.with(|fleet| fleet.assignments().to_vec())
    }

    pub fn list_comparisons(&self) -> Vec<ComparisonRecord> {
        self.with(|fleet| fleet.comparisons().to_vec())
    }

    pub fn list_alerts(&self) -> Vec<AlertRecord> {
        self.with(|fleet| fleet.alerts().to_vec())
    }

    pub fn stats(&self) -> SystemStats {
        self.with(|fleet| fleet.stats().clone())
    }

    pub fn snapshot(&self) -> FleetSnapshot {
        self.with(|fleet| fleet.snapshot())
    }

    pub fn fill_random_bin(&self) -> Option<Bin> {
        self.with(Fleet::fill_random_bin)
    }

    pub fn fill_bin(&self, bin_id: BinId, amount: u8) -> Result<Bin> {
        self.with(|fleet| fleet.fill_bin(bin_id, amount))
    }

    pub fn assign_nearest_full(&self) -> AssignmentOutcome {
        self.with(Fleet::assign_nearest_full)
    }

    pub fn complete_trip(&self, vehicle_id: VehicleId, bin_id: BinId) -> Result<TripCompletion> {
        self.with(|fleet| fleet.complete_trip(vehicle_id, bin_id))
    }

    pub fn record_route_assignment(&self, report: RouteReport) -> Result<()> {
        self.with(|fleet| fleet.record_route_assignment(report))
    }

    pub fn report_position(&self, vehicle_id: VehicleId, position: LatLng) -> Result<()> {
        self.with(|fleet| fleet.report_position(vehicle_id, position))
    }

    pub fn reset(&self) {
        self.with(Fleet::reset)
    }

    pub fn reset_vehicles_only(&self) {
        self.with(Fleet::reset_vehicles_only)
    }

    pub fn start_auto(&self) {
        self.with(Fleet::start_auto)
    }

    pub fn stop_auto(&self) {
        self.with(Fleet::stop_auto)
    }

    pub fn is_running(&self) -> bool {
        self.with(|fleet| fleet.is_running())
    }

    pub fn tick_if_running(&self) -> Option<TickOutcome> {
        self.with(Fleet::tick_if_running)
    }

    pub fn driver_status(&self, vehicle_id: VehicleId) -> Result<DriverStatus> {
        self.with(|fleet| fleet.driver_status(vehicle_id))
    }

    pub fn driver_stats(&self, vehicle_id: VehicleId) -> Result<VehicleStats> {
        self.with(|fleet| fleet.driver_stats(vehicle_id))
    }
}
