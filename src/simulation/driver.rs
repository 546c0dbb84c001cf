use std::collections::BTreeSet;

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, warn};

use crate::{
    config::FleetConfig,
    error::Result,
    model::{bin::BinId, vehicle::VehicleId},
};

use super::{
    event_queue::{Event, EventQueue},
    fleet::RouteReport,
    handle::FleetHandle,
};

#[derive(Debug, Clone)]
struct Arrival {
    at: NaiveDateTime,
    vehicle_id: VehicleId,
    assignment_seq: u64,
    bin_id: BinId,
    distance_m: f64,
    duration_s: f64,
}

impl Event for Arrival {
    fn time(&self) -> NaiveDateTime {
        self.at
    }
}

/// Stand-in for the external routing collaborator in headless runs.
///
/// Each busy vehicle drives a straight line to its bin at a fixed speed. When
/// the trip is due the driver reports the route and completes the trip in a
/// single critical section. `time_scale` compresses simulated trip time into
/// wall-clock time.
#[derive(Debug)]
pub struct RouteDriver {
    speed_mps: f64,
    time_scale: f64,
    pending: EventQueue<Arrival>,
    /// Scheduled trips by vehicle and [`Vehicle::assignment_seq`].
    ///
    /// [`Vehicle::assignment_seq`]: crate::model::vehicle::Vehicle::assignment_seq
    en_route: BTreeSet<(VehicleId, u64)>,
}

impl RouteDriver {
    pub fn new(speed_mps: f64, time_scale: f64) -> Self {
        Self {
            speed_mps,
            time_scale,
            pending: EventQueue::new(),
            en_route: BTreeSet::new(),
        }
    }

    pub fn from_config(config: &FleetConfig) -> Self {
        Self::new(
            config.simulation.driver_speed_mps(),
            config.driver.time_scale,
        )
    }

    /// Trips currently on the road.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Schedules newly busy vehicles and finishes every trip due by `now`.
    /// Returns the number of trips completed.
    pub fn poll(&mut self, fleet: &FleetHandle, now: NaiveDateTime) -> Result<usize> {
        self.schedule_departures(fleet, now);

        let mut completed = 0;
        while let Some(arrival) = self.pending.pop_due(now) {
            self.en_route
                .remove(&(arrival.vehicle_id, arrival.assignment_seq));
            let finished = fleet.with(|fleet| -> Result<bool> {
                let vehicle = fleet.vehicle(arrival.vehicle_id)?;
                if vehicle.assignment_seq() != arrival.assignment_seq
                    || vehicle.target_bin() != Some(arrival.bin_id)
                {
                    return Ok(false);
                }
                fleet.record_route_assignment(RouteReport::new(
                    arrival.vehicle_id,
                    arrival.bin_id,
                    arrival.distance_m,
                    arrival.duration_s,
                ))?;
                fleet.complete_trip(arrival.vehicle_id, arrival.bin_id)?;
                Ok(true)
            })?;
            if finished {
                completed += 1;
            } else {
                warn!(
                    vehicle_id = %arrival.vehicle_id,
                    bin_id = %arrival.bin_id,
                    "dropping arrival for a trip that is no longer assigned"
                );
            }
        }
        Ok(completed)
    }

    fn schedule_departures(&mut self, fleet: &FleetHandle, now: NaiveDateTime) {
        let busy: Vec<(VehicleId, u64, BinId, f64)> = fleet.with(|fleet| {
            fleet
                .vehicles()
                .values()
                .filter_map(|v| {
                    let bin_id = v.target_bin()?;
                    let bin = fleet.bins().get(&bin_id)?;
                    Some((
                        v.id,
                        v.assignment_seq(),
                        bin_id,
                        v.position.distance_to(&bin.position),
                    ))
                })
                .collect()
        });

        for (vehicle_id, assignment_seq, bin_id, distance_m) in busy {
            if !self.en_route.insert((vehicle_id, assignment_seq)) {
                continue;
            }
            let duration_s = distance_m / self.speed_mps;
            let wall_ms = (duration_s / self.time_scale * 1000.0).round() as i64;
            let at = now + Duration::milliseconds(wall_ms);
            debug!(
                vehicle_id = %vehicle_id,
                bin_id = %bin_id,
                distance_m,
                duration_s,
                %at,
                "vehicle departed"
            );
            self.pending.push(Arrival {
                at,
                vehicle_id,
                assignment_seq,
                bin_id,
                distance_m,
                duration_s,
            });
        }
    }
}
