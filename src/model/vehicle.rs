use std::fmt::{Debug, Display};

use chrono::NaiveDateTime;
use serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};

use crate::{define_map, error::FleetError, utils::geo::LatLng};

use super::{bin::BinId, EntityId};

#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub u32);

impl Debug for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl EntityId for VehicleId {
    fn not_found(self) -> FleetError {
        FleetError::VehicleNotFound(self)
    }
}

/// Assignment state. A busy vehicle always carries its target bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleStatus {
    Idle,
    Busy(BinId),
}

impl Serialize for VehicleStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (status, target_bin) = match self {
            Self::Idle => ("IDLE", None),
            Self::Busy(bin_id) => ("BUSY", Some(bin_id)),
        };
        let mut state = serializer.serialize_struct("VehicleStatus", 2)?;
        state.serialize_field("status", status)?;
        state.serialize_field("target_bin", &target_bin)?;
        state.end()
    }
}

/// One finished trip as reported by the routing collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripRecord {
    pub time: NaiveDateTime,
    pub bin_id: BinId,
    pub distance_m: f64,
    pub duration_s: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleStats {
    pub completed: u32,
    pub distance_m: f64,
    pub history: Vec<TripRecord>,
}

impl VehicleStats {
    pub fn record(&mut self, trip: TripRecord) {
        self.completed += 1;
        self.distance_m += trip.distance_m;
        self.history.push(trip);
    }

    pub fn total_duration_s(&self) -> f64 {
        self.history.iter().map(|t| t.duration_s).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    pub id: VehicleId,
    #[serde(flatten)]
    pub position: LatLng,
    #[serde(flatten)]
    status: VehicleStatus,
    pub stats: VehicleStats,
    /// Bumped on every assignment and never reset, so a trip can be told
    /// apart from a later trip to the same bin.
    #[serde(skip)]
    assignment_seq: u64,
}

impl Vehicle {
    pub fn new(id: VehicleId, position: LatLng) -> Self {
        Self {
            id,
            position,
            status: VehicleStatus::Idle,
            stats: VehicleStats::default(),
            assignment_seq: 0,
        }
    }

    pub fn status(&self) -> VehicleStatus {
        self.status
    }

    pub fn is_idle(&self) -> bool {
        self.status == VehicleStatus::Idle
    }

    pub fn target_bin(&self) -> Option<BinId> {
        match self.status {
            VehicleStatus::Idle => None,
            VehicleStatus::Busy(bin_id) => Some(bin_id),
        }
    }

    pub fn assign(&mut self, bin_id: BinId) {
        self.status = VehicleStatus::Busy(bin_id);
        self.assignment_seq += 1;
    }

    /// Identifies the current (or last) assignment.
    pub fn assignment_seq(&self) -> u64 {
        self.assignment_seq
    }

    /// Returns the bin the vehicle was heading to, if any.
    pub fn release(&mut self) -> Option<BinId> {
        let target = self.target_bin();
        self.status = VehicleStatus::Idle;
        target
    }

    /// Back to idle at `position` with all per-vehicle stats cleared.
    pub fn reset(&mut self, position: LatLng) {
        self.position = position;
        self.status = VehicleStatus::Idle;
        self.stats = VehicleStats::default();
    }
}

define_map!(VehicleId, Vehicle, VehicleMap);

impl VehicleMap {
    pub fn targeting(&self, bin_id: BinId) -> Option<&Vehicle> {
        self.values().find(|v| v.target_bin() == Some(bin_id))
    }

    pub fn idle(&self) -> impl Iterator<Item = &Vehicle> {
        self.values().filter(|v| v.is_idle())
    }
}
