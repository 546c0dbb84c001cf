use chrono::NaiveDateTime;
use serde::Serialize;

use super::{bin::BinId, vehicle::VehicleId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentRecord {
    pub time: NaiveDateTime,
    pub vehicle_id: VehicleId,
    pub bin_id: BinId,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateDistance {
    pub vehicle_id: VehicleId,
    pub distance_m: f64,
}

/// Audit trail of one dispatch decision: the chosen vehicle and every other
/// idle candidate that was considered, nearest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchComparison {
    pub time: NaiveDateTime,
    pub bin_id: BinId,
    pub assigned_vehicle: VehicleId,
    pub assigned_distance_m: f64,
    pub others: Vec<CandidateDistance>,
}

/// A route reported back by the routing collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteComparison {
    pub time: NaiveDateTime,
    pub bin_id: BinId,
    pub assigned_vehicle: VehicleId,
    pub route_distance_m: f64,
    pub route_duration_s: f64,
    pub others: Vec<CandidateDistance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComparisonRecord {
    Dispatch(DispatchComparison),
    Route(RouteComparison),
}

impl ComparisonRecord {
    pub fn bin_id(&self) -> BinId {
        match self {
            Self::Dispatch(c) => c.bin_id,
            Self::Route(c) => c.bin_id,
        }
    }

    pub fn as_dispatch(&self) -> Option<&DispatchComparison> {
        match self {
            Self::Dispatch(c) => Some(c),
            Self::Route(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    pub time: NaiveDateTime,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemStats {
    pub completed: u32,
    pub distance_m: f64,
    pub avg_eta_s: f64,
}
