use ordered_float::OrderedFloat;

use crate::model::{bin::Bin, records::CandidateDistance, vehicle::Vehicle};

use super::Dispatcher;

/// Greedy nearest-vehicle ranking by great-circle distance. Equal distances
/// are ordered by vehicle id.
#[derive(Debug, Default)]
pub struct NearestIdleDispatcher;

impl Dispatcher for NearestIdleDispatcher {
    fn rank(&mut self, bin: &Bin, idle: &[&Vehicle]) -> Vec<CandidateDistance> {
        let mut ranked: Vec<_> = idle
            .iter()
            .map(|v| CandidateDistance {
                vehicle_id: v.id,
                distance_m: v.position.distance_to(&bin.position),
            })
            .collect();
        ranked.sort_by_key(|c| (OrderedFloat(c.distance_m), c.vehicle_id));
        ranked
    }
}
