pub mod nearest;

use crate::{
    model::{
        bin::{Bin, BinId, BinMap},
        records::CandidateDistance,
        vehicle::{Vehicle, VehicleMap},
    },
    simulation::random::RandomSource,
};

/// Orders idle vehicles for servicing one bin.
pub trait Dispatcher: Send {
    /// Returns every vehicle in `idle` ranked best first, with its distance
    /// to `bin` in meters.
    fn rank(&mut self, bin: &Bin, idle: &[&Vehicle]) -> Vec<CandidateDistance>;
}

pub struct DispatchArgs<'a> {
    pub bins: &'a BinMap,
    pub vehicles: &'a VehicleMap,
}

impl<'a> DispatchArgs<'a> {
    pub fn new(bins: &'a BinMap, vehicles: &'a VehicleMap) -> Self {
        Self { bins, vehicles }
    }

    /// Full bins that no vehicle is heading to yet.
    pub fn candidate_bins(&self) -> Vec<&'a Bin> {
        self.bins
            .values()
            .filter(|b| b.is_full() && self.vehicles.targeting(b.id).is_none())
            .collect()
    }

    pub fn idle_vehicles(&self) -> Vec<&'a Vehicle> {
        self.vehicles.idle().collect()
    }
}

/// A decided pairing: the first ranked candidate gets the bin.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchPlan {
    pub bin_id: BinId,
    chosen: CandidateDistance,
    others: Vec<CandidateDistance>,
}

impl DispatchPlan {
    pub fn chosen(&self) -> CandidateDistance {
        self.chosen
    }

    pub fn others(&self) -> &[CandidateDistance] {
        &self.others
    }
}

/// Picks one candidate bin uniformly at random and lets `dispatcher` rank the
/// idle vehicles for it.
///
/// Returns `None` when there is no full, untargeted bin or no idle vehicle.
pub fn plan(
    dispatcher: &mut dyn Dispatcher,
    args: DispatchArgs<'_>,
    rng: &mut dyn RandomSource,
) -> Option<DispatchPlan> {
    let bins = args.candidate_bins();
    let idle = args.idle_vehicles();
    if bins.is_empty() || idle.is_empty() {
        return None;
    }

    let bin = bins[rng.choose_index(bins.len())];
    let mut ranked = dispatcher.rank(bin, &idle).into_iter();
    let chosen = ranked.next()?;
    Some(DispatchPlan {
        bin_id: bin.id,
        chosen,
        others: ranked.collect(),
    })
}
