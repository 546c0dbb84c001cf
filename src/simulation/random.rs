use std::collections::VecDeque;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{config::FillRange, utils::geo::LatLng};

/// Every random decision the fleet makes goes through this trait, so a
/// scripted source can make selection deterministic.
pub trait RandomSource: Send {
    /// An index in `0..len`. `len` is never zero.
    fn choose_index(&mut self, len: usize) -> usize;

    fn fill_amount(&mut self, range: FillRange) -> u8;

    fn spawn_position(&mut self, center: LatLng, spread: f64) -> LatLng;
}

#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl RngSource<SmallRng> {
    pub fn seeded(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(SmallRng::seed_from_u64(seed)),
            None => Self(SmallRng::from_os_rng()),
        }
    }
}

impl<R: Rng + Send> RandomSource for RngSource<R> {
    fn choose_index(&mut self, len: usize) -> usize {
        self.0.random_range(0..len)
    }

    fn fill_amount(&mut self, range: FillRange) -> u8 {
        self.0.random_range(range.min..=range.max)
    }

    fn spawn_position(&mut self, center: LatLng, spread: f64) -> LatLng {
        center.jittered(spread, &mut self.0)
    }
}

/// Replays a fixed list of picks; the last pick repeats once the list runs
/// down to it. Fill amounts default to the low end of the requested range and
/// vehicles spawn exactly on the campus centre.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    picks: VecDeque<usize>,
    fill: Option<u8>,
}

impl ScriptedSource {
    pub fn picking(picks: impl IntoIterator<Item = usize>) -> Self {
        Self {
            picks: picks.into_iter().collect(),
            fill: None,
        }
    }

    pub fn with_fill(mut self, amount: u8) -> Self {
        self.fill = Some(amount);
        self
    }
}

impl RandomSource for ScriptedSource {
    fn choose_index(&mut self, len: usize) -> usize {
        let pick = if self.picks.len() > 1 {
            self.picks.pop_front()
        } else {
            self.picks.front().copied()
        };
        pick.unwrap_or(0).min(len.saturating_sub(1))
    }

    fn fill_amount(&mut self, range: FillRange) -> u8 {
        self.fill.unwrap_or(range.min)
    }

    fn spawn_position(&mut self, center: LatLng, _spread: f64) -> LatLng {
        center
    }
}
