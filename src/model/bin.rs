use std::{
    collections::BTreeSet,
    fmt::{Debug, Display},
    path::Path,
};

use anyhow::{bail, Context as _};
use serde::{Deserialize, Serialize};

use crate::{define_map, error::FleetError, utils::geo::LatLng};

use super::{read_csv, EntityId};

/// Fill level at which a bin counts as full.
pub const FULL_LEVEL: u8 = 100;

#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BinId(pub u32);

impl Debug for BinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for BinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl EntityId for BinId {
    fn not_found(self) -> FleetError {
        FleetError::BinNotFound(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BinStatus {
    Ok,
    Full,
}

/// A fixed-location waste receptacle.
///
/// Fill and status are only changed together, so `status == Full` exactly
/// when `fill >= FULL_LEVEL`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub id: BinId,
    #[serde(flatten)]
    pub position: LatLng,
    fill: u8,
    status: BinStatus,
}

impl Bin {
    pub fn new(id: BinId, position: LatLng, fill: u8) -> Self {
        let fill = fill.min(FULL_LEVEL);
        Self {
            id,
            position,
            fill,
            status: Self::status_for(fill),
        }
    }

    fn status_for(fill: u8) -> BinStatus {
        if fill >= FULL_LEVEL {
            BinStatus::Full
        } else {
            BinStatus::Ok
        }
    }

    pub fn fill(&self) -> u8 {
        self.fill
    }

    pub fn status(&self) -> BinStatus {
        self.status
    }

    pub fn is_full(&self) -> bool {
        self.status == BinStatus::Full
    }

    /// Raises the fill level, saturating at [`FULL_LEVEL`]. Returns `true` if
    /// this call is the one that made the bin full.
    pub fn add_fill(&mut self, amount: u8) -> bool {
        let was_full = self.is_full();
        self.fill = self.fill.saturating_add(amount).min(FULL_LEVEL);
        self.status = Self::status_for(self.fill);
        !was_full && self.is_full()
    }

    pub fn empty(&mut self) {
        self.fill = 0;
        self.status = BinStatus::Ok;
    }

    /// Loads seed bins from a CSV file with `id,latitude,longitude,fill` columns.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Vec<Bin>> {
        let path = path.as_ref();
        let seeds: Vec<BinSeed> = read_csv(path)
            .with_context(|| format!("unable to load bins from {}", path.display()))?;
        let mut seen = BTreeSet::new();
        for seed in &seeds {
            if !seen.insert(seed.id) {
                bail!("duplicate bin id {} in {}", seed.id, path.display());
            }
        }
        Ok(seeds.into_iter().map(Bin::from).collect())
    }

    /// The campus layout used when no seed file is configured.
    pub fn campus_defaults() -> Vec<Bin> {
        [
            (1, 22.0513, 88.0721, 40),
            (2, 22.0506, 88.0712, 30),
            (3, 22.0498, 88.0728, 50),
            (4, 22.0492, 88.0705, 20),
            (5, 22.0509, 88.0698, 35),
        ]
        .into_iter()
        .map(|(id, lat, lng, fill)| Bin::new(BinId(id), LatLng::new(lat, lng), fill))
        .collect()
    }
}

#[derive(Debug, Deserialize)]
struct BinSeed {
    id: u32,
    latitude: f64,
    longitude: f64,
    fill: u8,
}

impl From<BinSeed> for Bin {
    fn from(seed: BinSeed) -> Self {
        Bin::new(
            BinId(seed.id),
            LatLng::new(seed.latitude, seed.longitude),
            seed.fill,
        )
    }
}

define_map!(BinId, Bin, BinMap);
