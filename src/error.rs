use thiserror::Error;

use crate::model::{bin::BinId, vehicle::VehicleId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FleetError {
    #[error("vehicle {0} not found")]
    VehicleNotFound(VehicleId),

    #[error("bin {0} not found")]
    BinNotFound(BinId),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, FleetError>;
