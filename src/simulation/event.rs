use serde::Serialize;

use crate::{
    model::{bin::BinId, vehicle::VehicleId},
    utils::round1,
};

/// Every state change the fleet makes, in the order it made them.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FleetEvent {
    BinFilled {
        bin_id: BinId,
        amount: u8,
        fill: u8,
    },
    BinFull {
        bin_id: BinId,
    },
    VehicleAssigned {
        vehicle_id: VehicleId,
        bin_id: BinId,
        distance_m: f64,
    },
    TripCompleted {
        vehicle_id: VehicleId,
        bin_id: BinId,
    },
    /// `complete_trip` for a pair that was not an active assignment.
    VehicleReleased {
        vehicle_id: VehicleId,
        bin_id: BinId,
    },
    RouteRecorded {
        vehicle_id: VehicleId,
        bin_id: BinId,
        distance_m: f64,
        duration_s: f64,
    },
    FleetReset {
        vehicles_only: bool,
    },
    AutoToggled {
        running: bool,
    },
}

impl FleetEvent {
    /// The operator-facing notification for this event, if it warrants one.
    pub fn alert_message(&self) -> Option<String> {
        match self {
            Self::BinFull { bin_id } => Some(format!("Bin {bin_id} is FULL and sent an alert")),
            Self::VehicleAssigned {
                vehicle_id,
                bin_id,
                distance_m,
            } => Some(format!(
                "Vehicle {vehicle_id} accepted task for Bin {bin_id} ({} m)",
                round1(*distance_m)
            )),
            Self::TripCompleted { vehicle_id, bin_id } => {
                Some(format!("Vehicle {vehicle_id} completed trip for Bin {bin_id}"))
            }
            Self::VehicleReleased { vehicle_id, bin_id } => Some(format!(
                "Vehicle {vehicle_id} released; Bin {bin_id} emptied without an active assignment"
            )),
            Self::BinFilled { .. }
            | Self::RouteRecorded { .. }
            | Self::FleetReset { .. }
            | Self::AutoToggled { .. } => None,
        }
    }
}

#[test]
fn test_alert_messages() {
    let assigned = FleetEvent::VehicleAssigned {
        vehicle_id: VehicleId(2),
        bin_id: BinId(4),
        distance_m: 123.456,
    };
    assert_eq!(
        assigned.alert_message().as_deref(),
        Some("Vehicle 2 accepted task for Bin 4 (123.5 m)")
    );
    assert_eq!(
        FleetEvent::BinFull { bin_id: BinId(3) }.alert_message().as_deref(),
        Some("Bin 3 is FULL and sent an alert")
    );
    assert!(FleetEvent::AutoToggled { running: true }.alert_message().is_none());
}
