//! Machine type identification from BLE advertisement service data.

use std::collections::HashMap;

use num_traits::FromPrimitive;
use uuid::Uuid;

use crate::errors::{FtmsError, Result};
use crate::uuids;

/// Fitness machine type, a single bit of the `Machine Type` field of the
/// FTMS advertisement service data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum MachineType {
    Treadmill = 1 << 0,
    CrossTrainer = 1 << 1,
    StepClimber = 1 << 2,
    StairClimber = 1 << 3,
    Rower = 1 << 4,
    IndoorBike = 1 << 5,
}

/// Bit 0 of the advertisement flags byte: fitness machine available.
const FLAG_FITNESS_MACHINE: u8 = 1 << 0;

/// Parses the FTMS service data payload `[flags, type_lo, type_hi?]`.
///
/// The machine type bytes are reversed on some machines, or collapsed to a
/// single byte, so they are simply ORed together. The result must be a
/// known single-bit machine type; anything else is `NotFitnessMachine`
/// carrying the raw payload when one was present.
pub fn machine_type_from_service_data(data: Option<&[u8]>) -> Result<MachineType> {
    let data = match data {
        Some(data) => data,
        None => return Err(FtmsError::NotFitnessMachine(None)),
    };

    let fail = || FtmsError::NotFitnessMachine(Some(data.to_vec()));

    if data.len() < 2 || data.len() > 3 {
        return Err(fail());
    }

    if data[0] & FLAG_FITNESS_MACHINE == 0 {
        return Err(fail());
    }

    let bits = data[1..].iter().fold(0u8, |acc, b| acc | b);

    MachineType::from_u8(bits).ok_or_else(fail)
}

/// Looks the FTMS service data up in an advertisement's service data map.
pub fn machine_type_from_advertisement(
    service_data: &HashMap<Uuid, Vec<u8>>,
) -> Result<MachineType> {
    machine_type_from_service_data(service_data.get(&uuids::FTMS_SERVICE).map(Vec::as_slice))
}
