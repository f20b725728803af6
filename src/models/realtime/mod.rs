//! Realtime training data records, one table per machine type.
//!
//! All four characteristics share the bitmask-gated framing of
//! [`crate::serializer::decode_bitmask_frame`]; the tables only differ in
//! the declared fields. Field groups share the flags bit of their group.

mod cross_trainer;
mod indoor_bike;
mod rower;
mod treadmill;

use uuid::Uuid;

pub use cross_trainer::CROSS_TRAINER_FIELDS;
pub use indoor_bike::INDOOR_BIKE_FIELDS;
pub use rower::ROWER_FIELDS;
pub use treadmill::TREADMILL_FIELDS;

use crate::errors::{FtmsError, Result};
use crate::machine_type::MachineType;
use crate::models::common::MovementDirection;
use crate::serializer::{decode_bitmask_frame, supported_fields, Field, FieldMap, Value};
use crate::uuids;

/// Key of the direction pseudo-field derived from the cross trainer mask.
pub const MOVEMENT_DIRECTION: &str = "movement_direction";

/// Shared inclination/ramp angle group.
const INCLINATION_FIELDS: &[Field] = &[
    Field::num("inclination", "s2.1"),
    Field::num("ramp_angle", "s2.1"),
];

/// Shared expended energy group.
const ENERGY_FIELDS: &[Field] = &[
    Field::num("energy_total", "u2"),
    Field::num("energy_per_hour", "u2"),
    Field::num("energy_per_minute", "u1"),
];

/// The field table of a machine type's realtime data record.
pub fn fields_for(machine_type: MachineType) -> Result<&'static [Field]> {
    match machine_type {
        MachineType::Treadmill => Ok(TREADMILL_FIELDS),
        MachineType::CrossTrainer => Ok(CROSS_TRAINER_FIELDS),
        MachineType::Rower => Ok(ROWER_FIELDS),
        MachineType::IndoorBike => Ok(INDOOR_BIKE_FIELDS),
        other => Err(FtmsError::UnsupportedMachineType(other)),
    }
}

/// The notify characteristic carrying a machine type's realtime data.
pub fn data_uuid(machine_type: MachineType) -> Result<Uuid> {
    match machine_type {
        MachineType::Treadmill => Ok(uuids::TREADMILL_DATA),
        MachineType::CrossTrainer => Ok(uuids::CROSS_TRAINER_DATA),
        MachineType::Rower => Ok(uuids::ROWER_DATA),
        MachineType::IndoorBike => Ok(uuids::INDOOR_BIKE_DATA),
        other => Err(FtmsError::UnsupportedMachineType(other)),
    }
}

/// Leaf property names a machine of the given type may report under the
/// given realtime features bitmap. The always-present default field is not
/// listed.
pub fn supported_realtime_properties(
    machine_type: MachineType,
    features: u32,
) -> Result<Vec<&'static str>> {
    Ok(supported_fields(fields_for(machine_type)?, features))
}

/// A decoded realtime notification.
#[derive(Debug)]
pub struct RealtimeRecord {
    /// The record continues in the next notification.
    pub more_data: bool,
    pub values: FieldMap,
}

/// Decodes one realtime notification for the given machine type.
pub fn decode(machine_type: MachineType, data: &[u8]) -> Result<RealtimeRecord> {
    let frame = decode_bitmask_frame(fields_for(machine_type)?, data)?;

    let mut values = frame.values;

    // Cross trainers report the movement direction in bit 15 of the flags
    // word, independent of the field gating.
    if machine_type == MachineType::CrossTrainer {
        let direction = if frame.mask & 0x8000 != 0 {
            MovementDirection::Backward
        } else {
            MovementDirection::Forward
        };

        values.insert(MOVEMENT_DIRECTION, Value::Direction(direction));
    }

    Ok(RealtimeRecord {
        more_data: frame.more_data,
        values,
    })
}
