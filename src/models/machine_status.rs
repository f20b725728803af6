//! Machine status characteristic: asynchronous state change notifications.

use num_traits::FromPrimitive;

use crate::errors::{FtmsError, Result};
use crate::serializer::{decode_code_switched, Field, Value};

use super::common::SIMULATION_FIELDS;

/// Machine status op codes.
/// DOCS: FTMS_v1.0 4.17, Table 4.26
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum MachineStatusCode {
    Reset = 0x01,
    StopPause = 0x02,
    StopSafety = 0x03,
    StartResume = 0x04,
    TargetSpeed = 0x05,
    TargetInclination = 0x06,
    TargetResistance = 0x07,
    TargetPower = 0x08,
    TargetHeartRate = 0x09,
    TargetEnergy = 0x0A,
    TargetSteps = 0x0B,
    TargetStrides = 0x0C,
    TargetDistance = 0x0D,
    TargetTime1 = 0x0E,
    TargetTime2 = 0x0F,
    TargetTime3 = 0x10,
    TargetTime5 = 0x11,
    IndoorBikeSimulation = 0x12,
    WheelCircumference = 0x13,
    SpinDownStatus = 0x14,
    TargetCadence = 0x15,
    // 0x16..0xFE reserved
    LostControl = 0xFF,
}

/// Declarative table of the machine status record. Unlike the control
/// point, the resistance payload here is u1.1, see the GATT Specification
/// Supplement.
pub const STATUS_FIELDS: &[Field] = &[
    Field::num("code", "u1"),
    Field::num("stop_pause", "u1").code(0x02),
    Field::num("target_speed", "u2.01").code(0x05),
    Field::num("target_inclination", "s2.1").code(0x06),
    Field::num("target_resistance", "u1.1").code(0x07),
    Field::num("target_power", "s2").code(0x08),
    Field::num("target_heart_rate", "u1").code(0x09),
    Field::num("target_energy", "u2").code(0x0A),
    Field::num("target_steps", "u2").code(0x0B),
    Field::num("target_strides", "u2").code(0x0C),
    Field::num("target_distance", "u3").code(0x0D),
    Field::seq("target_time_1", "u2", 1).code(0x0E),
    Field::seq("target_time_2", "u2", 2).code(0x0F),
    Field::seq("target_time_3", "u2", 3).code(0x10),
    Field::seq("target_time_5", "u2", 5).code(0x11),
    Field::group("indoor_bike_simulation", SIMULATION_FIELDS).code(0x12),
    Field::num("wheel_circumference", "u2.1").code(0x13),
    Field::num("spin_down_status", "u1").code(0x14),
    Field::num("target_cadence", "u2.5").code(0x15),
];

/// A decoded machine status notification.
#[derive(Debug)]
pub struct MachineStatus {
    pub code: MachineStatusCode,
    /// Payload of the codes that carry one, under its public setting name.
    pub setting: Option<(&'static str, Value)>,
}

pub fn decode(data: &[u8]) -> Result<MachineStatus> {
    let record = decode_code_switched(STATUS_FIELDS, data)?;

    let code = MachineStatusCode::from_u8(record.code)
        .ok_or(FtmsError::InvalidFormat("unknown machine status code"))?;

    Ok(MachineStatus {
        code,
        setting: record.setting,
    })
}
