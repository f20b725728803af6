//! GATT UUIDs of the Fitness Machine Service and its characteristics.

use btleplug::api::bleuuid::uuid_from_u16;
use uuid::Uuid;

/// FTMS Service UUID
pub const FTMS_SERVICE: Uuid = uuid_from_u16(0x1826);

/// READ: two u32 bitmaps, machine features and target setting features
pub const MACHINE_FEATURE: Uuid = uuid_from_u16(0x2ACC);

/// NOTIFY: realtime treadmill data (bitmask-gated record)
pub const TREADMILL_DATA: Uuid = uuid_from_u16(0x2ACD);

/// NOTIFY: realtime cross trainer data
pub const CROSS_TRAINER_DATA: Uuid = uuid_from_u16(0x2ACE);

/// NOTIFY: realtime rower data
pub const ROWER_DATA: Uuid = uuid_from_u16(0x2AD1);

/// NOTIFY: realtime indoor bike data
pub const INDOOR_BIKE_DATA: Uuid = uuid_from_u16(0x2AD2);

/// READ/NOTIFY: training status code, optionally followed by an UTF-8 string
pub const TRAINING_STATUS: Uuid = uuid_from_u16(0x2AD3);

/// READ: supported speed range (min, max, step), u2.01
pub const SPEED_RANGE: Uuid = uuid_from_u16(0x2AD4);

/// READ: supported inclination range, s2.1
pub const INCLINATION_RANGE: Uuid = uuid_from_u16(0x2AD5);

/// READ: supported resistance level range, s2.1
pub const RESISTANCE_RANGE: Uuid = uuid_from_u16(0x2AD6);

/// READ: supported heart rate range, u1
pub const HEART_RATE_RANGE: Uuid = uuid_from_u16(0x2AD7);

/// READ: supported power range, s2
pub const POWER_RANGE: Uuid = uuid_from_u16(0x2AD8);

/// WRITE/INDICATE: control point, request in - result indication out
pub const CONTROL_POINT: Uuid = uuid_from_u16(0x2AD9);

/// NOTIFY: asynchronous machine status changes
pub const MACHINE_STATUS: Uuid = uuid_from_u16(0x2ADA);

// Device Information Service

pub const DEVICE_INFORMATION_SERVICE: Uuid = uuid_from_u16(0x180A);

pub const MANUFACTURER_NAME: Uuid = uuid_from_u16(0x2A29);
pub const MODEL_NUMBER: Uuid = uuid_from_u16(0x2A24);
pub const SERIAL_NUMBER: Uuid = uuid_from_u16(0x2A25);
pub const SW_REVISION: Uuid = uuid_from_u16(0x2A28);
pub const HW_REVISION: Uuid = uuid_from_u16(0x2A27);
