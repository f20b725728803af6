//! Machine features, target settings and setting value ranges.
//!
//! Read once per session right after connecting; immutable afterwards.

use std::collections::BTreeMap;
use std::io::Cursor;

use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};
use uuid::Uuid;

use crate::errors::{FtmsError, Result};
use crate::machine_type::MachineType;
use crate::serializer::NumSerializer;
use crate::transport::GattIo;
use crate::uuids;

bitflags! {
    /// Fitness machine features.
    /// DOCS: FTMS_v1.0 4.3.1.1
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MachineFeatures: u32 {
        const AVERAGE_SPEED = 1 << 0;
        const CADENCE = 1 << 1;
        const DISTANCE = 1 << 2;
        const INCLINATION = 1 << 3;
        const ELEVATION_GAIN = 1 << 4;
        const PACE = 1 << 5;
        const STEP_COUNT = 1 << 6;
        const RESISTANCE = 1 << 7;
        const STRIDE_COUNT = 1 << 8;
        const EXPENDED_ENERGY = 1 << 9;
        const HEART_RATE = 1 << 10;
        const METABOLIC_EQUIVALENT = 1 << 11;
        const ELAPSED_TIME = 1 << 12;
        const REMAINING_TIME = 1 << 13;
        const POWER_MEASUREMENT = 1 << 14;
        const FORCE_ON_BELT_AND_POWER_OUTPUT = 1 << 15;
        const USER_DATA_RETENTION = 1 << 16;
    }
}

bitflags! {
    /// Target setting features.
    /// DOCS: FTMS_v1.0 4.3.1.2
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MachineSettings: u32 {
        const SPEED = 1 << 0;
        const INCLINE = 1 << 1;
        const RESISTANCE = 1 << 2;
        const POWER = 1 << 3;
        const HEART_RATE = 1 << 4;
        const ENERGY = 1 << 5;
        const STEPS = 1 << 6;
        const STRIDES = 1 << 7;
        const DISTANCE = 1 << 8;
        const TIME = 1 << 9;
        const TIME_TWO_ZONES = 1 << 10;
        const TIME_THREE_ZONES = 1 << 11;
        const TIME_FIVE_ZONES = 1 << 12;
        const BIKE_SIMULATION = 1 << 13;
        const CIRCUMFERENCE = 1 << 14;
        const SPIN_DOWN = 1 << 15;
        const CADENCE = 1 << 16;
    }
}

/// Value range of a target setting, `(min, max, step)` in the setting's
/// public unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettingRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// Reads the feature characteristic: two little-endian u32 bitmaps.
///
/// Settings a machine type cannot meaningfully accept are cleared, some
/// machines advertise them regardless.
pub async fn read_features(
    io: &dyn GattIo,
    machine_type: MachineType,
) -> Result<(MachineFeatures, MachineSettings)> {
    let raw = io.read(uuids::MACHINE_FEATURE).await?;

    if raw.len() != 8 {
        return Err(FtmsError::InvalidFormat(
            "feature characteristic must be 8 bytes",
        ));
    }

    let features = MachineFeatures::from_bits_truncate(LittleEndian::read_u32(&raw[0..4]));
    let mut settings = MachineSettings::from_bits_truncate(LittleEndian::read_u32(&raw[4..8]));

    match machine_type {
        MachineType::Treadmill => {
            settings -= MachineSettings::RESISTANCE | MachineSettings::POWER;
        }
        MachineType::CrossTrainer | MachineType::IndoorBike | MachineType::Rower => {
            settings -= MachineSettings::SPEED | MachineSettings::INCLINE;
        }
        _ => {}
    }

    debug!("Machine features: {:?}", features);
    debug!("Machine settings: {:?}", settings);

    Ok((features, settings))
}

const RANGE_CHARACTERISTICS: [(MachineSettings, Uuid, &str, &str); 5] = [
    (
        MachineSettings::SPEED,
        uuids::SPEED_RANGE,
        "u2.01",
        "target_speed",
    ),
    (
        MachineSettings::INCLINE,
        uuids::INCLINATION_RANGE,
        "s2.1",
        "target_inclination",
    ),
    (
        MachineSettings::RESISTANCE,
        uuids::RESISTANCE_RANGE,
        "s2.1",
        "target_resistance",
    ),
    (
        MachineSettings::POWER,
        uuids::POWER_RANGE,
        "s2",
        "target_power",
    ),
    (
        MachineSettings::HEART_RATE,
        uuids::HEART_RATE_RANGE,
        "u1",
        "target_heart_rate",
    ),
];

/// Reads the range characteristic of every advertised setting that has
/// one. A setting whose range characteristic is missing is pruned from the
/// bitmap. Returns the final settings and the ranges keyed by setting name.
pub async fn read_supported_ranges(
    io: &dyn GattIo,
    settings: MachineSettings,
) -> Result<(MachineSettings, BTreeMap<&'static str, SettingRange>)> {
    let mut settings = settings;
    let mut ranges = BTreeMap::new();

    for (bit, uuid, spec, name) in RANGE_CHARACTERISTICS {
        if !settings.contains(bit) {
            continue;
        }

        if !io.has_characteristic(uuid) {
            debug!("Range characteristic {} not found, dropping {}", uuid, name);
            settings -= bit;
            continue;
        }

        let raw = io.read(uuid).await?;

        ranges.insert(name, decode_range(&raw, spec)?);
    }

    debug!("Setting ranges: {:?}", ranges);

    Ok((settings, ranges))
}

fn decode_range(data: &[u8], spec: &str) -> Result<SettingRange> {
    let serializer = NumSerializer::parse(spec)?;
    let mut src = Cursor::new(data);

    let scalar = |src: &mut Cursor<&[u8]>| -> Result<f64> {
        let value = serializer.decode(src)?;

        Ok(value.and_then(|v| v.as_f64()).unwrap_or(0.0))
    };

    let min = scalar(&mut src)?;
    let max = scalar(&mut src)?;
    let step = scalar(&mut src)?;

    if (src.position() as usize) < data.len() {
        return Err(FtmsError::InvalidFormat("trailing bytes in range"));
    }

    Ok(SettingRange { min, max, step })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fake::FakeIo;

    fn feature_payload(features: u32, settings: u32) -> [u8; 8] {
        let mut data = [0u8; 8];

        LittleEndian::write_u32(&mut data[0..4], features);
        LittleEndian::write_u32(&mut data[4..8], settings);

        data
    }

    #[tokio::test]
    async fn treadmill_settings_are_pruned_to_present_ranges() {
        let io = FakeIo::new(&[uuids::MACHINE_FEATURE, uuids::SPEED_RANGE]);

        // SPEED | RESISTANCE | POWER advertised
        let advertised =
            MachineSettings::SPEED | MachineSettings::RESISTANCE | MachineSettings::POWER;

        io.set_read(
            uuids::MACHINE_FEATURE,
            &feature_payload(0, advertised.bits()),
        );
        // 1.00 .. 20.00 km/h, 0.50 step
        io.set_read(uuids::SPEED_RANGE, &[0x64, 0x00, 0xD0, 0x07, 0x32, 0x00]);

        let (_, settings) = read_features(&io, MachineType::Treadmill).await.unwrap();

        // Resistance and power make no sense on a treadmill.
        assert_eq!(settings, MachineSettings::SPEED);

        let (settings, ranges) = read_supported_ranges(&io, settings).await.unwrap();

        assert_eq!(settings, MachineSettings::SPEED);
        assert_eq!(ranges.len(), 1);
        assert_eq!(
            ranges["target_speed"],
            SettingRange {
                min: 1.0,
                max: 20.0,
                step: 0.5,
            }
        );
    }

    #[tokio::test]
    async fn missing_range_characteristic_prunes_the_setting() {
        let io = FakeIo::new(&[uuids::MACHINE_FEATURE]);

        let (settings, ranges) = read_supported_ranges(&io, MachineSettings::HEART_RATE)
            .await
            .unwrap();

        assert!(settings.is_empty());
        assert!(ranges.is_empty());
    }

    #[tokio::test]
    async fn settings_without_ranges_are_kept() {
        let io = FakeIo::new(&[uuids::MACHINE_FEATURE]);

        let advertised = MachineSettings::BIKE_SIMULATION | MachineSettings::SPIN_DOWN;
        let (settings, ranges) = read_supported_ranges(&io, advertised).await.unwrap();

        assert_eq!(settings, advertised);
        assert!(ranges.is_empty());
    }

    #[tokio::test]
    async fn short_feature_payload_is_rejected() {
        let io = FakeIo::new(&[uuids::MACHINE_FEATURE]);

        io.set_read(uuids::MACHINE_FEATURE, &[0x00, 0x00, 0x00, 0x00]);

        assert!(read_features(&io, MachineType::Treadmill).await.is_err());
    }

    #[tokio::test]
    async fn trailing_range_byte_is_rejected() {
        let io = FakeIo::new(&[uuids::MACHINE_FEATURE, uuids::HEART_RATE_RANGE]);

        io.set_read(uuids::HEART_RATE_RANGE, &[60, 180, 5, 0]);

        assert!(read_supported_ranges(&io, MachineSettings::HEART_RATE)
            .await
            .is_err());
    }
}
