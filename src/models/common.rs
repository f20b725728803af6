//! Types shared between the control point and machine status records.

use crate::errors::Result;
use crate::serializer::{Field, FieldKind, FieldMap, NumSerializer, Value};

/// Movement direction, reported by cross trainers in bit 15 of the
/// realtime data flags word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementDirection {
    Forward,
    Backward,
}

/// Parameter of the `Stop or Pause` control and status messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum StopPauseCode {
    Stop = 0x01,
    Pause = 0x02,
}

/// Indoor bike simulation parameters.
///
/// Wind speed in m/s, grade in percent, coefficient of rolling resistance
/// (unitless) and wind resistance coefficient in kg/m.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndoorBikeSimulationParameters {
    pub wind_speed: f64,
    pub grade: f64,
    pub rolling_resistance: f64,
    pub wind_resistance: f64,
}

pub const SIMULATION_FIELDS: &[Field] = &[
    Field::num("wind_speed", "s2.001"),
    Field::num("grade", "s2.01"),
    Field::num("rolling_resistance", "u1.0001"),
    Field::num("wind_resistance", "u1.01"),
];

impl IndoorBikeSimulationParameters {
    /// Builds the parameter block from a decoded field map. Any absent
    /// field makes the block unusable.
    pub fn from_field_map(map: &FieldMap) -> Option<Self> {
        let get = |name| map.get(name).and_then(Value::as_f64);

        Some(Self {
            wind_speed: get("wind_speed")?,
            grade: get("grade")?,
            rolling_resistance: get("rolling_resistance")?,
            wind_resistance: get("wind_resistance")?,
        })
    }

    pub(crate) fn encode(&self, dst: &mut Vec<u8>) -> Result<()> {
        let values = [
            self.wind_speed,
            self.grade,
            self.rolling_resistance,
            self.wind_resistance,
        ];

        for (field, value) in SIMULATION_FIELDS.iter().zip(values.iter()) {
            if let FieldKind::Num(spec) = &field.kind {
                NumSerializer::parse(spec)?.encode(dst, Some(*value))?;
            }
        }

        Ok(())
    }
}
