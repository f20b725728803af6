//! Control point characteristic: requests, the result indication and the
//! settings metadata table.

use num_traits::FromPrimitive;

use crate::errors::{FtmsError, Result};
use crate::serializer::{supported_fields, Field, NumSerializer, Value};

use super::common::{IndoorBikeSimulationParameters, StopPauseCode, SIMULATION_FIELDS};
use super::spin_down::SpinDownControlCode;

/// Control point op codes.
/// DOCS: FTMS_v1.0 4.16.1, Table 4.15
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum ControlCode {
    RequestControl = 0x00,
    Reset = 0x01,
    SetTargetSpeed = 0x02,
    SetTargetInclination = 0x03,
    SetTargetResistance = 0x04,
    SetTargetPower = 0x05,
    SetTargetHeartRate = 0x06,
    StartOrResume = 0x07,
    StopOrPause = 0x08,
    SetTargetEnergy = 0x09,
    SetTargetSteps = 0x0A,
    SetTargetStrides = 0x0B,
    SetTargetDistance = 0x0C,
    SetTargetTime1 = 0x0D,
    SetTargetTime2 = 0x0E,
    SetTargetTime3 = 0x0F,
    SetTargetTime5 = 0x10,
    SetIndoorBikeSimulation = 0x11,
    SetWheelCircumference = 0x12,
    SpinDownControl = 0x13,
    SetTargetCadence = 0x14,
    Response = 0x80,
}

/// Result code carried by the control point indication.
/// DOCS: FTMS_v1.0 4.16.1 Table 4.24
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum ResultCode {
    Success = 0x01,
    NotSupported = 0x02,
    InvalidParameter = 0x03,
    Failed = 0x04,
    NotPermitted = 0x05,
}

/// The fixed three byte response indication `{0x80, request opcode,
/// result}`. Spin down responses may append a target speed window which
/// the controller reads separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlIndication {
    pub request_opcode: u8,
    pub result: ResultCode,
}

impl ControlIndication {
    pub const SIZE: usize = 3;

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(FtmsError::Eof);
        }

        if data[0] != ControlCode::Response as u8 {
            return Err(FtmsError::Protocol(
                "indication does not carry the response opcode",
            ));
        }

        let result = ResultCode::from_u8(data[2])
            .ok_or(FtmsError::InvalidFormat("unknown result code"))?;

        Ok(Self {
            request_opcode: data[1],
            result,
        })
    }
}

/// Valid arities of `Set Targeted Time`: plain training time or time in
/// two, three or five heart rate zones.
pub const VALID_TIME_LENGTHS: [usize; 4] = [1, 2, 3, 5];

/// One control point request. The wire form is the opcode byte followed by
/// the parameter of the selected variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlRequest {
    RequestControl,
    Reset,
    /// km/h
    SetTargetSpeed(f64),
    /// percent
    SetTargetInclination(f64),
    SetTargetResistance(f64),
    /// watt
    SetTargetPower(i16),
    /// bpm
    SetTargetHeartRate(u8),
    StartResume,
    StopPause(StopPauseCode),
    /// kcal
    SetTargetEnergy(u16),
    SetTargetSteps(u16),
    SetTargetStrides(u16),
    /// meters
    SetTargetDistance(u32),
    /// seconds; the number of values picks the time-in-zones variant
    SetTargetTime(Vec<u16>),
    SetIndoorBikeSimulation(IndoorBikeSimulationParameters),
    /// millimeters
    SetWheelCircumference(f64),
    SpinDown(SpinDownControlCode),
    /// rpm
    SetTargetCadence(f64),
}

impl ControlRequest {
    /// Serializes the request, returning the opcode alongside the full
    /// wire record.
    pub fn encode(&self) -> Result<(ControlCode, Vec<u8>)> {
        use ControlRequest::*;

        let mut buf = Vec::with_capacity(8);

        // opcode placeholder, fixed up below
        buf.push(0);

        let opcode = match self {
            RequestControl => ControlCode::RequestControl,
            Reset => ControlCode::Reset,
            StartResume => ControlCode::StartOrResume,
            SetTargetSpeed(v) => {
                encode_num("u2.01", *v, &mut buf)?;
                ControlCode::SetTargetSpeed
            }
            SetTargetInclination(v) => {
                encode_num("s2.1", *v, &mut buf)?;
                ControlCode::SetTargetInclination
            }
            SetTargetResistance(v) => {
                encode_num("s2.1", *v, &mut buf)?;
                ControlCode::SetTargetResistance
            }
            SetTargetPower(v) => {
                encode_num("s2", *v as f64, &mut buf)?;
                ControlCode::SetTargetPower
            }
            SetTargetHeartRate(v) => {
                encode_num("u1", *v as f64, &mut buf)?;
                ControlCode::SetTargetHeartRate
            }
            StopPause(code) => {
                encode_num("u1", *code as u8 as f64, &mut buf)?;
                ControlCode::StopOrPause
            }
            SetTargetEnergy(v) => {
                encode_num("u2", *v as f64, &mut buf)?;
                ControlCode::SetTargetEnergy
            }
            SetTargetSteps(v) => {
                encode_num("u2", *v as f64, &mut buf)?;
                ControlCode::SetTargetSteps
            }
            SetTargetStrides(v) => {
                encode_num("u2", *v as f64, &mut buf)?;
                ControlCode::SetTargetStrides
            }
            SetTargetDistance(v) => {
                encode_num("u3", *v as f64, &mut buf)?;
                ControlCode::SetTargetDistance
            }
            SetTargetTime(times) => {
                for t in times {
                    encode_num("u2", *t as f64, &mut buf)?;
                }

                match times.len() {
                    1 => ControlCode::SetTargetTime1,
                    2 => ControlCode::SetTargetTime2,
                    3 => ControlCode::SetTargetTime3,
                    5 => ControlCode::SetTargetTime5,
                    _ => return Err(FtmsError::InvalidFormat("invalid target time arity")),
                }
            }
            SetIndoorBikeSimulation(params) => {
                params.encode(&mut buf)?;
                ControlCode::SetIndoorBikeSimulation
            }
            SetWheelCircumference(v) => {
                encode_num("u2.1", *v, &mut buf)?;
                ControlCode::SetWheelCircumference
            }
            SpinDown(code) => {
                encode_num("u1", *code as u8 as f64, &mut buf)?;
                ControlCode::SpinDownControl
            }
            SetTargetCadence(v) => {
                encode_num("u2.5", *v, &mut buf)?;
                ControlCode::SetTargetCadence
            }
        };

        buf[0] = opcode as u8;

        Ok((opcode, buf))
    }

    /// Setting name and value of a set-target request; `None` for the
    /// plain procedures that carry no setting.
    pub fn setting(&self) -> Option<(&'static str, Value)> {
        use ControlRequest::*;

        let pair = match self {
            SetTargetSpeed(v) => ("target_speed", Value::Float(*v)),
            SetTargetInclination(v) => ("target_inclination", Value::Float(*v)),
            SetTargetResistance(v) => ("target_resistance", Value::Float(*v)),
            SetTargetPower(v) => ("target_power", Value::SInt(*v as i32)),
            SetTargetHeartRate(v) => ("target_heart_rate", Value::UInt(*v as u32)),
            SetTargetEnergy(v) => ("target_energy", Value::UInt(*v as u32)),
            SetTargetSteps(v) => ("target_steps", Value::UInt(*v as u32)),
            SetTargetStrides(v) => ("target_strides", Value::UInt(*v as u32)),
            SetTargetDistance(v) => ("target_distance", Value::UInt(*v)),
            SetTargetTime(times) => ("target_time", Value::Seq(times.clone())),
            SetIndoorBikeSimulation(p) => ("indoor_bike_simulation", Value::Simulation(*p)),
            SetWheelCircumference(v) => ("wheel_circumference", Value::Float(*v)),
            SetTargetCadence(v) => ("target_cadence", Value::Float(*v)),
            RequestControl | Reset | StartResume | StopPause(_) | SpinDown(_) => return None,
        };

        Some(pair)
    }
}

fn encode_num(spec: &str, value: f64, buf: &mut Vec<u8>) -> Result<()> {
    NumSerializer::parse(spec)?.encode(buf, Some(value))
}

/// Declarative table of the control point record. The `feature` metadata
/// is the bit of the target setting features bitmap advertising the
/// setting; `stop_pause` sits on an out-of-range bit because it is
/// mandatory and never advertised.
pub const CONTROL_FIELDS: &[Field] = &[
    Field::num("code", "u1"),
    Field::num("target_speed", "u2.01").feature(0).code(0x02),
    Field::num("target_inclination", "s2.1").feature(1).code(0x03),
    Field::num("target_resistance", "s2.1").feature(2).code(0x04),
    Field::num("target_power", "s2").feature(3).code(0x05),
    Field::num("target_heart_rate", "u1").feature(4).code(0x06),
    Field::num("stop_pause", "u1").feature(32).code(0x08),
    Field::num("target_energy", "u2").feature(5).code(0x09),
    Field::num("target_steps", "u2").feature(6).code(0x0A),
    Field::num("target_strides", "u2").feature(7).code(0x0B),
    Field::num("target_distance", "u3").feature(8).code(0x0C),
    Field::seq("target_time_1", "u2", 1).feature(9).code(0x0D),
    Field::seq("target_time_2", "u2", 2).feature(10).code(0x0E),
    Field::seq("target_time_3", "u2", 3).feature(11).code(0x0F),
    Field::seq("target_time_5", "u2", 5).feature(12).code(0x10),
    Field::group("indoor_bike_simulation", SIMULATION_FIELDS)
        .feature(13)
        .code(0x11),
    Field::num("wheel_circumference", "u2.1").feature(14).code(0x12),
    Field::num("spin_down", "u1").feature(15).code(0x13),
    Field::num("target_cadence", "u2.5").feature(16).code(0x14),
];

/// Setting names a (pruned) target setting features bitmap advertises.
pub fn supported_settings(settings_bits: u32) -> Vec<&'static str> {
    supported_fields(CONTROL_FIELDS, settings_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_requests_are_one_byte() {
        assert_eq!(ControlRequest::RequestControl.encode().unwrap().1, [0x00]);
        assert_eq!(ControlRequest::Reset.encode().unwrap().1, [0x01]);
        assert_eq!(ControlRequest::StartResume.encode().unwrap().1, [0x07]);
    }

    #[test]
    fn scaled_parameters() {
        let (opcode, data) = ControlRequest::SetTargetSpeed(25.5).encode().unwrap();

        assert_eq!(opcode, ControlCode::SetTargetSpeed);
        assert_eq!(data, [0x02, 0xF6, 0x09]);

        let (_, data) = ControlRequest::SetTargetInclination(-2.5).encode().unwrap();

        assert_eq!(data, [0x03, 0xE7, 0xFF]);
    }

    #[test]
    fn stop_and_pause_share_an_opcode() {
        let (_, stop) = ControlRequest::StopPause(StopPauseCode::Stop).encode().unwrap();
        let (_, pause) = ControlRequest::StopPause(StopPauseCode::Pause)
            .encode()
            .unwrap();

        assert_eq!(stop, [0x08, 0x01]);
        assert_eq!(pause, [0x08, 0x02]);
    }

    #[test]
    fn target_time_arity_picks_the_opcode() {
        let (opcode, data) = ControlRequest::SetTargetTime(vec![300]).encode().unwrap();

        assert_eq!(opcode, ControlCode::SetTargetTime1);
        assert_eq!(data, [0x0D, 0x2C, 0x01]);

        let (opcode, data) = ControlRequest::SetTargetTime(vec![120, 240])
            .encode()
            .unwrap();

        assert_eq!(opcode, ControlCode::SetTargetTime2);
        assert_eq!(data, [0x0E, 0x78, 0x00, 0xF0, 0x00]);

        assert!(ControlRequest::SetTargetTime(vec![1, 2, 3, 4]).encode().is_err());
        assert!(ControlRequest::SetTargetTime(Vec::new()).encode().is_err());
    }

    #[test]
    fn simulation_parameters() {
        let params = IndoorBikeSimulationParameters {
            wind_speed: 1.0,
            grade: -1.5,
            rolling_resistance: 0.0042,
            wind_resistance: 0.51,
        };

        let (_, data) = ControlRequest::SetIndoorBikeSimulation(params)
            .encode()
            .unwrap();

        assert_eq!(data, [0x11, 0xE8, 0x03, 0x6A, 0xFF, 0x2A, 0x33]);
    }

    #[test]
    fn indication_decoding() {
        let ind = ControlIndication::decode(&[0x80, 0x02, 0x01]).unwrap();

        assert_eq!(ind.request_opcode, 0x02);
        assert_eq!(ind.result, ResultCode::Success);

        let ind = ControlIndication::decode(&[0x80, 0x00, 0x05]).unwrap();

        assert_eq!(ind.result, ResultCode::NotPermitted);

        assert!(matches!(
            ControlIndication::decode(&[0x01, 0x02, 0x01]),
            Err(FtmsError::Protocol(_))
        ));
        assert!(matches!(
            ControlIndication::decode(&[0x80, 0x02]),
            Err(FtmsError::Eof)
        ));
        assert!(matches!(
            ControlIndication::decode(&[0x80, 0x02, 0x09]),
            Err(FtmsError::InvalidFormat(_))
        ));
    }

    #[test]
    fn supported_settings_from_bitmap() {
        // SPEED | POWER | SPIN_DOWN
        let names = supported_settings((1 << 0) | (1 << 3) | (1 << 15));

        assert_eq!(names, vec!["target_speed", "target_power", "spin_down"]);

        // stop_pause is mandatory and never listed
        assert!(!supported_settings(u32::MAX).contains(&"stop_pause"));
    }
}
