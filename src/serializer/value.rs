//! Concrete decoded values.

use std::collections::BTreeMap;
use std::fmt;

use crate::models::common::{IndoorBikeSimulationParameters, MovementDirection};
use crate::models::spin_down::SpinDownStatusCode;

/// Flat map from leaf field names to decoded values. Absent fields are
/// omitted entirely, so a key is always bound to a concrete value.
pub type FieldMap = BTreeMap<&'static str, Value>;

/// One decoded field value.
///
/// Scalars come straight out of the number codec; the remaining variants
/// cover the few structured payloads of the code-switched records.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    UInt(u32),
    SInt(i32),
    Float(f64),
    Direction(MovementDirection),
    Seq(Vec<u16>),
    Simulation(IndoorBikeSimulationParameters),
    SpinDownStatus(SpinDownStatusCode),
}

impl Value {
    /// True for the zero of the value's type. Realtime records where every
    /// field is zero are idle noise and get suppressed.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::UInt(v) => *v == 0,
            Value::SInt(v) => *v == 0,
            Value::Float(v) => *v == 0.0,
            Value::Direction(d) => *d == MovementDirection::Forward,
            Value::Seq(v) => v.iter().all(|x| *x == 0),
            Value::Simulation(p) => {
                p.wind_speed == 0.0
                    && p.grade == 0.0
                    && p.rolling_resistance == 0.0
                    && p.wind_resistance == 0.0
            }
            Value::SpinDownStatus(_) => false,
        }
    }

    /// Numeric view of scalar values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::UInt(v) => Some(*v as f64),
            Value::SInt(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::UInt(v) => write!(f, "{}", v),
            Value::SInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Direction(d) => write!(f, "{:?}", d),
            Value::Seq(v) => write!(f, "{:?}", v),
            Value::Simulation(p) => write!(f, "{:?}", p),
            Value::SpinDownStatus(c) => write!(f, "{:?}", c),
        }
    }
}
