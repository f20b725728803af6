//! Spin down calibration procedure codes and response data.

use std::io::Cursor;

use crate::errors::{FtmsError, Result};
use crate::serializer::{NumSerializer, Value};

/// Client to machine: start or skip the spin down procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum SpinDownControlCode {
    Start = 0x01,
    Ignore = 0x02,
}

/// Machine to client, reported via the machine status characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum SpinDownStatusCode {
    Requested = 0x01,
    Success = 0x02,
    Error = 0x03,
    StopPedaling = 0x04,
}

/// Target speed window returned when the machine accepts a spin down
/// request: pedal between `low` and `high` km/h.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinDownSpeed {
    pub low: f64,
    pub high: f64,
}

impl SpinDownSpeed {
    /// Decodes the two u2.01 speeds. The buffer must hold exactly them.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut src = Cursor::new(data);
        let serializer = NumSerializer::parse("u2.01")?;

        let speed = |src: &mut Cursor<&[u8]>| -> Result<f64> {
            match serializer.decode(src)? {
                Some(Value::Float(v)) => Ok(v),
                _ => Ok(0.0),
            }
        };

        let low = speed(&mut src)?;
        let high = speed(&mut src)?;

        if (src.position() as usize) < data.len() {
            return Err(FtmsError::InvalidFormat(
                "trailing bytes after spin down speed window",
            ));
        }

        Ok(Self { low, high })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_window_decoding() {
        // 10.00 .. 40.00 km/h
        let speed = SpinDownSpeed::decode(&[0xE8, 0x03, 0xA0, 0x0F]).unwrap();

        assert_eq!(speed.low, 10.0);
        assert_eq!(speed.high, 40.0);
    }

    #[test]
    fn trailing_byte_is_rejected() {
        assert!(SpinDownSpeed::decode(&[0xE8, 0x03, 0xA0, 0x0F, 0x00]).is_err());
    }
}
