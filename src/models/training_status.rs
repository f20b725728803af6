//! Training status characteristic.

use bitflags::bitflags;
use num_traits::FromPrimitive;

use crate::errors::{FtmsError, Result};

bitflags! {
    /// Flags byte of the training status record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TrainingStatusFlags: u8 {
        const STRING_PRESENT = 1 << 0;
        const EXTENDED_STRING = 1 << 1;
    }
}

/// Current training state while a user is exercising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum TrainingStatusCode {
    Other = 0x00,
    Idle = 0x01,
    WarmingUp = 0x02,
    LowIntensityInterval = 0x03,
    HighIntensityInterval = 0x04,
    RecoveryInterval = 0x05,
    Isometric = 0x06,
    HeartRateControl = 0x07,
    FitnessTest = 0x08,
    SpeedTooLow = 0x09,
    SpeedTooHigh = 0x0A,
    CoolDown = 0x0B,
    WattControl = 0x0C,
    ManualMode = 0x0D,
    PreWorkout = 0x0E,
    PostWorkout = 0x0F,
}

/// Decodes `{flags, code}` plus the optional UTF-8 status string the
/// machine appends when `STRING_PRESENT` is set.
pub fn decode(data: &[u8]) -> Result<(TrainingStatusCode, Option<String>)> {
    if data.len() < 2 {
        return Err(FtmsError::Eof);
    }

    let flags = TrainingStatusFlags::from_bits_truncate(data[0]);

    let code = TrainingStatusCode::from_u8(data[1])
        .ok_or(FtmsError::InvalidFormat("unknown training status code"))?;

    let text = if flags.contains(TrainingStatusFlags::STRING_PRESENT) && data.len() > 2 {
        let s = String::from_utf8(data[2..].to_vec())
            .map_err(|_| FtmsError::InvalidFormat("training status string is not UTF-8"))?;

        Some(s)
    } else {
        None
    };

    Ok((code, text))
}
