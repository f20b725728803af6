//! Error types of the FTMS client.
//!
//! Note that a non-SUCCESS control point result is NOT an error: it is
//! returned as a `ResultCode` value by the command functions.

use thiserror::Error;
use uuid::Uuid;

use crate::machine_type::MachineType;

#[derive(Debug, Error)]
pub enum FtmsError {
    /// Advertisement service data is missing or does not describe a
    /// fitness machine. Carries the raw service data when it was present.
    #[error("device is not a fitness machine (service data: {0:02X?})")]
    NotFitnessMachine(Option<Vec<u8>>),

    /// A characteristic the session cannot live without is missing.
    #[error("mandatory characteristic {0} not found")]
    CharacteristicNotFound(Uuid),

    /// The codec consumed past the end of the buffer.
    #[error("unexpected end of stream")]
    Eof,

    /// A number spec string was rejected, or a record violated the codec
    /// strictness rules (trailing bytes, unknown code, bad string payload).
    #[error("invalid format: {0}")]
    InvalidFormat(&'static str),

    /// The control point indicated a response for a request we did not send.
    #[error("protocol violation: {0}")]
    Protocol(&'static str),

    /// A control operation exceeded its deadline.
    #[error("control operation timed out")]
    Timeout,

    /// The transport dropped while an operation was pending.
    #[error("device disconnected")]
    Disconnected,

    /// There is no realtime data model for this machine type (step and
    /// stair climbers have no data characteristic in FTMS).
    #[error("machine type {0:?} is not supported")]
    UnsupportedMachineType(MachineType),

    #[error(transparent)]
    Transport(#[from] btleplug::Error),
}

pub type Result<T> = std::result::Result<T, FtmsError>;
