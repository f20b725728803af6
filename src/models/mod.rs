//! Field-bearing models of the FTMS characteristics.

pub mod common;
pub mod control_point;
pub mod machine_status;
pub mod realtime;
pub mod spin_down;
pub mod training_status;

pub use common::{IndoorBikeSimulationParameters, MovementDirection, StopPauseCode};
pub use control_point::{
    supported_settings, ControlCode, ControlIndication, ControlRequest, ResultCode,
};
pub use machine_status::{MachineStatus, MachineStatusCode};
pub use spin_down::{SpinDownControlCode, SpinDownSpeed, SpinDownStatusCode};
pub use training_status::{TrainingStatusCode, TrainingStatusFlags};
