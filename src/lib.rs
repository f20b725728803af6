//! Client library for the Bluetooth Low Energy Fitness Machine Service
//! (FTMS).
//!
//! Connects to a treadmill, cross trainer, rower or indoor bike and does
//! three jobs over one GATT connection: parses the bitmask-gated realtime
//! training data notifications, drives the control point request/response
//! protocol (with transparent control authorization) and interprets the
//! asynchronous machine status notifications. All three feed one tagged
//! event stream, see [`event::FtmsEvent`].
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use ftms_client::FtmsScanner;
//!
//! # async fn run() -> ftms_client::Result<()> {
//! let scanner = FtmsScanner::new().await?;
//! let machines = scanner.discover(Duration::from_secs(10)).await?;
//!
//! let mut machine = machines.into_iter().next().unwrap().into_machine()?;
//!
//! machine.on_event(|event| println!("{}: {:?}", event.id(), event));
//! machine.connect().await?;
//! machine.set_target_power(150).await?;
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;
#[macro_use]
extern crate num_derive;

pub mod client;
pub mod controller;
pub mod device_info;
pub mod errors;
pub mod event;
pub mod features;
pub mod machine_type;
pub mod models;
pub mod scan;
pub mod serializer;
pub mod transport;
pub mod updater;
pub mod uuids;

pub use client::FitnessMachine;
pub use device_info::DeviceInfo;
pub use errors::{FtmsError, Result};
pub use event::{ControlId, ControlSource, EventSink, FtmsEvent};
pub use features::{MachineFeatures, MachineSettings, SettingRange};
pub use machine_type::{
    machine_type_from_advertisement, machine_type_from_service_data, MachineType,
};
pub use models::{
    IndoorBikeSimulationParameters, MovementDirection, ResultCode, SpinDownControlCode,
    SpinDownSpeed, SpinDownStatusCode, StopPauseCode, TrainingStatusCode,
};
pub use scan::{DiscoveredMachine, FtmsScanner};
pub use serializer::{FieldMap, Value};
