//! Fitness machine facade.
//!
//! Orchestrates connect, the one-shot reads of the static tables, the
//! notification subscriptions and the dispatch task, exposes the typed
//! commands and caches the latest reported state.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use btleplug::platform::Peripheral;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::controller::{MachineController, DEFAULT_TIMEOUT};
use crate::device_info::{read_device_info, DeviceInfo};
use crate::errors::Result;
use crate::event::{EventSink, FtmsEvent};
use crate::features::{
    read_features, read_supported_ranges, MachineFeatures, MachineSettings, SettingRange,
};
use crate::machine_type::MachineType;
use crate::models::common::{IndoorBikeSimulationParameters, StopPauseCode};
use crate::models::control_point::{supported_settings, ControlRequest, ResultCode};
use crate::models::realtime;
use crate::models::spin_down::SpinDownControlCode;
use crate::models::training_status::TrainingStatusCode;
use crate::serializer::{supported_fields, Field, FieldMap, Value};
use crate::transport::{BtlePeripheralIo, GattIo, GattNotification};
use crate::updater::DataUpdater;
use crate::uuids;

pub type EventCallback = Box<dyn Fn(&FtmsEvent) + Send + Sync>;

/// Cache of the latest reported machine state, fed by the event stream.
#[derive(Default)]
pub(crate) struct PropertiesManager {
    properties: Mutex<FieldMap>,
    settings: Mutex<BTreeMap<&'static str, Value>>,
    training_status: Mutex<Option<TrainingStatusCode>>,
    /// Keys that have ever carried a non-zero value this session.
    live: Mutex<BTreeSet<&'static str>>,
    callback: Mutex<Option<EventCallback>>,
}

impl EventSink for PropertiesManager {
    fn on_event(&self, event: &FtmsEvent) {
        match event {
            FtmsEvent::Update { data } => {
                let mut properties = self.properties.lock().unwrap();
                let mut live = self.live.lock().unwrap();

                for (name, value) in data.iter() {
                    if !value.is_zero() {
                        live.insert(*name);
                    }

                    properties.insert(*name, value.clone());
                }
            }
            FtmsEvent::Setup { name, value, .. } => {
                self.settings.lock().unwrap().insert(*name, value.clone());
            }
            FtmsEvent::TrainingStatus { code, .. } => {
                *self.training_status.lock().unwrap() = Some(*code);
            }
            _ => {}
        }

        if let Some(callback) = self.callback.lock().unwrap().as_ref() {
            callback(event);
        }
    }
}

/// An FTMS client session over one GATT connection.
pub struct FitnessMachine {
    io: Arc<dyn GattIo>,
    machine_type: MachineType,
    data_uuid: Uuid,
    data_fields: &'static [Field],
    timeout: Duration,
    manager: Arc<PropertiesManager>,
    controller: Arc<MachineController>,
    updater: Arc<DataUpdater>,
    dispatch: Option<JoinHandle<()>>,
    device_info: DeviceInfo,
    features: MachineFeatures,
    settings: MachineSettings,
    ranges: BTreeMap<&'static str, SettingRange>,
}

impl FitnessMachine {
    /// Creates a session over a discovered btleplug peripheral. Fails for
    /// machine types without a realtime data characteristic.
    pub fn new(peripheral: Peripheral, machine_type: MachineType) -> Result<Self> {
        Self::with_io(Arc::new(BtlePeripheralIo::new(peripheral)), machine_type)
    }

    /// Creates a session over any transport implementation.
    pub fn with_io(io: Arc<dyn GattIo>, machine_type: MachineType) -> Result<Self> {
        let data_uuid = realtime::data_uuid(machine_type)?;
        let data_fields = realtime::fields_for(machine_type)?;

        let manager = Arc::new(PropertiesManager::default());
        let sink = manager.clone() as Arc<dyn EventSink>;

        Ok(Self {
            io,
            machine_type,
            data_uuid,
            data_fields,
            timeout: DEFAULT_TIMEOUT,
            controller: Arc::new(MachineController::new(sink.clone())),
            updater: Arc::new(DataUpdater::new(machine_type, sink)),
            manager,
            dispatch: None,
            device_info: DeviceInfo::default(),
            features: MachineFeatures::empty(),
            settings: MachineSettings::empty(),
            ranges: BTreeMap::new(),
        })
    }

    /// Deadline of each control operation (write plus indication).
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Installs the user event callback. It runs on the notification
    /// dispatch task and must be fast and non-blocking.
    pub fn on_event(&self, callback: impl Fn(&FtmsEvent) + Send + Sync + 'static) {
        *self.manager.callback.lock().unwrap() = Some(Box::new(callback));
    }

    /// Connects, reads device info, features, settings and ranges, and
    /// subscribes to every notification source.
    pub async fn connect(&mut self) -> Result<()> {
        debug!("Connecting to {:?} machine", self.machine_type);

        self.io.connect().await?;

        self.device_info = read_device_info(self.io.as_ref()).await;

        let (features, settings) = read_features(self.io.as_ref(), self.machine_type).await?;
        let (settings, ranges) = read_supported_ranges(self.io.as_ref(), settings).await?;

        self.features = features;
        self.settings = settings;
        self.ranges = ranges;

        self.controller.subscribe(self.io.as_ref()).await?;
        self.io.subscribe(self.data_uuid).await?;

        let stream = self.io.notifications().await?;

        self.dispatch = Some(tokio::spawn(dispatch_notifications(
            stream,
            self.data_uuid,
            self.updater.clone(),
            self.controller.clone(),
        )));

        // Surface the attach-time signal strength once.
        if let Some(rssi) = self.io.rssi().await {
            let mut data = FieldMap::new();

            data.insert("rssi", Value::SInt(rssi as i32));

            self.manager.on_event(&FtmsEvent::Update { data });
        }

        info!("Connected to {:?} machine", self.machine_type);

        Ok(())
    }

    /// Disconnects and resets the session-scoped state.
    pub async fn disconnect(&mut self) -> Result<()> {
        let result = self.io.disconnect().await;

        if let Some(dispatch) = self.dispatch.take() {
            dispatch.abort();
        }

        self.updater.reset();
        self.controller.reset();

        result
    }

    // Static session tables

    pub fn machine_type(&self) -> MachineType {
        self.machine_type
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    pub fn machine_features(&self) -> MachineFeatures {
        self.features
    }

    /// The advertised settings after machine-type and missing-range
    /// pruning.
    pub fn machine_settings(&self) -> MachineSettings {
        self.settings
    }

    pub fn supported_ranges(&self) -> &BTreeMap<&'static str, SettingRange> {
        &self.ranges
    }

    /// Realtime property names this machine reports per its features.
    pub fn supported_properties(&self) -> Vec<&'static str> {
        supported_fields(self.data_fields, self.features.bits())
    }

    /// Every realtime property name this machine type can report.
    pub fn available_properties(&self) -> Vec<&'static str> {
        supported_fields(self.data_fields, u32::MAX)
    }

    /// Setting names of the pruned settings bitmap.
    pub fn supported_settings(&self) -> Vec<&'static str> {
        supported_settings(self.settings.bits())
    }

    // Cached live state

    /// Latest reported realtime properties.
    pub fn properties(&self) -> FieldMap {
        self.manager.properties.lock().unwrap().clone()
    }

    /// Latest confirmed or reported target settings.
    pub fn settings(&self) -> BTreeMap<&'static str, Value> {
        self.manager.settings.lock().unwrap().clone()
    }

    pub fn training_status(&self) -> Option<TrainingStatusCode> {
        *self.manager.training_status.lock().unwrap()
    }

    /// Property names that have carried a non-zero value this session.
    pub fn live_properties(&self) -> Vec<&'static str> {
        self.manager.live.lock().unwrap().iter().copied().collect()
    }

    // Commands

    pub async fn request_control(&self) -> Result<ResultCode> {
        self.command(None, ControlRequest::RequestControl).await
    }

    pub async fn reset(&self) -> Result<ResultCode> {
        self.command(None, ControlRequest::Reset).await
    }

    pub async fn start_resume(&self) -> Result<ResultCode> {
        self.command(None, ControlRequest::StartResume).await
    }

    pub async fn stop(&self) -> Result<ResultCode> {
        self.command(None, ControlRequest::StopPause(StopPauseCode::Stop))
            .await
    }

    pub async fn pause(&self) -> Result<ResultCode> {
        self.command(None, ControlRequest::StopPause(StopPauseCode::Pause))
            .await
    }

    /// km/h
    pub async fn set_target_speed(&self, value: f64) -> Result<ResultCode> {
        self.command(
            Some(MachineSettings::SPEED),
            ControlRequest::SetTargetSpeed(value),
        )
        .await
    }

    /// percent
    pub async fn set_target_inclination(&self, value: f64) -> Result<ResultCode> {
        self.command(
            Some(MachineSettings::INCLINE),
            ControlRequest::SetTargetInclination(value),
        )
        .await
    }

    pub async fn set_target_resistance(&self, value: f64) -> Result<ResultCode> {
        self.command(
            Some(MachineSettings::RESISTANCE),
            ControlRequest::SetTargetResistance(value),
        )
        .await
    }

    /// watt
    pub async fn set_target_power(&self, value: i16) -> Result<ResultCode> {
        self.command(
            Some(MachineSettings::POWER),
            ControlRequest::SetTargetPower(value),
        )
        .await
    }

    /// bpm
    pub async fn set_target_heart_rate(&self, value: u8) -> Result<ResultCode> {
        self.command(
            Some(MachineSettings::HEART_RATE),
            ControlRequest::SetTargetHeartRate(value),
        )
        .await
    }

    /// kcal
    pub async fn set_target_energy(&self, value: u16) -> Result<ResultCode> {
        self.command(
            Some(MachineSettings::ENERGY),
            ControlRequest::SetTargetEnergy(value),
        )
        .await
    }

    pub async fn set_target_steps(&self, value: u16) -> Result<ResultCode> {
        self.command(
            Some(MachineSettings::STEPS),
            ControlRequest::SetTargetSteps(value),
        )
        .await
    }

    pub async fn set_target_strides(&self, value: u16) -> Result<ResultCode> {
        self.command(
            Some(MachineSettings::STRIDES),
            ControlRequest::SetTargetStrides(value),
        )
        .await
    }

    /// meters
    pub async fn set_target_distance(&self, value: u32) -> Result<ResultCode> {
        self.command(
            Some(MachineSettings::DISTANCE),
            ControlRequest::SetTargetDistance(value),
        )
        .await
    }

    /// Training time in seconds; two, three or five values target the
    /// corresponding heart rate zones.
    pub async fn set_target_time(&self, seconds: &[u16]) -> Result<ResultCode> {
        let required = match seconds.len() {
            1 => Some(MachineSettings::TIME),
            2 => Some(MachineSettings::TIME_TWO_ZONES),
            3 => Some(MachineSettings::TIME_THREE_ZONES),
            5 => Some(MachineSettings::TIME_FIVE_ZONES),
            // Leave the arity error to the controller.
            _ => None,
        };

        self.command(required, ControlRequest::SetTargetTime(seconds.to_vec()))
            .await
    }

    pub async fn set_indoor_bike_simulation(
        &self,
        params: IndoorBikeSimulationParameters,
    ) -> Result<ResultCode> {
        self.command(
            Some(MachineSettings::BIKE_SIMULATION),
            ControlRequest::SetIndoorBikeSimulation(params),
        )
        .await
    }

    /// millimeters
    pub async fn set_wheel_circumference(&self, value: f64) -> Result<ResultCode> {
        self.command(
            Some(MachineSettings::CIRCUMFERENCE),
            ControlRequest::SetWheelCircumference(value),
        )
        .await
    }

    pub async fn spin_down_start(&self) -> Result<ResultCode> {
        self.command(
            Some(MachineSettings::SPIN_DOWN),
            ControlRequest::SpinDown(SpinDownControlCode::Start),
        )
        .await
    }

    pub async fn spin_down_ignore(&self) -> Result<ResultCode> {
        self.command(
            Some(MachineSettings::SPIN_DOWN),
            ControlRequest::SpinDown(SpinDownControlCode::Ignore),
        )
        .await
    }

    /// rpm
    pub async fn set_target_cadence(&self, value: f64) -> Result<ResultCode> {
        self.command(
            Some(MachineSettings::CADENCE),
            ControlRequest::SetTargetCadence(value),
        )
        .await
    }

    async fn command(
        &self,
        required: Option<MachineSettings>,
        request: ControlRequest,
    ) -> Result<ResultCode> {
        if let Some(setting) = required {
            if !self.settings.contains(setting) {
                debug!("Setting {:?} not supported by this machine", setting);
                return Ok(ResultCode::NotSupported);
            }
        }

        self.controller
            .write_command(self.io.as_ref(), &request, self.timeout)
            .await
    }
}

impl Drop for FitnessMachine {
    fn drop(&mut self) {
        if let Some(dispatch) = self.dispatch.take() {
            dispatch.abort();
        }
    }
}

/// Routes transport notifications to their consumers. Ends when the
/// transport drops the stream, which also fails a pending control wait.
async fn dispatch_notifications(
    mut stream: BoxStream<'static, GattNotification>,
    data_uuid: Uuid,
    updater: Arc<DataUpdater>,
    controller: Arc<MachineController>,
) {
    while let Some(notification) = stream.next().await {
        let data = notification.value.as_slice();

        if notification.uuid == data_uuid {
            if let Err(err) = updater.on_notification(data) {
                warn!("Undecodable realtime data {:02X?}: {}", data, err);
            }
        } else if notification.uuid == uuids::MACHINE_STATUS {
            controller.on_machine_status(data);
        } else if notification.uuid == uuids::TRAINING_STATUS {
            controller.on_training_status(data);
        } else if notification.uuid == uuids::CONTROL_POINT {
            controller.on_indication(data);
        } else {
            warn!(
                "Got unhandled notification from uuid {}, value {:02X?}",
                notification.uuid, data
            );
        }
    }

    debug!("Notification stream ended, resetting session state");

    updater.reset();
    controller.reset();
}
