//! Control point and machine status controller.
//!
//! Owns the authorization state and the single-inflight indication slot,
//! writes control requests and matches the result indication, and turns
//! both the indications and the asynchronous status notifications into
//! events. The control permission remains valid until the connection is
//! terminated or the machine reports `Control Permission Lost`; the next
//! command then transparently re-requests control.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use num_traits::FromPrimitive;
use tokio::sync::oneshot;

use crate::errors::{FtmsError, Result};
use crate::event::{ControlId, ControlSource, EventSink, FtmsEvent};
use crate::models::control_point::{
    ControlCode, ControlIndication, ControlRequest, ResultCode, VALID_TIME_LENGTHS,
};
use crate::models::machine_status::{self, MachineStatusCode};
use crate::models::spin_down::{SpinDownSpeed, SpinDownStatusCode};
use crate::models::training_status;
use crate::models::StopPauseCode;
use crate::serializer::Value;
use crate::transport::GattIo;
use crate::uuids;

/// Default deadline of one control operation (write plus indication).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

pub struct MachineController {
    sink: Arc<dyn EventSink>,
    auth: AtomicBool,
    subscribed: AtomicBool,
    /// The exclusive slot of the one inflight request.
    indication: Mutex<Option<oneshot::Sender<Vec<u8>>>>,
}

impl MachineController {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            auth: AtomicBool::new(false),
            subscribed: AtomicBool::new(false),
            indication: Mutex::new(None),
        }
    }

    /// Whether the machine currently grants us control.
    pub fn is_authorized(&self) -> bool {
        self.auth.load(Ordering::SeqCst)
    }

    /// Subscribes to the training status, machine status and control point
    /// sources. Idempotent. The training status is also read once so the
    /// session starts with a known state.
    pub async fn subscribe(&self, io: &dyn GattIo) -> Result<()> {
        if self.subscribed.load(Ordering::SeqCst) {
            return Ok(());
        }

        if io.has_characteristic(uuids::TRAINING_STATUS) {
            if let Ok(data) = io.read(uuids::TRAINING_STATUS).await {
                self.on_training_status(&data);
            }

            io.subscribe(uuids::TRAINING_STATUS).await?;
        }

        if io.has_characteristic(uuids::MACHINE_STATUS) {
            io.subscribe(uuids::MACHINE_STATUS).await?;
        }

        if io.has_characteristic(uuids::CONTROL_POINT) {
            io.subscribe(uuids::CONTROL_POINT).await?;
        }

        self.subscribed.store(true, Ordering::SeqCst);

        Ok(())
    }

    /// Resets authorization and subscription state and fails a pending
    /// indication wait. Call on disconnect.
    pub fn reset(&self) {
        self.subscribed.store(false, Ordering::SeqCst);
        self.auth.store(false, Ordering::SeqCst);
        self.indication.lock().unwrap().take();
    }

    /// Control point indication callback.
    pub fn on_indication(&self, data: &[u8]) {
        if let Some(tx) = self.indication.lock().unwrap().take() {
            let _ = tx.send(data.to_vec());
        }
    }

    /// Writes one request and awaits its result indication, requesting
    /// control first when not yet authorised. Non-SUCCESS results are
    /// returned as values.
    pub async fn write_command(
        &self,
        io: &dyn GattIo,
        request: &ControlRequest,
        timeout: Duration,
    ) -> Result<ResultCode> {
        if let ControlRequest::SetTargetTime(times) = request {
            if !VALID_TIME_LENGTHS.contains(&times.len()) {
                return Ok(ResultCode::InvalidParameter);
            }
        }

        if !self.is_authorized() && !matches!(request, ControlRequest::RequestControl) {
            self.execute(io, &ControlRequest::RequestControl, timeout)
                .await?;
        }

        self.execute(io, request, timeout).await
    }

    async fn execute(
        &self,
        io: &dyn GattIo,
        request: &ControlRequest,
        timeout: Duration,
    ) -> Result<ResultCode> {
        self.subscribe(io).await?;

        let (opcode, payload) = request.encode()?;

        debug!("Control request {:?}: {:02X?}", opcode, payload);

        // Replace the inflight slot. A fresh channel per request keeps a
        // late indication of an abandoned request from leaking into this
        // one.
        let rx = {
            let (tx, rx) = oneshot::channel();

            *self.indication.lock().unwrap() = Some(tx);

            rx
        };

        let round_trip = async {
            io.write_with_response(uuids::CONTROL_POINT, &payload).await?;

            rx.await.map_err(|_| FtmsError::Disconnected)
        };

        let data = match tokio::time::timeout(timeout, round_trip).await {
            Ok(Ok(data)) => data,
            Ok(Err(err)) => {
                self.release_after_failure();
                return Err(err);
            }
            Err(_) => {
                self.release_after_failure();
                return Err(FtmsError::Timeout);
            }
        };

        let indication = ControlIndication::decode(&data)?;

        if ControlCode::from_u8(indication.request_opcode) != Some(opcode) {
            return Err(FtmsError::Protocol("indication for another request"));
        }

        if indication.result != ResultCode::Success {
            debug!("Request {:?} completed with {:?}", opcode, indication.result);
            return Ok(indication.result);
        }

        self.on_request_success(request, &data[ControlIndication::SIZE..])?;

        Ok(ResultCode::Success)
    }

    fn release_after_failure(&self) {
        self.auth.store(false, Ordering::SeqCst);
        self.indication.lock().unwrap().take();
    }

    /// Event synthesis for a successfully indicated request.
    fn on_request_success(&self, request: &ControlRequest, trailing: &[u8]) -> Result<()> {
        match request {
            ControlRequest::RequestControl => {
                self.auth.store(true, Ordering::SeqCst);
            }
            ControlRequest::Reset => {
                self.auth.store(false, Ordering::SeqCst);
                self.emit_control(ControlId::Reset, ControlSource::Callback);
            }
            ControlRequest::StartResume => {
                self.emit_control(ControlId::Start, ControlSource::Callback);
            }
            ControlRequest::StopPause(code) => {
                let id = match code {
                    StopPauseCode::Stop => ControlId::Stop,
                    StopPauseCode::Pause => ControlId::Pause,
                };

                self.emit_control(id, ControlSource::Callback);
            }
            ControlRequest::SpinDown(code) => {
                // On success the machine may append the target speed
                // window to the indication.
                let target_speed = if trailing.is_empty() {
                    None
                } else {
                    Some(SpinDownSpeed::decode(trailing)?)
                };

                self.sink.on_event(&FtmsEvent::SpinDown {
                    code: *code,
                    target_speed,
                });
            }
            _ => {
                if let Some((name, value)) = request.setting() {
                    self.sink.on_event(&FtmsEvent::Setup {
                        source: ControlSource::Callback,
                        name,
                        value,
                    });
                }
            }
        }

        Ok(())
    }

    /// Machine status notification callback.
    pub fn on_machine_status(&self, data: &[u8]) {
        let status = match machine_status::decode(data) {
            Ok(status) => status,
            Err(err) => {
                warn!("Undecodable machine status {:02X?}: {}", data, err);
                return;
            }
        };

        match status.code {
            // Silent: the next command transparently re-requests control.
            MachineStatusCode::LostControl => {
                self.auth.store(false, Ordering::SeqCst);
            }
            MachineStatusCode::Reset => {
                self.auth.store(false, Ordering::SeqCst);
                self.emit_control(ControlId::Reset, ControlSource::Other);
            }
            MachineStatusCode::StopPause => {
                let code = match status.setting {
                    Some((_, Value::UInt(v))) => StopPauseCode::from_u32(v),
                    _ => None,
                };

                match code {
                    Some(StopPauseCode::Stop) => {
                        self.emit_control(ControlId::Stop, ControlSource::User)
                    }
                    Some(StopPauseCode::Pause) => {
                        self.emit_control(ControlId::Pause, ControlSource::User)
                    }
                    None => warn!("Stop/pause status without a valid parameter"),
                }
            }
            MachineStatusCode::StopSafety => {
                self.emit_control(ControlId::Stop, ControlSource::Safety);
            }
            MachineStatusCode::StartResume => {
                self.emit_control(ControlId::Start, ControlSource::User);
            }
            MachineStatusCode::SpinDownStatus => {
                let setting = match status.setting {
                    Some((name, Value::UInt(v))) => SpinDownStatusCode::from_u32(v)
                        .map(|code| (name, Value::SpinDownStatus(code))),
                    _ => None,
                };

                match setting {
                    Some((name, value)) => self.sink.on_event(&FtmsEvent::Setup {
                        source: ControlSource::Other,
                        name,
                        value,
                    }),
                    None => warn!("Spin down status without a valid parameter"),
                }
            }
            _ => {
                if let Some((name, value)) = status.setting {
                    self.sink.on_event(&FtmsEvent::Setup {
                        source: ControlSource::Other,
                        name,
                        value,
                    });
                }
            }
        }
    }

    /// Training status notification callback.
    pub fn on_training_status(&self, data: &[u8]) {
        match training_status::decode(data) {
            Ok((code, text)) => {
                self.sink.on_event(&FtmsEvent::TrainingStatus { code, text });
            }
            Err(err) => warn!("Undecodable training status {:02X?}: {}", data, err),
        }
    }

    fn emit_control(&self, id: ControlId, source: ControlSource) {
        self.sink.on_event(&FtmsEvent::Control { id, source });
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::event::testing::RecordingSink;
    use crate::models::common::StopPauseCode;
    use crate::models::spin_down::SpinDownControlCode;
    use crate::models::training_status::TrainingStatusCode;
    use crate::transport::fake::FakeIo;

    const ALL_CHARS: &[uuid::Uuid] = &[
        uuids::TRAINING_STATUS,
        uuids::MACHINE_STATUS,
        uuids::CONTROL_POINT,
    ];

    fn controller(sink: &Arc<RecordingSink>) -> MachineController {
        MachineController::new(sink.clone() as Arc<dyn EventSink>)
    }

    type Writes = futures::channel::mpsc::UnboundedReceiver<(uuid::Uuid, Vec<u8>)>;

    /// Answers every control point write with a SUCCESS indication. The
    /// write receiver must be installed before the command future runs.
    async fn respond_success(mut writes: Writes, ctl: &MachineController, count: usize) {
        for _ in 0..count {
            let (_, data) = writes.next().await.unwrap();
            ctl.on_indication(&[0x80, data[0], 0x01]);
        }
    }

    #[tokio::test]
    async fn set_speed_auto_requests_control_first() {
        let sink = RecordingSink::new();
        let ctl = controller(&sink);
        let io = FakeIo::new(&[uuids::MACHINE_STATUS, uuids::CONTROL_POINT]);

        let responder = respond_success(io.on_write(), &ctl, 2);
        let command = ctl.write_command(
            &io,
            &ControlRequest::SetTargetSpeed(12.0),
            DEFAULT_TIMEOUT,
        );

        let (result, _) = tokio::join!(command, responder);

        assert_eq!(result.unwrap(), ResultCode::Success);
        assert!(ctl.is_authorized());

        let written = io.written();

        assert_eq!(written.len(), 2);
        assert_eq!(written[0].1, [0x00]);
        assert_eq!(written[1].1[0], 0x02);

        let events = sink.events();

        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            FtmsEvent::Setup {
                source: ControlSource::Callback,
                name: "target_speed",
                value: Value::Float(12.0),
            }
        );
    }

    #[tokio::test]
    async fn non_success_result_is_a_value_without_event() {
        let sink = RecordingSink::new();
        let ctl = controller(&sink);
        let io = FakeIo::new(&[uuids::CONTROL_POINT]);

        let mut writes = io.on_write();

        let responder = async {
            let (_, data) = writes.next().await.unwrap();
            ctl.on_indication(&[0x80, data[0], 0x02]);
        };

        let command = ctl.write_command(&io, &ControlRequest::RequestControl, DEFAULT_TIMEOUT);

        let (result, _) = tokio::join!(command, responder);

        assert_eq!(result.unwrap(), ResultCode::NotSupported);
        assert!(!ctl.is_authorized());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn mismatched_request_opcode_is_a_protocol_error() {
        let sink = RecordingSink::new();
        let ctl = controller(&sink);
        let io = FakeIo::new(&[uuids::CONTROL_POINT]);

        let mut writes = io.on_write();

        let responder = async {
            let _ = writes.next().await.unwrap();
            ctl.on_indication(&[0x80, 0x05, 0x01]);
        };

        let command = ctl.write_command(&io, &ControlRequest::RequestControl, DEFAULT_TIMEOUT);

        let (result, _) = tokio::join!(command, responder);

        assert!(matches!(result, Err(FtmsError::Protocol(_))));
    }

    #[tokio::test]
    async fn timeout_releases_authorization() {
        let sink = RecordingSink::new();
        let ctl = controller(&sink);
        let io = FakeIo::new(&[uuids::CONTROL_POINT]);

        // Nobody answers.
        let result = ctl
            .write_command(
                &io,
                &ControlRequest::RequestControl,
                Duration::from_millis(20),
            )
            .await;

        assert!(matches!(result, Err(FtmsError::Timeout)));
        assert!(!ctl.is_authorized());
    }

    #[tokio::test]
    async fn transport_error_clears_authorization() {
        let sink = RecordingSink::new();
        let ctl = controller(&sink);
        let io = FakeIo::new(&[uuids::CONTROL_POINT]);

        let responder = respond_success(io.on_write(), &ctl, 1);
        let command = ctl.write_command(&io, &ControlRequest::RequestControl, DEFAULT_TIMEOUT);
        let _ = tokio::join!(command, responder);

        assert!(ctl.is_authorized());

        io.set_write_failure(true);

        let result = ctl
            .write_command(&io, &ControlRequest::Reset, DEFAULT_TIMEOUT)
            .await;

        assert!(matches!(result, Err(FtmsError::Disconnected)));
        assert!(!ctl.is_authorized());
    }

    #[tokio::test]
    async fn disconnect_while_inflight() {
        let sink = RecordingSink::new();
        let ctl = controller(&sink);
        let io = FakeIo::new(&[uuids::CONTROL_POINT]);

        let mut writes = io.on_write();

        let responder = async {
            let _ = writes.next().await.unwrap();
            ctl.reset();
        };

        let command = ctl.write_command(&io, &ControlRequest::RequestControl, DEFAULT_TIMEOUT);

        let (result, _) = tokio::join!(command, responder);

        assert!(matches!(result, Err(FtmsError::Disconnected)));
    }

    #[tokio::test]
    async fn stop_and_pause_requests_emit_control_events() {
        let sink = RecordingSink::new();
        let ctl = controller(&sink);
        let io = FakeIo::new(&[uuids::CONTROL_POINT]);

        let responder = respond_success(io.on_write(), &ctl, 3);

        let commands = async {
            ctl.write_command(
                &io,
                &ControlRequest::StopPause(StopPauseCode::Stop),
                DEFAULT_TIMEOUT,
            )
            .await
            .unwrap();

            ctl.write_command(
                &io,
                &ControlRequest::StopPause(StopPauseCode::Pause),
                DEFAULT_TIMEOUT,
            )
            .await
            .unwrap()
        };

        let _ = tokio::join!(commands, responder);

        let events = sink.events();

        assert_eq!(
            events,
            vec![
                FtmsEvent::Control {
                    id: ControlId::Stop,
                    source: ControlSource::Callback,
                },
                FtmsEvent::Control {
                    id: ControlId::Pause,
                    source: ControlSource::Callback,
                },
            ]
        );
    }

    #[tokio::test]
    async fn spin_down_success_carries_the_speed_window() {
        let sink = RecordingSink::new();
        let ctl = controller(&sink);
        let io = FakeIo::new(&[uuids::CONTROL_POINT]);

        let mut writes = io.on_write();

        let responder = async {
            let (_, data) = writes.next().await.unwrap();
            ctl.on_indication(&[0x80, data[0], 0x01]);

            let (_, data) = writes.next().await.unwrap();
            // 10.00 .. 40.00 km/h window appended
            ctl.on_indication(&[0x80, data[0], 0x01, 0xE8, 0x03, 0xA0, 0x0F]);
        };

        let command = ctl.write_command(
            &io,
            &ControlRequest::SpinDown(SpinDownControlCode::Start),
            DEFAULT_TIMEOUT,
        );

        let (result, _) = tokio::join!(command, responder);

        assert_eq!(result.unwrap(), ResultCode::Success);

        let events = sink.events();

        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            FtmsEvent::SpinDown {
                code: SpinDownControlCode::Start,
                target_speed: Some(SpinDownSpeed {
                    low: 10.0,
                    high: 40.0,
                }),
            }
        );
    }

    #[test]
    fn machine_status_stop_pause_sources_are_user() {
        let sink = RecordingSink::new();
        let ctl = controller(&sink);

        ctl.on_machine_status(&[0x02, 0x01]);
        ctl.on_machine_status(&[0x02, 0x02]);
        ctl.on_machine_status(&[0x03]);
        ctl.on_machine_status(&[0x04]);

        let events = sink.events();

        assert_eq!(
            events,
            vec![
                FtmsEvent::Control {
                    id: ControlId::Stop,
                    source: ControlSource::User,
                },
                FtmsEvent::Control {
                    id: ControlId::Pause,
                    source: ControlSource::User,
                },
                FtmsEvent::Control {
                    id: ControlId::Stop,
                    source: ControlSource::Safety,
                },
                FtmsEvent::Control {
                    id: ControlId::Start,
                    source: ControlSource::User,
                },
            ]
        );
    }

    #[test]
    fn machine_status_setting_change_is_a_setup_event() {
        let sink = RecordingSink::new();
        let ctl = controller(&sink);

        ctl.on_machine_status(&[0x05, 0x69, 0x00]);

        assert_eq!(
            sink.events(),
            vec![FtmsEvent::Setup {
                source: ControlSource::Other,
                name: "target_speed",
                value: Value::Float(1.05),
            }]
        );
    }

    #[test]
    fn spin_down_status_is_surfaced_as_a_typed_setup_event() {
        let sink = RecordingSink::new();
        let ctl = controller(&sink);

        ctl.on_machine_status(&[0x14, 0x02]);

        assert_eq!(
            sink.events(),
            vec![FtmsEvent::Setup {
                source: ControlSource::Other,
                name: "spin_down_status",
                value: Value::SpinDownStatus(SpinDownStatusCode::Success),
            }]
        );

        // Out-of-range status codes are dropped.
        ctl.on_machine_status(&[0x14, 0x09]);

        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn lost_control_is_silent_and_reauths_on_next_write() {
        let sink = RecordingSink::new();
        let ctl = controller(&sink);
        let io = FakeIo::new(&[uuids::CONTROL_POINT]);

        // Become authorised first.
        let responder = respond_success(io.on_write(), &ctl, 1);
        let command = ctl.write_command(&io, &ControlRequest::RequestControl, DEFAULT_TIMEOUT);
        let _ = tokio::join!(command, responder);

        assert!(ctl.is_authorized());

        ctl.on_machine_status(&[0xFF]);

        assert!(!ctl.is_authorized());
        assert!(sink.events().is_empty());

        // The next command re-requests control transparently.
        let responder = respond_success(io.on_write(), &ctl, 2);
        let command = ctl.write_command(
            &io,
            &ControlRequest::SetTargetPower(150),
            DEFAULT_TIMEOUT,
        );

        let (result, _) = tokio::join!(command, responder);

        assert_eq!(result.unwrap(), ResultCode::Success);
        assert!(ctl.is_authorized());

        let opcodes: Vec<u8> = io.written().iter().map(|(_, d)| d[0]).collect();

        assert_eq!(opcodes, vec![0x00, 0x00, 0x05]);
    }

    #[tokio::test]
    async fn invalid_target_time_arity_fails_without_a_write() {
        let sink = RecordingSink::new();
        let ctl = controller(&sink);
        let io = FakeIo::new(&[uuids::CONTROL_POINT]);

        let result = ctl
            .write_command(
                &io,
                &ControlRequest::SetTargetTime(vec![1, 2, 3, 4]),
                DEFAULT_TIMEOUT,
            )
            .await;

        assert_eq!(result.unwrap(), ResultCode::InvalidParameter);
        assert!(io.written().is_empty());
    }

    #[tokio::test]
    async fn subscribe_reads_the_initial_training_status() {
        let sink = RecordingSink::new();
        let ctl = controller(&sink);
        let io = FakeIo::new(ALL_CHARS);

        io.set_read(uuids::TRAINING_STATUS, &[0x00, 0x01]);

        ctl.subscribe(&io).await.unwrap();

        assert_eq!(
            sink.events(),
            vec![FtmsEvent::TrainingStatus {
                code: TrainingStatusCode::Idle,
                text: None,
            }]
        );

        assert_eq!(io.subscribed().len(), 3);

        // Idempotent.
        ctl.subscribe(&io).await.unwrap();

        assert_eq!(io.subscribed().len(), 3);
    }
}
