//! The unified event stream produced by the updater and the controller.

use crate::models::spin_down::{SpinDownControlCode, SpinDownSpeed};
use crate::models::training_status::TrainingStatusCode;
use crate::serializer::{FieldMap, Value};

/// Who triggered a control or setup event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSource {
    /// Confirmation of a command this client issued.
    Callback,
    /// The user pressed a button on the machine.
    User,
    /// The safety key.
    Safety,
    Other,
}

impl ControlSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlSource::Callback => "callback",
            ControlSource::User => "user",
            ControlSource::Safety => "safety",
            ControlSource::Other => "other",
        }
    }
}

/// The simple control transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlId {
    Start,
    Stop,
    Pause,
    Reset,
}

impl ControlId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlId::Start => "start",
            ControlId::Stop => "stop",
            ControlId::Pause => "pause",
            ControlId::Reset => "reset",
        }
    }
}

/// One event of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum FtmsEvent {
    /// Realtime training data changed; carries only the delta against the
    /// previously emitted snapshot.
    Update { data: FieldMap },

    /// A target setting changed, either as confirmation of our own command
    /// or reported asynchronously by the machine.
    Setup {
        source: ControlSource,
        name: &'static str,
        value: Value,
    },

    /// Start/stop/pause/reset transition.
    Control { id: ControlId, source: ControlSource },

    /// Training status changed.
    TrainingStatus {
        code: TrainingStatusCode,
        text: Option<String>,
    },

    /// The machine accepted or skipped a spin down procedure.
    SpinDown {
        code: SpinDownControlCode,
        target_speed: Option<SpinDownSpeed>,
    },
}

impl FtmsEvent {
    /// Stable string tag of the event.
    pub fn id(&self) -> &'static str {
        match self {
            FtmsEvent::Update { .. } => "update",
            FtmsEvent::Setup { .. } => "setup",
            FtmsEvent::Control { id, .. } => id.as_str(),
            FtmsEvent::TrainingStatus { .. } => "training_status",
            FtmsEvent::SpinDown { .. } => "spin_down",
        }
    }
}

/// Receiver of decoded events. The facade implements this; the controller
/// and updater only hold the trait object, which keeps the ownership graph
/// acyclic. Implementations must be fast and non-blocking: they run on the
/// notification dispatch task.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &FtmsEvent);
}
