//! Realtime training data updater.
//!
//! Reassembles `More Data` continuations into one record, filters the
//! all-zero frames machines emit while idle and turns the rest into
//! [`FtmsEvent::Update`] deltas against the previously emitted snapshot.

use std::sync::{Arc, Mutex};

use crate::errors::Result;
use crate::event::{EventSink, FtmsEvent};
use crate::machine_type::MachineType;
use crate::models::realtime;
use crate::serializer::FieldMap;

#[derive(Default)]
struct State {
    /// Accumulator of the record being assembled.
    cur: FieldMap,
    /// Snapshot at the last emitted update.
    prev: FieldMap,
}

pub struct DataUpdater {
    machine_type: MachineType,
    sink: Arc<dyn EventSink>,
    state: Mutex<State>,
}

impl DataUpdater {
    pub fn new(machine_type: MachineType, sink: Arc<dyn EventSink>) -> Self {
        Self {
            machine_type,
            sink,
            state: Mutex::new(State::default()),
        }
    }

    /// Resets the accumulator and snapshot. Call on disconnect.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();

        state.cur.clear();
        state.prev.clear();
    }

    /// Handles one realtime data notification.
    pub fn on_notification(&self, data: &[u8]) -> Result<()> {
        let record = realtime::decode(self.machine_type, data)?;

        let delta = {
            let mut state = self.state.lock().unwrap();

            state.cur.extend(record.values);

            // Wait for the rest of the record.
            if record.more_data {
                return Ok(());
            }

            // Machines send plenty of null records during wakeup and
            // sleep; drop them instead of reporting noise.
            if state.cur.values().all(|v| v.is_zero()) {
                state.cur.clear();
                return Ok(());
            }

            let mut delta = FieldMap::new();

            for (name, value) in state.cur.iter() {
                if state.prev.get(name) != Some(value) {
                    delta.insert(*name, value.clone());
                }
            }

            if !delta.is_empty() {
                state.prev = state.cur.clone();
            }

            state.cur.clear();

            delta
        };

        if !delta.is_empty() {
            self.sink.on_event(&FtmsEvent::Update { data: delta });
        }

        Ok(())
    }
}
