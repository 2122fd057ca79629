// Copyright 2025 SkyLink ACARS Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The agent facade: the request-response surface offered to the UI shell.
//!
//! One `Agent` wires the stream engine, the recording store, the flight
//! reporter and the event bus together. Every call here is the synchronous
//! counterpart of a UI command; continuous state flows through the bus.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use sim_client::{EngineError, FlightData, SimKind, StreamEngine};

use crate::backend::{AcarsApi, BackendError};
use crate::events::{AgentEvent, EventBus, FlightState};
use crate::recording::{RecordingStore, StoreError};
use crate::reporter::FlightReporter;

/// Application-level errors surfaced to the UI.
#[derive(Debug, Error)]
pub enum AcarsError {
    #[error("a flight is already active")]
    AlreadyActive,

    #[error("no flight is active")]
    NotActive,

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Recording status returned by [`Agent::recording_info`].
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingInfo {
    pub recording: bool,
    pub duration_seconds: u64,
    pub data_count: u64,
}

/// Facade over the agent core.
pub struct Agent {
    engine: StreamEngine,
    store: Arc<RecordingStore>,
    reporter: FlightReporter,
    api: Arc<AcarsApi>,
    bus: Arc<EventBus>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("connected", &self.is_connected())
            .field("flight_state", &self.flight_state().as_str())
            .finish_non_exhaustive()
    }
}

impl Agent {
    #[must_use]
    pub fn new(
        engine: StreamEngine,
        store: Arc<RecordingStore>,
        reporter: FlightReporter,
        api: Arc<AcarsApi>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self { engine, store, reporter, api, bus }
    }

    /// Subscribe to the event stream the UI renders.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.bus.subscribe()
    }

    /// Connect a simulator and return its adapter name once data flows.
    pub async fn connect_sim(&self, kind: SimKind) -> Result<&'static str, AcarsError> {
        Ok(self.engine.connect(kind).await?)
    }

    pub fn disconnect_sim(&self) {
        self.engine.disconnect();
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.engine.is_connected()
    }

    /// One-shot read of the latest snapshot.
    pub fn flight_data_now(&self) -> Result<FlightData, AcarsError> {
        Ok(self.engine.latest()?)
    }

    pub fn start_recording(&self) {
        self.engine.start_recording();
    }

    pub fn stop_recording(&self) {
        self.engine.stop_recording();
    }

    pub fn recording_info(&self) -> Result<RecordingInfo, AcarsError> {
        let (recording, duration_seconds) = self.engine.recording_status();
        Ok(RecordingInfo {
            recording,
            duration_seconds,
            data_count: self.store.count()?,
        })
    }

    /// Drain the recording store into a CSV file. Returns the number of
    /// exported rows.
    pub fn export_csv(&self, path: &Path) -> Result<u64, AcarsError> {
        Ok(self.store.export_csv(path)?)
    }

    pub async fn start_flight(
        &self,
        callsign: &str,
        departure: &str,
        arrival: &str,
    ) -> Result<(), AcarsError> {
        self.reporter.start_flight(callsign, departure, arrival).await
    }

    pub async fn stop_flight(&self) -> Result<(), AcarsError> {
        self.reporter.stop_flight().await
    }

    pub async fn finish_flight(&self) -> Result<(), AcarsError> {
        self.reporter.finish_flight().await
    }

    #[must_use]
    pub fn flight_state(&self) -> FlightState {
        self.reporter.state()
    }

    /// Current booking identity, if a flight is active.
    #[must_use]
    pub fn booking(&self) -> Option<(String, String, String)> {
        self.reporter.booking()
    }

    /// Fetch the crew's current booking from the backend as opaque JSON.
    pub async fn get_booking(&self) -> Result<serde_json::Value, AcarsError> {
        Ok(self.api.booking().await?)
    }
}
