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

//! Typed event bus between the agent core and the UI shell.
//!
//! The bus is the single sink every core component emits into. The UI (or
//! the headless logger in `main`) subscribes and renders; emitting never
//! blocks, and events published with no subscriber are dropped.

use std::sync::Arc;

use tokio::sync::broadcast;

use sim_client::{EventSink, FlightData};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Flight reporter lifecycle state, as published to the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlightState {
    #[default]
    Idle,
    Active,
}

impl FlightState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
        }
    }
}

/// Events published to the UI.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// A telemetry snapshot from a successful engine tick.
    FlightData(Arc<FlightData>),
    /// Connection transition: the adapter name, or empty when disconnected.
    ConnectionState(String),
    /// Recording armed/disarmed.
    RecordingState(bool),
    /// Flight reporter transitioned between idle and active.
    FlightState(FlightState),
}

/// Broadcast-backed event bus.
pub struct EventBus {
    tx: broadcast::Sender<AgentEvent>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to all agent events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: AgentEvent) {
        let _ = self.tx.send(event);
    }

    pub fn flight_state(&self, state: FlightState) {
        self.emit(AgentEvent::FlightState(state));
    }
}

impl EventSink for EventBus {
    fn flight_data(&self, snapshot: &FlightData) {
        self.emit(AgentEvent::FlightData(Arc::new(snapshot.clone())));
    }

    fn connection_state(&self, simulator: &str) {
        self.emit(AgentEvent::ConnectionState(simulator.to_string()));
    }

    fn recording_state(&self, recording: bool) {
        self.emit(AgentEvent::RecordingState(recording));
    }
}
