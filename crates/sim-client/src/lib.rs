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

//! Simulator client library for sampling live flight telemetry.
//!
//! This library provides a modular architecture for reading a unified
//! telemetry snapshot out of a running flight simulator. It is built from
//! layers that can be used independently or composed together:
//!
//! - **Model layer**: the unified [`FlightData`] snapshot every adapter
//!   produces, with units normalised at the adapter boundary.
//! - **Adapter layer**: one transport per simulator, [`SimConnectAdapter`]
//!   for the native SDK and [`XPlaneAdapter`] for the RREF UDP protocol,
//!   behind the common [`SimAdapter`] contract.
//! - **Engine layer**: a supervised polling loop ([`StreamEngine`]) that
//!   detects stale streams, reconnects with backoff, and fans snapshots out
//!   to an injected [`EventSink`] and, while armed, a [`RecordingSink`].
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use sim_client::{EngineConfig, EventSink, FlightData, RecordingSink, SimKind, StreamEngine};
//!
//! struct Printer;
//!
//! impl EventSink for Printer {
//!     fn flight_data(&self, snapshot: &FlightData) {
//!         println!("{:.4} {:.4}", snapshot.position.latitude, snapshot.position.longitude);
//!     }
//!     fn connection_state(&self, simulator: &str) {
//!         println!("connection: {simulator:?}");
//!     }
//!     fn recording_state(&self, _recording: bool) {}
//! }
//!
//! struct NoRecorder;
//!
//! impl RecordingSink for NoRecorder {
//!     fn append(
//!         &self,
//!         _snapshot: &FlightData,
//!     ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = StreamEngine::new(EngineConfig::default(), Arc::new(Printer), Arc::new(NoRecorder));
//!     let simulator = engine.connect(SimKind::Auto).await.expect("no simulator found");
//!     println!("connected to {simulator}");
//!     tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!     engine.disconnect();
//! }
//! ```

pub mod adapter;
pub mod engine;
pub mod model;

pub use adapter::{AdapterError, SimAdapter, SimConnectAdapter, XPlaneAdapter};
pub use engine::{
    EngineConfig, EngineError, EventSink, RecordingSink, SimKind, SnapshotSource, StreamEngine,
};
pub use model::{
    Apu, Attitude, Autopilot, Controls, Door, EngineData, FlightData, Lights, Position, Radios,
    Sensors, SimTime, TransponderState, Weight, DOOR_SLOTS, ENGINE_SLOTS,
};
