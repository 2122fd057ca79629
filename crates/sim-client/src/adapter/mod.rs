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

//! Simulator adapter contract.
//!
//! An adapter owns one transport to a running simulator and keeps the most
//! recent [`FlightData`] snapshot in a cache that the stream engine reads
//! from a different task. Adapters are safe to invoke concurrently from the
//! engine (reader) and their internal producer (writer).

mod simconnect;
mod xplane;

pub use simconnect::SimConnectAdapter;
pub use xplane::XPlaneAdapter;

use std::sync::RwLock;
use std::time::Instant;

use thiserror::Error;

use crate::model::FlightData;

/// Errors surfaced by simulator adapters.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The adapter cannot be used in this environment (e.g. the native SDK
    /// is not present on this platform).
    #[error("simulator unavailable: {0}")]
    Unavailable(String),

    /// The transport failed to attach (socket refused, SDK error).
    #[error("failed to open simulator connection: {0}")]
    OpenFailed(String),

    /// A one-shot read was requested but no snapshot has been observed yet.
    #[error("no flight data received yet")]
    NoData,
}

/// Contract implemented by every simulator transport.
///
/// `close` is best-effort: it must release the transport within a bounded
/// duration and never reports failure. Tearing down a misbehaving adapter is
/// the stream engine's job, triggered by staleness, not the adapter's own.
pub trait SimAdapter: Send + Sync {
    /// Attach to the simulator's transport. Fails with
    /// [`AdapterError::Unavailable`] when the simulator is not reachable.
    fn open(&self) -> Result<(), AdapterError>;

    /// Release the transport. Idempotent.
    fn close(&self);

    /// Stable human identifier, used for reconnection dispatch and display.
    fn name(&self) -> &'static str;

    /// The most recent snapshot, or [`AdapterError::NoData`] when none has
    /// been observed yet.
    fn latest(&self) -> Result<FlightData, AdapterError>;

    /// Wall-clock time at which `latest` last changed. `None` when no
    /// snapshot has been observed yet.
    fn last_received(&self) -> Option<Instant>;
}

/// Shared snapshot slot written by an adapter's producer and read by the
/// engine. Writers publish a fully-updated snapshot under the exclusive
/// lock; readers always observe a complete value.
#[derive(Debug, Default)]
pub(crate) struct SnapshotCell {
    inner: RwLock<CellState>,
}

#[derive(Debug, Default)]
struct CellState {
    snapshot: Option<FlightData>,
    last_received: Option<Instant>,
}

impl SnapshotCell {
    /// Replace the cached snapshot and touch the last-received clock.
    pub(crate) fn publish(&self, snapshot: FlightData) {
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());
        state.snapshot = Some(snapshot);
        state.last_received = Some(Instant::now());
    }

    /// Mutate the cached snapshot in place, creating a default one on first
    /// use. Touches the last-received clock only when `touch` is true.
    pub(crate) fn update<F: FnOnce(&mut FlightData)>(&self, touch: bool, apply: F) {
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());
        apply(state.snapshot.get_or_insert_with(FlightData::default));
        if touch {
            state.last_received = Some(Instant::now());
        }
    }

    pub(crate) fn latest(&self) -> Result<FlightData, AdapterError> {
        let state = self.inner.read().unwrap_or_else(|e| e.into_inner());
        state.snapshot.clone().ok_or(AdapterError::NoData)
    }

    pub(crate) fn last_received(&self) -> Option<Instant> {
        let state = self.inner.read().unwrap_or_else(|e| e.into_inner());
        state.last_received
    }

    /// Drop the cached snapshot and clock, returning the cell to its
    /// never-received state.
    pub(crate) fn clear(&self) {
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());
        state.snapshot = None;
        state.last_received = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_starts_empty() {
        let cell = SnapshotCell::default();
        assert!(matches!(cell.latest(), Err(AdapterError::NoData)));
        assert!(cell.last_received().is_none());
    }

    #[test]
    fn test_publish_then_clear() {
        let cell = SnapshotCell::default();
        let mut snap = FlightData::default();
        snap.position.latitude = 51.4775;
        cell.publish(snap);

        let got = cell.latest().unwrap();
        assert!((got.position.latitude - 51.4775).abs() < f64::EPSILON);
        assert!(cell.last_received().is_some());

        cell.clear();
        assert!(matches!(cell.latest(), Err(AdapterError::NoData)));
        assert!(cell.last_received().is_none());
    }

    #[test]
    fn test_update_without_touch_leaves_clock_unset() {
        let cell = SnapshotCell::default();
        cell.update(false, |snap| snap.position.longitude = -0.4614);
        assert!(cell.last_received().is_none());
        assert!((cell.latest().unwrap().position.longitude + 0.4614).abs() < f64::EPSILON);
    }
}
