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

//! Supervised data-stream engine.
//!
//! The engine owns at most one adapter and polls it on a ticker. Successful
//! reads are re-emitted to the event sink (and to the recording sink while
//! recording is armed); failed or stale reads flip the engine inactive and
//! start a close/re-open reconnect cycle with doubling backoff. Engine
//! state lives under one mutex; adapter calls are always made outside it so
//! they cannot deadlock against adapter-internal locks.

use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{info, warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::adapter::{AdapterError, SimAdapter, SimConnectAdapter, XPlaneAdapter};
use crate::model::FlightData;

/// Errors surfaced by the stream engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A read was requested while no simulator is connected.
    #[error("no simulator connected")]
    NotConnected,

    /// The adapter opened but produced no snapshot within the handshake
    /// deadline: the simulator is observable but silent.
    #[error("simulator connected but sent no data")]
    Silent,

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Which simulator transport to connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimKind {
    /// The native SimConnect binding.
    SimConnect,
    /// The X-Plane UDP protocol.
    XPlane,
    /// Try SimConnect first, fall back to X-Plane.
    Auto,
}

impl FromStr for SimKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simconnect" | "native" | "msfs" => Ok(Self::SimConnect),
            "xplane" | "x-plane" | "udp" => Ok(Self::XPlane),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown simulator kind: {other}")),
        }
    }
}

/// Sink for engine events. Implementations must be thread-safe and
/// non-blocking; the engine calls them from its polling task.
pub trait EventSink: Send + Sync {
    /// A snapshot was read this tick.
    fn flight_data(&self, snapshot: &FlightData);
    /// Connection transition; `simulator` is the adapter name, or empty
    /// when disconnected.
    fn connection_state(&self, simulator: &str);
    /// Recording was armed or disarmed.
    fn recording_state(&self, recording: bool);
}

/// Destination for snapshots while recording is armed.
pub trait RecordingSink: Send + Sync {
    fn append(
        &self,
        snapshot: &FlightData,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// One-shot read access to the engine's latest snapshot, consumed by the
/// flight reporter without subscribing to the event stream.
pub trait SnapshotSource: Send + Sync {
    fn snapshot(&self) -> Option<FlightData>;
    /// Name of the currently bound adapter, if any.
    fn simulator(&self) -> Option<&'static str>;
}

/// Engine timing knobs. Defaults match production behaviour; tests shrink
/// them to keep wall-clock time down.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// X-Plane `host:port` used when constructing the UDP adapter.
    pub xplane_addr: String,
    /// Poll ticker period.
    pub poll_interval: Duration,
    /// A snapshot older than this while active counts as a failure.
    pub stale_after: Duration,
    /// First reconnect delay after a failure.
    pub initial_backoff: Duration,
    /// Reconnect delay ceiling.
    pub max_backoff: Duration,
    /// How long a fresh connection may stay silent before it is torn down.
    pub connect_timeout: Duration,
    /// Probe period while waiting for the first snapshot.
    pub probe_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            xplane_addr: "127.0.0.1:49000".to_string(),
            poll_interval: Duration::from_secs(1),
            stale_after: Duration::from_secs(10),
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(3),
            probe_interval: Duration::from_millis(200),
        }
    }
}

#[derive(Default)]
struct EngineState {
    adapter: Option<Arc<dyn SimAdapter>>,
    sim_active: bool,
    recording: bool,
    recording_since: Option<Instant>,
    backoff: Option<Duration>,
    last_attempt: Option<Instant>,
    poll_cancel: Option<CancellationToken>,
}

/// Double a reconnect delay, saturating at the ceiling.
fn next_backoff(current: Duration, max: Duration) -> Duration {
    (current * 2).min(max)
}

/// The supervised stream engine. Cheap to clone via internal `Arc`.
pub struct StreamEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    events: Arc<dyn EventSink>,
    recorder: Arc<dyn RecordingSink>,
    state: Mutex<EngineState>,
}

impl std::fmt::Debug for StreamEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamEngine")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Clone for StreamEngine {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl StreamEngine {
    #[must_use]
    pub fn new(
        config: EngineConfig,
        events: Arc<dyn EventSink>,
        recorder: Arc<dyn RecordingSink>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config,
                events,
                recorder,
                state: Mutex::new(EngineState::default()),
            }),
        }
    }

    /// Connect the requested simulator kind and start the polling loop.
    ///
    /// Returns the adapter name once data is flowing. If the adapter opens
    /// but stays silent past the handshake deadline it is torn down again
    /// and [`EngineError::Silent`] is returned, so a successful connect
    /// always means live telemetry.
    pub async fn connect(&self, kind: SimKind) -> Result<&'static str, EngineError> {
        self.disconnect();
        let adapter: Arc<dyn SimAdapter> = match kind {
            SimKind::SimConnect => {
                let adapter = SimConnectAdapter::new();
                adapter.open()?;
                Arc::new(adapter)
            }
            SimKind::XPlane => {
                let adapter = XPlaneAdapter::new(self.inner.config.xplane_addr.clone());
                adapter.open()?;
                Arc::new(adapter)
            }
            SimKind::Auto => {
                let native = SimConnectAdapter::new();
                match native.open() {
                    Ok(()) => Arc::new(native),
                    Err(err) => {
                        info!("SimConnect not available ({err}), trying X-Plane");
                        let fallback =
                            XPlaneAdapter::new(self.inner.config.xplane_addr.clone());
                        fallback.open()?;
                        Arc::new(fallback)
                    }
                }
            }
        };

        self.connect_adapter(adapter).await
    }

    /// Bind an already-opened adapter and wait for the first snapshot.
    /// Exposed so callers can plug in their own [`SimAdapter`]
    /// implementation.
    pub async fn connect_adapter(
        &self,
        adapter: Arc<dyn SimAdapter>,
    ) -> Result<&'static str, EngineError> {
        self.disconnect();
        let name = adapter.name();

        let cancel = CancellationToken::new();
        {
            let mut state = self.lock_state();
            state.adapter = Some(Arc::clone(&adapter));
            state.sim_active = false;
            state.backoff = None;
            state.last_attempt = None;
            state.poll_cancel = Some(cancel.clone());
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { poll_loop(&inner, cancel).await });

        let deadline = Instant::now() + self.inner.config.connect_timeout;
        loop {
            if self.is_connected() {
                info!("connected to {name}");
                return Ok(name);
            }
            if Instant::now() >= deadline {
                self.disconnect();
                return Err(EngineError::Silent);
            }
            tokio::time::sleep(self.inner.config.probe_interval).await;
        }
    }

    /// Stop polling, close the adapter and emit one empty connection-state
    /// event. No-op when nothing is connected.
    pub fn disconnect(&self) {
        let (adapter, cancel) = {
            let mut state = self.lock_state();
            state.sim_active = false;
            state.backoff = None;
            state.last_attempt = None;
            (state.adapter.take(), state.poll_cancel.take())
        };
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if let Some(adapter) = adapter {
            adapter.close();
            info!("disconnected from {}", adapter.name());
            self.inner.events.connection_state("");
        }
    }

    /// True once a snapshot has been delivered and neither failure nor
    /// staleness has reset the stream since.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.lock_state().sim_active
    }

    /// One-shot read of the latest snapshot.
    pub fn latest(&self) -> Result<FlightData, EngineError> {
        let adapter = self.lock_state().adapter.clone();
        match adapter {
            Some(adapter) => Ok(adapter.latest()?),
            None => Err(EngineError::NotConnected),
        }
    }

    /// Arm recording; snapshots are appended to the recording sink on every
    /// successful tick until disarmed.
    pub fn start_recording(&self) {
        {
            let mut state = self.lock_state();
            if !state.recording {
                state.recording = true;
                state.recording_since = Some(Instant::now());
            }
        }
        self.inner.events.recording_state(true);
    }

    pub fn stop_recording(&self) {
        {
            let mut state = self.lock_state();
            state.recording = false;
            state.recording_since = None;
        }
        self.inner.events.recording_state(false);
    }

    /// Armed flag and seconds since arming.
    #[must_use]
    pub fn recording_status(&self) -> (bool, u64) {
        let state = self.lock_state();
        let seconds = state
            .recording_since
            .map_or(0, |since| since.elapsed().as_secs());
        (state.recording, seconds)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SnapshotSource for StreamEngine {
    fn snapshot(&self) -> Option<FlightData> {
        self.latest().ok()
    }

    fn simulator(&self) -> Option<&'static str> {
        self.lock_state().adapter.as_ref().map(|a| a.name())
    }
}

async fn poll_loop(inner: &Arc<EngineInner>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(inner.config.poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }
        tick(inner);
    }
}

/// One engine tick. The adapter reference is snapshotted under the state
/// lock and every adapter call happens after the lock is released.
fn tick(inner: &Arc<EngineInner>) {
    let adapter = {
        let state = inner.state.lock().unwrap_or_else(|e| e.into_inner());
        state.adapter.clone()
    };
    let Some(adapter) = adapter else { return };

    let latest = adapter.latest();
    let stale = {
        let state = inner.state.lock().unwrap_or_else(|e| e.into_inner());
        state.sim_active
            && adapter
                .last_received()
                .is_some_and(|at| at.elapsed() > inner.config.stale_after)
    };

    match latest {
        Ok(snapshot) if !stale => on_snapshot(inner, adapter.name(), &snapshot),
        _ => on_failure(inner, &adapter),
    }
}

fn on_snapshot(inner: &Arc<EngineInner>, name: &str, snapshot: &FlightData) {
    let (became_active, recording) = {
        let mut state = inner.state.lock().unwrap_or_else(|e| e.into_inner());
        let became_active = !state.sim_active;
        state.sim_active = true;
        state.backoff = None;
        state.last_attempt = None;
        (became_active, state.recording)
    };

    if became_active {
        info!("simulator stream active: {name}");
        inner.events.connection_state(name);
    }
    inner.events.flight_data(snapshot);

    if recording {
        if let Err(err) = inner.recorder.append(snapshot) {
            warn!("failed to record snapshot: {err}");
        }
    }
}

fn on_failure(inner: &Arc<EngineInner>, adapter: &Arc<dyn SimAdapter>) {
    let now = Instant::now();
    let (lost, attempt) = {
        let mut state = inner.state.lock().unwrap_or_else(|e| e.into_inner());
        let lost = state.sim_active;
        if lost {
            state.sim_active = false;
            state.backoff = Some(inner.config.initial_backoff);
            state.last_attempt = Some(now);
        }
        let attempt = match (state.backoff, state.last_attempt) {
            (Some(backoff), Some(at)) => now.duration_since(at) >= backoff,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if attempt {
            state.last_attempt = Some(now);
        }
        (lost, attempt)
    };

    if lost {
        warn!("simulator stream lost on {}", adapter.name());
        inner.events.connection_state("");
    }

    if attempt {
        adapter.close();
        match adapter.open() {
            Ok(()) => {
                info!("reopened {}", adapter.name());
                let mut state = inner.state.lock().unwrap_or_else(|e| e.into_inner());
                state.backoff = Some(inner.config.initial_backoff);
            }
            Err(err) => {
                let mut state = inner.state.lock().unwrap_or_else(|e| e.into_inner());
                let current = state.backoff.unwrap_or(inner.config.initial_backoff);
                let delayed = next_backoff(current, inner.config.max_backoff);
                state.backoff = Some(delayed);
                warn!(
                    "reconnect to {} failed ({err}); next attempt in {:.0?}",
                    adapter.name(),
                    delayed
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::SnapshotCell;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeAdapter {
        cell: SnapshotCell,
        fail_open: AtomicBool,
        opens: AtomicUsize,
        closes: AtomicUsize,
    }

    impl FakeAdapter {
        fn publish(&self, latitude: f64) {
            let mut snap = FlightData::default();
            snap.position.latitude = latitude;
            self.cell.publish(snap);
        }
    }

    impl SimAdapter for FakeAdapter {
        fn open(&self) -> Result<(), AdapterError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self.fail_open.load(Ordering::SeqCst) {
                Err(AdapterError::OpenFailed("fixture refused".to_string()))
            } else {
                Ok(())
            }
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "Fake"
        }

        fn latest(&self) -> Result<FlightData, AdapterError> {
            self.cell.latest()
        }

        fn last_received(&self) -> Option<Instant> {
            self.cell.last_received()
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        Data(f64),
        Conn(String),
        Rec(bool),
    }

    #[derive(Default)]
    struct SpySink {
        seen: Mutex<Vec<Seen>>,
    }

    impl SpySink {
        fn events(&self) -> Vec<Seen> {
            self.seen.lock().unwrap().clone()
        }

        fn connections(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Seen::Conn(s) => Some(s),
                    _ => None,
                })
                .collect()
        }

        fn data_count(&self) -> usize {
            self.events()
                .iter()
                .filter(|e| matches!(e, Seen::Data(_)))
                .count()
        }
    }

    impl EventSink for SpySink {
        fn flight_data(&self, snapshot: &FlightData) {
            self.seen
                .lock()
                .unwrap()
                .push(Seen::Data(snapshot.position.latitude));
        }

        fn connection_state(&self, simulator: &str) {
            self.seen
                .lock()
                .unwrap()
                .push(Seen::Conn(simulator.to_string()));
        }

        fn recording_state(&self, recording: bool) {
            self.seen.lock().unwrap().push(Seen::Rec(recording));
        }
    }

    #[derive(Default)]
    struct SpyRecorder {
        appended: AtomicUsize,
    }

    impl RecordingSink for SpyRecorder {
        fn append(
            &self,
            _snapshot: &FlightData,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.appended.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_config() -> EngineConfig {
        EngineConfig {
            xplane_addr: "127.0.0.1:49000".to_string(),
            poll_interval: Duration::from_millis(20),
            stale_after: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(40),
            max_backoff: Duration::from_millis(160),
            connect_timeout: Duration::from_millis(500),
            probe_interval: Duration::from_millis(10),
        }
    }

    fn engine_with(
        sink: &Arc<SpySink>,
        recorder: &Arc<SpyRecorder>,
    ) -> StreamEngine {
        StreamEngine::new(
            test_config(),
            Arc::clone(sink) as Arc<dyn EventSink>,
            Arc::clone(recorder) as Arc<dyn RecordingSink>,
        )
    }

    async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cond()
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let max = Duration::from_secs(30);
        let mut backoff = Duration::from_secs(2);
        let mut last = Duration::ZERO;
        for _ in 0..8 {
            assert!(backoff > last, "backoff must increase monotonically");
            assert!(backoff >= Duration::from_secs(2) && backoff <= Duration::from_secs(60));
            last = backoff;
            if backoff == max {
                break;
            }
            backoff = next_backoff(backoff, max);
        }
        assert_eq!(backoff, max);
        assert_eq!(next_backoff(max, max), max);
    }

    #[test]
    fn test_sim_kind_parse() {
        assert_eq!("simconnect".parse::<SimKind>().unwrap(), SimKind::SimConnect);
        assert_eq!("udp".parse::<SimKind>().unwrap(), SimKind::XPlane);
        assert_eq!("X-Plane".parse::<SimKind>().unwrap(), SimKind::XPlane);
        assert_eq!("auto".parse::<SimKind>().unwrap(), SimKind::Auto);
        assert!("flightgear".parse::<SimKind>().is_err());
    }

    #[tokio::test]
    async fn test_connect_emits_name_then_data() {
        let sink = Arc::new(SpySink::default());
        let recorder = Arc::new(SpyRecorder::default());
        let engine = engine_with(&sink, &recorder);

        let adapter = Arc::new(FakeAdapter::default());
        adapter.publish(51.4775);

        let name = engine.connect_adapter(adapter).await.unwrap();
        assert_eq!(name, "Fake");
        assert!(engine.is_connected());

        assert!(wait_until(Duration::from_secs(1), || sink.data_count() >= 3).await);
        let events = sink.events();
        let first_conn = events.iter().position(|e| matches!(e, Seen::Conn(_))).unwrap();
        let first_data = events.iter().position(|e| matches!(e, Seen::Data(_))).unwrap();
        assert!(first_conn < first_data, "connection event precedes data");
        assert_eq!(sink.connections(), vec!["Fake".to_string()]);

        engine.disconnect();
    }

    #[tokio::test]
    async fn test_silent_adapter_is_torn_down() {
        let sink = Arc::new(SpySink::default());
        let recorder = Arc::new(SpyRecorder::default());
        let engine = engine_with(&sink, &recorder);

        let adapter = Arc::new(FakeAdapter::default());
        let result = engine.connect_adapter(Arc::clone(&adapter) as Arc<dyn SimAdapter>).await;
        assert!(matches!(result, Err(EngineError::Silent)));
        assert!(!engine.is_connected());
        assert!(adapter.closes.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_disconnect_emits_single_empty_state_and_stops_data() {
        let sink = Arc::new(SpySink::default());
        let recorder = Arc::new(SpyRecorder::default());
        let engine = engine_with(&sink, &recorder);

        let adapter = Arc::new(FakeAdapter::default());
        adapter.publish(1.0);
        engine.connect_adapter(adapter).await.unwrap();
        assert!(wait_until(Duration::from_secs(1), || sink.data_count() >= 1).await);

        engine.disconnect();
        let count_at_disconnect = sink.data_count();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!engine.is_connected());
        assert!(sink.data_count() <= count_at_disconnect + 1, "poll loop kept emitting");
        let connections = sink.connections();
        assert_eq!(connections.iter().filter(|c| c.is_empty()).count(), 1);
        assert!(matches!(engine.latest(), Err(EngineError::NotConnected)));
    }

    #[tokio::test]
    async fn test_staleness_triggers_reconnect_and_recovery() {
        let sink = Arc::new(SpySink::default());
        let recorder = Arc::new(SpyRecorder::default());
        let config = EngineConfig {
            stale_after: Duration::from_millis(120),
            ..test_config()
        };
        let engine = StreamEngine::new(
            config,
            Arc::clone(&sink) as Arc<dyn EventSink>,
            Arc::clone(&recorder) as Arc<dyn RecordingSink>,
        );

        let adapter = Arc::new(FakeAdapter::default());
        adapter.publish(10.0);
        engine
            .connect_adapter(Arc::clone(&adapter) as Arc<dyn SimAdapter>)
            .await
            .unwrap();

        // Stop publishing; the cached snapshot ages past stale_after.
        assert!(
            wait_until(Duration::from_secs(2), || {
                sink.connections().iter().any(String::is_empty)
            })
            .await,
            "staleness never flipped the stream inactive"
        );
        assert!(
            wait_until(Duration::from_secs(2), || {
                adapter.opens.load(Ordering::SeqCst) >= 2
            })
            .await,
            "no reconnect attempt observed"
        );

        // Fresh data restores the stream exactly once.
        adapter.publish(11.0);
        assert!(
            wait_until(Duration::from_secs(2), || {
                sink.connections().last().is_some_and(|c| c == "Fake")
            })
            .await
        );
        assert!(engine.is_connected());
        let connections = sink.connections();
        assert_eq!(connections.iter().filter(|c| c.is_empty()).count(), 1);
        assert_eq!(connections.iter().filter(|c| *c == "Fake").count(), 2);

        engine.disconnect();
    }

    #[tokio::test]
    async fn test_recording_appends_only_while_armed() {
        let sink = Arc::new(SpySink::default());
        let recorder = Arc::new(SpyRecorder::default());
        let engine = engine_with(&sink, &recorder);

        let adapter = Arc::new(FakeAdapter::default());
        adapter.publish(2.0);
        engine.connect_adapter(adapter).await.unwrap();

        assert_eq!(recorder.appended.load(Ordering::SeqCst), 0);
        engine.start_recording();
        assert!(engine.recording_status().0);
        assert!(
            wait_until(Duration::from_secs(1), || {
                recorder.appended.load(Ordering::SeqCst) >= 2
            })
            .await
        );

        engine.stop_recording();
        let at_stop = recorder.appended.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(recorder.appended.load(Ordering::SeqCst) <= at_stop + 1);

        let events = sink.events();
        assert!(events.contains(&Seen::Rec(true)));
        assert!(events.contains(&Seen::Rec(false)));

        engine.disconnect();
    }

    #[tokio::test]
    async fn test_xplane_end_to_end_emits_flight_data() {
        let fixture = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        fixture
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();
        let fixture_addr = fixture.local_addr().unwrap();

        // Fixture simulator: learns the agent's address from its subscribe
        // datagrams, then streams lat/lon/altitude responses.
        std::thread::spawn(move || {
            let mut peer = None;
            let mut buf = [0u8; 512];
            let mut response = Vec::new();
            response.extend_from_slice(b"RREF\0");
            for (index, value) in [(0u32, 51.4775f32), (1, -0.4614), (2, 25.3)] {
                response.extend_from_slice(&index.to_le_bytes());
                response.extend_from_slice(&value.to_le_bytes());
            }
            for _ in 0..40 {
                if let Ok((_, from)) = fixture.recv_from(&mut buf) {
                    peer = Some(from);
                }
                if let Some(peer) = peer {
                    let _ = fixture.send_to(&response, peer);
                }
                std::thread::sleep(Duration::from_millis(150));
            }
        });

        let sink = Arc::new(SpySink::default());
        let recorder = Arc::new(SpyRecorder::default());
        let config = EngineConfig {
            xplane_addr: fixture_addr.to_string(),
            connect_timeout: Duration::from_secs(3),
            stale_after: Duration::from_secs(10),
            ..test_config()
        };
        let engine = StreamEngine::new(
            config,
            Arc::clone(&sink) as Arc<dyn EventSink>,
            Arc::clone(&recorder) as Arc<dyn RecordingSink>,
        );

        let name = engine.connect(SimKind::XPlane).await.unwrap();
        assert_eq!(name, "X-Plane");

        assert!(wait_until(Duration::from_millis(3_500), || sink.data_count() >= 3).await);
        let latitudes: Vec<f64> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Seen::Data(latitude) => Some(latitude),
                _ => None,
            })
            .collect();
        assert!(latitudes.iter().all(|&lat| (lat - 51.4775).abs() < 1e-4));

        let snap = engine.latest().unwrap();
        assert!((snap.position.altitude - 83.0).abs() < 0.1);
        assert!((snap.position.longitude + 0.4614).abs() < 1e-4);

        engine.disconnect();
    }

    #[tokio::test]
    async fn test_auto_falls_back_and_reports_open_failure() {
        if cfg!(windows) {
            return;
        }
        let sink = Arc::new(SpySink::default());
        let recorder = Arc::new(SpyRecorder::default());
        let mut config = test_config();
        // Unresolvable host: SimConnect is unavailable off Windows and the
        // X-Plane fallback cannot resolve, so auto surfaces OpenFailed.
        config.xplane_addr = "no-such-host.invalid:49000".to_string();
        let engine = StreamEngine::new(
            config,
            Arc::clone(&sink) as Arc<dyn EventSink>,
            Arc::clone(&recorder) as Arc<dyn RecordingSink>,
        );

        let result = engine.connect(SimKind::Auto).await;
        assert!(matches!(
            result,
            Err(EngineError::Adapter(AdapterError::OpenFailed(_)))
        ));
        assert!(!engine.is_connected());
    }
}
