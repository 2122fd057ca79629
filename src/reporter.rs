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

//! Flight lifecycle and adaptive position reporting.
//!
//! The reporter is a two-state machine (idle, active). While active it runs
//! a position loop that samples the stream engine's latest snapshot with a
//! one-shot query, adapts its cadence to the flight regime, and files each
//! report with retry. Reports that exhaust their retries land in a bounded
//! FIFO pending buffer that is drained, oldest first, after the next
//! successful delivery. The buffer is touched only by the loop task.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::Rng;
use tokio_util::sync::CancellationToken;

use sim_client::{FlightData, SnapshotSource};

use crate::agent::AcarsError;
use crate::backend::{AcarsApi, BackendError, PositionReport};
use crate::events::{EventBus, FlightState};

/// Reporting cadence per flight regime.
const INTERVAL_CRITICAL: Duration = Duration::from_millis(500);
const INTERVAL_CRUISE: Duration = Duration::from_secs(2);
const INTERVAL_STATIC: Duration = Duration::from_secs(60);
const INTERVAL_NORMAL: Duration = Duration::from_secs(1);

/// AGL below which an airborne aircraft is in the critical regime, feet.
const CRITICAL_AGL_FT: f64 = 50.0;
/// AGL at or above which the aircraft is in cruise, feet.
const CRUISE_AGL_FT: f64 = 10_000.0;
/// How long position and sim time must hold still to count as static.
const STATIC_AFTER: Duration = Duration::from_secs(5);

/// Retry and buffering knobs. Defaults match production behaviour.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Delivery attempts per report.
    pub retry_attempts: u32,
    /// Base of the jittered exponential retry backoff.
    pub retry_base: Duration,
    /// Pending buffer capacity; overflowing drops the oldest report.
    pub pending_cap: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 4,
            retry_base: Duration::from_millis(250),
            pending_cap: 500,
        }
    }
}

#[derive(Clone)]
struct ActiveFlight {
    callsign: String,
    departure: String,
    arrival: String,
    started_at: DateTime<Utc>,
}

#[derive(Default)]
struct ReporterState {
    flight: Option<ActiveFlight>,
    cancel: Option<CancellationToken>,
}

/// The flight reporter. Cheap to clone via internal `Arc`.
pub struct FlightReporter {
    inner: Arc<ReporterInner>,
}

struct ReporterInner {
    api: Arc<AcarsApi>,
    source: Arc<dyn SnapshotSource>,
    bus: Arc<EventBus>,
    config: ReporterConfig,
    state: Mutex<ReporterState>,
}

impl std::fmt::Debug for FlightReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightReporter").field("state", &self.state()).finish_non_exhaustive()
    }
}

impl Clone for FlightReporter {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl FlightReporter {
    #[must_use]
    pub fn new(
        api: Arc<AcarsApi>,
        source: Arc<dyn SnapshotSource>,
        bus: Arc<EventBus>,
        config: ReporterConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ReporterInner {
                api,
                source,
                bus,
                config,
                state: Mutex::new(ReporterState::default()),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> FlightState {
        if self.lock().flight.is_some() {
            FlightState::Active
        } else {
            FlightState::Idle
        }
    }

    /// Current booking identity as (callsign, departure, arrival).
    #[must_use]
    pub fn booking(&self) -> Option<(String, String, String)> {
        self.lock()
            .flight
            .as_ref()
            .map(|f| (f.callsign.clone(), f.departure.clone(), f.arrival.clone()))
    }

    /// Announce a flight start and spawn the position loop. The reporter
    /// stays idle when the backend rejects the start or is unreachable.
    pub async fn start_flight(
        &self,
        callsign: &str,
        departure: &str,
        arrival: &str,
    ) -> Result<(), AcarsError> {
        if self.lock().flight.is_some() {
            return Err(AcarsError::AlreadyActive);
        }

        self.inner.api.start_flight(callsign, departure, arrival).await?;

        let flight = ActiveFlight {
            callsign: callsign.to_string(),
            departure: departure.to_string(),
            arrival: arrival.to_string(),
            started_at: Utc::now(),
        };
        let cancel = CancellationToken::new();
        {
            let mut state = self.lock();
            if state.flight.is_some() {
                return Err(AcarsError::AlreadyActive);
            }
            state.flight = Some(flight.clone());
            state.cancel = Some(cancel.clone());
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { position_loop(&inner, flight, cancel).await });

        info!("flight started: {callsign} {departure} -> {arrival}");
        self.inner.bus.flight_state(FlightState::Active);
        Ok(())
    }

    /// Cancel the active flight. Backend failures are logged only; the
    /// reporter always returns to idle.
    pub async fn stop_flight(&self) -> Result<(), AcarsError> {
        let flight = self.lock().flight.clone().ok_or(AcarsError::NotActive)?;

        if let Err(err) = self.inner.api.stop_flight(&flight.callsign).await {
            warn!("stop notification failed: {err}");
        }
        self.teardown();
        info!("flight stopped: {}", flight.callsign);
        Ok(())
    }

    /// Complete the active flight. A server-side rejection is surfaced but
    /// still returns the reporter to idle; only a transport failure leaves
    /// the flight active.
    pub async fn finish_flight(&self) -> Result<(), AcarsError> {
        let flight = self.lock().flight.clone().ok_or(AcarsError::NotActive)?;

        match self
            .inner
            .api
            .finish_flight(&flight.callsign, &flight.departure, &flight.arrival)
            .await
        {
            Ok(()) => {
                self.teardown();
                info!("flight finished: {}", flight.callsign);
                Ok(())
            }
            Err(err @ BackendError::Rejected { .. }) => {
                self.teardown();
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn teardown(&self) {
        let cancel = {
            let mut state = self.lock();
            state.flight = None;
            state.cancel.take()
        };
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        self.inner.bus.flight_state(FlightState::Idle);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ReporterState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Pick the next reporting interval from the flight regime.
fn report_interval(snapshot: &FlightData, static_for: Duration) -> Duration {
    let agl = snapshot.position.altitude_agl;
    if !snapshot.sensors.on_ground && agl < CRITICAL_AGL_FT {
        INTERVAL_CRITICAL
    } else if agl >= CRUISE_AGL_FT {
        INTERVAL_CRUISE
    } else if static_for > STATIC_AFTER {
        INTERVAL_STATIC
    } else {
        INTERVAL_NORMAL
    }
}

/// Append a report that exhausted its retries, dropping the oldest entry
/// when the buffer is full.
fn enqueue_pending(pending: &mut VecDeque<PositionReport>, report: PositionReport, cap: usize) {
    if pending.len() >= cap {
        pending.pop_front();
        warn!("pending buffer full, dropping oldest report");
    }
    pending.push_back(report);
}

async fn position_loop(inner: &Arc<ReporterInner>, flight: ActiveFlight, cancel: CancellationToken) {
    let mut pending: VecDeque<PositionReport> = VecDeque::new();
    let mut interval = INTERVAL_NORMAL;
    // Previous (latitude, longitude, zulu seconds), compared bit-exact.
    let mut previous: Option<(f64, f64, f64)> = None;
    let mut changed_at = Instant::now();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("position loop stopped with {} pending reports", pending.len());
                return;
            }
            () = tokio::time::sleep(interval) => {}
        }

        // No snapshot this tick: skip without touching the buffer.
        let Some(snapshot) = inner.source.snapshot() else { continue };

        let key = (
            snapshot.position.latitude,
            snapshot.position.longitude,
            snapshot.sim_time.zulu_seconds,
        );
        if let Some(prev) = previous {
            let position_changed = (key.0 != prev.0) != (key.1 != prev.1);
            let time_changed = key.2 != prev.2;
            if position_changed || time_changed {
                changed_at = Instant::now();
            }
        }
        previous = Some(key);

        let simulator = inner.source.simulator().unwrap_or_default();
        let report = PositionReport::from_snapshot(
            &flight.callsign,
            &flight.departure,
            &flight.arrival,
            flight.started_at,
            simulator,
            &snapshot,
        );

        if deliver_with_retry(inner, &report).await {
            drain_pending(inner, &mut pending).await;
        } else {
            enqueue_pending(&mut pending, report, inner.config.pending_cap);
        }

        let next = report_interval(&snapshot, changed_at.elapsed());
        if next != interval {
            debug!("report cadence {:?} -> {:?}", interval, next);
            interval = next;
        }
    }
}

/// Deliver one report, retrying with jittered exponential backoff. Returns
/// false once every attempt has failed.
async fn deliver_with_retry(inner: &Arc<ReporterInner>, report: &PositionReport) -> bool {
    for attempt in 0..inner.config.retry_attempts {
        match inner.api.post_position(report).await {
            Ok(()) => return true,
            Err(err) => {
                debug!("position report attempt {} failed: {err}", attempt + 1);
                if attempt + 1 < inner.config.retry_attempts {
                    let backoff = inner.config.retry_base * 2u32.pow(attempt);
                    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..50));
                    tokio::time::sleep(backoff + jitter).await;
                }
            }
        }
    }
    false
}

/// Deliver queued reports in insertion order; stop at the first failure and
/// leave the remainder queued.
async fn drain_pending(inner: &Arc<ReporterInner>, pending: &mut VecDeque<PositionReport>) {
    while let Some(report) = pending.front() {
        match inner.api.post_position(report).await {
            Ok(()) => {
                pending.pop_front();
            }
            Err(err) => {
                debug!("queue drain halted: {err}");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedSource {
        snapshot: Mutex<Option<FlightData>>,
    }

    impl FixedSource {
        fn with(snapshot: FlightData) -> Arc<Self> {
            Arc::new(Self { snapshot: Mutex::new(Some(snapshot)) })
        }
    }

    impl SnapshotSource for FixedSource {
        fn snapshot(&self) -> Option<FlightData> {
            self.snapshot.lock().unwrap().clone()
        }

        fn simulator(&self) -> Option<&'static str> {
            Some("X-Plane")
        }
    }

    fn heathrow_snapshot() -> FlightData {
        let mut snap = FlightData::default();
        snap.position.latitude = 51.4775;
        snap.position.longitude = -0.4614;
        snap.sensors.on_ground = true;
        snap
    }

    fn fast_config() -> ReporterConfig {
        ReporterConfig {
            retry_attempts: 4,
            retry_base: Duration::from_millis(10),
            pending_cap: 500,
        }
    }

    fn reporter_against(server_uri: &str, source: Arc<FixedSource>) -> FlightReporter {
        let api = Arc::new(AcarsApi::new(server_uri, "test-token").unwrap());
        FlightReporter::new(api, source, Arc::new(EventBus::new()), fast_config())
    }

    async fn mount_ok(server: &MockServer, endpoint: &str) {
        Mock::given(method("POST"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
    }

    #[test]
    fn test_interval_table() {
        let mut airborne_low = FlightData::default();
        airborne_low.sensors.on_ground = false;
        airborne_low.position.altitude_agl = 20.0;
        assert_eq!(report_interval(&airborne_low, Duration::ZERO), INTERVAL_CRITICAL);

        let mut cruise = FlightData::default();
        cruise.sensors.on_ground = false;
        cruise.position.altitude_agl = 35_000.0;
        assert_eq!(report_interval(&cruise, Duration::ZERO), INTERVAL_CRUISE);
        // Cruise wins even when the snapshot has been static for a while.
        assert_eq!(report_interval(&cruise, Duration::from_secs(10)), INTERVAL_CRUISE);

        let mut parked = FlightData::default();
        parked.sensors.on_ground = true;
        assert_eq!(report_interval(&parked, Duration::from_secs(6)), INTERVAL_STATIC);
        assert_eq!(report_interval(&parked, Duration::from_secs(4)), INTERVAL_NORMAL);

        let mut climb = FlightData::default();
        climb.sensors.on_ground = false;
        climb.position.altitude_agl = 4_000.0;
        assert_eq!(report_interval(&climb, Duration::ZERO), INTERVAL_NORMAL);
    }

    #[test]
    fn test_pending_buffer_drops_oldest_at_cap() {
        let mut pending = VecDeque::new();
        let snap = heathrow_snapshot();
        for i in 0..501 {
            let mut report = PositionReport::from_snapshot(
                "BAW123",
                "EGLL",
                "KJFK",
                Utc::now(),
                "X-Plane",
                &snap,
            );
            report.elapsed_time.value = f64::from(i);
            enqueue_pending(&mut pending, report, 500);
        }
        assert_eq!(pending.len(), 500);
        // Report 0 was dropped; order is preserved for the rest.
        assert!((pending.front().unwrap().elapsed_time.value - 1.0).abs() < f64::EPSILON);
        assert!((pending.back().unwrap().elapsed_time.value - 500.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_flight_lifecycle_files_position_reports() {
        let server = MockServer::start().await;
        mount_ok(&server, "/api/acars/start").await;
        mount_ok(&server, "/api/acars/position").await;
        mount_ok(&server, "/api/acars/finish").await;

        let reporter =
            reporter_against(&server.uri(), FixedSource::with(heathrow_snapshot()));

        assert_eq!(reporter.state(), FlightState::Idle);
        reporter.start_flight("BAW123", "EGLL", "KJFK").await.unwrap();
        assert_eq!(reporter.state(), FlightState::Active);
        assert!(matches!(reporter.start_flight("BAW124", "EGLL", "KJFK").await,
            Err(AcarsError::AlreadyActive)));

        tokio::time::sleep(Duration::from_millis(3_200)).await;
        reporter.finish_flight().await.unwrap();
        assert_eq!(reporter.state(), FlightState::Idle);

        let requests = server.received_requests().await.unwrap();
        let positions: Vec<serde_json::Value> = requests
            .iter()
            .filter(|r| r.url.path() == "/api/acars/position")
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect();
        assert!(!positions.is_empty(), "no position reports filed");
        let first = &positions[0];
        assert_eq!(first["callsign"], "BAW123");
        assert!((first["position"]["latitude"]["value"].as_f64().unwrap() - 51.4775).abs() < 1e-6);
        assert_eq!(first["simulator"], "X-Plane");
    }

    #[tokio::test]
    async fn test_start_rejection_stays_idle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/acars/start"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let reporter =
            reporter_against(&server.uri(), FixedSource::with(heathrow_snapshot()));
        let result = reporter.start_flight("BAW123", "EGLL", "KJFK").await;
        assert!(matches!(
            result,
            Err(AcarsError::Backend(BackendError::Rejected { status: 403, .. }))
        ));
        assert_eq!(reporter.state(), FlightState::Idle);
        assert!(matches!(reporter.finish_flight().await, Err(AcarsError::NotActive)));
    }

    #[tokio::test]
    async fn test_failed_report_retries_exactly_four_times() {
        let server = MockServer::start().await;
        mount_ok(&server, "/api/acars/start").await;
        mount_ok(&server, "/api/acars/stop").await;
        Mock::given(method("POST"))
            .and(path("/api/acars/position"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let reporter =
            reporter_against(&server.uri(), FixedSource::with(heathrow_snapshot()));
        reporter.start_flight("BAW123", "EGLL", "KJFK").await.unwrap();

        // One tick fires at ~1 s; its four fast retries finish well before
        // the next tick at ~2 s.
        tokio::time::sleep(Duration::from_millis(1_700)).await;
        reporter.stop_flight().await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let attempts = requests
            .iter()
            .filter(|r| r.url.path() == "/api/acars/position")
            .count();
        assert_eq!(attempts, 4);
    }

    #[tokio::test]
    async fn test_outage_queues_then_drains_in_order() {
        let server = MockServer::start().await;
        mount_ok(&server, "/api/acars/start").await;
        mount_ok(&server, "/api/acars/stop").await;
        // The first four attempts (one tick's retries) fail, everything
        // after succeeds.
        Mock::given(method("POST"))
            .and(path("/api/acars/position"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(4)
            .mount(&server)
            .await;
        mount_ok(&server, "/api/acars/position").await;

        let reporter =
            reporter_against(&server.uri(), FixedSource::with(heathrow_snapshot()));
        reporter.start_flight("BAW123", "EGLL", "KJFK").await.unwrap();

        tokio::time::sleep(Duration::from_millis(3_200)).await;
        reporter.stop_flight().await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let elapsed: Vec<f64> = requests
            .iter()
            .filter(|r| r.url.path() == "/api/acars/position")
            .map(|r| {
                let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
                body["elapsedTime"]["value"].as_f64().unwrap()
            })
            .collect();
        assert!(elapsed.len() >= 6, "expected retries plus recovery, got {elapsed:?}");

        // The first tick's report was queued during the outage and must be
        // retransmitted after the recovery tick delivers.
        let queued = elapsed[0];
        let recovery_pos = elapsed.iter().rposition(|&v| (v - queued).abs() < f64::EPSILON);
        assert!(recovery_pos.is_some_and(|pos| pos >= 4), "queued report never drained");
    }
}
