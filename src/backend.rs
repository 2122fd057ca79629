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

//! HTTP client for the virtual-airline ACARS backend.
//!
//! All requests are JSON over a bearer-token session with a 30 s transport
//! deadline. Position reports wrap every numeric value as a
//! `{value, unit}` measurement so the wire format stays self-describing.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sim_client::FlightData;

/// Agent version stamped into every position report.
pub const ACARS_VERSION: &str = env!("CARGO_PKG_VERSION");

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Errors from backend requests.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never completed (DNS, refused, timeout).
    #[error("backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a 4xx/5xx status.
    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl BackendError {
    /// True when the request never reached the backend at all.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct StartBody<'a> {
    callsign: &'a str,
    departure: &'a str,
    arrival: &'a str,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct StopBody<'a> {
    callsign: &'a str,
    timestamp: String,
}

/// A self-describing numeric value.
#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    pub value: f64,
    pub unit: &'static str,
}

impl Measurement {
    #[must_use]
    pub fn new(value: f64, unit: &'static str) -> Self {
        Self { value, unit }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionBody {
    pub latitude: Measurement,
    pub longitude: Measurement,
    pub altitude: Measurement,
    pub altitude_agl: Measurement,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttitudeBody {
    pub pitch: Measurement,
    pub roll: Measurement,
    pub heading_true: Measurement,
    pub heading_mag: Measurement,
    pub vs: Measurement,
    pub ias: Measurement,
    pub tas: Measurement,
    pub gs: Measurement,
    pub g_force: Measurement,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineBody {
    pub exists: bool,
    pub running: bool,
    pub n1: Measurement,
    pub n2: Measurement,
    pub throttle: Measurement,
    pub mixture: Measurement,
    pub propeller: Measurement,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorsBody {
    pub on_ground: bool,
    pub stall_warning: bool,
    pub overspeed_warning: bool,
    pub simulation_rate: Measurement,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadiosBody {
    pub com1: Measurement,
    pub com2: Measurement,
    pub nav1: Measurement,
    pub nav2: Measurement,
    pub nav1_obs: Measurement,
    pub nav2_obs: Measurement,
    pub transponder_code: Measurement,
    pub transponder_state: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopilotBody {
    pub master: bool,
    pub heading: Measurement,
    pub altitude: Measurement,
    pub vs: Measurement,
    pub speed: Measurement,
    pub approach_hold: bool,
    pub nav_lock: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LightsBody {
    pub beacon: bool,
    pub strobe: bool,
    pub landing: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlsBody {
    pub elevator: Measurement,
    pub aileron: Measurement,
    pub rudder: Measurement,
    pub flaps: Measurement,
    pub spoilers: Measurement,
    pub gear_down: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApuBody {
    pub switch_on: bool,
    pub rpm: Measurement,
    pub gen_switch: bool,
    pub gen_active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorBody {
    pub open: Measurement,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimTimeBody {
    pub zulu_hour: Measurement,
    pub zulu_min: Measurement,
    pub zulu_sec: Measurement,
    pub zulu_day: Measurement,
    pub zulu_month: Measurement,
    pub zulu_year: Measurement,
    pub local_time: Measurement,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightBody {
    pub total: Measurement,
    pub fuel: Measurement,
}

/// One adaptive position report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionReport {
    pub callsign: String,
    pub departure: String,
    pub arrival: String,
    pub timestamp: String,
    pub simulator: String,
    pub acars_version: String,
    pub elapsed_time: Measurement,
    pub position: PositionBody,
    pub attitude: AttitudeBody,
    pub engines: Vec<EngineBody>,
    pub sensors: SensorsBody,
    pub radios: RadiosBody,
    pub autopilot: AutopilotBody,
    pub altimeter: Measurement,
    pub lights: LightsBody,
    pub controls: ControlsBody,
    pub apu: ApuBody,
    pub doors: Vec<DoorBody>,
    pub sim_time: SimTimeBody,
    pub aircraft_name: String,
    pub weight: WeightBody,
}

impl PositionReport {
    /// Assemble a report from the current snapshot. Elapsed time is derived
    /// from the flight start at report time; `simulator` carries the
    /// current adapter name.
    #[must_use]
    pub fn from_snapshot(
        callsign: &str,
        departure: &str,
        arrival: &str,
        started_at: DateTime<Utc>,
        simulator: &str,
        snap: &FlightData,
    ) -> Self {
        let now = Utc::now();
        let elapsed = (now - started_at).num_seconds().max(0) as f64;
        let zulu = snap.sim_time.zulu_seconds.max(0.0) as u64;

        Self {
            callsign: callsign.to_string(),
            departure: departure.to_string(),
            arrival: arrival.to_string(),
            timestamp: now.to_rfc3339(),
            simulator: simulator.to_string(),
            acars_version: ACARS_VERSION.to_string(),
            elapsed_time: Measurement::new(elapsed, "s"),
            position: PositionBody {
                latitude: Measurement::new(snap.position.latitude, "deg"),
                longitude: Measurement::new(snap.position.longitude, "deg"),
                altitude: Measurement::new(snap.position.altitude, "ft"),
                altitude_agl: Measurement::new(snap.position.altitude_agl, "ft"),
            },
            attitude: AttitudeBody {
                pitch: Measurement::new(snap.attitude.pitch, "deg"),
                roll: Measurement::new(snap.attitude.roll, "deg"),
                heading_true: Measurement::new(snap.attitude.heading_true, "deg"),
                heading_mag: Measurement::new(snap.attitude.heading_mag, "deg"),
                vs: Measurement::new(snap.attitude.vertical_speed, "fpm"),
                ias: Measurement::new(snap.attitude.ias, "kt"),
                tas: Measurement::new(snap.attitude.tas, "kt"),
                gs: Measurement::new(snap.attitude.ground_speed, "kt"),
                g_force: Measurement::new(snap.attitude.g_force, "g"),
            },
            engines: snap
                .engines
                .iter()
                .map(|engine| EngineBody {
                    exists: engine.exists,
                    running: engine.running,
                    n1: Measurement::new(engine.n1, "%"),
                    n2: Measurement::new(engine.n2, "%"),
                    throttle: Measurement::new(engine.throttle, "%"),
                    mixture: Measurement::new(engine.mixture, "%"),
                    propeller: Measurement::new(engine.propeller, "%"),
                })
                .collect(),
            sensors: SensorsBody {
                on_ground: snap.sensors.on_ground,
                stall_warning: snap.sensors.stall_warning,
                overspeed_warning: snap.sensors.overspeed_warning,
                simulation_rate: Measurement::new(snap.sensors.simulation_rate, "x"),
            },
            radios: RadiosBody {
                com1: Measurement::new(snap.radios.com1, "MHz"),
                com2: Measurement::new(snap.radios.com2, "MHz"),
                nav1: Measurement::new(snap.radios.nav1, "MHz"),
                nav2: Measurement::new(snap.radios.nav2, "MHz"),
                nav1_obs: Measurement::new(snap.radios.nav1_obs, "deg"),
                nav2_obs: Measurement::new(snap.radios.nav2_obs, "deg"),
                transponder_code: Measurement::new(f64::from(snap.radios.transponder_code), ""),
                transponder_state: snap.radios.transponder_state.as_str(),
            },
            autopilot: AutopilotBody {
                master: snap.autopilot.master,
                heading: Measurement::new(snap.autopilot.heading, "deg"),
                altitude: Measurement::new(snap.autopilot.altitude, "ft"),
                vs: Measurement::new(snap.autopilot.vertical_speed, "fpm"),
                speed: Measurement::new(snap.autopilot.speed, "kt"),
                approach_hold: snap.autopilot.approach_hold,
                nav_lock: snap.autopilot.nav_lock,
            },
            altimeter: Measurement::new(snap.altimeter, "inHg"),
            lights: LightsBody {
                beacon: snap.lights.beacon,
                strobe: snap.lights.strobe,
                landing: snap.lights.landing,
            },
            controls: ControlsBody {
                elevator: Measurement::new(snap.controls.elevator, ""),
                aileron: Measurement::new(snap.controls.aileron, ""),
                rudder: Measurement::new(snap.controls.rudder, ""),
                flaps: Measurement::new(snap.controls.flaps, "%"),
                spoilers: Measurement::new(snap.controls.spoilers, "%"),
                gear_down: snap.controls.gear_down,
            },
            apu: ApuBody {
                switch_on: snap.apu.switch_on,
                rpm: Measurement::new(snap.apu.rpm, "%"),
                gen_switch: snap.apu.generator_switch,
                gen_active: snap.apu.generator_active,
            },
            doors: snap
                .doors
                .iter()
                .map(|door| DoorBody { open: Measurement::new(door.open, "") })
                .collect(),
            sim_time: SimTimeBody {
                zulu_hour: Measurement::new((zulu / 3600 % 24) as f64, "h"),
                zulu_min: Measurement::new((zulu / 60 % 60) as f64, "min"),
                zulu_sec: Measurement::new((zulu % 60) as f64, "s"),
                zulu_day: Measurement::new(f64::from(snap.sim_time.zulu_day), "d"),
                zulu_month: Measurement::new(f64::from(snap.sim_time.zulu_month), "mo"),
                zulu_year: Measurement::new(f64::from(snap.sim_time.zulu_year), "yr"),
                local_time: Measurement::new(snap.sim_time.local_seconds, "s"),
            },
            aircraft_name: snap.aircraft_name.clone(),
            weight: WeightBody {
                total: Measurement::new(snap.weight.total, "lbs"),
                fuel: Measurement::new(snap.weight.fuel, "lbs"),
            },
        }
    }
}

/// Bearer-token JSON client for the ACARS endpoints.
pub struct AcarsApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for AcarsApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcarsApi").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

impl AcarsApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { client, base_url, token: token.into() })
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), BackendError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            debug!("POST {path} rejected: {status} {message}");
            return Err(BackendError::Rejected { status: status.as_u16(), message });
        }
        Ok(())
    }

    /// Announce a flight start.
    pub async fn start_flight(
        &self,
        callsign: &str,
        departure: &str,
        arrival: &str,
    ) -> Result<(), BackendError> {
        self.post(
            "/api/acars/start",
            &StartBody { callsign, departure, arrival, timestamp: Utc::now().to_rfc3339() },
        )
        .await
    }

    /// Announce a flight cancellation.
    pub async fn stop_flight(&self, callsign: &str) -> Result<(), BackendError> {
        self.post("/api/acars/stop", &StopBody { callsign, timestamp: Utc::now().to_rfc3339() })
            .await
    }

    /// Announce a completed flight.
    pub async fn finish_flight(
        &self,
        callsign: &str,
        departure: &str,
        arrival: &str,
    ) -> Result<(), BackendError> {
        self.post(
            "/api/acars/finish",
            &StartBody { callsign, departure, arrival, timestamp: Utc::now().to_rfc3339() },
        )
        .await
    }

    /// File one position report.
    pub async fn post_position(&self, report: &PositionReport) -> Result<(), BackendError> {
        self.post("/api/acars/position", report).await
    }

    /// Fetch the current booking as opaque JSON.
    pub async fn booking(&self) -> Result<serde_json::Value, BackendError> {
        let response = self
            .client
            .get(format!("{}/api/acars/booking", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> FlightData {
        let mut snap = FlightData::default();
        snap.position.latitude = 51.4775;
        snap.position.longitude = -0.4614;
        snap.position.altitude = 83.0;
        snap.sensors.on_ground = true;
        snap.sim_time.zulu_seconds = 3_725.0; // 01:02:05
        snap.aircraft_name = "Boeing 737".to_string();
        snap
    }

    #[test]
    fn test_report_wire_shape() {
        let report = PositionReport::from_snapshot(
            "BAW123",
            "EGLL",
            "KJFK",
            Utc::now(),
            "X-Plane",
            &sample_snapshot(),
        );
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["callsign"], "BAW123");
        assert_eq!(json["simulator"], "X-Plane");
        assert_eq!(json["acarsVersion"], ACARS_VERSION);
        assert_eq!(json["elapsedTime"]["unit"], "s");
        assert!((json["position"]["latitude"]["value"].as_f64().unwrap() - 51.4775).abs() < 1e-9);
        assert_eq!(json["position"]["altitudeAgl"]["unit"], "ft");
        assert_eq!(json["engines"].as_array().unwrap().len(), 4);
        assert_eq!(json["doors"].as_array().unwrap().len(), 5);
        assert_eq!(json["sensors"]["onGround"], true);
        assert_eq!(json["radios"]["transponderState"], "off");
        assert_eq!(json["simTime"]["zuluHour"]["value"], 1.0);
        assert_eq!(json["simTime"]["zuluMin"]["value"], 2.0);
        assert_eq!(json["simTime"]["zuluSec"]["value"], 5.0);
        assert_eq!(json["aircraftName"], "Boeing 737");
        assert_eq!(json["attitude"]["gForce"]["unit"], "g");
        assert_eq!(json["controls"]["gearDown"], false);
        assert_eq!(json["apu"]["genSwitch"], false);
    }

    #[test]
    fn test_base_url_trailing_slash_is_normalised() {
        let api = AcarsApi::new("https://api.example.test/", "token").unwrap();
        assert_eq!(api.base_url, "https://api.example.test");
    }

    #[tokio::test]
    async fn test_rejected_response_surfaces_error_field() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/acars/start"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(serde_json::json!({
                    "error": "no booking for callsign"
                })),
            )
            .mount(&server)
            .await;

        let api = AcarsApi::new(server.uri(), "token").unwrap();
        let err = api.start_flight("BAW123", "EGLL", "KJFK").await.unwrap_err();
        match err {
            BackendError::Rejected { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "no booking for callsign");
            }
            BackendError::Transport(_) => panic!("expected rejection"),
        }
    }
}
