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

mod agent;
mod backend;
mod config;
mod events;
mod recording;
mod reporter;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{debug, error, info, warn};
use tokio::sync::broadcast;

use sim_client::{EngineConfig, EventSink, RecordingSink, SimKind, SnapshotSource, StreamEngine};

use agent::Agent;
use backend::AcarsApi;
use config::AppConfig;
use events::{AgentEvent, EventBus, FlightState};
use recording::RecordingStore;
use reporter::{FlightReporter, ReporterConfig};

const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Validate address format (host:port)
fn validate_host_port(s: &str) -> Result<String, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err("Address must be in format host:port".to_string());
    }

    // Validate port number
    parts[1]
        .parse::<u16>()
        .map_err(|_| "Invalid port number (must be 0-65535)".to_string())?;

    Ok(s.to_string())
}

/// Validate a simulator kind name.
fn validate_sim_kind(s: &str) -> Result<String, String> {
    s.parse::<SimKind>().map(|_| s.to_string())
}

/// SkyLink ACARS - flight-simulator telemetry agent for virtual airlines
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Backend base URL
    #[arg(long)]
    backend: Option<String>,

    /// Backend bearer token
    #[arg(long)]
    token: Option<String>,

    /// Simulator to connect: simconnect, xplane or auto
    #[arg(long, value_parser = validate_sim_kind)]
    sim: Option<String>,

    /// X-Plane UDP address
    #[arg(long, value_parser = validate_host_port)]
    xplane_addr: Option<String>,

    /// Arm recording as soon as the simulator connects
    #[arg(long)]
    record: bool,

    /// Start a flight immediately (requires --departure and --arrival)
    #[arg(long)]
    callsign: Option<String>,

    /// Departure ICAO for --callsign
    #[arg(long)]
    departure: Option<String>,

    /// Arrival ICAO for --callsign
    #[arg(long)]
    arrival: Option<String>,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = CliArgs::parse();

    if args.callsign.is_some() && (args.departure.is_none() || args.arrival.is_none()) {
        error!("--callsign requires --departure and --arrival");
        std::process::exit(2);
    }

    let mut config = AppConfig::load().unwrap_or_else(|err| {
        warn!("could not load config ({err}), using defaults");
        AppConfig::default()
    });

    let mut dirty = false;
    if let Some(backend) = args.backend {
        config.backend_url = backend;
        dirty = true;
    }
    if let Some(token) = args.token {
        config.api_token = token;
        dirty = true;
    }
    if let Some(sim) = args.sim {
        config.simulator = sim;
        dirty = true;
    }
    if let Some(addr) = args.xplane_addr {
        config.xplane_addr = addr;
        dirty = true;
    }
    if dirty {
        if let Err(err) = config.save() {
            warn!("could not save config: {err}");
        }
    }

    let bus = Arc::new(EventBus::new());
    let store = match RecordingStore::open(&config.recording_db_path()) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            error!("could not open recording store: {err}");
            std::process::exit(1);
        }
    };
    let api = match AcarsApi::new(&config.backend_url, &config.api_token) {
        Ok(api) => Arc::new(api),
        Err(err) => {
            error!("could not build backend client: {err}");
            std::process::exit(1);
        }
    };

    let engine = StreamEngine::new(
        EngineConfig { xplane_addr: config.xplane_addr.clone(), ..Default::default() },
        Arc::clone(&bus) as Arc<dyn EventSink>,
        Arc::clone(&store) as Arc<dyn RecordingSink>,
    );
    let reporter = FlightReporter::new(
        Arc::clone(&api),
        Arc::new(engine.clone()) as Arc<dyn SnapshotSource>,
        Arc::clone(&bus),
        ReporterConfig::default(),
    );
    let agent = Agent::new(engine, store, reporter, api, Arc::clone(&bus));

    spawn_event_logger(bus.subscribe());

    let kind: SimKind = config.simulator.parse().unwrap_or_else(|err: String| {
        warn!("{err}; falling back to auto");
        SimKind::Auto
    });

    let simulator = tokio::select! {
        name = connect_with_retry(&agent, kind) => name,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted before a simulator was found");
            return;
        }
    };
    info!("telemetry flowing from {simulator}");

    if args.record {
        agent.start_recording();
    }
    if let (Some(callsign), Some(departure), Some(arrival)) =
        (&args.callsign, &args.departure, &args.arrival)
    {
        if let Err(err) = agent.start_flight(callsign, departure, arrival).await {
            error!("could not start flight: {err}");
        }
    }

    info!("agent running, press ctrl-c to exit");
    let _ = tokio::signal::ctrl_c().await;

    if agent.flight_state() == FlightState::Active {
        if let Err(err) = agent.stop_flight().await {
            warn!("could not stop active flight: {err}");
        }
    }
    agent.stop_recording();
    agent.disconnect_sim();
    info!("shut down cleanly");
}

/// Keep trying the configured simulator on a fixed cadence until one
/// produces data.
async fn connect_with_retry(agent: &Agent, kind: SimKind) -> &'static str {
    loop {
        match agent.connect_sim(kind).await {
            Ok(name) => return name,
            Err(err) => {
                warn!(
                    "simulator connection failed: {err}; retrying in {}s",
                    CONNECT_RETRY_DELAY.as_secs()
                );
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            }
        }
    }
}

fn spawn_event_logger(mut rx: broadcast::Receiver<AgentEvent>) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(AgentEvent::ConnectionState(simulator)) => {
                    if simulator.is_empty() {
                        warn!("simulator stream lost");
                    } else {
                        info!("simulator stream active: {simulator}");
                    }
                }
                Ok(AgentEvent::RecordingState(recording)) => {
                    info!("recording {}", if recording { "armed" } else { "disarmed" });
                }
                Ok(AgentEvent::FlightState(state)) => {
                    info!("flight state: {}", state.as_str());
                }
                Ok(AgentEvent::FlightData(snapshot)) => {
                    debug!(
                        "snapshot {:.4} {:.4} {:.0} ft",
                        snapshot.position.latitude,
                        snapshot.position.longitude,
                        snapshot.position.altitude
                    );
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("event logger lagged by {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    });
}
