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

//! Unified telemetry snapshot shared by every simulator adapter.
//!
//! Adapters normalise raw simulator output into [`FlightData`] at their own
//! boundary: degrees, feet, knots, feet per minute, MHz, pounds. Every field
//! has a defined value; a snapshot never carries uninitialised data. The
//! `engines` and `doors` arrays are fixed-size regardless of the aircraft.

use serde::{Deserialize, Serialize};

/// Number of engine slots in a snapshot. Aircraft with fewer engines leave
/// the remaining slots zeroed with `exists = false`.
pub const ENGINE_SLOTS: usize = 4;

/// Number of door slots in a snapshot.
pub const DOOR_SLOTS: usize = 5;

/// Geographic position of the aircraft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude above mean sea level, feet.
    pub altitude: f64,
    /// Altitude above ground level, feet.
    pub altitude_agl: f64,
}

/// Attitude and velocities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    /// Pitch in degrees, positive nose-up.
    pub pitch: f64,
    /// Roll in degrees, positive right wing down.
    pub roll: f64,
    /// True heading, degrees.
    pub heading_true: f64,
    /// Magnetic heading, degrees.
    pub heading_mag: f64,
    /// Vertical speed, feet per minute.
    pub vertical_speed: f64,
    /// Indicated airspeed, knots.
    pub ias: f64,
    /// True airspeed, knots.
    pub tas: f64,
    /// Ground speed, knots.
    pub ground_speed: f64,
    /// Load factor, g.
    pub g_force: f64,
}

/// State of a single engine slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineData {
    /// Whether this slot corresponds to an installed engine.
    pub exists: bool,
    /// Combustion / running flag.
    pub running: bool,
    /// Low-pressure spool speed, percent.
    pub n1: f64,
    /// High-pressure spool speed, percent.
    pub n2: f64,
    /// Throttle lever position, percent.
    pub throttle: f64,
    /// Mixture lever position, percent.
    pub mixture: f64,
    /// Propeller lever position, percent.
    pub propeller: f64,
}

/// Miscellaneous airframe sensors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sensors {
    pub on_ground: bool,
    pub stall_warning: bool,
    pub overspeed_warning: bool,
    /// Simulation rate multiplier (1.0 = real time).
    pub simulation_rate: f64,
}

/// Transponder operating state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransponderState {
    #[default]
    #[serde(rename = "off")]
    Off,
    #[serde(rename = "stand-by")]
    Standby,
    #[serde(rename = "active")]
    Active,
}

impl TransponderState {
    /// Map a raw simulator mode value onto the three supported states.
    /// 0 is off, 1 is stand-by, anything higher is treated as active.
    #[must_use]
    pub fn from_mode(mode: u32) -> Self {
        match mode {
            0 => Self::Off,
            1 => Self::Standby,
            _ => Self::Active,
        }
    }

    /// Wire label used in reports and events.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Standby => "stand-by",
            Self::Active => "active",
        }
    }
}

/// Radio stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Radios {
    /// COM1 active frequency, MHz.
    pub com1: f64,
    /// COM2 active frequency, MHz.
    pub com2: f64,
    /// NAV1 active frequency, MHz.
    pub nav1: f64,
    /// NAV2 active frequency, MHz.
    pub nav2: f64,
    /// NAV1 OBS setting, degrees.
    pub nav1_obs: f64,
    /// NAV2 OBS setting, degrees.
    pub nav2_obs: f64,
    /// Transponder code (e.g. 2200).
    pub transponder_code: u32,
    pub transponder_state: TransponderState,
}

/// Autopilot panel state and targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Autopilot {
    pub master: bool,
    /// Heading bug, degrees.
    pub heading: f64,
    /// Altitude target, feet.
    pub altitude: f64,
    /// Vertical speed target, feet per minute.
    pub vertical_speed: f64,
    /// Speed target, knots.
    pub speed: f64,
    pub approach_hold: bool,
    pub nav_lock: bool,
}

/// Exterior light switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Lights {
    pub beacon: bool,
    pub strobe: bool,
    pub landing: bool,
}

/// Primary flight control positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Controls {
    /// Elevator deflection, -1.0 to +1.0.
    pub elevator: f64,
    /// Aileron deflection, -1.0 to +1.0.
    pub aileron: f64,
    /// Rudder deflection, -1.0 to +1.0.
    pub rudder: f64,
    /// Flap handle position, percent.
    pub flaps: f64,
    /// Spoiler handle position, percent.
    pub spoilers: f64,
    pub gear_down: bool,
}

/// Simulator clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimTime {
    /// Zulu seconds since midnight.
    pub zulu_seconds: f64,
    pub zulu_day: u32,
    pub zulu_month: u32,
    pub zulu_year: u32,
    /// Local seconds since midnight.
    pub local_seconds: f64,
}

/// Auxiliary power unit state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Apu {
    pub switch_on: bool,
    /// Spool speed, percent.
    pub rpm: f64,
    pub generator_switch: bool,
    pub generator_active: bool,
}

/// A single door slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Door {
    /// Open ratio, 0.0 (closed) to 1.0 (fully open).
    pub open: f64,
}

/// Aircraft weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Weight {
    /// Total weight, pounds.
    pub total: f64,
    /// Fuel weight, pounds.
    pub fuel: f64,
}

/// A timestamp-free snapshot of the aircraft at an instant.
///
/// Produced by adapters and re-emitted by the stream engine. The most recent
/// value replaces the previous one without history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightData {
    pub position: Position,
    pub attitude: Attitude,
    pub engines: [EngineData; ENGINE_SLOTS],
    pub sensors: Sensors,
    pub radios: Radios,
    pub autopilot: Autopilot,
    /// Altimeter setting, inches of mercury.
    pub altimeter: f64,
    pub lights: Lights,
    pub controls: Controls,
    pub sim_time: SimTime,
    pub apu: Apu,
    pub doors: [Door; DOOR_SLOTS],
    pub weight: Weight,
    /// Printable aircraft label. Never contains a NUL byte.
    pub aircraft_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_fully_defined() {
        let snap = FlightData::default();
        assert_eq!(snap.engines.len(), ENGINE_SLOTS);
        assert_eq!(snap.doors.len(), DOOR_SLOTS);
        assert_eq!(snap.radios.transponder_state, TransponderState::Off);
        assert!(snap.aircraft_name.is_empty());
        assert!(!snap.engines[0].exists);
    }

    #[test]
    fn test_transponder_mode_mapping() {
        assert_eq!(TransponderState::from_mode(0), TransponderState::Off);
        assert_eq!(TransponderState::from_mode(1), TransponderState::Standby);
        assert_eq!(TransponderState::from_mode(2), TransponderState::Active);
        assert_eq!(TransponderState::from_mode(4), TransponderState::Active);
    }

    #[test]
    fn test_transponder_state_serialises_as_label() {
        let json = serde_json::to_string(&TransponderState::Standby).unwrap();
        assert_eq!(json, "\"stand-by\"");
    }
}
