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

//! X-Plane adapter speaking the RREF UDP protocol.
//!
//! On open the adapter sends one 413-byte subscribe datagram per entry of
//! [`DATAREFS`] at 1 Hz and spawns a listener thread that folds response
//! entries back into the cached snapshot. The dictionary order is part of
//! the protocol contract: the subscription index chosen at send time is the
//! key each response entry carries.
//!
//! Subscribe datagram: `"RREF"` `0x00`, little-endian u32 frequency in Hz
//! (0 unsubscribes), little-endian u32 index, then the dataref path
//! NUL-padded to 400 bytes. Responses are a 5-byte `"RREF"` header followed
//! by 8-byte entries of little-endian u32 index and f32 value.

use std::net::{ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::Datelike;
use log::{debug, info};

use super::{AdapterError, SimAdapter, SnapshotCell};
use crate::model::{FlightData, TransponderState};

/// Subscription frequency requested from the simulator, Hz.
const SUBSCRIBE_FREQUENCY_HZ: u32 = 1;
/// Fixed size of a subscribe/unsubscribe datagram.
const SUBSCRIBE_DATAGRAM_LEN: usize = 413;
/// Offset of the dataref path inside a subscribe datagram.
const PATH_OFFSET: usize = 13;
/// Response header: `"RREF"` plus one separator byte.
const RESPONSE_HEADER_LEN: usize = 5;
/// Listener read deadline; bounds close latency to one interval.
const READ_DEADLINE: Duration = Duration::from_secs(1);

const METERS_TO_FEET: f64 = 3.28084;
const MPS_TO_KNOTS: f64 = 1.94384;
const KG_TO_POUNDS: f64 = 2.20462;

/// One subscription: the dataref path and the snapshot field it lands in,
/// including the unit conversion applied on arrival.
struct DatarefEntry {
    path: &'static str,
    apply: fn(&mut FlightData, f32),
}

impl std::fmt::Debug for DatarefEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatarefEntry").field("path", &self.path).finish()
    }
}

/// Cumulative day-of-year at the start of each month, 365-day year.
const MONTH_STARTS: [u32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

/// Split a 0-based day-of-year into 1-based (month, day-of-month).
fn month_and_day(day_of_year: u32) -> (u32, u32) {
    let doy = day_of_year.min(364);
    let month = MONTH_STARTS.iter().rposition(|&start| doy >= start).unwrap_or(0);
    (month as u32 + 1, doy - MONTH_STARTS[month] + 1)
}

/// The authoritative subscription dictionary. Array position is the
/// subscription index sent on the wire and the key expected in responses.
///
/// The three zulu date entries all derive from `sim/time/local_date_days`;
/// the protocol has no independent day/month/year datarefs, so consumers
/// must not treat those fields as independent.
static DATAREFS: &[DatarefEntry] = &[
    // 0..=3: position
    DatarefEntry { path: "sim/flightmodel/position/latitude", apply: |d, v| d.position.latitude = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/position/longitude", apply: |d, v| d.position.longitude = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/position/elevation", apply: |d, v| d.position.altitude = f64::from(v) * METERS_TO_FEET },
    DatarefEntry { path: "sim/flightmodel/position/y_agl", apply: |d, v| d.position.altitude_agl = f64::from(v) * METERS_TO_FEET },
    // 4..=12: attitude and velocities
    DatarefEntry { path: "sim/flightmodel/position/theta", apply: |d, v| d.attitude.pitch = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/position/phi", apply: |d, v| d.attitude.roll = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/position/psi", apply: |d, v| d.attitude.heading_true = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/position/magpsi", apply: |d, v| d.attitude.heading_mag = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/position/vh_ind_fpm", apply: |d, v| d.attitude.vertical_speed = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/position/indicated_airspeed", apply: |d, v| d.attitude.ias = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/position/true_airspeed", apply: |d, v| d.attitude.tas = f64::from(v) * MPS_TO_KNOTS },
    DatarefEntry { path: "sim/flightmodel/position/groundspeed", apply: |d, v| d.attitude.ground_speed = f64::from(v) * MPS_TO_KNOTS },
    DatarefEntry { path: "sim/flightmodel/forces/g_nrml", apply: |d, v| d.attitude.g_force = f64::from(v) },
    // 13: engine count fans out to the per-slot exists flags
    DatarefEntry {
        path: "sim/aircraft/engine/acf_num_engines",
        apply: |d, v| {
            for (index, engine) in d.engines.iter_mut().enumerate() {
                engine.exists = (index as f32) < v;
            }
        },
    },
    // 14..=37: per-engine running / N1 / N2 / throttle / mixture / propeller
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_running[0]", apply: |d, v| d.engines[0].running = v != 0.0 },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_N1_[0]", apply: |d, v| d.engines[0].n1 = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_N2_[0]", apply: |d, v| d.engines[0].n2 = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_thro[0]", apply: |d, v| d.engines[0].throttle = f64::from(v) * 100.0 },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_mixt[0]", apply: |d, v| d.engines[0].mixture = f64::from(v) * 100.0 },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_prop[0]", apply: |d, v| d.engines[0].propeller = f64::from(v) * 100.0 },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_running[1]", apply: |d, v| d.engines[1].running = v != 0.0 },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_N1_[1]", apply: |d, v| d.engines[1].n1 = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_N2_[1]", apply: |d, v| d.engines[1].n2 = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_thro[1]", apply: |d, v| d.engines[1].throttle = f64::from(v) * 100.0 },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_mixt[1]", apply: |d, v| d.engines[1].mixture = f64::from(v) * 100.0 },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_prop[1]", apply: |d, v| d.engines[1].propeller = f64::from(v) * 100.0 },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_running[2]", apply: |d, v| d.engines[2].running = v != 0.0 },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_N1_[2]", apply: |d, v| d.engines[2].n1 = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_N2_[2]", apply: |d, v| d.engines[2].n2 = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_thro[2]", apply: |d, v| d.engines[2].throttle = f64::from(v) * 100.0 },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_mixt[2]", apply: |d, v| d.engines[2].mixture = f64::from(v) * 100.0 },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_prop[2]", apply: |d, v| d.engines[2].propeller = f64::from(v) * 100.0 },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_running[3]", apply: |d, v| d.engines[3].running = v != 0.0 },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_N1_[3]", apply: |d, v| d.engines[3].n1 = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_N2_[3]", apply: |d, v| d.engines[3].n2 = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_thro[3]", apply: |d, v| d.engines[3].throttle = f64::from(v) * 100.0 },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_mixt[3]", apply: |d, v| d.engines[3].mixture = f64::from(v) * 100.0 },
    DatarefEntry { path: "sim/flightmodel/engine/ENGN_prop[3]", apply: |d, v| d.engines[3].propeller = f64::from(v) * 100.0 },
    // 38..=41: sensors
    DatarefEntry { path: "sim/flightmodel/failures/onground_any", apply: |d, v| d.sensors.on_ground = v != 0.0 },
    DatarefEntry { path: "sim/cockpit2/annunciators/stall_warning", apply: |d, v| d.sensors.stall_warning = v != 0.0 },
    DatarefEntry { path: "sim/cockpit2/annunciators/overspeed", apply: |d, v| d.sensors.overspeed_warning = v != 0.0 },
    DatarefEntry { path: "sim/time/sim_speed", apply: |d, v| d.sensors.simulation_rate = f64::from(v) },
    // 42..=49: radios; frequencies arrive in hundredths of MHz
    DatarefEntry { path: "sim/cockpit/radios/com1_freq_hz", apply: |d, v| d.radios.com1 = f64::from(v) / 100.0 },
    DatarefEntry { path: "sim/cockpit/radios/com2_freq_hz", apply: |d, v| d.radios.com2 = f64::from(v) / 100.0 },
    DatarefEntry { path: "sim/cockpit/radios/nav1_freq_hz", apply: |d, v| d.radios.nav1 = f64::from(v) / 100.0 },
    DatarefEntry { path: "sim/cockpit/radios/nav2_freq_hz", apply: |d, v| d.radios.nav2 = f64::from(v) / 100.0 },
    DatarefEntry { path: "sim/cockpit/radios/nav1_obs_degm", apply: |d, v| d.radios.nav1_obs = f64::from(v) },
    DatarefEntry { path: "sim/cockpit/radios/nav2_obs_degm", apply: |d, v| d.radios.nav2_obs = f64::from(v) },
    DatarefEntry { path: "sim/cockpit/radios/transponder_code", apply: |d, v| d.radios.transponder_code = v.max(0.0) as u32 },
    DatarefEntry { path: "sim/cockpit/radios/transponder_mode", apply: |d, v| d.radios.transponder_state = TransponderState::from_mode(v.max(0.0) as u32) },
    // 50..=56: autopilot (mode 2 is fully engaged; 1 is flight director)
    DatarefEntry { path: "sim/cockpit/autopilot/autopilot_mode", apply: |d, v| d.autopilot.master = v >= 2.0 },
    DatarefEntry { path: "sim/cockpit/autopilot/heading_mag", apply: |d, v| d.autopilot.heading = f64::from(v) },
    DatarefEntry { path: "sim/cockpit/autopilot/altitude", apply: |d, v| d.autopilot.altitude = f64::from(v) },
    DatarefEntry { path: "sim/cockpit/autopilot/vertical_velocity", apply: |d, v| d.autopilot.vertical_speed = f64::from(v) },
    DatarefEntry { path: "sim/cockpit/autopilot/airspeed", apply: |d, v| d.autopilot.speed = f64::from(v) },
    DatarefEntry { path: "sim/cockpit2/autopilot/approach_status", apply: |d, v| d.autopilot.approach_hold = v != 0.0 },
    DatarefEntry { path: "sim/cockpit2/autopilot/nav_status", apply: |d, v| d.autopilot.nav_lock = v != 0.0 },
    // 57: altimeter
    DatarefEntry { path: "sim/cockpit/misc/barometer_setting", apply: |d, v| d.altimeter = f64::from(v) },
    // 58..=60: lights
    DatarefEntry { path: "sim/cockpit/electrical/beacon_lights_on", apply: |d, v| d.lights.beacon = v != 0.0 },
    DatarefEntry { path: "sim/cockpit/electrical/strobe_lights_on", apply: |d, v| d.lights.strobe = v != 0.0 },
    DatarefEntry { path: "sim/cockpit/electrical/landing_lights_on", apply: |d, v| d.lights.landing = v != 0.0 },
    // 61..=66: controls
    DatarefEntry { path: "sim/joystick/yoke_pitch_ratio", apply: |d, v| d.controls.elevator = f64::from(v) },
    DatarefEntry { path: "sim/joystick/yoke_roll_ratio", apply: |d, v| d.controls.aileron = f64::from(v) },
    DatarefEntry { path: "sim/joystick/yoke_heading_ratio", apply: |d, v| d.controls.rudder = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel/controls/flaprat", apply: |d, v| d.controls.flaps = f64::from(v) * 100.0 },
    DatarefEntry { path: "sim/flightmodel/controls/sbrkrat", apply: |d, v| d.controls.spoilers = f64::from(v) * 100.0 },
    DatarefEntry { path: "sim/cockpit/switches/gear_handle_status", apply: |d, v| d.controls.gear_down = v != 0.0 },
    // 67..=71: simulator clock; the three date entries share one source
    DatarefEntry { path: "sim/time/zulu_time_sec", apply: |d, v| d.sim_time.zulu_seconds = f64::from(v) },
    DatarefEntry { path: "sim/time/local_date_days", apply: |d, v| d.sim_time.zulu_day = month_and_day(v.max(0.0) as u32).1 },
    DatarefEntry { path: "sim/time/local_date_days", apply: |d, v| d.sim_time.zulu_month = month_and_day(v.max(0.0) as u32).0 },
    DatarefEntry { path: "sim/time/local_date_days", apply: |d, _| d.sim_time.zulu_year = chrono::Utc::now().year().max(0) as u32 },
    DatarefEntry { path: "sim/time/local_time_sec", apply: |d, v| d.sim_time.local_seconds = f64::from(v) },
    // 72..=75: APU
    DatarefEntry { path: "sim/cockpit/engine/APU_switch", apply: |d, v| d.apu.switch_on = v != 0.0 },
    DatarefEntry { path: "sim/cockpit/engine/APU_N1", apply: |d, v| d.apu.rpm = f64::from(v) },
    DatarefEntry { path: "sim/cockpit/engine/APU_gen_switch", apply: |d, v| d.apu.generator_switch = v != 0.0 },
    DatarefEntry { path: "sim/electrical/APU_generator_on", apply: |d, v| d.apu.generator_active = v != 0.0 },
    // 76..=80: doors
    DatarefEntry { path: "sim/flightmodel2/misc/door_open_ratio[0]", apply: |d, v| d.doors[0].open = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel2/misc/door_open_ratio[1]", apply: |d, v| d.doors[1].open = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel2/misc/door_open_ratio[2]", apply: |d, v| d.doors[2].open = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel2/misc/door_open_ratio[3]", apply: |d, v| d.doors[3].open = f64::from(v) },
    DatarefEntry { path: "sim/flightmodel2/misc/door_open_ratio[4]", apply: |d, v| d.doors[4].open = f64::from(v) },
    // 81..=82: weights, kilograms on the wire
    DatarefEntry { path: "sim/flightmodel/weight/m_total", apply: |d, v| d.weight.total = f64::from(v) * KG_TO_POUNDS },
    DatarefEntry { path: "sim/flightmodel/weight/m_fuel_total", apply: |d, v| d.weight.fuel = f64::from(v) * KG_TO_POUNDS },
];

/// Build one subscribe (or, with `frequency` 0, unsubscribe) datagram.
fn subscribe_datagram(frequency: u32, index: u32, path: &str) -> [u8; SUBSCRIBE_DATAGRAM_LEN] {
    let mut datagram = [0u8; SUBSCRIBE_DATAGRAM_LEN];
    datagram[..4].copy_from_slice(b"RREF");
    datagram[5..9].copy_from_slice(&frequency.to_le_bytes());
    datagram[9..13].copy_from_slice(&index.to_le_bytes());
    let path = path.as_bytes();
    datagram[PATH_OFFSET..PATH_OFFSET + path.len()].copy_from_slice(path);
    datagram
}

/// Fold one response datagram into the cache. Returns the number of entries
/// applied; partial or foreign datagrams are silently dropped.
fn apply_response(datagram: &[u8], cache: &SnapshotCell) -> usize {
    if datagram.len() < RESPONSE_HEADER_LEN || &datagram[..4] != b"RREF" {
        return 0;
    }

    let mut updates: Vec<(usize, f32)> = Vec::new();
    for entry in datagram[RESPONSE_HEADER_LEN..].chunks_exact(8) {
        let index = u32::from_le_bytes([entry[0], entry[1], entry[2], entry[3]]) as usize;
        let value = f32::from_le_bytes([entry[4], entry[5], entry[6], entry[7]]);
        if index < DATAREFS.len() {
            updates.push((index, value));
        }
    }

    if updates.is_empty() {
        return 0;
    }
    cache.update(true, |snapshot| {
        for (index, value) in &updates {
            (DATAREFS[*index].apply)(snapshot, *value);
        }
    });
    updates.len()
}

struct Io {
    socket: UdpSocket,
    listener: JoinHandle<()>,
}

/// Adapter for the X-Plane RREF protocol.
pub struct XPlaneAdapter {
    addr: String,
    cache: Arc<SnapshotCell>,
    stop: Arc<AtomicBool>,
    io: Mutex<Option<Io>>,
}

impl std::fmt::Debug for XPlaneAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XPlaneAdapter").field("addr", &self.addr).finish_non_exhaustive()
    }
}

impl XPlaneAdapter {
    /// Create an adapter targeting `host:port` (X-Plane's default data port
    /// is 49000). Nothing is dialled until [`SimAdapter::open`].
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            cache: Arc::new(SnapshotCell::default()),
            stop: Arc::new(AtomicBool::new(false)),
            io: Mutex::new(None),
        }
    }
}

impl SimAdapter for XPlaneAdapter {
    fn open(&self) -> Result<(), AdapterError> {
        self.close();
        self.stop.store(false, Ordering::Release);

        let target = self
            .addr
            .to_socket_addrs()
            .map_err(|e| AdapterError::OpenFailed(format!("resolve {}: {e}", self.addr)))?
            .next()
            .ok_or_else(|| {
                AdapterError::OpenFailed(format!("{} resolved to no address", self.addr))
            })?;

        let socket = UdpSocket::bind(("0.0.0.0", 0))
            .map_err(|e| AdapterError::OpenFailed(format!("bind: {e}")))?;
        socket
            .connect(target)
            .map_err(|e| AdapterError::OpenFailed(format!("connect {target}: {e}")))?;

        for (index, entry) in DATAREFS.iter().enumerate() {
            socket
                .send(&subscribe_datagram(SUBSCRIBE_FREQUENCY_HZ, index as u32, entry.path))
                .map_err(|e| AdapterError::OpenFailed(format!("subscribe: {e}")))?;
        }

        let listener_socket = socket
            .try_clone()
            .map_err(|e| AdapterError::OpenFailed(format!("clone socket: {e}")))?;
        listener_socket
            .set_read_timeout(Some(READ_DEADLINE))
            .map_err(|e| AdapterError::OpenFailed(format!("read deadline: {e}")))?;

        let cache = Arc::clone(&self.cache);
        let stop = Arc::clone(&self.stop);
        let listener = std::thread::Builder::new()
            .name("xplane-listener".to_string())
            .spawn(move || listen_loop(&listener_socket, &cache, &stop))
            .map_err(|e| AdapterError::OpenFailed(e.to_string()))?;

        info!("subscribed {} datarefs to X-Plane at {target}", DATAREFS.len());
        *self.io.lock().unwrap_or_else(|e| e.into_inner()) = Some(Io { socket, listener });
        Ok(())
    }

    fn close(&self) {
        let io = self.io.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(io) = io {
            for (index, entry) in DATAREFS.iter().enumerate() {
                if let Err(e) = io.socket.send(&subscribe_datagram(0, index as u32, entry.path)) {
                    debug!("unsubscribe send failed: {e}");
                    break;
                }
            }
            self.stop.store(true, Ordering::Release);
            if io.listener.join().is_err() {
                debug!("X-Plane listener thread panicked during close");
            }
        }
        self.cache.clear();
    }

    fn name(&self) -> &'static str {
        "X-Plane"
    }

    fn latest(&self) -> Result<FlightData, AdapterError> {
        self.cache.latest()
    }

    fn last_received(&self) -> Option<Instant> {
        self.cache.last_received()
    }
}

impl Drop for XPlaneAdapter {
    fn drop(&mut self) {
        self.close();
    }
}

fn listen_loop(socket: &UdpSocket, cache: &Arc<SnapshotCell>, stop: &Arc<AtomicBool>) {
    let mut buf = [0u8; 4096];
    while !stop.load(Ordering::Acquire) {
        match socket.recv(&mut buf) {
            Ok(len) => {
                apply_response(&buf[..len], cache);
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) => {}
            Err(e) => {
                debug!("X-Plane receive error: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DOOR_SLOTS;

    fn response(entries: &[(u32, f32)]) -> Vec<u8> {
        let mut datagram = Vec::with_capacity(RESPONSE_HEADER_LEN + entries.len() * 8);
        datagram.extend_from_slice(b"RREF\0");
        for (index, value) in entries {
            datagram.extend_from_slice(&index.to_le_bytes());
            datagram.extend_from_slice(&value.to_le_bytes());
        }
        datagram
    }

    #[test]
    fn test_subscribe_datagram_layout() {
        let datagram = subscribe_datagram(1, 7, "sim/flightmodel/position/latitude");
        assert_eq!(datagram.len(), SUBSCRIBE_DATAGRAM_LEN);
        assert_eq!(&datagram[..4], b"RREF");
        assert_eq!(datagram[4], 0);
        assert_eq!(u32::from_le_bytes(datagram[5..9].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(datagram[9..13].try_into().unwrap()), 7);
        assert_eq!(&datagram[13..46], b"sim/flightmodel/position/latitude");
        assert!(datagram[46..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_response_updates_mapped_field_with_conversion() {
        let cache = SnapshotCell::default();
        // Altitude arrives in metres at index 2.
        assert_eq!(apply_response(&response(&[(2, 25.3)]), &cache), 1);
        let snap = cache.latest().unwrap();
        assert!((snap.position.altitude - 83.0).abs() < 0.01);

        // Ground speed arrives in m/s at index 11.
        apply_response(&response(&[(11, 10.0)]), &cache);
        let snap = cache.latest().unwrap();
        assert!((snap.attitude.ground_speed - 19.4384).abs() < 0.001);

        // Weights arrive in kilograms.
        apply_response(&response(&[(81, 1000.0), (82, 200.0)]), &cache);
        let snap = cache.latest().unwrap();
        assert!((snap.weight.total - 2204.62).abs() < 0.01);
        assert!((snap.weight.fuel - 440.924).abs() < 0.01);

        // COM frequencies arrive in hundredths of MHz.
        apply_response(&response(&[(42, 12_850.0)]), &cache);
        let snap = cache.latest().unwrap();
        assert!((snap.radios.com1 - 128.50).abs() < 0.001);
    }

    #[test]
    fn test_each_index_maps_to_declared_path() {
        // Engine count at 13 fans out exists flags; door entries end at 80.
        assert_eq!(DATAREFS[13].path, "sim/aircraft/engine/acf_num_engines");
        assert_eq!(DATAREFS[76 + DOOR_SLOTS - 1].path, "sim/flightmodel2/misc/door_open_ratio[4]");
        assert_eq!(DATAREFS.len(), 83);

        let cache = SnapshotCell::default();
        apply_response(&response(&[(13, 2.0)]), &cache);
        let snap = cache.latest().unwrap();
        assert!(snap.engines[0].exists && snap.engines[1].exists);
        assert!(!snap.engines[2].exists && !snap.engines[3].exists);
    }

    #[test]
    fn test_short_and_foreign_datagrams_dropped() {
        let cache = SnapshotCell::default();
        assert_eq!(apply_response(b"RRE", &cache), 0);
        assert_eq!(apply_response(b"DATA\0something", &cache), 0);
        assert_eq!(apply_response(&response(&[(9999, 1.0)]), &cache), 0);
        assert!(cache.latest().is_err());
        assert!(cache.last_received().is_none());
    }

    #[test]
    fn test_month_and_day_from_day_of_year() {
        assert_eq!(month_and_day(0), (1, 1));
        assert_eq!(month_and_day(31), (2, 1));
        assert_eq!(month_and_day(59), (3, 1));
        assert_eq!(month_and_day(364), (12, 31));
    }

    #[test]
    fn test_open_subscribes_and_listener_parses_responses() {
        let fixture = UdpSocket::bind("127.0.0.1:0").unwrap();
        fixture.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let adapter = XPlaneAdapter::new(fixture.local_addr().unwrap().to_string());
        adapter.open().unwrap();

        // The fixture sees one subscribe datagram per dictionary entry.
        let mut buf = [0u8; 1024];
        let (len, peer) = fixture.recv_from(&mut buf).unwrap();
        assert_eq!(len, SUBSCRIBE_DATAGRAM_LEN);
        assert_eq!(&buf[..4], b"RREF");

        fixture
            .send_to(&response(&[(0, 51.4775), (1, -0.4614), (2, 25.3)]), peer)
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if let Ok(snap) = adapter.latest() {
                assert!((snap.position.latitude - 51.4775).abs() < 1e-4);
                assert!((snap.position.longitude + 0.4614).abs() < 1e-4);
                assert!((snap.position.altitude - 83.0).abs() < 0.1);
                assert!(adapter.last_received().is_some());
                break;
            }
            assert!(Instant::now() < deadline, "no snapshot parsed in time");
            std::thread::sleep(Duration::from_millis(20));
        }

        adapter.close();
        assert!(matches!(adapter.latest(), Err(AdapterError::NoData)));
    }
}
