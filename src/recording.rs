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

//! Local flight recording store.
//!
//! While recording is armed the stream engine appends every snapshot to a
//! single append-only SQLite table. `export_csv` drains the table into a
//! fixed 42-column CSV and truncates it, so the store never persists data
//! across an export.

use std::path::Path;
use std::sync::Mutex;

use log::info;
use rusqlite::Connection;
use thiserror::Error;

use sim_client::{FlightData, RecordingSink};

/// Errors from the recording store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("recording database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("snapshot serialisation failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fixed CSV header. Booleans are written `0`/`1`, floats with four
/// fractional digits.
pub const CSV_HEADER: [&str; 42] = [
    "timestamp",
    "latitude",
    "longitude",
    "altitude",
    "altitude_agl",
    "pitch",
    "roll",
    "heading_true",
    "heading_mag",
    "vertical_speed",
    "ias",
    "tas",
    "ground_speed",
    "g_force",
    "on_ground",
    "stall_warning",
    "overspeed_warning",
    "simulation_rate",
    "com1",
    "com2",
    "nav1",
    "nav2",
    "nav1_obs",
    "nav2_obs",
    "transponder_code",
    "ap_master",
    "ap_heading",
    "ap_altitude",
    "ap_vertical_speed",
    "ap_speed",
    "ap_approach_hold",
    "ap_nav_lock",
    "altimeter",
    "beacon_light",
    "strobe_light",
    "landing_light",
    "elevator",
    "aileron",
    "rudder",
    "flaps",
    "spoilers",
    "gear_down",
];

fn bit(flag: bool) -> String {
    if flag { "1".to_string() } else { "0".to_string() }
}

fn fixed(value: f64) -> String {
    format!("{value:.4}")
}

/// Flatten one recorded row into the CSV column order.
fn csv_row(timestamp: &str, snap: &FlightData) -> Vec<String> {
    vec![
        timestamp.to_string(),
        fixed(snap.position.latitude),
        fixed(snap.position.longitude),
        fixed(snap.position.altitude),
        fixed(snap.position.altitude_agl),
        fixed(snap.attitude.pitch),
        fixed(snap.attitude.roll),
        fixed(snap.attitude.heading_true),
        fixed(snap.attitude.heading_mag),
        fixed(snap.attitude.vertical_speed),
        fixed(snap.attitude.ias),
        fixed(snap.attitude.tas),
        fixed(snap.attitude.ground_speed),
        fixed(snap.attitude.g_force),
        bit(snap.sensors.on_ground),
        bit(snap.sensors.stall_warning),
        bit(snap.sensors.overspeed_warning),
        fixed(snap.sensors.simulation_rate),
        fixed(snap.radios.com1),
        fixed(snap.radios.com2),
        fixed(snap.radios.nav1),
        fixed(snap.radios.nav2),
        fixed(snap.radios.nav1_obs),
        fixed(snap.radios.nav2_obs),
        snap.radios.transponder_code.to_string(),
        bit(snap.autopilot.master),
        fixed(snap.autopilot.heading),
        fixed(snap.autopilot.altitude),
        fixed(snap.autopilot.vertical_speed),
        fixed(snap.autopilot.speed),
        bit(snap.autopilot.approach_hold),
        bit(snap.autopilot.nav_lock),
        fixed(snap.altimeter),
        bit(snap.lights.beacon),
        bit(snap.lights.strobe),
        bit(snap.lights.landing),
        fixed(snap.controls.elevator),
        fixed(snap.controls.aileron),
        fixed(snap.controls.rudder),
        fixed(snap.controls.flaps),
        fixed(snap.controls.spoilers),
        bit(snap.controls.gear_down),
    ]
}

/// Append-only SQLite store for recorded snapshots.
pub struct RecordingStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for RecordingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingStore").finish_non_exhaustive()
    }
}

impl RecordingStore {
    /// Open (or create) the store at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// In-memory store, used by tests and `--no-persist` runs.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS flight_data (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL DEFAULT (datetime('now')),
                data      TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Append one snapshot as a JSON row.
    pub fn append(&self, snapshot: &FlightData) -> Result<(), StoreError> {
        let data = serde_json::to_string(snapshot)?;
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute("INSERT INTO flight_data (data) VALUES (?1)", [&data])?;
        Ok(())
    }

    /// Number of recorded rows.
    pub fn count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM flight_data", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Drain every row into a CSV file at `path` and truncate the store.
    /// Returns the number of data rows written; the header is always
    /// written, so an empty store produces a header-only file.
    pub fn export_csv(&self, path: &Path) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(CSV_HEADER)?;

        let mut rows = 0u64;
        {
            let mut stmt =
                conn.prepare("SELECT timestamp, data FROM flight_data ORDER BY id")?;
            let mut query = stmt.query([])?;
            while let Some(row) = query.next()? {
                let timestamp: String = row.get(0)?;
                let data: String = row.get(1)?;
                let snapshot: FlightData = serde_json::from_str(&data)?;
                writer.write_record(csv_row(&timestamp, &snapshot))?;
                rows += 1;
            }
        }
        writer.flush()?;

        conn.execute("DELETE FROM flight_data", [])?;
        info!("exported {rows} recorded snapshots to {}", path.display());
        Ok(rows)
    }
}

impl RecordingSink for RecordingStore {
    fn append(
        &self,
        snapshot: &FlightData,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        RecordingStore::append(self, snapshot)?;
        Ok(())
    }
}
