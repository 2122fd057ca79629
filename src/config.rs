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

//! Application configuration management.
//!
//! Persistent settings are stored as TOML via confy; CLI flags override
//! individual fields for one run and the merged result is saved back.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "https://api.skylink-va.net";

/// Default X-Plane UDP address.
pub const DEFAULT_XPLANE_ADDR: &str = "127.0.0.1:49000";

const APP_NAME: &str = "skylink-acars";

/// Application configuration stored in TOML format.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Backend base URL.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Bearer token for the backend session.
    #[serde(default)]
    pub api_token: String,

    /// Default simulator kind: "simconnect", "xplane" or "auto".
    #[serde(default = "default_simulator")]
    pub simulator: String,

    /// X-Plane UDP address in host:port format.
    #[serde(default = "default_xplane_addr")]
    pub xplane_addr: String,

    /// Recording database location; defaults to the platform data dir.
    #[serde(default)]
    pub recording_db: Option<PathBuf>,
}

// Default value functions for serde
fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_simulator() -> String {
    "auto".to_string()
}

fn default_xplane_addr() -> String {
    DEFAULT_XPLANE_ADDR.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            api_token: String::new(),
            simulator: default_simulator(),
            xplane_addr: default_xplane_addr(),
            recording_db: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk.
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, "config")
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, "config", self)
    }

    /// Resolved path of the recording database.
    #[must_use]
    pub fn recording_db_path(&self) -> PathBuf {
        self.recording_db.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
                .join("recording.db")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.simulator, "auto");
        assert_eq!(config.xplane_addr, DEFAULT_XPLANE_ADDR);
        assert!(config.api_token.is_empty());
    }

    #[test]
    fn test_recording_db_path_resolution() {
        let config = AppConfig::default();
        assert!(config.recording_db_path().ends_with("recording.db"));

        let explicit = AppConfig {
            recording_db: Some(PathBuf::from("/tmp/rec.db")),
            ..Default::default()
        };
        assert_eq!(explicit.recording_db_path(), PathBuf::from("/tmp/rec.db"));
    }
}
