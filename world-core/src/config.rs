//! Runtime configuration: environment variables plus a hot-reloadable JSON
//! settings file.

use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

/// Spawn point and arena bounds live in a settings file rather than code so
/// they can be hot-reloaded without a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSettings {
    pub spawn_x: f32,
    pub spawn_y: f32,
    pub spawn_z: f32,
    pub arena_min_x: i32,
    pub arena_min_z: i32,
    pub arena_max_x: i32,
    pub arena_max_z: i32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        WorldSettings {
            spawn_x: 0.0,
            spawn_y: 0.0,
            spawn_z: 0.0,
            arena_min_x: 100,
            arena_min_z: 100,
            arena_max_x: 120,
            arena_max_z: 120,
        }
    }
}

/// Loads `WorldSettings` from `path`, falling back to defaults if the file
/// is missing (first run) and surfacing parse errors.
pub async fn load_world_settings(path: &str) -> Result<WorldSettings, String> {
    match fs::read_to_string(path).await {
        Ok(content) => serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse {path}: {e}")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(WorldSettings::default()),
        Err(e) => Err(format!("Failed to read {path}: {e}")),
    }
}

/// Persists `WorldSettings` to `path`, used on settings change and on the
/// periodic `SAVE_INTERVAL` cadence.
pub async fn save_world_settings(path: &str, settings: &WorldSettings) -> Result<(), String> {
    let json = serde_json::to_string_pretty(settings).map_err(|e| e.to_string())?;
    fs::write(path, json).await.map_err(|e| e.to_string())
}

/// Shared, hot-reloadable settings handle.
pub type SharedSettings = Arc<RwLock<WorldSettings>>;

/// Server-wide tunables read from environment variables at startup.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub save_interval_secs: u64,
    pub settings_path: String,
    pub ws_ping_interval_secs: u64,
    pub ws_ping_miss_tolerance: u32,
    pub ws_ping_grace_ms: u64,
    pub admin_code: Option<String>,
}

impl EnvConfig {
    /// Reads every variable with `protocol::env`'s documented defaults.
    pub fn from_env() -> Self {
        EnvConfig {
            save_interval_secs: read_u64(
                protocol::env::SAVE_INTERVAL,
                protocol::env::SAVE_INTERVAL_DEFAULT_SECS,
            ),
            settings_path: env::var(protocol::env::SETTINGS_PATH)
                .unwrap_or_else(|_| protocol::env::SETTINGS_PATH_DEFAULT.to_string()),
            ws_ping_interval_secs: read_u64(
                protocol::env::WS_PING_INTERVAL_SEC,
                protocol::env::WS_PING_INTERVAL_DEFAULT_SECS,
            ),
            ws_ping_miss_tolerance: read_u64(
                protocol::env::WS_PING_MISS_TOLERANCE,
                protocol::env::WS_PING_MISS_TOLERANCE_DEFAULT as u64,
            ) as u32,
            ws_ping_grace_ms: read_u64(
                protocol::env::WS_PING_GRACE_MS,
                protocol::env::WS_PING_GRACE_MS_DEFAULT,
            ),
            admin_code: env::var(protocol::env::ADMIN_CODE).ok(),
        }
    }
}

fn read_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_settings_file_uses_defaults() {
        let settings = load_world_settings("/tmp/does-not-exist-world-settings.json")
            .await
            .unwrap();
        assert_eq!(settings.spawn_x, 0.0);
    }

    #[tokio::test]
    async fn settings_round_trip_through_disk() {
        let path = "/tmp/world-core-test-settings.json";
        let settings = WorldSettings {
            spawn_x: 12.0,
            ..WorldSettings::default()
        };
        save_world_settings(path, &settings).await.unwrap();
        let loaded = load_world_settings(path).await.unwrap();
        assert_eq!(loaded.spawn_x, 12.0);
        let _ = tokio::fs::remove_file(path).await;
    }
}
