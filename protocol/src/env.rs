//! Environment variables the server reads at startup, with their names and
//! defaults. Parsing lives in `game-server::config`; this module is just the
//! shared vocabulary of names/defaults so both the server and its tests
//! agree on them.

/// Administrative override code, gates moderation commands.
pub const ADMIN_CODE: &str = "ADMIN_CODE";
/// `development` / `production` / etc.
pub const NODE_ENV: &str = "NODE_ENV";

/// Seconds between periodic settings persistence. Default below.
pub const SAVE_INTERVAL: &str = "SAVE_INTERVAL";
pub const SAVE_INTERVAL_DEFAULT_SECS: u64 = 60;

/// Path to the hot-reloadable world settings JSON file. Default below.
pub const SETTINGS_PATH: &str = "SETTINGS_PATH";
pub const SETTINGS_PATH_DEFAULT: &str = "world-settings.json";

/// Seconds between liveness pings. Default below.
pub const WS_PING_INTERVAL_SEC: &str = "WS_PING_INTERVAL_SEC";
pub const WS_PING_INTERVAL_DEFAULT_SECS: u64 = 5;

/// Consecutive missed pongs tolerated before eviction. Default below.
pub const WS_PING_MISS_TOLERANCE: &str = "WS_PING_MISS_TOLERANCE";
pub const WS_PING_MISS_TOLERANCE_DEFAULT: u32 = 3;

/// Grace period in milliseconds before a missed pong counts. Default below.
pub const WS_PING_GRACE_MS: &str = "WS_PING_GRACE_MS";
pub const WS_PING_GRACE_MS_DEFAULT: u64 = 5000;
