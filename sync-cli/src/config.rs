//! Configuration loading for roomsync-bot.
//!
//! Values are layered, lowest precedence first: built-in defaults, an
//! optional TOML file, then environment variables and command-line flags
//! (clap reads the environment for flags that were not given, and `.env` is
//! loaded into the environment before parsing).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use roomsync_client::{config::DEFAULT_HOMESERVER, ClientConfig};
use roomsync_types::{RoomId, UserId};

/// Environment variable holding the homeserver URL.
pub const ENV_HOMESERVER: &str = "MATRIX_HOMESERVER";
/// Environment variable holding the bot access token.
pub const ENV_ACCESS_TOKEN: &str = "MATRIX_BOT_ACCESS_TOKEN";
/// Environment variable holding the room id.
pub const ENV_ROOM_ID: &str = "MATRIX_ROOM_ID";
/// Environment variable holding the human user id.
pub const ENV_HUMAN_ID: &str = "MATRIX_HUMAN_ID";

/// Default greeting sent when the bot starts.
pub const DEFAULT_WELCOME: &str = "Matrix Bot is online. Say something.";

/// Root of the TOML configuration file. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// Account and room.
    #[serde(default)]
    pub matrix: MatrixConfig,
    /// Loop timing.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Bot behaviour.
    #[serde(default)]
    pub bot: BotBehaviour,
}

/// Account and room settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatrixConfig {
    /// Homeserver base URL.
    pub homeserver: Option<String>,
    /// Bot access token. Prefer the environment for this one.
    pub access_token: Option<String>,
    /// Room to follow (`!id:server`).
    pub room_id: Option<String>,
    /// The human the bot talks to (`@user:server`).
    pub human_id: Option<String>,
}

/// Sync loop settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Long-poll hold time in seconds (default: 30).
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    /// Wait after a failed poll in milliseconds (default: 2000).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Delivered event ids remembered for dedup (default: 1000).
    #[serde(default = "default_seen_capacity")]
    pub seen_capacity: usize,
    /// Timeline events per poll (default: 20).
    #[serde(default = "default_timeline_limit")]
    pub timeline_limit: u32,
    /// HTTP request timeout in seconds (default: 45).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Bot behaviour settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BotBehaviour {
    /// Heartbeat period in seconds, 0 disables (default: 1).
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    /// Greeting sent at startup (default: [`DEFAULT_WELCOME`]).
    #[serde(default = "default_welcome")]
    pub welcome: String,
    /// Whether to send the greeting (default: true).
    #[serde(default = "default_send_welcome")]
    pub send_welcome: bool,
}

// Default value functions
fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_seen_capacity() -> usize {
    1000
}

fn default_timeline_limit() -> u32 {
    20
}

fn default_request_timeout_secs() -> u64 {
    45
}

fn default_heartbeat_secs() -> u64 {
    1
}

fn default_welcome() -> String {
    DEFAULT_WELCOME.to_string()
}

fn default_send_welcome() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_timeout_secs: default_poll_timeout_secs(),
            retry_delay_ms: default_retry_delay_ms(),
            seen_capacity: default_seen_capacity(),
            timeline_limit: default_timeline_limit(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for BotBehaviour {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat_secs(),
            welcome: default_welcome(),
            send_welcome: default_send_welcome(),
        }
    }
}

impl FileConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load from `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

/// Values taken from flags or the environment. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Homeserver base URL.
    pub homeserver: Option<String>,
    /// Bot access token.
    pub access_token: Option<String>,
    /// Room id.
    pub room_id: Option<String>,
    /// Human user id.
    pub human_id: Option<String>,
}

/// Fully resolved bot configuration.
#[derive(Clone)]
pub struct BotConfig {
    /// Homeserver base URL.
    pub homeserver: String,
    /// Bot access token.
    pub access_token: String,
    /// Room to follow.
    pub room_id: RoomId,
    /// The human the bot talks to.
    pub human_id: UserId,
    /// Loop timing.
    pub sync: SyncConfig,
    /// Bot behaviour.
    pub bot: BotBehaviour,
}

impl BotConfig {
    /// Merge file values with overrides and check required values.
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let FileConfig { matrix, sync, bot } = file;

        let homeserver = non_empty(overrides.homeserver)
            .or(non_empty(matrix.homeserver))
            .unwrap_or_else(|| DEFAULT_HOMESERVER.to_string());
        let access_token = non_empty(overrides.access_token)
            .or(non_empty(matrix.access_token))
            .ok_or(ConfigError::Missing(ENV_ACCESS_TOKEN))?;
        let room_id = non_empty(overrides.room_id)
            .or(non_empty(matrix.room_id))
            .ok_or(ConfigError::Missing(ENV_ROOM_ID))?;
        let human_id = non_empty(overrides.human_id)
            .or(non_empty(matrix.human_id))
            .ok_or(ConfigError::Missing(ENV_HUMAN_ID))?;

        let room_id =
            RoomId::parse(&room_id).map_err(|e| ConfigError::Invalid(ENV_ROOM_ID, e.to_string()))?;
        let human_id = UserId::parse(&human_id)
            .map_err(|e| ConfigError::Invalid(ENV_HUMAN_ID, e.to_string()))?;

        Ok(Self {
            homeserver,
            access_token,
            room_id,
            human_id,
            sync,
            bot,
        })
    }

    /// Library configuration for the room client.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.access_token, self.room_id.clone(), self.human_id.clone())
            .with_homeserver(&self.homeserver)
            .with_poll_timeout(Duration::from_secs(self.sync.poll_timeout_secs))
            .with_retry_delay(Duration::from_millis(self.sync.retry_delay_ms))
            .with_seen_capacity(self.sync.seen_capacity)
            .with_timeline_limit(self.sync.timeline_limit)
            .with_request_timeout(Duration::from_secs(self.sync.request_timeout_secs))
    }

    /// Heartbeat period; zero means disabled.
    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_secs(self.bot.heartbeat_secs)
    }

    /// The greeting to send, if enabled.
    pub fn welcome(&self) -> Option<&str> {
        if self.bot.send_welcome && !self.bot.welcome.trim().is_empty() {
            Some(self.bot.welcome.as_str())
        } else {
            None
        }
    }
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("homeserver", &self.homeserver)
            .field("access_token", &"[REDACTED]")
            .field("room_id", &self.room_id)
            .field("human_id", &self.human_id)
            .field("sync", &self.sync)
            .field("bot", &self.bot)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A required value was not provided anywhere.
    #[error("{0} is required")]
    Missing(&'static str),
    /// A value is malformed.
    #[error("{0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn overrides() -> Overrides {
        Overrides {
            homeserver: None,
            access_token: Some("syt_token".into()),
            room_id: Some("!room:example.org".into()),
            human_id: Some("@jni:example.org".into()),
        }
    }

    #[test]
    fn defaults() {
        let config = BotConfig::resolve(FileConfig::default(), overrides()).unwrap();

        assert_eq!(config.homeserver, "https://matrix.org");
        assert_eq!(config.sync.poll_timeout_secs, 30);
        assert_eq!(config.sync.retry_delay_ms, 2000);
        assert_eq!(config.sync.seen_capacity, 1000);
        assert_eq!(config.heartbeat_period(), Duration::from_secs(1));
        assert_eq!(config.welcome(), Some(DEFAULT_WELCOME));
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[matrix]
homeserver = "https://hs.example.org"
room_id = "!file:example.org"

[sync]
poll_timeout_secs = 10
retry_delay_ms = 500

[bot]
heartbeat_secs = 0
welcome = "hello"
"#;

        let file: FileConfig = toml::from_str(toml).unwrap();
        assert_eq!(file.matrix.homeserver.as_deref(), Some("https://hs.example.org"));
        assert_eq!(file.sync.poll_timeout_secs, 10);
        assert_eq!(file.sync.retry_delay_ms, 500);
        assert_eq!(file.sync.timeline_limit, 20);
        assert_eq!(file.bot.heartbeat_secs, 0);
        assert_eq!(file.bot.welcome, "hello");
        assert!(file.bot.send_welcome);
    }

    #[test]
    fn config_missing_sections_use_defaults() {
        let file: FileConfig = toml::from_str("").unwrap();
        assert_eq!(file.sync.request_timeout_secs, 45);
        assert_eq!(file.bot.heartbeat_secs, 1);
        assert!(file.matrix.access_token.is_none());
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[matrix]\naccess_token = \"from_file\"").unwrap();

        let config = FileConfig::from_file(file.path()).unwrap();
        assert_eq!(config.matrix.access_token.as_deref(), Some("from_file"));
    }

    #[test]
    fn from_file_missing_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileConfig::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn from_file_malformed_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[sync]\npoll_timeout_secs = \"soon\"").unwrap();

        let result = FileConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn overrides_beat_file() {
        let mut file = FileConfig::default();
        file.matrix.homeserver = Some("https://file.example.org".into());
        file.matrix.room_id = Some("!file:example.org".into());

        let mut over = overrides();
        over.homeserver = Some("https://flag.example.org".into());
        let config = BotConfig::resolve(file, over).unwrap();

        assert_eq!(config.homeserver, "https://flag.example.org");
        assert_eq!(config.room_id, RoomId::new("!room:example.org"));
    }

    #[test]
    fn file_fills_missing_overrides() {
        let mut file = FileConfig::default();
        file.matrix.access_token = Some("file_token".into());

        let mut over = overrides();
        over.access_token = None;
        let config = BotConfig::resolve(file, over).unwrap();
        assert_eq!(config.access_token, "file_token");
    }

    #[test]
    fn missing_required_values() {
        let mut over = overrides();
        over.access_token = Some("   ".into());
        assert!(matches!(
            BotConfig::resolve(FileConfig::default(), over),
            Err(ConfigError::Missing(ENV_ACCESS_TOKEN))
        ));

        let mut over = overrides();
        over.room_id = None;
        assert!(matches!(
            BotConfig::resolve(FileConfig::default(), over),
            Err(ConfigError::Missing(ENV_ROOM_ID))
        ));

        let mut over = overrides();
        over.human_id = None;
        assert!(matches!(
            BotConfig::resolve(FileConfig::default(), over),
            Err(ConfigError::Missing(ENV_HUMAN_ID))
        ));
    }

    #[test]
    fn malformed_ids_are_rejected() {
        let mut over = overrides();
        over.room_id = Some("#alias:example.org".into());
        let err = BotConfig::resolve(FileConfig::default(), over).unwrap_err();
        assert!(err.to_string().starts_with("MATRIX_ROOM_ID:"), "got: {}", err);
    }

    #[test]
    fn client_config_carries_values() {
        let mut file = FileConfig::default();
        file.sync.retry_delay_ms = 250;
        file.sync.timeline_limit = 5;
        let config = BotConfig::resolve(file, overrides()).unwrap();

        let client = config.client_config();
        assert!(client.validate().is_ok());
        assert_eq!(client.retry_delay, Duration::from_millis(250));
        assert_eq!(client.timeline_limit, 5);
        assert_eq!(client.access_token, "syt_token");
    }

    #[test]
    fn poll_timeout_beyond_request_timeout_is_rejected() {
        let file: FileConfig = toml::from_str("[sync]\npoll_timeout_secs = 60").unwrap();
        let config = BotConfig::resolve(file, overrides()).unwrap();

        assert!(matches!(
            config.client_config().validate(),
            Err(roomsync_client::ConfigError::RequestTimeoutTooShort { .. })
        ));
    }

    #[test]
    fn welcome_can_be_disabled() {
        let mut file = FileConfig::default();
        file.bot.send_welcome = false;
        let config = BotConfig::resolve(file, overrides()).unwrap();
        assert!(config.welcome().is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let config = BotConfig::resolve(FileConfig::default(), overrides()).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("syt_token"));
    }
}
