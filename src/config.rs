use serde::{Deserialize, Serialize};

/// Top-level configuration, loaded from `config.toml`.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 2337,
        }
    }
}

/// What happens when the host leaves an Active session with guests.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HostLeavePolicy {
    /// Promote the longest-joined online guest.
    Promote,
    /// Terminate the session for everyone.
    End,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub max_participants: usize,
    /// Sessions expire this long after creation.
    pub ttl_ms: u64,
    pub host_leave_policy: HostLeavePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_participants: 32,
            ttl_ms: 2 * 60 * 60 * 1000,
            host_leave_policy: HostLeavePolicy::Promote,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LimitsConfig {
    /// Chat messages retained for late joiners.
    pub chat_capacity: usize,
    /// Chat rate limit: at most `chat_burst` messages per `chat_window_ms`.
    pub chat_burst: usize,
    pub chat_window_ms: u64,
    /// Reaction display window; reactions older than this are pruned.
    pub reaction_window_ms: u64,
    pub reaction_capacity: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            chat_capacity: 50,
            chat_burst: 10,
            chat_window_ms: 10_000,
            reaction_window_ms: 4_000,
            reaction_capacity: 20,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

impl Config {
    /// Read `config.toml` from the working directory; defaults apply when
    /// the file is absent.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_str = std::fs::read_to_string("config.toml").unwrap_or_default();
        if config_str.is_empty() {
            return Ok(Self::default());
        }
        let config: Config = toml::from_str(&config_str)?;
        Ok(config)
    }
}
