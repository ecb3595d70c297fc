//! Server configuration.
//!
//! Loaded with figment, in order of precedence (highest first):
//! 1. `USERDESK_*` environment variables, `__` separating nested keys
//!    (`USERDESK_SESSION__TTL_HOURS=12`)
//! 2. the bare `ADMIN_EMAIL` and `DATABASE_URL` variables
//! 3. the TOML file named by `USERDESK_CONFIG`, or `userdesk.toml`
//! 4. built-in defaults

use std::path::PathBuf;
use std::sync::OnceLock;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use userdesk_data::DbConfig;

pub const CONFIG_FILE_NAME: &str = "userdesk.toml";
pub const CONFIG_PATH_ENV: &str = "USERDESK_CONFIG";
pub const ENV_PREFIX: &str = "USERDESK_";

static CONFIG: OnceLock<ServerConfig> = OnceLock::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Accounts registered with this email become admins.
    pub admin_email: Option<String>,
    /// bcrypt work factor used when hashing new passwords.
    pub bcrypt_cost: u32,
    pub database: DbConfig,
    pub session: SessionConfig,
    pub logger: LoggerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_owned(),
            admin_email: None,
            bcrypt_cost: 10,
            database: DbConfig::default(),
            session: SessionConfig::default(),
            logger: LoggerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_hours: i64,
    /// Marks the session cookie `Secure`. Enable behind TLS.
    pub secure_cookie: bool,
    /// How often expired sessions are swept, in minutes.
    pub cleanup_interval_minutes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "userdesk_sid".to_owned(),
            ttl_hours: 24,
            secure_cookie: false,
            cleanup_interval_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Default filter directive, used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Compact,
        }
    }
}

fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

pub fn figment() -> Figment {
    let legacy = Env::raw()
        .only(&["admin_email", "database_url"])
        .map(|key| {
            if key.as_str().eq_ignore_ascii_case("database_url") {
                "database.url".into()
            } else {
                key.as_str().to_owned().into()
            }
        });

    Figment::from(Serialized::defaults(ServerConfig::default()))
        .merge(Toml::file(config_path()))
        .merge(legacy)
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

pub fn load() -> Result<ServerConfig, figment::Error> {
    figment().extract()
}

/// Publishes the loaded configuration. Only the first call wins.
pub fn init(config: ServerConfig) -> &'static ServerConfig {
    CONFIG.get_or_init(|| config)
}
