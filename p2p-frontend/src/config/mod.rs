use secrecy::Secret;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Connection details for the remote payment backend.
///
/// The key pair is injected at startup (config file or `APP_GATEWAY__*`
/// environment variables); nothing is compiled in.
#[derive(Deserialize, Clone)]
pub struct GatewaySettings {
    /// Base URL without trailing slash, e.g. `https://api.example.com`.
    pub base_url: String,
    /// Sent verbatim in the `Apipublic` header.
    pub public_key: String,
    /// HMAC key for the `Signature` header.
    pub private_key: Secret<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    #[default]
    File,
    Redis,
}

#[derive(Deserialize, Clone)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Directory holding one `<key>.json` file per blob (file backend).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Connection string for the redis backend.
    #[serde(default)]
    pub redis_url: Option<Secret<String>>,
    /// Fixed key under which the transaction history blob lives.
    #[serde(default = "default_store_key")]
    pub key: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            data_dir: default_data_dir(),
            redis_url: None,
            key: default_store_key(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_store_key() -> String {
    "p2p_transactions".to_string()
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PollingScope {
    /// Re-check every stored transaction that is still ACCEPTED.
    #[default]
    AllPending,
    /// Follow only the most recently created transaction until it settles.
    Latest,
    /// No background polling; status is refreshed on demand only.
    None,
}

#[derive(Deserialize, Clone)]
pub struct PollingSettings {
    #[serde(default = "default_poll_interval")]
    pub interval_seconds: u64,
    #[serde(default)]
    pub scope: PollingScope,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_seconds: default_poll_interval(),
            scope: PollingScope::default(),
        }
    }
}

fn default_poll_interval() -> u64 {
    5
}

#[derive(Deserialize, Clone)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP gRPC endpoint; spans are only exported when set.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("Cannot read current dir: {}", e)))?;

    // Support running from the workspace root or the crate directory
    let configuration_directory = if base_path.ends_with("p2p-frontend") {
        base_path.join("config")
    } else {
        base_path.join("p2p-frontend").join("config")
    };

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
