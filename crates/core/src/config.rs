use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIB: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub notification: NotificationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: QuoteStorageBackend,
    pub blob_dir: PathBuf,
    pub inline_max_bytes: usize,
    pub max_upload_bytes: usize,
    pub public_base_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub api_key: Option<SecretString>,
    pub endpoint: String,
    pub from: String,
    pub recipients: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

/// Where quote documents live once uploaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStorageBackend {
    /// Base64 `data:` URL embedded in the request record.
    Inline,
    /// Object in the blob directory, referenced by URL.
    Blob,
    /// Inline up to `inline_max_bytes`, blob above.
    Auto,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub store_backend: Option<StoreBackend>,
    pub server_port: Option<u16>,
    pub storage_backend: Option<QuoteStorageBackend>,
    pub storage_blob_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub notification_enabled: Option<bool>,
    pub notification_api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://tripdesk.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            store: StoreConfig { backend: StoreBackend::Sqlite },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 4000,
                graceful_shutdown_secs: 15,
            },
            storage: StorageConfig {
                backend: QuoteStorageBackend::Inline,
                blob_dir: PathBuf::from("data/quotes"),
                inline_max_bytes: 18 * MIB,
                max_upload_bytes: 100 * MIB,
                public_base_url: None,
            },
            notification: NotificationConfig {
                enabled: false,
                api_key: None,
                endpoint: "https://api.resend.com/emails".to_string(),
                from: "Travel Request Portal <noreply@travel-requests.local>".to_string(),
                recipients: Vec::new(),
                timeout_secs: 10,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Validation(format!(
                "unsupported store backend `{other}` (expected sqlite|memory)"
            ))),
        }
    }
}

impl std::str::FromStr for QuoteStorageBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "blob" => Ok(Self::Blob),
            "auto" => Ok(Self::Auto),
            other => Err(ConfigError::Validation(format!(
                "unsupported storage backend `{other}` (expected inline|blob|auto)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl NotificationConfig {
    /// Notifications go out only when switched on and a key is present.
    pub fn is_active(&self) -> bool {
        self.enabled
            && self.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty())
    }
}

impl StorageConfig {
    pub fn uses_blob_store(&self) -> bool {
        matches!(self.backend, QuoteStorageBackend::Blob | QuoteStorageBackend::Auto)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("tripdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(backend) = patch.store.and_then(|store| store.backend) {
            self.store.backend = backend;
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(storage) = patch.storage {
            if let Some(backend) = storage.backend {
                self.storage.backend = backend;
            }
            if let Some(blob_dir) = storage.blob_dir {
                self.storage.blob_dir = blob_dir;
            }
            if let Some(inline_max_bytes) = storage.inline_max_bytes {
                self.storage.inline_max_bytes = inline_max_bytes;
            }
            if let Some(max_upload_bytes) = storage.max_upload_bytes {
                self.storage.max_upload_bytes = max_upload_bytes;
            }
            if let Some(public_base_url) = storage.public_base_url {
                self.storage.public_base_url = Some(public_base_url);
            }
        }

        if let Some(notification) = patch.notification {
            if let Some(enabled) = notification.enabled {
                self.notification.enabled = enabled;
            }
            if let Some(notification_api_key_value) = notification.api_key {
                self.notification.api_key = Some(secret_value(notification_api_key_value));
            }
            if let Some(endpoint) = notification.endpoint {
                self.notification.endpoint = endpoint;
            }
            if let Some(from) = notification.from {
                self.notification.from = from;
            }
            if let Some(recipients) = notification.recipients {
                self.notification.recipients = recipients;
            }
            if let Some(timeout_secs) = notification.timeout_secs {
                self.notification.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TRIPDESK_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("TRIPDESK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("TRIPDESK_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("TRIPDESK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("TRIPDESK_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TRIPDESK_STORE_BACKEND") {
            self.store.backend = value.parse()?;
        }

        if let Some(value) = read_env("TRIPDESK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        let port = read_env("TRIPDESK_SERVER_PORT")
            .map(|value| ("TRIPDESK_SERVER_PORT", value))
            .or_else(|| read_env("PORT").map(|value| ("PORT", value)));
        if let Some((key, value)) = port {
            self.server.port = parse_u16(key, &value)?;
        }
        if let Some(value) = read_env("TRIPDESK_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("TRIPDESK_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("TRIPDESK_STORAGE_BACKEND") {
            self.storage.backend = value.parse()?;
        }
        if let Some(value) = read_env("TRIPDESK_STORAGE_BLOB_DIR") {
            self.storage.blob_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("TRIPDESK_STORAGE_INLINE_MAX_BYTES") {
            self.storage.inline_max_bytes =
                parse_usize("TRIPDESK_STORAGE_INLINE_MAX_BYTES", &value)?;
        }
        if let Some(value) = read_env("TRIPDESK_STORAGE_MAX_UPLOAD_BYTES") {
            self.storage.max_upload_bytes =
                parse_usize("TRIPDESK_STORAGE_MAX_UPLOAD_BYTES", &value)?;
        }
        if let Some(value) = read_env("TRIPDESK_STORAGE_PUBLIC_BASE_URL") {
            self.storage.public_base_url = Some(value);
        }

        if let Some(value) = read_env("TRIPDESK_NOTIFICATION_ENABLED") {
            self.notification.enabled = parse_bool("TRIPDESK_NOTIFICATION_ENABLED", &value)?;
        }
        let api_key =
            read_env("TRIPDESK_NOTIFICATION_API_KEY").or_else(|| read_env("RESEND_API_KEY"));
        if let Some(value) = api_key {
            self.notification.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("TRIPDESK_NOTIFICATION_ENDPOINT") {
            self.notification.endpoint = value;
        }
        if let Some(value) = read_env("TRIPDESK_NOTIFICATION_FROM") {
            self.notification.from = value;
        }
        if let Some(value) = read_env("TRIPDESK_NOTIFICATION_RECIPIENTS") {
            self.notification.recipients = split_list(&value);
        }
        if let Some(value) = read_env("TRIPDESK_NOTIFICATION_TIMEOUT_SECS") {
            self.notification.timeout_secs =
                parse_u64("TRIPDESK_NOTIFICATION_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("TRIPDESK_LOGGING_LEVEL").or_else(|| read_env("TRIPDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TRIPDESK_LOGGING_FORMAT").or_else(|| read_env("TRIPDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(store_backend) = overrides.store_backend {
            self.store.backend = store_backend;
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
        if let Some(storage_backend) = overrides.storage_backend {
            self.storage.backend = storage_backend;
        }
        if let Some(storage_blob_dir) = overrides.storage_blob_dir {
            self.storage.blob_dir = storage_blob_dir;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(enabled) = overrides.notification_enabled {
            self.notification.enabled = enabled;
        }
        if let Some(notification_api_key) = overrides.notification_api_key {
            self.notification.api_key = Some(secret_value(notification_api_key));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_storage(&self.storage)?;
        validate_notification(&self.notification)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("tripdesk.toml"), PathBuf::from("config/tripdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage(storage: &StorageConfig) -> Result<(), ConfigError> {
    if storage.max_upload_bytes == 0 {
        return Err(ConfigError::Validation(
            "storage.max_upload_bytes must be greater than zero".to_string(),
        ));
    }

    if storage.inline_max_bytes > storage.max_upload_bytes {
        return Err(ConfigError::Validation(
            "storage.inline_max_bytes must not exceed storage.max_upload_bytes".to_string(),
        ));
    }

    if storage.uses_blob_store() && storage.blob_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "storage.blob_dir is required for blob|auto storage backends".to_string(),
        ));
    }

    if let Some(base_url) = &storage.public_base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "storage.public_base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_notification(notification: &NotificationConfig) -> Result<(), ConfigError> {
    if notification.timeout_secs == 0 || notification.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "notification.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !notification.enabled {
        return Ok(());
    }

    let missing_key = notification
        .api_key
        .as_ref()
        .map(|value| value.expose_secret().trim().is_empty())
        .unwrap_or(true);
    if missing_key {
        return Err(ConfigError::Validation(
            "notification.api_key is required when notification.enabled is true".to_string(),
        ));
    }

    if notification.recipients.is_empty() {
        return Err(ConfigError::Validation(
            "notification.recipients must list at least one address when notifications are enabled"
                .to_string(),
        ));
    }

    let endpoint = notification.endpoint.as_str();
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(ConfigError::Validation(
            "notification.endpoint must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty()).map(str::to_string).collect()
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    store: Option<StorePatch>,
    server: Option<ServerPatch>,
    storage: Option<StoragePatch>,
    notification: Option<NotificationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    backend: Option<StoreBackend>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    backend: Option<QuoteStorageBackend>,
    blob_dir: Option<PathBuf>,
    inline_max_bytes: Option<usize>,
    max_upload_bytes: Option<usize>,
    public_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationPatch {
    enabled: Option<bool>,
    api_key: Option<String>,
    endpoint: Option<String>,
    from: Option<String>,
    recipients: Option<Vec<String>>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, QuoteStorageBackend,
        StoreBackend,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn missing_file() -> Option<PathBuf> {
        Some(PathBuf::from("/nonexistent/tripdesk.toml"))
    }

    #[test]
    fn defaults_load_without_any_configuration() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["PORT", "TRIPDESK_SERVER_PORT", "TRIPDESK_STORAGE_BACKEND"]);

        let config =
            AppConfig::load(LoadOptions { config_path: missing_file(), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.server.port == 4000, "default port should be 4000")?;
        ensure(config.store.backend == StoreBackend::Sqlite, "default store should be sqlite")?;
        ensure(
            config.storage.backend == QuoteStorageBackend::Inline,
            "default quote storage should be inline",
        )?;
        ensure(config.storage.inline_max_bytes == 18 * 1024 * 1024, "inline cap should be 18MB")?;
        ensure(!config.notification.is_active(), "notifications should default to off")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_TRIPDESK_MAIL_KEY", "re_from_env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tripdesk.toml");
            fs::write(
                &path,
                r#"
[notification]
enabled = true
api_key = "${TEST_TRIPDESK_MAIL_KEY}"
recipients = ["travel-desk@example.com"]

[storage]
backend = "auto"
blob_dir = "/var/lib/tripdesk/quotes"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.notification.api_key.as_ref().map(|key| key.expose_secret().to_string())
                    == Some("re_from_env".to_string()),
                "api key should be interpolated from environment",
            )?;
            ensure(config.notification.is_active(), "notification should be active")?;
            ensure(
                config.storage.backend == QuoteStorageBackend::Auto,
                "storage backend should come from file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_TRIPDESK_MAIL_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TRIPDESK_LOG_LEVEL", "warn");
        env::set_var("TRIPDESK_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions {
                config_path: missing_file(),
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["TRIPDESK_LOG_LEVEL", "TRIPDESK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn plain_port_variable_is_honoured() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PORT", "8787");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions {
                config_path: missing_file(),
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;
            ensure(config.server.port == 8787, "PORT should set the listen port")
        })();

        clear_vars(&["PORT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TRIPDESK_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("TRIPDESK_STORE_BACKEND", "memory");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tripdesk.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[store]
backend = "sqlite"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.store.backend == StoreBackend::Memory,
                "env store backend should win over file",
            )?;
            Ok(())
        })();

        clear_vars(&["TRIPDESK_DATABASE_URL", "TRIPDESK_STORE_BACKEND"]);
        result
    }

    #[test]
    fn enabled_notification_without_key_fails_fast() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TRIPDESK_NOTIFICATION_ENABLED", "true");
        env::set_var("TRIPDESK_NOTIFICATION_RECIPIENTS", "desk@example.com");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions {
                config_path: missing_file(),
                ..LoadOptions::default()
            }) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("notification.api_key")
            );
            ensure(has_message, "validation failure should mention notification.api_key")
        })();

        clear_vars(&["TRIPDESK_NOTIFICATION_ENABLED", "TRIPDESK_NOTIFICATION_RECIPIENTS"]);
        result
    }

    #[test]
    fn inline_cap_above_upload_cap_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TRIPDESK_STORAGE_INLINE_MAX_BYTES", "2048");
        env::set_var("TRIPDESK_STORAGE_MAX_UPLOAD_BYTES", "1024");

        let result = (|| -> Result<(), String> {
            let outcome = AppConfig::load(LoadOptions {
                config_path: missing_file(),
                ..LoadOptions::default()
            });
            ensure(
                matches!(outcome, Err(ConfigError::Validation(ref m)) if m.contains("inline_max_bytes")),
                "inline cap larger than upload cap should fail validation",
            )
        })();

        clear_vars(&["TRIPDESK_STORAGE_INLINE_MAX_BYTES", "TRIPDESK_STORAGE_MAX_UPLOAD_BYTES"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RESEND_API_KEY", "re_secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions {
                config_path: missing_file(),
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("re_secret-value"), "debug output should not contain api key")?;
            ensure(
                config.notification.api_key.is_some(),
                "legacy RESEND_API_KEY should populate the api key",
            )?;
            ensure(
                !config.notification.is_active(),
                "a key alone should not switch notifications on",
            )?;
            Ok(())
        })();

        clear_vars(&["RESEND_API_KEY"]);
        result
    }
}
