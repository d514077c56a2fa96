use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use toml::Value;
use tripdesk_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in effective_values(&config) {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn effective_values(config: &AppConfig) -> Vec<(&'static str, String, &'static [&'static str])> {
    let api_key = config
        .notification
        .api_key
        .as_ref()
        .map(|key| redact_secret(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    vec![
        ("database.url", config.database.url.clone(), &["TRIPDESK_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["TRIPDESK_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["TRIPDESK_DATABASE_TIMEOUT_SECS"],
        ),
        ("store.backend", format!("{:?}", config.store.backend), &["TRIPDESK_STORE_BACKEND"]),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            &["TRIPDESK_SERVER_BIND_ADDRESS"],
        ),
        ("server.port", config.server.port.to_string(), &["TRIPDESK_SERVER_PORT", "PORT"]),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["TRIPDESK_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        ("storage.backend", format!("{:?}", config.storage.backend), &["TRIPDESK_STORAGE_BACKEND"]),
        (
            "storage.blob_dir",
            config.storage.blob_dir.display().to_string(),
            &["TRIPDESK_STORAGE_BLOB_DIR"],
        ),
        (
            "storage.inline_max_bytes",
            config.storage.inline_max_bytes.to_string(),
            &["TRIPDESK_STORAGE_INLINE_MAX_BYTES"],
        ),
        (
            "storage.max_upload_bytes",
            config.storage.max_upload_bytes.to_string(),
            &["TRIPDESK_STORAGE_MAX_UPLOAD_BYTES"],
        ),
        (
            "storage.public_base_url",
            config.storage.public_base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            &["TRIPDESK_STORAGE_PUBLIC_BASE_URL"],
        ),
        (
            "notification.enabled",
            config.notification.enabled.to_string(),
            &["TRIPDESK_NOTIFICATION_ENABLED"],
        ),
        ("notification.api_key", api_key, &["TRIPDESK_NOTIFICATION_API_KEY", "RESEND_API_KEY"]),
        (
            "notification.endpoint",
            config.notification.endpoint.clone(),
            &["TRIPDESK_NOTIFICATION_ENDPOINT"],
        ),
        ("notification.from", config.notification.from.clone(), &["TRIPDESK_NOTIFICATION_FROM"]),
        (
            "notification.recipients",
            if config.notification.recipients.is_empty() {
                "<none>".to_string()
            } else {
                config.notification.recipients.join(", ")
            },
            &["TRIPDESK_NOTIFICATION_RECIPIENTS"],
        ),
        (
            "notification.timeout_secs",
            config.notification.timeout_secs.to_string(),
            &["TRIPDESK_NOTIFICATION_TIMEOUT_SECS"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["TRIPDESK_LOGGING_LEVEL", "TRIPDESK_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["TRIPDESK_LOGGING_FORMAT", "TRIPDESK_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("tripdesk.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/tripdesk.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a provider prefix such as `re_` and hides the rest.
fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.find(['_', '-']) {
        Some(index) if index + 1 < trimmed.len() => format!("{}***", &trimmed[..=index]),
        _ => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_secret};

    #[test]
    fn secrets_keep_only_their_prefix() {
        assert_eq!(redact_secret("re_123456789"), "re_***");
        assert_eq!(redact_secret("plainsecret"), "<redacted>");
        assert_eq!(redact_secret("   "), "<empty>");
    }

    #[test]
    fn nested_toml_keys_are_found() {
        let doc: toml::Value = "[storage]\nbackend = \"blob\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "storage.backend"));
        assert!(!contains_path(&doc, "storage.blob_dir"));
        assert!(!contains_path(&doc, "notification.enabled"));
    }
}
