use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use tripdesk_cli::commands::{config, doctor, migrate, seed};

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("TRIPDESK_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_reports_config_failure() {
    with_env(&[("TRIPDESK_STORE_BACKEND", "bogus")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_creates_one_request_per_status() {
    with_env(&[("TRIPDESK_DATABASE_URL", "sqlite::memory:")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("(4 created, 0 already present)"), "{message}");
        for status in ["WAITING_FOR_QUOTE", "PENDING", "APPROVED", "REJECTED"] {
            assert!(message.contains(&format!("[{status}]")), "missing {status} in {message}");
        }
    });
}

#[test]
fn seed_is_idempotent_against_a_file_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("seed.db").display());

    with_env(&[("TRIPDESK_DATABASE_URL", url.as_str())], || {
        let first = parse_payload(&seed::run().output);
        assert_eq!(first["status"], "ok");

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second = parse_payload(&second.output);
        let message = second["message"].as_str().unwrap_or_default();
        assert!(message.contains("(0 created, 4 already present)"), "{message}");
    });
}

#[test]
fn config_redacts_notification_key_and_names_env_sources() {
    with_env(
        &[
            ("TRIPDESK_NOTIFICATION_API_KEY", "re_supersecretvalue"),
            ("TRIPDESK_STORAGE_BACKEND", "auto"),
        ],
        || {
            let output = config::run();

            assert!(output.contains("notification.api_key = re_***"), "{output}");
            assert!(!output.contains("supersecretvalue"));
            assert!(output.contains("storage.backend = Auto (source: env (TRIPDESK_STORAGE_BACKEND))"));
            assert!(output.contains("database.url = sqlite://tripdesk.db?mode=rwc (source: default)"));
        },
    );
}

#[test]
fn doctor_passes_for_memory_store_and_skips_database() {
    with_env(&[("TRIPDESK_STORE_BACKEND", "memory")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "pass");
        let database = check(&report, "database_connectivity");
        assert_eq!(database["status"], "skipped");
        assert_eq!(check(&report, "notification_readiness")["status"], "skipped");
    });
}

#[test]
fn doctor_fails_when_config_is_invalid() {
    with_env(&[("TRIPDESK_LOG_FORMAT", "xml")], || {
        let result = doctor::run(false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
        assert!(result.output.contains("- [fail] config_validation"));
        assert!(result.output.contains("- [skip] database_connectivity"));
    });
}

fn check<'a>(report: &'a Value, name: &str) -> &'a Value {
    report["checks"]
        .as_array()
        .and_then(|checks| checks.iter().find(|check| check["name"] == name))
        .unwrap_or_else(|| panic!("missing check {name}"))
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|poison| poison.into_inner());

    let keys = [
        "TRIPDESK_DATABASE_URL",
        "TRIPDESK_DATABASE_MAX_CONNECTIONS",
        "TRIPDESK_DATABASE_TIMEOUT_SECS",
        "TRIPDESK_STORE_BACKEND",
        "TRIPDESK_SERVER_BIND_ADDRESS",
        "TRIPDESK_SERVER_PORT",
        "PORT",
        "TRIPDESK_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "TRIPDESK_STORAGE_BACKEND",
        "TRIPDESK_STORAGE_BLOB_DIR",
        "TRIPDESK_STORAGE_INLINE_MAX_BYTES",
        "TRIPDESK_STORAGE_MAX_UPLOAD_BYTES",
        "TRIPDESK_STORAGE_PUBLIC_BASE_URL",
        "TRIPDESK_NOTIFICATION_ENABLED",
        "TRIPDESK_NOTIFICATION_API_KEY",
        "RESEND_API_KEY",
        "TRIPDESK_NOTIFICATION_ENDPOINT",
        "TRIPDESK_NOTIFICATION_FROM",
        "TRIPDESK_NOTIFICATION_RECIPIENTS",
        "TRIPDESK_NOTIFICATION_TIMEOUT_SECS",
        "TRIPDESK_LOGGING_LEVEL",
        "TRIPDESK_LOGGING_FORMAT",
        "TRIPDESK_LOG_LEVEL",
        "TRIPDESK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
