use serde::Serialize;
use tripdesk_core::config::{AppConfig, LoadOptions, StoreBackend};
use tripdesk_db::{connect_with_settings, FsBlobStore};

use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Skipped, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass(
                "config_validation",
                "configuration loaded and validated",
            ));
            checks.push(check_notification_readiness(&config));
            checks.extend(check_async_dependencies(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            for name in ["notification_readiness", "blob_storage", "database_connectivity"] {
                checks.push(DoctorCheck::skipped(
                    name,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    // Skipped checks do not count against readiness.
    let healthy = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if healthy { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if healthy {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_notification_readiness(config: &AppConfig) -> DoctorCheck {
    let notification = &config.notification;
    if !notification.enabled {
        return DoctorCheck::skipped(
            "notification_readiness",
            "email notifications disabled; new requests are not announced",
        );
    }

    if notification.is_active() {
        DoctorCheck::pass(
            "notification_readiness",
            format!(
                "sending via {} to {} recipient(s)",
                notification.endpoint,
                notification.recipients.len()
            ),
        )
    } else {
        DoctorCheck::fail("notification_readiness", "notifications enabled without an API key")
    }
}

fn check_async_dependencies(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            let details = format!("failed to initialize async runtime: {error}");
            return vec![
                DoctorCheck::fail("blob_storage", details.clone()),
                DoctorCheck::fail("database_connectivity", details),
            ];
        }
    };

    runtime.block_on(async {
        vec![check_blob_storage(config).await, check_database_connectivity(config).await]
    })
}

async fn check_blob_storage(config: &AppConfig) -> DoctorCheck {
    if !config.storage.uses_blob_store() {
        return DoctorCheck::skipped(
            "blob_storage",
            "quotes are stored inline; no blob directory needed",
        );
    }

    let store = FsBlobStore::new(&config.storage.blob_dir);
    match store.ensure_root().await {
        Ok(()) => DoctorCheck::pass(
            "blob_storage",
            format!("blob directory `{}` is ready", store.root().display()),
        ),
        Err(error) => DoctorCheck::fail(
            "blob_storage",
            format!("blob directory `{}` unavailable: {error}", store.root().display()),
        ),
    }
}

async fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    if config.store.backend == StoreBackend::Memory {
        return DoctorCheck::skipped(
            "database_connectivity",
            "in-memory request store configured; database not used",
        );
    }

    match connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    {
        Ok(pool) => {
            pool.close().await;
            DoctorCheck::pass(
                "database_connectivity",
                format!("connected using `{}`", config.database.url),
            )
        }
        Err(error) => DoctorCheck::fail(
            "database_connectivity",
            format!("failed to connect to database: {error}"),
        ),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
