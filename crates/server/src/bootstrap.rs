use std::sync::Arc;

use axum::{http::Method, http::StatusCode, Json, Router};
use tera::Tera;
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use tripdesk_core::config::{AppConfig, ConfigError, LoadOptions, StoreBackend};
use tripdesk_core::errors::ApplicationError;
use tripdesk_db::repositories::{
    InMemoryTravelRequestRepository, SqlTravelRequestRepository, TravelRequestRepository,
};
use tripdesk_db::{connect_with_settings, migrations, BlobStore, BlobStoreError, DbPool, FsBlobStore};

use crate::api::{self, ApiErrorBody, ApiState};
use crate::attachments::{QuoteAttachmentService, QuoteStorage};
use crate::dashboard::{self, DashboardState};
use crate::health::{self, HealthState};
use crate::notify::{self, Notifier, NotifyError};
use crate::templates;

pub struct Application {
    pub config: AppConfig,
    /// Present only for the SQLite store.
    pub db_pool: Option<DbPool>,
    pub requests: Arc<dyn TravelRequestRepository>,
    pub blobs: Option<Arc<dyn BlobStore>>,
    pub attachments: Arc<QuoteAttachmentService>,
    pub notifier: Arc<dyn Notifier>,
    pub templates: Arc<Tera>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("blob directory unavailable: {0}")]
    BlobStore(#[source] BlobStoreError),
    #[error("quote storage misconfigured: {0}")]
    Storage(#[source] ApplicationError),
    #[error("notifier setup failed: {0}")]
    Notifier(#[source] NotifyError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        store_backend = ?config.store.backend,
        storage_backend = ?config.storage.backend,
        "starting application bootstrap"
    );

    let (requests, db_pool): (Arc<dyn TravelRequestRepository>, Option<DbPool>) =
        match config.store.backend {
            StoreBackend::Sqlite => {
                let pool = connect_with_settings(
                    &config.database.url,
                    config.database.max_connections,
                    config.database.timeout_secs,
                )
                .await
                .map_err(BootstrapError::DatabaseConnect)?;
                info!(
                    event_name = "system.bootstrap.database_connected",
                    correlation_id = "bootstrap",
                    "database connection established"
                );

                migrations::run_pending(&pool).await.map_err(BootstrapError::Migration)?;
                info!(
                    event_name = "system.bootstrap.migrations_applied",
                    correlation_id = "bootstrap",
                    "database migrations applied"
                );

                (Arc::new(SqlTravelRequestRepository::new(pool.clone())), Some(pool))
            }
            StoreBackend::Memory => {
                info!(
                    event_name = "system.bootstrap.memory_store",
                    correlation_id = "bootstrap",
                    "using in-memory request store; data is lost on restart"
                );
                (Arc::new(InMemoryTravelRequestRepository::default()), None)
            }
        };

    let blobs: Option<Arc<dyn BlobStore>> = if config.storage.uses_blob_store() {
        let store = FsBlobStore::new(&config.storage.blob_dir);
        store.ensure_root().await.map_err(BootstrapError::BlobStore)?;
        Some(Arc::new(store))
    } else {
        None
    };

    let storage =
        QuoteStorage::from_config(&config.storage, blobs.clone()).map_err(BootstrapError::Storage)?;
    let attachments = Arc::new(QuoteAttachmentService::new(
        requests.clone(),
        storage,
        config.storage.max_upload_bytes,
    ));

    let templates = templates::load();
    let notifier = notify::from_config(&config.notification, templates.clone())
        .map_err(BootstrapError::Notifier)?;
    info!(
        event_name = "system.bootstrap.notifier_ready",
        correlation_id = "bootstrap",
        enabled = notifier.is_enabled(),
        "notification channel initialized"
    );

    Ok(Application { config, db_pool, requests, blobs, attachments, notifier, templates })
}

impl Application {
    /// Full HTTP surface: API, health, dashboard, plus CORS, tracing and panic recovery.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
            .allow_headers(Any);

        Router::new()
            .merge(api::router(ApiState {
                requests: self.requests.clone(),
                attachments: self.attachments.clone(),
                blobs: self.blobs.clone(),
                notifier: self.notifier.clone(),
            }))
            .merge(health::router(HealthState::new(self.db_pool.clone())))
            .merge(dashboard::router(DashboardState::new(
                self.requests.clone(),
                self.templates.clone(),
            )))
            .fallback(not_found)
            .layer(CatchPanicLayer::new())
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.db_pool {
            pool.close().await;
        }
    }
}

async fn not_found() -> (StatusCode, Json<ApiErrorBody>) {
    (StatusCode::NOT_FOUND, Json(ApiErrorBody { error: "Not found".to_string() }))
}

#[cfg(test)]
mod tests {
    use tripdesk_core::config::{ConfigOverrides, LoadOptions, QuoteStorageBackend, StoreBackend};

    use crate::bootstrap::bootstrap;

    fn options(overrides: ConfigOverrides) -> LoadOptions {
        LoadOptions {
            config_path: Some("/nonexistent/tripdesk.toml".into()),
            overrides,
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn sqlite_bootstrap_applies_migrations() {
        let app = bootstrap(options(ConfigOverrides {
            database_url: Some("sqlite::memory:".to_string()),
            store_backend: Some(StoreBackend::Sqlite),
            storage_backend: Some(QuoteStorageBackend::Inline),
            ..ConfigOverrides::default()
        }))
        .await
        .expect("bootstrap should succeed");

        let pool = app.db_pool.clone().expect("sqlite store keeps its pool");
        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'travel_requests'",
        )
        .fetch_one(&pool)
        .await
        .expect("query schema");
        assert_eq!(table_count, 1);
        assert!(app.blobs.is_none());
        assert!(!app.notifier.is_enabled());

        app.close().await;
    }

    #[tokio::test]
    async fn blob_storage_creates_its_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blob_dir = dir.path().join("quotes");

        let app = bootstrap(options(ConfigOverrides {
            store_backend: Some(StoreBackend::Memory),
            storage_backend: Some(QuoteStorageBackend::Blob),
            storage_blob_dir: Some(blob_dir.clone()),
            ..ConfigOverrides::default()
        }))
        .await
        .expect("bootstrap should succeed");

        assert!(app.db_pool.is_none());
        assert!(app.blobs.is_some());
        assert!(blob_dir.is_dir());
    }

    #[tokio::test]
    async fn enabled_notifications_without_key_fail_fast() {
        let result = bootstrap(options(ConfigOverrides {
            store_backend: Some(StoreBackend::Memory),
            notification_enabled: Some(true),
            ..ConfigOverrides::default()
        }))
        .await;

        assert!(result.is_err(), "validation should reject enabled notifications without a key");
    }
}
