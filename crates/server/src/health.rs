use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tripdesk_db::DbPool;

#[derive(Clone, Default)]
pub struct HealthState {
    /// `None` when requests live in memory; there is nothing to probe.
    db_pool: Option<DbPool>,
}

impl HealthState {
    pub fn new(db_pool: Option<DbPool>) -> Self {
        Self { db_pool }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub store: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/api/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let store = match &state.db_pool {
        Some(pool) => database_check(pool).await,
        None => HealthCheck { status: "ready", detail: "in-memory store".to_string() },
    };
    let ok = store.status == "ready";

    let payload = HealthResponse { ok, store, checked_at: Utc::now().to_rfc3339() };
    let status_code = if ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use tripdesk_db::connect_with_settings;

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_is_ok_when_database_is_reachable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");

        let (status, Json(payload)) = health(State(HealthState::new(Some(pool.clone())))).await;

        assert_eq!(status, StatusCode::OK);
        assert!(payload.ok);
        assert_eq!(payload.store.status, "ready");

        pool.close().await;
    }

    #[tokio::test]
    async fn health_is_unavailable_when_database_is_closed() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        pool.close().await;

        let (status, Json(payload)) = health(State(HealthState::new(Some(pool)))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!payload.ok);
        assert_eq!(payload.store.status, "degraded");
    }

    #[tokio::test]
    async fn memory_store_is_always_ready() {
        let (status, Json(payload)) = health(State(HealthState::default())).await;

        assert_eq!(status, StatusCode::OK);
        assert!(payload.ok);
    }
}
