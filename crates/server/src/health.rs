use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use trolley_core::config::CartBackend;
use trolley_db::DbPool;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    backend: CartBackend,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub store: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, backend: CartBackend) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool, backend })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let store = store_check(&state.db_pool).await;
    let ready = store.status == "healthy";

    let payload = HealthResponse {
        status: if ready { "healthy" } else { "unhealthy" },
        database: state.backend.as_str(),
        store,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn store_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "healthy", detail: "store query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "unhealthy", detail: format!("store query failed: {error}") }
        }
    }
}
