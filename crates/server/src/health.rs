use axum::{http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub checked_at: String,
}

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Process liveness only; there is no database or other readiness gate.
pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse { status: "ok", checked_at: Utc::now().to_rfc3339() }))
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, Json};

    use crate::health::health;

    #[tokio::test]
    async fn health_always_reports_ok() {
        let (status, Json(payload)) = health().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ok");
        assert!(!payload.checked_at.is_empty());
    }
}
