use axum::Json;
use axum::extract::State;
use chrono::{SecondsFormat, Utc};

use crate::dto::{HealthResponse, StatusResponse};
use crate::state::AppState;

const HEALTHY: &str = "healthy";
const RUNNING_MESSAGE: &str = "Healthcare Agent API is running successfully";

#[utoipa::path(
    get,
    path = "/",
    tag = "status",
    responses(
        (status = 200, description = "Service is running", body = StatusResponse)
    )
)]
pub async fn root_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: HEALTHY,
        message: RUNNING_MESSAGE,
        timestamp: now_timestamp(),
        version: state.version,
        environment: state.environment,
    })
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "status",
    responses(
        (status = 200, description = "Liveness probe", body = HealthResponse)
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HEALTHY,
        timestamp: now_timestamp(),
    })
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use axum::Json;
    use axum::extract::State;
    use chrono::DateTime;

    use super::{health_handler, root_handler};
    use crate::state::AppState;

    #[tokio::test]
    async fn health_reports_healthy_with_iso_timestamp() {
        let Json(response) = health_handler().await;

        assert_eq!(response.status, "healthy");
        assert!(DateTime::parse_from_rfc3339(&response.timestamp).is_ok());
    }

    #[tokio::test]
    async fn root_reports_version_and_environment() {
        let Json(response) = root_handler(State(AppState {
            environment: "staging".to_owned(),
            version: "1.2.3",
        }))
        .await;

        assert_eq!(response.status, "healthy");
        assert_eq!(
            response.message,
            "Healthcare Agent API is running successfully"
        );
        assert_eq!(response.version, "1.2.3");
        assert_eq!(response.environment, "staging");
        assert!(DateTime::parse_from_rfc3339(&response.timestamp).is_ok());
    }
}
