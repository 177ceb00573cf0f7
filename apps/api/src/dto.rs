use serde::Serialize;
use ts_rs::TS;
use utoipa::ToSchema;

/// Root status payload.
#[derive(Debug, Serialize, TS, ToSchema)]
#[ts(export, export_to = "../../../bindings/status-response.ts")]
pub struct StatusResponse {
    #[schema(value_type = String, example = "healthy")]
    pub status: &'static str,
    #[schema(value_type = String, example = "Healthcare Agent API is running successfully")]
    pub message: &'static str,
    /// RFC 3339 UTC, millisecond precision.
    #[schema(example = "2026-01-15T10:30:00.000Z")]
    pub timestamp: String,
    #[schema(value_type = String, example = "0.1.0")]
    pub version: &'static str,
    #[schema(example = "development")]
    pub environment: String,
}

/// Health response payload.
#[derive(Debug, Serialize, TS, ToSchema)]
#[ts(export, export_to = "../../../bindings/health-response.ts")]
pub struct HealthResponse {
    #[schema(value_type = String, example = "healthy")]
    pub status: &'static str,
    #[schema(example = "2026-01-15T10:30:00.000Z")]
    pub timestamp: String,
}
