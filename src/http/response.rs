//! Response envelope shared by handlers and synthesized outcomes.
//!
//! # Responsibilities
//! - Wrap successful payloads as `{"response": ...}`
//! - Render alerts as `{"alerts": [{"text": ..., "level": ...}]}`
//! - Provide the fixed responses the dispatcher and middleware synthesize
//!
//! # Design Decisions
//! - Every synthesized outcome uses the alerts envelope, so a disabled route,
//!   an unknown version and a missing resource differ only by status and text

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Text returned when the requested API version is not served.
pub const UNKNOWN_VERSION_TEXT: &str = "The requested api version is not implemented by this server. \
If you are using a newer client with an older server, you will need to use an older client version \
or upgrade your server.";

/// Text returned for routes switched off by configuration.
pub const DISABLED_ROUTE_TEXT: &str = "The requested route is currently disabled.";

pub const NOT_FOUND_TEXT: &str = "Resource not found.";
pub const TIMEOUT_TEXT: &str = "server timed out";
pub const INTERNAL_ERROR_TEXT: &str = "Internal Server Error";

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A single user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub text: String,
    pub level: AlertLevel,
}

/// The `alerts` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alerts {
    pub alerts: Vec<Alert>,
}

impl Alerts {
    pub fn single(level: AlertLevel, text: impl Into<String>) -> Self {
        Self {
            alerts: vec![Alert {
                text: text.into(),
                level,
            }],
        }
    }
}

/// Successful payload wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub response: T,
}

/// `200 OK` with `{"response": payload}`.
pub fn ok<T: Serialize>(payload: T) -> Response {
    (StatusCode::OK, Json(ApiResponse { response: payload })).into_response()
}

/// A response carrying one alert.
pub fn alert(status: StatusCode, level: AlertLevel, text: impl Into<String>) -> Response {
    (status, Json(Alerts::single(level, text))).into_response()
}

/// A response carrying one error-level alert.
pub fn error(status: StatusCode, text: impl Into<String>) -> Response {
    alert(status, AlertLevel::Error, text)
}

pub fn unknown_version() -> Response {
    error(StatusCode::NOT_IMPLEMENTED, UNKNOWN_VERSION_TEXT)
}

pub fn disabled_route() -> Response {
    error(StatusCode::SERVICE_UNAVAILABLE, DISABLED_ROUTE_TEXT)
}

pub fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, NOT_FOUND_TEXT)
}

pub fn timed_out() -> Response {
    error(StatusCode::SERVICE_UNAVAILABLE, TIMEOUT_TEXT)
}

pub fn internal_error() -> Response {
    error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_TEXT)
}
