//! HTTP mapping for [`OpsError`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use clawkeeper_core::OpsError;

/// Handler error rendered as `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError(pub OpsError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            OpsError::Validation(_) => StatusCode::BAD_REQUEST,
            OpsError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            OpsError::Authorization(_) => StatusCode::FORBIDDEN,
            OpsError::NotFound(_) => StatusCode::NOT_FOUND,
            OpsError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OpsError> for ApiError {
    fn from(err: OpsError) -> Self {
        Self(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(OpsError::Upstream(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self.0, "Ops request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        let cases = [
            (OpsError::validation("Missing path parameter"), 400),
            (OpsError::Unauthenticated("Unauthorized".into()), 401),
            (OpsError::authorization("Config path not allowed"), 403),
            (OpsError::not_found("Process x not found"), 404),
            (OpsError::Upstream(anyhow::anyhow!("boom")), 500),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError(err).status_code().as_u16(), code);
        }
    }
}
