//! HTTP mapping of domain errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use spectra_lib::SpectraError;

/// Handler error; renders as `{"error": message}`
#[derive(Debug)]
pub struct ApiError(pub SpectraError);

impl From<SpectraError> for ApiError {
    fn from(err: SpectraError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            SpectraError::Validation(_) => StatusCode::BAD_REQUEST,
            SpectraError::NotFound(_) => StatusCode::NOT_FOUND,
            SpectraError::Conflict(_) => StatusCode::CONFLICT,
            SpectraError::Upstream(_) => StatusCode::BAD_GATEWAY,
            SpectraError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self.0 {
            SpectraError::Validation(msg)
            | SpectraError::NotFound(msg)
            | SpectraError::Conflict(msg)
            | SpectraError::Upstream(msg) => msg,
            SpectraError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage failure while handling request");
                msg
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let status = |e: SpectraError| ApiError(e).status();
        assert_eq!(status(SpectraError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status(SpectraError::not_found("x")), StatusCode::NOT_FOUND);
        assert_eq!(status(SpectraError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(status(SpectraError::Upstream("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status(SpectraError::Storage("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
