use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use media_store::StoreError;

/// Failure while serving a blob. Responses never carry a body.
#[derive(Debug)]
pub struct ServeError(pub StoreError);

impl From<StoreError> for ServeError {
    fn from(e: StoreError) -> Self {
        Self(e)
    }
}

impl From<std::io::Error> for ServeError {
    fn from(e: std::io::Error) -> Self {
        Self(StoreError::from(e))
    }
}

impl ServeError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "failed to serve blob");
        }
        status.into_response()
    }
}
