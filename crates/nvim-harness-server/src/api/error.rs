use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nvim_harness::{ErrorKind, HarnessError};

/// HTTP status reported for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::UnknownFixtureKey
        | ErrorKind::UnknownModification
        | ErrorKind::UnknownKeyToken
        | ErrorKind::Protocol
        | ErrorKind::Config => StatusCode::BAD_REQUEST,
        ErrorKind::SessionTerminated => StatusCode::CONFLICT,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::ProvisionFailed
        | ErrorKind::LaunchFailed
        | ErrorKind::Io
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// A [`HarnessError`] rendered as `{ kind, code, message, context }`.
#[derive(Debug)]
pub struct ApiError(pub HarnessError);

impl From<HarnessError> for ApiError {
    fn from(err: HarnessError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind);
        if status.is_server_error() {
            tracing::error!(code = self.0.code(), error = %self.0.message, "request failed");
        } else {
            tracing::debug!(code = self.0.code(), error = %self.0.message, "request rejected");
        }
        (status, Json(self.0.to_error_info())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_mistakes_are_bad_requests() {
        for kind in [
            ErrorKind::UnknownFixtureKey,
            ErrorKind::UnknownModification,
            ErrorKind::UnknownKeyToken,
            ErrorKind::Protocol,
        ] {
            assert_eq!(status_for(kind), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn lifecycle_errors_have_distinct_statuses() {
        assert_eq!(status_for(ErrorKind::SessionTerminated), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            status_for(ErrorKind::LaunchFailed),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
