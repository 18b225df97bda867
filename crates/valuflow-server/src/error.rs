//! HTTP error mapping.
//!
//! Every workflow error surfaces to the client as a structured JSON body
//! `{"error": <code>, "message": <text>}` with the matching status code.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

use valuflow::WorkflowError;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
        }
    }
}

/// Wrapper mapping workflow errors onto HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub WorkflowError);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self.0 {
            WorkflowError::NotFound(_) => "not_found",
            WorkflowError::ValidationFailed(_) => "validation_failed",
            WorkflowError::Forbidden { .. } => "forbidden",
            WorkflowError::IllegalTransition { .. } => "illegal_transition",
            WorkflowError::Conflict { .. } => "conflict",
            WorkflowError::Database(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkflowError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            WorkflowError::Forbidden { .. } => StatusCode::FORBIDDEN,
            WorkflowError::IllegalTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::Conflict { .. } => StatusCode::CONFLICT,
            WorkflowError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let WorkflowError::Database(ref e) = self.0 {
            log::error!("Storage error serving request: {}", e);
            // Do not leak storage details to clients.
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::new("internal_error", "Internal server error"));
        }
        HttpResponse::build(self.status_code())
            .json(ErrorResponse::new(self.code(), self.0.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valuflow::{JobStatus, Role};

    #[test]
    fn test_status_codes() {
        let cases = [
            (WorkflowError::NotFound("Job x".into()), 404),
            (WorkflowError::ValidationFailed("no".into()), 400),
            (
                WorkflowError::Forbidden {
                    role: Role::FieldTeam,
                    status: JobStatus::PendingQa,
                },
                403,
            ),
            (
                WorkflowError::IllegalTransition {
                    from: JobStatus::Complete,
                    to: JobStatus::PendingQa,
                },
                422,
            ),
            (
                WorkflowError::Conflict {
                    expected: 1,
                    actual: 2,
                },
                409,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status_code().as_u16(), expected);
        }
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError(WorkflowError::NotFound("x".into())).code(), "not_found");
        assert_eq!(
            ApiError(WorkflowError::Conflict {
                expected: 1,
                actual: 2
            })
            .code(),
            "conflict"
        );
    }
}
