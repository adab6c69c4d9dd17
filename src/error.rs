use actix_web::{HttpResponse, ResponseError, http::StatusCode};

use crate::api::response::ErrorResponse;
use crate::store::StoreError;
use crate::validation::FieldError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, invalid or expired token, or an unknown/inactive account.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Login failure. Identical for every cause.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("forbidden")]
    Forbidden,

    #[error("validation failed")]
    ValidationFailed(Vec<FieldError>),

    #[error("{entity} with this {field} already exists")]
    UniquenessConflict { entity: &'static str, field: String },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid {0} ID format")]
    MalformedIdentifier(&'static str),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::ValidationFailed(vec![FieldError::new(field, message)])
    }

    /// Re-labels a store conflict with the entity it concerns.
    pub fn for_entity(self, entity: &'static str) -> Self {
        match self {
            Self::UniquenessConflict { field, .. } => Self::UniquenessConflict { entity, field },
            other => other,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::ValidationFailed(_) | Self::MalformedIdentifier(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::UniquenessConflict { .. } => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::Unauthenticated => ErrorResponse::new("Not authorized, token failed"),
            Self::InvalidCredentials => ErrorResponse::new("Invalid credentials"),
            Self::Forbidden => ErrorResponse::new("Access denied: insufficient permissions"),
            Self::ValidationFailed(errors) => {
                ErrorResponse::with_errors("Validation failed", errors.clone())
            }
            Self::UniquenessConflict { entity, field } => {
                let message = format!("{entity} with this {field} already exists");
                let errors = vec![FieldError::new(field, message.clone())];
                ErrorResponse::with_errors(message, errors)
            }
            Self::NotFound(entity) => ErrorResponse::new(format!("{entity} not found")),
            Self::MalformedIdentifier(entity) => {
                ErrorResponse::new(format!("Invalid {} ID format", entity.to_lowercase()))
            }
            Self::BadRequest(msg) => ErrorResponse::new(msg.clone()),
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                ErrorResponse::new("Something went wrong, contact the system administrator")
            }
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { field } => Self::UniquenessConflict {
                entity: "Record",
                field,
            },
            other => Self::Internal(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_taxonomy() {
        assert_eq!(ApiError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::MalformedIdentifier("Employee").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("Employee").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::validation("email", "bad").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn store_conflict_keeps_the_field_name() {
        let err = ApiError::from(StoreError::Conflict {
            field: "email".into(),
        })
        .for_entity("Employee");

        match err {
            ApiError::UniquenessConflict { entity, field } => {
                assert_eq!(entity, "Employee");
                assert_eq!(field, "email");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[actix_web::test]
    async fn internal_errors_do_not_leak_details() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused to 10.0.0.5"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("connection refused"));
        assert!(!text.contains("10.0.0.5"));

        let body: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
}
