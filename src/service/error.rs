use thiserror::Error;
use uuid::Uuid;

use crate::error::{FunctionError, HttpError};
use axum::http::StatusCode;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Profile not found for user {0}")]
    ProfileNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::ProfileNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        if status.is_server_error() {
            tracing::error!("{}", error);
        }
        HttpError::new(error.to_string(), status)
    }
}

impl From<ServiceError> for FunctionError {
    fn from(error: ServiceError) -> Self {
        HttpError::from(error).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_http_statuses() {
        let id = Uuid::new_v4();
        assert_eq!(HttpError::from(ServiceError::ProfileNotFound(id)).status, StatusCode::NOT_FOUND);
        assert_eq!(
            HttpError::from(ServiceError::Database(sqlx::Error::PoolTimedOut)).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn function_errors_keep_status() {
        let err = FunctionError::from(ServiceError::ProfileNotFound(Uuid::new_v4()));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
