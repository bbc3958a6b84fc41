use thiserror::Error;
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::AppError;

use crate::models::AppointmentStatus;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Appointment {0} not found")]
    NotFound(Uuid),

    #[error("Cannot transition appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment was modified concurrently (expected version {expected}, found {actual})")]
    Conflict { expected: u64, actual: u64 },

    #[error("Could not issue a unique meeting reference after {attempts} attempts")]
    Generation { attempts: u32 },

    #[error("Meeting reference is already held by another scheduled appointment")]
    MeetingReferenceTaken,

    #[error("Not permitted: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<DatabaseError> for AppointmentError {
    fn from(err: DatabaseError) -> Self {
        AppointmentError::Storage(err.to_string())
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        let message = err.to_string();
        match err {
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::NotFound(_) => AppError::NotFound(message),
            AppointmentError::InvalidTransition { .. } => AppError::Unprocessable(message),
            AppointmentError::Conflict { .. } => {
                AppError::Conflict(format!("{}; refresh and retry", message))
            }
            AppointmentError::Generation { .. } => AppError::Unavailable(message),
            AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
            AppointmentError::MeetingReferenceTaken | AppointmentError::Storage(_) => {
                AppError::Database(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn maps_each_kind_to_a_distinct_status() {
        let cases = vec![
            (AppointmentError::Validation("bad date".into()), StatusCode::BAD_REQUEST),
            (AppointmentError::NotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (
                AppointmentError::InvalidTransition {
                    from: AppointmentStatus::Pending,
                    to: AppointmentStatus::Completed,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AppointmentError::Conflict { expected: 1, actual: 2 }, StatusCode::CONFLICT),
            (AppointmentError::Generation { attempts: 5 }, StatusCode::SERVICE_UNAVAILABLE),
            (AppointmentError::Forbidden("nope".into()), StatusCode::FORBIDDEN),
            (AppointmentError::Storage("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err.clone()).status_code(), expected, "{:?}", err);
        }
    }
}
