use crate::db::errors::DbError;
use crate::spend::DenyReason;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// The Farcaster account has no verified Twitter handle
    #[error("No verified Twitter account linked to fid {fid}")]
    NotVerified { fid: i64 },

    /// An upstream API (read, write or directory) failed or timed out
    #[error("Upstream {what} unavailable: {message}")]
    Upstream { what: &'static str, message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Caller-supplied user id does not own the referenced post/thread
    #[error("Not the owner of the referenced resource")]
    Unauthorized,

    /// Spend gate refused the publish
    #[error("Publish denied: {0}")]
    Denied(DenyReason),

    /// Transition attempted from a non-permitted status
    #[error("Cannot {action} a post in status {status}")]
    InvalidState { action: &'static str, status: String },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<crate::clients::ClientError> for Error {
    fn from(err: crate::clients::ClientError) -> Self {
        Error::Upstream {
            what: err.what(),
            message: err.to_string(),
        }
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotVerified { .. } => StatusCode::PRECONDITION_FAILED,
            Error::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Unauthorized => StatusCode::FORBIDDEN,
            Error::Denied(_) => StatusCode::PAYMENT_REQUIRED,
            Error::InvalidState { .. } => StatusCode::CONFLICT,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::NotVerified { .. } => "No verified Twitter account is linked to this Farcaster account".to_string(),
            Error::Upstream { what, .. } => format!("The {what} service is currently unavailable"),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::Unauthorized => "You do not own the referenced post or thread".to_string(),
            Error::Denied(reason) => reason.to_string(),
            Error::InvalidState { action, status } => format!("Cannot {action} a post in status {status}"),
            Error::BadRequest { message } => message.clone(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { .. } => "Resource already exists".to_string(),
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Upstream { .. } => {
                tracing::warn!("Upstream error: {}", self);
            }
            Error::Database(_) | Error::InvalidState { .. } => {
                tracing::warn!("Conflict/constraint error: {}", self);
            }
            Error::Unauthorized | Error::Denied(_) | Error::NotVerified { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        match &self {
            // Denial reasons must survive to the boundary as distinct, machine-readable
            // payloads so the UI can direct the user to top up, grant approval, or wait
            Error::Denied(reason) => {
                let body = DeniedBody {
                    denied: reason.as_code().to_string(),
                    message: reason.to_string(),
                };
                (status, axum::response::Json(body)).into_response()
            }
            _ => (status, self.user_message()).into_response(),
        }
    }
}

/// Wire shape of a spend denial, so clients can branch on the code
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct DeniedBody {
    /// Machine-readable denial code
    #[schema(example = "insufficient_balance")]
    pub denied: String,
    pub message: String,
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
