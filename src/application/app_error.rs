use serde::Serialize;
use thiserror::Error;

/// A single field-level error reported by the billing provider on a 422.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Missing API key/subdomain or similar. Blocks any remote call.
    #[error("Billing configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found")]
    NotFound,

    /// The provider has no such resource (plan, coupon, subscription, invoice).
    #[error("Remote resource not found: {0}")]
    RemoteNotFound(String),

    /// The provider rejected submitted data (bad card, bad coupon, bad quantity).
    #[error("Remote validation failed")]
    RemoteValidation(Vec<FieldError>),

    /// Network failure or 5xx from the provider. Detail is logged server-side;
    /// users get a generic message.
    #[error("Billing system unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convenience for a single field-level validation error.
    pub fn field(field: &str, message: &str) -> Self {
        AppError::RemoteValidation(vec![FieldError::new(field, message)])
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    ConfigError,
    DatabaseError,
    NotFound,
    RemoteNotFound,
    RemoteValidation,
    RemoteUnavailable,
    InvalidInput,
    InvalidCredentials,
    Forbidden,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigError => "CONFIG_ERROR",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::RemoteNotFound => "REMOTE_NOT_FOUND",
            ErrorCode::RemoteValidation => "REMOTE_VALIDATION",
            ErrorCode::RemoteUnavailable => "REMOTE_UNAVAILABLE",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
