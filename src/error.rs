//! Unified error handling for newsdesk use cases.
//!
//! Every use case reports failures as an [`AppError`] carrying a
//! machine-readable [`ErrorCode`] so the UI layer can tell "fix your input"
//! apart from "you are not allowed" and "you are not signed in" without
//! parsing transport-specific error shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::auth::session::SessionError;
use crate::client::{ExecutionError, ExecutionErrorKind};
use crate::storage::StorageError;

/// Error codes for use-case failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Caller errors
    ValidationError,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,

    // Environment errors
    TransportError,
    InternalError,
}

impl ErrorCode {
    /// Process exit code used by the CLI for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCode::ValidationError => 2,
            ErrorCode::Unauthorized => 3,
            ErrorCode::Forbidden => 4,
            ErrorCode::NotFound => 5,
            ErrorCode::Conflict => 6,
            ErrorCode::TransportError => 7,
            ErrorCode::InternalError => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::TransportError => "transport_error",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

/// Field-level validation messages, ordered by field name
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Unified use-case error type
#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fields: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> Option<&FieldErrors> {
        self.fields.as_ref()
    }

    // -------------------------------------------------------------------------
    // Convenience constructors
    // -------------------------------------------------------------------------

    /// No usable session
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Signed in, but the role lacks the capability
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Another session operation holds the in-flight slot
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TransportError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Validation error with per-field details
    pub fn validation(errors: FieldErrors) -> Self {
        let message = if errors.len() == 1 {
            errors
                .values()
                .next()
                .and_then(|v| v.first())
                .cloned()
                .unwrap_or_else(|| "Validation failed".to_string())
        } else {
            format!("Validation failed for {} fields", errors.len())
        };

        Self {
            code: ErrorCode::ValidationError,
            message,
            fields: Some(errors),
        }
    }

    /// Single field validation error
    pub fn validation_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        Self::validation(errors)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {}

// -------------------------------------------------------------------------
// Conversions from leaf error types
// -------------------------------------------------------------------------

impl From<ExecutionError> for AppError {
    fn from(err: ExecutionError) -> Self {
        match err.kind() {
            // Session problems are reported without the transport detail
            ExecutionErrorKind::Authentication => {
                tracing::debug!(error = %err, "Backend rejected credentials");
                AppError::unauthorized("Not authenticated")
            }
            ExecutionErrorKind::Network | ExecutionErrorKind::Response => {
                AppError::transport(err.message().to_string())
            }
            ExecutionErrorKind::GraphQl => {
                let msg = err.message();
                if msg.to_lowercase().contains("not found") {
                    AppError::not_found(msg.to_string())
                } else {
                    AppError::transport(msg.to_string())
                }
            }
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "Storage error");
        AppError::internal("Local session storage failed")
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidCredentials(errors) => AppError::validation(errors),
            SessionError::LoginRejected(messages) => {
                AppError::unauthorized(messages.join("; "))
            }
            SessionError::OperationInProgress => {
                AppError::conflict("Another session operation is in progress")
            }
            SessionError::Transport(e) => AppError::from(e),
            SessionError::Storage(e) => AppError::from(e),
        }
    }
}

// -------------------------------------------------------------------------
// Builder for validation errors
// -------------------------------------------------------------------------

/// Builder for collecting multiple validation errors
#[derive(Debug, Default)]
pub struct ValidationErrorBuilder {
    errors: FieldErrors,
}

impl ValidationErrorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation error for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Record the error of a `validate_*` result, if any
    pub fn check(&mut self, field: &str, result: Result<(), String>) -> &mut Self {
        if let Err(message) = result {
            self.add(field, message);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_fields(self) -> FieldErrors {
        self.errors
    }

    pub fn build(self) -> Option<AppError> {
        if self.errors.is_empty() {
            None
        } else {
            Some(AppError::validation(self.errors))
        }
    }

    /// Return Ok(()) if no errors, or Err(AppError) if there are errors
    pub fn finish(self) -> Result<(), AppError> {
        match self.build() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
