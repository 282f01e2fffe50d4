//! Error taxonomy for document sync.
//!
//! # Invariants
//! - Every variant is terminal for one operation and non-fatal for the
//!   process; nothing here is retried automatically.
//! - `StoreError` values are sticky status: they stay visible until the next
//!   successful read or write clears them.

use crate::interchange::csv::ImportError;
use crate::model::task::TaskId;
use crate::sync::identity::AuthError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error class reported by a document service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorCode {
    PermissionDenied,
    NotFound,
    Unavailable,
    Internal,
}

impl ServiceErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission-denied",
            Self::NotFound => "not-found",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        }
    }
}

/// Failure delivered by a document service callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub code: ServiceErrorCode,
    pub message: String,
}

impl ServiceError {
    pub fn new(code: ServiceErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl Error for ServiceError {}

/// Sticky sync status shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Identity could not be established; sync never starts.
    AuthFailure(AuthError),
    /// The service refused access to the plan document.
    PermissionDenied(ServiceError),
    /// Any other subscribe failure, or an unreadable plan document.
    GenericSync(String),
    /// An import produced zero tasks; the schedule was left untouched.
    ImportParseFailure(ImportError),
    /// A write failed; local state was kept.
    SaveFailure(ServiceError),
}

impl StoreError {
    /// Classifies a subscription failure.
    pub fn from_subscribe(err: ServiceError) -> Self {
        match err.code {
            ServiceErrorCode::PermissionDenied => Self::PermissionDenied(err),
            _ => Self::GenericSync(err.to_string()),
        }
    }

    /// Short status line for the header bar.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::AuthFailure(_) => "Auth failed: check logs",
            Self::PermissionDenied(_) => "Permission denied: check document service rules",
            Self::GenericSync(_) => "Database error: is the document service reachable?",
            Self::ImportParseFailure(_) => {
                "Could not parse CSV. Ensure format is: Resource,Task,Start,End"
            }
            Self::SaveFailure(_) => "Save failed",
        }
    }

    /// Stable metadata code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthFailure(_) => "auth_failure",
            Self::PermissionDenied(_) => "permission_denied",
            Self::GenericSync(_) => "sync_error",
            Self::ImportParseFailure(_) => "import_parse_failure",
            Self::SaveFailure(_) => "save_failure",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthFailure(err) => write!(f, "authentication failed: {err}"),
            Self::PermissionDenied(err) => write!(f, "permission denied: {err}"),
            Self::GenericSync(message) => write!(f, "sync failed: {message}"),
            Self::ImportParseFailure(err) => write!(f, "{err}"),
            Self::SaveFailure(err) => write!(f, "save failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AuthFailure(err) => Some(err),
            Self::PermissionDenied(err) | Self::SaveFailure(err) => Some(err),
            Self::ImportParseFailure(err) => Some(err),
            Self::GenericSync(_) => None,
        }
    }
}

impl From<AuthError> for StoreError {
    fn from(value: AuthError) -> Self {
        Self::AuthFailure(value)
    }
}

impl From<ImportError> for StoreError {
    fn from(value: ImportError) -> Self {
        Self::ImportParseFailure(value)
    }
}

/// Local mutation that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    TaskNotFound(TaskId),
    /// Neither the draft nor the resource filter names a resource.
    EmptyResource,
}

impl Display for MutationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::EmptyResource => write!(f, "task needs a resource"),
        }
    }
}

impl Error for MutationError {}
