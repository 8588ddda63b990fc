use thiserror::Error;

use crate::rules::LockReason;
use crate::types::FieldErrors;

/// Coarse classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    NotFound,
    Permission,
    Server,
    Network,
    Rejected,
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("request failed with HTTP {status}")]
    Status {
        status: u16,
        message: Option<String>,
        errors: FieldErrors,
    },
    #[error("server reported failure: {}", .message.as_deref().unwrap_or("no message"))]
    Unsuccessful {
        message: Option<String>,
        errors: FieldErrors,
    },
    #[error("response is missing `{0}`")]
    MissingField(&'static str),
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Network(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Status { status: 401, .. } => ErrorKind::Auth,
            ApiError::Status { status: 403, .. } => ErrorKind::Permission,
            ApiError::Status { status: 404, .. } => ErrorKind::NotFound,
            ApiError::Status { status, .. } if *status >= 500 => ErrorKind::Server,
            ApiError::Status { .. } | ApiError::Unsuccessful { .. } => ErrorKind::Rejected,
            ApiError::MissingField(_) | ApiError::Decode(_) | ApiError::InvalidUrl(_) => {
                ErrorKind::Malformed
            }
            ApiError::Network(_) => ErrorKind::Network,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }

    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } | ApiError::Unsuccessful { message, .. } => {
                message.as_deref().filter(|message| !message.trim().is_empty())
            }
            _ => None,
        }
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        match self {
            ApiError::Status { errors, .. } | ApiError::Unsuccessful { errors, .. } => errors
                .get(field)
                .and_then(|messages| messages.first())
                .map(String::as_str),
            _ => None,
        }
    }
}

/// Which source wins when a failed request carries both a server message and
/// a status code with a canned message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePriority {
    ServerFirst,
    StatusFirst,
}

/// User-facing wording for one command's failures.
#[derive(Debug, Clone, Copy)]
pub struct FailureMessages {
    pub field: &'static str,
    pub not_found: &'static str,
    pub forbidden: &'static str,
    pub server: &'static str,
    pub network: &'static str,
    pub fallback: &'static str,
    pub priority: MessagePriority,
}

impl FailureMessages {
    fn canned(&self, kind: ErrorKind) -> Option<&'static str> {
        match kind {
            ErrorKind::NotFound => Some(self.not_found),
            ErrorKind::Permission => Some(self.forbidden),
            ErrorKind::Server => Some(self.server),
            ErrorKind::Network => Some(self.network),
            _ => None,
        }
    }

    /// Picks the single message to show for `error`. `None` means the failure
    /// is an expired session, which the auth hook handles on its own.
    pub fn user_message(&self, error: &ApiError) -> Option<String> {
        let kind = error.kind();
        if kind == ErrorKind::Auth {
            return None;
        }

        let server = error.server_message();
        let field = error.field_error(self.field);
        let canned = self.canned(kind);

        let message = match self.priority {
            MessagePriority::ServerFirst => server.or(field).or(canned),
            MessagePriority::StatusFirst => canned.or(server).or(field),
        };
        Some(message.unwrap_or(self.fallback).to_string())
    }
}

/// A command precondition that failed before any request was sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No appointment selected.")]
    NoSelection,
    #[error("Staff assignment is locked for this appointment.")]
    AssignmentLocked(LockReason),
    #[error("No staff available for this time slot.")]
    AvailabilityBlocked,
    #[error("Please select a staff member.")]
    MissingStaff,
    #[error("Invalid staff selection.")]
    MalformedStaffId(String),
    #[error("Appointment is already cancelled.")]
    AlreadyCancelled,
    #[error("Please wait for the current request to finish.")]
    Busy,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: ApiError,
    },
    #[error("session is no longer authorized")]
    Unauthorized,
}

impl CommandError {
    pub fn from_api(error: ApiError, messages: &FailureMessages) -> Self {
        match messages.user_message(&error) {
            Some(message) => CommandError::Failed {
                message,
                source: error,
            },
            None => CommandError::Unauthorized,
        }
    }

    pub fn user_message(&self) -> Option<String> {
        match self {
            CommandError::Validation(err) => Some(err.to_string()),
            CommandError::Failed { message, .. } => Some(message.clone()),
            CommandError::Unauthorized => None,
        }
    }
}
