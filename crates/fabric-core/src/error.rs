use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The closed set of error codes recognized across every client of the fabric.
///
/// Implementations may extend this only through a clearly namespaced variant
/// (`Other(String)`); the codes below are stable and must never change shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AgentOffline,
    AgentNotFound,
    CapabilityNotFound,
    ToolNotFound,
    AuthDenied,
    AuthExpired,
    AuthInvalid,
    Timeout,
    BadInput,
    UpstreamError,
    InternalError,
    RateLimited,
    DangerousCommand,
    AccessDenied,
    FileNotFound,
    InvalidRegex,
    InvalidExpression,
    ExecutionError,
    ConfigError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::AgentOffline => "AGENT_OFFLINE",
            ErrorCode::AgentNotFound => "AGENT_NOT_FOUND",
            ErrorCode::CapabilityNotFound => "CAPABILITY_NOT_FOUND",
            ErrorCode::ToolNotFound => "TOOL_NOT_FOUND",
            ErrorCode::AuthDenied => "AUTH_DENIED",
            ErrorCode::AuthExpired => "AUTH_EXPIRED",
            ErrorCode::AuthInvalid => "AUTH_INVALID",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::BadInput => "BAD_INPUT",
            ErrorCode::UpstreamError => "UPSTREAM_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::DangerousCommand => "DANGEROUS_COMMAND",
            ErrorCode::AccessDenied => "ACCESS_DENIED",
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::InvalidRegex => "INVALID_REGEX",
            ErrorCode::InvalidExpression => "INVALID_EXPRESSION",
            ErrorCode::ExecutionError => "EXECUTION_ERROR",
            ErrorCode::ConfigError => "CONFIG_ERROR",
        }
    }
}

/// Typed error hierarchy for the fabric gateway.
///
/// Use at module boundaries (dispatch, registries, adapters, messaging);
/// internal/leaf functions keep using `anyhow::Result` — `Internal` allows
/// seamless conversion via `?`.
#[derive(Debug, Error)]
pub enum FabricError {
    #[error("{code}: {message}")]
    Coded {
        code: ErrorCode,
        message: String,
        details: serde_json::Value,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl FabricError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Coded {
            code,
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::Coded {
            code,
            message: message.into(),
            details,
        }
    }

    /// The error code surfaced to clients. Errors that escaped as plain
    /// `anyhow::Error` (a bug in a leaf function, not a deliberate
    /// framework rejection) are reported as `INTERNAL_ERROR`.
    pub fn code(&self) -> ErrorCode {
        match self {
            FabricError::Coded { code, .. } => *code,
            FabricError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn details(&self) -> serde_json::Value {
        match self {
            FabricError::Coded { details, .. } => details.clone(),
            FabricError::Internal(_) => serde_json::Value::Null,
        }
    }
}

pub type FabricResult<T> = std::result::Result<T, FabricError>;

/// The JSON shape returned to a caller on failure:
/// `{"ok": false, "error": {"code", "message", "details"}, "trace": {...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub details: serde_json::Value,
}

impl From<&FabricError> for ErrorBody {
    fn from(err: &FabricError) -> Self {
        ErrorBody {
            code: err.code().as_str(),
            message: err.to_string(),
            details: err.details(),
        }
    }
}
