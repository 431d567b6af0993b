//! Service error kinds and their HTTP rendering.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use file_format::CodecError;
use geom_kernel::AnalysisError;
use script_engine::{GearError, ScriptError};

/// The flow an error came from; prefixes 500-class messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Generate,
    Modify,
    Analyze,
    Gear,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Generate => "error executing script",
            Stage::Modify => "error modifying model",
            Stage::Analyze => "error analyzing model",
            Stage::Gear => "error generating gear",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{message}")]
    MissingInput { message: String },

    #[error("{message}")]
    InvalidInput { message: String },

    #[error("{stage}: {reason}")]
    Import { stage: Stage, reason: String },

    #[error("{stage}: {reason}")]
    ScriptExecution { stage: Stage, reason: String },

    #[error("{stage}: no Workplane or Shape result found in the script's bindings")]
    NoResultFound { stage: Stage },

    #[error("{stage}: {reason}")]
    Export { stage: Stage, reason: String },

    #[error("no solids found in {file_name}")]
    NoSolidsFound { file_name: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl ServiceError {
    pub fn missing(message: impl Into<String>) -> Self {
        ServiceError::MissingInput {
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidInput {
            message: message.into(),
        }
    }

    pub fn script(stage: Stage, err: ScriptError) -> Self {
        ServiceError::ScriptExecution {
            stage,
            reason: err.to_string(),
        }
    }

    /// Map a codec failure; I/O problems are the service's, not the caller's.
    pub fn codec(stage: Stage, err: CodecError) -> Self {
        match err {
            CodecError::Import { .. } => ServiceError::Import {
                stage,
                reason: err.to_string(),
            },
            CodecError::Export { .. } => ServiceError::Export {
                stage,
                reason: err.to_string(),
            },
            CodecError::Io { .. } | CodecError::NotStaged { .. } => ServiceError::Internal {
                reason: err.to_string(),
            },
        }
    }

    pub fn analysis(err: AnalysisError) -> Self {
        match err {
            AnalysisError::NoSolids { file_name } => ServiceError::NoSolidsFound { file_name },
            other => ServiceError::Internal {
                reason: format!("{}: {}", Stage::Analyze, other),
            },
        }
    }

    pub fn gear(err: GearError) -> Self {
        match err {
            GearError::InvalidParameter { .. } => ServiceError::invalid(err.to_string()),
            GearError::Kernel(e) => ServiceError::ScriptExecution {
                stage: Stage::Gear,
                reason: e.to_string(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::MissingInput { .. }
            | ServiceError::InvalidInput { .. }
            | ServiceError::NoResultFound { .. }
            | ServiceError::NoSolidsFound { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Import { .. }
            | ServiceError::ScriptExecution { .. }
            | ServiceError::Export { .. }
            | ServiceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short stable name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::MissingInput { .. } => "missing_input",
            ServiceError::InvalidInput { .. } => "invalid_input",
            ServiceError::Import { .. } => "import",
            ServiceError::ScriptExecution { .. } => "script_execution",
            ServiceError::NoResultFound { .. } => "no_result_found",
            ServiceError::Export { .. } => "export",
            ServiceError::NoSolidsFound { .. } => "no_solids_found",
            ServiceError::Internal { .. } => "internal",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(status = status.as_u16(), kind = self.kind(), error = %self, "request failed");
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
