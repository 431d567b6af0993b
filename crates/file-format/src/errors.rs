use std::path::PathBuf;

use geom_kernel::KernelError;

/// Errors while staging ephemeral files or moving artifacts through them.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read STEP file: {reason}")]
    Import { reason: String },

    #[error("could not write STEP file: {reason}")]
    Export { reason: String },

    #[error("no {role} file has been staged")]
    NotStaged { role: &'static str },
}

impl CodecError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CodecError::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn import(err: KernelError) -> Self {
        CodecError::Import {
            reason: err.to_string(),
        }
    }

    pub(crate) fn export(err: KernelError) -> Self {
        CodecError::Export {
            reason: err.to_string(),
        }
    }
}
