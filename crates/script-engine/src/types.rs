use geom_kernel::KernelError;

/// Errors from compiling or running a script.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScriptError {
    #[error("syntax error: {message}")]
    Syntax { message: String },

    #[error("runtime error: {message}")]
    Runtime { message: String },

    #[error("operation budget of {limit} exhausted")]
    BudgetExhausted { limit: u64 },
}

/// Errors from selecting the produced artifact in a namespace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no Workplane or Shape value found in the script namespace")]
    NoResultFound,
}

/// Errors from building a parametric part.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GearError {
    #[error("invalid gear parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(transparent)]
    Kernel(#[from] KernelError),
}
