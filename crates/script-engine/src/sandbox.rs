//! Script execution: run text against the capability scope and capture
//! the bindings it leaves behind.

use rhai::{EvalAltResult, Scope};

use crate::namespace::{ExecutionNamespace, ScriptValue};
use crate::scope::{artifact_to_dynamic, CapabilityScope};
use crate::types::ScriptError;
use crate::workplane::Artifact;

/// Name under which the modify flow exposes the uploaded model.
pub const INPUT_BINDING: &str = "model";

/// An artifact pre-bound into the script's namespace before it runs.
#[derive(Debug, Clone)]
pub struct InputBinding {
    pub name: String,
    pub artifact: Artifact,
}

impl InputBinding {
    pub fn new(name: impl Into<String>, artifact: Artifact) -> Self {
        Self {
            name: name.into(),
            artifact,
        }
    }

    /// Bind under the conventional `model` name.
    pub fn model(artifact: Artifact) -> Self {
        Self::new(INPUT_BINDING, artifact)
    }
}

/// Run `script` with a fresh variable scope, optionally seeded with `input`.
///
/// Returns every top-level binding in declaration order, including the
/// input binding. Errors are returned unchanged in meaning; nothing is
/// swallowed.
#[tracing::instrument(skip_all, fields(script_len = script.len(), input = ?input.map(|i| &i.name)))]
pub fn execute(
    scope: &CapabilityScope,
    script: &str,
    input: Option<&InputBinding>,
) -> Result<ExecutionNamespace, ScriptError> {
    let mut vars = Scope::new();
    if let Some(input) = input {
        vars.push(input.name.clone(), artifact_to_dynamic(&input.artifact));
    }

    scope
        .engine()
        .run_with_scope(&mut vars, script)
        .map_err(|e| classify(*e, scope.limits().max_operations))?;

    let namespace: ExecutionNamespace = vars
        .iter()
        .map(|(name, _, value)| (name.to_string(), ScriptValue::from_dynamic(value)))
        .collect();
    tracing::debug!(bindings = namespace.len(), "script finished");
    Ok(namespace)
}

fn classify(err: EvalAltResult, limit: u64) -> ScriptError {
    match err {
        EvalAltResult::ErrorParsing(..) => ScriptError::Syntax {
            message: err.to_string(),
        },
        EvalAltResult::ErrorTooManyOperations(..) => ScriptError::BudgetExhausted { limit },
        _ => ScriptError::Runtime {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScriptLimits;
    use geom_kernel::{KernelIntrospect, MockKernel};
    use std::sync::Arc;

    fn scope() -> CapabilityScope {
        CapabilityScope::new(Arc::new(MockKernel::new()), ScriptLimits::default())
    }

    #[test]
    fn test_namespace_in_declaration_order() {
        let ns = execute(&scope(), "let b = 1; let a = cq_box(1, 1, 1); let c = \"x\";", None).unwrap();
        let names: Vec<_> = ns.names().collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_redeclaration_keeps_first_slot_with_latest_value() {
        let ns = execute(&scope(), "let a = 1; let b = 2; let a = cq_sphere(1);", None).unwrap();
        let names: Vec<_> = ns.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(ns.get("a").unwrap().as_artifact().is_some());
    }

    #[test]
    fn test_input_is_bound_first() {
        let kernel = MockKernel::new();
        let shape = geom_kernel::Kernel::make_box(&kernel, 1.0, 1.0, 1.0).unwrap();
        let input = InputBinding::model(Artifact::Workplane(
            crate::workplane::Workplane::from_shape(shape),
        ));
        let ns = execute(&scope(), "let moved = model.translate(5, 0, 0);", Some(&input)).unwrap();
        let names: Vec<_> = ns.names().collect();
        assert_eq!(names, vec!["model", "moved"]);
    }

    #[test]
    fn test_runs_do_not_share_bindings() {
        let s = scope();
        execute(&s, "let leaked = 1;", None).unwrap();
        let err = execute(&s, "let x = leaked + 1;", None).unwrap_err();
        assert!(matches!(err, ScriptError::Runtime { .. }), "got {err:?}");
    }

    #[test]
    fn test_syntax_error_is_classified() {
        let err = execute(&scope(), "let a = ;", None).unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { .. }));
    }

    #[test]
    fn test_runtime_error_carries_kernel_message() {
        let err = execute(&scope(), "let a = cq_sphere(-1);", None).unwrap_err();
        match err {
            ScriptError::Runtime { message } => assert!(message.contains("radius"), "{message}"),
            other => panic!("expected runtime error, got {other:?}"),
        }
    }

    #[test]
    fn test_budget_exhaustion() {
        let s = CapabilityScope::new(
            Arc::new(MockKernel::new()),
            ScriptLimits { max_operations: 500 },
        );
        let err = execute(&s, "let i = 0; loop { i += 1; }", None).unwrap_err();
        assert!(matches!(err, ScriptError::BudgetExhausted { limit: 500 }));
    }

    #[test]
    fn test_workplane_values_measure_through_kernel() {
        let s = scope();
        let ns = execute(&s, "let part = cq_box(10, 10, 10);", None).unwrap();
        let artifact = ns.get("part").unwrap().as_artifact().unwrap().clone();
        let shape = artifact.to_shape(s.kernel().as_kernel()).unwrap();
        let volume = s.kernel().mass_properties(&shape).unwrap().volume;
        assert!((volume - 1000.0).abs() < 1e-9);
    }
}
