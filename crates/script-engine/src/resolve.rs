//! Selection of "the" produced artifact among a script's bindings.

use crate::namespace::{ExecutionNamespace, ScriptValue};
use crate::types::ResolveError;
use crate::workplane::Artifact;

/// Name that always wins when bound.
pub const RESULT_BINDING: &str = "result";

/// Pick the script's product from its namespace.
///
/// 1. A binding named `result`, whatever its type.
/// 2. Otherwise the first Workplane or Shape in declaration order,
///    skipping any value identical to `input`.
/// 3. Otherwise [`ResolveError::NoResultFound`].
pub fn resolve_result(
    namespace: &ExecutionNamespace,
    input: Option<&Artifact>,
) -> Result<ScriptValue, ResolveError> {
    if let Some(value) = namespace.get(RESULT_BINDING) {
        return Ok(value.clone());
    }

    namespace
        .iter()
        .filter_map(|(_, value)| value.as_artifact())
        .find(|candidate| !input.is_some_and(|i| i.same_as(candidate)))
        .map(|artifact| ScriptValue::Artifact(artifact.clone()))
        .ok_or(ResolveError::NoResultFound)
}
