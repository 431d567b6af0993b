use indexmap::IndexMap;
use rhai::Dynamic;

use geom_kernel::Shape;

use crate::workplane::{Artifact, Workplane};

/// A binding's value, tagged by whether it is artifact-shaped.
#[derive(Debug, Clone)]
pub enum ScriptValue {
    Artifact(Artifact),
    Other { type_name: String },
}

impl ScriptValue {
    pub fn from_dynamic(value: Dynamic) -> Self {
        let value = match value.try_cast_result::<Workplane>() {
            Ok(wp) => return ScriptValue::Artifact(Artifact::Workplane(wp)),
            Err(value) => value,
        };
        let value = match value.try_cast_result::<Shape>() {
            Ok(shape) => return ScriptValue::Artifact(Artifact::Shape(shape)),
            Err(value) => value,
        };
        ScriptValue::Other {
            type_name: value.type_name().to_string(),
        }
    }

    pub fn as_artifact(&self) -> Option<&Artifact> {
        match self {
            ScriptValue::Artifact(a) => Some(a),
            ScriptValue::Other { .. } => None,
        }
    }

    pub fn into_artifact(self) -> Option<Artifact> {
        match self {
            ScriptValue::Artifact(a) => Some(a),
            ScriptValue::Other { .. } => None,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            ScriptValue::Artifact(a) => a.type_name(),
            ScriptValue::Other { type_name } => type_name,
        }
    }
}

impl From<Artifact> for ScriptValue {
    fn from(artifact: Artifact) -> Self {
        ScriptValue::Artifact(artifact)
    }
}

/// Bindings left behind by one script run, in first-declaration order.
///
/// Re-binding a name replaces its value but keeps its original position.
#[derive(Debug, Clone, Default)]
pub struct ExecutionNamespace {
    bindings: IndexMap<String, ScriptValue>,
}

impl ExecutionNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: ScriptValue) {
        self.bindings.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ScriptValue> {
        self.bindings.get(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScriptValue)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, ScriptValue)> for ExecutionNamespace {
    fn from_iter<I: IntoIterator<Item = (String, ScriptValue)>>(iter: I) -> Self {
        let mut ns = ExecutionNamespace::new();
        for (name, value) in iter {
            ns.bind(name, value);
        }
        ns
    }
}
