pub mod gear;
pub mod namespace;
pub mod resolve;
pub mod sandbox;
pub mod scope;
pub mod types;
pub mod workplane;

pub use gear::{build_gear, GearParams};
pub use namespace::{ExecutionNamespace, ScriptValue};
pub use resolve::resolve_result;
pub use sandbox::{execute, InputBinding};
pub use scope::{CapabilityScope, ScriptLimits};
pub use types::*;
pub use workplane::{Artifact, Plane, Workplane};
