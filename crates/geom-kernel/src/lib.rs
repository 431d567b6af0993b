pub mod analysis;
pub mod mock_kernel;
pub mod primitives;
mod step_entities;
pub mod tessellation;
pub mod traits;
pub mod truck_introspect;
pub mod truck_kernel;
pub mod types;

pub use analysis::{analyze, AnalysisError, AnalysisReport, SolidReport};
pub use mock_kernel::MockKernel;
pub use traits::*;
pub use truck_kernel::TruckKernel;
pub use types::*;
