use std::sync::Arc;

use geom_kernel::{KernelBundle, TruckKernel};
use script_engine::ScriptLimits;

use crate::config::ServiceConfig;
use crate::pipeline::Pipeline;

/// Shared, read-only state handed to every request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(config: ServiceConfig, kernel: Arc<dyn KernelBundle>) -> Self {
        let limits = ScriptLimits {
            max_operations: config.max_operations,
        };
        let pipeline = Pipeline::new(kernel, limits, config.temp_dir());
        Self {
            pipeline: Arc::new(pipeline),
            config: Arc::new(config),
        }
    }

    /// State backed by the truck kernel at the configured tolerance.
    pub fn with_truck_kernel(config: ServiceConfig) -> Self {
        let kernel = Arc::new(TruckKernel::with_tolerance(config.tolerance));
        Self::new(config, kernel)
    }
}
