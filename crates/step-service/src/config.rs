use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;
pub const DEFAULT_LOG_FILTER: &str = "step_service=info,script_engine=info,tower_http=info";

/// Runtime configuration, read from flags or `STEP_FORGE_*` environment variables.
#[derive(Debug, Clone, Parser)]
#[command(name = "step-service", about = "Script-driven STEP model service", long_about = None)]
pub struct ServiceConfig {
    /// Address to listen on.
    #[arg(long, env = "STEP_FORGE_BIND", default_value = DEFAULT_BIND)]
    pub bind: String,

    /// Directory for per-request STEP files. Defaults to the system temp dir.
    #[arg(long, env = "STEP_FORGE_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Tessellation tolerance for the geometry kernel, in model units.
    #[arg(long, env = "STEP_FORGE_TOLERANCE", default_value_t = geom_kernel::truck_kernel::DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// Operation budget per script; 0 disables the limit.
    #[arg(long, env = "STEP_FORGE_MAX_OPERATIONS", default_value_t = 0)]
    pub max_operations: u64,

    /// Largest accepted request body.
    #[arg(long, env = "STEP_FORGE_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// tracing filter directives; `RUST_LOG` takes precedence when set.
    #[arg(long, env = "STEP_FORGE_LOG", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
}

impl ServiceConfig {
    /// Resolved directory for ephemeral files.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            temp_dir: None,
            tolerance: geom_kernel::truck_kernel::DEFAULT_TOLERANCE,
            max_operations: 0,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cli() {
        let parsed = ServiceConfig::parse_from(["step-service"]);
        let default = ServiceConfig::default();
        assert_eq!(parsed.bind, default.bind);
        assert_eq!(parsed.tolerance, default.tolerance);
        assert_eq!(parsed.max_operations, default.max_operations);
        assert_eq!(parsed.max_upload_bytes, default.max_upload_bytes);
    }

    #[test]
    fn test_flags_override_defaults() {
        let parsed = ServiceConfig::parse_from([
            "step-service",
            "--bind",
            "127.0.0.1:9000",
            "--temp-dir",
            "/var/tmp/forge",
            "--max-operations",
            "5000",
        ]);
        assert_eq!(parsed.bind, "127.0.0.1:9000");
        assert_eq!(parsed.temp_dir(), PathBuf::from("/var/tmp/forge"));
        assert_eq!(parsed.max_operations, 5000);
    }

    #[test]
    fn test_temp_dir_falls_back_to_system() {
        assert_eq!(ServiceConfig::default().temp_dir(), std::env::temp_dir());
    }
}
