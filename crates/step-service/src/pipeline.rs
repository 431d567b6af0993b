//! Request orchestrators. Each flow is synchronous and owns an
//! [`EphemeralScope`] for its files, so every exit path cleans up.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use file_format::{ArtifactCodec, EphemeralScope};
use geom_kernel::{AnalysisReport, KernelBundle, Shape};
use script_engine::{
    build_gear, execute, resolve_result, Artifact, CapabilityScope, GearParams, InputBinding,
    ScriptLimits, ScriptValue, Workplane,
};

use crate::error::{ServiceError, Stage};

/// Capability scope plus the directory its requests stage files in.
#[derive(Debug)]
pub struct Pipeline {
    scope: CapabilityScope,
    temp_dir: PathBuf,
}

impl Pipeline {
    pub fn new(kernel: Arc<dyn KernelBundle>, limits: ScriptLimits, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            scope: CapabilityScope::new(kernel, limits),
            temp_dir: temp_dir.into(),
        }
    }

    pub fn kernel(&self) -> &dyn KernelBundle {
        &**self.scope.kernel()
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    fn codec(&self) -> ArtifactCodec<'_> {
        ArtifactCodec::new(self.kernel().as_kernel())
    }

    /// Run `script` and export whatever it resolves to.
    #[tracing::instrument(skip_all, fields(script_len = script.len()))]
    pub fn generate(&self, script: &str) -> Result<Vec<u8>, ServiceError> {
        let stage = Stage::Generate;
        let namespace = execute(&self.scope, script, None).map_err(|e| ServiceError::script(stage, e))?;
        let value = resolve_result(&namespace, None).map_err(|_| ServiceError::NoResultFound { stage })?;

        let mut files = EphemeralScope::new(&self.temp_dir);
        let bytes = self.export(&mut files, stage, value)?;
        tracing::info!(bytes = bytes.len(), "generated model");
        Ok(bytes)
    }

    /// Import `upload`, run `script` with it bound as `model`, export the result.
    #[tracing::instrument(skip_all, fields(upload_len = upload.len(), script_len = script.len()))]
    pub fn modify(&self, upload: &[u8], script: &str) -> Result<Vec<u8>, ServiceError> {
        let stage = Stage::Modify;
        let mut files = EphemeralScope::new(&self.temp_dir);
        let input_path = files
            .stage_input(upload)
            .map_err(|e| ServiceError::codec(stage, e))?
            .to_path_buf();
        let shape = self
            .codec()
            .import(&input_path)
            .map_err(|e| ServiceError::codec(stage, e))?;
        files.release_input();

        let model = Artifact::Workplane(Workplane::from_shape(shape));
        let binding = InputBinding::model(model.clone());
        let namespace =
            execute(&self.scope, script, Some(&binding)).map_err(|e| ServiceError::script(stage, e))?;
        let value =
            resolve_result(&namespace, Some(&model)).map_err(|_| ServiceError::NoResultFound { stage })?;

        let bytes = self.export(&mut files, stage, value)?;
        tracing::info!(bytes = bytes.len(), "modified model");
        Ok(bytes)
    }

    /// Import `upload` and measure every solid in it.
    #[tracing::instrument(skip_all, fields(upload_len = upload.len(), file_name = %file_name))]
    pub fn analyze(&self, upload: &[u8], file_name: &str) -> Result<AnalysisReport, ServiceError> {
        let stage = Stage::Analyze;
        let shape = {
            let mut files = EphemeralScope::new(&self.temp_dir);
            let input_path = files
                .stage_input(upload)
                .map_err(|e| ServiceError::codec(stage, e))?
                .to_path_buf();
            self.codec()
                .import(&input_path)
                .map_err(|e| ServiceError::codec(stage, e))?
        };

        let report = geom_kernel::analyze(self.kernel().as_introspect(), &shape, file_name)
            .map_err(ServiceError::analysis)?;
        tracing::info!(solids = report.summary.total_solids, "analyzed model");
        Ok(report)
    }

    /// Build a spur gear from `params` and export it.
    #[tracing::instrument(skip_all, fields(teeth = params.teeth, module = params.module))]
    pub fn generate_gear(&self, params: &GearParams) -> Result<Vec<u8>, ServiceError> {
        let stage = Stage::Gear;
        let gear = build_gear(self.kernel().as_kernel(), params).map_err(ServiceError::gear)?;

        let mut files = EphemeralScope::new(&self.temp_dir);
        let bytes = self.export(&mut files, stage, Artifact::Workplane(gear).into())?;
        tracing::info!(bytes = bytes.len(), "generated gear");
        Ok(bytes)
    }

    fn export(&self, files: &mut EphemeralScope, stage: Stage, value: ScriptValue) -> Result<Vec<u8>, ServiceError> {
        let shape = self.exportable(stage, value)?;
        let output_path = files
            .allocate_output()
            .map_err(|e| ServiceError::codec(stage, e))?
            .to_path_buf();
        self.codec()
            .export(&shape, &output_path)
            .map_err(|e| ServiceError::codec(stage, e))?;
        files.take_output().map_err(|e| ServiceError::codec(stage, e))
    }

    fn exportable(&self, stage: Stage, value: ScriptValue) -> Result<Shape, ServiceError> {
        let type_name = value.type_name().to_string();
        let artifact = value.into_artifact().ok_or_else(|| ServiceError::Export {
            stage,
            reason: format!("`result` is a {type_name}, not a Workplane or Shape"),
        })?;
        artifact
            .to_shape(self.kernel().as_kernel())
            .map_err(|e| ServiceError::Export {
                stage,
                reason: e.to_string(),
            })
    }
}
