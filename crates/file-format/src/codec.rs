//! Moves artifacts between the kernel and STEP files on disk.

use std::fs;
use std::path::Path;

use geom_kernel::{Kernel, Shape};

use crate::errors::CodecError;

/// STEP reader/writer bound to a geometry kernel.
#[derive(Clone, Copy)]
pub struct ArtifactCodec<'k> {
    kernel: &'k dyn Kernel,
}

impl<'k> ArtifactCodec<'k> {
    pub fn new(kernel: &'k dyn Kernel) -> Self {
        Self { kernel }
    }

    /// Read a STEP file into a shape.
    ///
    /// Non-UTF-8 content is rejected as an import failure, the same as a
    /// malformed STEP body.
    pub fn import(&self, path: &Path) -> Result<Shape, CodecError> {
        let bytes = fs::read(path).map_err(|e| CodecError::io("read", path, e))?;
        let text = String::from_utf8(bytes).map_err(|_| CodecError::Import {
            reason: "file is not valid STEP text".to_string(),
        })?;
        // A leading byte order mark is not part of the STEP header.
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
        let shape = self.kernel.import_step(text).map_err(CodecError::import)?;
        tracing::debug!(path = %path.display(), kernel = self.kernel.name(), "imported STEP file");
        Ok(shape)
    }

    /// Write `shape` as STEP to `path`, returning the number of bytes written.
    pub fn export(&self, shape: &Shape, path: &Path) -> Result<u64, CodecError> {
        let text = self.kernel.export_step(shape).map_err(CodecError::export)?;
        fs::write(path, text.as_bytes()).map_err(|e| CodecError::io("write", path, e))?;
        Ok(text.len() as u64)
    }
}

impl std::fmt::Debug for ArtifactCodec<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCodec")
            .field("kernel", &self.kernel.name())
            .finish()
    }
}
