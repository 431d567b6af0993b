//! Artifact analysis: per-solid metrics assembled into a serializable report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::traits::KernelIntrospect;
use crate::types::*;

/// Errors from analysing an artifact.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("no solids found in {file_name}")]
    NoSolids { file_name: String },

    #[error("failed to measure solid {index}: {source}")]
    Measure {
        index: usize,
        #[source]
        source: KernelError,
    },

    #[error(transparent)]
    Kernel(#[from] KernelError),
}

/// Geometric report for one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub file_name: String,
    pub summary: ReportSummary,
    pub solids: Vec<SolidReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_solids: usize,
}

/// Metrics for one solid. `index` starts at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolidReport {
    pub index: usize,
    pub volume: f64,
    pub center_of_mass: CenterOfMass,
    pub bounding_box: Extents,
    pub topology: TopologyCounts,
    /// Face count per surface kind, ordered by kind name.
    pub face_types: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenterOfMass {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extents {
    pub x_length: f64,
    pub y_length: f64,
    pub z_length: f64,
}

/// Walk the solids of `shape` in native order and measure each one.
#[tracing::instrument(skip(kernel, shape))]
pub fn analyze(
    kernel: &dyn KernelIntrospect,
    shape: &Shape,
    file_name: &str,
) -> Result<AnalysisReport, AnalysisError> {
    let solids = kernel.list_solids(shape)?;
    if solids.is_empty() {
        return Err(AnalysisError::NoSolids {
            file_name: file_name.to_string(),
        });
    }

    let mut reports = Vec::with_capacity(solids.len());
    for (i, solid) in solids.iter().enumerate() {
        let index = i + 1;
        let report =
            measure_solid(kernel, solid, index).map_err(|source| AnalysisError::Measure {
                index,
                source,
            })?;
        reports.push(report);
    }

    tracing::debug!(solids = reports.len(), "analysis complete");
    Ok(AnalysisReport {
        file_name: file_name.to_string(),
        summary: ReportSummary {
            total_solids: reports.len(),
        },
        solids: reports,
    })
}

fn measure_solid(
    kernel: &dyn KernelIntrospect,
    solid: &Shape,
    index: usize,
) -> Result<SolidReport, KernelError> {
    let props = kernel.mass_properties(solid)?;
    let [x_length, y_length, z_length] = kernel.bounding_box(solid)?.extents();
    let [x, y, z] = props.center_of_mass;

    Ok(SolidReport {
        index,
        volume: props.volume,
        center_of_mass: CenterOfMass { x, y, z },
        bounding_box: Extents {
            x_length,
            y_length,
            z_length,
        },
        topology: kernel.topology_counts(solid)?,
        face_types: face_histogram(&kernel.face_kinds(solid)?),
    })
}

/// Count faces per surface kind.
pub fn face_histogram(kinds: &[SurfaceKind]) -> BTreeMap<String, usize> {
    let mut histogram = BTreeMap::new();
    for kind in kinds {
        *histogram.entry(kind.as_str().to_string()).or_insert(0) += 1;
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_kernel::MockKernel;
    use crate::traits::Kernel;

    #[test]
    fn test_analyze_single_box() {
        let kernel = MockKernel::new();
        let shape = kernel.make_box(10.0, 10.0, 10.0).unwrap();
        let report = analyze(&kernel, &shape, "cube.step").unwrap();

        assert_eq!(report.file_name, "cube.step");
        assert_eq!(report.summary.total_solids, 1);
        let solid = &report.solids[0];
        assert_eq!(solid.index, 1);
        assert!((solid.volume - 1000.0).abs() < 1e-9);
        assert_eq!(solid.bounding_box.x_length, 10.0);
        assert_eq!(solid.topology.faces, 6);
        assert_eq!(solid.face_types.get("planar"), Some(&6));
    }

    #[test]
    fn test_analyze_indexes_solids_from_one() {
        let kernel = MockKernel::new();
        let parts: Vec<_> = (0..3)
            .map(|i| {
                let b = kernel.make_box(1.0, 1.0, 1.0).unwrap();
                kernel.translate(&b, [i as f64 * 3.0, 0.0, 0.0]).unwrap()
            })
            .collect();
        let shape = kernel.compound(&parts).unwrap();
        let report = analyze(&kernel, &shape, "three.step").unwrap();

        assert_eq!(report.summary.total_solids, 3);
        let indices: Vec<_> = report.solids.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!((report.solids[2].center_of_mass.x - 6.5).abs() < 1e-9);
    }

    #[test]
    fn test_analyze_empty_shape_fails() {
        let kernel = MockKernel::new();
        let empty = kernel.compound(&[]).unwrap();
        let err = analyze(&kernel, &empty, "empty.step").unwrap_err();
        assert!(matches!(err, AnalysisError::NoSolids { .. }));
    }

    #[test]
    fn test_face_histogram_cylinder() {
        let histogram = face_histogram(&[
            SurfaceKind::Cylindrical,
            SurfaceKind::Planar,
            SurfaceKind::Planar,
        ]);
        assert_eq!(histogram.get("planar"), Some(&2));
        assert_eq!(histogram.get("cylindrical"), Some(&1));
        assert_eq!(histogram.len(), 2);
    }

    #[test]
    fn test_report_json_shape() {
        let kernel = MockKernel::new();
        let shape = kernel.make_sphere(1.0).unwrap();
        let report = analyze(&kernel, &shape, "ball.step").unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["summary"]["total_solids"], 1);
        assert_eq!(json["solids"][0]["face_types"]["spherical"], 1);
        assert!(json["solids"][0]["center_of_mass"]["x"].is_number());
        assert!(json["solids"][0]["bounding_box"]["z_length"].is_number());
    }
}
