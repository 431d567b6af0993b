use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque handle to geometry owned by a kernel implementation.
///
/// Shapes are immutable values. Every kernel operation returns a new Shape,
/// so two handles are [`Shape::same_as`] only when one is a clone of the other.
#[derive(Clone)]
pub struct Shape {
    body: Arc<dyn Any + Send + Sync>,
    kernel: &'static str,
}

impl Shape {
    /// Wrap a kernel-specific body. `kernel` names the producing kernel.
    pub fn new<B: Any + Send + Sync>(kernel: &'static str, body: B) -> Self {
        Self {
            body: Arc::new(body),
            kernel,
        }
    }

    /// Name of the kernel that produced this shape.
    pub fn kernel_name(&self) -> &'static str {
        self.kernel
    }

    /// Borrow the kernel-specific body, failing if another kernel produced it.
    pub fn body<B: Any>(&self) -> Result<&B, KernelError> {
        (*self.body)
            .downcast_ref::<B>()
            .ok_or(KernelError::ForeignShape { found: self.kernel })
    }

    /// Reference identity: true when both handles point at the same body.
    pub fn same_as(&self, other: &Shape) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({}@{:p})", self.kernel, Arc::as_ptr(&self.body))
    }
}

/// Errors from kernel operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("boolean operation failed: {reason}")]
    BooleanFailed { reason: String },

    #[error("tessellation failed: {reason}")]
    TessellationFailed { reason: String },

    #[error("STEP import failed: {reason}")]
    ImportFailed { reason: String },

    #[error("STEP export failed: {reason}")]
    ExportFailed { reason: String },

    #[error("shape was produced by the {found} kernel")]
    ForeignShape { found: &'static str },

    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },

    #[error("kernel error: {message}")]
    Other { message: String },
}

/// Reject non-finite or non-positive dimensions.
pub fn require_positive(name: &'static str, value: f64) -> Result<(), KernelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(KernelError::InvalidParameter {
            name,
            reason: format!("must be a positive finite number, got {}", value),
        })
    }
}

/// Normalize an axis vector, rejecting zero-length or non-finite input.
pub fn unit_axis(name: &'static str, axis: [f64; 3]) -> Result<[f64; 3], KernelError> {
    let len = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
    if !len.is_finite() || len < 1e-12 {
        return Err(KernelError::InvalidParameter {
            name,
            reason: "axis has zero length".to_string(),
        });
    }
    Ok([axis[0] / len, axis[1] / len, axis[2] / len])
}

/// Geometry type of a face, used for the face-type histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    Planar,
    Cylindrical,
    Conical,
    Spherical,
    Toroidal,
    Revolved,
    BSpline,
    Nurbs,
    Other,
}

impl SurfaceKind {
    /// Stable lowercase name used as the histogram key.
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceKind::Planar => "planar",
            SurfaceKind::Cylindrical => "cylindrical",
            SurfaceKind::Conical => "conical",
            SurfaceKind::Spherical => "spherical",
            SurfaceKind::Toroidal => "toroidal",
            SurfaceKind::Revolved => "revolved",
            SurfaceKind::BSpline => "bspline",
            SurfaceKind::Nurbs => "nurbs",
            SurfaceKind::Other => "other",
        }
    }

    /// Classify a surface from its STEP entity name(s).
    ///
    /// Complex instances list every partial record, so rational B-splines
    /// are recognized by their `RATIONAL_B_SPLINE_SURFACE` record.
    pub fn from_step_entity<S: AsRef<str>>(names: &[S]) -> SurfaceKind {
        let has = |name: &str| names.iter().any(|n| n.as_ref().eq_ignore_ascii_case(name));
        if has("RATIONAL_B_SPLINE_SURFACE") {
            return SurfaceKind::Nurbs;
        }
        if [
            "B_SPLINE_SURFACE",
            "B_SPLINE_SURFACE_WITH_KNOTS",
            "BEZIER_SURFACE",
            "UNIFORM_SURFACE",
            "QUASI_UNIFORM_SURFACE",
        ]
        .iter()
        .any(|n| has(n))
        {
            return SurfaceKind::BSpline;
        }
        for name in names {
            let kind = match name.as_ref().to_ascii_uppercase().as_str() {
                "PLANE" => SurfaceKind::Planar,
                "CYLINDRICAL_SURFACE" => SurfaceKind::Cylindrical,
                "CONICAL_SURFACE" => SurfaceKind::Conical,
                "SPHERICAL_SURFACE" => SurfaceKind::Spherical,
                "TOROIDAL_SURFACE" | "DEGENERATE_TOROIDAL_SURFACE" => SurfaceKind::Toroidal,
                "SURFACE_OF_REVOLUTION" => SurfaceKind::Revolved,
                _ => continue,
            };
            return kind;
        }
        SurfaceKind::Other
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Face, edge and vertex counts of one solid. Shared entities are counted once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopologyCounts {
    pub faces: usize,
    pub edges: usize,
    pub vertices: usize,
}

/// Volume and center of mass of one solid, assuming uniform density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassProperties {
    pub volume: f64,
    pub center_of_mass: [f64; 3],
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    /// Smallest box containing every point. Returns `None` for no points.
    pub fn from_points<I: IntoIterator<Item = [f64; 3]>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = BoundingBox {
            min: first,
            max: first,
        };
        for p in iter {
            for i in 0..3 {
                bbox.min[i] = bbox.min[i].min(p[i]);
                bbox.max[i] = bbox.max[i].max(p[i]);
            }
        }
        Some(bbox)
    }

    /// Edge lengths along x, y and z.
    pub fn extents(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}
