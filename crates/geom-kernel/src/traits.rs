use crate::types::*;

/// Core geometry kernel trait. Provides shape construction, transforms,
/// booleans and STEP interchange.
/// Implemented by TruckKernel (wraps real truck) and MockKernel (deterministic test double).
///
/// Kernels are stateless with respect to shapes: every operation takes shapes
/// by reference and returns a new Shape, so one kernel can be shared by
/// concurrent requests.
pub trait Kernel: Send + Sync {
    /// Short identifier recorded on every Shape this kernel produces.
    fn name(&self) -> &'static str;

    /// Axis-aligned box with one corner at the origin, extending to (w, h, d).
    fn make_box(&self, width: f64, height: f64, depth: f64) -> Result<Shape, KernelError>;

    /// Cylinder with its base centered at the origin, extending along +Z.
    fn make_cylinder(&self, radius: f64, height: f64) -> Result<Shape, KernelError>;

    /// Sphere centered at the origin.
    fn make_sphere(&self, radius: f64) -> Result<Shape, KernelError>;

    /// Extrude a closed polygon in the XY plane along +Z.
    fn make_prism(&self, outline: &[[f64; 2]], height: f64) -> Result<Shape, KernelError>;

    /// Collect the solids of several shapes into one shape without fusing them.
    fn compound(&self, shapes: &[Shape]) -> Result<Shape, KernelError>;

    /// Translate a shape by an offset vector.
    fn translate(&self, shape: &Shape, offset: [f64; 3]) -> Result<Shape, KernelError>;

    /// Rotate a shape about the axis through `axis_origin` along `axis_direction`.
    fn rotate(
        &self,
        shape: &Shape,
        axis_origin: [f64; 3],
        axis_direction: [f64; 3],
        degrees: f64,
    ) -> Result<Shape, KernelError>;

    /// Uniformly scale a shape about the origin.
    fn scale(&self, shape: &Shape, factor: f64) -> Result<Shape, KernelError>;

    /// Boolean union of two shapes.
    fn boolean_union(&self, a: &Shape, b: &Shape) -> Result<Shape, KernelError>;

    /// Boolean subtraction: a minus b.
    fn boolean_subtract(&self, a: &Shape, b: &Shape) -> Result<Shape, KernelError>;

    /// Boolean intersection of two shapes.
    fn boolean_intersect(&self, a: &Shape, b: &Shape) -> Result<Shape, KernelError>;

    /// Decode an ISO-10303-21 document into a shape.
    fn import_step(&self, text: &str) -> Result<Shape, KernelError>;

    /// Encode a shape as an ISO-10303-21 document.
    fn export_step(&self, shape: &Shape) -> Result<String, KernelError>;
}

/// Read-only measurement queries on kernel geometry.
pub trait KernelIntrospect: Send + Sync {
    /// Split a shape into its solids, in the shape's native order.
    fn list_solids(&self, shape: &Shape) -> Result<Vec<Shape>, KernelError>;

    /// Volume and center of mass of a single solid.
    fn mass_properties(&self, solid: &Shape) -> Result<MassProperties, KernelError>;

    /// Axis-aligned bounding box of a single solid.
    fn bounding_box(&self, solid: &Shape) -> Result<BoundingBox, KernelError>;

    /// Face, edge and vertex counts of a single solid.
    fn topology_counts(&self, solid: &Shape) -> Result<TopologyCounts, KernelError>;

    /// Surface kind of every face of a single solid.
    fn face_kinds(&self, solid: &Shape) -> Result<Vec<SurfaceKind>, KernelError>;
}

/// Combined trait for callers that need both construction and measurement
/// on the same shared kernel.
pub trait KernelBundle: Kernel + KernelIntrospect {
    fn as_kernel(&self) -> &dyn Kernel;
    fn as_introspect(&self) -> &dyn KernelIntrospect;
}

// Blanket implementation for any type that implements both traits
impl<T: Kernel + KernelIntrospect> KernelBundle for T {
    fn as_kernel(&self) -> &dyn Kernel {
        self
    }

    fn as_introspect(&self) -> &dyn KernelIntrospect {
        self
    }
}
