//! The composite artifact scripts build: an ordered stack of
//! shapes plus the plane new primitives are placed on.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use geom_kernel::{Kernel, KernelBundle, KernelError, Shape};

/// Named working plane. Primitives are built on XY and rotated onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Plane {
    #[default]
    XY,
    YZ,
    XZ,
}

impl Plane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plane::XY => "XY",
            Plane::YZ => "YZ",
            Plane::XZ => "XZ",
        }
    }

    /// Rotate a shape built on XY so its local axes follow this plane.
    ///
    /// YZ: local x → Y, y → Z, z → X. XZ: local y → Z, z → -Y.
    pub fn orient(&self, kernel: &dyn Kernel, shape: Shape) -> Result<Shape, KernelError> {
        match self {
            Plane::XY => Ok(shape),
            Plane::YZ => kernel.rotate(&shape, [0.0; 3], [1.0, 1.0, 1.0], 120.0),
            Plane::XZ => kernel.rotate(&shape, [0.0; 3], [1.0, 0.0, 0.0], 90.0),
        }
    }
}

impl FromStr for Plane {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "XY" => Ok(Plane::XY),
            "YZ" => Ok(Plane::YZ),
            "XZ" => Ok(Plane::XZ),
            other => Err(format!("unknown plane '{}', expected XY, YZ or XZ", other)),
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct WorkplaneInner {
    plane: Plane,
    objects: Vec<Shape>,
}

/// Immutable stack of shapes. Every operation returns a new Workplane;
/// clones share identity (see [`Workplane::same_as`]).
#[derive(Debug, Clone)]
pub struct Workplane {
    inner: Arc<WorkplaneInner>,
}

impl Workplane {
    pub fn new(plane: Plane) -> Self {
        Self::with_objects(plane, Vec::new())
    }

    pub fn with_objects(plane: Plane, objects: Vec<Shape>) -> Self {
        Self {
            inner: Arc::new(WorkplaneInner { plane, objects }),
        }
    }

    /// Workplane holding a single shape, e.g. an imported model.
    pub fn from_shape(shape: Shape) -> Self {
        Self::with_objects(Plane::XY, vec![shape])
    }

    pub fn plane(&self) -> Plane {
        self.inner.plane
    }

    pub fn objects(&self) -> &[Shape] {
        &self.inner.objects
    }

    pub fn size(&self) -> usize {
        self.inner.objects.len()
    }

    pub fn same_as(&self, other: &Workplane) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn derive(&self, objects: Vec<Shape>) -> Self {
        Self::with_objects(self.inner.plane, objects)
    }

    /// All objects merged into one shape without fusing them.
    pub fn combined(&self, kernel: &dyn Kernel) -> Result<Shape, KernelError> {
        match self.inner.objects.as_slice() {
            [single] => Ok(single.clone()),
            objects => kernel.compound(objects),
        }
    }

    /// Place a primitive built centered on XY onto this plane and fuse it
    /// with whatever the stack already holds.
    pub fn place(&self, kernel: &dyn Kernel, primitive: Shape) -> Result<Self, KernelError> {
        let oriented = self.inner.plane.orient(kernel, primitive)?;
        if self.inner.objects.is_empty() {
            return Ok(self.derive(vec![oriented]));
        }
        let fused = kernel.boolean_union(&self.combined(kernel)?, &oriented)?;
        Ok(self.derive(vec![fused]))
    }

    pub fn add_box(&self, kernel: &dyn Kernel, w: f64, h: f64, d: f64) -> Result<Self, KernelError> {
        self.place(kernel, centered_box(kernel, w, h, d)?)
    }

    pub fn add_cylinder(&self, kernel: &dyn Kernel, height: f64, radius: f64) -> Result<Self, KernelError> {
        self.place(kernel, centered_cylinder(kernel, height, radius)?)
    }

    pub fn add_sphere(&self, kernel: &dyn Kernel, radius: f64) -> Result<Self, KernelError> {
        self.place(kernel, kernel.make_sphere(radius)?)
    }

    fn map<F>(&self, f: F) -> Result<Self, KernelError>
    where
        F: Fn(&Shape) -> Result<Shape, KernelError>,
    {
        let objects = self
            .inner
            .objects
            .iter()
            .map(f)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.derive(objects))
    }

    pub fn translate(&self, kernel: &dyn Kernel, offset: [f64; 3]) -> Result<Self, KernelError> {
        self.map(|s| kernel.translate(s, offset))
    }

    /// Rotate about the axis running from `start` to `end`.
    pub fn rotate(
        &self,
        kernel: &dyn Kernel,
        start: [f64; 3],
        end: [f64; 3],
        degrees: f64,
    ) -> Result<Self, KernelError> {
        let direction = [end[0] - start[0], end[1] - start[1], end[2] - start[2]];
        self.map(|s| kernel.rotate(s, start, direction, degrees))
    }

    pub fn scale(&self, kernel: &dyn Kernel, factor: f64) -> Result<Self, KernelError> {
        self.map(|s| kernel.scale(s, factor))
    }

    pub fn union(&self, kernel: &dyn Kernel, other: &Shape) -> Result<Self, KernelError> {
        if self.inner.objects.is_empty() {
            return Ok(self.derive(vec![other.clone()]));
        }
        let fused = kernel.boolean_union(&self.combined(kernel)?, other)?;
        Ok(self.derive(vec![fused]))
    }

    pub fn cut(&self, kernel: &dyn Kernel, other: &Shape) -> Result<Self, KernelError> {
        let cut = kernel.boolean_subtract(&self.combined(kernel)?, other)?;
        Ok(self.derive(vec![cut]))
    }

    pub fn intersect(&self, kernel: &dyn Kernel, other: &Shape) -> Result<Self, KernelError> {
        let common = kernel.boolean_intersect(&self.combined(kernel)?, other)?;
        Ok(self.derive(vec![common]))
    }

    /// Append shapes to the stack without fusing.
    pub fn add(&self, shapes: &[Shape]) -> Self {
        let mut objects = self.inner.objects.clone();
        objects.extend_from_slice(shapes);
        self.derive(objects)
    }

    /// Every solid on the stack, in order.
    pub fn solids(&self, kb: &dyn KernelBundle) -> Result<Vec<Shape>, KernelError> {
        let mut solids = Vec::new();
        for object in &self.inner.objects {
            solids.extend(kb.list_solids(object)?);
        }
        Ok(solids)
    }
}

/// Box centered on the origin.
pub fn centered_box(kernel: &dyn Kernel, w: f64, h: f64, d: f64) -> Result<Shape, KernelError> {
    let shape = kernel.make_box(w, h, d)?;
    kernel.translate(&shape, [-w / 2.0, -h / 2.0, -d / 2.0])
}

/// Cylinder along Z, centered on the origin.
pub fn centered_cylinder(kernel: &dyn Kernel, height: f64, radius: f64) -> Result<Shape, KernelError> {
    let shape = kernel.make_cylinder(radius, height)?;
    kernel.translate(&shape, [0.0, 0.0, -height / 2.0])
}

/// A value scripts can hand back as their product.
#[derive(Debug, Clone)]
pub enum Artifact {
    Workplane(Workplane),
    Shape(Shape),
}

impl Artifact {
    /// Reference identity; a Workplane never matches a Shape.
    pub fn same_as(&self, other: &Artifact) -> bool {
        match (self, other) {
            (Artifact::Workplane(a), Artifact::Workplane(b)) => a.same_as(b),
            (Artifact::Shape(a), Artifact::Shape(b)) => a.same_as(b),
            _ => false,
        }
    }

    /// Collapse into a single kernel shape for export.
    pub fn to_shape(&self, kernel: &dyn Kernel) -> Result<Shape, KernelError> {
        match self {
            Artifact::Workplane(wp) => wp.combined(kernel),
            Artifact::Shape(shape) => Ok(shape.clone()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Artifact::Workplane(_) => "Workplane",
            Artifact::Shape(_) => "Shape",
        }
    }
}
