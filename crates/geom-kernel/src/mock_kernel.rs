//! Deterministic test double implementing Kernel + KernelIntrospect.
//!
//! Solids are kept as analytic primitives plus an affine placement, so volumes,
//! centers of mass and topology counts are exact and predictable. Booleans do
//! not compute geometry: union concatenates solids, subtract and intersect
//! return the first operand's solids unchanged.
//!
//! STEP documents written here carry one `MOCK_SOLID` entity per solid inside a
//! regular ISO-10303-21 envelope and can only be read back by this kernel.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::traits::{Kernel, KernelIntrospect};
use crate::types::*;

const KERNEL_NAME: &str = "mock";
const SOLID_ENTITY: &str = "MOCK_SOLID";

/// Primitive solid in local coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Primitive {
    Box {
        width: f64,
        height: f64,
        depth: f64,
    },
    Cylinder {
        radius: f64,
        height: f64,
    },
    Sphere {
        radius: f64,
    },
    Prism {
        outline: Vec<[f64; 2]>,
        height: f64,
    },
}

impl Primitive {
    fn volume(&self) -> f64 {
        match self {
            Primitive::Box {
                width,
                height,
                depth,
            } => width * height * depth,
            Primitive::Cylinder { radius, height } => PI * radius * radius * height,
            Primitive::Sphere { radius } => 4.0 / 3.0 * PI * radius.powi(3),
            Primitive::Prism { outline, height } => shoelace_area(outline).abs() * height,
        }
    }

    fn local_center(&self) -> [f64; 3] {
        match self {
            Primitive::Box {
                width,
                height,
                depth,
            } => [width / 2.0, height / 2.0, depth / 2.0],
            Primitive::Cylinder { height, .. } => [0.0, 0.0, height / 2.0],
            Primitive::Sphere { .. } => [0.0, 0.0, 0.0],
            Primitive::Prism { outline, height } => {
                let (cx, cy) = polygon_centroid(outline);
                [cx, cy, height / 2.0]
            }
        }
    }

    fn local_bounds(&self) -> ([f64; 3], [f64; 3]) {
        match self {
            Primitive::Box {
                width,
                height,
                depth,
            } => ([0.0, 0.0, 0.0], [*width, *height, *depth]),
            Primitive::Cylinder { radius, height } => {
                ([-radius, -radius, 0.0], [*radius, *radius, *height])
            }
            Primitive::Sphere { radius } => ([-radius, -radius, -radius], [*radius, *radius, *radius]),
            Primitive::Prism { outline, height } => {
                let mut min = [f64::MAX, f64::MAX, 0.0];
                let mut max = [f64::MIN, f64::MIN, *height];
                for p in outline {
                    min[0] = min[0].min(p[0]);
                    min[1] = min[1].min(p[1]);
                    max[0] = max[0].max(p[0]);
                    max[1] = max[1].max(p[1]);
                }
                (min, max)
            }
        }
    }

    fn topology(&self) -> TopologyCounts {
        match self {
            Primitive::Box { .. } => TopologyCounts {
                faces: 6,
                edges: 12,
                vertices: 8,
            },
            // Two caps, one lateral face closed by a seam edge.
            Primitive::Cylinder { .. } => TopologyCounts {
                faces: 3,
                edges: 3,
                vertices: 2,
            },
            // One face, a seam edge and two degenerate pole edges.
            Primitive::Sphere { .. } => TopologyCounts {
                faces: 1,
                edges: 3,
                vertices: 2,
            },
            Primitive::Prism { outline, .. } => {
                let n = outline.len();
                TopologyCounts {
                    faces: n + 2,
                    edges: 3 * n,
                    vertices: 2 * n,
                }
            }
        }
    }

    fn face_kinds(&self) -> Vec<SurfaceKind> {
        match self {
            Primitive::Box { .. } => vec![SurfaceKind::Planar; 6],
            Primitive::Cylinder { .. } => vec![
                SurfaceKind::Cylindrical,
                SurfaceKind::Planar,
                SurfaceKind::Planar,
            ],
            Primitive::Sphere { .. } => vec![SurfaceKind::Spherical],
            Primitive::Prism { outline, .. } => vec![SurfaceKind::Planar; outline.len() + 2],
        }
    }
}

/// Affine placement: `p' = linear * p + offset`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Placement {
    linear: [[f64; 3]; 3],
    offset: [f64; 3],
}

impl Placement {
    fn identity() -> Self {
        Self {
            linear: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            offset: [0.0, 0.0, 0.0],
        }
    }

    fn translation(offset: [f64; 3]) -> Self {
        Self {
            offset,
            ..Self::identity()
        }
    }

    /// Rotation about the axis through `origin` along the unit vector `axis`.
    fn rotation(origin: [f64; 3], axis: [f64; 3], radians: f64) -> Self {
        let (s, c) = radians.sin_cos();
        let t = 1.0 - c;
        let [x, y, z] = axis;
        // Rodrigues' rotation matrix
        let linear = [
            [t * x * x + c, t * x * y - s * z, t * x * z + s * y],
            [t * x * y + s * z, t * y * y + c, t * y * z - s * x],
            [t * x * z - s * y, t * y * z + s * x, t * z * z + c],
        ];
        let rotated_origin = mat_vec(&linear, origin);
        Self {
            linear,
            offset: [
                origin[0] - rotated_origin[0],
                origin[1] - rotated_origin[1],
                origin[2] - rotated_origin[2],
            ],
        }
    }

    fn uniform_scale(factor: f64) -> Self {
        Self {
            linear: [
                [factor, 0.0, 0.0],
                [0.0, factor, 0.0],
                [0.0, 0.0, factor],
            ],
            offset: [0.0, 0.0, 0.0],
        }
    }

    fn apply(&self, p: [f64; 3]) -> [f64; 3] {
        let v = mat_vec(&self.linear, p);
        [
            v[0] + self.offset[0],
            v[1] + self.offset[1],
            v[2] + self.offset[2],
        ]
    }

    /// Placement equivalent to applying `self` first, then `next`.
    fn then(&self, next: &Placement) -> Placement {
        let mut linear = [[0.0; 3]; 3];
        for (i, row) in linear.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| next.linear[i][k] * self.linear[k][j]).sum();
            }
        }
        Placement {
            linear,
            offset: next.apply(self.offset),
        }
    }

    fn determinant(&self) -> f64 {
        let m = &self.linear;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }
}

fn mat_vec(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// A primitive placed in world coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MockSolid {
    primitive: Primitive,
    placement: Placement,
}

impl MockSolid {
    fn new(primitive: Primitive) -> Self {
        Self {
            primitive,
            placement: Placement::identity(),
        }
    }

    fn placed(&self, next: &Placement) -> Self {
        Self {
            primitive: self.primitive.clone(),
            placement: self.placement.then(next),
        }
    }

    fn volume(&self) -> f64 {
        self.primitive.volume() * self.placement.determinant().abs()
    }

    fn center_of_mass(&self) -> [f64; 3] {
        self.placement.apply(self.primitive.local_center())
    }

    /// World-space box around the placed corners of the local bounds.
    fn bounds(&self) -> Option<BoundingBox> {
        let (min, max) = self.primitive.local_bounds();
        let corners = (0..8).map(|i| {
            self.placement.apply([
                if i & 1 == 0 { min[0] } else { max[0] },
                if i & 2 == 0 { min[1] } else { max[1] },
                if i & 4 == 0 { min[2] } else { max[2] },
            ])
        });
        BoundingBox::from_points(corners)
    }
}

/// Shape body: an ordered list of solids.
#[derive(Debug, Clone, Default)]
struct MockBody {
    solids: Vec<MockSolid>,
}

/// Deterministic test double for the geometry kernel.
/// Implements both Kernel and KernelIntrospect.
#[derive(Debug, Clone, Copy)]
pub struct MockKernel;

impl MockKernel {
    pub fn new() -> Self {
        Self
    }

    fn body(shape: &Shape) -> Result<&MockBody, KernelError> {
        shape.body::<MockBody>()
    }

    fn wrap(solids: Vec<MockSolid>) -> Shape {
        Shape::new(KERNEL_NAME, MockBody { solids })
    }

    fn primitive(primitive: Primitive) -> Shape {
        Self::wrap(vec![MockSolid::new(primitive)])
    }

    fn placed(shape: &Shape, placement: Placement) -> Result<Shape, KernelError> {
        let body = Self::body(shape)?;
        Ok(Self::wrap(
            body.solids.iter().map(|s| s.placed(&placement)).collect(),
        ))
    }
}

impl Default for MockKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel for MockKernel {
    fn name(&self) -> &'static str {
        KERNEL_NAME
    }

    fn make_box(&self, width: f64, height: f64, depth: f64) -> Result<Shape, KernelError> {
        require_positive("width", width)?;
        require_positive("height", height)?;
        require_positive("depth", depth)?;
        Ok(Self::primitive(Primitive::Box {
            width,
            height,
            depth,
        }))
    }

    fn make_cylinder(&self, radius: f64, height: f64) -> Result<Shape, KernelError> {
        require_positive("radius", radius)?;
        require_positive("height", height)?;
        Ok(Self::primitive(Primitive::Cylinder { radius, height }))
    }

    fn make_sphere(&self, radius: f64) -> Result<Shape, KernelError> {
        require_positive("radius", radius)?;
        Ok(Self::primitive(Primitive::Sphere { radius }))
    }

    fn make_prism(&self, outline: &[[f64; 2]], height: f64) -> Result<Shape, KernelError> {
        require_positive("height", height)?;
        if outline.len() < 3 {
            return Err(KernelError::InvalidParameter {
                name: "outline",
                reason: format!("polygon needs at least 3 points, got {}", outline.len()),
            });
        }
        if shoelace_area(outline).abs() < 1e-12 {
            return Err(KernelError::InvalidParameter {
                name: "outline",
                reason: "polygon has zero area".to_string(),
            });
        }
        Ok(Self::primitive(Primitive::Prism {
            outline: outline.to_vec(),
            height,
        }))
    }

    fn compound(&self, shapes: &[Shape]) -> Result<Shape, KernelError> {
        let mut solids = Vec::new();
        for shape in shapes {
            solids.extend(Self::body(shape)?.solids.iter().cloned());
        }
        Ok(Self::wrap(solids))
    }

    fn translate(&self, shape: &Shape, offset: [f64; 3]) -> Result<Shape, KernelError> {
        Self::placed(shape, Placement::translation(offset))
    }

    fn rotate(
        &self,
        shape: &Shape,
        axis_origin: [f64; 3],
        axis_direction: [f64; 3],
        degrees: f64,
    ) -> Result<Shape, KernelError> {
        let axis = unit_axis("axis_direction", axis_direction)?;
        Self::placed(
            shape,
            Placement::rotation(axis_origin, axis, degrees.to_radians()),
        )
    }

    fn scale(&self, shape: &Shape, factor: f64) -> Result<Shape, KernelError> {
        require_positive("factor", factor)?;
        Self::placed(shape, Placement::uniform_scale(factor))
    }

    fn boolean_union(&self, a: &Shape, b: &Shape) -> Result<Shape, KernelError> {
        self.compound(&[a.clone(), b.clone()])
    }

    fn boolean_subtract(&self, a: &Shape, b: &Shape) -> Result<Shape, KernelError> {
        // For mock: validate both operands, return a copy of A
        Self::body(b)?;
        Ok(Self::wrap(Self::body(a)?.solids.clone()))
    }

    fn boolean_intersect(&self, a: &Shape, b: &Shape) -> Result<Shape, KernelError> {
        Self::body(b)?;
        Ok(Self::wrap(Self::body(a)?.solids.clone()))
    }

    fn import_step(&self, text: &str) -> Result<Shape, KernelError> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
        if lines.next() != Some("ISO-10303-21;") || !text.contains("END-ISO-10303-21;") {
            return Err(KernelError::ImportFailed {
                reason: "not an ISO-10303-21 document".to_string(),
            });
        }

        let prefix = format!("={}('", SOLID_ENTITY);
        let mut solids = Vec::new();
        for line in lines {
            let Some(start) = line.find(&prefix) else {
                continue;
            };
            let payload = line[start + prefix.len()..]
                .strip_suffix("');")
                .ok_or_else(|| KernelError::ImportFailed {
                    reason: format!("unterminated {} entity", SOLID_ENTITY),
                })?;
            let solid: MockSolid =
                serde_json::from_str(payload).map_err(|e| KernelError::ImportFailed {
                    reason: format!("malformed {} entity: {}", SOLID_ENTITY, e),
                })?;
            solids.push(solid);
        }
        Ok(Self::wrap(solids))
    }

    fn export_step(&self, shape: &Shape) -> Result<String, KernelError> {
        let body = Self::body(shape)?;
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S");

        let mut out = String::new();
        out.push_str("ISO-10303-21;\nHEADER;\n");
        out.push_str("FILE_DESCRIPTION(('mock kernel solids'),'2;1');\n");
        out.push_str(&format!(
            "FILE_NAME('model.step','{}',(''),(''),'geom-kernel mock','','');\n",
            timestamp
        ));
        out.push_str("FILE_SCHEMA(('GEOM_KERNEL_MOCK'));\nENDSEC;\nDATA;\n");
        for (i, solid) in body.solids.iter().enumerate() {
            let payload = serde_json::to_string(solid).map_err(|e| KernelError::ExportFailed {
                reason: e.to_string(),
            })?;
            out.push_str(&format!("#{}={}('{}');\n", i + 1, SOLID_ENTITY, payload));
        }
        out.push_str("ENDSEC;\nEND-ISO-10303-21;\n");
        Ok(out)
    }
}

impl KernelIntrospect for MockKernel {
    fn list_solids(&self, shape: &Shape) -> Result<Vec<Shape>, KernelError> {
        Ok(Self::body(shape)?
            .solids
            .iter()
            .map(|s| Self::wrap(vec![s.clone()]))
            .collect())
    }

    fn mass_properties(&self, solid: &Shape) -> Result<MassProperties, KernelError> {
        let body = Self::body(solid)?;
        let volume: f64 = body.solids.iter().map(MockSolid::volume).sum();
        let mut center_of_mass = [0.0; 3];
        if volume > 0.0 {
            for s in &body.solids {
                let c = s.center_of_mass();
                let w = s.volume() / volume;
                for i in 0..3 {
                    center_of_mass[i] += c[i] * w;
                }
            }
        }
        Ok(MassProperties {
            volume,
            center_of_mass,
        })
    }

    fn bounding_box(&self, solid: &Shape) -> Result<BoundingBox, KernelError> {
        let body = Self::body(solid)?;
        let corners = body
            .solids
            .iter()
            .filter_map(MockSolid::bounds)
            .flat_map(|b| [b.min, b.max]);
        BoundingBox::from_points(corners).ok_or(KernelError::Other {
            message: "shape has no solids".to_string(),
        })
    }

    fn topology_counts(&self, solid: &Shape) -> Result<TopologyCounts, KernelError> {
        let body = Self::body(solid)?;
        Ok(body
            .solids
            .iter()
            .map(|s| s.primitive.topology())
            .fold(TopologyCounts::default(), |acc, t| TopologyCounts {
                faces: acc.faces + t.faces,
                edges: acc.edges + t.edges,
                vertices: acc.vertices + t.vertices,
            }))
    }

    fn face_kinds(&self, solid: &Shape) -> Result<Vec<SurfaceKind>, KernelError> {
        let body = Self::body(solid)?;
        Ok(body
            .solids
            .iter()
            .flat_map(|s| s.primitive.face_kinds())
            .collect())
    }
}

/// Compute signed area of a 2D polygon using the shoelace formula.
fn shoelace_area(pts: &[[f64; 2]]) -> f64 {
    let n = pts.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += pts[i][0] * pts[j][1];
        area -= pts[j][0] * pts[i][1];
    }
    area / 2.0
}

fn polygon_centroid(pts: &[[f64; 2]]) -> (f64, f64) {
    let area = shoelace_area(pts);
    if area.abs() < 1e-12 {
        return (0.0, 0.0);
    }
    let n = pts.len();
    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        let j = (i + 1) % n;
        let cross = pts[i][0] * pts[j][1] - pts[j][0] * pts[i][1];
        cx += (pts[i][0] + pts[j][0]) * cross;
        cy += (pts[i][1] + pts[j][1]) * cross;
    }
    (cx / (6.0 * area), cy / (6.0 * area))
}
