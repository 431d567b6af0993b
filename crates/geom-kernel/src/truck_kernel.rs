//! Production kernel backed by the truck BREP crates.

use crate::primitives;
use crate::step_entities::EntityIndex;
use crate::tessellation;
use crate::traits::Kernel;
use crate::types::*;

// Import truck types selectively to avoid shadowing std::result::Result
use truck_meshalgo::tessellation::{MeshableShape, MeshedShape};
use truck_modeling::builder;
use truck_modeling::topology::Solid;
use truck_modeling::{Point3, Rad, Vector3};
use truck_stepio::out;
use truck_stepio::r#in::Table;

const KERNEL_NAME: &str = "truck";

/// Tolerance handed to truck-shapeops for boolean operations.
const BOOLEAN_TOLERANCE: f64 = 0.05;

/// Default chord tolerance for tessellation-based queries.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Topology of a solid as it was described in an imported STEP file.
///
/// Imported shells are rebuilt as faceted solids, whose own topology no
/// longer reflects the source model.
#[derive(Debug, Clone)]
pub(crate) struct SourceTopology {
    pub counts: TopologyCounts,
    pub face_kinds: Vec<SurfaceKind>,
}

#[derive(Clone)]
pub(crate) struct TruckSolid {
    pub solid: Solid,
    pub source: Option<SourceTopology>,
}

impl TruckSolid {
    fn native(solid: Solid) -> Self {
        Self {
            solid,
            source: None,
        }
    }
}

/// Shape body: an ordered list of truck solids.
#[derive(Clone, Default)]
pub(crate) struct TruckBody {
    pub solids: Vec<TruckSolid>,
}

/// Real geometry kernel backed by the truck BREP library.
#[derive(Debug, Clone, Copy)]
pub struct TruckKernel {
    tolerance: f64,
}

impl TruckKernel {
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_TOLERANCE)
    }

    /// Kernel whose tessellation-based queries use the given chord tolerance.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub(crate) fn body(shape: &Shape) -> Result<&TruckBody, KernelError> {
        shape.body::<TruckBody>()
    }

    pub(crate) fn wrap(solids: Vec<TruckSolid>) -> Shape {
        Shape::new(KERNEL_NAME, TruckBody { solids })
    }

    fn native(solid: Solid) -> Shape {
        Self::wrap(vec![TruckSolid::native(solid)])
    }

    /// Apply a rigid or similarity map to every solid. Source topology survives.
    fn map_solids<F>(shape: &Shape, f: F) -> Result<Shape, KernelError>
    where
        F: Fn(&Solid) -> Solid,
    {
        let body = Self::body(shape)?;
        Ok(Self::wrap(
            body.solids
                .iter()
                .map(|s| TruckSolid {
                    solid: f(&s.solid),
                    source: s.source.clone(),
                })
                .collect(),
        ))
    }

    fn solids_of(shape: &Shape) -> Result<Vec<Solid>, KernelError> {
        Ok(Self::body(shape)?
            .solids
            .iter()
            .map(|s| s.solid.clone())
            .collect())
    }
}

impl Default for TruckKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel for TruckKernel {
    fn name(&self) -> &'static str {
        KERNEL_NAME
    }

    fn make_box(&self, width: f64, height: f64, depth: f64) -> Result<Shape, KernelError> {
        require_positive("width", width)?;
        require_positive("height", height)?;
        require_positive("depth", depth)?;
        Ok(Self::native(primitives::make_box(width, height, depth)))
    }

    fn make_cylinder(&self, radius: f64, height: f64) -> Result<Shape, KernelError> {
        require_positive("radius", radius)?;
        require_positive("height", height)?;
        Ok(Self::native(primitives::make_cylinder(radius, height)?))
    }

    fn make_sphere(&self, radius: f64) -> Result<Shape, KernelError> {
        require_positive("radius", radius)?;
        Ok(Self::native(primitives::make_sphere(radius)?))
    }

    fn make_prism(&self, outline: &[[f64; 2]], height: f64) -> Result<Shape, KernelError> {
        require_positive("height", height)?;
        Ok(Self::native(primitives::make_prism(outline, height)?))
    }

    fn compound(&self, shapes: &[Shape]) -> Result<Shape, KernelError> {
        let mut solids = Vec::new();
        for shape in shapes {
            solids.extend(Self::body(shape)?.solids.iter().cloned());
        }
        Ok(Self::wrap(solids))
    }

    fn translate(&self, shape: &Shape, offset: [f64; 3]) -> Result<Shape, KernelError> {
        let v = Vector3::new(offset[0], offset[1], offset[2]);
        Self::map_solids(shape, |s| builder::translated(s, v))
    }

    fn rotate(
        &self,
        shape: &Shape,
        axis_origin: [f64; 3],
        axis_direction: [f64; 3],
        degrees: f64,
    ) -> Result<Shape, KernelError> {
        let axis = unit_axis("axis_direction", axis_direction)?;
        let origin = Point3::new(axis_origin[0], axis_origin[1], axis_origin[2]);
        let axis = Vector3::new(axis[0], axis[1], axis[2]);
        let angle = Rad(degrees.to_radians());
        Self::map_solids(shape, |s| builder::rotated(s, origin, axis, angle))
    }

    fn scale(&self, shape: &Shape, factor: f64) -> Result<Shape, KernelError> {
        require_positive("factor", factor)?;
        let origin = Point3::new(0.0, 0.0, 0.0);
        let scalars = Vector3::new(factor, factor, factor);
        Self::map_solids(shape, |s| builder::scaled(s, origin, scalars))
    }

    fn boolean_union(&self, a: &Shape, b: &Shape) -> Result<Shape, KernelError> {
        let mut operands = Self::solids_of(a)?.into_iter().chain(Self::solids_of(b)?);
        let Some(mut acc) = operands.next() else {
            return Ok(Self::wrap(Vec::new()));
        };
        for next in operands {
            acc = truck_shapeops::or(&acc, &next, BOOLEAN_TOLERANCE).ok_or_else(|| {
                KernelError::BooleanFailed {
                    reason: "truck or() returned None".to_string(),
                }
            })?;
        }
        Ok(Self::native(acc))
    }

    fn boolean_subtract(&self, a: &Shape, b: &Shape) -> Result<Shape, KernelError> {
        let tools = Self::solids_of(b)?;
        let mut results = Vec::new();
        for mut acc in Self::solids_of(a)? {
            for tool in &tools {
                // Subtraction = A ∩ ¬B. not() mutates in place.
                let mut inverted = tool.clone();
                inverted.not();
                acc = truck_shapeops::and(&acc, &inverted, BOOLEAN_TOLERANCE).ok_or_else(|| {
                    KernelError::BooleanFailed {
                        reason: "truck and() returned None for subtraction".to_string(),
                    }
                })?;
            }
            results.push(TruckSolid::native(acc));
        }
        Ok(Self::wrap(results))
    }

    fn boolean_intersect(&self, a: &Shape, b: &Shape) -> Result<Shape, KernelError> {
        let others = Self::solids_of(b)?;
        let mut results = Vec::new();
        for solid_a in Self::solids_of(a)? {
            for solid_b in &others {
                let common = truck_shapeops::and(&solid_a, solid_b, BOOLEAN_TOLERANCE)
                    .ok_or_else(|| KernelError::BooleanFailed {
                        reason: "truck and() returned None".to_string(),
                    })?;
                if !common.boundaries().is_empty() {
                    results.push(TruckSolid::native(common));
                }
            }
        }
        Ok(Self::wrap(results))
    }

    fn import_step(&self, text: &str) -> Result<Shape, KernelError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        if !text.trim_start().starts_with("ISO-10303-21;") {
            return Err(KernelError::ImportFailed {
                reason: "not an ISO-10303-21 document".to_string(),
            });
        }
        let table = Table::from_step(text).ok_or_else(|| KernelError::ImportFailed {
            reason: "could not parse ISO-10303-21 data".to_string(),
        })?;

        let entities = EntityIndex::parse(text);

        let mut keys: Vec<u64> = table.shell.keys().copied().collect();
        keys.sort_unstable();

        let mut solids = Vec::with_capacity(keys.len());
        for key in keys {
            let holder = &table.shell[&key];
            let shell =
                table
                    .to_compressed_shell(holder)
                    .map_err(|e| KernelError::ImportFailed {
                        reason: format!("shell #{}: {:?}", key, e),
                    })?;

            let face_kinds = entities
                .face_kinds(key)
                .filter(|kinds| kinds.len() == shell.faces.len())
                .unwrap_or_else(|| vec![SurfaceKind::Other; shell.faces.len()]);
            let source = SourceTopology {
                counts: TopologyCounts {
                    faces: shell.faces.len(),
                    edges: shell.edges.len(),
                    vertices: shell.vertices.len(),
                },
                face_kinds,
            };

            let mesh = shell.robust_triangulation(self.tolerance).to_polygon();
            let tris = tessellation::polygon_triangles(&mesh);
            let solid = tessellation::faceted_solid(&tris, self.tolerance * 1e-3).map_err(|e| {
                KernelError::ImportFailed {
                    reason: format!("shell #{}: {}", key, e),
                }
            })?;

            tracing::debug!(
                shell = key,
                faces = source.counts.faces,
                facets = tris.len(),
                "imported STEP shell"
            );
            solids.push(TruckSolid {
                solid,
                source: Some(source),
            });
        }

        Ok(Self::wrap(solids))
    }

    fn export_step(&self, shape: &Shape) -> Result<String, KernelError> {
        let body = Self::body(shape)?;
        if body.solids.is_empty() {
            return Err(KernelError::ExportFailed {
                reason: "shape has no solids".to_string(),
            });
        }

        // One solid entity per solid; extra shells inside a solid would read as voids.
        let compressed: Vec<_> = body.solids.iter().map(|s| s.solid.compress()).collect();
        let display = out::CompleteStepDisplay::new(
            out::StepModels::from_iter(compressed.iter()),
            out::StepHeaderDescriptor {
                origination_system: "step-forge".to_owned(),
                ..Default::default()
            },
        );
        Ok(display.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::KernelIntrospect;

    #[test]
    fn test_truck_box_volume_and_bbox() {
        let kernel = TruckKernel::new();
        let shape = kernel.make_box(10.0, 20.0, 30.0).unwrap();

        let props = kernel.mass_properties(&shape).unwrap();
        assert!((props.volume - 6000.0).abs() < 1e-6, "got {}", props.volume);
        assert!((props.center_of_mass[1] - 10.0).abs() < 1e-6);

        let ext = kernel.bounding_box(&shape).unwrap().extents();
        assert!((ext[2] - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_truck_translate_keeps_volume() {
        let kernel = TruckKernel::new();
        let shape = kernel.make_box(1.0, 1.0, 1.0).unwrap();
        let moved = kernel.translate(&shape, [5.0, 0.0, 0.0]).unwrap();

        let props = kernel.mass_properties(&moved).unwrap();
        assert!((props.volume - 1.0).abs() < 1e-6);
        assert!((props.center_of_mass[0] - 5.5).abs() < 1e-6);
    }

    #[test]
    fn test_truck_compound_lists_each_solid() {
        let kernel = TruckKernel::new();
        let a = kernel.make_box(1.0, 1.0, 1.0).unwrap();
        let b = kernel
            .translate(&kernel.make_box(1.0, 1.0, 1.0).unwrap(), [3.0, 0.0, 0.0])
            .unwrap();
        let both = kernel.compound(&[a, b]).unwrap();
        assert_eq!(kernel.list_solids(&both).unwrap().len(), 2);
    }

    #[test]
    fn test_truck_export_writes_iso_10303_21() {
        let kernel = TruckKernel::new();
        let shape = kernel.make_box(1.0, 1.0, 1.0).unwrap();
        let step = kernel.export_step(&shape).unwrap();
        assert!(step.starts_with("ISO-10303-21;"));
        assert!(step.contains("CLOSED_SHELL"));
    }

    #[test]
    fn test_truck_import_rejects_garbage() {
        let kernel = TruckKernel::new();
        assert!(kernel.import_step("this is not a step file").is_err());
    }

    #[test]
    fn test_truck_rejects_mock_shapes() {
        let kernel = TruckKernel::new();
        let foreign = Shape::new("mock", ());
        assert!(matches!(
            kernel.scale(&foreign, 2.0),
            Err(KernelError::ForeignShape { found: "mock" })
        ));
    }
}
