//! KernelIntrospect for TruckKernel.
//!
//! Volumes and bounding boxes are measured on a tessellation at the kernel's
//! tolerance. Topology counts come from the BREP itself, deduplicated by
//! entity id, or from the source STEP model for imported solids.

use std::collections::HashSet;

use crate::tessellation::{self, Triangle};
use crate::traits::KernelIntrospect;
use crate::truck_kernel::{TruckKernel, TruckSolid};
use crate::types::*;

use truck_modeling::geometry::Surface;
use truck_modeling::topology::Solid;

impl KernelIntrospect for TruckKernel {
    fn list_solids(&self, shape: &Shape) -> Result<Vec<Shape>, KernelError> {
        Ok(Self::body(shape)?
            .solids
            .iter()
            .map(|s| Self::wrap(vec![s.clone()]))
            .collect())
    }

    fn mass_properties(&self, solid: &Shape) -> Result<MassProperties, KernelError> {
        tessellation::mesh_mass_properties(&self.triangles(solid)?)
    }

    fn bounding_box(&self, solid: &Shape) -> Result<BoundingBox, KernelError> {
        tessellation::mesh_bounding_box(&self.triangles(solid)?)
    }

    fn topology_counts(&self, solid: &Shape) -> Result<TopologyCounts, KernelError> {
        let body = Self::body(solid)?;
        Ok(body
            .solids
            .iter()
            .map(solid_topology)
            .fold(TopologyCounts::default(), |acc, t| TopologyCounts {
                faces: acc.faces + t.faces,
                edges: acc.edges + t.edges,
                vertices: acc.vertices + t.vertices,
            }))
    }

    fn face_kinds(&self, solid: &Shape) -> Result<Vec<SurfaceKind>, KernelError> {
        let body = Self::body(solid)?;
        Ok(body.solids.iter().flat_map(solid_face_kinds).collect())
    }
}

impl TruckKernel {
    fn triangles(&self, shape: &Shape) -> Result<Vec<Triangle>, KernelError> {
        let body = Self::body(shape)?;
        let tris: Vec<Triangle> = body
            .solids
            .iter()
            .flat_map(|s| tessellation::solid_triangles(&s.solid, self.tolerance()))
            .collect();
        if tris.is_empty() {
            return Err(KernelError::TessellationFailed {
                reason: "solid produced an empty mesh".to_string(),
            });
        }
        Ok(tris)
    }
}

// ── Shared implementation functions ─────────────────────────────────────

fn solid_topology(s: &TruckSolid) -> TopologyCounts {
    if let Some(source) = &s.source {
        return source.counts;
    }
    brep_topology(&s.solid)
}

fn brep_topology(solid: &Solid) -> TopologyCounts {
    let mut faces = 0;
    let mut edges = HashSet::new();
    let mut vertices = HashSet::new();
    for shell in solid.boundaries().iter() {
        faces += shell.face_iter().count();
        // Each edge appears in two faces
        for edge in shell.edge_iter() {
            edges.insert(edge.id());
        }
        for vertex in shell.vertex_iter() {
            vertices.insert(vertex.id());
        }
    }
    TopologyCounts {
        faces,
        edges: edges.len(),
        vertices: vertices.len(),
    }
}

fn solid_face_kinds(s: &TruckSolid) -> Vec<SurfaceKind> {
    if let Some(source) = &s.source {
        return source.face_kinds.clone();
    }
    s.solid
        .boundaries()
        .iter()
        .flat_map(|shell| shell.face_iter().map(|f| classify_surface(&f.surface())))
        .collect()
}

fn classify_surface(surface: &Surface) -> SurfaceKind {
    match surface {
        Surface::Plane(_) => SurfaceKind::Planar,
        Surface::RevolutedCurve(_) => SurfaceKind::Revolved,
        Surface::BSplineSurface(_) => SurfaceKind::BSpline,
        Surface::NurbsSurface(_) => SurfaceKind::Nurbs,
    }
}
