//! Mesh-based measurement and faceting for truck solids.
//!
//! Volumes and centroids come from the divergence theorem over a closed
//! triangle mesh. Imported STEP shells are rebuilt as faceted BREP solids
//! from the same meshes.

use std::collections::HashMap;

use crate::types::{BoundingBox, KernelError, MassProperties};
use truck_meshalgo::prelude::*;
use truck_meshalgo::tessellation::{MeshableShape, MeshedShape};

type TruckSolid = truck_modeling::Solid;

/// One triangle, counter-clockwise when seen from outside.
pub type Triangle = [[f64; 3]; 3];

/// Flatten a polygon mesh into triangles. Quads and n-gons are fanned.
pub fn polygon_triangles(mesh: &PolygonMesh) -> Vec<Triangle> {
    let positions = mesh.positions();
    let at = |v: &StandardVertex| {
        let p = positions[v.pos];
        [p[0], p[1], p[2]]
    };

    let mut tris = Vec::with_capacity(mesh.tri_faces().len() + 2 * mesh.quad_faces().len());
    for tri in mesh.tri_faces() {
        tris.push([at(&tri[0]), at(&tri[1]), at(&tri[2])]);
    }
    for quad in mesh.quad_faces() {
        tris.push([at(&quad[0]), at(&quad[1]), at(&quad[2])]);
        tris.push([at(&quad[0]), at(&quad[2]), at(&quad[3])]);
    }
    for poly in mesh.other_faces() {
        for i in 1..poly.len().saturating_sub(1) {
            tris.push([at(&poly[0]), at(&poly[i]), at(&poly[i + 1])]);
        }
    }
    tris
}

/// Triangulate a truck solid at the given chord tolerance.
pub fn solid_triangles(solid: &TruckSolid, tolerance: f64) -> Vec<Triangle> {
    let mesh = solid.triangulation(tolerance).to_polygon();
    polygon_triangles(&mesh)
}

/// Volume and center of mass of the region enclosed by a closed mesh.
///
/// Each triangle spans a signed tetrahedron with the origin; the sum of
/// their volumes is the enclosed volume regardless of where the origin lies.
pub fn mesh_mass_properties(tris: &[Triangle]) -> std::result::Result<MassProperties, KernelError> {
    let mut volume = 0.0;
    let mut moment = [0.0; 3];
    for [a, b, c] in tris {
        let v = dot(*a, cross(*b, *c)) / 6.0;
        volume += v;
        for i in 0..3 {
            moment[i] += v * (a[i] + b[i] + c[i]) / 4.0;
        }
    }

    if volume.abs() < 1e-12 {
        return Err(KernelError::TessellationFailed {
            reason: "mesh encloses no volume".to_string(),
        });
    }

    Ok(MassProperties {
        volume: volume.abs(),
        center_of_mass: [moment[0] / volume, moment[1] / volume, moment[2] / volume],
    })
}

/// Axis-aligned box around every mesh vertex.
pub fn mesh_bounding_box(tris: &[Triangle]) -> std::result::Result<BoundingBox, KernelError> {
    BoundingBox::from_points(tris.iter().flatten().copied()).ok_or(
        KernelError::TessellationFailed {
            reason: "mesh has no vertices".to_string(),
        },
    )
}

/// Rebuild a closed triangle mesh as a faceted truck solid.
///
/// Coincident vertices are welded on a grid of `weld` spacing so adjacent
/// triangles share edges; degenerate triangles are dropped.
pub fn faceted_solid(tris: &[Triangle], weld: f64) -> std::result::Result<TruckSolid, KernelError> {
    use truck_modeling::builder;
    use truck_modeling::topology::{Edge, Face, Shell, Solid, Vertex, Wire};
    use truck_modeling::Point3;

    let quantize = |p: [f64; 3]| {
        [
            (p[0] / weld).round() as i64,
            (p[1] / weld).round() as i64,
            (p[2] / weld).round() as i64,
        ]
    };

    let mut vertex_index: HashMap<[i64; 3], usize> = HashMap::new();
    let mut vertices: Vec<Vertex> = Vec::new();
    let mut indexed: Vec<[usize; 3]> = Vec::with_capacity(tris.len());
    for tri in tris {
        let mut idx = [0usize; 3];
        for (k, p) in tri.iter().enumerate() {
            idx[k] = *vertex_index.entry(quantize(*p)).or_insert_with(|| {
                vertices.push(builder::vertex(Point3::new(p[0], p[1], p[2])));
                vertices.len() - 1
            });
        }
        if idx[0] != idx[1] && idx[1] != idx[2] && idx[0] != idx[2] {
            indexed.push(idx);
        }
    }

    let mut edges: HashMap<(usize, usize), Edge> = HashMap::new();
    let mut edge_between = |i: usize, j: usize| -> Edge {
        if let Some(e) = edges.get(&(i, j)) {
            return e.clone();
        }
        if let Some(e) = edges.get(&(j, i)) {
            return e.inverse();
        }
        let e = builder::line(&vertices[i], &vertices[j]);
        edges.insert((i, j), e.clone());
        e
    };

    let mut faces: Vec<Face> = Vec::with_capacity(indexed.len());
    for [a, b, c] in indexed {
        let wire: Wire = [edge_between(a, b), edge_between(b, c), edge_between(c, a)]
            .into_iter()
            .collect();
        let face = builder::try_attach_plane(&[wire]).map_err(|e| {
            KernelError::TessellationFailed {
                reason: format!("failed to attach facet plane: {}", e),
            }
        })?;
        faces.push(face);
    }

    if faces.is_empty() {
        return Err(KernelError::TessellationFailed {
            reason: "mesh has no usable triangles".to_string(),
        });
    }

    let shell: Shell = faces.into_iter().collect();
    Solid::try_new(vec![shell]).map_err(|e| KernelError::TessellationFailed {
        reason: format!("faceted shell is not a closed solid: {}", e),
    })
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}
