//! Primitive builders on top of truck's sweep API.
//!
//! truck has no built-in box/cylinder/sphere; everything is successive sweeps.

use std::f64::consts::PI;

use truck_modeling::builder;
use truck_modeling::topology::{Edge, Solid, Wire};
use truck_modeling::{EuclideanSpace, Point3, Rad, Vector3};

use crate::types::KernelError;

/// Box via successive translational sweeps. Origin at (0,0,0), extends to (w,h,d).
pub fn make_box(w: f64, h: f64, d: f64) -> Solid {
    let v = builder::vertex(Point3::new(0.0, 0.0, 0.0));
    let edge = builder::tsweep(&v, Vector3::new(w, 0.0, 0.0));
    let face = builder::tsweep(&edge, Vector3::new(0.0, h, 0.0));
    builder::tsweep(&face, Vector3::new(0.0, 0.0, d))
}

/// Cylinder: circle wire → face → translational sweep.
/// Base centered at origin in XY plane, extending along +Z.
pub fn make_cylinder(radius: f64, height: f64) -> Result<Solid, KernelError> {
    let v = builder::vertex(Point3::new(radius, 0.0, 0.0));
    let wire = builder::rsweep(&v, Point3::origin(), Vector3::unit_z(), Rad(2.0 * PI));
    let face = builder::try_attach_plane(&[wire]).map_err(|e| KernelError::Other {
        message: format!("failed to create circular face: {}", e),
    })?;
    Ok(builder::tsweep(&face, Vector3::new(0.0, 0.0, height)))
}

/// Sphere: half-disc face revolved 2π about Z. Centered at origin.
pub fn make_sphere(radius: f64) -> Result<Solid, KernelError> {
    // Semicircle in XZ from (r,0,0) over (0,0,r) to (-r,0,0)
    let v_right = builder::vertex(Point3::new(radius, 0.0, 0.0));
    let arc_wire = builder::rsweep(&v_right, Point3::origin(), Vector3::unit_y(), Rad(PI));

    let v_left = builder::vertex(Point3::new(-radius, 0.0, 0.0));
    let line_edge: Edge = builder::tsweep(&v_left, Vector3::new(2.0 * radius, 0.0, 0.0));

    let mut edges: Vec<Edge> = arc_wire.edge_iter().cloned().collect();
    edges.push(line_edge);
    let closed_wire = Wire::from_iter(edges);

    let face = builder::try_attach_plane(&[closed_wire]).map_err(|e| KernelError::Other {
        message: format!("failed to create semicircle face: {}", e),
    })?;
    Ok(builder::rsweep(
        &face,
        Point3::origin(),
        Vector3::unit_z(),
        Rad(2.0 * PI),
    ))
}

/// Extrude a closed XY polygon along +Z.
///
/// The outline is reordered counter-clockwise so the bottom face normal
/// follows the sweep direction.
pub fn make_prism(outline: &[[f64; 2]], height: f64) -> Result<Solid, KernelError> {
    let mut pts: Vec<[f64; 2]> = outline.to_vec();
    // Drop an explicit closing point
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    if pts.len() < 3 {
        return Err(KernelError::InvalidParameter {
            name: "outline",
            reason: format!("polygon needs at least 3 points, got {}", pts.len()),
        });
    }
    let area = signed_area(&pts);
    if area.abs() < 1e-12 {
        return Err(KernelError::InvalidParameter {
            name: "outline",
            reason: "polygon has zero area".to_string(),
        });
    }
    if area < 0.0 {
        pts.reverse();
    }

    let vertices: Vec<_> = pts
        .iter()
        .map(|p| builder::vertex(Point3::new(p[0], p[1], 0.0)))
        .collect();
    let n = vertices.len();
    let wire: Wire = (0..n)
        .map(|i| builder::line(&vertices[i], &vertices[(i + 1) % n]))
        .collect();

    let face = builder::try_attach_plane(&[wire]).map_err(|e| KernelError::Other {
        message: format!("failed to create polygon face: {}", e),
    })?;
    Ok(builder::tsweep(&face, Vector3::new(0.0, 0.0, height)))
}

fn signed_area(pts: &[[f64; 2]]) -> f64 {
    let n = pts.len();
    (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            pts[i][0] * pts[j][1] - pts[j][0] * pts[i][1]
        })
        .sum::<f64>()
        / 2.0
}
