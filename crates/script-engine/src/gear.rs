//! Parametric spur gear: trapezoidal teeth on a root circle, extruded.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use geom_kernel::Kernel;

use crate::types::GearError;
use crate::workplane::{Plane, Workplane};

/// Fewest teeth that still give a usable profile.
pub const MIN_TEETH: u32 = 6;

/// Most teeth accepted; the outline holds four points per tooth.
pub const MAX_TEETH: u32 = 1000;

/// Share of the angular pitch a tooth covers at the root and at the tip.
const ROOT_FRACTION: f64 = 0.6;
const TIP_FRACTION: f64 = 0.3;

/// Gear parameters. Missing fields take their defaults; unknown fields are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GearParams {
    pub teeth: u32,
    pub module: f64,
    pub thickness: f64,
    /// 0 for a solid hub.
    pub bore_diameter: f64,
    pub plane: String,
}

impl Default for GearParams {
    fn default() -> Self {
        Self {
            teeth: 20,
            module: 2.0,
            thickness: 5.0,
            bore_diameter: 0.0,
            plane: "XY".to_string(),
        }
    }
}

impl GearParams {
    pub fn pitch_radius(&self) -> f64 {
        self.module * self.teeth as f64 / 2.0
    }

    pub fn root_radius(&self) -> f64 {
        self.pitch_radius() - 1.25 * self.module
    }

    pub fn tip_radius(&self) -> f64 {
        self.pitch_radius() + self.module
    }

    /// Check ranges and return the parsed working plane.
    pub fn validate(&self) -> Result<Plane, GearError> {
        if self.teeth < MIN_TEETH {
            return Err(invalid("teeth", format!("must be at least {}, got {}", MIN_TEETH, self.teeth)));
        }
        if self.teeth > MAX_TEETH {
            return Err(invalid("teeth", format!("must be at most {}, got {}", MAX_TEETH, self.teeth)));
        }
        if !(self.module.is_finite() && self.module > 0.0) {
            return Err(invalid("module", format!("must be positive, got {}", self.module)));
        }
        if !(self.thickness.is_finite() && self.thickness > 0.0) {
            return Err(invalid("thickness", format!("must be positive, got {}", self.thickness)));
        }
        if !(self.bore_diameter.is_finite() && self.bore_diameter >= 0.0) {
            return Err(invalid(
                "bore_diameter",
                format!("must be zero or positive, got {}", self.bore_diameter),
            ));
        }
        let root_diameter = 2.0 * self.root_radius();
        if self.bore_diameter >= root_diameter {
            return Err(invalid(
                "bore_diameter",
                format!("must be smaller than the root diameter {:.3}", root_diameter),
            ));
        }
        self.plane.parse::<Plane>().map_err(|reason| invalid("plane", reason))
    }

    /// Closed gear outline in the XY plane, counter-clockwise, four points per tooth.
    pub fn outline(&self) -> Vec<[f64; 2]> {
        let pitch_angle = 2.0 * PI / self.teeth as f64;
        let root_half = pitch_angle * ROOT_FRACTION / 2.0;
        let tip_half = pitch_angle * TIP_FRACTION / 2.0;
        let (r_root, r_tip) = (self.root_radius(), self.tip_radius());
        let polar = |r: f64, a: f64| [r * a.cos(), r * a.sin()];

        (0..self.teeth)
            .flat_map(|i| {
                let center = i as f64 * pitch_angle;
                [
                    polar(r_root, center - root_half),
                    polar(r_tip, center - tip_half),
                    polar(r_tip, center + tip_half),
                    polar(r_root, center + root_half),
                ]
            })
            .collect()
    }
}

fn invalid(name: &'static str, reason: String) -> GearError {
    GearError::InvalidParameter { name, reason }
}

/// Build the gear body, cut the bore, and orient it onto the requested plane.
pub fn build_gear(kernel: &dyn Kernel, params: &GearParams) -> Result<Workplane, GearError> {
    let plane = params.validate()?;
    let mut body = kernel.make_prism(&params.outline(), params.thickness)?;

    if params.bore_diameter > 0.0 {
        // Overshoot both faces so the cut never grazes them.
        let bore = kernel.make_cylinder(params.bore_diameter / 2.0, 2.0 * params.thickness)?;
        let bore = kernel.translate(&bore, [0.0, 0.0, -params.thickness / 2.0])?;
        body = kernel.boolean_subtract(&body, &bore)?;
    }

    let body = plane.orient(kernel, body)?;
    tracing::debug!(teeth = params.teeth, module = params.module, %plane, "built spur gear");
    Ok(Workplane::with_objects(plane, vec![body]))
}
