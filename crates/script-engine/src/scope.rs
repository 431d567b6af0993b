//! The modeling surface scripts can reach.
//!
//! Built once at startup around a shared kernel and never mutated after
//! construction. Every script run gets its own variable scope, so bindings
//! made by one request cannot leak into the next.

use std::fmt;
use std::sync::Arc;

use rhai::{Array, Dynamic, Engine, EvalAltResult};

use geom_kernel::{Kernel, KernelBundle, Shape};

use crate::gear::{build_gear, GearParams};
use crate::workplane::{Artifact, Plane, Workplane};

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

/// Execution limits applied to every script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptLimits {
    /// Upper bound on evaluated operations; 0 means unlimited.
    pub max_operations: u64,
}

/// Immutable script engine with the modeling capabilities registered.
pub struct CapabilityScope {
    engine: Engine,
    kernel: Arc<dyn KernelBundle>,
    limits: ScriptLimits,
}

impl CapabilityScope {
    pub fn new(kernel: Arc<dyn KernelBundle>, limits: ScriptLimits) -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(limits.max_operations);
        engine.on_print(|text| tracing::info!(target: "script", "{}", text));
        engine.on_debug(|text, source, pos| {
            tracing::debug!(target: "script", source = source.unwrap_or(""), %pos, "{}", text)
        });

        register_types(&mut engine);
        register_constructors(&mut engine, &kernel);
        register_workplane_methods(&mut engine, &kernel);
        register_shape_methods(&mut engine, &kernel);

        Self {
            engine,
            kernel,
            limits,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn kernel(&self) -> &Arc<dyn KernelBundle> {
        &self.kernel
    }

    pub fn limits(&self) -> ScriptLimits {
        self.limits
    }
}

impl fmt::Debug for CapabilityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityScope")
            .field("kernel", &self.kernel.name())
            .field("limits", &self.limits)
            .finish()
    }
}

/// Convert an artifact into the value a script sees.
pub fn artifact_to_dynamic(artifact: &Artifact) -> Dynamic {
    match artifact {
        Artifact::Workplane(wp) => Dynamic::from(wp.clone()),
        Artifact::Shape(shape) => Dynamic::from(shape.clone()),
    }
}

// ── Argument helpers ────────────────────────────────────────────────────

fn fail(e: impl fmt::Display) -> Box<EvalAltResult> {
    e.to_string().into()
}

/// Accept both integer and float script numbers.
fn num(value: &Dynamic, name: &str) -> ScriptResult<f64> {
    if let Ok(f) = value.as_float() {
        return Ok(f);
    }
    if let Ok(i) = value.as_int() {
        return Ok(i as f64);
    }
    Err(fail(format!(
        "`{}` must be a number, got {}",
        name,
        value.type_name()
    )))
}

fn vec3(values: &Array, name: &str) -> ScriptResult<[f64; 3]> {
    match values.as_slice() {
        [x, y, z] => Ok([num(x, name)?, num(y, name)?, num(z, name)?]),
        _ => Err(fail(format!(
            "`{}` must have 3 components, got {}",
            name,
            values.len()
        ))),
    }
}

fn points2(values: &Array) -> ScriptResult<Vec<[f64; 2]>> {
    values
        .iter()
        .map(|p| match p.read_lock::<Array>() {
            Some(pair) if pair.len() == 2 => Ok([num(&pair[0], "point")?, num(&pair[1], "point")?]),
            _ => Err(fail("prism points must be [x, y] pairs")),
        })
        .collect()
}

fn count(value: &Dynamic, name: &str) -> ScriptResult<u32> {
    let n = value
        .as_int()
        .map_err(|_| fail(format!("`{}` must be an integer", name)))?;
    u32::try_from(n).map_err(|_| fail(format!("`{}` out of range: {}", name, n)))
}

/// Shape operand of a boolean: a raw Shape or a Workplane's combined stack.
fn operand(kernel: &dyn Kernel, value: &Dynamic) -> ScriptResult<Shape> {
    if let Some(shape) = value.read_lock::<Shape>() {
        return Ok(shape.clone());
    }
    if let Some(wp) = value.read_lock::<Workplane>() {
        return wp.combined(kernel).map_err(fail);
    }
    Err(fail(format!(
        "expected a Workplane or Shape, got {}",
        value.type_name()
    )))
}

// ── Registration ────────────────────────────────────────────────────────

fn register_types(engine: &mut Engine) {
    engine
        .register_type_with_name::<Workplane>("Workplane")
        .register_type_with_name::<Shape>("Shape")
        .register_fn("to_string", |wp: &mut Workplane| {
            format!("Workplane({}, {} objects)", wp.plane(), wp.size())
        })
        .register_fn("to_debug", |wp: &mut Workplane| format!("{:?}", wp))
        .register_fn("to_string", |s: &mut Shape| format!("{:?}", s))
        .register_fn("to_debug", |s: &mut Shape| format!("{:?}", s));
}

fn register_constructors(engine: &mut Engine, kernel: &Arc<dyn KernelBundle>) {
    engine.register_fn("Workplane", || Workplane::new(Plane::XY));
    engine.register_fn("Workplane", |plane: &str| -> ScriptResult<Workplane> {
        Ok(Workplane::new(plane.parse::<Plane>().map_err(fail)?))
    });

    let k = Arc::clone(kernel);
    engine.register_fn(
        "cq_box",
        move |w: Dynamic, h: Dynamic, d: Dynamic| -> ScriptResult<Workplane> {
            let (w, h, d) = (num(&w, "width")?, num(&h, "height")?, num(&d, "depth")?);
            Workplane::new(Plane::XY)
                .add_box(k.as_kernel(), w, h, d)
                .map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "cq_cylinder",
        move |height: Dynamic, radius: Dynamic| -> ScriptResult<Workplane> {
            let (height, radius) = (num(&height, "height")?, num(&radius, "radius")?);
            Workplane::new(Plane::XY)
                .add_cylinder(k.as_kernel(), height, radius)
                .map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn("cq_sphere", move |radius: Dynamic| -> ScriptResult<Workplane> {
        Workplane::new(Plane::XY)
            .add_sphere(k.as_kernel(), num(&radius, "radius")?)
            .map_err(fail)
    });

    let k = Arc::clone(kernel);
    engine.register_fn(
        "solid_box",
        move |w: Dynamic, h: Dynamic, d: Dynamic| -> ScriptResult<Shape> {
            k.make_box(num(&w, "width")?, num(&h, "height")?, num(&d, "depth")?)
                .map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "solid_cylinder",
        move |radius: Dynamic, height: Dynamic| -> ScriptResult<Shape> {
            k.make_cylinder(num(&radius, "radius")?, num(&height, "height")?)
                .map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn("solid_sphere", move |radius: Dynamic| -> ScriptResult<Shape> {
        k.make_sphere(num(&radius, "radius")?).map_err(fail)
    });

    let k = Arc::clone(kernel);
    engine.register_fn(
        "prism",
        move |points: Array, height: Dynamic| -> ScriptResult<Workplane> {
            let shape = k
                .make_prism(&points2(&points)?, num(&height, "height")?)
                .map_err(fail)?;
            Ok(Workplane::from_shape(shape))
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "spur_gear",
        move |teeth: Dynamic, module: Dynamic, thickness: Dynamic| -> ScriptResult<Workplane> {
            let params = GearParams {
                teeth: count(&teeth, "teeth")?,
                module: num(&module, "module")?,
                thickness: num(&thickness, "thickness")?,
                ..Default::default()
            };
            build_gear(k.as_kernel(), &params).map_err(fail)
        },
    );
}

fn register_workplane_methods(engine: &mut Engine, kernel: &Arc<dyn KernelBundle>) {
    let k = Arc::clone(kernel);
    engine.register_fn(
        "box",
        move |wp: &mut Workplane, w: Dynamic, h: Dynamic, d: Dynamic| -> ScriptResult<Workplane> {
            let (w, h, d) = (num(&w, "width")?, num(&h, "height")?, num(&d, "depth")?);
            wp.add_box(k.as_kernel(), w, h, d).map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "cylinder",
        move |wp: &mut Workplane, height: Dynamic, radius: Dynamic| -> ScriptResult<Workplane> {
            let (height, radius) = (num(&height, "height")?, num(&radius, "radius")?);
            wp.add_cylinder(k.as_kernel(), height, radius)
                .map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "sphere",
        move |wp: &mut Workplane, radius: Dynamic| -> ScriptResult<Workplane> {
            wp.add_sphere(k.as_kernel(), num(&radius, "radius")?)
                .map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "translate",
        move |wp: &mut Workplane, x: Dynamic, y: Dynamic, z: Dynamic| -> ScriptResult<Workplane> {
            let offset = [num(&x, "x")?, num(&y, "y")?, num(&z, "z")?];
            wp.translate(k.as_kernel(), offset).map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "translate",
        move |wp: &mut Workplane, offset: Array| -> ScriptResult<Workplane> {
            wp.translate(k.as_kernel(), vec3(&offset, "offset")?)
                .map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "rotate",
        move |wp: &mut Workplane,
              start: Array,
              end: Array,
              degrees: Dynamic|
              -> ScriptResult<Workplane> {
            let (start, end) = (vec3(&start, "axis_start")?, vec3(&end, "axis_end")?);
            wp.rotate(k.as_kernel(), start, end, num(&degrees, "degrees")?)
                .map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "scale",
        move |wp: &mut Workplane, factor: Dynamic| -> ScriptResult<Workplane> {
            wp.scale(k.as_kernel(), num(&factor, "factor")?)
                .map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "union",
        move |wp: &mut Workplane, other: Dynamic| -> ScriptResult<Workplane> {
            let other = operand(k.as_kernel(), &other)?;
            wp.union(k.as_kernel(), &other).map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "cut",
        move |wp: &mut Workplane, other: Dynamic| -> ScriptResult<Workplane> {
            let other = operand(k.as_kernel(), &other)?;
            wp.cut(k.as_kernel(), &other).map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "intersect",
        move |wp: &mut Workplane, other: Dynamic| -> ScriptResult<Workplane> {
            let other = operand(k.as_kernel(), &other)?;
            wp.intersect(k.as_kernel(), &other).map_err(fail)
        },
    );

    engine.register_fn("add", |wp: &mut Workplane, shape: Shape| wp.add(&[shape]));
    engine.register_fn("add", |wp: &mut Workplane, other: Workplane| {
        wp.add(other.objects())
    });

    let k = Arc::clone(kernel);
    engine.register_fn("vals", move |wp: &mut Workplane| -> ScriptResult<Array> {
        let solids = wp.solids(&*k).map_err(fail)?;
        Ok(solids.into_iter().map(Dynamic::from).collect())
    });

    let k = Arc::clone(kernel);
    engine.register_fn("val", move |wp: &mut Workplane| -> ScriptResult<Shape> {
        wp.solids(&*k)
            .map_err(fail)?
            .into_iter()
            .next()
            .ok_or_else(|| fail("workplane is empty"))
    });

    engine.register_fn("size", |wp: &mut Workplane| wp.size() as rhai::INT);
}

fn register_shape_methods(engine: &mut Engine, kernel: &Arc<dyn KernelBundle>) {
    let k = Arc::clone(kernel);
    engine.register_fn(
        "translate",
        move |s: &mut Shape, x: Dynamic, y: Dynamic, z: Dynamic| -> ScriptResult<Shape> {
            k.translate(s, [num(&x, "x")?, num(&y, "y")?, num(&z, "z")?])
                .map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "translate",
        move |s: &mut Shape, offset: Array| -> ScriptResult<Shape> {
            k.translate(s, vec3(&offset, "offset")?).map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "rotate",
        move |s: &mut Shape, start: Array, end: Array, degrees: Dynamic| -> ScriptResult<Shape> {
            let (start, end) = (vec3(&start, "axis_start")?, vec3(&end, "axis_end")?);
            let direction = [end[0] - start[0], end[1] - start[1], end[2] - start[2]];
            k.rotate(s, start, direction, num(&degrees, "degrees")?)
                .map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "scale",
        move |s: &mut Shape, factor: Dynamic| -> ScriptResult<Shape> {
            k.scale(s, num(&factor, "factor")?).map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "fuse",
        move |s: &mut Shape, other: Dynamic| -> ScriptResult<Shape> {
            let other = operand(k.as_kernel(), &other)?;
            k.boolean_union(s, &other).map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "cut",
        move |s: &mut Shape, other: Dynamic| -> ScriptResult<Shape> {
            let other = operand(k.as_kernel(), &other)?;
            k.boolean_subtract(s, &other).map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn(
        "intersect",
        move |s: &mut Shape, other: Dynamic| -> ScriptResult<Shape> {
            let other = operand(k.as_kernel(), &other)?;
            k.boolean_intersect(s, &other).map_err(fail)
        },
    );

    let k = Arc::clone(kernel);
    engine.register_fn("volume", move |s: &mut Shape| -> ScriptResult<f64> {
        k.mass_properties(s).map(|p| p.volume).map_err(fail)
    });
}
