//! Grid fluid kernels behind the fire simulation.
//!
//! Fields live in texel space: velocities are texels per second, `+y` is up, and a texel whose
//! obstacle value exceeds one half is solid. Neighbor lookups clamp at the borders.

use crate::foundation::error::{TexflowError, TexflowResult};
use crate::render::cpu::KernelCtx;
use crate::texture::storage::Texture;

/// Which grid edges are solid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderMode {
    /// Fluid leaves through every edge.
    #[default]
    NoBorders,
    /// All four edges are walls.
    Borders,
}

impl BorderMode {
    /// Kernel parameter encoding.
    pub fn code(self) -> i32 {
        self as i32
    }

    fn from_code(code: i32) -> TexflowResult<Self> {
        match code {
            0 => Ok(Self::NoBorders),
            1 => Ok(Self::Borders),
            _ => Err(TexflowError::dispatch(format!("invalid _BorderMode {code}"))),
        }
    }
}

fn at(t: &Texture, x: i64, y: i64) -> [f32; 4] {
    t.load(x, y, 0)
}

fn solid(obstacles: &Texture, x: i64, y: i64) -> bool {
    at(obstacles, x, y)[0] > 0.5
}

/// Bilinear lookup at a texel-space position, texel centers on integers.
fn bilinear(t: &Texture, px: f32, py: f32) -> [f32; 4] {
    let (x0, y0) = (px.floor(), py.floor());
    let (fx, fy) = (px - x0, py - y0);
    let (x0, y0) = (x0 as i64, y0 as i64);
    let a = at(t, x0, y0);
    let b = at(t, x0 + 1, y0);
    let c = at(t, x0, y0 + 1);
    let d = at(t, x0 + 1, y0 + 1);
    let mut out = [0.0; 4];
    for i in 0..4 {
        let bottom = a[i] + (b[i] - a[i]) * fx;
        let top = c[i] + (d[i] - c[i]) * fx;
        out[i] = bottom + (top - bottom) * fy;
    }
    out
}

pub(crate) fn clear(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    ctx.for_each_texel(out, |_, _, _| [0.0; 4]);
    Ok(())
}

/// Solid cells: the optional `_Input` mask plus the grid edges when borders are on.
pub(crate) fn obstacles(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let mask = ctx.read_optional("_Input")?;
    let mode = BorderMode::from_code(ctx.int("_BorderMode")?)?;
    let e = out.extent();
    ctx.for_each_texel(out, |x, y, _| {
        let edge = x == 0 || y == 0 || x + 1 == e.width || y + 1 == e.height;
        let masked = mask.is_some_and(|m| {
            let e_in = m.extent();
            let sx = u64::from(x) * u64::from(e_in.width) / u64::from(e.width.max(1));
            let sy = u64::from(y) * u64::from(e_in.height) / u64::from(e.height.max(1));
            m.load(sx as i64, sy as i64, 0)[0] > 0.5
        });
        let v = if masked || (mode == BorderMode::Borders && edge) {
            1.0
        } else {
            0.0
        };
        [v, v, v, 1.0]
    });
    Ok(())
}

/// `_Input + _Source * _Amount * _DeltaTime`, per channel.
pub(crate) fn inject(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let field = ctx.read("_Input")?;
    let source = ctx.read("_Source")?;
    let scale = ctx.float("_Amount")? * ctx.float("_DeltaTime")?;
    let (e, e_src) = (out.extent(), source.extent());
    ctx.for_each_texel(out, |x, y, _| {
        let sx = u64::from(x) * u64::from(e_src.width) / u64::from(e.width.max(1));
        let sy = u64::from(y) * u64::from(e_src.height) / u64::from(e.height.max(1));
        let s = source.load(sx as i64, sy as i64, 0);
        let f = at(field, i64::from(x), i64::from(y));
        [
            f[0] + s[0] * scale,
            f[1] + s[1] * scale,
            f[2] + s[2] * scale,
            f[3],
        ]
    });
    Ok(())
}

/// Semi-Lagrangian advection of `_Input` along `_Velocity`, then
/// `max(0, value * _Dissipation - _Decay * _DeltaTime)`. Solid cells are zeroed.
pub(crate) fn advect(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let field = ctx.read("_Input")?;
    let velocity = ctx.read("_Velocity")?;
    let obstacles = ctx.read("_Obstacles")?;
    let dt = ctx.float("_DeltaTime")?;
    let dissipation = ctx.float("_Dissipation")?;
    let decay = ctx.float("_Decay")? * dt;
    ctx.for_each_texel(out, |x, y, _| {
        let (x, y) = (i64::from(x), i64::from(y));
        if solid(obstacles, x, y) {
            return [0.0; 4];
        }
        let v = at(velocity, x, y);
        let s = bilinear(field, x as f32 - dt * v[0], y as f32 - dt * v[1]);
        let fade = |c: f32| (c * dissipation - decay).max(0.0);
        [fade(s[0]), fade(s[1]), fade(s[2]), s[3]]
    });
    Ok(())
}

/// Self-advection of the velocity field; smoke in `_Density` pulls it down by `_Weight`.
pub(crate) fn advect_velocity(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let velocity = ctx.read("_Input")?;
    let density = ctx.read("_Density")?;
    let obstacles = ctx.read("_Obstacles")?;
    let dt = ctx.float("_DeltaTime")?;
    let dissipation = ctx.float("_Dissipation")?;
    let weight = ctx.float("_Weight")?;
    ctx.for_each_texel(out, |x, y, _| {
        let (x, y) = (i64::from(x), i64::from(y));
        if solid(obstacles, x, y) {
            return [0.0; 4];
        }
        let v = at(velocity, x, y);
        let s = bilinear(velocity, x as f32 - dt * v[0], y as f32 - dt * v[1]);
        let sink = dt * at(density, x, y)[0] * weight;
        [s[0] * dissipation, s[1] * dissipation - sink, 0.0, 0.0]
    });
    Ok(())
}

/// Hot cells (above `_Ambient`) accelerate upward.
pub(crate) fn buoyancy(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let velocity = ctx.read("_Input")?;
    let temperature = ctx.read("_Temperature")?;
    let dt = ctx.float("_DeltaTime")?;
    let buoyancy = ctx.float("_Buoyancy")?;
    let ambient = ctx.float("_Ambient")?;
    ctx.for_each_texel(out, |x, y, _| {
        let (x, y) = (i64::from(x), i64::from(y));
        let v = at(velocity, x, y);
        let t = at(temperature, x, y)[0];
        let lift = if t > ambient {
            dt * (t - ambient) * buoyancy
        } else {
            0.0
        };
        [v[0], v[1] + lift, 0.0, 0.0]
    });
    Ok(())
}

/// Burning fuel that drops under `_Extinguishment` turns into smoke.
pub(crate) fn extinguishment(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let density = ctx.read("_Input")?;
    let reaction = ctx.read("_Reaction")?;
    let amount = ctx.float("_Amount")?;
    let threshold = ctx.float("_Extinguishment")?;
    ctx.for_each_texel(out, |x, y, _| {
        let (x, y) = (i64::from(x), i64::from(y));
        let d = at(density, x, y)[0];
        let r = at(reaction, x, y)[0];
        let smoke = if r > 0.0 && r < threshold {
            amount * r
        } else {
            0.0
        };
        [d + smoke, 0.0, 0.0, 1.0]
    });
    Ok(())
}

/// Curl of `_Velocity` in the red channel.
pub(crate) fn vorticity(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let v = ctx.read("_Velocity")?;
    ctx.for_each_texel(out, |x, y, _| {
        let (x, y) = (i64::from(x), i64::from(y));
        let curl = 0.5 * ((at(v, x + 1, y)[1] - at(v, x - 1, y)[1])
            - (at(v, x, y + 1)[0] - at(v, x, y - 1)[0]));
        [curl, 0.0, 0.0, 1.0]
    });
    Ok(())
}

/// Push velocity along the gradient of `|curl|` to restore small swirls.
pub(crate) fn confinement(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let velocity = ctx.read("_Input")?;
    let w = ctx.read("_Vorticity")?;
    let dt = ctx.float("_DeltaTime")?;
    let strength = ctx.float("_Strength")?;
    ctx.for_each_texel(out, |x, y, _| {
        let (x, y) = (i64::from(x), i64::from(y));
        let mag = |x, y| at(w, x, y)[0].abs();
        let eta = [
            0.5 * (mag(x + 1, y) - mag(x - 1, y)),
            0.5 * (mag(x, y + 1) - mag(x, y - 1)),
        ];
        let len = (eta[0] * eta[0] + eta[1] * eta[1]).sqrt();
        let v = at(velocity, x, y);
        if len <= 1e-5 {
            return [v[0], v[1], 0.0, 0.0];
        }
        let n = [eta[0] / len, eta[1] / len];
        let curl = at(w, x, y)[0];
        [
            v[0] + dt * strength * n[1] * curl,
            v[1] - dt * strength * n[0] * curl,
            0.0,
            0.0,
        ]
    });
    Ok(())
}

fn wall_velocity(velocity: &Texture, obstacles: &Texture, x: i64, y: i64) -> [f32; 4] {
    if solid(obstacles, x, y) {
        [0.0; 4]
    } else {
        at(velocity, x, y)
    }
}

/// Central-difference divergence of `_Velocity`; solid neighbors contribute no flow.
pub(crate) fn divergence(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let v = ctx.read("_Velocity")?;
    let obstacles = ctx.read("_Obstacles")?;
    ctx.for_each_texel(out, |x, y, _| {
        let (x, y) = (i64::from(x), i64::from(y));
        let left = wall_velocity(v, obstacles, x - 1, y)[0];
        let right = wall_velocity(v, obstacles, x + 1, y)[0];
        let down = wall_velocity(v, obstacles, x, y - 1)[1];
        let up = wall_velocity(v, obstacles, x, y + 1)[1];
        [0.5 * ((right - left) + (up - down)), 0.0, 0.0, 1.0]
    });
    Ok(())
}

fn wall_pressure(pressure: &Texture, obstacles: &Texture, x: i64, y: i64, center: f32) -> f32 {
    if solid(obstacles, x, y) {
        center
    } else {
        at(pressure, x, y)[0]
    }
}

/// One Jacobi relaxation step of the pressure Poisson equation.
pub(crate) fn jacobi(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let p = ctx.read("_Input")?;
    let div = ctx.read("_Divergence")?;
    let obstacles = ctx.read("_Obstacles")?;
    ctx.for_each_texel(out, |x, y, _| {
        let (x, y) = (i64::from(x), i64::from(y));
        let c = at(p, x, y)[0];
        let sum = wall_pressure(p, obstacles, x - 1, y, c)
            + wall_pressure(p, obstacles, x + 1, y, c)
            + wall_pressure(p, obstacles, x, y - 1, c)
            + wall_pressure(p, obstacles, x, y + 1, c);
        [(sum - at(div, x, y)[0]) * 0.25, 0.0, 0.0, 1.0]
    });
    Ok(())
}

/// Subtract the pressure gradient from `_Input` so the velocity becomes divergence free.
pub(crate) fn project(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let velocity = ctx.read("_Input")?;
    let p = ctx.read("_Pressure")?;
    let obstacles = ctx.read("_Obstacles")?;
    ctx.for_each_texel(out, |x, y, _| {
        let (x, y) = (i64::from(x), i64::from(y));
        if solid(obstacles, x, y) {
            return [0.0; 4];
        }
        let c = at(p, x, y)[0];
        let grad = [
            0.5 * (wall_pressure(p, obstacles, x + 1, y, c)
                - wall_pressure(p, obstacles, x - 1, y, c)),
            0.5 * (wall_pressure(p, obstacles, x, y + 1, c)
                - wall_pressure(p, obstacles, x, y - 1, c)),
        ];
        let v = at(velocity, x, y);
        [v[0] - grad[0], v[1] - grad[1], 0.0, 0.0]
    });
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/fluid.rs"]
mod tests;
