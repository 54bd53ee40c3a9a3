use serde::{Deserialize, Serialize};

use crate::foundation::core::Rgba;
use crate::foundation::error::TexflowResult;
use crate::graph::ports::PortValue;
use crate::nodes::ProcessCtx;
use crate::process::scheduler::FrameClock;
use crate::render::kernel::{GENERATE_PROGRAM, KernelParams};

pub(crate) const TIME_PORTS: &[&str] =
    &["time", "sin_time", "cos_time", "delta_time", "frame_count"];

fn generate(
    ctx: &mut ProcessCtx<'_>,
    kernel: &str,
    params: &mut KernelParams,
) -> TexflowResult<bool> {
    let target = ctx.target()?;
    let program = ctx.program(GENERATE_PROGRAM)?;
    let out = target.write_instance();
    params.set_texture("_Output", out);
    let grid = ctx.extent(out)?;
    ctx.cmd.dispatch(&program, kernel, params, grid)?;
    if target.is_double_buffered() {
        let key = ctx.key();
        ctx.resources.swap(key)?;
    }
    let published = ctx.target()?.read_instance();
    ctx.set_output("output", PortValue::Texture(published));
    Ok(true)
}

/// Fills the target with one color.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniformNode {
    /// Fill color.
    pub color: Rgba,
}

impl Default for UniformNode {
    fn default() -> Self {
        Self { color: Rgba::WHITE }
    }
}

impl UniformNode {
    pub(crate) fn process(&self, ctx: &mut ProcessCtx<'_>) -> TexflowResult<bool> {
        let mut p = KernelParams::default();
        p.set_vector("_Color", self.color.to_array());
        generate(ctx, "Uniform", &mut p)
    }
}

/// Two-color checkerboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerNode {
    /// Cells per axis.
    pub cells: u32,
    /// Color of the cell at the origin.
    pub color_a: Rgba,
    /// Other color.
    pub color_b: Rgba,
}

impl Default for CheckerNode {
    fn default() -> Self {
        Self {
            cells: 8,
            color_a: Rgba::WHITE,
            color_b: Rgba::BLACK,
        }
    }
}

impl CheckerNode {
    pub(crate) fn process(&self, ctx: &mut ProcessCtx<'_>) -> TexflowResult<bool> {
        let mut p = KernelParams::default();
        p.set_int("_Cells", i32::try_from(self.cells).unwrap_or(i32::MAX))
            .set_vector("_ColorA", self.color_a.to_array())
            .set_vector("_ColorB", self.color_b.to_array());
        generate(ctx, "Checker", &mut p)
    }
}

/// A disc (or a single texel when `radius` is 0) on a background.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DotNode {
    /// Center in normalized coordinates.
    pub center: [f32; 2],
    /// Radius in texels.
    pub radius: f32,
    /// Dot color.
    pub color: Rgba,
    /// Background color.
    pub background: Rgba,
}

impl Default for DotNode {
    fn default() -> Self {
        Self {
            center: [0.5, 0.5],
            radius: 0.0,
            color: Rgba::WHITE,
            background: Rgba::BLACK,
        }
    }
}

impl DotNode {
    pub(crate) fn process(&self, ctx: &mut ProcessCtx<'_>) -> TexflowResult<bool> {
        let mut p = KernelParams::default();
        p.set_float("_Radius", self.radius)
            .set_vector("_Center", [self.center[0], self.center[1], 0.5, 0.0])
            .set_vector("_Color", self.color.to_array())
            .set_vector("_Background", self.background.to_array());
        generate(ctx, "Dot", &mut p)
    }
}

/// Value noise, deterministic per seed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseNode {
    /// Lattice cells across the texture.
    pub frequency: f32,
    /// Hash seed.
    pub seed: u32,
}

impl Default for NoiseNode {
    fn default() -> Self {
        Self {
            frequency: 4.0,
            seed: 0,
        }
    }
}

impl NoiseNode {
    pub(crate) fn process(&self, ctx: &mut ProcessCtx<'_>) -> TexflowResult<bool> {
        let mut p = KernelParams::default();
        p.set_float("_Frequency", self.frequency)
            .set_int("_Seed", self.seed as i32);
        generate(ctx, "Noise", &mut p)
    }
}

/// Frame clock values. Static graphs see a clock frozen at zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeNode {}

impl TimeNode {
    pub(crate) fn process(&self, ctx: &mut ProcessCtx<'_>) -> TexflowResult<bool> {
        let clock = if ctx.realtime {
            ctx.clock
        } else {
            FrameClock::default()
        };
        let values = [
            clock.time,
            clock.time.sin(),
            clock.time.cos(),
            clock.delta_time,
            clock.frame_count as f32,
        ];
        for (port, v) in TIME_PORTS.iter().zip(values) {
            ctx.set_output(*port, PortValue::Float(v));
        }
        Ok(true)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/sources.rs"]
mod tests;
