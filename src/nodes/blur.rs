use serde::{Deserialize, Serialize};

use crate::foundation::error::TexflowResult;
use crate::graph::ports::PortValue;
use crate::nodes::ProcessCtx;
use crate::render::kernel::{BLUR_PROGRAM, KernelParams};

/// Separable gaussian blur, ping-ponged through the node's double buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurNode {
    /// Kernel radius in texels.
    pub radius: u32,
    /// Number of horizontal + vertical pass pairs (at least one is run).
    pub iterations: u32,
}

impl Default for BlurNode {
    fn default() -> Self {
        Self {
            radius: 2,
            iterations: 1,
        }
    }
}

impl BlurNode {
    pub(crate) fn process(&self, ctx: &mut ProcessCtx<'_>) -> TexflowResult<bool> {
        let Some(input) = ctx.input_texture("input") else {
            return Ok(false);
        };
        let program = ctx.program(BLUR_PROGRAM)?;
        let key = ctx.key();
        let grid = ctx.extent(ctx.target()?.write_instance())?;

        let mut p = KernelParams::default();
        p.set_float("_Radius", self.radius as f32);
        let mut source = input;
        for _ in 0..self.iterations.max(1) {
            for kernel in ["BlurHorizontal", "BlurVertical"] {
                let target = ctx.target()?;
                p.set_texture("_Input", source)
                    .set_texture("_Output", target.write_instance());
                ctx.cmd.dispatch(&program, kernel, &p, grid)?;
                ctx.resources.swap(key)?;
                source = ctx.target()?.read_instance();
            }
        }

        ctx.set_output("output", PortValue::Texture(source));
        Ok(true)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/blur.rs"]
mod tests;
