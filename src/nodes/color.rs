use serde::{Deserialize, Serialize};

use crate::foundation::error::TexflowResult;
use crate::graph::ports::PortValue;
use crate::graph::settings::{EditFlags, OutputDimension, ResourceSettings};
use crate::nodes::ProcessCtx;
use crate::render::kernel::{COLOR_PROGRAM, KernelParams};

/// Input ports of the mask packer and the kernel textures they bind.
pub(crate) const MASK_PORTS: &[(&str, &str)] = &[
    ("metallic", "_Metallic"),
    ("occlusion", "_Occlusion"),
    ("detail", "_Detail"),
    ("smoothness", "_Smoothness"),
];

/// Settings of nodes that only produce 2D textures.
pub(crate) fn flat_settings() -> ResourceSettings {
    ResourceSettings {
        dimension: OutputDimension::Texture2D,
        edit_flags: EditFlags::SIZE | EditFlags::TARGET_FORMAT | EditFlags::POT_SIZE,
        ..ResourceSettings::default()
    }
}

// Fixed-shader nodes wrap their dispatch in a marker named after the node.
fn fixed_shader(
    ctx: &mut ProcessCtx<'_>,
    kernel: &str,
    params: &mut KernelParams,
) -> TexflowResult<bool> {
    let target = ctx.target()?;
    let program = ctx.program(COLOR_PROGRAM)?;
    let out = target.write_instance();
    params.set_texture("_Output", out);
    let grid = ctx.extent(out)?;

    ctx.cmd.begin_sample(ctx.name);
    ctx.cmd.dispatch(&program, kernel, params, grid)?;
    ctx.cmd.end_sample();

    if target.is_double_buffered() {
        let key = ctx.key();
        ctx.resources.swap(key)?;
    }
    let published = ctx.target()?.read_instance();
    ctx.set_output("output", PortValue::Texture(published));
    Ok(true)
}

/// Hue rotation plus saturation and value multipliers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HsvNode {
    /// Hue shift in turns; the `hue` input overrides it when connected.
    pub hue: f32,
    /// Saturation multiplier.
    pub saturation: f32,
    /// Value multiplier.
    pub value: f32,
}

impl Default for HsvNode {
    fn default() -> Self {
        Self {
            hue: 0.0,
            saturation: 1.0,
            value: 1.0,
        }
    }
}

impl HsvNode {
    pub(crate) fn process(&self, ctx: &mut ProcessCtx<'_>) -> TexflowResult<bool> {
        let Some(input) = ctx.input_texture("input") else {
            return Ok(false);
        };
        let hue = ctx.input_float("hue").unwrap_or(self.hue);
        let mut p = KernelParams::default();
        p.set_float("_Hue", hue)
            .set_float("_Saturation", self.saturation)
            .set_float("_Value", self.value)
            .set_texture("_Input", input);
        fixed_shader(ctx, "Hsv", &mut p)
    }
}

/// Tangent-space normal map from the luminance of a height map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalFromHeightNode {
    /// Slope multiplier.
    pub strength: f32,
}

impl Default for NormalFromHeightNode {
    fn default() -> Self {
        Self { strength: 1.0 }
    }
}

impl NormalFromHeightNode {
    pub(crate) fn process(&self, ctx: &mut ProcessCtx<'_>) -> TexflowResult<bool> {
        let Some(input) = ctx.input_texture("input") else {
            return Ok(false);
        };
        let mut p = KernelParams::default();
        p.set_float("_Strength", self.strength)
            .set_texture("_Input", input);
        fixed_shader(ctx, "NormalFromHeight", &mut p)
    }
}

/// Packs metallic, occlusion, detail and smoothness masks into one RGBA texture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskCombineNode {
    /// Channel values used where an input is not connected.
    pub defaults: [f32; 4],
}

impl Default for MaskCombineNode {
    fn default() -> Self {
        Self {
            defaults: [0.0, 1.0, 0.0, 0.5],
        }
    }
}

impl MaskCombineNode {
    pub(crate) fn process(&self, ctx: &mut ProcessCtx<'_>) -> TexflowResult<bool> {
        let mut p = KernelParams::default();
        p.set_vector("_Defaults", self.defaults);
        for (port, binding) in MASK_PORTS {
            if let Some(t) = ctx.input_texture(port) {
                p.set_texture(*binding, t);
            }
        }
        fixed_shader(ctx, "MaskCombine", &mut p)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/color.rs"]
mod tests;
