use serde::{Deserialize, Serialize};

use crate::foundation::error::TexflowResult;
use crate::graph::ports::PortValue;
use crate::graph::settings::{EditFlags, ResourceSettings};
use crate::nodes::ProcessCtx;
use crate::render::jfa::{DistanceMetric, DistanceOutput, ThresholdMode, flood_offsets};
use crate::render::kernel::{DISTANCE_PROGRAM, KernelParams};
use crate::texture::format::{OutputChannel, OutputPrecision};

/// Settings forced on distance nodes: full-precision RGBA, double buffered, only size and
/// dimension editable.
pub(crate) fn settings() -> ResourceSettings {
    ResourceSettings {
        output_channels: OutputChannel::Rgba,
        output_precision: OutputPrecision::Full,
        double_buffered: true,
        edit_flags: EditFlags::DIMENSION | EditFlags::SIZE,
        ..ResourceSettings::default()
    }
}

/// Jump-flood fill of every texel above a threshold.
///
/// The cost depends on the texture size only, not on `distance`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceNode {
    /// Texels above this value are seeds.
    pub threshold: f32,
    /// Channel compared against the threshold.
    pub threshold_mode: ThresholdMode,
    /// Maximum distance in percent of the target width.
    pub distance: f32,
    /// Metric used to pick the nearest seed.
    pub metric: DistanceMetric,
    /// What the final pass writes.
    pub mode: DistanceOutput,
}

impl Default for DistanceNode {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            threshold_mode: ThresholdMode::Luminance,
            distance: 50.0,
            metric: DistanceMetric::Euclidean,
            mode: DistanceOutput::InputBlend,
        }
    }
}

impl DistanceNode {
    pub(crate) fn process(&self, ctx: &mut ProcessCtx<'_>) -> TexflowResult<bool> {
        let Some(input) = ctx.input_texture("input") else {
            return Ok(false);
        };
        let program = ctx.program(DISTANCE_PROGRAM)?;
        let target = ctx.target()?;
        // `output` is the published read instance; `rt` is the scratch the passes write.
        let output = target.read_instance();
        let rt = target.write_instance();
        let grid = ctx.extent(output)?;
        let input_width = ctx.extent(input)?.width;
        let input_scale = input_width as f32 / grid.width as f32;

        let mut p = KernelParams::default();
        p.set_float("_Threshold", self.threshold)
            .set_vector("_Size", [grid.width as f32, 1.0 / grid.width as f32, 0.0, 0.0])
            .set_float("_Distance", self.distance / 100.0)
            .set_int("_ThresholdMode", self.threshold_mode.code())
            .set_int("_DistanceMode", self.metric.code())
            .set_int("_Mode", self.mode.code());

        p.set_texture("_Input", input)
            .set_texture("_Output", output)
            .set_float("_InputScaleFactor", input_scale);
        ctx.cmd.dispatch(&program, "FillUVMap", &p, grid)?;

        p.set_float("_InputScaleFactor", 1.0);
        for offset in flood_offsets(input_width) {
            p.set_float("_Offset", offset as f32)
                .set_texture("_Input", output)
                .set_texture("_Output", rt);
            ctx.cmd.dispatch(&program, "JumpFlooding", &p, grid)?;
            ctx.cmd.copy_texture(rt, output)?;
        }

        p.set_float("_InputScaleFactor", input_scale)
            .set_texture("_Input", input)
            .set_texture("_Output", rt)
            .set_texture("_FinalOutput", output);
        ctx.cmd.dispatch(&program, "FinalPass", &p, grid)?;

        ctx.set_output("output", PortValue::Texture(output));
        Ok(true)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/distance.rs"]
mod tests;
