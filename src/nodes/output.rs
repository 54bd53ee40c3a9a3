use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::foundation::error::TexflowResult;
use crate::graph::ports::PortValue;
use crate::nodes::ProcessCtx;
use crate::process::events::GraphEvent;
use crate::render::kernel::{KernelParams, OUTPUT_PROGRAM};
use crate::texture::format::{CompressionFormat, ExportFormat, TextureDimension};

pub(crate) const REALTIME_WARNING: &str = "Using this node in a realtime graph is not supported.";
pub(crate) const CUBE_WARNING: &str = "Using cube maps with this node is not supported.";

/// Graph sink: copies its input into a texture it owns and decides the export format.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputNode {
    /// Build a mip chain after the copy.
    pub has_mips: bool,
    /// Requested block-compressed export format.
    pub compression: Option<CompressionFormat>,
}

impl OutputNode {
    pub(crate) fn process(&self, ctx: &mut ProcessCtx<'_>) -> TexflowResult<bool> {
        if ctx.realtime {
            ctx.warn(REALTIME_WARNING);
            return Ok(false);
        }
        ctx.clear_warning(REALTIME_WARNING);
        if ctx.shape.dimension == TextureDimension::Cube {
            ctx.warn(CUBE_WARNING);
            return Ok(false);
        }
        ctx.clear_warning(CUBE_WARNING);

        let Some(input) = ctx.input_texture("input") else {
            return Ok(false);
        };
        let target = ctx.target()?;
        let dst = target.write_instance();
        let (src_extent, dst_extent) = (ctx.extent(input)?, ctx.extent(dst)?);
        if src_extent == dst_extent {
            ctx.cmd.copy_texture(input, dst)?;
        } else {
            let program = ctx.program(OUTPUT_PROGRAM)?;
            let mut p = KernelParams::default();
            p.set_texture("_Input", input).set_texture("_Output", dst);
            ctx.cmd.dispatch(&program, "Resample", &p, dst_extent)?;
        }
        if self.has_mips {
            ctx.cmd.generate_mips(dst);
        }

        let format = match self.compression {
            Some(requested) => {
                let decided = ctx.resources.support().resolve_export(requested)?;
                if decided != ExportFormat::Compressed(requested) {
                    warn!(
                        node = %ctx.node,
                        ?requested,
                        ?decided,
                        "compressed export unavailable, using fallback"
                    );
                }
                decided
            }
            None => ExportFormat::Uncompressed(target.format()),
        };
        ctx.events.push(GraphEvent::ExportDecided {
            node: ctx.node,
            format,
        });

        if target.is_double_buffered() {
            let key = ctx.key();
            ctx.resources.swap(key)?;
        }
        let published = ctx.target()?.read_instance();
        ctx.set_output("output", PortValue::Texture(published));
        Ok(true)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/output.rs"]
mod tests;
