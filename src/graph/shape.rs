use crate::foundation::core::Extent3;
use crate::graph::settings::{OutputDimension, OutputShape, ResourceSettings, SizeMode};
use crate::texture::format::{TextureDimension, TextureFormat};

/// Concrete allocation shape of a node's render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResolvedShape {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth in texels (1 for 2D, equal to width for cube maps).
    pub depth: u32,
    /// Requested storage format, before device fallback.
    pub format: TextureFormat,
    /// Texture dimension.
    pub dimension: TextureDimension,
}

impl ResolvedShape {
    /// Logical extent.
    pub fn extent(&self) -> Extent3 {
        Extent3::new(self.width, self.height, self.depth)
    }
}

fn resolve_axis(mode: SizeMode, fixed: u32, percent: f32, root: u32) -> u32 {
    match mode {
        SizeMode::Default => root.max(1),
        SizeMode::Fixed => fixed.max(1),
        SizeMode::PercentageOfOutput => {
            let pct = if percent.is_finite() { percent.max(0.0) } else { 0.0 };
            let v = (f64::from(root) * f64::from(pct) / 100.0).round();
            (v.min(f64::from(u32::MAX)) as u32).max(1)
        }
    }
}

/// Resolve a dimension request against the graph output.
pub fn resolve_dimension(dimension: OutputDimension, root: TextureDimension) -> TextureDimension {
    match dimension {
        OutputDimension::SameAsOutput => root,
        OutputDimension::Texture2D => TextureDimension::Texture2D,
        OutputDimension::Texture3D => TextureDimension::Texture3D,
        OutputDimension::CubeMap => TextureDimension::Cube,
    }
}

/// Resolve node settings against the graph's root output shape.
///
/// Pure: the result depends only on the two arguments. Every axis is at least 1; cube maps are
/// forced square (`height == depth == width`) and 2D targets have depth 1.
pub fn resolve(settings: &ResourceSettings, root: &OutputShape) -> ResolvedShape {
    let dimension = resolve_dimension(settings.dimension, root.dimension);
    let width = resolve_axis(
        settings.width_mode,
        settings.width,
        settings.width_percent,
        root.width,
    );
    let (height, depth) = match dimension {
        TextureDimension::Cube => (width, width),
        TextureDimension::Texture2D => (
            resolve_axis(
                settings.height_mode,
                settings.height,
                settings.height_percent,
                root.height,
            ),
            1,
        ),
        TextureDimension::Texture3D => (
            resolve_axis(
                settings.height_mode,
                settings.height,
                settings.height_percent,
                root.height,
            ),
            resolve_axis(
                settings.depth_mode,
                settings.depth,
                settings.depth_percent,
                root.depth,
            ),
        ),
    };
    let format = TextureFormat::resolve(
        settings.output_channels,
        settings.output_precision,
        root.format,
    );

    ResolvedShape {
        width,
        height,
        depth,
        format,
        dimension,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/shape.rs"]
mod tests;
