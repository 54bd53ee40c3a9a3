//! Jump-flood distance kernels.
//!
//! Feature maps store the normalized texel-center coordinate of the nearest seed in `xyz` and a
//! validity flag in `w`. Distances are measured in texels of the flooded texture.

use crate::foundation::core::Rgba;
use crate::foundation::error::{TexflowError, TexflowResult};
use crate::foundation::math::saturate;
use crate::render::cpu::KernelCtx;
use crate::texture::storage::Texture;

/// Texel written where no feature has been found yet.
pub const NO_FEATURE: [f32; 4] = [-1.0, -1.0, -1.0, 0.0];

/// Channel selection compared against `_Threshold` when seeding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Rec. 709 luminance.
    #[default]
    Luminance,
    /// Red channel.
    R,
    /// Green channel.
    G,
    /// Blue channel.
    B,
    /// Alpha channel.
    A,
    /// Any color channel.
    Rgb,
    /// Any channel.
    Rgba,
}

impl ThresholdMode {
    /// Kernel parameter encoding.
    pub fn code(self) -> i32 {
        self as i32
    }

    fn from_code(code: i32) -> TexflowResult<Self> {
        Ok(match code {
            0 => Self::Luminance,
            1 => Self::R,
            2 => Self::G,
            3 => Self::B,
            4 => Self::A,
            5 => Self::Rgb,
            6 => Self::Rgba,
            _ => {
                return Err(TexflowError::dispatch(format!(
                    "invalid _ThresholdMode {code}"
                )));
            }
        })
    }

    /// Return `true` when the texel is selected as a seed.
    pub fn passes(self, t: [f32; 4], threshold: f32) -> bool {
        match self {
            Self::Luminance => Rgba::from_array(t).luminance() > threshold,
            Self::R => t[0] > threshold,
            Self::G => t[1] > threshold,
            Self::B => t[2] > threshold,
            Self::A => t[3] > threshold,
            Self::Rgb => t[..3].iter().any(|&c| c > threshold),
            Self::Rgba => t.iter().any(|&c| c > threshold),
        }
    }
}

/// Metric used to compare candidate features.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Straight-line distance.
    #[default]
    Euclidean,
    /// Sum of axis distances.
    Manhattan,
    /// Largest axis distance.
    Chebyshev,
}

impl DistanceMetric {
    /// Kernel parameter encoding.
    pub fn code(self) -> i32 {
        self as i32
    }

    fn from_code(code: i32) -> TexflowResult<Self> {
        Ok(match code {
            0 => Self::Euclidean,
            1 => Self::Manhattan,
            2 => Self::Chebyshev,
            _ => {
                return Err(TexflowError::dispatch(format!(
                    "invalid _DistanceMode {code}"
                )));
            }
        })
    }

    /// Distance of a texel-space delta.
    pub fn measure(self, d: [f32; 3]) -> f32 {
        let [x, y, z] = d.map(f32::abs);
        match self {
            Self::Euclidean => (x * x + y * y + z * z).sqrt(),
            Self::Manhattan => x + y + z,
            Self::Chebyshev => x.max(y).max(z),
        }
    }
}

/// What the final pass writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceOutput {
    /// Blend the nearest seed's color over the input, fading with distance.
    #[default]
    InputBlend,
    /// The nearest seed's color with alpha fading with distance.
    InputOnly,
    /// White inside the distance, alpha fading with distance.
    Mask,
    /// The nearest seed's normalized coordinate, alpha fading with distance.
    Uv,
}

impl DistanceOutput {
    /// Kernel parameter encoding.
    pub fn code(self) -> i32 {
        self as i32
    }

    fn from_code(code: i32) -> TexflowResult<Self> {
        Ok(match code {
            0 => Self::InputBlend,
            1 => Self::InputOnly,
            2 => Self::Mask,
            3 => Self::Uv,
            _ => return Err(TexflowError::dispatch(format!("invalid _Mode {code}"))),
        })
    }
}

/// Offsets of the flood passes for an input of the given width, largest first.
///
/// `maxLevels = floor(log2(width))`, then `2^(maxLevels - i)` for `i` in `0..=maxLevels`.
pub fn flood_offsets(input_width: u32) -> Vec<u32> {
    let max_levels = input_width.max(1).ilog2();
    (0..=max_levels).map(|i| 1u32 << (max_levels - i)).collect()
}

struct Grid {
    w: f32,
    h: f32,
    d: f32,
}

impl Grid {
    fn of(t: &Texture) -> Self {
        let e = t.extent();
        Self {
            w: e.width as f32,
            h: e.height as f32,
            d: e.depth as f32,
        }
    }

    fn center_uv(&self, x: u32, y: u32, z: u32) -> [f32; 3] {
        [
            (x as f32 + 0.5) / self.w,
            (y as f32 + 0.5) / self.h,
            (z as f32 + 0.5) / self.d,
        ]
    }

    fn texel_delta(&self, from: [f32; 3], to: [f32; 4]) -> [f32; 3] {
        [
            (to[0] - from[0]) * self.w,
            (to[1] - from[1]) * self.h,
            (to[2] - from[2]) * self.d,
        ]
    }
}

fn is_feature(t: [f32; 4]) -> bool {
    t[3] > 0.5
}

fn scaled(c: u32, scale: f32) -> i64 {
    (c as f32 * scale).floor() as i64
}

/// Seed pass: selected texels store their own coordinate, the rest [`NO_FEATURE`].
pub(crate) fn fill_uv_map(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let input = ctx.read("_Input")?;
    let threshold = ctx.float("_Threshold")?;
    let scale = ctx.float("_InputScaleFactor")?;
    let mode = ThresholdMode::from_code(ctx.int("_ThresholdMode")?)?;
    let grid = Grid::of(out);

    ctx.for_each_texel(out, |x, y, z| {
        let src = input.load(scaled(x, scale), scaled(y, scale), scaled(z, scale));
        if mode.passes(src, threshold) {
            let [u, v, w] = grid.center_uv(x, y, z);
            [u, v, w, 1.0]
        } else {
            NO_FEATURE
        }
    });
    Ok(())
}

/// One flood pass at `_Offset`: keep the nearest feature among self and the 8 (2D) or 26 (3D)
/// neighbors at `±offset`. Ties keep the earlier candidate.
pub(crate) fn jump_flooding(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let input = ctx.read("_Input")?;
    let offset = ctx.float("_Offset")?.round() as i64;
    let metric = DistanceMetric::from_code(ctx.int("_DistanceMode")?)?;
    if input.extent() != out.extent() {
        return Err(TexflowError::dispatch(
            "jump flooding requires matching read and write extents",
        ));
    }
    let extent = out.extent();
    let grid = Grid::of(out);
    let z_range: &[i64] = if extent.depth > 1 { &[-1, 0, 1] } else { &[0] };

    ctx.for_each_texel(out, |x, y, z| {
        let p = grid.center_uv(x, y, z);
        let mut best = input.load(i64::from(x), i64::from(y), i64::from(z));
        let mut best_d = if is_feature(best) {
            metric.measure(grid.texel_delta(p, best))
        } else {
            f32::INFINITY
        };

        for &dz in z_range {
            for dy in [-1i64, 0, 1] {
                for dx in [-1i64, 0, 1] {
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    let qx = i64::from(x) + dx * offset;
                    let qy = i64::from(y) + dy * offset;
                    let qz = i64::from(z) + dz * offset;
                    if !extent.contains(qx, qy, qz) {
                        continue;
                    }
                    let candidate = input.load(qx, qy, qz);
                    if !is_feature(candidate) {
                        continue;
                    }
                    let d = metric.measure(grid.texel_delta(p, candidate));
                    if d < best_d {
                        best = candidate;
                        best_d = d;
                    }
                }
            }
        }

        if best_d.is_finite() { best } else { NO_FEATURE }
    });
    Ok(())
}

/// Final pass: combine the original input with the converged feature map.
pub(crate) fn final_pass(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let input = ctx.read("_Input")?;
    let features = ctx.read("_Output")?;
    let scale = ctx.float("_InputScaleFactor")?;
    let size = ctx.vector("_Size")?;
    let max_d = ctx.float("_Distance")? * size[0];
    let metric = DistanceMetric::from_code(ctx.int("_DistanceMode")?)?;
    let mode = DistanceOutput::from_code(ctx.int("_Mode")?)?;
    let grid = Grid::of(features);
    let in_extent = input.extent();

    ctx.for_each_texel(out, |x, y, z| {
        let here = input.load(scaled(x, scale), scaled(y, scale), scaled(z, scale));
        let feature = features.load(i64::from(x), i64::from(y), i64::from(z));
        if !is_feature(feature) {
            return match mode {
                DistanceOutput::InputBlend => here,
                _ => [0.0; 4],
            };
        }

        let d = metric.measure(grid.texel_delta(grid.center_uv(x, y, z), feature));
        let t = if max_d > 0.0 {
            saturate(d / max_d)
        } else if d > 0.0 {
            1.0
        } else {
            0.0
        };
        let fade = 1.0 - t;
        let seed_color = || {
            input.load(
                (feature[0] * in_extent.width as f32).floor() as i64,
                (feature[1] * in_extent.height as f32).floor() as i64,
                (feature[2] * in_extent.depth as f32).floor() as i64,
            )
        };

        match mode {
            DistanceOutput::InputBlend => Rgba::from_array(here)
                .lerp(Rgba::from_array(seed_color()), fade)
                .to_array(),
            DistanceOutput::InputOnly => {
                if t >= 1.0 {
                    [0.0; 4]
                } else {
                    let c = seed_color();
                    [c[0], c[1], c[2], c[3] * fade]
                }
            }
            DistanceOutput::Mask => {
                let inside = if d < max_d { 1.0 } else { 0.0 };
                [inside, inside, inside, fade]
            }
            DistanceOutput::Uv => [feature[0], feature[1], feature[2], fade],
        }
    });
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/jfa.rs"]
mod tests;
