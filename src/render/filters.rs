use crate::foundation::core::{Extent3, Rgba};
use crate::foundation::error::{TexflowError, TexflowResult};
use crate::foundation::math::saturate;
use crate::render::cpu::KernelCtx;
use crate::texture::storage::Texture;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Axis {
    X,
    Y,
}

/// Nearest source texel for output texel `(x, y, z)` when the two textures differ in size.
fn source_coord(c: u32, out_len: u32, in_len: u32) -> i64 {
    if out_len == in_len {
        return i64::from(c);
    }
    ((u64::from(c) * u64::from(in_len)) / u64::from(out_len.max(1))) as i64
}

fn load_scaled(input: &Texture, out: Extent3, x: u32, y: u32, z: u32) -> [f32; 4] {
    let e = input.extent();
    input.load(
        source_coord(x, out.width, e.width),
        source_coord(y, out.height, e.height),
        source_coord(z, out.depth, e.depth),
    )
}

pub(crate) fn gaussian_weights(radius: u32) -> TexflowResult<Vec<f32>> {
    if radius == 0 {
        return Ok(vec![1.0]);
    }
    let r = radius as i32;
    let sigma = (radius as f64 / 2.0).max(0.5);
    let denom = 2.0 * sigma * sigma;
    let raw: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    if sum <= 0.0 {
        return Err(TexflowError::dispatch("gaussian kernel sum is zero"));
    }
    Ok(raw.iter().map(|w| (w / sum) as f32).collect())
}

/// One separable gaussian pass along `axis`, edge texels clamped.
pub(crate) fn blur(ctx: &KernelCtx<'_>, out: &mut Texture, axis: Axis) -> TexflowResult<()> {
    let input = ctx.read("_Input")?;
    let radius = ctx.float("_Radius")?;
    if !radius.is_finite() || radius < 0.0 {
        return Err(TexflowError::dispatch("blur radius must be finite and >= 0"));
    }
    let weights = gaussian_weights(radius.round() as u32)?;
    let half = (weights.len() / 2) as i64;
    let out_extent = out.extent();
    let in_extent = input.extent();

    ctx.for_each_texel(out, |x, y, z| {
        let sx = source_coord(x, out_extent.width, in_extent.width);
        let sy = source_coord(y, out_extent.height, in_extent.height);
        let sz = source_coord(z, out_extent.depth, in_extent.depth);
        let mut acc = [0.0f32; 4];
        for (i, w) in weights.iter().enumerate() {
            let d = i as i64 - half;
            let t = match axis {
                Axis::X => input.load(sx + d, sy, sz),
                Axis::Y => input.load(sx, sy + d, sz),
            };
            for c in 0..4 {
                acc[c] += t[c] * w;
            }
        }
        acc
    });
    Ok(())
}

fn rgb_to_hsv([r, g, b]: [f32; 3]) -> [f32; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let h = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        ((g - b) / delta).rem_euclid(6.0) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };
    let s = if max <= 0.0 { 0.0 } else { delta / max };
    [h, s, max]
}

fn hsv_to_rgb([h, s, v]: [f32; 3]) -> [f32; 3] {
    let h = h.rem_euclid(1.0) * 6.0;
    let c = v * s;
    let x = c * (1.0 - (h.rem_euclid(2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r + m, g + m, b + m]
}

/// Hue shift (in turns), saturation and value multipliers. Alpha passes through.
pub(crate) fn hsv(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let input = ctx.read("_Input")?;
    let hue = ctx.float("_Hue")?;
    let saturation = ctx.float("_Saturation")?;
    let value = ctx.float("_Value")?;
    let out_extent = out.extent();

    ctx.for_each_texel(out, |x, y, z| {
        let t = load_scaled(input, out_extent, x, y, z);
        let [h, s, v] = rgb_to_hsv([t[0], t[1], t[2]]);
        let [r, g, b] = hsv_to_rgb([h + hue, saturate(s * saturation), v * value]);
        [r, g, b, t[3]]
    });
    Ok(())
}

/// Sobel normal map from the input's luminance, packed to `[0, 1]`.
pub(crate) fn normal_from_height(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let input = ctx.read("_Input")?;
    let strength = ctx.float("_Strength")?;
    let out_extent = out.extent();
    let in_extent = input.extent();

    ctx.for_each_texel(out, |x, y, z| {
        let cx = source_coord(x, out_extent.width, in_extent.width);
        let cy = source_coord(y, out_extent.height, in_extent.height);
        let cz = i64::from(z);
        let h = |dx: i64, dy: i64| {
            Rgba::from_array(input.load_wrapped(cx + dx, cy + dy, cz)).luminance()
        };
        let gx = (h(1, -1) + 2.0 * h(1, 0) + h(1, 1)) - (h(-1, -1) + 2.0 * h(-1, 0) + h(-1, 1));
        let gy = (h(-1, 1) + 2.0 * h(0, 1) + h(1, 1)) - (h(-1, -1) + 2.0 * h(0, -1) + h(1, -1));
        let n = [-gx * strength, -gy * strength, 1.0];
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        [
            n[0] / len * 0.5 + 0.5,
            n[1] / len * 0.5 + 0.5,
            n[2] / len * 0.5 + 0.5,
            1.0,
        ]
    });
    Ok(())
}

/// Pack four grayscale masks into RGBA; unbound masks use `_Defaults`.
pub(crate) fn mask_combine(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let sources = [
        ctx.read_optional("_Metallic")?,
        ctx.read_optional("_Occlusion")?,
        ctx.read_optional("_Detail")?,
        ctx.read_optional("_Smoothness")?,
    ];
    let defaults = ctx.vector("_Defaults")?;
    let out_extent = out.extent();

    ctx.for_each_texel(out, |x, y, z| {
        let mut px = defaults;
        for (c, src) in sources.iter().enumerate() {
            if let Some(t) = src {
                px[c] = Rgba::from_array(load_scaled(t, out_extent, x, y, z)).luminance();
            }
        }
        px
    });
    Ok(())
}

/// Filtered resample of `_Input` onto the output's grid.
pub(crate) fn resample(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let input = ctx.read("_Input")?;
    let out_extent = out.extent();
    let in_extent = input.extent();

    ctx.for_each_texel(out, |x, y, z| {
        let u = (x as f32 + 0.5) / out_extent.width as f32;
        let v = (y as f32 + 0.5) / out_extent.height as f32;
        let slice = source_coord(z, out_extent.depth, in_extent.depth) as u32;
        input.sample(u, v, slice)
    });
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/filters.rs"]
mod tests;
