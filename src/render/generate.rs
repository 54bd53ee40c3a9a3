use crate::foundation::core::Extent3;
use crate::foundation::error::{TexflowError, TexflowResult};
use crate::foundation::math::{lattice_hash01, smoothstep01};
use crate::render::cpu::KernelCtx;
use crate::texture::storage::Texture;

fn uvw(e: Extent3, x: u32, y: u32, z: u32) -> [f32; 3] {
    [
        (x as f32 + 0.5) / e.width as f32,
        (y as f32 + 0.5) / e.height as f32,
        (z as f32 + 0.5) / e.depth as f32,
    ]
}

pub(crate) fn uniform(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let color = ctx.vector("_Color")?;
    ctx.for_each_texel(out, |_, _, _| color);
    Ok(())
}

pub(crate) fn checker(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let cells = ctx.int("_Cells")?;
    if cells <= 0 {
        return Err(TexflowError::dispatch("checker '_Cells' must be > 0"));
    }
    let a = ctx.vector("_ColorA")?;
    let b = ctx.vector("_ColorB")?;
    let e = out.extent();

    ctx.for_each_texel(out, |x, y, z| {
        let [u, v, w] = uvw(e, x, y, z);
        let n = cells as f32;
        let depth_cell = if e.depth > 1 { (w * n) as i64 } else { 0 };
        let parity = ((u * n) as i64 + (v * n) as i64 + depth_cell) & 1;
        if parity == 0 { a } else { b }
    });
    Ok(())
}

/// Background with a disc of `_Radius` texels around `_Center` (normalized). A radius of 0 seeds
/// the single texel containing the center.
pub(crate) fn dot(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let center = ctx.vector("_Center")?;
    let color = ctx.vector("_Color")?;
    let background = ctx.vector("_Background")?;
    let radius = ctx.float("_Radius")?.max(0.0);
    let e = out.extent();
    let c = [
        (center[0] * e.width as f32).floor().clamp(0.0, (e.width - 1) as f32),
        (center[1] * e.height as f32).floor().clamp(0.0, (e.height - 1) as f32),
        (center[2] * e.depth as f32).floor().clamp(0.0, (e.depth - 1) as f32),
    ];

    ctx.for_each_texel(out, |x, y, z| {
        let dx = x as f32 - c[0];
        let dy = y as f32 - c[1];
        let dz = z as f32 - c[2];
        if (dx * dx + dy * dy + dz * dz).sqrt() <= radius {
            color
        } else {
            background
        }
    });
    Ok(())
}

/// Smooth value noise over a `_Frequency`-cell lattice, hashed from `_Seed`.
pub(crate) fn noise(ctx: &KernelCtx<'_>, out: &mut Texture) -> TexflowResult<()> {
    let frequency = ctx.float("_Frequency")?.max(f32::EPSILON);
    let seed = u64::from(ctx.int("_Seed")? as u32);
    let e = out.extent();

    ctx.for_each_texel(out, |x, y, z| {
        let [u, v, w] = uvw(e, x, y, z);
        let (px, py) = (u * frequency, v * frequency);
        let pz = if e.depth > 1 { w * frequency } else { 0.0 };
        let (x0, y0, z0) = (px.floor(), py.floor(), pz.floor());
        let (tx, ty, tz) = (
            smoothstep01(px - x0),
            smoothstep01(py - y0),
            smoothstep01(pz - z0),
        );
        let (ix, iy, iz) = (x0 as i32, y0 as i32, z0 as i32);
        let h = |dx: i32, dy: i32, dz: i32| lattice_hash01(seed, ix + dx, iy + dy, iz + dz);
        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
        let plane = |dz: i32| {
            lerp(
                lerp(h(0, 0, dz), h(1, 0, dz), tx),
                lerp(h(0, 1, dz), h(1, 1, dz), tx),
                ty,
            )
        };
        let n = lerp(plane(0), plane(1), tz);
        [n, n, n, 1.0]
    });
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/generate.rs"]
mod tests;
