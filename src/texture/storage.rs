use serde::{Deserialize, Serialize};

use crate::foundation::core::Extent3;
use crate::foundation::error::{TexflowError, TexflowResult};
use crate::texture::format::{TextureDimension, TextureFormat};

/// Addressing mode for out-of-range texel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    /// Tile the texture.
    #[default]
    Repeat,
    /// Clamp to the edge texel.
    Clamp,
    /// Tile with every other repetition mirrored.
    Mirror,
}

impl WrapMode {
    fn apply(self, c: i64, len: u32) -> i64 {
        let len = i64::from(len.max(1));
        match self {
            Self::Repeat => c.rem_euclid(len),
            Self::Clamp => c.clamp(0, len - 1),
            Self::Mirror => {
                let period = len * 2;
                let m = c.rem_euclid(period);
                if m < len { m } else { period - 1 - m }
            }
        }
    }
}

/// Sampling filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Nearest texel.
    Point,
    /// Linear interpolation between the four nearest texels of a slice.
    #[default]
    Bilinear,
}

/// Mip chain request for a render target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MipOptions {
    /// Allocate a full mip chain.
    pub has_mips: bool,
    /// Regenerate the chain whenever level 0 is written through a command buffer.
    pub auto_generate: bool,
}

/// Everything that identifies the allocation of a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    /// Logical extent (cube maps report `width == height == depth`).
    pub extent: Extent3,
    /// Storage format.
    pub format: TextureFormat,
    /// Texture dimension.
    pub dimension: TextureDimension,
    /// Addressing mode used by sampling helpers.
    pub wrap: WrapMode,
    /// Filter used by sampling helpers.
    pub filter: FilterMode,
    /// Mip chain options.
    pub mips: MipOptions,
}

impl TextureDesc {
    /// Extent of the texel storage: cube maps store six `width x width` faces.
    pub fn storage_extent(&self) -> Extent3 {
        match self.dimension {
            TextureDimension::Texture2D => Extent3::new(self.extent.width, self.extent.height, 1),
            TextureDimension::Texture3D => self.extent,
            TextureDimension::Cube => Extent3::new(self.extent.width, self.extent.width, 6),
        }
    }

    /// Number of mip levels, level 0 included.
    pub fn mip_count(&self) -> u32 {
        if !self.mips.has_mips {
            return 1;
        }
        let e = self.storage_extent();
        let largest = e.width.max(e.height).max(1);
        largest.ilog2() + 1
    }

    /// Approximate allocation size in bytes (level 0 only).
    pub fn byte_len(&self) -> usize {
        self.storage_extent()
            .texel_count()
            .saturating_mul(self.format.texel_bytes())
    }
}

/// CPU-resident texture: `f32` RGBA texels, quantized to the declared format on store.
#[derive(Clone, Debug)]
pub struct Texture {
    desc: TextureDesc,
    texels: Vec<[f32; 4]>,
    mips: Vec<Vec<[f32; 4]>>,
}

impl Texture {
    /// Allocate a zero-filled texture.
    pub fn new(desc: TextureDesc) -> Self {
        let texels = vec![[0.0; 4]; desc.storage_extent().texel_count()];
        Self {
            desc,
            texels,
            mips: Vec::new(),
        }
    }

    /// Allocation descriptor.
    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    /// Storage extent (see [`TextureDesc::storage_extent`]).
    pub fn extent(&self) -> Extent3 {
        self.desc.storage_extent()
    }

    /// Storage format.
    pub fn format(&self) -> TextureFormat {
        self.desc.format
    }

    /// All level-0 texels, x-major then y then z.
    pub fn texels(&self) -> &[[f32; 4]] {
        &self.texels
    }

    pub(crate) fn texels_mut(&mut self) -> &mut [[f32; 4]] {
        &mut self.texels
    }

    /// Change size only, keeping format, dimension and sampler state. Contents are cleared.
    pub(crate) fn resize_in_place(&mut self, extent: Extent3) {
        self.desc.extent = extent;
        let n = self.desc.storage_extent().texel_count();
        self.texels.clear();
        self.texels.resize(n, [0.0; 4]);
        self.mips.clear();
    }

    /// Update sampler and mip state without touching texels.
    pub(crate) fn set_sampling(&mut self, wrap: WrapMode, filter: FilterMode, mips: MipOptions) {
        self.desc.wrap = wrap;
        self.desc.filter = filter;
        if self.desc.mips != mips {
            self.mips.clear();
        }
        self.desc.mips = mips;
    }

    fn index(&self, x: u32, y: u32, z: u32) -> usize {
        let e = self.extent();
        ((z as usize * e.height as usize) + y as usize) * e.width as usize + x as usize
    }

    /// Read a texel; coordinates outside the storage extent are clamped.
    pub fn load(&self, x: i64, y: i64, z: i64) -> [f32; 4] {
        let e = self.extent();
        let cx = x.clamp(0, i64::from(e.width) - 1) as u32;
        let cy = y.clamp(0, i64::from(e.height) - 1) as u32;
        let cz = z.clamp(0, i64::from(e.depth) - 1) as u32;
        self.texels[self.index(cx, cy, cz)]
    }

    /// Read a texel honoring the texture's wrap mode.
    pub fn load_wrapped(&self, x: i64, y: i64, z: i64) -> [f32; 4] {
        let e = self.extent();
        let w = self.desc.wrap;
        let cx = w.apply(x, e.width) as u32;
        let cy = w.apply(y, e.height) as u32;
        let cz = w.apply(z, e.depth) as u32;
        self.texels[self.index(cx, cy, cz)]
    }

    /// Write a texel, quantized to the storage format. Out-of-range writes are ignored.
    pub fn store(&mut self, x: u32, y: u32, z: u32, v: [f32; 4]) {
        if !self
            .extent()
            .contains(i64::from(x), i64::from(y), i64::from(z))
        {
            return;
        }
        let i = self.index(x, y, z);
        self.texels[i] = self.desc.format.quantize(v);
    }

    /// Sample slice `z` at normalized `(u, v)` with the texture's filter and wrap modes.
    pub fn sample(&self, u: f32, v: f32, z: u32) -> [f32; 4] {
        let e = self.extent();
        let fx = u * e.width as f32 - 0.5;
        let fy = v * e.height as f32 - 0.5;
        let z = i64::from(z);
        match self.desc.filter {
            FilterMode::Point => self.load_wrapped(fx.round() as i64, fy.round() as i64, z),
            FilterMode::Bilinear => {
                let x0 = fx.floor();
                let y0 = fy.floor();
                let tx = fx - x0;
                let ty = fy - y0;
                let (x0, y0) = (x0 as i64, y0 as i64);
                let a = self.load_wrapped(x0, y0, z);
                let b = self.load_wrapped(x0 + 1, y0, z);
                let c = self.load_wrapped(x0, y0 + 1, z);
                let d = self.load_wrapped(x0 + 1, y0 + 1, z);
                let mut out = [0.0; 4];
                for i in 0..4 {
                    let top = a[i] + (b[i] - a[i]) * tx;
                    let bottom = c[i] + (d[i] - c[i]) * tx;
                    out[i] = top + (bottom - top) * ty;
                }
                out
            }
        }
    }

    /// Fill every level-0 texel.
    pub fn fill(&mut self, v: [f32; 4]) {
        let q = self.desc.format.quantize(v);
        self.texels.fill(q);
        self.mips.clear();
    }

    /// Copy texels from a texture of the same storage extent, converting formats.
    pub fn copy_from(&mut self, src: &Self) -> TexflowResult<()> {
        if src.extent() != self.extent() {
            return Err(TexflowError::dispatch(format!(
                "copy extent mismatch: {:?} -> {:?}",
                src.extent(),
                self.extent()
            )));
        }
        let format = self.desc.format;
        if format == src.desc.format {
            self.texels.copy_from_slice(&src.texels);
        } else {
            for (dst, s) in self.texels.iter_mut().zip(src.texels.iter()) {
                *dst = format.quantize(*s);
            }
        }
        self.mips.clear();
        Ok(())
    }

    /// Rebuild levels 1.. with a 2x2 box filter per slice.
    pub fn generate_mips(&mut self) {
        self.mips.clear();
        let levels = self.desc.mip_count();
        let e = self.extent();
        let (mut w, mut h) = (e.width as usize, e.height as usize);
        let depth = e.depth as usize;
        let format = self.desc.format;

        for level in 1..levels {
            let prev: &[[f32; 4]] = if level == 1 {
                &self.texels
            } else {
                &self.mips[level as usize - 2]
            };
            let nw = (w / 2).max(1);
            let nh = (h / 2).max(1);
            let mut next = vec![[0.0f32; 4]; nw * nh * depth];
            for z in 0..depth {
                for y in 0..nh {
                    for x in 0..nw {
                        let mut acc = [0.0f32; 4];
                        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                            let sx = (x * 2 + dx).min(w - 1);
                            let sy = (y * 2 + dy).min(h - 1);
                            let t = prev[(z * h + sy) * w + sx];
                            for c in 0..4 {
                                acc[c] += t[c] * 0.25;
                            }
                        }
                        next[(z * nh + y) * nw + x] = format.quantize(acc);
                    }
                }
            }
            self.mips.push(next);
            w = nw;
            h = nh;
        }
    }

    /// Generated mip level `level` (0 is the base level), if present.
    pub fn mip(&self, level: u32) -> Option<&[[f32; 4]]> {
        if level == 0 {
            return Some(&self.texels);
        }
        self.mips.get(level as usize - 1).map(Vec::as_slice)
    }

    /// Slice `z` as tightly packed RGBA8 (clamped, no color-space conversion).
    pub fn slice_rgba8(&self, z: u32) -> TexflowResult<Vec<u8>> {
        let e = self.extent();
        if z >= e.depth {
            return Err(TexflowError::validation(format!(
                "slice {z} out of range (depth {})",
                e.depth
            )));
        }
        let start = self.index(0, 0, z);
        let len = (e.width as usize) * (e.height as usize);
        let mut out = Vec::with_capacity(len * 4);
        for t in &self.texels[start..start + len] {
            for c in t {
                out.push((c.clamp(0.0, 1.0) * 255.0).round() as u8);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/texture/storage.rs"]
mod tests;
