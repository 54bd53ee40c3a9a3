use serde::{Deserialize, Serialize};

use crate::foundation::error::{TexflowError, TexflowResult};

/// Concrete texture dimension of an allocated resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureDimension {
    /// Two-dimensional texture.
    #[serde(rename = "texture_2d")]
    Texture2D,
    /// Volume texture.
    #[serde(rename = "texture_3d")]
    Texture3D,
    /// Cube map (six square faces).
    Cube,
}

impl TextureDimension {
    /// Number of array layers backing the dimension (6 faces for cube maps).
    pub fn layer_count(self) -> u32 {
        match self {
            Self::Texture2D | Self::Texture3D => 1,
            Self::Cube => 6,
        }
    }
}

impl std::fmt::Display for TextureDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Texture2D => write!(f, "Texture2D"),
            Self::Texture3D => write!(f, "Texture3D"),
            Self::Cube => write!(f, "Cube"),
        }
    }
}

/// Channel layout requested by node settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputChannel {
    /// Inherit the graph output's channel layout.
    #[default]
    SameAsOutput,
    /// Four channels.
    Rgba,
    /// Two channels.
    Rg,
    /// One channel.
    R,
}

/// Precision requested by node settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputPrecision {
    /// Inherit the graph output's precision.
    #[default]
    SameAsOutput,
    /// 8-bit unsigned normalized.
    Ldr,
    /// 16-bit float.
    Half,
    /// 32-bit float.
    Full,
}

/// Concrete channel count of a format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channels {
    /// One channel.
    R,
    /// Two channels.
    Rg,
    /// Four channels.
    Rgba,
}

impl Channels {
    /// Number of stored channels.
    pub fn count(self) -> usize {
        match self {
            Self::R => 1,
            Self::Rg => 2,
            Self::Rgba => 4,
        }
    }
}

/// Concrete per-channel precision of a format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Precision {
    /// 8-bit unsigned normalized.
    Unorm8,
    /// IEEE binary16.
    Float16,
    /// IEEE binary32.
    Float32,
}

impl Precision {
    fn bytes(self) -> usize {
        match self {
            Self::Unorm8 => 1,
            Self::Float16 => 2,
            Self::Float32 => 4,
        }
    }

    fn higher(self) -> Option<Self> {
        match self {
            Self::Unorm8 => Some(Self::Float16),
            Self::Float16 => Some(Self::Float32),
            Self::Float32 => None,
        }
    }
}

/// Uncompressed texture formats a render target can be allocated with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFormat {
    /// Single channel, 8-bit unorm.
    R8Unorm,
    /// Two channels, 8-bit unorm.
    Rg8Unorm,
    /// Four channels, 8-bit unorm.
    Rgba8Unorm,
    /// Single channel, half float.
    R16Float,
    /// Two channels, half float.
    Rg16Float,
    /// Four channels, half float.
    Rgba16Float,
    /// Single channel, float.
    R32Float,
    /// Two channels, float.
    Rg32Float,
    /// Four channels, float.
    Rgba32Float,
}

impl TextureFormat {
    /// Every format, in fallback-table order.
    pub const ALL: [Self; 9] = [
        Self::R8Unorm,
        Self::Rg8Unorm,
        Self::Rgba8Unorm,
        Self::R16Float,
        Self::Rg16Float,
        Self::Rgba16Float,
        Self::R32Float,
        Self::Rg32Float,
        Self::Rgba32Float,
    ];

    /// Combine a channel layout and a precision.
    pub fn from_parts(channels: Channels, precision: Precision) -> Self {
        match (channels, precision) {
            (Channels::R, Precision::Unorm8) => Self::R8Unorm,
            (Channels::Rg, Precision::Unorm8) => Self::Rg8Unorm,
            (Channels::Rgba, Precision::Unorm8) => Self::Rgba8Unorm,
            (Channels::R, Precision::Float16) => Self::R16Float,
            (Channels::Rg, Precision::Float16) => Self::Rg16Float,
            (Channels::Rgba, Precision::Float16) => Self::Rgba16Float,
            (Channels::R, Precision::Float32) => Self::R32Float,
            (Channels::Rg, Precision::Float32) => Self::Rg32Float,
            (Channels::Rgba, Precision::Float32) => Self::Rgba32Float,
        }
    }

    /// Channel layout of the format.
    pub fn channels(self) -> Channels {
        match self {
            Self::R8Unorm | Self::R16Float | Self::R32Float => Channels::R,
            Self::Rg8Unorm | Self::Rg16Float | Self::Rg32Float => Channels::Rg,
            Self::Rgba8Unorm | Self::Rgba16Float | Self::Rgba32Float => Channels::Rgba,
        }
    }

    /// Per-channel precision of the format.
    pub fn precision(self) -> Precision {
        match self {
            Self::R8Unorm | Self::Rg8Unorm | Self::Rgba8Unorm => Precision::Unorm8,
            Self::R16Float | Self::Rg16Float | Self::Rgba16Float => Precision::Float16,
            Self::R32Float | Self::Rg32Float | Self::Rgba32Float => Precision::Float32,
        }
    }

    /// Bytes per texel.
    pub fn texel_bytes(self) -> usize {
        self.channels().count() * self.precision().bytes()
    }

    /// Resolve settings-level channel/precision requests against the graph output format.
    pub fn resolve(channels: OutputChannel, precision: OutputPrecision, root: Self) -> Self {
        let channels = match channels {
            OutputChannel::SameAsOutput => root.channels(),
            OutputChannel::Rgba => Channels::Rgba,
            OutputChannel::Rg => Channels::Rg,
            OutputChannel::R => Channels::R,
        };
        let precision = match precision {
            OutputPrecision::SameAsOutput => root.precision(),
            OutputPrecision::Ldr => Precision::Unorm8,
            OutputPrecision::Half => Precision::Float16,
            OutputPrecision::Full => Precision::Float32,
        };
        Self::from_parts(channels, precision)
    }

    /// Quantize a texel the way storing it in this format would.
    ///
    /// Missing channels read back as 0 (color) and 1 (alpha).
    pub fn quantize(self, v: [f32; 4]) -> [f32; 4] {
        let q = |c: f32| match self.precision() {
            Precision::Unorm8 => {
                let c = if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) };
                (c * 255.0).round() / 255.0
            }
            Precision::Float16 => half::f16::from_f32(c).to_f32(),
            Precision::Float32 => c,
        };
        match self.channels() {
            Channels::R => [q(v[0]), 0.0, 0.0, 1.0],
            Channels::Rg => [q(v[0]), q(v[1]), 0.0, 1.0],
            Channels::Rgba => [q(v[0]), q(v[1]), q(v[2]), q(v[3])],
        }
    }
}

/// Block-compressed export formats an output node may request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionFormat {
    /// BC1 / DXT1.
    Dxt1,
    /// BC3 / DXT5.
    Dxt5,
    /// Shared-exponent HDR.
    Rgb9e5Float,
    /// Single channel BC4.
    Bc4,
    /// Two channel BC5.
    Bc5,
    /// HDR BC6H.
    Bc6h,
    /// BC7.
    Bc7,
    /// ETC2 RGB.
    Etc2Rgb,
    /// ETC2 RGBA.
    Etc2Rgba8,
    /// EAC single channel.
    EacR,
    /// EAC two channel.
    EacRg,
    /// ASTC 4x4 LDR.
    Astc4x4,
    /// ASTC 8x8 LDR.
    Astc8x8,
    /// ASTC 4x4 HDR.
    AstcHdr4x4,
}

impl CompressionFormat {
    /// Uncompressed format used when the compressed one is unavailable.
    pub fn uncompressed_fallback(self) -> TextureFormat {
        match self {
            Self::Bc4 | Self::EacR => TextureFormat::R8Unorm,
            Self::Bc5 | Self::EacRg => TextureFormat::Rg8Unorm,
            Self::Bc6h | Self::Rgb9e5Float | Self::AstcHdr4x4 => TextureFormat::Rgba16Float,
            Self::Dxt1
            | Self::Dxt5
            | Self::Bc7
            | Self::Etc2Rgb
            | Self::Etc2Rgba8
            | Self::Astc4x4
            | Self::Astc8x8 => TextureFormat::Rgba8Unorm,
        }
    }
}

/// Export format decided for an output texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "format")]
pub enum ExportFormat {
    /// Keep the compressed format.
    Compressed(CompressionFormat),
    /// Uncompressed format.
    Uncompressed(TextureFormat),
}

/// Formats the active compute device can allocate and encode.
///
/// `Rgba32Float` is always supported: it terminates every fallback chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatSupport {
    textures: Vec<TextureFormat>,
    compressed: Vec<CompressionFormat>,
}

impl Default for FormatSupport {
    fn default() -> Self {
        Self::all()
    }
}

impl FormatSupport {
    /// Every uncompressed format, no compressed formats (the CPU device cannot encode blocks).
    pub fn all() -> Self {
        Self {
            textures: TextureFormat::ALL.to_vec(),
            compressed: Vec::new(),
        }
    }

    /// Restrict to an explicit list. `Rgba32Float` is added when missing.
    pub fn with_textures(textures: impl IntoIterator<Item = TextureFormat>) -> Self {
        let mut textures: Vec<TextureFormat> = textures.into_iter().collect();
        if !textures.contains(&TextureFormat::Rgba32Float) {
            textures.push(TextureFormat::Rgba32Float);
        }
        Self {
            textures,
            compressed: Vec::new(),
        }
    }

    /// Declare compressed formats as encodable.
    pub fn with_compressed(mut self, formats: impl IntoIterator<Item = CompressionFormat>) -> Self {
        self.compressed.extend(formats);
        self
    }

    /// Return `true` when the format can be allocated directly.
    pub fn supports(&self, format: TextureFormat) -> bool {
        self.textures.contains(&format)
    }

    /// Return `true` when the compressed format can be encoded.
    pub fn supports_compressed(&self, format: CompressionFormat) -> bool {
        self.compressed.contains(&format)
    }

    /// Pick the allocation format for a request.
    ///
    /// Order: the request itself, same channels at higher precision, RGBA at the same or higher
    /// precision, then `Rgba32Float`.
    pub fn resolve(&self, requested: TextureFormat) -> TexflowResult<TextureFormat> {
        if self.supports(requested) {
            return Ok(requested);
        }
        for candidate in fallback_chain(requested) {
            if self.supports(candidate) {
                return Ok(candidate);
            }
        }
        Err(TexflowError::unsupported_format(format!(
            "no supported fallback for {requested:?}"
        )))
    }

    /// Pick the export format for a compressed request.
    pub fn resolve_export(&self, requested: CompressionFormat) -> TexflowResult<ExportFormat> {
        if self.supports_compressed(requested) {
            return Ok(ExportFormat::Compressed(requested));
        }
        self.resolve(requested.uncompressed_fallback())
            .map(ExportFormat::Uncompressed)
    }
}

fn fallback_chain(requested: TextureFormat) -> Vec<TextureFormat> {
    let channels = requested.channels();
    let mut out = Vec::with_capacity(6);

    let mut p = requested.precision().higher();
    while let Some(precision) = p {
        out.push(TextureFormat::from_parts(channels, precision));
        p = precision.higher();
    }

    if channels != Channels::Rgba {
        let mut p = Some(requested.precision());
        while let Some(precision) = p {
            out.push(TextureFormat::from_parts(Channels::Rgba, precision));
            p = precision.higher();
        }
    }

    if !out.contains(&TextureFormat::Rgba32Float) {
        out.push(TextureFormat::Rgba32Float);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/texture/format.rs"]
mod tests;
