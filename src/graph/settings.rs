use serde::{Deserialize, Serialize};

use crate::foundation::core::Extent3;
use crate::foundation::error::{TexflowError, TexflowResult};
use crate::texture::format::{OutputChannel, OutputPrecision, TextureDimension, TextureFormat};
use crate::texture::storage::{FilterMode, WrapMode};

/// How one axis of a node's render target is sized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeMode {
    /// Use the graph output's size on this axis.
    #[default]
    Default,
    /// Use the literal value from the settings.
    Fixed,
    /// Scale the graph output's size by a percentage.
    PercentageOfOutput,
}

/// Dimension requested by node settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputDimension {
    /// Inherit the graph output's dimension.
    #[default]
    SameAsOutput,
    /// Two-dimensional texture.
    #[serde(rename = "texture_2d")]
    Texture2D,
    /// Volume texture.
    #[serde(rename = "texture_3d")]
    Texture3D,
    /// Cube map.
    CubeMap,
}

/// Power-of-two size presets offered for fixed sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotSize {
    /// 32 texels.
    P32,
    /// 64 texels.
    P64,
    /// 128 texels.
    P128,
    /// 256 texels.
    P256,
    /// 512 texels.
    P512,
    /// 1024 texels.
    P1024,
    /// 2048 texels.
    P2048,
    /// 4096 texels.
    P4096,
    /// 8192 texels.
    P8192,
    /// Any value.
    Custom,
}

impl PotSize {
    /// Texel count of the preset, `None` for [`PotSize::Custom`].
    pub fn texels(self) -> Option<u32> {
        match self {
            Self::P32 => Some(32),
            Self::P64 => Some(64),
            Self::P128 => Some(128),
            Self::P256 => Some(256),
            Self::P512 => Some(512),
            Self::P1024 => Some(1024),
            Self::P2048 => Some(2048),
            Self::P4096 => Some(4096),
            Self::P8192 => Some(8192),
            Self::Custom => None,
        }
    }
}

/// Bitmask of the settings fields a node type lets the user edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditFlags(pub u16);

impl EditFlags {
    /// Nothing is editable.
    pub const NONE: Self = Self(0);
    /// Fixed width value.
    pub const WIDTH: Self = Self(1 << 0);
    /// Width sizing mode.
    pub const WIDTH_MODE: Self = Self(1 << 1);
    /// Fixed height value.
    pub const HEIGHT: Self = Self(1 << 2);
    /// Height sizing mode.
    pub const HEIGHT_MODE: Self = Self(1 << 3);
    /// Fixed depth value.
    pub const DEPTH: Self = Self(1 << 4);
    /// Depth sizing mode.
    pub const DEPTH_MODE: Self = Self(1 << 5);
    /// Texture dimension.
    pub const DIMENSION: Self = Self(1 << 6);
    /// Channels and precision.
    pub const TARGET_FORMAT: Self = Self(1 << 7);
    /// Power-of-two presets.
    pub const POT_SIZE: Self = Self(1 << 8);

    /// Every size field.
    pub const SIZE: Self = Self(
        Self::WIDTH.0
            | Self::WIDTH_MODE.0
            | Self::HEIGHT.0
            | Self::HEIGHT_MODE.0
            | Self::DEPTH.0
            | Self::DEPTH_MODE.0,
    );
    /// Every format field.
    pub const FORMAT: Self = Self(Self::POT_SIZE.0 | Self::DIMENSION.0 | Self::TARGET_FORMAT.0);
    /// Everything.
    pub const ALL: Self = Self(u16::MAX);

    /// Return `true` when every bit of `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for EditFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Per-node render target settings.
///
/// Read-only for the shape resolver; mutated through [`ResourceSettings::apply`] which enforces the
/// node type's [`EditFlags`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSettings {
    /// Width sizing mode.
    pub width_mode: SizeMode,
    /// Height sizing mode.
    pub height_mode: SizeMode,
    /// Depth sizing mode.
    pub depth_mode: SizeMode,
    /// Fixed width.
    pub width: u32,
    /// Fixed height.
    pub height: u32,
    /// Fixed depth.
    pub depth: u32,
    /// Width percentage of the graph output.
    pub width_percent: f32,
    /// Height percentage of the graph output.
    pub height_percent: f32,
    /// Depth percentage of the graph output.
    pub depth_percent: f32,
    /// Power-of-two preset applied to fixed sizes.
    pub pot_size: PotSize,
    /// Texture dimension.
    pub dimension: OutputDimension,
    /// Channel layout.
    pub output_channels: OutputChannel,
    /// Channel precision.
    pub output_precision: OutputPrecision,
    /// Allocate a read/write pair.
    pub double_buffered: bool,
    /// Addressing mode.
    pub wrap_mode: WrapMode,
    /// Sampling filter.
    pub filter_mode: FilterMode,
    /// Which fields the user may edit for this node type.
    pub edit_flags: EditFlags,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            width_mode: SizeMode::Default,
            height_mode: SizeMode::Default,
            depth_mode: SizeMode::Default,
            width: 512,
            height: 512,
            depth: 1,
            width_percent: 100.0,
            height_percent: 100.0,
            depth_percent: 100.0,
            pot_size: PotSize::Custom,
            dimension: OutputDimension::SameAsOutput,
            output_channels: OutputChannel::SameAsOutput,
            output_precision: OutputPrecision::SameAsOutput,
            double_buffered: false,
            wrap_mode: WrapMode::Repeat,
            filter_mode: FilterMode::Bilinear,
            edit_flags: EditFlags::ALL,
        }
    }
}

/// A single inspector edit of [`ResourceSettings`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "field", content = "value")]
pub enum SettingsEdit {
    /// Width sizing mode.
    WidthMode(SizeMode),
    /// Height sizing mode.
    HeightMode(SizeMode),
    /// Depth sizing mode.
    DepthMode(SizeMode),
    /// Fixed width.
    Width(u32),
    /// Fixed height.
    Height(u32),
    /// Fixed depth.
    Depth(u32),
    /// Width percentage.
    WidthPercent(f32),
    /// Height percentage.
    HeightPercent(f32),
    /// Depth percentage.
    DepthPercent(f32),
    /// Power-of-two preset; non-custom presets also set the fixed width and height.
    PotSize(PotSize),
    /// Texture dimension.
    Dimension(OutputDimension),
    /// Channel layout.
    Channels(OutputChannel),
    /// Channel precision.
    Precision(OutputPrecision),
    /// Addressing mode (always editable).
    Wrap(WrapMode),
    /// Sampling filter (always editable).
    Filter(FilterMode),
}

impl SettingsEdit {
    fn required_flag(self) -> EditFlags {
        match self {
            Self::WidthMode(_) => EditFlags::WIDTH_MODE,
            Self::HeightMode(_) => EditFlags::HEIGHT_MODE,
            Self::DepthMode(_) => EditFlags::DEPTH_MODE,
            Self::Width(_) | Self::WidthPercent(_) => EditFlags::WIDTH,
            Self::Height(_) | Self::HeightPercent(_) => EditFlags::HEIGHT,
            Self::Depth(_) | Self::DepthPercent(_) => EditFlags::DEPTH,
            Self::PotSize(_) => EditFlags::POT_SIZE,
            Self::Dimension(_) => EditFlags::DIMENSION,
            Self::Channels(_) | Self::Precision(_) => EditFlags::TARGET_FORMAT,
            Self::Wrap(_) | Self::Filter(_) => EditFlags::NONE,
        }
    }
}

impl ResourceSettings {
    /// Apply an inspector edit. Returns whether anything changed.
    pub fn apply(&mut self, edit: SettingsEdit) -> TexflowResult<bool> {
        if !self.edit_flags.contains(edit.required_flag()) {
            return Err(TexflowError::validation(format!(
                "{edit:?} is not editable for this node"
            )));
        }
        if let SettingsEdit::WidthPercent(p)
        | SettingsEdit::HeightPercent(p)
        | SettingsEdit::DepthPercent(p) = edit
            && (!p.is_finite() || p < 0.0)
        {
            return Err(TexflowError::validation("percentage must be finite and >= 0"));
        }

        let before = self.clone();
        match edit {
            SettingsEdit::WidthMode(m) => self.width_mode = m,
            SettingsEdit::HeightMode(m) => self.height_mode = m,
            SettingsEdit::DepthMode(m) => self.depth_mode = m,
            SettingsEdit::Width(v) => self.width = v,
            SettingsEdit::Height(v) => self.height = v,
            SettingsEdit::Depth(v) => self.depth = v,
            SettingsEdit::WidthPercent(p) => self.width_percent = p,
            SettingsEdit::HeightPercent(p) => self.height_percent = p,
            SettingsEdit::DepthPercent(p) => self.depth_percent = p,
            SettingsEdit::PotSize(p) => {
                self.pot_size = p;
                if let Some(size) = p.texels() {
                    self.width = size;
                    self.height = size;
                }
            }
            SettingsEdit::Dimension(d) => self.dimension = d,
            SettingsEdit::Channels(c) => self.output_channels = c,
            SettingsEdit::Precision(p) => self.output_precision = p,
            SettingsEdit::Wrap(w) => self.wrap_mode = w,
            SettingsEdit::Filter(f) => self.filter_mode = f,
        }
        Ok(*self != before)
    }
}

/// The graph's root output shape every relative setting resolves against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputShape {
    /// Output width.
    pub width: u32,
    /// Output height.
    pub height: u32,
    /// Output depth (1 for 2D outputs).
    #[serde(default = "one")]
    pub depth: u32,
    /// Output format.
    pub format: TextureFormat,
    /// Output dimension.
    pub dimension: TextureDimension,
}

fn one() -> u32 {
    1
}

impl OutputShape {
    /// A 2D output of the given size and format.
    pub fn texture_2d(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            depth: 1,
            format,
            dimension: TextureDimension::Texture2D,
        }
    }

    /// Output extent.
    pub fn extent(&self) -> Extent3 {
        Extent3::new(self.width, self.height, self.depth)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/settings.rs"]
mod tests;
