use serde::{Deserialize, Serialize};

/// Linear, straight-alpha RGBA color with `f32` channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Rgba {
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
    /// Alpha channel.
    pub a: f32,
}

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Build a color from its four channels.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Same value in every channel.
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v, v)
    }

    /// Channels as `[r, g, b, a]`.
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Build from `[r, g, b, a]`.
    pub fn from_array(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    /// Rec. 709 luminance of the color channels.
    pub fn luminance(self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }

    /// Component-wise linear interpolation, `t = 0` yields `self`.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }
}

impl From<[f32; 4]> for Rgba {
    fn from(v: [f32; 4]) -> Self {
        Self::from_array(v)
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Arr4([f32; 4]),
            Arr3([f32; 3]),
            Obj {
                r: f32,
                g: f32,
                b: f32,
                #[serde(default = "one")]
                a: f32,
            },
        }

        fn one() -> f32 {
            1.0
        }

        match Repr::deserialize(deserializer)? {
            Repr::Arr4([r, g, b, a]) => Ok(Self::new(r, g, b, a)),
            Repr::Arr3([r, g, b]) => Ok(Self::new(r, g, b, 1.0)),
            Repr::Obj { r, g, b, a } => Ok(Self::new(r, g, b, a)),
        }
    }
}

/// Texel extent of a texture (depth is 1 for 2D textures).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent3 {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth in texels (slices).
    pub depth: u32,
}

impl Extent3 {
    /// Build an extent.
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Number of texels, saturating on overflow.
    pub fn texel_count(self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(self.depth as usize)
    }

    /// Return `true` when `(x, y, z)` lies inside the extent.
    pub fn contains(self, x: i64, y: i64, z: i64) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && x < i64::from(self.width)
            && y < i64::from(self.height)
            && z < i64::from(self.depth)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
