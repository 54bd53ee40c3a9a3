#[derive(Clone, Copy, Debug)]
pub(crate) struct Fnv1a64(u64);

impl Fnv1a64 {
    pub(crate) const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01B3;

    pub(crate) fn new(seed: u64) -> Self {
        Self(seed)
    }

    #[cfg(test)]
    pub(crate) fn new_default() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        let mut h = self.0;
        for &b in bytes {
            h ^= u64::from(b);
            h = h.wrapping_mul(Self::PRIME);
        }
        self.0 = h;
    }

    pub(crate) fn finish(self) -> u64 {
        self.0
    }
}

/// Hash a seeded lattice point to `[0, 1)`.
pub(crate) fn lattice_hash01(seed: u64, x: i32, y: i32, z: i32) -> f32 {
    let mut h = Fnv1a64::new(Fnv1a64::OFFSET_BASIS ^ seed);
    h.write_u32(x as u32);
    h.write_u32(y as u32);
    h.write_u32(z as u32);
    // Top 24 bits keep the value exactly representable in f32.
    ((h.finish() >> 40) as f32) / ((1u32 << 24) as f32)
}

pub(crate) fn saturate(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

pub(crate) fn smoothstep01(t: f32) -> f32 {
    let t = saturate(t);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
