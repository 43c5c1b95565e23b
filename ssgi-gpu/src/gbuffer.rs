use glam::{vec4, UVec2, Vec3, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::Texture2d;

/// Depth packed into four 8-bit channels.
///
/// The producer stores the raw bits of the NDC depth byte by byte (lowest byte
/// in `x`), so that the value survives an `Rgba8Unorm` target exactly; an
/// all-zero texel denotes background.
pub struct PackedDepth;

impl PackedDepth {
    pub fn encode(depth: f32) -> Vec4 {
        let bits = depth.to_bits();

        vec4(
            (bits & 0xff) as f32,
            ((bits >> 8) & 0xff) as f32,
            ((bits >> 16) & 0xff) as f32,
            ((bits >> 24) & 0xff) as f32,
        ) / 255.0
    }

    pub fn decode(texel: Vec4) -> f32 {
        let bytes = (texel * 255.0).round().as_uvec4();

        f32::from_bits(
            bytes.x | (bytes.y << 8) | (bytes.z << 16) | (bytes.w << 24),
        )
    }
}

#[derive(Clone, Copy, Default)]
pub struct GBufferEntry {
    /// Non-linear (NDC) depth; zero for background
    pub depth: f32,

    /// View-space normal
    pub normal: Vec3,

    pub roughness: f32,
    pub albedo: Vec3,
    pub metalness: f32,
    pub emissive: Vec3,
}

impl GBufferEntry {
    /// Decodes the four G-buffer targets: packed depth, normal + roughness,
    /// albedo + metalness, emissive.
    pub fn unpack([d0, d1, d2, d3]: [Vec4; 4]) -> Self {
        let depth = PackedDepth::decode(d0);

        let normal = if d1.xyz().length_squared() > 0.0 {
            d1.xyz().normalize()
        } else {
            Vec3::ZERO
        };

        Self {
            depth,
            normal,
            roughness: d1.w.clamp(0.0, 1.0),
            albedo: d2.xyz(),
            metalness: d2.w.clamp(0.0, 1.0),
            emissive: d3.xyz(),
        }
    }

    pub fn pack(self) -> [Vec4; 4] {
        [
            PackedDepth::encode(self.depth),
            self.normal.extend(self.roughness),
            self.albedo.extend(self.metalness),
            self.emissive.extend(0.0),
        ]
    }

    /// Returns whether this entry contains a surface (as opposed to
    /// background or a texel with invalid depth).
    pub fn is_some(&self) -> bool {
        self.depth > 0.0 && self.depth < 1.0 && self.normal != Vec3::ZERO
    }

    pub fn is_none(&self) -> bool {
        !self.is_some()
    }
}

/// Read-only view over the G-buffer produced by the host.
pub struct GBuffer<'a, T>
where
    T: Texture2d + ?Sized,
{
    pub depth: &'a T,
    pub normal: &'a T,
    pub albedo: &'a T,
    pub emissive: &'a T,
}

impl<'a, T> Clone for GBuffer<'a, T>
where
    T: Texture2d + ?Sized,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for GBuffer<'a, T> where T: Texture2d + ?Sized {}

impl<'a, T> GBuffer<'a, T>
where
    T: Texture2d + ?Sized,
{
    pub fn get(&self, pos: UVec2) -> GBufferEntry {
        GBufferEntry::unpack([
            self.depth.load(pos),
            self.normal.load(pos),
            self.albedo.load(pos),
            self.emissive.load(pos),
        ])
    }

    /// Reads just the depth, without decoding the remaining targets.
    pub fn depth(&self, pos: UVec2) -> f32 {
        PackedDepth::decode(self.depth.load(pos))
    }

    pub fn normal_roughness(&self, pos: UVec2) -> Vec4 {
        self.normal.load(pos)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;

    #[test]
    fn packed_depth() {
        for depth in [0.0, 0.25, 0.5, 0.987654, 0.99999] {
            let texel = PackedDepth::encode(depth);

            assert!(texel.cmpge(Vec4::ZERO).all());
            assert!(texel.cmple(Vec4::ONE).all());

            // Simulate storing the value in an 8-bit-per-channel target
            let texel = (texel * 255.0).round() / 255.0;

            assert_eq!(depth, PackedDepth::decode(texel));
        }
    }

    #[test]
    fn serialization() {
        let target = GBufferEntry {
            depth: 0.75,
            normal: vec3(0.0, 0.6, 0.8),
            roughness: 0.25,
            albedo: vec3(0.1, 0.2, 0.3),
            metalness: 0.5,
            emissive: vec3(1.0, 2.0, 3.0),
        };

        let target = GBufferEntry::unpack(target.pack());

        assert!(target.is_some());
        assert_eq!(0.75, target.depth);
        assert_relative_eq!(0.6, target.normal.y, epsilon = 0.0001);
        assert_relative_eq!(0.8, target.normal.z, epsilon = 0.0001);
        assert_relative_eq!(0.25, target.roughness);
        assert_relative_eq!(0.3, target.albedo.z);
        assert_relative_eq!(0.5, target.metalness);
        assert_relative_eq!(2.0, target.emissive.y);
    }

    #[test]
    fn background() {
        let target = GBufferEntry::unpack([Vec4::ZERO; 4]);

        assert!(target.is_none());
    }
}
