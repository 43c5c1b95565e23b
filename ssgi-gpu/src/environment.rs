use core::f32::consts::PI;

use glam::{uvec2, vec2, vec3, UVec2, Vec2, Vec3, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{SampledTexture2d, Texture2d};

/// Equirectangular environment map along with tables for sampling it
/// proportionally to its luminance.
///
/// - `conditional` is `(width + 1) x height`; `.x` holds, per row, the
///   cumulative distribution of columns (`cdf[0] = 0`, `cdf[width] = 1`) and
///   `.y` holds the probability of picking given texel,
/// - `marginal` is `(height + 1) x 1`; `.x` holds the cumulative
///   distribution of rows.
pub struct EnvironmentSampler<'a, E, T>
where
    E: SampledTexture2d + ?Sized,
    T: Texture2d + ?Sized,
{
    pub map: &'a E,
    pub conditional: &'a T,
    pub marginal: &'a T,
    pub size: UVec2,
}

impl<'a, E, T> EnvironmentSampler<'a, E, T>
where
    E: SampledTexture2d + ?Sized,
    T: Texture2d + ?Sized,
{
    /// Given a world-space direction, returns the map's uv-coordinates.
    pub fn dir_to_uv(dir: Vec3) -> Vec2 {
        let u = dir.z.atan2(dir.x) / (2.0 * PI) + 0.5;
        let v = 0.5 - dir.y.clamp(-1.0, 1.0).asin() / PI;

        vec2(u, v)
    }

    /// See: [`Self::dir_to_uv()`].
    pub fn uv_to_dir(uv: Vec2) -> Vec3 {
        let phi = (uv.x - 0.5) * 2.0 * PI;
        let lat = (0.5 - uv.y) * PI;

        vec3(lat.cos() * phi.cos(), lat.sin(), lat.cos() * phi.sin())
    }

    pub fn radiance(&self, dir: Vec3, lod: f32) -> Vec3 {
        self.map.sample_lod(Self::dir_to_uv(dir), lod).xyz()
    }

    /// Picks a world-space direction with probability proportional to the
    /// map's luminance; returns the direction and its solid-angle density.
    pub fn sample(&self, u: Vec2) -> (Vec3, f32) {
        let (row, v) = Self::invert_cdf(self.marginal, 0, self.size.y, u.x);
        let (_, u) = Self::invert_cdf(self.conditional, row, self.size.x, u.y);
        let dir = Self::uv_to_dir(vec2(u, v));

        (dir, self.pdf(dir))
    }

    /// Finds the bucket of `table`'s row containing `xi` and returns its
    /// index along with a continuous coordinate (`0..=1`) that lands inside
    /// that bucket proportionally to where `xi` falls within it.
    fn invert_cdf(table: &T, row: u32, len: u32, xi: f32) -> (u32, f32) {
        let mut lo = 0;
        let mut hi = len;

        // Invariant: cdf[lo] <= xi && (hi == len || cdf[hi] > xi)
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;

            if table.load(uvec2(mid, row)).x <= xi {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let c0 = table.load(uvec2(lo, row)).x;
        let c1 = table.load(uvec2(lo + 1, row)).x;

        let frac = if c1 > c0 {
            ((xi - c0) / (c1 - c0)).clamp(0.0, 1.0)
        } else {
            0.5
        };

        (lo, (lo as f32 + frac) / len as f32)
    }

    /// Solid-angle density of [`Self::sample()`] generating given direction.
    pub fn pdf(&self, dir: Vec3) -> f32 {
        let uv = Self::dir_to_uv(dir);
        let size = self.size.as_vec2();
        let texel = (uv * size).as_uvec2().min(self.size - UVec2::ONE);
        let probability = self.conditional.load(texel).y;
        let cos_lat = (1.0 - dir.y * dir.y).max(0.0).sqrt().max(0.0001);

        probability * size.x * size.y / (2.0 * PI * PI * cos_lat)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::CpuTexture;

    type Sampler<'a> = EnvironmentSampler<'a, CpuTexture, CpuTexture>;

    #[test]
    fn uv_dir_roundtrip() {
        for dir in [
            vec3(1.0, 0.0, 0.0),
            vec3(0.0, 0.5, 1.0).normalize(),
            vec3(-0.3, -0.8, 0.2).normalize(),
        ] {
            let dir2 = Sampler::uv_to_dir(Sampler::dir_to_uv(dir));

            assert_relative_eq!(dir.x, dir2.x, epsilon = 0.0001);
            assert_relative_eq!(dir.y, dir2.y, epsilon = 0.0001);
            assert_relative_eq!(dir.z, dir2.z, epsilon = 0.0001);
        }

        assert!(Sampler::dir_to_uv(Vec3::Y).y < 0.01);
    }
}
