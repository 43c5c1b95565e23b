use glam::{ivec2, vec2, vec4, IVec2, UVec2, Vec2, Vec4};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::Reprojection;

#[derive(Clone, Copy)]
pub struct BilinearFilter {
    /// Sample at `f(x=0, y=0)`
    pub s00: Vec4,

    /// Sample at `f(x=1, y=0)`
    pub s10: Vec4,

    /// Sample at `f(x=0, y=1)`
    pub s01: Vec4,

    /// Sample at `f(x=1, y=1)`
    pub s11: Vec4,

    /// Weights for each sample
    pub weights: Vec4,
}

impl BilinearFilter {
    /// Samples previous frame's texture at the position pointed to by given
    /// reprojection, skipping corners that failed validation.
    pub fn reproject(
        reprojection: Reprojection,
        sample: impl Fn(UVec2) -> Vec4,
    ) -> Vec4 {
        if reprojection.is_exact() {
            sample(reprojection.prev_pos_round())
        } else {
            Self::from_corners(
                reprojection.prev_pos(),
                reprojection.validity,
                sample,
            )
            .eval(reprojection.prev_pos_fract())
        }
    }

    /// Samples given texture at a fractional texel position, with all of the
    /// four corners considered valid.
    pub fn sample(
        pos: Vec2,
        size: UVec2,
        sample: impl Fn(UVec2) -> Vec4,
    ) -> Vec4 {
        let max = size - UVec2::ONE;
        let pos = pos.clamp(Vec2::ZERO, max.as_vec2());
        let [p00, p10, p01, p11] = Self::coords(pos);

        let filter = Self {
            s00: sample(p00.as_uvec2().min(max)),
            s10: sample(p10.as_uvec2().min(max)),
            s01: sample(p01.as_uvec2().min(max)),
            s11: sample(p11.as_uvec2().min(max)),
            weights: Vec4::ONE,
        };

        filter.eval(pos - pos.floor())
    }

    fn from_corners(
        pos: Vec2,
        validity: u32,
        sample: impl Fn(UVec2) -> Vec4,
    ) -> Self {
        let mut s00 = Vec4::ZERO;
        let mut s10 = Vec4::ZERO;
        let mut s01 = Vec4::ZERO;
        let mut s11 = Vec4::ZERO;
        let mut weights = Vec4::ZERO;

        let [p00, p10, p01, p11] = Self::coords(pos);

        if validity & 0b0001 > 0 {
            s00 = sample(p00.as_uvec2());
            weights.x = 1.0;
        }

        if validity & 0b0010 > 0 {
            s10 = sample(p10.as_uvec2());
            weights.y = 1.0;
        }

        if validity & 0b0100 > 0 {
            s01 = sample(p01.as_uvec2());
            weights.z = 1.0;
        }

        if validity & 0b1000 > 0 {
            s11 = sample(p11.as_uvec2());
            weights.w = 1.0;
        }

        Self {
            s00,
            s10,
            s01,
            s11,
            weights,
        }
    }

    /// Returns the four texels surrounding given position, in the order of
    /// `[p00, p10, p01, p11]`.
    pub fn coords(pos: Vec2) -> [IVec2; 4] {
        let p00 = ivec2(pos.x.floor() as i32, pos.y.floor() as i32);

        [
            p00,
            p00 + ivec2(1, 0),
            p00 + ivec2(0, 1),
            p00 + ivec2(1, 1),
        ]
    }

    pub fn eval(&self, uv: Vec2) -> Vec4 {
        let weights = self.weights
            * vec4(
                (1.0 - uv.x) * (1.0 - uv.y),
                uv.x * (1.0 - uv.y),
                (1.0 - uv.x) * uv.y,
                uv.x * uv.y,
            );

        let w_sum = weights.dot(Vec4::ONE);

        if w_sum == 0.0 {
            Default::default()
        } else {
            (self.s00 * weights.x
                + self.s10 * weights.y
                + self.s01 * weights.z
                + self.s11 * weights.w)
                / w_sum
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn eval() {
        let filter = BilinearFilter {
            s00: Vec4::splat(1.0),
            s10: Vec4::splat(2.0),
            s01: Vec4::splat(3.0),
            s11: Vec4::splat(4.0),
            weights: Vec4::ONE,
        };

        assert_relative_eq!(1.0, filter.eval(vec2(0.0, 0.0)).x);
        assert_relative_eq!(2.5, filter.eval(vec2(0.5, 0.5)).x);
        assert_relative_eq!(4.0, filter.eval(vec2(1.0, 1.0)).x);
    }

    #[test]
    fn eval_with_rejected_corners() {
        let filter = BilinearFilter {
            s00: Vec4::splat(1.0),
            s10: Vec4::splat(100.0),
            s01: Vec4::splat(1.0),
            s11: Vec4::splat(100.0),
            weights: vec4(1.0, 0.0, 1.0, 0.0),
        };

        assert_relative_eq!(1.0, filter.eval(vec2(0.75, 0.5)).x);
    }
}
