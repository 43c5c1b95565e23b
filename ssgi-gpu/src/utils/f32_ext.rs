#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

pub trait F32Ext
where
    Self: Sized,
{
    fn sqr(self) -> Self;
    fn saturate(self) -> Self;
    fn safe_div(self, rhs: Self) -> Self;
}

impl F32Ext for f32 {
    fn sqr(self) -> Self {
        self * self
    }

    fn saturate(self) -> Self {
        self.clamp(0.0, 1.0)
    }

    /// Divides `self` by `rhs`, returning zero when `rhs` is (almost) zero.
    fn safe_div(self, rhs: Self) -> Self {
        if rhs.abs() <= crate::SSGI_EPSILON {
            0.0
        } else {
            self / rhs
        }
    }
}
