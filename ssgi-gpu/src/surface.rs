use glam::{UVec2, Vec3, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{StorageTexture2d, Texture2d};

#[derive(Clone, Copy, Default)]
pub struct Surface {
    /// World-space normal
    pub normal: Vec3,

    /// Distance along the view axis; zero for background
    pub depth: f32,
}

impl Surface {
    /// Minimum cosine between normals of surfaces considered the same.
    pub const NORMAL_THRESHOLD: f32 = 0.9;

    /// Maximum relative depth difference between surfaces considered the
    /// same.
    pub const DEPTH_THRESHOLD: f32 = 0.1;

    pub fn is_sky(&self) -> bool {
        self.depth <= 0.0
    }

    /// Returns a score `<0.0, 1.0>` that determines the similarity of two given
    /// surfaces.
    pub fn evaluate_similarity_to(&self, other: &Self) -> f32 {
        if self.is_sky() || other.is_sky() {
            return 0.0;
        }

        let normal_score = self.normal.dot(other.normal).max(0.0);

        let depth_score = 1.0
            - ((self.depth - other.depth).abs()
                / (self.depth * Self::DEPTH_THRESHOLD))
                .min(1.0);

        normal_score * depth_score
    }

    /// Returns whether history recorded for `other` can be reused for this
    /// surface.
    pub fn is_similar_to(&self, other: &Self) -> bool {
        if self.is_sky() || other.is_sky() {
            return false;
        }

        let depth_diff = (self.depth - other.depth).abs() / self.depth;

        self.normal.dot(other.normal) > Self::NORMAL_THRESHOLD
            && depth_diff < Self::DEPTH_THRESHOLD
    }
}

pub struct SurfaceMap<'a, T>
where
    T: Texture2d + ?Sized,
{
    tex: &'a T,
}

impl<'a, T> Clone for SurfaceMap<'a, T>
where
    T: Texture2d + ?Sized,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for SurfaceMap<'a, T> where T: Texture2d + ?Sized {}

impl<'a, T> SurfaceMap<'a, T>
where
    T: Texture2d + ?Sized,
{
    pub fn new(tex: &'a T) -> Self {
        Self { tex }
    }

    pub fn get(&self, screen_pos: UVec2) -> Surface {
        let d0 = self.tex.load(screen_pos);

        Surface {
            normal: d0.xyz(),
            depth: d0.w,
        }
    }
}

impl<'a, T> SurfaceMap<'a, T>
where
    T: StorageTexture2d + ?Sized,
{
    pub fn set(&self, screen_pos: UVec2, surface: &Surface) {
        self.tex
            .store(screen_pos, surface.normal.extend(surface.depth));
    }
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;

    fn surface(normal: Vec3, depth: f32) -> Surface {
        Surface {
            normal: normal.normalize(),
            depth,
        }
    }

    #[test]
    fn similarity() {
        let a = surface(Vec3::Z, 10.0);

        assert!(a.is_similar_to(&surface(Vec3::Z, 10.5)));
        assert!(!a.is_similar_to(&surface(Vec3::Z, 20.0)));
        assert!(!a.is_similar_to(&surface(Vec3::X, 10.0)));
        assert!(!a.is_similar_to(&surface(vec3(0.0, 1.0, 1.0), 10.0)));
        assert!(!a.is_similar_to(&Surface::default()));

        assert_eq!(1.0, a.evaluate_similarity_to(&a));
        assert_eq!(0.0, a.evaluate_similarity_to(&surface(Vec3::Z, 20.0)));
    }
}
