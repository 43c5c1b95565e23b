use glam::{uvec2, UVec2, Vec4};

use crate::Texture2d;

/// Tiling blue-noise texture, shifted by a different offset each frame so that
/// consecutive frames (and consecutive samples of a pixel) decorrelate.
pub struct BlueNoise<'a, T>
where
    T: Texture2d + ?Sized,
{
    tex: &'a T,
    uv: UVec2,
}

impl<'a, T> BlueNoise<'a, T>
where
    T: Texture2d + ?Sized,
{
    pub fn new(tex: &'a T, size: u32, id: UVec2, frame: u32) -> Self {
        let uv = (id + uvec2(71, 11) * frame) % UVec2::splat(size);

        Self { tex, uv }
    }

    pub fn sample(&self) -> Vec4 {
        self.tex.load(self.uv)
    }
}
