mod bilinear_filter;
mod f32_ext;
mod vec3_ext;

use core::ops;

use glam::{UVec2, Vec2, Vec4};
use spirv_std::{Image, Sampler};

pub use self::bilinear_filter::*;
pub use self::f32_ext::*;
pub use self::vec3_ext::*;

/// Read-only texture provided by the host (G-buffer, motion vectors etc.).
pub type Tex<'a> = &'a Image!(2D, type = f32, sampled);

/// Texture owned by the effect, readable and writable from compute shaders.
pub type TexRgba32<'a> = &'a Image!(2D, format = rgba32f, sampled = false);

/// Texel-addressed texture read.
///
/// Implemented both for the SPIR-V images and for [`CpuTexture`], so that
/// every kernel in this crate can run on the host as well.
pub trait Texture2d {
    fn load(&self, pos: UVec2) -> Vec4;
}

/// Texel-addressed texture write.
pub trait StorageTexture2d: Texture2d {
    fn store(&self, pos: UVec2, value: Vec4);
}

/// Filtered texture read at an explicit mip level.
pub trait SampledTexture2d {
    fn sample_lod(&self, uv: Vec2, lod: f32) -> Vec4;
}

impl Texture2d for Image!(2D, type = f32, sampled) {
    fn load(&self, pos: UVec2) -> Vec4 {
        self.fetch(pos)
    }
}

impl Texture2d for Image!(2D, format = rgba32f, sampled = false) {
    fn load(&self, pos: UVec2) -> Vec4 {
        self.read(pos)
    }
}

impl StorageTexture2d for Image!(2D, format = rgba32f, sampled = false) {
    fn store(&self, pos: UVec2, value: Vec4) {
        unsafe {
            self.write(pos, value);
        }
    }
}

/// Host-provided texture paired with a filtering sampler.
#[derive(Clone, Copy)]
pub struct FilteredTex<'a> {
    pub tex: Tex<'a>,
    pub sampler: &'a Sampler,
}

impl SampledTexture2d for FilteredTex<'_> {
    fn sample_lod(&self, uv: Vec2, lod: f32) -> Vec4 {
        self.tex.sample_by_lod(*self.sampler, uv, lod)
    }
}

pub fn lerp<T>(a: T, b: T, t: f32) -> T
where
    T: ops::Add<Output = T>,
    T: ops::Sub<Output = T>,
    T: ops::Mul<f32, Output = T>,
    T: Copy,
{
    a + (b - a) * t.clamp(0.0, 1.0)
}
