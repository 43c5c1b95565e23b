use std::cell::Cell;

use glam::{uvec2, UVec2, Vec2, Vec4};

use crate::{BilinearFilter, SampledTexture2d, StorageTexture2d, Texture2d};

/// Host-side texture used to run this crate's kernels without a GPU.
///
/// Out-of-bounds reads are clamped to the edge, matching what the reference
/// pipeline expects from `ClampToEdge` samplers.
#[derive(Clone, Debug)]
pub struct CpuTexture {
    size: UVec2,
    texels: Vec<Cell<Vec4>>,
}

impl CpuTexture {
    pub fn new(size: UVec2) -> Self {
        Self::filled(size, Vec4::ZERO)
    }

    pub fn filled(size: UVec2, value: Vec4) -> Self {
        assert!(size.x > 0);
        assert!(size.y > 0);

        Self {
            size,
            texels: (0..(size.x * size.y)).map(|_| Cell::new(value)).collect(),
        }
    }

    pub fn from_fn(size: UVec2, mut f: impl FnMut(UVec2) -> Vec4) -> Self {
        let this = Self::new(size);

        for pos in this.positions() {
            this.store(pos, f(pos));
        }

        this
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn fill(&self, value: Vec4) {
        for texel in &self.texels {
            texel.set(value);
        }
    }

    pub fn copy_from(&self, other: &Self) {
        assert_eq!(self.size, other.size);

        for (dst, src) in self.texels.iter().zip(&other.texels) {
            dst.set(src.get());
        }
    }

    /// Iterates over all texel positions, row by row.
    pub fn positions(&self) -> impl Iterator<Item = UVec2> {
        let size = self.size;

        (0..size.y).flat_map(move |y| (0..size.x).map(move |x| uvec2(x, y)))
    }

    fn idx(&self, pos: UVec2) -> usize {
        let pos = pos.min(self.size - UVec2::ONE);

        (pos.y * self.size.x + pos.x) as usize
    }
}

impl Texture2d for CpuTexture {
    fn load(&self, pos: UVec2) -> Vec4 {
        self.texels[self.idx(pos)].get()
    }
}

impl StorageTexture2d for CpuTexture {
    fn store(&self, pos: UVec2, value: Vec4) {
        if pos.x < self.size.x && pos.y < self.size.y {
            self.texels[self.idx(pos)].set(value);
        }
    }
}

impl SampledTexture2d for CpuTexture {
    /// Bilinear lookup at the base level; the level of detail is ignored.
    fn sample_lod(&self, uv: Vec2, _lod: f32) -> Vec4 {
        let pos = uv * self.size.as_vec2() - 0.5;

        BilinearFilter::sample(pos, self.size, |pos| self.load(pos))
    }
}

/// Scenes shared by the kernels' tests.
#[cfg(test)]
pub(crate) mod testing {
    use glam::{uvec2, vec3, Mat4, Vec3};

    use super::*;
    use crate::{Camera, GBuffer, GBufferEntry};

    /// Camera at `(0, 0, 5)` looking at the origin, with the internal buffers
    /// at half of the G-buffer's resolution.
    pub fn camera() -> Camera {
        Camera::new(
            Mat4::perspective_rh(1.0, 2.0, 0.1, 100.0),
            Mat4::look_at_rh(vec3(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y),
            0.1,
            uvec2(64, 32),
            uvec2(128, 64),
        )
    }

    pub struct TestGBuffer {
        pub depth: CpuTexture,
        pub normal: CpuTexture,
        pub albedo: CpuTexture,
        pub emissive: CpuTexture,
    }

    impl TestGBuffer {
        pub fn from_fn(
            camera: &Camera,
            mut f: impl FnMut(UVec2) -> GBufferEntry,
        ) -> Self {
            let this = Self {
                depth: CpuTexture::new(camera.gbuffer_size()),
                normal: CpuTexture::new(camera.gbuffer_size()),
                albedo: CpuTexture::new(camera.gbuffer_size()),
                emissive: CpuTexture::new(camera.gbuffer_size()),
            };

            for pos in this.depth.positions() {
                let [d0, d1, d2, d3] = f(pos).pack();

                this.depth.store(pos, d0);
                this.normal.store(pos, d1);
                this.albedo.store(pos, d2);
                this.emissive.store(pos, d3);
            }

            this
        }

        /// Wall facing the camera, `distance` units in front of it.
        pub fn wall(camera: &Camera, distance: f32, entry: GBufferEntry) -> Self {
            let depth = ndc_depth(camera, distance);

            Self::from_fn(camera, |_| GBufferEntry {
                depth,
                normal: Vec3::Z,
                ..entry
            })
        }

        pub fn get(&self) -> GBuffer<'_, CpuTexture> {
            GBuffer {
                depth: &self.depth,
                normal: &self.normal,
                albedo: &self.albedo,
                emissive: &self.emissive,
            }
        }
    }

    /// Returns the NDC depth of a point `distance` units along the view axis.
    pub fn ndc_depth(camera: &Camera, distance: f32) -> f32 {
        let clip = camera.view_to_clip(vec3(0.0, 0.0, -distance));

        clip.z / clip.w
    }
}
