use glam::{ivec2, vec4, UVec2, Vec3, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{
    lerp, BilinearFilter, Camera, GBuffer, ReprojectionMap, StorageTexture2d,
    TemporalPassParams, Texture2d, Vec3Ext,
};

/// Accumulates a single radiance channel over time, along with the first and
/// second moments of its luminance.
///
/// Colors are stored as `rgb` + unused `w`; moments as `(m1, m2, age, _)`.
pub struct TemporalAccumulator<'a, T, S>
where
    T: Texture2d + ?Sized,
    S: StorageTexture2d + ?Sized,
{
    pub camera: &'a Camera,
    pub params: &'a TemporalPassParams,
    pub gbuffer: GBuffer<'a, T>,
    pub reprojection_map: ReprojectionMap<'a, S>,
    pub samples: &'a S,
    pub prev_colors: &'a S,
    pub prev_moments: &'a S,
    pub colors: &'a S,
    pub moments: &'a S,
}

impl<'a, T, S> TemporalAccumulator<'a, T, S>
where
    T: Texture2d + ?Sized,
    S: StorageTexture2d + ?Sized,
{
    /// History older than this many frames is considered fully converged.
    pub const MAX_AGE: f32 = 32.0;

    pub fn run(self, screen_pos: UVec2) {
        if !self.camera.contains(screen_pos.as_ivec2()) {
            return;
        }

        let sample = self.samples.load(screen_pos).xyz();
        let luma = sample.luma();
        let reprojection = self.reprojection_map.get(screen_pos);

        if self.params.has(TemporalPassParams::RESET_HISTORY)
            || reprojection.is_none()
        {
            self.colors.store(screen_pos, sample.extend(0.0));

            self.moments
                .store(screen_pos, vec4(luma, luma * luma, 1.0, 0.0));

            return;
        }

        let mut history = BilinearFilter::reproject(reprojection, |pos| {
            self.prev_colors.load(pos)
        })
        .xyz();

        let history_moments = BilinearFilter::reproject(reprojection, |pos| {
            self.prev_moments.load(pos)
        });

        if self.params.clamp_strength > 0.0 {
            let (aabb_min, aabb_max) = self.neighbourhood(screen_pos);

            history = lerp(
                history,
                history.clip(aabb_min, aabb_max),
                self.params.clamp_strength,
            );
        }

        let mut blend = self.params.blend.clamp(0.0, 1.0);

        if self.params.has(TemporalPassParams::ROUGHNESS_BLEND) {
            let uv = self.camera.screen_to_uv(screen_pos);
            let gbuffer = self.gbuffer.get(self.camera.uv_to_gbuffer(uv));

            blend *= 1.0 - gbuffer.roughness.sqrt();
        }

        let alpha = 1.0 - blend;
        let color = lerp(history, sample, alpha);
        let m1 = lerp(history_moments.x, luma, alpha);
        let m2 = lerp(history_moments.y, luma * luma, alpha);
        let age = (history_moments.z + 1.0).min(Self::MAX_AGE);

        self.colors.store(screen_pos, color.extend(0.0));
        self.moments.store(screen_pos, vec4(m1, m2, age, 0.0));
    }

    /// Returns the bounding box of this frame's samples around given pixel.
    fn neighbourhood(&self, screen_pos: UVec2) -> (Vec3, Vec3) {
        let center = self.samples.load(screen_pos).xyz();
        let mut aabb_min = center;
        let mut aabb_max = center;
        let mut y = -1;

        while y <= 1 {
            let mut x = -1;

            while x <= 1 {
                let pos = screen_pos.as_ivec2() + ivec2(x, y);

                if self.camera.contains(pos) {
                    let sample = self.samples.load(pos.as_uvec2()).xyz();

                    aabb_min = aabb_min.min(sample);
                    aabb_max = aabb_max.max(sample);
                }

                x += 1;
            }

            y += 1;
        }

        (aabb_min, aabb_max)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec2, vec3, Vec4};

    use super::*;
    use crate::cpu::testing::{camera, TestGBuffer};
    use crate::{CpuTexture, GBufferEntry, Reprojection};

    struct Buffers {
        reprojection_map: CpuTexture,
        samples: CpuTexture,
        prev_colors: CpuTexture,
        prev_moments: CpuTexture,
        colors: CpuTexture,
        moments: CpuTexture,
    }

    impl Buffers {
        fn new(camera: &Camera) -> Self {
            let size = camera.screen_size();

            Self {
                reprojection_map: CpuTexture::new(size),
                samples: CpuTexture::new(size),
                prev_colors: CpuTexture::new(size),
                prev_moments: CpuTexture::new(size),
                colors: CpuTexture::new(size),
                moments: CpuTexture::new(size),
            }
        }

        fn run(&self, camera: &Camera, gbuffer: &TestGBuffer, params: &TemporalPassParams) {
            for pos in self.samples.positions() {
                TemporalAccumulator {
                    camera,
                    params,
                    gbuffer: gbuffer.get(),
                    reprojection_map: ReprojectionMap::new(&self.reprojection_map),
                    samples: &self.samples,
                    prev_colors: &self.prev_colors,
                    prev_moments: &self.prev_moments,
                    colors: &self.colors,
                    moments: &self.moments,
                }
                .run(pos);
            }

            self.prev_colors.copy_from(&self.colors);
            self.prev_moments.copy_from(&self.moments);
        }

        /// Makes every pixel reproject onto itself.
        fn identity_reprojection(&self) {
            for pos in self.reprojection_map.positions() {
                let reprojection = Reprojection {
                    prev_x: pos.x as f32,
                    prev_y: pos.y as f32,
                    confidence: 1.0,
                    validity: 0b1111,
                };

                self.reprojection_map.store(pos, reprojection.serialize());
            }
        }
    }

    fn params() -> TemporalPassParams {
        TemporalPassParams {
            blend: 0.9,
            ..Default::default()
        }
    }

    #[test]
    fn blending() {
        let camera = camera();
        let gbuffer = TestGBuffer::wall(&camera, 5.0, GBufferEntry::default());
        let buffers = Buffers::new(&camera);
        let pos = uvec2(10, 10);

        buffers.identity_reprojection();

        // First frame has no history, so it's taken as-is
        buffers.samples.fill(Vec4::splat(1.0));
        buffers.run(&camera, &gbuffer, &TemporalPassParams {
            flags: TemporalPassParams::RESET_HISTORY,
            ..params()
        });

        assert_relative_eq!(1.0, buffers.colors.load(pos).x);
        assert_relative_eq!(1.0, buffers.moments.load(pos).z);

        buffers.samples.fill(Vec4::splat(3.0));
        buffers.run(&camera, &gbuffer, &params());

        let color = buffers.colors.load(pos);
        let moments = buffers.moments.load(pos);

        assert_relative_eq!(0.9 * 1.0 + 0.1 * 3.0, color.x, epsilon = 0.0001);
        assert_relative_eq!(0.9 * 1.0 + 0.1 * 3.0, moments.x, epsilon = 0.0001);
        assert_relative_eq!(0.9 * 1.0 + 0.1 * 9.0, moments.y, epsilon = 0.0001);
        assert_relative_eq!(2.0, moments.z);
    }

    #[test]
    fn age_is_capped() {
        let camera = camera();
        let gbuffer = TestGBuffer::wall(&camera, 5.0, GBufferEntry::default());
        let buffers = Buffers::new(&camera);

        buffers.identity_reprojection();
        buffers.samples.fill(Vec4::splat(0.5));

        for _ in 0..50 {
            buffers.run(&camera, &gbuffer, &params());
        }

        assert_relative_eq!(32.0, buffers.moments.load(uvec2(3, 3)).z);
    }

    #[test]
    fn missing_reprojection_resets_history() {
        let camera = camera();
        let gbuffer = TestGBuffer::wall(&camera, 5.0, GBufferEntry::default());
        let buffers = Buffers::new(&camera);
        let pos = uvec2(10, 10);

        buffers.prev_colors.fill(Vec4::splat(100.0));
        buffers.prev_moments.fill(vec4(100.0, 10000.0, 10.0, 0.0));
        buffers.samples.fill(Vec4::splat(2.0));
        buffers.run(&camera, &gbuffer, &params());

        assert_relative_eq!(2.0, buffers.colors.load(pos).x);
        assert_relative_eq!(2.0, buffers.moments.load(pos).x, epsilon = 0.0001);
        assert_relative_eq!(4.0, buffers.moments.load(pos).y, epsilon = 0.0001);
        assert_relative_eq!(1.0, buffers.moments.load(pos).z);
    }

    #[test]
    fn neighbourhood_clamping() {
        let camera = camera();
        let gbuffer = TestGBuffer::wall(&camera, 5.0, GBufferEntry::default());
        let buffers = Buffers::new(&camera);
        let pos = uvec2(10, 10);

        buffers.identity_reprojection();
        buffers.prev_colors.fill(Vec4::splat(10.0));
        buffers.prev_moments.fill(vec4(10.0, 100.0, 5.0, 0.0));
        buffers.samples.fill(Vec4::splat(1.0));

        buffers.run(&camera, &gbuffer, &TemporalPassParams {
            blend: 1.0,
            clamp_strength: 1.0,
            ..params()
        });

        // With blend = 1.0 the result is just the clamped history
        assert_relative_eq!(1.0, buffers.colors.load(pos).x, epsilon = 0.001);
    }

    #[test]
    fn rough_surfaces_prefer_fresh_samples() {
        let camera = camera();

        let run = |roughness: f32| {
            let gbuffer = TestGBuffer::wall(&camera, 5.0, GBufferEntry {
                roughness,
                ..Default::default()
            });

            let buffers = Buffers::new(&camera);

            buffers.identity_reprojection();
            buffers.prev_colors.fill(Vec4::ZERO);
            buffers.samples.fill(vec3(1.0, 1.0, 1.0).extend(0.0));

            buffers.run(&camera, &gbuffer, &TemporalPassParams {
                flags: TemporalPassParams::ROUGHNESS_BLEND,
                ..params()
            });

            buffers.colors.load(uvec2(10, 10)).x
        };

        assert_relative_eq!(0.1, run(0.0), epsilon = 0.0001);
        assert_relative_eq!(1.0, run(1.0), epsilon = 0.0001);
        assert!(run(0.25) > 0.1);
    }
}
