//! CPU rendition of [`crate::Effect`].
//!
//! Runs the very same kernels as the shaders, pass by pass, over
//! [`gpu::CpuTexture`]s; it's slow, but doesn't need a GPU, which makes it
//! useful for testing the whole pipeline and for debugging the shaders.

use glam::{UVec2, Vec2, Vec3};
use log::{debug, info};

use crate::effect::{denoise_sub_passes, DenoiseSource};
use crate::params::{self, FrameCounters, FrameState};
use crate::{
    gpu, utils, Camera, ChannelConfig, CpuEnvironment, DenoiseOptions,
    EnvironmentMap, Mode, OptionKey, OptionValue, Reaction, Result,
    ToneMapping,
};
use crate::gpu::{CpuTexture, StorageTexture2d};

/// Host-rendered textures, see: [`crate::EffectInputs`].
#[derive(Clone, Debug)]
pub struct ReferenceInputs {
    pub depth: CpuTexture,
    pub normal: CpuTexture,
    pub albedo: CpuTexture,
    pub emissive: CpuTexture,
    pub motion: CpuTexture,
    pub direct_light: CpuTexture,
    pub back_depth: Option<CpuTexture>,
}

/// What the host has rendered at a single G-buffer texel.
#[derive(Clone, Copy, Default)]
pub struct ReferenceTexel {
    pub surface: gpu::GBufferEntry,

    /// `current uv - previous uv`
    pub motion: Vec2,

    pub direct_light: Vec3,
}

impl ReferenceInputs {
    pub fn from_fn(
        size: UVec2,
        mut f: impl FnMut(UVec2) -> ReferenceTexel,
    ) -> Self {
        let this = Self {
            depth: CpuTexture::new(size),
            normal: CpuTexture::new(size),
            albedo: CpuTexture::new(size),
            emissive: CpuTexture::new(size),
            motion: CpuTexture::new(size),
            direct_light: CpuTexture::new(size),
            back_depth: None,
        };

        for pos in this.depth.positions() {
            let texel = f(pos);
            let [d0, d1, d2, d3] = texel.surface.pack();

            this.depth.store(pos, d0);
            this.normal.store(pos, d1);
            this.albedo.store(pos, d2);
            this.emissive.store(pos, d3);
            this.motion.store(pos, texel.motion.extend(0.0).extend(0.0));
            this.direct_light.store(pos, texel.direct_light.extend(1.0));
        }

        this
    }

    pub fn size(&self) -> UVec2 {
        self.depth.size()
    }

    fn gbuffer(&self) -> gpu::GBuffer<'_, CpuTexture> {
        gpu::GBuffer {
            depth: &self.depth,
            normal: &self.normal,
            albedo: &self.albedo,
            emissive: &self.emissive,
        }
    }
}

#[derive(Debug)]
struct ChannelTextures {
    samples: CpuTexture,
    colors: [CpuTexture; 2],
    moments: [CpuTexture; 2],
    denoised_a: CpuTexture,
    denoised_b: CpuTexture,
}

impl ChannelTextures {
    fn new(size: UVec2) -> Self {
        Self {
            samples: CpuTexture::new(size),
            colors: [CpuTexture::new(size), CpuTexture::new(size)],
            moments: [CpuTexture::new(size), CpuTexture::new(size)],
            denoised_a: CpuTexture::new(size),
            denoised_b: CpuTexture::new(size),
        }
    }
}

/// Uniforms of the current frame.
#[derive(Debug)]
struct FrameParams {
    camera: gpu::Camera,
    ray_march: gpu::RayMarchPassParams,
    temporal: Vec<gpu::TemporalPassParams>,
    denoise: Vec<gpu::DenoisePassParams>,
    composition: gpu::CompositionPassParams,
}

/// See the module's documentation.
#[derive(Debug)]
pub struct ReferencePipeline {
    mode: Mode,
    camera: Camera,
    channels: Vec<ChannelConfig>,
    options: DenoiseOptions,
    tone_mapping: ToneMapping,
    exposure: f32,
    environment: Option<(CpuEnvironment, f32)>,
    blue_noise: Option<CpuTexture>,

    /// 1x1 texture standing for whatever's missing
    placeholder: CpuTexture,

    surface_maps: [CpuTexture; 2],
    reprojection_map: CpuTexture,
    textures: Vec<ChannelTextures>,
    counters: FrameCounters,
    params: FrameParams,
}

impl ReferencePipeline {
    pub fn new(
        mode: Mode,
        camera: Camera,
        options: DenoiseOptions,
    ) -> Result<Self> {
        Self::with_channels(mode, camera, options, ChannelConfig::presets(mode))
    }

    pub fn with_channels(
        mode: Mode,
        camera: Camera,
        options: DenoiseOptions,
        channels: Vec<ChannelConfig>,
    ) -> Result<Self> {
        camera.validate()?;
        options.validate()?;
        ChannelConfig::validate(mode, &channels)?;

        info!(
            "Creating reference pipeline: mode={mode:?}, {}",
            camera.describe()
        );

        let size = camera.scaled_size(options.resolution_scale);

        let params = FrameParams {
            camera: camera.serialize(options.resolution_scale),
            ray_march: Default::default(),
            temporal: vec![Default::default(); channels.len()],
            denoise: vec![Default::default(); channels.len()],
            composition: Default::default(),
        };

        let mut this = Self {
            mode,
            camera,
            textures: channels
                .iter()
                .map(|_| ChannelTextures::new(size))
                .collect(),
            channels,
            options,
            tone_mapping: Default::default(),
            exposure: 1.0,
            environment: None,
            blue_noise: None,
            placeholder: CpuTexture::new(UVec2::ONE),
            surface_maps: [CpuTexture::new(size), CpuTexture::new(size)],
            reprojection_map: CpuTexture::new(size),
            counters: FrameCounters::new(),
            params,
        };

        this.write_params(false);

        Ok(this)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn options(&self) -> &DenoiseOptions {
        &self.options
    }

    pub fn frame(&self) -> u32 {
        self.counters.frame
    }

    pub fn is_history_reset_pending(&self) -> bool {
        self.counters.reset_history
    }

    pub fn has_direct_light(&self) -> bool {
        self.counters.has_direct_light()
    }

    pub fn internal_size(&self) -> UVec2 {
        self.reprojection_map.size()
    }

    /// See: [`crate::Effect::apply_option()`].
    pub fn apply_option(
        &mut self,
        key: OptionKey,
        value: OptionValue,
    ) -> Result<Reaction> {
        let prev_options = self.options.clone();
        let reaction = self.options.set(key, value)?;

        debug!("Option `{key}` set to {value}; reaction={reaction:?}");

        if reaction != Reaction::Uniform {
            if prev_options.resolution_scale != self.options.resolution_scale {
                self.reallocate();
            }

            self.counters.reset_history = true;
        }

        Ok(reaction)
    }

    pub fn set_camera(&mut self, camera: Camera) -> Result<()> {
        camera.validate()?;

        let needs_reallocating = self.camera.is_invalidated_by(&camera);

        self.camera = camera;

        if needs_reallocating {
            self.reallocate();
            self.counters.reset_history = true;
        }

        Ok(())
    }

    pub fn set_environment(&mut self, map: Option<&EnvironmentMap>) {
        self.environment =
            map.map(|map| (map.to_cpu(), (map.mip_count() - 1) as f32));

        self.counters.reset_history = true;
    }

    pub fn set_blue_noise(&mut self, texture: CpuTexture) {
        self.blue_noise = Some(texture);
    }

    pub fn set_tone_mapping(&mut self, tone_mapping: ToneMapping, exposure: f32) {
        self.tone_mapping = tone_mapping;
        self.exposure = exposure;
    }

    /// See: [`crate::Effect::update()`].
    pub fn update(&mut self, direct_light_rendered: bool) {
        let reset_history = self
            .counters
            .advance(self.options.spp, direct_light_rendered);

        self.write_params(reset_history);
    }

    /// Runs all of the passes, returning the composited frame.
    pub fn render(&self, inputs: &ReferenceInputs) -> CpuTexture {
        utils::measure("reference.frame_reprojection", || {
            self.reproject(inputs)
        });

        utils::measure("reference.ray_marching", || self.trace(inputs));

        self.resolve(inputs)
    }

    /// Same as [`Self::render()`], but with ray marching replaced by given
    /// per-channel samples.
    pub fn render_with_samples(
        &self,
        inputs: &ReferenceInputs,
        samples: &[CpuTexture],
    ) -> CpuTexture {
        assert_eq!(self.textures.len(), samples.len());

        utils::measure("reference.frame_reprojection", || {
            self.reproject(inputs)
        });

        for (textures, samples) in self.textures.iter().zip(samples) {
            textures.samples.copy_from(samples);
        }

        self.resolve(inputs)
    }

    /// Returns this frame's (noisy) samples of given channel.
    pub fn samples(&self, channel: usize) -> &CpuTexture {
        &self.textures[channel].samples
    }

    /// Returns temporally accumulated radiance of given channel.
    pub fn colors(&self, channel: usize) -> &CpuTexture {
        &self.textures[channel].colors[self.curr()]
    }

    /// Returns luminance moments (xy) and history length (z) of given
    /// channel.
    pub fn moments(&self, channel: usize) -> &CpuTexture {
        &self.textures[channel].moments[self.curr()]
    }

    /// Returns denoised radiance (rgb) and its variance (a) of given channel.
    pub fn output(&self, channel: usize) -> &CpuTexture {
        &self.textures[channel].denoised_b
    }

    pub fn surface_map(&self) -> &CpuTexture {
        &self.surface_maps[self.curr()]
    }

    pub fn reprojection(&self, pos: UVec2) -> gpu::Reprojection {
        gpu::ReprojectionMap::new(&self.reprojection_map).get(pos)
    }

    fn curr(&self) -> usize {
        self.counters.alternate as usize
    }

    fn past(&self) -> usize {
        1 - self.curr()
    }

    fn reallocate(&mut self) {
        let size = self.camera.scaled_size(self.options.resolution_scale);

        debug!("Reallocating reference textures; size={}x{}", size.x, size.y);

        self.surface_maps = [CpuTexture::new(size), CpuTexture::new(size)];
        self.reprojection_map = CpuTexture::new(size);

        self.textures = self
            .channels
            .iter()
            .map(|_| ChannelTextures::new(size))
            .collect();
    }

    fn write_params(&mut self, reset_history: bool) {
        let state = FrameState {
            frame: self.counters.frame,
            has_direct_light: self.counters.has_direct_light(),

            // The host's back-face depth arrives only along with the frame,
            // see: `Self::trace()`
            has_back_depth: false,

            env_size: self
                .environment
                .as_ref()
                .map_or(UVec2::ZERO, |(env, _)| env.size),
            env_max_mip: self
                .environment
                .as_ref()
                .map_or(0.0, |(_, max_mip)| *max_mip),
            blue_noise_size: self
                .blue_noise
                .as_ref()
                .map_or(0, |noise| noise.size().x),
        };

        self.params = FrameParams {
            camera: self.camera.serialize(self.options.resolution_scale),
            ray_march: params::ray_march_params(&self.options, self.mode, state),
            temporal: self
                .channels
                .iter()
                .map(|config| {
                    params::temporal_params(&self.options, config, reset_history)
                })
                .collect(),
            denoise: self
                .channels
                .iter()
                .map(|config| params::denoise_params(&self.options, config))
                .collect(),
            composition: params::composition_params(
                self.mode,
                self.tone_mapping,
                self.exposure,
            ),
        };
    }

    fn reproject(&self, inputs: &ReferenceInputs) {
        for pos in self.reprojection_map.positions() {
            gpu::FrameReprojection {
                camera: &self.params.camera,
                gbuffer: inputs.gbuffer(),
                motion: &inputs.motion,
                prev_surfaces: gpu::SurfaceMap::new(
                    &self.surface_maps[self.past()],
                ),
                surfaces: gpu::SurfaceMap::new(&self.surface_maps[self.curr()]),
                reprojection_map: gpu::ReprojectionMap::new(
                    &self.reprojection_map,
                ),
            }
            .run(pos);
        }
    }

    fn trace(&self, inputs: &ReferenceInputs) {
        let mut params = self.params.ray_march;

        if inputs.back_depth.is_some() {
            params.flags |= gpu::RayMarchPassParams::HAS_BACK_DEPTH;
        }

        let environment = match &self.environment {
            Some((env, _)) => env.sampler(),

            None => gpu::EnvironmentSampler {
                map: &self.placeholder,
                conditional: &self.placeholder,
                marginal: &self.placeholder,
                size: UVec2::ZERO,
            },
        };

        let sampler = gpu::GiSampler {
            camera: &self.params.camera,
            params: &params,
            gbuffer: inputs.gbuffer(),
            back_depth: inputs.back_depth.as_ref().unwrap_or(&self.placeholder),
            direct_light: &inputs.direct_light,
            blue_noise: self.blue_noise.as_ref().unwrap_or(&self.placeholder),
            environment,
            bounce: self.output(0),
        };

        for pos in self.reprojection_map.positions() {
            let sample = match self.options.spp {
                1 => sampler.run::<1>(self.mode, pos),
                2 => sampler.run::<2>(self.mode, pos),
                4 => sampler.run::<4>(self.mode, pos),
                _ => sampler.run::<8>(self.mode, pos),
            };

            for (idx, textures) in self.textures.iter().enumerate() {
                let value = match self.mode.channel(idx) {
                    gpu::Channel::Diffuse => sample.diffuse,
                    gpu::Channel::Specular => sample.specular,
                };

                textures.samples.store(pos, value);
            }
        }
    }

    /// Runs temporal accumulation, denoising and composition.
    fn resolve(&self, inputs: &ReferenceInputs) -> CpuTexture {
        utils::measure("reference.temporal_accumulation", || {
            self.accumulate(inputs)
        });

        utils::measure("reference.denoising", || self.denoise(inputs));
        utils::measure("reference.composition", || self.compose(inputs))
    }

    fn accumulate(&self, inputs: &ReferenceInputs) {
        let (curr, past) = (self.curr(), self.past());

        for (textures, params) in self.textures.iter().zip(&self.params.temporal)
        {
            for pos in self.reprojection_map.positions() {
                gpu::TemporalAccumulator {
                    camera: &self.params.camera,
                    params,
                    gbuffer: inputs.gbuffer(),
                    reprojection_map: gpu::ReprojectionMap::new(
                        &self.reprojection_map,
                    ),
                    samples: &textures.samples,
                    prev_colors: &textures.colors[past],
                    prev_moments: &textures.moments[past],
                    colors: &textures.colors[curr],
                    moments: &textures.moments[curr],
                }
                .run(pos);
            }
        }
    }

    fn denoise(&self, inputs: &ReferenceInputs) {
        let curr = self.curr();

        for sub_pass in denoise_sub_passes(self.options.denoise_iterations) {
            for (textures, params) in
                self.textures.iter().zip(&self.params.denoise)
            {
                let (input, output) = match sub_pass.source {
                    DenoiseSource::Temporal => {
                        (&textures.colors[curr], &textures.denoised_a)
                    }
                    DenoiseSource::A => {
                        (&textures.denoised_a, &textures.denoised_b)
                    }
                    DenoiseSource::B => {
                        (&textures.denoised_b, &textures.denoised_a)
                    }
                };

                for pos in self.reprojection_map.positions() {
                    gpu::SpatialDenoiser {
                        camera: &self.params.camera,
                        params,
                        step: &sub_pass.step,
                        gbuffer: inputs.gbuffer(),
                        moments: &textures.moments[curr],
                        input,
                        output,
                    }
                    .run(pos);
                }
            }
        }
    }

    fn compose(&self, inputs: &ReferenceInputs) -> CpuTexture {
        let specular = self.output(self.textures.len() - 1);

        CpuTexture::from_fn(inputs.size(), |pos| {
            gpu::Composer {
                camera: &self.params.camera,
                params: &self.params.composition,
                gbuffer: inputs.gbuffer(),
                direct_light: &inputs.direct_light,
                diffuse: self.output(0),
                specular,
            }
            .run(pos)
        })
    }
}

impl Drop for ReferencePipeline {
    fn drop(&mut self) {
        debug!("Deleting reference pipeline: {}", self.camera.describe());
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec2, vec2, vec3, Mat4, Vec4};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::gpu::Texture2d;
    use crate::{EffectError, Projection};

    fn camera() -> Camera {
        Camera {
            projection: Projection::Perspective {
                fov_y: 1.0,
                near: 0.1,
                far: 100.0,
            },
            view: Mat4::look_at_rh(vec3(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y),
            size: uvec2(32, 16),
        }
    }

    /// Returns the NDC depth of a point `distance` units in front of the
    /// camera.
    fn ndc_depth(camera: &Camera, distance: f32) -> f32 {
        let clip = camera
            .serialize(1.0)
            .view_to_clip(vec3(0.0, 0.0, -distance));

        clip.z / clip.w
    }

    /// Returns a wall facing the camera, `distance` units in front of it.
    fn wall(camera: &Camera, distance: f32, motion: Vec2) -> ReferenceInputs {
        let depth = ndc_depth(camera, distance);

        ReferenceInputs::from_fn(camera.size, |_| ReferenceTexel {
            surface: gpu::GBufferEntry {
                depth,
                normal: Vec3::Z,
                roughness: 1.0,
                albedo: Vec3::splat(0.5),
                metalness: 0.0,
                emissive: Vec3::ZERO,
            },
            motion,
            direct_light: Vec3::splat(0.2),
        })
    }

    fn samples(size: UVec2, mut f: impl FnMut(UVec2) -> f32) -> CpuTexture {
        CpuTexture::from_fn(size, |pos| Vec3::splat(f(pos)).extend(0.0))
    }

    fn constant(size: UVec2, value: f32) -> Vec<CpuTexture> {
        vec![samples(size, |_| value)]
    }

    fn options() -> DenoiseOptions {
        DenoiseOptions {
            denoise_iterations: 0,
            ..Default::default()
        }
    }

    #[test]
    fn rejects_invalid_configuration() {
        let ortho = Camera {
            projection: Projection::Orthographic {
                height: 10.0,
                near: 0.1,
                far: 100.0,
            },
            ..camera()
        };

        assert_eq!(
            Some(EffectError::UnsupportedCamera {
                projection: "orthographic"
            }),
            ReferencePipeline::new(Mode::DiffuseOnly, ortho, options()).err()
        );

        assert_eq!(
            Some(EffectError::ChannelMismatch {
                mode: Mode::Combined,
                expected: 2,
                actual: 1,
            }),
            ReferencePipeline::with_channels(
                Mode::Combined,
                camera(),
                options(),
                ChannelConfig::presets(Mode::DiffuseOnly),
            )
            .err()
        );
    }

    #[test]
    fn noisy_samples_converge() {
        let camera = camera();
        let inputs = wall(&camera, 5.0, Vec2::ZERO);
        let mut rng = StdRng::seed_from_u64(1234);

        let mut target =
            ReferencePipeline::new(Mode::DiffuseOnly, camera, options())
                .unwrap();

        for _ in 0..64 {
            let noisy = samples(inputs.size(), |_| rng.gen_range(0.3..0.7));

            target.update(true);
            target.render_with_samples(&inputs, &[noisy]);
        }

        let pos = uvec2(16, 8);
        let color = target.colors(0).load(pos);
        let moments = target.moments(0).load(pos);

        assert_relative_eq!(0.5, color.x, epsilon = 0.1);
        assert_relative_eq!(0.5, moments.x, epsilon = 0.1);
        assert_relative_eq!(32.0, moments.z);
    }

    #[test]
    fn static_history_is_blended() {
        let camera = camera();
        let inputs = wall(&camera, 5.0, Vec2::ZERO);
        let size = inputs.size();

        let mut target =
            ReferencePipeline::new(Mode::DiffuseOnly, camera, options())
                .unwrap();

        target.update(true);
        target.render_with_samples(&inputs, &constant(size, 1.0));

        assert_relative_eq!(1.0, target.colors(0).load(uvec2(5, 5)).x);
        assert_relative_eq!(1.0, target.moments(0).load(uvec2(5, 5)).z);

        target.update(true);
        target.render_with_samples(&inputs, &constant(size, 0.0));

        // blend = 0.9
        assert_relative_eq!(0.9, target.colors(0).load(uvec2(5, 5)).x);
        assert_relative_eq!(2.0, target.moments(0).load(uvec2(5, 5)).z);
    }

    #[test]
    fn moving_history_is_reprojected() {
        let camera = camera();
        let size = camera.size;

        let mut target =
            ReferencePipeline::new(Mode::DiffuseOnly, camera.clone(), options())
                .unwrap();

        target.update(true);
        target.render_with_samples(
            &wall(&camera, 5.0, Vec2::ZERO),
            &[samples(size, |pos| pos.x as f32 * 0.1)],
        );

        // Everything moves one pixel to the right
        let motion = vec2(1.0 / size.x as f32, 0.0);

        target.update(true);
        target.render_with_samples(
            &wall(&camera, 5.0, motion),
            &constant(size, 1.0),
        );

        let reprojection = target.reprojection(uvec2(10, 5));

        assert!(reprojection.is_some());
        assert_relative_eq!(9.0, reprojection.prev_x);
        assert_relative_eq!(5.0, reprojection.prev_y);

        assert_relative_eq!(
            0.1 * 1.0 + 0.9 * 0.9,
            target.colors(0).load(uvec2(10, 5)).x,
            epsilon = 0.0001
        );

        // Leftmost column has nothing to reproject from
        assert!(target.reprojection(uvec2(0, 5)).is_none());
        assert_relative_eq!(1.0, target.colors(0).load(uvec2(0, 5)).x);
    }

    #[test]
    fn moving_quad_over_background() {
        let camera = camera();
        let size = camera.size;
        let quad_depth = ndc_depth(&camera, 5.0);
        let background_depth = ndc_depth(&camera, 10.0);

        // Quad spanning `x0..x0 + 8` horizontally and `4..12` vertically,
        // in front of a static background
        let scene = |x0: u32, motion: Vec2| {
            ReferenceInputs::from_fn(size, |pos| {
                let is_quad =
                    (x0..x0 + 8).contains(&pos.x) && (4..12).contains(&pos.y);

                ReferenceTexel {
                    surface: gpu::GBufferEntry {
                        depth: if is_quad { quad_depth } else { background_depth },
                        normal: Vec3::Z,
                        roughness: 1.0,
                        albedo: Vec3::splat(0.5),
                        metalness: 0.0,
                        emissive: Vec3::ZERO,
                    },
                    motion: if is_quad { motion } else { Vec2::ZERO },
                    direct_light: Vec3::splat(0.2),
                }
            })
        };

        let mut target = ReferencePipeline::new(
            Mode::DiffuseOnly,
            camera,
            DenoiseOptions {
                denoise_iterations: 1,
                ..Default::default()
            },
        )
        .unwrap();

        let f1 = 1.0;
        let f2 = 0.0;

        target.update(true);
        target.render_with_samples(&scene(8, Vec2::ZERO), &constant(size, f1));

        // The quad moves one pixel to the right
        target.update(true);
        target.render_with_samples(
            &scene(9, vec2(1.0 / size.x as f32, 0.0)),
            &constant(size, f2),
        );

        // Inside of the quad keeps its history
        let inside = uvec2(12, 8);

        assert!(target.reprojection(inside).is_some());
        assert_relative_eq!(11.0, target.reprojection(inside).prev_x);

        assert_relative_eq!(
            0.1 * f2 + 0.9 * f1,
            target.colors(0).load(inside).x,
            epsilon = 0.0001
        );

        assert_relative_eq!(
            0.1 * f2 + 0.9 * f1,
            target.output(0).load(inside).x,
            epsilon = 0.0001
        );

        // Background the quad has just uncovered starts from scratch
        let uncovered = uvec2(8, 8);

        assert!(target.reprojection(uncovered).is_none());
        assert_relative_eq!(f2, target.colors(0).load(uncovered).x);
        assert_relative_eq!(1.0, target.moments(0).load(uncovered).z);
    }

    #[test]
    fn disocclusion_resets_history() {
        let camera = camera();
        let size = camera.size;

        let mut target =
            ReferencePipeline::new(Mode::DiffuseOnly, camera.clone(), options())
                .unwrap();

        for _ in 0..8 {
            target.update(true);
            target.render_with_samples(
                &wall(&camera, 5.0, Vec2::ZERO),
                &constant(size, 1.0),
            );
        }

        // The wall jumps away, so nothing seen previously matches
        target.update(true);
        target.render_with_samples(
            &wall(&camera, 10.0, Vec2::ZERO),
            &constant(size, 0.25),
        );

        let pos = uvec2(16, 8);

        assert!(target.reprojection(pos).is_none());
        assert_relative_eq!(0.25, target.colors(0).load(pos).x);
        assert_relative_eq!(1.0, target.moments(0).load(pos).z);
    }

    #[test]
    fn options_reset_history() {
        let camera = camera();
        let inputs = wall(&camera, 5.0, Vec2::ZERO);
        let size = inputs.size();
        let pos = uvec2(16, 8);

        let mut target =
            ReferencePipeline::new(Mode::DiffuseOnly, camera, options())
                .unwrap();

        for _ in 0..4 {
            target.update(true);
            target.render_with_samples(&inputs, &constant(size, 1.0));
        }

        // ---
        // Denoiser options keep the history

        assert_eq!(
            Reaction::Uniform,
            target
                .apply_option(OptionKey::DenoiseKernel, OptionValue::U32(3))
                .unwrap()
        );

        assert!(!target.is_history_reset_pending());

        target.update(true);
        target.render_with_samples(&inputs, &constant(size, 0.0));

        assert_relative_eq!(0.9, target.colors(0).load(pos).x);

        // ---
        // Ray-marching options drop it

        assert_eq!(
            Reaction::UniformAndReset,
            target
                .apply_option(OptionKey::Distance, OptionValue::F32(5.0))
                .unwrap()
        );

        assert!(target.is_history_reset_pending());

        target.update(true);
        target.render_with_samples(&inputs, &constant(size, 0.5));

        assert!(!target.is_history_reset_pending());
        assert_relative_eq!(0.5, target.colors(0).load(pos).x);
        assert_relative_eq!(1.0, target.moments(0).load(pos).z);

        // ---
        // Invalid values change nothing

        assert!(target
            .apply_option(OptionKey::Spp, OptionValue::U32(3))
            .is_err());

        assert!(!target.is_history_reset_pending());
        assert_eq!(1, target.options().spp);
    }

    #[test]
    fn resolution_scale_reallocates_buffers() {
        let camera = camera();

        let mut target =
            ReferencePipeline::new(Mode::Combined, camera.clone(), options())
                .unwrap();

        assert_eq!(uvec2(32, 16), target.internal_size());

        target
            .apply_option(OptionKey::ResolutionScale, OptionValue::F32(0.5))
            .unwrap();

        assert_eq!(uvec2(16, 8), target.internal_size());
        assert!(target.is_history_reset_pending());

        let inputs = wall(&camera, 5.0, Vec2::ZERO);
        let samples = vec![samples(uvec2(16, 8), |_| 0.5); 2];

        target.update(true);

        let output = target.render_with_samples(&inputs, &samples);

        assert_eq!(camera.size, output.size());
        assert_relative_eq!(1.0, target.moments(1).load(uvec2(4, 4)).z);
    }

    #[test]
    fn uniform_radiance_survives_denoising() {
        let camera = camera();
        let inputs = wall(&camera, 5.0, Vec2::ZERO);
        let size = inputs.size();

        let mut target = ReferencePipeline::new(
            Mode::DiffuseOnly,
            camera,
            DenoiseOptions {
                denoise_iterations: 3,
                ..Default::default()
            },
        )
        .unwrap();

        for _ in 0..3 {
            target.update(true);
            target.render_with_samples(&inputs, &constant(size, 0.3));
        }

        for pos in [uvec2(0, 0), uvec2(16, 8), uvec2(31, 15)] {
            let output = target.output(0).load(pos);

            assert_relative_eq!(0.3, output.x, epsilon = 0.0001);
            assert_relative_eq!(0.0, output.w, epsilon = 0.0001);
        }
    }

    #[test]
    fn disabled_denoiser_passes_history_through() {
        let camera = camera();
        let inputs = wall(&camera, 5.0, Vec2::ZERO);
        let size = inputs.size();

        let mut target =
            ReferencePipeline::new(Mode::DiffuseOnly, camera, options())
                .unwrap();

        target.update(true);
        target.render_with_samples(
            &inputs,
            &[samples(size, |pos| pos.x as f32)],
        );

        for pos in [uvec2(3, 3), uvec2(20, 7)] {
            assert_relative_eq!(
                target.colors(0).load(pos).x,
                target.output(0).load(pos).x
            );
        }
    }

    #[test]
    fn composition_without_environment() {
        let camera = camera();
        let inputs = wall(&camera, 5.0, Vec2::ZERO);

        let mut target =
            ReferencePipeline::new(Mode::DiffuseOnly, camera, options())
                .unwrap();

        target.update(true);

        // Nothing on screen is visible from the wall and there's no
        // environment, so there's no indirect lighting at all
        let output = target.render(&inputs);

        for pos in [uvec2(0, 0), uvec2(16, 8)] {
            assert_relative_eq!(0.2, output.load(pos).x, epsilon = 0.0001);
        }
    }

    #[test]
    fn environment_lights_the_scene() {
        let camera = camera();
        let inputs = wall(&camera, 5.0, Vec2::ZERO);
        let env = EnvironmentMap::new(8, 4, vec![Vec4::ONE; 32]).unwrap();

        let mut target = ReferencePipeline::new(
            Mode::DiffuseOnly,
            camera,
            DenoiseOptions {
                importance_sampling: false,
                ..options()
            },
        )
        .unwrap();

        target.set_environment(Some(&env));
        target.update(true);

        let output = target.render(&inputs);

        // direct + albedo * environment
        for pos in [uvec2(0, 0), uvec2(16, 8)] {
            assert_relative_eq!(0.7, output.load(pos).x, epsilon = 0.001);
        }

        target.set_environment(None);

        assert!(target.is_history_reset_pending());
    }

    #[test]
    fn importance_sampled_environment_lights_the_scene() {
        let camera = camera();
        let inputs = wall(&camera, 5.0, Vec2::ZERO);
        let size = inputs.size();

        // Directions with positive X are three times brighter than the other
        // ones; the halves mirror each other around the wall's normal, so
        // the cosine-weighted average is still 1.0
        let texels = (0..32)
            .map(|i| {
                if (2..6).contains(&(i % 8)) {
                    Vec4::splat(1.5)
                } else {
                    Vec4::splat(0.5)
                }
            })
            .collect();

        let env = EnvironmentMap::new(8, 4, texels).unwrap();

        let mut target = ReferencePipeline::new(
            Mode::DiffuseOnly,
            camera,
            DenoiseOptions {
                importance_sampling: true,
                ..options()
            },
        )
        .unwrap();

        target.set_environment(Some(&env));

        for _ in 0..31 {
            target.update(true);
            target.render(&inputs);
        }

        target.update(true);

        let output = target.render(&inputs);

        let mean = output
            .positions()
            .map(|pos| output.load(pos).x)
            .sum::<f32>()
            / (size.x * size.y) as f32;

        // direct + albedo * environment
        assert_relative_eq!(0.7, mean, epsilon = 0.02);
    }

    #[test]
    fn direct_light_grace_period() {
        let mut target =
            ReferencePipeline::new(Mode::DiffuseOnly, camera(), options())
                .unwrap();

        target.update(true);
        assert!(target.has_direct_light());

        target.update(false);
        assert!(target.has_direct_light());

        target.update(false);
        assert!(!target.has_direct_light());

        target.update(true);
        assert!(target.has_direct_light());
    }
}
