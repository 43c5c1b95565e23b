mod buffers;
mod pass;
mod passes;

use glam::UVec2;
use log::{debug, info, trace};

pub use self::buffers::*;
pub use self::pass::*;
pub use self::passes::*;
use crate::params::FrameCounters;
use crate::{
    params, Camera, ChannelConfig, DenoiseOptions, EffectError,
    EffectInputs, Engine, EnvironmentMap, EnvironmentTextures, Mode,
    OptionKey, OptionValue, Reaction, Result, Texture, ToneMapping,
};

/// Everything needed to create an [`Effect`].
#[derive(Debug)]
pub struct EffectDescriptor {
    pub mode: Mode,
    pub camera: Camera,
    pub inputs: EffectInputs,

    /// Format of the texture the effect renders into
    pub format: wgpu::TextureFormat,

    pub options: DenoiseOptions,

    /// Per-channel configuration; `None` picks [`ChannelConfig::presets()`]
    pub channels: Option<Vec<ChannelConfig>>,

    pub tone_mapping: ToneMapping,
    pub exposure: f32,
}

impl EffectDescriptor {
    pub fn new(
        mode: Mode,
        camera: Camera,
        inputs: EffectInputs,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            mode,
            camera,
            inputs,
            format,
            options: Default::default(),
            channels: None,
            tone_mapping: Default::default(),
            exposure: 1.0,
        }
    }
}

/// Which image-based-lighting terms the host's direct pass must skip, since
/// the effect already provides them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IblSuppression {
    pub irradiance: bool,
    pub radiance: bool,
}

/// Screen-space global illumination applied on top of a host-rendered frame.
#[derive(Debug)]
pub struct Effect {
    mode: Mode,
    camera: Camera,
    channels: Vec<ChannelConfig>,
    options: DenoiseOptions,
    format: wgpu::TextureFormat,
    tone_mapping: ToneMapping,
    exposure: f32,
    inputs: EffectInputs,
    environment: Option<EnvironmentTextures>,
    blue_noise: Option<Texture>,
    buffers: EffectBuffers,
    passes: EffectPasses,
    counters: FrameCounters,
}

impl Effect {
    pub(crate) fn new(
        engine: &Engine,
        device: &wgpu::Device,
        desc: EffectDescriptor,
    ) -> Result<Self> {
        desc.camera.validate()?;
        desc.options.validate()?;

        let channels = desc
            .channels
            .unwrap_or_else(|| ChannelConfig::presets(desc.mode));

        ChannelConfig::validate(desc.mode, &channels)?;

        info!(
            "Creating effect: mode={:?}, {}",
            desc.mode,
            desc.camera.describe()
        );

        let buffers = EffectBuffers::new(
            device,
            desc.mode,
            &channels,
            desc.camera.serialize(desc.options.resolution_scale),
        );

        let passes = EffectPasses::new(
            device,
            &PassContext {
                engine,
                mode: desc.mode,
                options: &desc.options,
                format: desc.format,
                buffers: &buffers,
                inputs: &desc.inputs,
                environment: engine.environment_placeholder(),
                blue_noise: engine.placeholder(),
            },
        );

        debug!("Effect created");

        Ok(Self {
            mode: desc.mode,
            camera: desc.camera,
            channels,
            options: desc.options,
            format: desc.format,
            tone_mapping: desc.tone_mapping,
            exposure: desc.exposure,
            inputs: desc.inputs,
            environment: None,
            blue_noise: None,
            buffers,
            passes,
            counters: FrameCounters::new(),
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn channels(&self) -> &[ChannelConfig] {
        &self.channels
    }

    pub fn options(&self) -> &DenoiseOptions {
        &self.options
    }

    /// Returns the frame counter that seeds noise; advances by `spp` on each
    /// update.
    pub fn frame(&self) -> u32 {
        self.counters.frame
    }

    /// Returns whether the next frame discards the accumulated history.
    pub fn is_history_reset_pending(&self) -> bool {
        self.counters.reset_history
    }

    /// Returns whether the ray marcher currently samples the direct light.
    pub fn has_direct_light(&self) -> bool {
        self.counters.has_direct_light()
    }

    /// Returns size of the effect's internal buffers.
    pub fn internal_size(&self) -> UVec2 {
        self.buffers.size()
    }

    pub(crate) fn is_alternate(&self) -> bool {
        self.counters.alternate
    }

    pub fn ibl_suppression(&self) -> IblSuppression {
        IblSuppression {
            irradiance: self.mode.has_diffuse(),
            radiance: self.mode.has_specular(),
        }
    }

    /// Returns texture containing linear depth and world-space normal of
    /// each pixel, as computed for the most recently rendered frame.
    pub fn surface_map(&self) -> &Texture {
        self.buffers.surface_map.get(self.counters.alternate)
    }

    /// Changes a single option and applies whatever the change implies:
    /// uploading uniforms, dropping history, reallocating buffers or
    /// switching the ray-marching variant.
    ///
    /// Invalid values are rejected and leave the effect untouched.
    pub fn apply_option(
        &mut self,
        engine: &Engine,
        device: &wgpu::Device,
        key: OptionKey,
        value: OptionValue,
    ) -> Result<Reaction> {
        let prev_options = self.options.clone();
        let reaction = self.options.set(key, value)?;

        debug!("Option `{key}` set to {value}; reaction={reaction:?}");

        match reaction {
            Reaction::Uniform => {}

            Reaction::UniformAndReset => {
                if prev_options.resolution_scale != self.options.resolution_scale
                {
                    self.rebuild_buffers(device);
                    self.rebuild_passes(engine, device);
                }

                self.request_history_reset();
            }

            Reaction::Respecialize => {
                if prev_options.spp != self.options.spp {
                    self.rebuild_ray_marching_pass(engine, device);
                }

                self.request_history_reset();
            }
        }

        Ok(reaction)
    }

    /// Same as [`Self::apply_option()`], but with the key given by name
    /// (e.g. `"denoiseIterations"`).
    pub fn apply_named_option(
        &mut self,
        engine: &Engine,
        device: &wgpu::Device,
        key: &str,
        value: OptionValue,
    ) -> Result<Reaction> {
        self.apply_option(engine, device, key.parse()?, value)
    }

    /// Switches to another camera, reallocating buffers if the resolution
    /// has changed.
    pub fn set_camera(
        &mut self,
        engine: &Engine,
        device: &wgpu::Device,
        camera: Camera,
    ) -> Result<()> {
        camera.validate()?;

        let needs_rebuilding = self.camera.is_invalidated_by(&camera);

        self.camera = camera;

        if needs_rebuilding {
            self.rebuild_buffers(device);
            self.rebuild_passes(engine, device);
            self.request_history_reset();
        }

        Ok(())
    }

    pub fn resize(
        &mut self,
        engine: &Engine,
        device: &wgpu::Device,
        size: UVec2,
    ) -> Result<()> {
        let camera = Camera {
            size,
            ..self.camera.clone()
        };

        self.set_camera(engine, device, camera)
    }

    /// Switches to other host-rendered textures; they must have the same size
    /// as the camera.
    pub fn set_inputs(
        &mut self,
        engine: &Engine,
        device: &wgpu::Device,
        inputs: EffectInputs,
    ) {
        self.inputs = inputs;
        self.rebuild_passes(engine, device);
    }

    /// Installs (or, given `None`, removes) the environment map sampled by
    /// rays that leave the screen.
    pub fn set_environment(
        &mut self,
        engine: &Engine,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        map: Option<&EnvironmentMap>,
    ) {
        if map.is_none() {
            info!("Removing environment map");
        }

        self.environment = map.map(|map| map.upload(device, queue));
        self.rebuild_passes(engine, device);
        self.request_history_reset();
    }

    /// Installs a tiling blue-noise texture; until one is installed, white
    /// noise is used instead.
    pub fn set_blue_noise(
        &mut self,
        engine: &Engine,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &image::RgbaImage,
    ) -> Result<()> {
        let size = UVec2::new(image.width(), image.height());

        if size.x == 0 || size.x != size.y {
            return Err(EffectError::InvalidResolution {
                width: size.x,
                height: size.y,
            });
        }

        info!("Installing blue noise; size={}x{}", size.x, size.y);

        let texture = Texture::builder("blue_noise")
            .with_size(size)
            .with_format(wgpu::TextureFormat::Rgba8Unorm)
            .with_usage(wgpu::TextureUsages::COPY_DST)
            .build(device);

        texture.write(queue, 0, size, 4, image.as_raw());

        self.blue_noise = Some(texture);
        self.rebuild_passes(engine, device);

        Ok(())
    }

    pub fn set_tone_mapping(&mut self, tone_mapping: ToneMapping, exposure: f32) {
        self.tone_mapping = tone_mapping;
        self.exposure = exposure;
    }

    /// Prepares the next frame: advances counters and uploads uniforms.
    ///
    /// Must be called once per frame, before [`Self::render()`];
    /// `direct_light_rendered` tells whether the host has rendered
    /// [`EffectInputs::direct_light`] for this frame.
    pub fn update(&mut self, queue: &wgpu::Queue, direct_light_rendered: bool) {
        let reset_history = self
            .counters
            .advance(self.options.spp, direct_light_rendered);

        trace!(
            "Updating effect; frame={}, alternate={}, direct_light_frames={}, reset_history={}",
            self.counters.frame,
            self.counters.alternate,
            self.counters.direct_light_frames,
            reset_history,
        );

        self.write_params(reset_history);
        self.buffers.flush(queue);
    }

    /// Records all of the effect's passes, writing the composited frame into
    /// `view`.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) {
        self.passes.frame_reprojection.run(self, encoder);
        self.passes.ray_marching.run(self, encoder);
        self.passes.temporal_accumulation.run(self, encoder);
        self.passes.denoising.run(self, encoder);
        self.passes.composition.run(self, encoder, view);
    }

    pub fn describe(&self) -> String {
        format!(
            "mode={:?}, spp={}, {}, internal_size={}x{}",
            self.mode,
            self.options.spp,
            self.camera.describe(),
            self.internal_size().x,
            self.internal_size().y,
        )
    }

    fn request_history_reset(&mut self) {
        debug!("Resetting history");

        self.counters.reset_history = true;
    }

    fn write_params(&mut self, reset_history: bool) {
        let state = params::FrameState {
            frame: self.counters.frame,
            has_direct_light: self.has_direct_light(),
            has_back_depth: self.inputs.back_depth.is_some(),
            env_size: self
                .environment
                .as_ref()
                .map_or(UVec2::ZERO, |env| env.size),
            env_max_mip: self
                .environment
                .as_ref()
                .map_or(0.0, |env| env.max_mip),
            blue_noise_size: self
                .blue_noise
                .as_ref()
                .map_or(0, |noise| noise.size().x),
        };

        *self.buffers.camera =
            self.camera.serialize(self.options.resolution_scale);

        *self.buffers.ray_march_params =
            params::ray_march_params(&self.options, self.mode, state);

        *self.buffers.composition_params = params::composition_params(
            self.mode,
            self.tone_mapping,
            self.exposure,
        );

        for (config, buffers) in
            self.channels.iter().zip(&mut self.buffers.channels)
        {
            *buffers.temporal_params =
                params::temporal_params(&self.options, config, reset_history);

            *buffers.denoise_params =
                params::denoise_params(&self.options, config);
        }
    }

    fn pass_context<'a>(&'a self, engine: &'a Engine) -> PassContext<'a> {
        PassContext {
            engine,
            mode: self.mode,
            options: &self.options,
            format: self.format,
            buffers: &self.buffers,
            inputs: &self.inputs,
            environment: self
                .environment
                .as_ref()
                .unwrap_or_else(|| engine.environment_placeholder()),
            blue_noise: self
                .blue_noise
                .as_ref()
                .unwrap_or_else(|| engine.placeholder()),
        }
    }

    fn rebuild_buffers(&mut self, device: &wgpu::Device) {
        debug!("Rebuilding buffers for effect: {}", self.describe());

        self.buffers = EffectBuffers::new(
            device,
            self.mode,
            &self.channels,
            self.camera.serialize(self.options.resolution_scale),
        );
    }

    fn rebuild_passes(&mut self, engine: &Engine, device: &wgpu::Device) {
        debug!("Rebuilding passes for effect: {}", self.describe());

        let passes = EffectPasses::new(device, &self.pass_context(engine));

        self.passes = passes;
    }

    fn rebuild_ray_marching_pass(
        &mut self,
        engine: &Engine,
        device: &wgpu::Device,
    ) {
        debug!("Respecializing ray marching for effect: {}", self.describe());

        let pass = RayMarchingPass::new(device, &self.pass_context(engine));

        self.passes.ray_marching = pass;
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        info!("Deleting effect: {}", self.describe());
    }
}
