use glam::UVec2;
use log::debug;

use crate::{
    gpu, ChannelConfig, DoubleBuffered, MappedUniformBuffer, Mode, Texture,
};

/// Uniforms and intermediate textures of an effect; everything here gets
/// reallocated when the effect's internal resolution changes.
#[derive(Debug)]
pub struct EffectBuffers {
    pub camera: MappedUniformBuffer<gpu::Camera>,
    pub ray_march_params: MappedUniformBuffer<gpu::RayMarchPassParams>,
    pub composition_params: MappedUniformBuffer<gpu::CompositionPassParams>,

    /// Linear depth and world-space normal of each pixel
    pub surface_map: DoubleBuffered<Texture>,

    /// Where each pixel was located in the previous frame
    pub reprojection_map: Texture,

    pub channels: Vec<ChannelBuffers>,
}

impl EffectBuffers {
    pub fn new(
        device: &wgpu::Device,
        mode: Mode,
        channels: &[ChannelConfig],
        camera: gpu::Camera,
    ) -> Self {
        let size = camera.screen_size();

        debug!(
            "Initializing effect buffers; mode={mode:?}, size={}x{}",
            size.x, size.y
        );

        let channels = channels
            .iter()
            .enumerate()
            .map(|(idx, config)| ChannelBuffers::new(device, idx, config, size))
            .collect();

        Self {
            camera: MappedUniformBuffer::new(device, "camera", camera),
            ray_march_params: MappedUniformBuffer::new(
                device,
                "ray_march_params",
                Default::default(),
            ),
            composition_params: MappedUniformBuffer::new(
                device,
                "composition_params",
                Default::default(),
            ),
            surface_map: DoubleBuffered::new(device, "surface_map", size),
            reprojection_map: Texture::new(device, "reprojection_map", size),
            channels,
        }
    }

    pub fn size(&self) -> UVec2 {
        self.reprojection_map.size()
    }

    /// Returns texture containing the final (denoised) radiance of given
    /// channel.
    pub fn output(&self, channel: usize) -> &Texture {
        &self.channels[channel].denoised_b
    }

    /// Returns texture fed back into the ray marcher as the previous frame's
    /// diffuse radiance.
    ///
    /// Without a diffuse channel there's nothing to feed back and the
    /// ray marcher doesn't read this texture, but something still has to be
    /// bound there.
    pub fn bounce(&self) -> &Texture {
        self.output(0)
    }

    pub fn flush(&mut self, queue: &wgpu::Queue) {
        self.camera.flush(queue);
        self.ray_march_params.flush(queue);
        self.composition_params.flush(queue);

        for channel in &mut self.channels {
            channel.temporal_params.flush(queue);
            channel.denoise_params.flush(queue);
        }
    }
}

/// Buffers of a single radiance channel.
#[derive(Debug)]
pub struct ChannelBuffers {
    pub temporal_params: MappedUniformBuffer<gpu::TemporalPassParams>,
    pub denoise_params: MappedUniformBuffer<gpu::DenoisePassParams>,

    /// Radiance traced in the current frame
    pub samples: Texture,

    /// Temporally accumulated radiance (rgb) and its variance (a)
    pub colors: DoubleBuffered<Texture>,

    /// Luminance moments (xy) and history length (z)
    pub moments: DoubleBuffered<Texture>,

    /// Ping-pong targets of the spatial denoiser; the last sub-pass always
    /// writes into `denoised_b`
    pub denoised_a: Texture,
    pub denoised_b: Texture,
}

impl ChannelBuffers {
    fn new(
        device: &wgpu::Device,
        idx: usize,
        config: &ChannelConfig,
        size: UVec2,
    ) -> Self {
        let name = match config.channel {
            gpu::Channel::Diffuse => "diffuse",
            gpu::Channel::Specular => "specular",
        };

        let label = |what: &str| format!("ch{idx}_{name}_{what}");

        Self {
            temporal_params: MappedUniformBuffer::new(
                device,
                label("temporal_params"),
                Default::default(),
            ),
            denoise_params: MappedUniformBuffer::new(
                device,
                label("denoise_params"),
                Default::default(),
            ),
            samples: Texture::new(device, label("samples"), size),
            colors: DoubleBuffered::new(device, label("colors"), size),
            moments: DoubleBuffered::new(device, label("moments"), size),
            denoised_a: Texture::new(device, label("denoised_a"), size),
            denoised_b: Texture::new(device, label("denoised_b"), size),
        }
    }
}
