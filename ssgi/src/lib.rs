//! Screen-space global illumination for wgpu renderers.
//!
//! The host renders a G-buffer along with direct lighting, and an [`Effect`]
//! adds indirect diffuse and/or specular lighting on top of it: rays are
//! marched through the depth buffer, accumulated over time and denoised
//! with an à-trous filter before being composited into the host's target.

mod buffers;
mod camera;
mod channels;
mod effect;
mod environment;
mod error;
mod inputs;
mod options;
mod params;
pub mod reference;
mod shaders;
mod utils;

use log::info;
pub use ssgi_gpu as gpu;

pub(crate) use self::buffers::*;
pub use self::camera::*;
pub use self::channels::*;
pub use self::effect::{Effect, EffectDescriptor, IblSuppression};
pub(crate) use self::effect::*;
pub use self::environment::*;
pub use self::error::*;
pub use self::gpu::{Channel, Mode, ToneMapping};
pub use self::inputs::*;
pub use self::options::*;
pub(crate) use self::shaders::*;
pub use self::buffers::Texture;

/// Shaders and placeholder resources shared by all effects.
#[derive(Debug)]
pub struct Engine {
    shaders: Shaders,

    /// 1x1 texture bound in place of optional inputs the host hasn't provided
    placeholder: Texture,

    environment_placeholder: EnvironmentTextures,
}

impl Engine {
    pub fn new(device: &wgpu::Device) -> Self {
        info!("Initializing");

        Self {
            shaders: Shaders::new(device),
            placeholder: Texture::builder("placeholder").build(device),
            environment_placeholder: EnvironmentTextures::placeholder(device),
        }
    }

    /// Features the device has to be created with.
    ///
    /// Intermediate buffers are `Rgba32Float` textures read and written by
    /// the same storage binding, and the denoiser identifies its sub-passes
    /// through push constants.
    pub fn required_features() -> wgpu::Features {
        wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES
            | wgpu::Features::PUSH_CONSTANTS
    }

    /// Limits the device has to be created with.
    pub fn required_limits() -> wgpu::Limits {
        wgpu::Limits {
            max_push_constant_size: std::mem::size_of::<gpu::DenoiseStep>()
                as u32,
            ..Default::default()
        }
    }

    pub fn create_effect(
        &self,
        device: &wgpu::Device,
        desc: EffectDescriptor,
    ) -> Result<Effect> {
        Effect::new(self, device, desc)
    }

    pub(crate) fn shaders(&self) -> &Shaders {
        &self.shaders
    }

    pub(crate) fn placeholder(&self) -> &Texture {
        &self.placeholder
    }

    pub(crate) fn environment_placeholder(&self) -> &EnvironmentTextures {
        &self.environment_placeholder
    }
}
