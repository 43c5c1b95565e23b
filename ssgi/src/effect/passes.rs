use log::debug;

use crate::{
    DenoiseOptions, EffectBuffers, EffectInputs, Engine, EnvironmentTextures,
    Mode, Texture,
};

/// Everything the passes bind, gathered for building them.
pub struct PassContext<'a> {
    pub engine: &'a Engine,
    pub mode: Mode,
    pub options: &'a DenoiseOptions,
    pub format: wgpu::TextureFormat,
    pub buffers: &'a EffectBuffers,
    pub inputs: &'a EffectInputs,
    pub environment: &'a EnvironmentTextures,
    pub blue_noise: &'a Texture,
}

impl PassContext<'_> {
    /// Returns the back-face depth, or a placeholder if the host doesn't
    /// render one.
    pub fn back_depth(&self) -> &wgpu::TextureView {
        self.inputs
            .back_depth
            .as_ref()
            .unwrap_or_else(|| self.engine.placeholder().view())
    }
}

macro_rules! passes {
    ([ $( $name:ident => $class:ident, )* ]) => {
        $( mod $name; )*
        $( pub use self::$name::*; )*

        #[derive(Debug)]
        pub struct EffectPasses {
            $( pub $name: $class, )*
        }

        impl EffectPasses {
            pub fn new(device: &wgpu::Device, ctx: &PassContext) -> Self {
                debug!("Initializing effect passes");

                Self {
                    $( $name: $class::new(device, ctx), )*
                }
            }
        }
    };
}

passes!([
    composition => CompositionPass,
    denoising => DenoisingPass,
    frame_reprojection => FrameReprojectionPass,
    ray_marching => RayMarchingPass,
    temporal_accumulation => TemporalAccumulationPass,
]);
