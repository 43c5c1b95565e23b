use fxhash::FxHashMap;
use log::debug;

use crate::{DenoiseOptions, Mode};

pub type ShaderEntry = (wgpu::ShaderModule, &'static str);

macro_rules! shader {
    ($device:expr, $id:literal) => {{
        let module = $device.create_shader_module(wgpu::include_spirv!(env!(
            concat!("ssgi_shaders::", $id, ".path")
        )));

        (module, env!(concat!("ssgi_shaders::", $id, ".entry_point")))
    }};
}

/// Ray-marching shader variant; the set of variants is closed and compiled
/// ahead of time, one per mode and supported samples-per-pixel count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RayMarchVariant {
    pub mode: Mode,
    pub spp: u32,
}

#[derive(Debug)]
pub struct Shaders {
    pub frame_reprojection: ShaderEntry,
    pub temporal_accumulation: ShaderEntry,
    pub denoising: ShaderEntry,
    pub composition_vs: ShaderEntry,
    pub composition_fs: ShaderEntry,
    ray_marching: FxHashMap<RayMarchVariant, ShaderEntry>,
}

impl Shaders {
    pub fn new(device: &wgpu::Device) -> Self {
        debug!("Loading shaders");

        let mut ray_marching = FxHashMap::default();

        macro_rules! ray_marching {
            ([ $( ($mode:ident, $spp:literal) => $id:literal, )* ]) => {
                $(
                    ray_marching.insert(
                        RayMarchVariant {
                            mode: Mode::$mode,
                            spp: $spp,
                        },
                        shader!(device, $id),
                    );
                )*
            };
        }

        ray_marching!([
            (DiffuseOnly, 1) => "ray_marching_diffuse_spp1",
            (DiffuseOnly, 2) => "ray_marching_diffuse_spp2",
            (DiffuseOnly, 4) => "ray_marching_diffuse_spp4",
            (DiffuseOnly, 8) => "ray_marching_diffuse_spp8",
            (SpecularOnly, 1) => "ray_marching_specular_spp1",
            (SpecularOnly, 2) => "ray_marching_specular_spp2",
            (SpecularOnly, 4) => "ray_marching_specular_spp4",
            (SpecularOnly, 8) => "ray_marching_specular_spp8",
            (Combined, 1) => "ray_marching_combined_spp1",
            (Combined, 2) => "ray_marching_combined_spp2",
            (Combined, 4) => "ray_marching_combined_spp4",
            (Combined, 8) => "ray_marching_combined_spp8",
        ]);

        Self {
            frame_reprojection: shader!(device, "frame_reprojection"),
            temporal_accumulation: shader!(device, "temporal_accumulation"),
            denoising: shader!(device, "denoising"),
            composition_vs: shader!(device, "composition_vs"),
            composition_fs: shader!(device, "composition_fs"),
            ray_marching,
        }
    }

    /// Returns the ray-marching shader for given variant.
    ///
    /// Options are validated before they reach the effect, so every
    /// reachable variant is present.
    pub fn ray_marching(&self, variant: RayMarchVariant) -> &ShaderEntry {
        assert!(
            DenoiseOptions::SUPPORTED_SPP.contains(&variant.spp),
            "unsupported variant: {variant:?}"
        );

        &self.ray_marching[&variant]
    }
}
