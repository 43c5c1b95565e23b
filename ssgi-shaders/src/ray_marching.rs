//! One entry point per (mode, samples-per-pixel) pair; the sample count is a
//! compile-time constant so that the sampling loop gets unrolled.

use ssgi_gpu::prelude::*;

#[allow(clippy::too_many_arguments)]
fn run<const SPP: u32>(
    mode: Mode,
    screen_pos: UVec2,
    camera: &Camera,
    params: &RayMarchPassParams,
    gbuffer: GBuffer<'_, Image!(2D, type = f32, sampled)>,
    back_depth: Tex,
    direct_light: Tex,
    blue_noise: Tex,
    env_map: Tex,
    env_sampler: &Sampler,
    env_conditional: Tex,
    env_marginal: Tex,
    bounce: TexRgba32,
) -> GiSample {
    let env_map = FilteredTex {
        tex: env_map,
        sampler: env_sampler,
    };

    GiSampler {
        camera,
        params,
        gbuffer,
        back_depth,
        direct_light,
        blue_noise,
        environment: EnvironmentSampler {
            map: &env_map,
            conditional: env_conditional,
            marginal: env_marginal,
            size: params.env_size(),
        },
        bounce,
    }
    .run::<SPP>(mode, screen_pos)
}

macro_rules! entry_points {
    (
        single: [ $( $single:ident => ($single_mode:ident, $single_spp:literal), )* ]
        combined: [ $( $combined:ident => $combined_spp:literal, )* ]
    ) => {
        $(
            #[spirv(compute(threads(8, 8)))]
            #[allow(clippy::too_many_arguments)]
            pub fn $single(
                #[spirv(global_invocation_id)] global_id: UVec3,
                #[spirv(descriptor_set = 0, binding = 0, uniform)]
                camera: &Camera,
                #[spirv(descriptor_set = 0, binding = 1, uniform)]
                params: &RayMarchPassParams,
                #[spirv(descriptor_set = 0, binding = 2)] gbuffer_depth: Tex,
                #[spirv(descriptor_set = 0, binding = 3)] gbuffer_normal: Tex,
                #[spirv(descriptor_set = 0, binding = 4)] gbuffer_albedo: Tex,
                #[spirv(descriptor_set = 0, binding = 5)] gbuffer_emissive: Tex,
                #[spirv(descriptor_set = 0, binding = 6)] back_depth: Tex,
                #[spirv(descriptor_set = 0, binding = 7)] direct_light: Tex,
                #[spirv(descriptor_set = 0, binding = 8)] blue_noise: Tex,
                #[spirv(descriptor_set = 0, binding = 9)] env_map: Tex,
                #[spirv(descriptor_set = 0, binding = 10)] env_sampler: &Sampler,
                #[spirv(descriptor_set = 0, binding = 11)] env_conditional: Tex,
                #[spirv(descriptor_set = 0, binding = 12)] env_marginal: Tex,
                #[spirv(descriptor_set = 0, binding = 13)] bounce: TexRgba32,
                #[spirv(descriptor_set = 0, binding = 14)] output: TexRgba32,
            ) {
                let screen_pos = global_id.xy();

                if !camera.contains(screen_pos.as_ivec2()) {
                    return;
                }

                let mode = Mode::$single_mode;

                let sample = run::<$single_spp>(
                    mode,
                    screen_pos,
                    camera,
                    params,
                    GBuffer {
                        depth: gbuffer_depth,
                        normal: gbuffer_normal,
                        albedo: gbuffer_albedo,
                        emissive: gbuffer_emissive,
                    },
                    back_depth,
                    direct_light,
                    blue_noise,
                    env_map,
                    env_sampler,
                    env_conditional,
                    env_marginal,
                    bounce,
                );

                let sample = if mode.has_diffuse() {
                    sample.diffuse
                } else {
                    sample.specular
                };

                output.store(screen_pos, sample);
            }
        )*

        $(
            #[spirv(compute(threads(8, 8)))]
            #[allow(clippy::too_many_arguments)]
            pub fn $combined(
                #[spirv(global_invocation_id)] global_id: UVec3,
                #[spirv(descriptor_set = 0, binding = 0, uniform)]
                camera: &Camera,
                #[spirv(descriptor_set = 0, binding = 1, uniform)]
                params: &RayMarchPassParams,
                #[spirv(descriptor_set = 0, binding = 2)] gbuffer_depth: Tex,
                #[spirv(descriptor_set = 0, binding = 3)] gbuffer_normal: Tex,
                #[spirv(descriptor_set = 0, binding = 4)] gbuffer_albedo: Tex,
                #[spirv(descriptor_set = 0, binding = 5)] gbuffer_emissive: Tex,
                #[spirv(descriptor_set = 0, binding = 6)] back_depth: Tex,
                #[spirv(descriptor_set = 0, binding = 7)] direct_light: Tex,
                #[spirv(descriptor_set = 0, binding = 8)] blue_noise: Tex,
                #[spirv(descriptor_set = 0, binding = 9)] env_map: Tex,
                #[spirv(descriptor_set = 0, binding = 10)] env_sampler: &Sampler,
                #[spirv(descriptor_set = 0, binding = 11)] env_conditional: Tex,
                #[spirv(descriptor_set = 0, binding = 12)] env_marginal: Tex,
                #[spirv(descriptor_set = 0, binding = 13)] bounce: TexRgba32,
                #[spirv(descriptor_set = 0, binding = 14)] diffuse_output: TexRgba32,
                #[spirv(descriptor_set = 0, binding = 15)] specular_output: TexRgba32,
            ) {
                let screen_pos = global_id.xy();

                if !camera.contains(screen_pos.as_ivec2()) {
                    return;
                }

                let sample = run::<$combined_spp>(
                    Mode::Combined,
                    screen_pos,
                    camera,
                    params,
                    GBuffer {
                        depth: gbuffer_depth,
                        normal: gbuffer_normal,
                        albedo: gbuffer_albedo,
                        emissive: gbuffer_emissive,
                    },
                    back_depth,
                    direct_light,
                    blue_noise,
                    env_map,
                    env_sampler,
                    env_conditional,
                    env_marginal,
                    bounce,
                );

                diffuse_output.store(screen_pos, sample.diffuse);
                specular_output.store(screen_pos, sample.specular);
            }
        )*
    };
}

entry_points! {
    single: [
        diffuse_spp1 => (DiffuseOnly, 1),
        diffuse_spp2 => (DiffuseOnly, 2),
        diffuse_spp4 => (DiffuseOnly, 4),
        diffuse_spp8 => (DiffuseOnly, 8),
        specular_spp1 => (SpecularOnly, 1),
        specular_spp2 => (SpecularOnly, 2),
        specular_spp4 => (SpecularOnly, 4),
        specular_spp8 => (SpecularOnly, 8),
    ]
    combined: [
        combined_spp1 => 1,
        combined_spp2 => 2,
        combined_spp4 => 4,
        combined_spp8 => 8,
    ]
}
