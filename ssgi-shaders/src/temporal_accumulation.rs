use ssgi_gpu::prelude::*;

#[spirv(compute(threads(8, 8)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] camera: &Camera,
    #[spirv(descriptor_set = 0, binding = 1, uniform)]
    params: &TemporalPassParams,
    #[spirv(descriptor_set = 0, binding = 2)] gbuffer_depth: Tex,
    #[spirv(descriptor_set = 0, binding = 3)] gbuffer_normal: Tex,
    #[spirv(descriptor_set = 0, binding = 4)] gbuffer_albedo: Tex,
    #[spirv(descriptor_set = 0, binding = 5)] gbuffer_emissive: Tex,
    #[spirv(descriptor_set = 0, binding = 6)] reprojection_map: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 7)] samples: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 8)] prev_colors: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 9)] prev_moments: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 10)] colors: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 11)] moments: TexRgba32,
) {
    TemporalAccumulator {
        camera,
        params,
        gbuffer: GBuffer {
            depth: gbuffer_depth,
            normal: gbuffer_normal,
            albedo: gbuffer_albedo,
            emissive: gbuffer_emissive,
        },
        reprojection_map: ReprojectionMap::new(reprojection_map),
        samples,
        prev_colors,
        prev_moments,
        colors,
        moments,
    }
    .run(global_id.xy());
}
