use ssgi_gpu::prelude::*;

#[spirv(compute(threads(8, 8)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] step: &DenoiseStep,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] camera: &Camera,
    #[spirv(descriptor_set = 0, binding = 1, uniform)]
    params: &DenoisePassParams,
    #[spirv(descriptor_set = 0, binding = 2)] gbuffer_depth: Tex,
    #[spirv(descriptor_set = 0, binding = 3)] gbuffer_normal: Tex,
    #[spirv(descriptor_set = 0, binding = 4)] gbuffer_albedo: Tex,
    #[spirv(descriptor_set = 0, binding = 5)] gbuffer_emissive: Tex,
    #[spirv(descriptor_set = 0, binding = 6)] moments: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 7)] input: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 8)] output: TexRgba32,
) {
    SpatialDenoiser {
        camera,
        params,
        step,
        gbuffer: GBuffer {
            depth: gbuffer_depth,
            normal: gbuffer_normal,
            albedo: gbuffer_albedo,
            emissive: gbuffer_emissive,
        },
        moments,
        input,
        output,
    }
    .run(global_id.xy());
}
