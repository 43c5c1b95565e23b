use ssgi_gpu::prelude::*;

#[spirv(compute(threads(8, 8)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] camera: &Camera,
    #[spirv(descriptor_set = 0, binding = 1)] gbuffer_depth: Tex,
    #[spirv(descriptor_set = 0, binding = 2)] gbuffer_normal: Tex,
    #[spirv(descriptor_set = 0, binding = 3)] gbuffer_albedo: Tex,
    #[spirv(descriptor_set = 0, binding = 4)] gbuffer_emissive: Tex,
    #[spirv(descriptor_set = 0, binding = 5)] motion: Tex,
    #[spirv(descriptor_set = 0, binding = 6)] prev_surface_map: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 7)] surface_map: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 8)] reprojection_map: TexRgba32,
) {
    FrameReprojection {
        camera,
        gbuffer: GBuffer {
            depth: gbuffer_depth,
            normal: gbuffer_normal,
            albedo: gbuffer_albedo,
            emissive: gbuffer_emissive,
        },
        motion,
        prev_surfaces: SurfaceMap::new(prev_surface_map),
        surfaces: SurfaceMap::new(surface_map),
        reprojection_map: ReprojectionMap::new(reprojection_map),
    }
    .run(global_id.xy());
}
