use ssgi_gpu::prelude::*;

#[spirv(vertex)]
pub fn vs(
    #[spirv(vertex_index)] vert_idx: i32,
    #[spirv(position)] output: &mut Vec4,
) {
    fn full_screen_triangle(vert_idx: i32) -> Vec4 {
        let uv = vec2(((vert_idx << 1) & 2) as f32, (vert_idx & 2) as f32);
        let pos = 2.0 * uv - Vec2::ONE;

        pos.extend(0.0).extend(1.0)
    }

    *output = full_screen_triangle(vert_idx);
}

#[spirv(fragment)]
pub fn fs(
    #[spirv(frag_coord)] pos: Vec4,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] camera: &Camera,
    #[spirv(descriptor_set = 0, binding = 1, uniform)]
    params: &CompositionPassParams,
    #[spirv(descriptor_set = 0, binding = 2)] gbuffer_depth: Tex,
    #[spirv(descriptor_set = 0, binding = 3)] gbuffer_normal: Tex,
    #[spirv(descriptor_set = 0, binding = 4)] gbuffer_albedo: Tex,
    #[spirv(descriptor_set = 0, binding = 5)] gbuffer_emissive: Tex,
    #[spirv(descriptor_set = 0, binding = 6)] direct_light: Tex,
    #[spirv(descriptor_set = 0, binding = 7)] diffuse: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 8)] specular: TexRgba32,
    frag_color: &mut Vec4,
) {
    *frag_color = Composer {
        camera,
        params,
        gbuffer: GBuffer {
            depth: gbuffer_depth,
            normal: gbuffer_normal,
            albedo: gbuffer_albedo,
            emissive: gbuffer_emissive,
        },
        direct_light,
        diffuse,
        specular,
    }
    .run(pos.xy().as_uvec2());
}
