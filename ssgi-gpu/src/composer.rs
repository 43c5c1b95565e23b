use glam::{vec3, UVec2, Vec3, Vec4, Vec4Swizzles};

use crate::{
    base_reflectance, fresnel_schlick_roughness, BilinearFilter, Camera,
    CompositionPassParams, GBuffer, Texture2d,
};

#[derive(Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, Hash))]
pub enum ToneMapping {
    #[default]
    None,
    Reinhard,
    Aces,
}

impl ToneMapping {
    pub fn serialize(self) -> u32 {
        match self {
            ToneMapping::None => 0,
            ToneMapping::Reinhard => 1,
            ToneMapping::Aces => 2,
        }
    }

    pub fn deserialize(d0: u32) -> Self {
        match d0 {
            1 => ToneMapping::Reinhard,
            2 => ToneMapping::Aces,
            _ => ToneMapping::None,
        }
    }

    pub fn apply(self, color: Vec3, exposure: f32) -> Vec3 {
        let color = color * exposure;

        match self {
            ToneMapping::None => color,
            ToneMapping::Reinhard => color / (color + Vec3::ONE),
            ToneMapping::Aces => aces(color),
        }
    }
}

/// Fitted ACES curve, operating in the sRGB primaries.
fn aces(color: Vec3) -> Vec3 {
    let color = vec3(
        color.x * 0.59719 + color.y * 0.35458 + color.z * 0.04823,
        color.x * 0.07600 + color.y * 0.90834 + color.z * 0.01566,
        color.x * 0.02840 + color.y * 0.13383 + color.z * 0.83777,
    );

    let a = color * (color + 0.0245786) - 0.000090537;
    let b = color * (color * 0.983729 + 0.432951) + 0.238081;
    let color = a / b;

    vec3(
        color.x * 1.60475 - color.y * 0.53108 - color.z * 0.07367,
        -color.x * 0.10208 + color.y * 1.10813 - color.z * 0.00605,
        -color.x * 0.00327 - color.y * 0.07276 + color.z * 1.07602,
    )
    .clamp(Vec3::ZERO, Vec3::ONE)
}

/// Combines direct lighting with the denoised indirect lighting.
///
/// Runs at the G-buffer's resolution; indirect lighting gets upsampled
/// bilinearly from the effect's internal resolution.
pub struct Composer<'a, T, S>
where
    T: Texture2d + ?Sized,
    S: Texture2d + ?Sized,
{
    pub camera: &'a Camera,
    pub params: &'a CompositionPassParams,
    pub gbuffer: GBuffer<'a, T>,
    pub direct_light: &'a T,
    pub diffuse: &'a S,
    pub specular: &'a S,
}

impl<'a, T, S> Composer<'a, T, S>
where
    T: Texture2d + ?Sized,
    S: Texture2d + ?Sized,
{
    pub fn run(self, gbuffer_pos: UVec2) -> Vec4 {
        let direct = self.direct_light.load(gbuffer_pos).xyz();
        let gbuffer = self.gbuffer.get(gbuffer_pos);
        let mut color = direct;

        if gbuffer.is_some() {
            let uv = self.camera.gbuffer_to_uv(gbuffer_pos);
            let pos = self.camera.uv_to_screen(uv);
            let size = self.camera.screen_size();

            if self.params.has(CompositionPassParams::HAS_DIFFUSE) {
                let diffuse = BilinearFilter::sample(pos, size, |pos| {
                    self.diffuse.load(pos)
                })
                .xyz();

                color += gbuffer.albedo * (1.0 - gbuffer.metalness) * diffuse;
            }

            if self.params.has(CompositionPassParams::HAS_SPECULAR) {
                let specular = BilinearFilter::sample(pos, size, |pos| {
                    self.specular.load(pos)
                })
                .xyz();

                let view_dir =
                    -self.camera.uv_to_view(uv, gbuffer.depth).normalize();

                let fresnel = fresnel_schlick_roughness(
                    gbuffer.normal.dot(view_dir),
                    base_reflectance(gbuffer.albedo, gbuffer.metalness),
                    gbuffer.roughness,
                );

                color += fresnel * specular;
            }
        }

        ToneMapping::deserialize(self.params.tone_mapping)
            .apply(color, self.params.exposure)
            .extend(1.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::uvec2;

    use super::*;
    use crate::cpu::testing::{camera, TestGBuffer};
    use crate::{CpuTexture, GBufferEntry};

    #[test]
    fn tone_mapping() {
        let color = vec3(0.5, 1.0, 4.0);

        assert_eq!(color * 2.0, ToneMapping::None.apply(color, 2.0));

        assert_relative_eq!(
            0.8,
            ToneMapping::Reinhard.apply(color, 1.0).z,
            epsilon = 0.0001
        );

        let aces = ToneMapping::Aces.apply(Vec3::splat(1000.0), 1.0);

        assert!(aces.cmple(Vec3::ONE).all());
        assert!(aces.cmpgt(Vec3::splat(0.9)).all());

        for mapping in [ToneMapping::None, ToneMapping::Reinhard, ToneMapping::Aces] {
            assert_eq!(mapping, ToneMapping::deserialize(mapping.serialize()));
        }
    }

    #[test]
    fn composition() {
        let camera = camera();

        let gbuffer = TestGBuffer::wall(
            &camera,
            5.0,
            GBufferEntry {
                albedo: vec3(0.5, 0.5, 0.5),
                roughness: 1.0,
                ..Default::default()
            },
        );

        let direct_light = CpuTexture::filled(camera.gbuffer_size(), Vec4::splat(0.25));
        let diffuse = CpuTexture::filled(camera.screen_size(), Vec4::splat(1.0));
        let specular = CpuTexture::filled(camera.screen_size(), Vec4::splat(0.0));

        let compose = |flags| {
            let params = CompositionPassParams {
                flags,
                exposure: 1.0,
                ..Default::default()
            };

            Composer {
                camera: &camera,
                params: &params,
                gbuffer: gbuffer.get(),
                direct_light: &direct_light,
                diffuse: &diffuse,
                specular: &specular,
            }
            .run(uvec2(17, 9))
        };

        assert_relative_eq!(0.25, compose(0).x);
        assert_relative_eq!(0.75, compose(CompositionPassParams::HAS_DIFFUSE).x);

        assert_relative_eq!(
            0.25,
            compose(CompositionPassParams::HAS_SPECULAR).x
        );
    }

    #[test]
    fn background_passes_direct_light_through() {
        let camera = camera();
        let gbuffer = TestGBuffer::from_fn(&camera, |_| GBufferEntry::default());
        let direct_light = CpuTexture::filled(camera.gbuffer_size(), Vec4::splat(0.5));
        let diffuse = CpuTexture::filled(camera.screen_size(), Vec4::splat(10.0));

        let params = CompositionPassParams {
            flags: CompositionPassParams::HAS_DIFFUSE
                | CompositionPassParams::HAS_SPECULAR,
            exposure: 1.0,
            ..Default::default()
        };

        let color = Composer {
            camera: &camera,
            params: &params,
            gbuffer: gbuffer.get(),
            direct_light: &direct_light,
            diffuse: &diffuse,
            specular: &diffuse,
        }
        .run(uvec2(3, 3));

        assert_relative_eq!(0.5, color.x);
    }
}
