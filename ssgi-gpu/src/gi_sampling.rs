use core::f32::consts::PI;

use glam::{vec2, UVec2, Vec2, Vec3, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{
    BlueNoise, Camera, DiffuseBrdf, EnvironmentSampler, GBuffer, Mode,
    RayMarchPassParams, RayMarcher, SampledTexture2d, SpecularBrdf,
    Texture2d, WhiteNoise,
};

/// Indirect radiance gathered for a single pixel; `.xyz` holds the average
/// radiance and `.w` is `1.0` if any of the rays hit geometry.
#[derive(Clone, Copy, Default)]
pub struct GiSample {
    pub diffuse: Vec4,
    pub specular: Vec4,
}

/// Traces `SPP` diffuse and/or specular rays per pixel, shading the hits with
/// what's visible on screen and the misses with the environment map.
pub struct GiSampler<'a, T, U, E>
where
    T: Texture2d + ?Sized,
    U: Texture2d + ?Sized,
    E: SampledTexture2d + ?Sized,
{
    pub camera: &'a Camera,
    pub params: &'a RayMarchPassParams,
    pub gbuffer: GBuffer<'a, T>,
    pub back_depth: &'a T,
    pub direct_light: &'a T,
    pub blue_noise: &'a T,
    pub environment: EnvironmentSampler<'a, E, T>,

    /// Previous frame's denoised diffuse radiance
    pub bounce: &'a U,
}

impl<'a, T, U, E> GiSampler<'a, T, U, E>
where
    T: Texture2d + ?Sized,
    U: Texture2d + ?Sized,
    E: SampledTexture2d + ?Sized,
{
    pub fn run<const SPP: u32>(&self, mode: Mode, screen_pos: UVec2) -> GiSample {
        let uv = self.camera.screen_to_uv(screen_pos);
        let gbuffer = self.gbuffer.get(self.camera.uv_to_gbuffer(uv));

        if gbuffer.is_none() || gbuffer.roughness > self.params.max_roughness
        {
            return Default::default();
        }

        let position = self.camera.uv_to_view(uv, gbuffer.depth);

        // Lift the origin off the surface, so that rays leaving at grazing
        // angles don't intersect it
        let origin = position + gbuffer.normal * (-position.z * 0.002);

        let mut diffuse = Vec3::ZERO;
        let mut diffuse_hit = 0.0;
        let mut specular = Vec3::ZERO;
        let mut specular_hit = 0.0;
        let mut sample_idx = 0;

        while sample_idx < SPP {
            let noise =
                self.noise(screen_pos, self.params.frame.wrapping_add(sample_idx));

            let jitter = noise.x + noise.z;
            let jitter = jitter - jitter.floor();

            if mode.has_diffuse() {
                let (radiance, is_hit) = self.trace_diffuse(
                    origin,
                    gbuffer.normal,
                    noise.xy(),
                    jitter,
                );

                diffuse += radiance;

                if is_hit {
                    diffuse_hit = 1.0;
                }
            }

            if mode.has_specular() {
                let (radiance, is_hit) = self.trace_specular(
                    origin,
                    gbuffer.normal,
                    gbuffer.roughness,
                    noise.zw(),
                    jitter,
                );

                specular += radiance;

                if is_hit {
                    specular_hit = 1.0;
                }
            }

            sample_idx += 1;
        }

        let spp = SPP as f32;

        GiSample {
            diffuse: (diffuse / spp).extend(diffuse_hit),
            specular: (specular / spp).extend(specular_hit),
        }
    }

    fn noise(&self, screen_pos: UVec2, frame: u32) -> Vec4 {
        if self.params.blue_noise_size > 0 {
            BlueNoise::new(
                self.blue_noise,
                self.params.blue_noise_size,
                screen_pos,
                frame,
            )
            .sample()
        } else {
            WhiteNoise::new(frame, screen_pos).sample_vec4()
        }
    }

    fn trace_diffuse(
        &self,
        origin: Vec3,
        normal: Vec3,
        u: Vec2,
        jitter: f32,
    ) -> (Vec3, bool) {
        let use_environment = self
            .params
            .has(RayMarchPassParams::IMPORTANCE_SAMPLING)
            && self.params.has(RayMarchPassParams::HAS_ENVIRONMENT);

        if !use_environment {
            let dir = DiffuseBrdf::sample(normal, u);

            return self.trace(origin, dir, jitter, 0.0);
        }

        // Multiple importance sampling between the cosine lobe and the
        // environment map, with the strategy picked by `u.y` and the balance
        // heuristic
        let normal_ws = self.camera.view_to_world_dir(normal);

        let dir_ws = if u.y < 0.5 {
            self.environment.sample(vec2(u.x, u.y * 2.0)).0
        } else {
            let dir = DiffuseBrdf::sample(normal, vec2(u.x, (u.y - 0.5) * 2.0));

            self.camera.view_to_world_dir(dir)
        };

        let cos = normal_ws.dot(dir_ws);

        if cos <= 0.0 {
            return (Vec3::ZERO, false);
        }

        let brdf_pdf = cos / PI;
        let env_pdf = self.environment.pdf(dir_ws);
        let weight = brdf_pdf / (0.5 * brdf_pdf + 0.5 * env_pdf);

        let (radiance, is_hit) = self.trace(
            origin,
            self.camera.world_to_view_dir(dir_ws),
            jitter,
            0.0,
        );

        (radiance * weight, is_hit)
    }

    fn trace_specular(
        &self,
        origin: Vec3,
        normal: Vec3,
        roughness: f32,
        u: Vec2,
        jitter: f32,
    ) -> (Vec3, bool) {
        let dir = SpecularBrdf::sample(-origin.normalize(), normal, roughness, u);

        let lod = self.params.env_blur
            * self.params.env_max_mip
            * roughness.max(0.0).sqrt();

        self.trace(origin, dir, jitter, lod)
    }

    /// Marches given view-space ray and returns radiance coming from its
    /// direction, along with whether it hit anything on screen.
    fn trace(
        &self,
        origin: Vec3,
        dir: Vec3,
        jitter: f32,
        env_lod: f32,
    ) -> (Vec3, bool) {
        let hit = RayMarcher {
            camera: self.camera,
            params: self.params,
            depth: self.gbuffer.depth,
            back_depth: self.back_depth,
        }
        .march(origin, dir, jitter);

        let is_hit = hit.is_hit
            || (hit.is_on_screen
                && self.params.has(RayMarchPassParams::MISSED_RAYS));

        if is_hit {
            (self.radiance_at(hit.uv), true)
        } else if self.params.has(RayMarchPassParams::HAS_ENVIRONMENT) {
            let dir = self.camera.view_to_world_dir(dir);

            (self.environment.radiance(dir, env_lod), false)
        } else {
            (Vec3::ZERO, false)
        }
    }

    /// Returns radiance leaving the surface visible at given uv-coordinates.
    fn radiance_at(&self, uv: Vec2) -> Vec3 {
        let pos = self.camera.uv_to_gbuffer(uv);
        let surface = self.gbuffer.get(pos);

        if surface.is_none() {
            return Vec3::ZERO;
        }

        let mut radiance = surface.emissive;

        if self.params.has(RayMarchPassParams::HAS_DIRECT_LIGHT) {
            radiance += self.direct_light.load(pos).xyz()
                * self.params.direct_light_multiplier;
        }

        if self.params.has(RayMarchPassParams::MULTI_BOUNCE) {
            let max = self.camera.screen_size() - UVec2::ONE;

            let bounce_pos = self
                .camera
                .uv_to_screen(uv)
                .round()
                .max(Vec2::ZERO)
                .as_uvec2()
                .min(max);

            radiance += surface.albedo
                * (1.0 - surface.metalness)
                * self.bounce.load(bounce_pos).xyz();
        }

        radiance
    }
}
