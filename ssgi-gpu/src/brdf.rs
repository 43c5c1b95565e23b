use core::f32::consts::PI;

use glam::{vec3, Vec2, Vec3};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{lerp, F32Ext, Vec3Ext};

pub struct DiffuseBrdf;

impl DiffuseBrdf {
    /// Generates a cosine-weighted direction on the hemisphere around given
    /// normal.
    pub fn sample(normal: Vec3, u: Vec2) -> Vec3 {
        let radius = u.x.sqrt();
        let angle = 2.0 * PI * u.y;
        let (t, b) = normal.any_orthonormal_pair();

        let dir = t * (radius * angle.cos())
            + b * (radius * angle.sin())
            + normal * (1.0 - u.x).max(0.0).sqrt();

        dir.normalize()
    }

    /// Probability density of [`Self::sample()`] generating given direction.
    pub fn pdf(normal: Vec3, dir: Vec3) -> f32 {
        normal.dot(dir).max(0.0) / PI
    }
}

pub struct SpecularBrdf;

impl SpecularBrdf {
    /// Generates a reflection direction for given view direction (pointing
    /// towards the viewer), perturbed by the surface's roughness through GGX
    /// visible-normal sampling.
    pub fn sample(v: Vec3, normal: Vec3, roughness: f32, u: Vec2) -> Vec3 {
        let alpha = roughness.sqr().max(0.001);
        let (t, b) = normal.any_orthonormal_pair();
        let v_local = vec3(v.dot(t), v.dot(b), v.dot(normal));
        let h = Self::ggx_vndf(v_local, alpha, u);
        let h = t * h.x + b * h.y + normal * h.z;
        let l = (-v).reflect(h);

        if l.dot(normal) > 0.0 {
            l
        } else {
            (-v).reflect(normal)
        }
    }

    fn ggx_vndf(v_local: Vec3, alpha: f32, u: Vec2) -> Vec3 {
        let v_h =
            vec3(alpha * v_local.x, alpha * v_local.y, v_local.z).normalize();

        let len = v_h.x * v_h.x + v_h.y * v_h.y;

        let tt1 = if len > 0.0 {
            vec3(-v_h.y, v_h.x, 0.0) * (1.0 / len.sqrt())
        } else {
            vec3(1.0, 0.0, 0.0)
        };

        let tt2 = v_h.cross(tt1);

        let r = u.x.sqrt();
        let phi = 2.0 * PI * u.y;
        let t1 = r * phi.cos();
        let t2 = r * phi.sin();
        let s = 0.5 * (1.0 + v_h.z);
        let t2 = (1.0 - s) * (1.0 - t1 * t1).max(0.0).sqrt() + s * t2;

        let n_h = t1 * tt1
            + t2 * tt2
            + (1.0 - t1 * t1 - t2 * t2).max(0.0).sqrt() * v_h;

        vec3(alpha * n_h.x, alpha * n_h.y, n_h.z.max(0.0)).normalize()
    }
}

/// Schlick's approximation of the Fresnel term, accounting for roughness
/// when integrated over the whole hemisphere.
pub fn fresnel_schlick_roughness(
    n_o_v: f32,
    f0: Vec3,
    roughness: f32,
) -> Vec3 {
    let f90 = Vec3::splat(1.0 - roughness).max(f0);

    f0 + (f90 - f0) * (1.0 - n_o_v.saturate()).powf(5.0)
}

/// Reflectance at normal incidence for given albedo and metalness.
pub fn base_reflectance(albedo: Vec3, metalness: f32) -> Vec3 {
    lerp(Vec3::splat(0.04), albedo, metalness)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec2;

    use super::*;

    #[test]
    fn diffuse_samples_stay_in_hemisphere() {
        let normal = vec3(0.3, 0.9, -0.1).normalize();

        for i in 0..16 {
            for j in 0..16 {
                let u = vec2(i as f32 / 16.0, j as f32 / 16.0);
                let dir = DiffuseBrdf::sample(normal, u);

                assert!(dir.dot(normal) >= 0.0);
                assert_relative_eq!(1.0, dir.length(), epsilon = 0.0001);
            }
        }
    }

    #[test]
    fn smooth_specular_is_mirror_reflection() {
        let normal = Vec3::Y;
        let v = vec3(1.0, 1.0, 0.0).normalize();
        let l = SpecularBrdf::sample(v, normal, 0.0, vec2(0.3, 0.7));

        assert_relative_eq!(-v.x, l.x, epsilon = 0.01);
        assert_relative_eq!(v.y, l.y, epsilon = 0.01);
    }

    #[test]
    fn fresnel() {
        let f0 = Vec3::splat(0.04);

        assert_relative_eq!(0.04, fresnel_schlick_roughness(1.0, f0, 0.0).x);
        assert_relative_eq!(1.0, fresnel_schlick_roughness(0.0, f0, 0.0).x);
    }
}
