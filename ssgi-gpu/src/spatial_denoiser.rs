use glam::{ivec2, IVec2, UVec2, Vec3, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{
    lerp, BilinearFilter, Camera, DenoisePassParams, DenoiseStep, F32Ext,
    GBuffer, GBufferEntry, StorageTexture2d, Texture2d, Vec3Ext, SSGI_EPSILON,
};

/// Single sub-pass of the à-trous denoiser, filtering one radiance channel.
///
/// The input holds `rgb` + variance (except for the very first sub-pass,
/// where variance comes from the temporal moments); the output holds the
/// same layout, with variance propagated through the filter weights.
pub struct SpatialDenoiser<'a, T, S>
where
    T: Texture2d + ?Sized,
    S: StorageTexture2d + ?Sized,
{
    pub camera: &'a Camera,
    pub params: &'a DenoisePassParams,
    pub step: &'a DenoiseStep,
    pub gbuffer: GBuffer<'a, T>,
    pub moments: &'a S,
    pub input: &'a S,
    pub output: &'a S,
}

/// Center pixel's data shared by all of the taps.
struct Center {
    position: Vec3,
    normal: Vec3,
    roughness: f32,
    luma: f32,
    color_phi: f32,
    boost: f32,
}

impl<'a, T, S> SpatialDenoiser<'a, T, S>
where
    T: Texture2d + ?Sized,
    S: StorageTexture2d + ?Sized,
{
    /// Variance above which a pixel is considered to be still settling and
    /// gets blurred regardless of its neighbours' similarity.
    pub const MAX_VARIANCE: f32 = 1000.0;

    /// Histories younger than this estimate their variance spatially.
    pub const MIN_AGE: f32 = 4.0;

    /// Roughness below which taps of roughness-dependent channels contract
    /// towards the center.
    const SMOOTH_ROUGHNESS: f32 = 0.15;

    pub fn run(self, screen_pos: UVec2) {
        if !self.camera.contains(screen_pos.as_ivec2()) {
            return;
        }

        let center = self.input.load(screen_pos);
        let gbuffer = self.gbuffer_at(screen_pos.as_ivec2());

        let variance = if self.step.is_first() {
            self.center_variance(screen_pos)
        } else {
            center.w
        };

        if gbuffer.is_none() || self.step.is_passthrough() {
            self.output.store(screen_pos, center.xyz().extend(variance));
            return;
        }

        let variance = variance.clamp(0.0, Self::MAX_VARIANCE);
        let roughness = gbuffer.roughness.sqr();
        let uv = self.camera.screen_to_uv(screen_pos);

        let variance_floor = if self.params.has(DenoisePassParams::ROUGHNESS_DEPENDENT) {
            self.params.basic_variance * roughness
        } else {
            self.params.basic_variance
        };

        let center_data = Center {
            position: self.camera.uv_to_view(uv, gbuffer.depth),
            normal: gbuffer.normal,
            roughness,
            luma: center.xyz().luma(),
            color_phi: (self.params.strength * (variance_floor + variance).sqrt())
                .max(SSGI_EPSILON),
            boost: (variance / Self::MAX_VARIANCE).min(1.0),
        };

        let dir = self.tap_direction();
        let kernel = self.params.kernel as i32;
        let step_size = self.step.step_size();

        let mut color_sum = center.xyz();
        let mut weight_sum = 1.0;
        let mut variance_sum = variance;
        let mut i = -kernel;

        while i <= kernel {
            if i != 0 {
                let offset = dir * (i * step_size);

                let (color, variance, weight) =
                    self.tap(screen_pos, offset, &center_data);

                color_sum += color * weight;
                weight_sum += weight;
                variance_sum += weight * weight * variance;
            }

            i += 1;
        }

        self.output.store(
            screen_pos,
            (color_sum / weight_sum)
                .extend(variance_sum / (weight_sum * weight_sum)),
        );
    }

    /// Returns neighbour's color, variance and weight; taps outside of the
    /// screen or on background get zero weight.
    fn tap(
        &self,
        screen_pos: UVec2,
        offset: IVec2,
        center: &Center,
    ) -> (Vec3, f32, f32) {
        let pos = screen_pos.as_ivec2() + offset;

        if !self.camera.contains(pos) {
            return (Vec3::ZERO, 0.0, 0.0);
        }

        let gbuffer = self.gbuffer_at(pos);

        if gbuffer.is_none() {
            return (Vec3::ZERO, 0.0, 0.0);
        }

        let uv = self.camera.screen_to_uv(pos.as_uvec2());
        let position = self.camera.uv_to_view(uv, gbuffer.depth);

        let plane_distance = center.normal.dot(position - center.position).abs();
        let mut weight = (1.0 - plane_distance / self.params.depth_phi).max(0.0);

        weight *= center
            .normal
            .dot(gbuffer.normal)
            .max(0.0)
            .powf(self.params.normal_phi);

        if self.params.has(DenoisePassParams::ROUGHNESS_AWARE) {
            let diff = (center.roughness - gbuffer.roughness.sqr()).abs();

            weight *= (-diff * self.params.roughness_phi).exp();
        }

        let neighbour = self.input.load(pos.as_uvec2());

        let color = if self.params.has(DenoisePassParams::ROUGHNESS_DEPENDENT)
            && center.roughness < Self::SMOOTH_ROUGHNESS
        {
            let scale = center.roughness / Self::SMOOTH_ROUGHNESS;
            let pos = screen_pos.as_vec2() + offset.as_vec2() * scale;

            BilinearFilter::sample(pos, self.camera.screen_size(), |pos| {
                self.input.load(pos)
            })
            .xyz()
        } else {
            neighbour.xyz()
        };

        let luma_diff = (center.luma - color.luma()).abs();
        let luma_weight = (1.0 - luma_diff / center.color_phi).max(0.0);

        let weight = lerp((weight * luma_weight).min(1.0), 1.0, center.boost);

        let variance = if self.step.is_first() {
            self.moments_variance(self.moments.load(pos.as_uvec2()))
        } else {
            neighbour.w.clamp(0.0, Self::MAX_VARIANCE)
        };

        (color, variance, weight)
    }

    fn tap_direction(&self) -> IVec2 {
        match (self.step.is_axis_aligned(), self.step.direction) {
            (true, 0) => ivec2(1, 0),
            (true, _) => ivec2(0, 1),
            (false, 0) => ivec2(1, 1),
            (false, _) => ivec2(1, -1),
        }
    }

    fn gbuffer_at(&self, screen_pos: IVec2) -> GBufferEntry {
        let uv = self.camera.screen_to_uv(screen_pos.as_uvec2());

        self.gbuffer.get(self.camera.uv_to_gbuffer(uv))
    }

    fn moments_variance(&self, moments: Vec4) -> f32 {
        (moments.y - moments.x * moments.x).clamp(0.0, Self::MAX_VARIANCE)
    }

    /// Estimates the center's variance from temporal moments, falling back to
    /// a spatial estimate over a 7x7 window for young histories.
    fn center_variance(&self, screen_pos: UVec2) -> f32 {
        let moments = self.moments.load(screen_pos);

        if moments.z >= Self::MIN_AGE {
            return self.moments_variance(moments);
        }

        let mut m1 = 0.0;
        let mut m2 = 0.0;
        let mut count = 0.0;
        let mut y = -3;

        while y <= 3 {
            let mut x = -3;

            while x <= 3 {
                let pos = screen_pos.as_ivec2() + ivec2(x, y);

                if self.camera.contains(pos) && self.gbuffer_at(pos).is_some() {
                    let moments = self.moments.load(pos.as_uvec2());

                    m1 += moments.x;
                    m2 += moments.y;
                    count += 1.0;
                }

                x += 1;
            }

            y += 1;
        }

        if count == 0.0 {
            return self.moments_variance(moments);
        }

        let m1 = m1 / count;
        let m2 = m2 / count;

        (m2 - m1 * m1).clamp(0.0, Self::MAX_VARIANCE)
    }
}
