use glam::{vec2, vec4, IVec2, UVec2, Vec2, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{
    BilinearFilter, Camera, GBuffer, StorageTexture2d, Surface, SurfaceMap,
    Texture2d,
};

#[derive(Clone, Copy, Default)]
pub struct Reprojection {
    pub prev_x: f32,
    pub prev_y: f32,
    pub confidence: f32,

    /// Bitmask telling which of the four texels surrounding the previous
    /// position hold a matching surface, in the order of
    /// [`BilinearFilter::coords()`].
    pub validity: u32,
}

impl Reprojection {
    pub fn serialize(&self) -> Vec4 {
        vec4(
            self.prev_x,
            self.prev_y,
            self.confidence,
            f32::from_bits(self.validity),
        )
    }

    pub fn deserialize(d0: Vec4) -> Self {
        Self {
            prev_x: d0.x,
            prev_y: d0.y,
            confidence: d0.z,
            validity: d0.w.to_bits(),
        }
    }

    pub fn is_some(&self) -> bool {
        self.confidence > 0.0
    }

    pub fn is_none(&self) -> bool {
        !self.is_some()
    }

    pub fn prev_pos(&self) -> Vec2 {
        vec2(self.prev_x, self.prev_y)
    }

    pub fn prev_pos_round(&self) -> UVec2 {
        self.prev_pos().round().as_uvec2()
    }

    pub fn prev_pos_fract(&self) -> Vec2 {
        self.prev_pos() - self.prev_pos().floor()
    }

    pub fn is_exact(&self) -> bool {
        self.prev_pos_fract().length_squared() == 0.0
    }
}

pub struct ReprojectionMap<'a, T>
where
    T: Texture2d + ?Sized,
{
    tex: &'a T,
}

impl<'a, T> Clone for ReprojectionMap<'a, T>
where
    T: Texture2d + ?Sized,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for ReprojectionMap<'a, T> where T: Texture2d + ?Sized {}

impl<'a, T> ReprojectionMap<'a, T>
where
    T: Texture2d + ?Sized,
{
    pub fn new(tex: &'a T) -> Self {
        Self { tex }
    }

    pub fn get(&self, screen_pos: UVec2) -> Reprojection {
        Reprojection::deserialize(self.tex.load(screen_pos))
    }
}

impl<'a, T> ReprojectionMap<'a, T>
where
    T: StorageTexture2d + ?Sized,
{
    pub fn set(&self, screen_pos: UVec2, reprojection: &Reprojection) {
        self.tex.store(screen_pos, reprojection.serialize());
    }
}

/// Finds where each pixel was located in the previous frame and whether the
/// surface seen there matches the current one.
///
/// Motion vectors are expected in uv-units, as `current uv - previous uv`.
pub struct FrameReprojection<'a, T, S>
where
    T: Texture2d + ?Sized,
    S: StorageTexture2d + ?Sized,
{
    pub camera: &'a Camera,
    pub gbuffer: GBuffer<'a, T>,
    pub motion: &'a T,
    pub prev_surfaces: SurfaceMap<'a, S>,
    pub surfaces: SurfaceMap<'a, S>,
    pub reprojection_map: ReprojectionMap<'a, S>,
}

impl<'a, T, S> FrameReprojection<'a, T, S>
where
    T: Texture2d + ?Sized,
    S: StorageTexture2d + ?Sized,
{
    /// Previous positions closer than this to a pixel center are snapped to
    /// it, so that integer motion reprojects exactly.
    const SNAP_DISTANCE: f32 = 0.001;

    pub fn run(self, screen_pos: UVec2) {
        if !self.camera.contains(screen_pos.as_ivec2()) {
            return;
        }

        let uv = self.camera.screen_to_uv(screen_pos);
        let gbuffer_pos = self.camera.uv_to_gbuffer(uv);
        let gbuffer = self.gbuffer.get(gbuffer_pos);

        let surface = if gbuffer.is_some() {
            Surface {
                normal: self
                    .camera
                    .view_to_world_dir(gbuffer.normal)
                    .normalize(),
                depth: self.camera.linear_depth(gbuffer.depth),
            }
        } else {
            Surface::default()
        };

        self.surfaces.set(screen_pos, &surface);

        let reprojection = if surface.is_sky() {
            Reprojection::default()
        } else {
            let motion = self.motion.load(gbuffer_pos).xy();

            self.reproject(surface, uv - motion)
        };

        self.reprojection_map.set(screen_pos, &reprojection);
    }

    fn reproject(&self, surface: Surface, prev_uv: Vec2) -> Reprojection {
        if !self.camera.contains_uv(prev_uv) {
            return Reprojection::default();
        }

        let mut prev_pos = self.camera.uv_to_screen(prev_uv);

        if (prev_pos - prev_pos.round()).abs().max_element()
            < Self::SNAP_DISTANCE
        {
            prev_pos = prev_pos.round();
        }

        let [p00, p10, p01, p11] = BilinearFilter::coords(prev_pos);
        let mut validity = 0;

        if self.is_valid_history(p00, &surface) {
            validity |= 0b0001;
        }

        if self.is_valid_history(p10, &surface) {
            validity |= 0b0010;
        }

        if self.is_valid_history(p01, &surface) {
            validity |= 0b0100;
        }

        if self.is_valid_history(p11, &surface) {
            validity |= 0b1000;
        }

        let exact = (prev_pos - prev_pos.floor()).length_squared() == 0.0;

        let confidence = if exact {
            (validity & 1) as f32
        } else if validity > 0 {
            1.0
        } else {
            0.0
        };

        Reprojection {
            prev_x: prev_pos.x,
            prev_y: prev_pos.y,
            confidence,
            validity,
        }
    }

    fn is_valid_history(&self, pos: IVec2, surface: &Surface) -> bool {
        if !self.camera.contains(pos) {
            return false;
        }

        surface.is_similar_to(&self.prev_surfaces.get(pos.as_uvec2()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization() {
        let target = Reprojection {
            prev_x: 123.45,
            prev_y: 234.56,
            confidence: 1.0,
            validity: 0b1011,
        };

        let target = Reprojection::deserialize(target.serialize());

        assert_eq!(123.45, target.prev_x);
        assert_eq!(234.56, target.prev_y);
        assert_eq!(1.0, target.confidence);
        assert_eq!(0b1011, target.validity);
    }
}
