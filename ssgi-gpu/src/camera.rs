use bytemuck::{Pod, Zeroable};
use glam::{vec2, vec3, vec4, IVec2, Mat4, UVec2, Vec2, Vec3, Vec4, Vec4Swizzles};

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct Camera {
    pub projection: Mat4,
    pub projection_inv: Mat4,

    /// World-space to view-space transformation.
    pub view: Mat4,

    /// View-space to world-space transformation.
    pub view_inv: Mat4,

    /// x, y - size of the effect's internal buffers (scaled by the resolution
    /// scale); z, w - size of the G-buffer
    pub screen: Vec4,

    /// x - near plane
    pub clip: Vec4,
}

impl Camera {
    pub fn new(
        projection: Mat4,
        view: Mat4,
        near: f32,
        screen_size: UVec2,
        gbuffer_size: UVec2,
    ) -> Self {
        Self {
            projection,
            projection_inv: projection.inverse(),
            view,
            view_inv: view.inverse(),
            screen: vec4(
                screen_size.x as f32,
                screen_size.y as f32,
                gbuffer_size.x as f32,
                gbuffer_size.y as f32,
            ),
            clip: vec4(near, 0.0, 0.0, 0.0),
        }
    }

    pub fn screen_size(&self) -> UVec2 {
        self.screen.xy().as_uvec2()
    }

    pub fn gbuffer_size(&self) -> UVec2 {
        self.screen.zw().as_uvec2()
    }

    pub fn near(&self) -> f32 {
        self.clip.x
    }

    /// Returns whether given point lays inside the screen.
    pub fn contains(&self, pos: IVec2) -> bool {
        let screen_size = self.screen.xy().as_ivec2();

        pos.x >= 0
            && pos.y >= 0
            && pos.x < screen_size.x
            && pos.y < screen_size.y
    }

    /// Returns whether given uv-coordinates point inside the screen.
    pub fn contains_uv(&self, uv: Vec2) -> bool {
        uv.x >= 0.0 && uv.y >= 0.0 && uv.x <= 1.0 && uv.y <= 1.0
    }

    /// Given a pixel of the internal buffers, returns uv-coordinates of its
    /// center.
    pub fn screen_to_uv(&self, pos: UVec2) -> Vec2 {
        (pos.as_vec2() + 0.5) / self.screen.xy()
    }

    /// Given uv-coordinates, returns a (fractional) pixel position in the
    /// internal buffers, with integer values landing on pixel centers.
    pub fn uv_to_screen(&self, uv: Vec2) -> Vec2 {
        uv * self.screen.xy() - 0.5
    }

    /// Given a G-buffer texel, returns uv-coordinates of its center.
    pub fn gbuffer_to_uv(&self, pos: UVec2) -> Vec2 {
        (pos.as_vec2() + 0.5) / self.screen.zw()
    }

    /// Given uv-coordinates, returns the G-buffer texel covering them.
    pub fn uv_to_gbuffer(&self, uv: Vec2) -> UVec2 {
        let max = self.gbuffer_size() - UVec2::ONE;

        (uv.max(Vec2::ZERO) * self.screen.zw()).as_uvec2().min(max)
    }

    /// Given uv-coordinates and a non-linear (NDC) depth, returns the point in
    /// view-space.
    pub fn uv_to_view(&self, uv: Vec2, depth: f32) -> Vec3 {
        let ndc = vec3(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, depth);

        self.projection_inv.project_point3(ndc)
    }

    /// Given a point in view-space, returns it in clip-coordinates.
    pub fn view_to_clip(&self, pos: Vec3) -> Vec4 {
        self.projection * pos.extend(1.0)
    }

    /// Given a point in clip-coordinates, returns it in uv-coordinates.
    pub fn clip_to_uv(&self, pos: Vec4) -> Vec2 {
        let ndc = pos.xy() / pos.w;

        vec2(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5)
    }

    pub fn view_to_uv(&self, pos: Vec3) -> Vec2 {
        self.clip_to_uv(self.view_to_clip(pos))
    }

    /// Converts a non-linear (NDC) depth into the distance along the view
    /// axis.
    pub fn linear_depth(&self, depth: f32) -> f32 {
        -self.uv_to_view(Vec2::splat(0.5), depth).z
    }

    pub fn view_to_world(&self, pos: Vec3) -> Vec3 {
        self.view_inv.transform_point3(pos)
    }

    pub fn view_to_world_dir(&self, dir: Vec3) -> Vec3 {
        self.view_inv.transform_vector3(dir)
    }

    pub fn world_to_view_dir(&self, dir: Vec3) -> Vec3 {
        self.view.transform_vector3(dir)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::uvec2;

    use super::*;
    use crate::cpu::testing::camera;

    #[test]
    fn view_uv_roundtrip() {
        let camera = camera();
        let pos = vec3(0.3, -0.2, -4.0);
        let uv = camera.view_to_uv(pos);
        let depth = camera.view_to_clip(pos);
        let depth = depth.z / depth.w;
        let pos2 = camera.uv_to_view(uv, depth);

        assert_relative_eq!(pos.x, pos2.x, epsilon = 0.001);
        assert_relative_eq!(pos.y, pos2.y, epsilon = 0.001);
        assert_relative_eq!(pos.z, pos2.z, epsilon = 0.001);
        assert_relative_eq!(4.0, camera.linear_depth(depth), epsilon = 0.001);
    }

    #[test]
    fn uv_orientation() {
        let camera = camera();

        // Points above the view axis land in the upper half of the screen
        assert!(camera.view_to_uv(vec3(0.0, 1.0, -4.0)).y < 0.5);
        assert!(camera.view_to_uv(vec3(1.0, 0.0, -4.0)).x > 0.5);
    }

    #[test]
    fn screen_mapping() {
        let camera = camera();
        let uv = camera.screen_to_uv(uvec2(10, 5));

        assert_relative_eq!(10.0, camera.uv_to_screen(uv).x);
        assert_relative_eq!(5.0, camera.uv_to_screen(uv).y);
        assert_eq!(uvec2(21, 11), camera.uv_to_gbuffer(uv));
        assert_eq!(uvec2(127, 63), camera.uv_to_gbuffer(Vec2::ONE));
    }
}
