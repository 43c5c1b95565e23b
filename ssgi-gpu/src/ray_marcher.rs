use glam::{Vec2, Vec3};

use crate::{
    lerp, Camera, PackedDepth, RayMarchPassParams, Texture2d, MAX_REFINE_STEPS,
    MAX_STEPS,
};

#[derive(Clone, Copy, Default)]
pub struct RayHit {
    /// Where the ray hit something or, for misses, the last on-screen point
    /// it visited
    pub uv: Vec2,

    pub is_hit: bool,

    /// Whether a missed ray ran out of steps while still on screen (as
    /// opposed to leaving the screen)
    pub is_on_screen: bool,
}

/// Marches rays in screen-space against the depth buffer.
pub struct RayMarcher<'a, T>
where
    T: Texture2d + ?Sized,
{
    pub camera: &'a Camera,
    pub params: &'a RayMarchPassParams,
    pub depth: &'a T,
    pub back_depth: &'a T,
}

impl<'a, T> RayMarcher<'a, T>
where
    T: Texture2d + ?Sized,
{
    /// Marches a view-space ray; `jitter` in `<0.0, 1.0)` offsets the step
    /// positions to hide banding.
    pub fn march(&self, origin: Vec3, dir: Vec3, jitter: f32) -> RayHit {
        let near = self.camera.near();
        let mut end = origin + dir * self.params.ray_distance;

        // Rays pointing towards the camera must not cross the near plane
        if end.z > -near && dir.z > 0.0 {
            let t = (-near * 1.01 - origin.z) / dir.z;

            end = origin + dir * t.max(0.0);
        }

        let h0 = self.camera.view_to_clip(origin);
        let h1 = self.camera.view_to_clip(end);
        let k0 = 1.0 / h0.w;
        let k1 = 1.0 / h1.w;
        let z0 = origin.z * k0;
        let z1 = end.z * k1;
        let p0 = self.camera.clip_to_uv(h0);
        let p1 = self.camera.clip_to_uv(h1);

        let texel_size = 1.0 / self.camera.screen.x.max(self.camera.screen.y);
        let steps = self.params.steps.clamp(1, MAX_STEPS);
        let mut prev_t = 0.0;
        let mut last_uv = p0;
        let mut step = 0;

        while step < MAX_STEPS {
            if step >= steps {
                break;
            }

            let t = (step as f32 + 1.0 - jitter) / (steps as f32);
            let uv = lerp(p0, p1, t);

            if !self.camera.contains_uv(uv) {
                return RayHit {
                    uv: last_uv,
                    is_hit: false,
                    is_on_screen: false,
                };
            }

            // Skip steps that didn't leave the origin's pixel yet
            if uv.distance(p0) >= texel_size {
                let ray_depth = -lerp(z0, z1, t) / lerp(k0, k1, t);
                let (scene_depth, thickness) = self.surface_at(uv);

                if scene_depth > 0.0 {
                    let delta = ray_depth - scene_depth;

                    if delta > 0.0 && delta < thickness {
                        let t = self.refine(prev_t, t, p0, p1, (z0, z1), (k0, k1));

                        return RayHit {
                            uv: lerp(p0, p1, t),
                            is_hit: true,
                            is_on_screen: true,
                        };
                    }
                }

                prev_t = t;
            }

            last_uv = uv;
            step += 1;
        }

        RayHit {
            uv: last_uv,
            is_hit: false,
            is_on_screen: true,
        }
    }

    /// Binary-searches the crossing between `lo` (in front of the surface)
    /// and `hi` (behind it).
    fn refine(
        &self,
        mut lo: f32,
        mut hi: f32,
        p0: Vec2,
        p1: Vec2,
        (z0, z1): (f32, f32),
        (k0, k1): (f32, f32),
    ) -> f32 {
        let refine_steps = self.params.refine_steps.min(MAX_REFINE_STEPS);
        let mut step = 0;

        while step < MAX_REFINE_STEPS {
            if step >= refine_steps {
                break;
            }

            let mid = 0.5 * (lo + hi);
            let ray_depth = -lerp(z0, z1, mid) / lerp(k0, k1, mid);
            let (scene_depth, _) = self.surface_at(lerp(p0, p1, mid));

            if scene_depth > 0.0 && ray_depth > scene_depth {
                hi = mid;
            } else {
                lo = mid;
            }

            step += 1;
        }

        hi
    }

    /// Returns linear depth of the surface at given uv-coordinates (zero for
    /// background) along with how thick that surface is assumed to be.
    fn surface_at(&self, uv: Vec2) -> (f32, f32) {
        let pos = self.camera.uv_to_gbuffer(uv);
        let depth = PackedDepth::decode(self.depth.load(pos));

        if depth <= 0.0 || depth >= 1.0 {
            return (0.0, 0.0);
        }

        let depth = self.camera.linear_depth(depth);
        let mut thickness = self.params.thickness;

        if self.params.has(RayMarchPassParams::AUTO_THICKNESS)
            && self.params.has(RayMarchPassParams::HAS_BACK_DEPTH)
        {
            let back_depth = PackedDepth::decode(self.back_depth.load(pos));

            if back_depth > 0.0 && back_depth < 1.0 {
                thickness =
                    (self.camera.linear_depth(back_depth) - depth).max(0.001);
            }
        }

        (depth, thickness)
    }
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;
    use crate::cpu::testing::{camera, TestGBuffer};
    use crate::GBufferEntry;

    fn params(thickness: f32) -> RayMarchPassParams {
        RayMarchPassParams {
            steps: 64,
            refine_steps: 8,
            ray_distance: 10.0,
            thickness,
            ..Default::default()
        }
    }

    #[test]
    fn hit() {
        let camera = camera();
        let gbuffer = TestGBuffer::wall(&camera, 5.0, GBufferEntry::default());
        let params = params(10.0);

        let marcher = RayMarcher {
            camera: &camera,
            params: &params,
            depth: &gbuffer.depth,
            back_depth: &gbuffer.depth,
        };

        let hit = marcher.march(
            vec3(0.0, 0.0, -4.0),
            vec3(0.3, 0.0, -1.0).normalize(),
            0.5,
        );

        let expected = camera.view_to_uv(vec3(0.3, 0.0, -5.0));

        assert!(hit.is_hit);
        assert!(hit.uv.distance(expected) < 0.002, "{:?}", hit.uv);
    }

    #[test]
    fn miss_off_screen() {
        let camera = camera();
        let gbuffer = TestGBuffer::wall(&camera, 5.0, GBufferEntry::default());
        let params = params(10.0);

        let marcher = RayMarcher {
            camera: &camera,
            params: &params,
            depth: &gbuffer.depth,
            back_depth: &gbuffer.depth,
        };

        let hit = marcher.march(
            vec3(0.0, 0.0, -4.0),
            vec3(1.0, 0.0, 0.05).normalize(),
            0.5,
        );

        assert!(!hit.is_hit);
        assert!(!hit.is_on_screen);
        assert!(camera.contains_uv(hit.uv));
    }

    #[test]
    fn thickness_limits_hits() {
        let camera = camera();
        let gbuffer = TestGBuffer::wall(&camera, 5.0, GBufferEntry::default());
        let origin = vec3(0.0, 0.0, -6.0);
        let dir = vec3(0.3, 0.0, -1.0).normalize();

        let thin = params(0.5);
        let thick = params(10.0);

        let march = |params: &RayMarchPassParams| {
            RayMarcher {
                camera: &camera,
                params,
                depth: &gbuffer.depth,
                back_depth: &gbuffer.depth,
            }
            .march(origin, dir, 0.5)
        };

        assert!(!march(&thin).is_hit);
        assert!(march(&thick).is_hit);
    }
}
