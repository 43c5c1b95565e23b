use glam::{Mat4, UVec2};

use crate::{gpu, EffectError, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view, in radians
        fov_y: f32,
        near: f32,
        far: f32,
    },

    Orthographic {
        height: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    fn name(&self) -> &'static str {
        match self {
            Projection::Perspective { .. } => "perspective",
            Projection::Orthographic { .. } => "orthographic",
        }
    }
}

/// Camera through which the G-buffer has been rendered.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub projection: Projection,

    /// World-space to view-space transformation
    pub view: Mat4,

    /// Size of the G-buffer (and of the host's render target)
    pub size: UVec2,
}

impl Camera {
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.projection, Projection::Perspective { .. }) {
            return Err(EffectError::UnsupportedCamera {
                projection: self.projection.name(),
            });
        }

        if self.size.x == 0 || self.size.y == 0 {
            return Err(EffectError::InvalidResolution {
                width: self.size.x,
                height: self.size.y,
            });
        }

        Ok(())
    }

    /// Returns size of the effect's internal buffers.
    pub fn scaled_size(&self, resolution_scale: f32) -> UVec2 {
        (self.size.as_vec2() * resolution_scale)
            .ceil()
            .as_uvec2()
            .max(UVec2::ONE)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        let aspect = self.size.x as f32 / self.size.y as f32;

        match self.projection {
            Projection::Perspective { fov_y, near, far } => {
                Mat4::perspective_rh(fov_y, aspect, near, far)
            }

            Projection::Orthographic { height, near, far } => {
                let half_h = height * 0.5;
                let half_w = half_h * aspect;

                Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, near, far)
            }
        }
    }

    pub fn near(&self) -> f32 {
        match self.projection {
            Projection::Perspective { near, .. }
            | Projection::Orthographic { near, .. } => near,
        }
    }

    pub fn serialize(&self, resolution_scale: f32) -> gpu::Camera {
        gpu::Camera::new(
            self.projection_matrix(),
            self.view,
            self.near(),
            self.scaled_size(resolution_scale),
            self.size,
        )
    }

    /// Returns whether switching from `self` to `other` requires reallocating
    /// the effect's buffers.
    pub fn is_invalidated_by(&self, other: &Self) -> bool {
        self.size != other.size
    }

    pub fn describe(&self) -> String {
        format!(
            "projection={}, size={}x{}",
            self.projection.name(),
            self.size.x,
            self.size.y
        )
    }
}

#[cfg(test)]
mod tests {
    use glam::uvec2;

    use super::*;

    fn camera(projection: Projection) -> Camera {
        Camera {
            projection,
            view: Mat4::IDENTITY,
            size: uvec2(1280, 720),
        }
    }

    #[test]
    fn validate() {
        let perspective = camera(Projection::Perspective {
            fov_y: 1.0,
            near: 0.1,
            far: 100.0,
        });

        assert_eq!(Ok(()), perspective.validate());

        let orthographic = camera(Projection::Orthographic {
            height: 10.0,
            near: 0.1,
            far: 100.0,
        });

        assert_eq!(
            Err(EffectError::UnsupportedCamera {
                projection: "orthographic"
            }),
            orthographic.validate()
        );

        let empty = Camera {
            size: uvec2(0, 720),
            ..perspective
        };

        assert_eq!(
            Err(EffectError::InvalidResolution {
                width: 0,
                height: 720
            }),
            empty.validate()
        );
    }

    #[test]
    fn scaled_size() {
        let camera = camera(Projection::Perspective {
            fov_y: 1.0,
            near: 0.1,
            far: 100.0,
        });

        assert_eq!(uvec2(1280, 720), camera.scaled_size(1.0));
        assert_eq!(uvec2(640, 360), camera.scaled_size(0.5));
        assert_eq!(uvec2(1, 1), camera.scaled_size(0.0001));
    }
}
