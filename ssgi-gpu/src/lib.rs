//! Per-pixel algorithms shared by the SSGI shaders and the host-side
//! reference pipeline.

#![cfg_attr(target_arch = "spirv", no_std)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::too_many_arguments)]

mod brdf;
mod camera;
mod composer;
#[cfg(not(target_arch = "spirv"))]
mod cpu;
mod environment;
mod gbuffer;
mod gi_sampling;
mod mode;
mod noise;
mod passes;
mod ray_marcher;
mod reprojection;
mod spatial_denoiser;
mod surface;
mod temporal_accumulator;
mod utils;

pub use self::brdf::*;
pub use self::camera::*;
pub use self::composer::*;
#[cfg(not(target_arch = "spirv"))]
pub use self::cpu::*;
pub use self::environment::*;
pub use self::gbuffer::*;
pub use self::gi_sampling::*;
pub use self::mode::*;
pub use self::noise::*;
pub use self::passes::*;
pub use self::ray_marcher::*;
pub use self::reprojection::*;
pub use self::spatial_denoiser::*;
pub use self::surface::*;
pub use self::temporal_accumulator::*;
pub use self::utils::*;

pub mod prelude {
    pub use core::f32::consts::PI;

    pub use glam::*;
    #[cfg(target_arch = "spirv")]
    pub use spirv_std::num_traits::Float;
    pub use spirv_std::{spirv, Image, Sampler};

    pub use crate::*;
}

/// Small value used to guard divisions.
pub const SSGI_EPSILON: f32 = 0.00001;

/// Upper bound of ray-marching steps; the effective count comes from
/// [`RayMarchPassParams::steps`].
pub const MAX_STEPS: u32 = 256;

/// Upper bound of binary-search refinement steps; the effective count comes
/// from [`RayMarchPassParams::refine_steps`].
pub const MAX_REFINE_STEPS: u32 = 16;

/// Frame counter wraps at this value so that noise seeds stay exact in f32.
pub const FRAME_PERIOD: u32 = 65536;
