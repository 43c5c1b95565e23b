use bytemuck::{Pod, Zeroable};
use glam::{uvec2, UVec2};

#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct RayMarchPassParams {
    pub frame: u32,
    pub steps: u32,
    pub refine_steps: u32,
    pub flags: u32,
    pub ray_distance: f32,
    pub thickness: f32,
    pub max_roughness: f32,
    pub env_blur: f32,
    pub direct_light_multiplier: f32,
    pub env_max_mip: f32,

    /// Size of the blue-noise tile; zero until one gets installed
    pub blue_noise_size: u32,

    pub env_width: u32,
    pub env_height: u32,
    pub _pad: u32,
}

impl RayMarchPassParams {
    pub const AUTO_THICKNESS: u32 = 1 << 0;
    pub const MISSED_RAYS: u32 = 1 << 1;
    pub const IMPORTANCE_SAMPLING: u32 = 1 << 2;
    pub const HAS_ENVIRONMENT: u32 = 1 << 3;
    pub const HAS_DIRECT_LIGHT: u32 = 1 << 4;
    pub const HAS_BACK_DEPTH: u32 = 1 << 5;

    /// Feed previous frame's denoised diffuse back into ray hits.
    pub const MULTI_BOUNCE: u32 = 1 << 6;

    pub fn has(&self, flag: u32) -> bool {
        self.flags & flag > 0
    }

    pub fn env_size(&self) -> UVec2 {
        uvec2(self.env_width, self.env_height)
    }
}

#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct TemporalPassParams {
    pub blend: f32,
    pub clamp_strength: f32,
    pub flags: u32,
    pub _pad: u32,
}

impl TemporalPassParams {
    /// Treat every pixel as having no history.
    pub const RESET_HISTORY: u32 = 1 << 0;

    /// Attenuate blending by the surface's roughness.
    pub const ROUGHNESS_BLEND: u32 = 1 << 1;

    pub fn has(&self, flag: u32) -> bool {
        self.flags & flag > 0
    }
}

/// Per-channel configuration of the spatial denoiser.
#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct DenoisePassParams {
    pub kernel: u32,
    pub flags: u32,
    pub strength: f32,
    pub basic_variance: f32,
    pub depth_phi: f32,
    pub normal_phi: f32,
    pub roughness_phi: f32,
    pub _pad: u32,
}

impl DenoisePassParams {
    /// Scale the variance floor (and the tap footprint of very smooth
    /// surfaces) by the surface's roughness.
    pub const ROUGHNESS_DEPENDENT: u32 = 1 << 0;

    /// Include roughness similarity in the edge-stopping weights.
    pub const ROUGHNESS_AWARE: u32 = 1 << 1;

    pub fn has(&self, flag: u32) -> bool {
        self.flags & flag > 0
    }
}

/// Identifies a single denoiser sub-pass; passed through push constants.
#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct DenoiseStep {
    pub iteration: u32,

    /// 0 for the first sub-pass of an iteration, 1 for the second one
    pub direction: u32,

    pub flags: u32,
    pub _pad: u32,
}

impl DenoiseStep {
    /// Copy the input without filtering; used when denoising is disabled.
    pub const PASSTHROUGH: u32 = 1 << 0;

    pub fn new(iteration: u32, direction: u32) -> Self {
        Self {
            iteration,
            direction,
            ..Default::default()
        }
    }

    pub fn passthrough(direction: u32) -> Self {
        Self {
            direction,
            flags: Self::PASSTHROUGH,
            ..Default::default()
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.flags & Self::PASSTHROUGH > 0
    }

    pub fn step_size(&self) -> i32 {
        1 << self.iteration
    }

    /// Whether this sub-pass reads variance from moments rather than from
    /// the previous sub-pass.
    pub fn is_first(&self) -> bool {
        self.iteration == 0 && self.direction == 0
    }

    /// Even iterations use horizontal & vertical taps, odd ones use the
    /// diagonals.
    pub fn is_axis_aligned(&self) -> bool {
        self.iteration % 2 == 0
    }
}

#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct CompositionPassParams {
    pub flags: u32,
    pub tone_mapping: u32,
    pub exposure: f32,
    pub _pad: u32,
}

impl CompositionPassParams {
    pub const HAS_DIFFUSE: u32 = 1 << 0;
    pub const HAS_SPECULAR: u32 = 1 << 1;

    pub fn has(&self, flag: u32) -> bool {
        self.flags & flag > 0
    }
}
