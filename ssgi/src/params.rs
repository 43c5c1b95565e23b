//! Translation of options and per-frame state into shader uniforms; shared by
//! the GPU effect and the reference pipeline.

use std::mem;

use glam::UVec2;

use crate::{gpu, ChannelConfig, DenoiseOptions, Mode, ToneMapping};

/// Number of frames the ray marcher keeps sampling direct light after the
/// host has stopped reporting it.
pub const DIRECT_LIGHT_GRACE_FRAMES: u32 = 2;

/// Counters advanced once per frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameCounters {
    /// Seeds noise; advances by `spp` per frame
    pub frame: u32,

    /// Selects which half of the double-buffered textures is current
    pub alternate: bool,

    /// Whether the next frame discards the accumulated history
    pub reset_history: bool,

    pub direct_light_frames: u32,
}

impl FrameCounters {
    pub fn new() -> Self {
        Self {
            frame: 0,
            alternate: false,
            reset_history: true,
            direct_light_frames: DIRECT_LIGHT_GRACE_FRAMES,
        }
    }

    /// Moves to the next frame, returning whether that frame has to discard
    /// the accumulated history.
    pub fn advance(&mut self, spp: u32, direct_light_rendered: bool) -> bool {
        self.alternate = !self.alternate;
        self.frame = (self.frame + spp) % gpu::FRAME_PERIOD;

        self.direct_light_frames = if direct_light_rendered {
            DIRECT_LIGHT_GRACE_FRAMES
        } else {
            self.direct_light_frames.saturating_sub(1)
        };

        mem::take(&mut self.reset_history)
    }

    pub fn has_direct_light(&self) -> bool {
        self.direct_light_frames > 0
    }
}

/// Per-frame state that, besides options, affects the ray marcher.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameState {
    pub frame: u32,
    pub has_direct_light: bool,
    pub has_back_depth: bool,

    /// Size of the environment map (zero if there's none)
    pub env_size: UVec2,
    pub env_max_mip: f32,

    /// Size of the blue-noise tile (zero if there's none)
    pub blue_noise_size: u32,
}

pub fn ray_march_params(
    options: &DenoiseOptions,
    mode: Mode,
    state: FrameState,
) -> gpu::RayMarchPassParams {
    type P = gpu::RayMarchPassParams;

    let has_environment = state.env_size.x > 0 && state.env_size.y > 0;

    let flags = [
        (options.auto_thickness, P::AUTO_THICKNESS),
        (options.missed_rays, P::MISSED_RAYS),
        (options.importance_sampling, P::IMPORTANCE_SAMPLING),
        (has_environment, P::HAS_ENVIRONMENT),
        (state.has_direct_light, P::HAS_DIRECT_LIGHT),
        (state.has_back_depth, P::HAS_BACK_DEPTH),
        (mode.has_diffuse(), P::MULTI_BOUNCE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(0, |flags, (_, flag)| flags | flag);

    P {
        frame: state.frame,
        steps: options.steps.min(gpu::MAX_STEPS),
        refine_steps: options.refine_steps.min(gpu::MAX_REFINE_STEPS),
        flags,
        ray_distance: options.distance,
        thickness: options.thickness,
        max_roughness: options.max_roughness,
        env_blur: options.env_blur,
        direct_light_multiplier: options.direct_light_multiplier,
        env_max_mip: if has_environment {
            state.env_max_mip
        } else {
            0.0
        },
        blue_noise_size: state.blue_noise_size,
        env_width: state.env_size.x,
        env_height: state.env_size.y,
        _pad: 0,
    }
}

pub fn temporal_params(
    options: &DenoiseOptions,
    config: &ChannelConfig,
    reset_history: bool,
) -> gpu::TemporalPassParams {
    let mut flags = config.temporal_flags();

    if reset_history {
        flags |= gpu::TemporalPassParams::RESET_HISTORY;
    }

    gpu::TemporalPassParams {
        blend: options.blend,
        clamp_strength: config.clamp_strength,
        flags,
        _pad: 0,
    }
}

pub fn denoise_params(
    options: &DenoiseOptions,
    config: &ChannelConfig,
) -> gpu::DenoisePassParams {
    gpu::DenoisePassParams {
        kernel: options.denoise_kernel,
        flags: config.denoise_flags(),
        strength: options.denoise_strength(config.channel),
        basic_variance: config.basic_variance,
        depth_phi: options.depth_phi,
        normal_phi: options.normal_phi,
        roughness_phi: options.roughness_phi,
        _pad: 0,
    }
}

pub fn composition_params(
    mode: Mode,
    tone_mapping: ToneMapping,
    exposure: f32,
) -> gpu::CompositionPassParams {
    let mut flags = 0;

    if mode.has_diffuse() {
        flags |= gpu::CompositionPassParams::HAS_DIFFUSE;
    }

    if mode.has_specular() {
        flags |= gpu::CompositionPassParams::HAS_SPECULAR;
    }

    gpu::CompositionPassParams {
        flags,
        tone_mapping: tone_mapping.serialize(),
        exposure,
        _pad: 0,
    }
}

#[cfg(test)]
mod tests {
    use glam::uvec2;

    use super::*;
    use crate::{gpu::RayMarchPassParams as P, Channel};

    #[test]
    fn counters() {
        let mut target = FrameCounters::new();

        assert!(target.advance(4, false));
        assert_eq!(4, target.frame);
        assert!(target.alternate);
        assert!(target.has_direct_light());

        assert!(!target.advance(4, false));
        assert_eq!(8, target.frame);
        assert!(!target.alternate);
        assert!(!target.has_direct_light());

        target.advance(4, true);
        assert!(target.has_direct_light());

        target.advance(4, false);
        assert!(target.has_direct_light());

        target.advance(4, false);
        assert!(!target.has_direct_light());

        target.reset_history = true;
        assert!(target.advance(4, false));
        assert!(!target.reset_history);
    }

    #[test]
    fn frame_wraps() {
        let mut target = FrameCounters {
            frame: gpu::FRAME_PERIOD - 2,
            ..FrameCounters::new()
        };

        target.advance(8, false);

        assert_eq!(6, target.frame);
    }

    #[test]
    fn ray_march_flags() {
        let options = DenoiseOptions::default();

        let params = ray_march_params(
            &options,
            Mode::SpecularOnly,
            FrameState::default(),
        );

        assert_eq!(P::IMPORTANCE_SAMPLING, params.flags);
        assert_eq!(0.0, params.env_max_mip);

        let params = ray_march_params(
            &options,
            Mode::DiffuseOnly,
            FrameState {
                frame: 12,
                has_direct_light: true,
                env_size: uvec2(64, 32),
                env_max_mip: 6.0,
                ..Default::default()
            },
        );

        assert_eq!(
            P::IMPORTANCE_SAMPLING
                | P::HAS_ENVIRONMENT
                | P::HAS_DIRECT_LIGHT
                | P::MULTI_BOUNCE,
            params.flags
        );
        assert_eq!(12, params.frame);
        assert_eq!(uvec2(64, 32), params.env_size());
        assert_eq!(6.0, params.env_max_mip);
    }

    #[test]
    fn step_counts_are_bounded() {
        let options = DenoiseOptions {
            steps: 1000,
            refine_steps: 1000,
            ..Default::default()
        };

        let params =
            ray_march_params(&options, Mode::Combined, FrameState::default());

        assert_eq!(gpu::MAX_STEPS, params.steps);
        assert_eq!(gpu::MAX_REFINE_STEPS, params.refine_steps);
    }

    #[test]
    fn channel_params() {
        let options = DenoiseOptions {
            denoise_diffuse: 3.0,
            denoise_specular: 7.0,
            ..Default::default()
        };

        let channels = ChannelConfig::presets(Mode::Combined);

        let diffuse = denoise_params(&options, &channels[0]);
        let specular = denoise_params(&options, &channels[1]);

        assert_eq!(3.0, diffuse.strength);
        assert_eq!(7.0, specular.strength);
        assert_eq!(Channel::Specular, channels[1].channel);

        let temporal = temporal_params(&options, &channels[1], true);

        assert!(temporal.has(gpu::TemporalPassParams::RESET_HISTORY));
        assert!(temporal.has(gpu::TemporalPassParams::ROUGHNESS_BLEND));
        assert_eq!(1.0, temporal.clamp_strength);

        let temporal = temporal_params(&options, &channels[0], false);

        assert_eq!(0, temporal.flags);
    }

    #[test]
    fn composition_flags() {
        type C = gpu::CompositionPassParams;

        assert_eq!(
            C::HAS_DIFFUSE,
            composition_params(Mode::DiffuseOnly, ToneMapping::None, 1.0).flags
        );

        assert_eq!(
            C::HAS_SPECULAR,
            composition_params(Mode::SpecularOnly, ToneMapping::None, 1.0)
                .flags
        );

        assert_eq!(
            C::HAS_DIFFUSE | C::HAS_SPECULAR,
            composition_params(Mode::Combined, ToneMapping::Aces, 1.0).flags
        );
    }
}
