use crate::{gpu, Channel, EffectError, Mode, Result};

/// Denoising behavior of a single radiance channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelConfig {
    pub channel: Channel,

    /// Whether the variance floor is scaled by the surface's roughness, so
    /// that glossy reflections get blurred less than rough ones
    pub roughness_dependent: bool,

    /// Variance assumed even for perfectly converged pixels
    pub basic_variance: f32,

    /// How strongly the reprojected history gets clamped to the current
    /// frame's neighbourhood; zero disables clamping
    pub clamp_strength: f32,

    /// Whether rough surfaces prefer fresh samples over history
    pub roughness_blend: bool,

    /// Whether roughness similarity takes part in the edge-stopping weights
    pub roughness_aware: bool,
}

impl ChannelConfig {
    const BASIC_VARIANCE: f32 = 0.00025;

    /// Returns the configuration each mode ships with.
    pub fn presets(mode: Mode) -> Vec<Self> {
        let diffuse = Self {
            channel: Channel::Diffuse,
            roughness_dependent: false,
            basic_variance: Self::BASIC_VARIANCE,
            clamp_strength: 0.0,
            roughness_blend: false,
            roughness_aware: false,
        };

        let specular = Self {
            channel: Channel::Specular,
            roughness_dependent: true,
            basic_variance: Self::BASIC_VARIANCE,
            clamp_strength: 0.5,
            roughness_blend: false,
            roughness_aware: true,
        };

        match mode {
            Mode::DiffuseOnly => vec![diffuse],
            Mode::SpecularOnly => vec![specular],

            Mode::Combined => vec![
                Self {
                    roughness_aware: true,
                    ..diffuse
                },
                Self {
                    clamp_strength: 1.0,
                    roughness_blend: true,
                    ..specular
                },
            ],
        }
    }

    /// Checks that `channels` lines up with what `mode` produces.
    pub fn validate(mode: Mode, channels: &[Self]) -> Result<()> {
        let mismatch = || EffectError::ChannelMismatch {
            mode,
            expected: mode.channel_count(),
            actual: channels.len(),
        };

        if channels.len() != mode.channel_count() {
            return Err(mismatch());
        }

        for (idx, config) in channels.iter().enumerate() {
            if config.channel != mode.channel(idx) {
                return Err(mismatch());
            }
        }

        Ok(())
    }

    pub fn temporal_flags(&self) -> u32 {
        if self.roughness_blend {
            gpu::TemporalPassParams::ROUGHNESS_BLEND
        } else {
            0
        }
    }

    pub fn denoise_flags(&self) -> u32 {
        let mut flags = 0;

        if self.roughness_dependent {
            flags |= gpu::DenoisePassParams::ROUGHNESS_DEPENDENT;
        }

        if self.roughness_aware {
            flags |= gpu::DenoisePassParams::ROUGHNESS_AWARE;
        }

        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_modes() {
        for mode in [Mode::DiffuseOnly, Mode::SpecularOnly, Mode::Combined] {
            let channels = ChannelConfig::presets(mode);

            assert_eq!(mode.channel_count(), channels.len());
            assert_eq!(Ok(()), ChannelConfig::validate(mode, &channels));
        }

        let combined = ChannelConfig::presets(Mode::Combined);

        assert!(!combined[0].roughness_dependent);
        assert!(combined[1].roughness_dependent);
        assert!(combined[1].roughness_blend);
        assert_eq!(1.0, combined[1].clamp_strength);
    }

    #[test]
    fn mismatched_channels() {
        let channels = ChannelConfig::presets(Mode::DiffuseOnly);

        assert_eq!(
            Err(EffectError::ChannelMismatch {
                mode: Mode::Combined,
                expected: 2,
                actual: 1,
            }),
            ChannelConfig::validate(Mode::Combined, &channels)
        );

        let channels = ChannelConfig::presets(Mode::SpecularOnly);

        assert_eq!(
            Err(EffectError::ChannelMismatch {
                mode: Mode::DiffuseOnly,
                expected: 1,
                actual: 1,
            }),
            ChannelConfig::validate(Mode::DiffuseOnly, &channels)
        );
    }
}
