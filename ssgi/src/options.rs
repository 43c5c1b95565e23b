use std::fmt;
use std::str::FromStr;

use crate::{gpu, Channel, EffectError, Result};

/// Tunables of an effect.
///
/// Changed at runtime through [`crate::Effect::apply_option()`], which also
/// takes care of whatever the change implies (see [`Reaction`]).
#[derive(Clone, Debug, PartialEq)]
pub struct DenoiseOptions {
    /// Maximum distance a ray can travel, in world units
    pub distance: f32,

    /// Maximum depth difference between a ray and the surface it passes behind
    /// for that surface to count as a hit
    pub thickness: f32,

    /// Whether to derive the thickness from the host's back-face depth
    pub auto_thickness: bool,

    /// Surfaces rougher than this don't get traced
    pub max_roughness: f32,

    /// How much of the history gets retained each frame
    pub blend: f32,

    pub denoise_iterations: u32,
    pub denoise_kernel: u32,
    pub denoise_diffuse: f32,
    pub denoise_specular: f32,
    pub depth_phi: f32,
    pub normal_phi: f32,
    pub roughness_phi: f32,
    pub direct_light_multiplier: f32,

    /// Scales the environment's mip level picked for rough reflections
    pub env_blur: f32,

    pub importance_sampling: bool,
    pub steps: u32,
    pub refine_steps: u32,

    /// Samples per pixel; one of [`Self::SUPPORTED_SPP`]
    pub spp: u32,

    /// Whether rays that didn't hit anything still pick up the radiance at
    /// the point they left the screen
    pub missed_rays: bool,

    /// Size of the internal buffers relative to the G-buffer
    pub resolution_scale: f32,
}

impl DenoiseOptions {
    pub const SUPPORTED_SPP: [u32; 4] = [1, 2, 4, 8];
    pub const MAX_DENOISE_ITERATIONS: u32 = 8;
    pub const MAX_DENOISE_KERNEL: u32 = 5;

    pub fn get(&self, key: OptionKey) -> OptionValue {
        use OptionValue::*;

        match key {
            OptionKey::Distance => F32(self.distance),
            OptionKey::Thickness => F32(self.thickness),
            OptionKey::AutoThickness => Bool(self.auto_thickness),
            OptionKey::MaxRoughness => F32(self.max_roughness),
            OptionKey::Blend => F32(self.blend),
            OptionKey::DenoiseIterations => U32(self.denoise_iterations),
            OptionKey::DenoiseKernel => U32(self.denoise_kernel),
            OptionKey::DenoiseDiffuse => F32(self.denoise_diffuse),
            OptionKey::DenoiseSpecular => F32(self.denoise_specular),
            OptionKey::DepthPhi => F32(self.depth_phi),
            OptionKey::NormalPhi => F32(self.normal_phi),
            OptionKey::RoughnessPhi => F32(self.roughness_phi),
            OptionKey::DirectLightMultiplier => {
                F32(self.direct_light_multiplier)
            }
            OptionKey::EnvBlur => F32(self.env_blur),
            OptionKey::ImportanceSampling => Bool(self.importance_sampling),
            OptionKey::Steps => U32(self.steps),
            OptionKey::RefineSteps => U32(self.refine_steps),
            OptionKey::Spp => U32(self.spp),
            OptionKey::MissedRays => Bool(self.missed_rays),
            OptionKey::ResolutionScale => F32(self.resolution_scale),
        }
    }

    /// Validates and stores given value, returning what the change requires
    /// from the effect.
    pub fn set(&mut self, key: OptionKey, value: OptionValue) -> Result<Reaction> {
        let invalid = || EffectError::InvalidOptionValue { key, value };

        let positive = |value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(value)
            } else {
                Err(invalid())
            }
        };

        let non_negative = |value: f32| {
            if value.is_finite() && value >= 0.0 {
                Ok(value)
            } else {
                Err(invalid())
            }
        };

        let unit = |value: f32| {
            if (0.0..=1.0).contains(&value) {
                Ok(value)
            } else {
                Err(invalid())
            }
        };

        let in_range = |value: u32, min: u32, max: u32| {
            if (min..=max).contains(&value) {
                Ok(value)
            } else {
                Err(invalid())
            }
        };

        match (key, value) {
            (OptionKey::Distance, OptionValue::F32(v)) => {
                self.distance = positive(v)?;
            }
            (OptionKey::Thickness, OptionValue::F32(v)) => {
                self.thickness = positive(v)?;
            }
            (OptionKey::AutoThickness, OptionValue::Bool(v)) => {
                self.auto_thickness = v;
            }
            (OptionKey::MaxRoughness, OptionValue::F32(v)) => {
                self.max_roughness = unit(v)?;
            }
            (OptionKey::Blend, OptionValue::F32(v)) => {
                self.blend = unit(v)?;
            }
            (OptionKey::DenoiseIterations, OptionValue::U32(v)) => {
                self.denoise_iterations =
                    in_range(v, 0, Self::MAX_DENOISE_ITERATIONS)?;
            }
            (OptionKey::DenoiseKernel, OptionValue::U32(v)) => {
                self.denoise_kernel = in_range(v, 1, Self::MAX_DENOISE_KERNEL)?;
            }
            (OptionKey::DenoiseDiffuse, OptionValue::F32(v)) => {
                self.denoise_diffuse = non_negative(v)?;
            }
            (OptionKey::DenoiseSpecular, OptionValue::F32(v)) => {
                self.denoise_specular = non_negative(v)?;
            }
            (OptionKey::DepthPhi, OptionValue::F32(v)) => {
                self.depth_phi = positive(v)?;
            }
            (OptionKey::NormalPhi, OptionValue::F32(v)) => {
                self.normal_phi = non_negative(v)?;
            }
            (OptionKey::RoughnessPhi, OptionValue::F32(v)) => {
                self.roughness_phi = non_negative(v)?;
            }
            (OptionKey::DirectLightMultiplier, OptionValue::F32(v)) => {
                self.direct_light_multiplier = non_negative(v)?;
            }
            (OptionKey::EnvBlur, OptionValue::F32(v)) => {
                self.env_blur = unit(v)?;
            }
            (OptionKey::ImportanceSampling, OptionValue::Bool(v)) => {
                self.importance_sampling = v;
            }
            (OptionKey::Steps, OptionValue::U32(v)) => {
                self.steps = in_range(v, 1, gpu::MAX_STEPS)?;
            }
            (OptionKey::RefineSteps, OptionValue::U32(v)) => {
                self.refine_steps = in_range(v, 0, gpu::MAX_REFINE_STEPS)?;
            }
            (OptionKey::Spp, OptionValue::U32(v)) => {
                if !Self::SUPPORTED_SPP.contains(&v) {
                    return Err(invalid());
                }

                self.spp = v;
            }
            (OptionKey::MissedRays, OptionValue::Bool(v)) => {
                self.missed_rays = v;
            }
            (OptionKey::ResolutionScale, OptionValue::F32(v)) => {
                self.resolution_scale = positive(v).and_then(unit)?;
            }

            _ => return Err(invalid()),
        }

        Ok(key.reaction())
    }

    /// Validates all the options at once, e.g. before creating an effect.
    pub fn validate(&self) -> Result<()> {
        let mut this = Self::default();

        for key in OptionKey::ALL {
            this.set(key, self.get(key))?;
        }

        Ok(())
    }

    /// Denoising strength of given channel.
    pub fn denoise_strength(&self, channel: Channel) -> f32 {
        match channel {
            Channel::Diffuse => self.denoise_diffuse,
            Channel::Specular => self.denoise_specular,
        }
    }
}

impl Default for DenoiseOptions {
    fn default() -> Self {
        Self {
            distance: 10.0,
            thickness: 10.0,
            auto_thickness: false,
            max_roughness: 1.0,
            blend: 0.9,
            denoise_iterations: 1,
            denoise_kernel: 2,
            denoise_diffuse: 10.0,
            denoise_specular: 10.0,
            depth_phi: 2.0,
            normal_phi: 50.0,
            roughness_phi: 1.0,
            direct_light_multiplier: 1.0,
            env_blur: 0.5,
            importance_sampling: true,
            steps: 20,
            refine_steps: 5,
            spp: 1,
            missed_rays: false,
            resolution_scale: 1.0,
        }
    }
}

/// What an option change implies for the effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reaction {
    /// Just upload new uniforms
    Uniform,

    /// Upload new uniforms and drop the accumulated history, since it was
    /// computed with different semantics
    UniformAndReset,

    /// Switch to another shader variant and drop the history
    Respecialize,
}

macro_rules! option_keys {
    ([ $( $key:ident => ($name:literal, $reaction:ident), )* ]) => {
        /// Name of a [`DenoiseOptions`] field.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum OptionKey {
            $( $key, )*
        }

        impl OptionKey {
            pub const ALL: [OptionKey; option_keys!(@count $( $key )*)] = [
                $( OptionKey::$key, )*
            ];

            pub fn name(self) -> &'static str {
                match self {
                    $( OptionKey::$key => $name, )*
                }
            }

            pub fn reaction(self) -> Reaction {
                match self {
                    $( OptionKey::$key => Reaction::$reaction, )*
                }
            }
        }

        impl FromStr for OptionKey {
            type Err = EffectError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $( $name => Ok(OptionKey::$key), )*
                    _ => Err(EffectError::UnknownOption(s.to_string())),
                }
            }
        }
    };

    (@count) => { 0 };
    (@count $head:ident $( $tail:ident )*) => { 1 + option_keys!(@count $( $tail )*) };
}

option_keys!([
    Distance => ("distance", UniformAndReset),
    Thickness => ("thickness", UniformAndReset),
    AutoThickness => ("autoThickness", UniformAndReset),
    MaxRoughness => ("maxRoughness", UniformAndReset),
    Blend => ("blend", UniformAndReset),
    DenoiseIterations => ("denoiseIterations", Uniform),
    DenoiseKernel => ("denoiseKernel", Uniform),
    DenoiseDiffuse => ("denoiseDiffuse", Uniform),
    DenoiseSpecular => ("denoiseSpecular", Uniform),
    DepthPhi => ("depthPhi", Uniform),
    NormalPhi => ("normalPhi", Uniform),
    RoughnessPhi => ("roughnessPhi", Uniform),
    DirectLightMultiplier => ("directLightMultiplier", UniformAndReset),
    EnvBlur => ("envBlur", UniformAndReset),
    ImportanceSampling => ("importanceSampling", UniformAndReset),
    Steps => ("steps", UniformAndReset),
    RefineSteps => ("refineSteps", UniformAndReset),
    Spp => ("spp", Respecialize),
    MissedRays => ("missedRays", UniformAndReset),
    ResolutionScale => ("resolutionScale", UniformAndReset),
]);

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    U32(u32),
    F32(f32),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(value) => write!(f, "{value}"),
            OptionValue::U32(value) => write!(f, "{value}"),
            OptionValue::F32(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        OptionValue::U32(value)
    }
}

impl From<f32> for OptionValue {
    fn from(value: f32) -> Self {
        OptionValue::F32(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(Ok(()), DenoiseOptions::default().validate());
    }

    #[test]
    fn names_round_trip() {
        for key in OptionKey::ALL {
            assert_eq!(Ok(key), key.name().parse());
        }

        assert_eq!(20, OptionKey::ALL.len());

        assert_eq!(
            Err(EffectError::UnknownOption("bounces".into())),
            "bounces".parse::<OptionKey>()
        );
    }

    #[test]
    fn reactions() {
        let reset = [
            OptionKey::Distance,
            OptionKey::Steps,
            OptionKey::RefineSteps,
            OptionKey::ImportanceSampling,
            OptionKey::ResolutionScale,
        ];

        for key in reset {
            assert_eq!(Reaction::UniformAndReset, key.reaction(), "{key}");
        }

        assert_eq!(Reaction::Respecialize, OptionKey::Spp.reaction());
        assert_eq!(Reaction::Uniform, OptionKey::DenoiseKernel.reaction());
        assert_eq!(Reaction::Uniform, OptionKey::NormalPhi.reaction());
    }

    #[test]
    fn set() {
        let mut options = DenoiseOptions::default();

        assert_eq!(
            Ok(Reaction::UniformAndReset),
            options.set(OptionKey::Distance, OptionValue::F32(25.0))
        );
        assert_eq!(25.0, options.distance);

        assert_eq!(
            Ok(Reaction::Respecialize),
            options.set(OptionKey::Spp, OptionValue::U32(4))
        );
        assert_eq!(4, options.spp);

        assert_eq!(
            Ok(Reaction::Uniform),
            options.set(OptionKey::DenoiseIterations, OptionValue::U32(0))
        );
        assert_eq!(0, options.denoise_iterations);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut options = DenoiseOptions::default();

        let cases = [
            (OptionKey::Spp, OptionValue::U32(3)),
            (OptionKey::Spp, OptionValue::F32(2.0)),
            (OptionKey::Distance, OptionValue::F32(-1.0)),
            (OptionKey::Blend, OptionValue::F32(1.5)),
            (OptionKey::Steps, OptionValue::U32(0)),
            (OptionKey::Steps, OptionValue::U32(gpu::MAX_STEPS + 1)),
            (OptionKey::RefineSteps, OptionValue::U32(gpu::MAX_REFINE_STEPS + 1)),
            (OptionKey::ResolutionScale, OptionValue::F32(0.0)),
            (OptionKey::MissedRays, OptionValue::U32(1)),
        ];

        for (key, value) in cases {
            assert_eq!(
                Err(EffectError::InvalidOptionValue { key, value }),
                options.set(key, value),
                "{key} = {value}"
            );
        }

        assert!(options
            .set(OptionKey::Distance, OptionValue::F32(f32::NAN))
            .is_err());

        assert_eq!(DenoiseOptions::default(), options);
    }
}
