use thiserror::Error;

use crate::{Mode, OptionKey, OptionValue};

pub type Result<T, E = EffectError> = std::result::Result<T, E>;

/// Contract violations detected while constructing or configuring an effect.
///
/// Per-pixel problems (missed rays, background, invalid depth) never end up
/// here; the shaders encode them as zero radiance instead.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EffectError {
    #[error("unsupported camera projection: {projection}; only perspective cameras are supported")]
    UnsupportedCamera { projection: &'static str },

    #[error("mode {mode:?} expects {expected} channel(s), but got {actual}")]
    ChannelMismatch {
        mode: Mode,
        expected: usize,
        actual: usize,
    },

    #[error("invalid resolution: {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },

    #[error("invalid value for option `{key}`: {value}")]
    InvalidOptionValue { key: OptionKey, value: OptionValue },

    #[error("unknown option: `{0}`")]
    UnknownOption(String),

    #[error("invalid environment map: {0}")]
    EnvironmentMap(String),
}
