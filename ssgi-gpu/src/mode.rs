/// Kind of indirect lighting computed by an effect.
///
/// Fixed at construction; determines how many radiance channels flow through
/// the pipeline.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, Hash))]
pub enum Mode {
    DiffuseOnly,
    SpecularOnly,
    Combined,
}

impl Mode {
    pub const fn channel_count(self) -> usize {
        match self {
            Mode::DiffuseOnly | Mode::SpecularOnly => 1,
            Mode::Combined => 2,
        }
    }

    pub const fn has_diffuse(self) -> bool {
        matches!(self, Mode::DiffuseOnly | Mode::Combined)
    }

    pub const fn has_specular(self) -> bool {
        matches!(self, Mode::SpecularOnly | Mode::Combined)
    }

    /// Returns what's stored in given radiance channel.
    pub const fn channel(self, idx: usize) -> Channel {
        match (self, idx) {
            (Mode::SpecularOnly, _) | (Mode::Combined, 1) => Channel::Specular,
            _ => Channel::Diffuse,
        }
    }

    pub fn serialize(self) -> u32 {
        match self {
            Mode::DiffuseOnly => 0,
            Mode::SpecularOnly => 1,
            Mode::Combined => 2,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, Hash))]
pub enum Channel {
    Diffuse,
    Specular,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels() {
        assert_eq!(1, Mode::DiffuseOnly.channel_count());
        assert_eq!(1, Mode::SpecularOnly.channel_count());
        assert_eq!(2, Mode::Combined.channel_count());

        assert_eq!(Channel::Diffuse, Mode::DiffuseOnly.channel(0));
        assert_eq!(Channel::Specular, Mode::SpecularOnly.channel(0));
        assert_eq!(Channel::Diffuse, Mode::Combined.channel(0));
        assert_eq!(Channel::Specular, Mode::Combined.channel(1));
    }
}
