mod blue;

use glam::{vec2, vec4, UVec2, Vec2, Vec4};

pub use self::blue::*;

/// PCG-based white noise.
#[derive(Copy, Clone)]
pub struct WhiteNoise {
    state: u32,
}

impl WhiteNoise {
    pub fn new(seed: u32, id: UVec2) -> Self {
        Self {
            state: seed
                ^ id.x.wrapping_mul(48619)
                ^ id.y.wrapping_mul(95461),
        }
    }

    /// Generates a uniform sample in range `<0.0, 1.0>`.
    pub fn sample(&mut self) -> f32 {
        (self.sample_int() >> 8) as f32 / 16777216.0
    }

    /// Generates a uniform sample in range `<0, u32::MAX>`.
    pub fn sample_int(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(747796405).wrapping_add(2891336453);

        let word = ((self.state >> ((self.state >> 28) + 4)) ^ self.state)
            .wrapping_mul(277803737);

        (word >> 22) ^ word
    }

    pub fn sample_vec2(&mut self) -> Vec2 {
        vec2(self.sample(), self.sample())
    }

    pub fn sample_vec4(&mut self) -> Vec4 {
        vec4(self.sample(), self.sample(), self.sample(), self.sample())
    }
}

#[cfg(test)]
mod tests {
    use glam::uvec2;

    use super::*;

    #[test]
    fn white_noise_range() {
        let mut noise = WhiteNoise::new(1234, uvec2(12, 34));
        let mut sum = 0.0;

        for _ in 0..1000 {
            let sample = noise.sample();

            assert!(sample >= 0.0 && sample < 1.0);
            sum += sample;
        }

        assert!((sum / 1000.0 - 0.5f32).abs() < 0.05);
    }
}
