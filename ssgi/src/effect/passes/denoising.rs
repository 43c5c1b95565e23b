use crate::{
    bind_view, gpu, ComputePass, DoubleBufferedBindable, Effect, PassContext,
};

/// À-trous denoiser; each iteration consists of two sub-passes ping-ponging
/// between a channel's `denoised_a` and `denoised_b`.
#[derive(Debug)]
pub struct DenoisingPass {
    channels: Vec<ChannelPasses>,
}

#[derive(Debug)]
struct ChannelPasses {
    /// Reads the temporal output, writes `denoised_a`
    first: ComputePass<gpu::DenoiseStep>,

    /// Reads `denoised_a`, writes `denoised_b`
    a_to_b: ComputePass<gpu::DenoiseStep>,

    /// Reads `denoised_b`, writes `denoised_a`
    b_to_a: ComputePass<gpu::DenoiseStep>,
}

impl DenoisingPass {
    pub fn new(device: &wgpu::Device, ctx: &PassContext) -> Self {
        let buffers = ctx.buffers;
        let shader = &ctx.engine.shaders().denoising;

        let channels = buffers
            .channels
            .iter()
            .enumerate()
            .map(|(idx, channel)| {
                let build = |name: &str,
                             input: &dyn DoubleBufferedBindable,
                             output: &dyn DoubleBufferedBindable| {
                    ComputePass::builder(format!("denoising_ch{idx}_{name}"))
                        .bind([
                            &buffers.camera.bind_readable(),
                            &channel.denoise_params.bind_readable(),
                            &bind_view(&ctx.inputs.depth),
                            &bind_view(&ctx.inputs.normal),
                            &bind_view(&ctx.inputs.albedo),
                            &bind_view(&ctx.inputs.emissive),
                            &channel.moments.curr().bind_writable(),
                            input,
                            output,
                        ])
                        .build(device, shader)
                };

                ChannelPasses {
                    first: build(
                        "first",
                        &channel.colors.curr().bind_writable(),
                        &channel.denoised_a.bind_writable(),
                    ),
                    a_to_b: build(
                        "a_to_b",
                        &channel.denoised_a.bind_writable(),
                        &channel.denoised_b.bind_writable(),
                    ),
                    b_to_a: build(
                        "b_to_a",
                        &channel.denoised_b.bind_writable(),
                        &channel.denoised_a.bind_writable(),
                    ),
                }
            })
            .collect();

        Self { channels }
    }

    pub fn run(&self, effect: &Effect, encoder: &mut wgpu::CommandEncoder) {
        // This pass uses 8x8 warps:
        let size = (effect.internal_size() + 7) / 8;
        let alternate = effect.is_alternate();

        let iterations = effect.options().denoise_iterations;

        for sub_pass in denoise_sub_passes(iterations) {
            for channel in &self.channels {
                let pass = match sub_pass.source {
                    DenoiseSource::Temporal => &channel.first,
                    DenoiseSource::A => &channel.a_to_b,
                    DenoiseSource::B => &channel.b_to_a,
                };

                pass.run(alternate, encoder, size, sub_pass.step);
            }
        }
    }
}

/// Texture a denoiser sub-pass reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DenoiseSource {
    Temporal,
    A,
    B,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct DenoiseSubPass {
    pub source: DenoiseSource,
    pub step: gpu::DenoiseStep,
}

/// Returns the sequence of sub-passes for given iteration count; the last
/// one always writes into `denoised_b`.
///
/// Zero iterations still run two sub-passes that just copy the temporal
/// output, so that composition always has the same texture to read from.
pub(crate) fn denoise_sub_passes(iterations: u32) -> Vec<DenoiseSubPass> {
    if iterations == 0 {
        return vec![
            DenoiseSubPass {
                source: DenoiseSource::Temporal,
                step: gpu::DenoiseStep::passthrough(0),
            },
            DenoiseSubPass {
                source: DenoiseSource::A,
                step: gpu::DenoiseStep::passthrough(1),
            },
        ];
    }

    (0..iterations)
        .flat_map(|iteration| {
            let source = if iteration == 0 {
                DenoiseSource::Temporal
            } else {
                DenoiseSource::B
            };

            [
                DenoiseSubPass {
                    source,
                    step: gpu::DenoiseStep::new(iteration, 0),
                },
                DenoiseSubPass {
                    source: DenoiseSource::A,
                    step: gpu::DenoiseStep::new(iteration, 1),
                },
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe(iterations: u32) -> Vec<(DenoiseSource, u32, u32, bool)> {
        denoise_sub_passes(iterations)
            .into_iter()
            .map(|pass| {
                (
                    pass.source,
                    pass.step.iteration,
                    pass.step.direction,
                    pass.step.is_passthrough(),
                )
            })
            .collect()
    }

    #[test]
    fn no_iterations() {
        assert_eq!(
            vec![
                (DenoiseSource::Temporal, 0, 0, true),
                (DenoiseSource::A, 0, 1, true),
            ],
            describe(0)
        );
    }

    #[test]
    fn iterations() {
        assert_eq!(
            vec![
                (DenoiseSource::Temporal, 0, 0, false),
                (DenoiseSource::A, 0, 1, false),
                (DenoiseSource::B, 1, 0, false),
                (DenoiseSource::A, 1, 1, false),
                (DenoiseSource::B, 2, 0, false),
                (DenoiseSource::A, 2, 1, false),
            ],
            describe(3)
        );
    }
}
