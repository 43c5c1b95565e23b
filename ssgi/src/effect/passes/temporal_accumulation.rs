use crate::{bind_view, ComputePass, Effect, PassContext};

/// Blends each channel's fresh samples into its reprojected history.
#[derive(Debug)]
pub struct TemporalAccumulationPass {
    passes: Vec<ComputePass>,
}

impl TemporalAccumulationPass {
    pub fn new(device: &wgpu::Device, ctx: &PassContext) -> Self {
        let buffers = ctx.buffers;

        let passes = buffers
            .channels
            .iter()
            .enumerate()
            .map(|(idx, channel)| {
                ComputePass::builder(format!("temporal_accumulation_ch{idx}"))
                    .bind([
                        &buffers.camera.bind_readable(),
                        &channel.temporal_params.bind_readable(),
                        &bind_view(&ctx.inputs.depth),
                        &bind_view(&ctx.inputs.normal),
                        &bind_view(&ctx.inputs.albedo),
                        &bind_view(&ctx.inputs.emissive),
                        &buffers.reprojection_map.bind_writable(),
                        &channel.samples.bind_writable(),
                        &channel.colors.past().bind_writable(),
                        &channel.moments.past().bind_writable(),
                        &channel.colors.curr().bind_writable(),
                        &channel.moments.curr().bind_writable(),
                    ])
                    .build(device, &ctx.engine.shaders().temporal_accumulation)
            })
            .collect();

        Self { passes }
    }

    pub fn run(&self, effect: &Effect, encoder: &mut wgpu::CommandEncoder) {
        // This pass uses 8x8 warps:
        let size = (effect.internal_size() + 7) / 8;

        for pass in &self.passes {
            pass.run(effect.is_alternate(), encoder, size, ());
        }
    }
}
