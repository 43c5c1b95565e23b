use crate::{bind_view, ComputePass, Effect, PassContext};

#[derive(Debug)]
pub struct FrameReprojectionPass {
    pass: ComputePass,
}

impl FrameReprojectionPass {
    pub fn new(device: &wgpu::Device, ctx: &PassContext) -> Self {
        let buffers = ctx.buffers;

        let pass = ComputePass::builder("frame_reprojection")
            .bind([
                &buffers.camera.bind_readable(),
                &bind_view(&ctx.inputs.depth),
                &bind_view(&ctx.inputs.normal),
                &bind_view(&ctx.inputs.albedo),
                &bind_view(&ctx.inputs.emissive),
                &bind_view(&ctx.inputs.motion),
                &buffers.surface_map.past().bind_writable(),
                &buffers.surface_map.curr().bind_writable(),
                &buffers.reprojection_map.bind_writable(),
            ])
            .build(device, &ctx.engine.shaders().frame_reprojection);

        Self { pass }
    }

    pub fn run(&self, effect: &Effect, encoder: &mut wgpu::CommandEncoder) {
        // This pass uses 8x8 warps:
        let size = (effect.internal_size() + 7) / 8;

        self.pass.run(effect.is_alternate(), encoder, size, ());
    }
}
