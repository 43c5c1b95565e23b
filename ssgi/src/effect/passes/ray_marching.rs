use crate::{
    bind_view, ComputePass, DoubleBufferedBindable, Effect, PassContext,
    RayMarchVariant,
};

#[derive(Debug)]
pub struct RayMarchingPass {
    pass: ComputePass,
    variant: RayMarchVariant,
}

impl RayMarchingPass {
    pub fn new(device: &wgpu::Device, ctx: &PassContext) -> Self {
        let buffers = ctx.buffers;
        let env = ctx.environment;

        let variant = RayMarchVariant {
            mode: ctx.mode,
            spp: ctx.options.spp,
        };

        let camera = buffers.camera.bind_readable();
        let params = buffers.ray_march_params.bind_readable();
        let depth = bind_view(&ctx.inputs.depth);
        let normal = bind_view(&ctx.inputs.normal);
        let albedo = bind_view(&ctx.inputs.albedo);
        let emissive = bind_view(&ctx.inputs.emissive);
        let back_depth = bind_view(ctx.back_depth());
        let direct_light = bind_view(&ctx.inputs.direct_light);
        let blue_noise = ctx.blue_noise.bind_readable();
        let env_map = env.map.bind_sampled();
        let env_conditional = env.conditional.bind_readable();
        let env_marginal = env.marginal.bind_readable();
        let bounce = buffers.bounce().bind_writable();

        let mut items: Vec<&dyn DoubleBufferedBindable> = vec![
            &camera,
            &params,
            &depth,
            &normal,
            &albedo,
            &emissive,
            &back_depth,
            &direct_light,
            &blue_noise,
            &env_map,
            &env_conditional,
            &env_marginal,
            &bounce,
        ];

        // One output per channel, in channel order
        let outputs: Vec<_> = buffers
            .channels
            .iter()
            .map(|channel| channel.samples.bind_writable())
            .collect();

        for output in &outputs {
            items.push(output);
        }

        let pass = ComputePass::builder(format!(
            "ray_marching_{:?}_spp{}",
            variant.mode, variant.spp
        ))
        .bind_all(items)
        .build(device, ctx.engine.shaders().ray_marching(variant));

        Self { pass, variant }
    }

    pub fn variant(&self) -> RayMarchVariant {
        self.variant
    }

    pub fn run(&self, effect: &Effect, encoder: &mut wgpu::CommandEncoder) {
        // This pass uses 8x8 warps:
        let size = (effect.internal_size() + 7) / 8;

        self.pass.run(effect.is_alternate(), encoder, size, ());
    }
}
