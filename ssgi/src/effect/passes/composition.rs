use log::debug;

use crate::{bind_view, BindGroup, Effect, PassContext};

/// Combines direct light with the denoised channels and writes the result
/// into the host's render target.
#[derive(Debug)]
pub struct CompositionPass {
    bg0: BindGroup,
    pipeline: wgpu::RenderPipeline,
}

impl CompositionPass {
    pub fn new(device: &wgpu::Device, ctx: &PassContext) -> Self {
        debug!("Initializing pass: composition");

        let buffers = ctx.buffers;
        let shaders = ctx.engine.shaders();

        // Single-channel modes bind their only channel into both slots; the
        // unused one is masked out by the composition flags.
        let diffuse = buffers.output(0);
        let specular = buffers.output(ctx.mode.channel_count() - 1);

        let bg0 = BindGroup::builder("composition_bg0")
            .add(&buffers.camera.bind_readable())
            .add(&buffers.composition_params.bind_readable())
            .add(&bind_view(&ctx.inputs.depth))
            .add(&bind_view(&ctx.inputs.normal))
            .add(&bind_view(&ctx.inputs.albedo))
            .add(&bind_view(&ctx.inputs.emissive))
            .add(&bind_view(&ctx.inputs.direct_light))
            .add(&diffuse.bind_writable())
            .add(&specular.bind_writable())
            .build(device);

        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("ssgi_composition_pipeline_layout"),
                bind_group_layouts: &[bg0.layout()],
                push_constant_ranges: &[],
            });

        let pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("ssgi_composition_pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shaders.composition_vs.0,
                    entry_point: shaders.composition_vs.1,
                    buffers: &[],
                },
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &shaders.composition_fs.0,
                    entry_point: shaders.composition_fs.1,
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
            });

        Self { bg0, pipeline }
    }

    pub fn run(
        &self,
        effect: &Effect,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ssgi_composition"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: true,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, self.bg0.get(effect.is_alternate()), &[]);
        pass.draw(0..3, 0..1);
    }
}
