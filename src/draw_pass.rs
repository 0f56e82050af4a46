use std::collections::HashMap;

use crate::buffer_util::{self, SizedBuffer};
use crate::particle_store::ParticleStore;
use crate::render_mesh::{ParticleMesh, ParticleVertex};
use crate::shader_util;

// This should match the struct defined in draw.wgsl.
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct DrawUniforms {
    destination_size: [f32; 2],
    point_size: f32,
    speed_threshold: f32,
}

// Render target for one draw call. The whole target is overwritten.
pub struct Destination<'a> {
    pub view: &'a wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

// Additive, premultiplied point sprites into a target cleared to transparent.
pub struct DrawPass {
    uniform_buffer: SizedBuffer,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    module: wgpu::ShaderModule,
    // One pipeline per destination format, built on first use.
    pipelines: HashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
}

impl DrawPass {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_buffer =
            buffer_util::make_default_uniform_buffer::<DrawUniforms>(device, "Draw uniforms");
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw bind group layout"),
            entries: &[
                buffer_util::uniform_layout_entry(
                    0,
                    wgpu::ShaderStages::VERTEX_FRAGMENT,
                    &uniform_buffer,
                ),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Draw pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let module = shader_util::create_shader_module(
            device,
            "Draw shader module",
            crate::include_shader!("draw.wgsl"),
        );
        DrawPass {
            uniform_buffer,
            bind_group_layout,
            pipeline_layout,
            module,
            pipelines: HashMap::new(),
        }
    }

    fn pipeline(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> &wgpu::RenderPipeline {
        let layout = &self.pipeline_layout;
        let module = &self.module;
        self.pipelines.entry(format).or_insert_with(|| {
            log::debug!("Building draw pipeline for {:?}", format);
            let additive = wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            };
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Draw pipeline"),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: "vs_main",
                    buffers: &[ParticleVertex::layout()],
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState {
                            color: additive,
                            alpha: additive,
                        }),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
            })
        })
    }

    // Clears the destination and draws one sprite per mesh instance at the
    // position held in the store's source buffer.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        store: &ParticleStore,
        mesh: &ParticleMesh,
        destination: &Destination<'_>,
        point_size: f32,
        speed_threshold: f32,
    ) {
        let uniforms = DrawUniforms {
            destination_size: [destination.width as f32, destination.height as f32],
            point_size,
            speed_threshold,
        };
        buffer_util::set_uniforms(device, encoder, &self.uniform_buffer, &uniforms);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&store.source().sampled_view),
                },
            ],
        });
        let pipeline = self.pipeline(device, destination.format);
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Particle draw"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: destination.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.set_vertex_buffer(0, mesh.vertex_buffer().slice(..));
        rpass.draw(0..4, 0..mesh.instance_count());
    }
}
