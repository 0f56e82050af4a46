use crate::buffer_util::{self, SizedBuffer};
use crate::field_params::FieldParams;
use crate::lattice::LatticeSize;
use crate::particle_store::{ParticleStore, STATE_FORMAT};
use crate::shader_util;

// Borrowed handles to the externally owned force fields for one update call.
// Each view must be a 2-D float texture whose first two components hold the
// field vector, addressed in normalized [0, 1] space.
#[derive(Clone, Copy, Default)]
pub struct FieldInputs<'a> {
    pub field1: Option<&'a wgpu::TextureView>,
    pub field2: Option<&'a wgpu::TextureView>,
}

impl<'a> FieldInputs<'a> {
    pub fn new() -> Self {
        FieldInputs::default()
    }

    pub fn with_field1(mut self, field: &'a wgpu::TextureView) -> Self {
        self.field1 = Some(field);
        self
    }

    pub fn with_field2(mut self, field: &'a wgpu::TextureView) -> Self {
        self.field2 = Some(field);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.field1.is_none() && self.field2.is_none()
    }
}

// This should match the struct defined in update.wgsl.
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct UpdateUniforms {
    lattice_size: [u32; 2],
    channel_count: u32,
    frame_seed: f32,
    velocity_damping: f32,
    force_multiplier: f32,
    max_velocity: f32,
    jitter_strength: f32,
    jitter_smoothing: f32,
    field1_multiplier: f32,
    field1_value_offset: f32,
    field2_multiplier: f32,
    field2_value_offset: f32,
    _padding: [u32; 3],
}

impl UpdateUniforms {
    // Fields are passed in slot order; an absent slot contributes nothing.
    fn new(
        lattice: LatticeSize,
        channel_count: usize,
        params: &FieldParams,
        frame_seed: f32,
        has_field1: bool,
        has_field2: bool,
    ) -> Self {
        let (field1_multiplier, field1_value_offset) = if has_field1 {
            (params.field1_multiplier, params.field1_value_offset)
        } else {
            (0.0, 0.0)
        };
        let (field2_multiplier, field2_value_offset) = if has_field2 {
            (params.field2_multiplier, params.field2_value_offset)
        } else {
            (0.0, 0.0)
        };
        UpdateUniforms {
            lattice_size: [lattice.width, lattice.height],
            channel_count: channel_count as u32,
            frame_seed,
            velocity_damping: params.velocity_damping,
            force_multiplier: params.force_multiplier,
            max_velocity: params.max_velocity,
            jitter_strength: params.jitter_strength,
            jitter_smoothing: params.jitter_smoothing,
            field1_multiplier,
            field1_value_offset,
            field2_multiplier,
            field2_value_offset,
            _padding: [0; 3],
        }
    }
}

// Integrates every particle one step and swaps the store's buffers.
pub struct UpdatePass {
    uniform_buffer: SizedBuffer,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
    // Stands in for a missing field.
    _zero_field_texture: wgpu::Texture,
    zero_field: wgpu::TextureView,
}

fn field_layout_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

// 1x1 field that is zero everywhere. Textures start out zeroed.
fn make_zero_field(device: &wgpu::Device) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Zero field"),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rg32Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

impl UpdatePass {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_buffer =
            buffer_util::make_default_uniform_buffer::<UpdateUniforms>(device, "Update uniforms");
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Update bind group layout"),
            entries: &[
                buffer_util::uniform_layout_entry(
                    0,
                    wgpu::ShaderStages::COMPUTE,
                    &uniform_buffer,
                ),
                // Source particle state.
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                // Target particle state.
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: STATE_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                    },
                    count: None,
                },
                field_layout_entry(3),
                field_layout_entry(4),
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Update pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let module = shader_util::create_shader_module(
            device,
            "Update shader module",
            crate::include_shader!("update.wgsl"),
        );
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Update pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: "main",
        });
        let (zero_field_texture, zero_field) = make_zero_field(device);
        UpdatePass {
            uniform_buffer,
            bind_group_layout,
            pipeline,
            _zero_field_texture: zero_field_texture,
            zero_field,
        }
    }

    // Returns false without touching the store when no field is present.
    pub fn run(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        store: &mut ParticleStore,
        fields: &FieldInputs<'_>,
        params: &FieldParams,
        frame_seed: f32,
    ) -> bool {
        if fields.is_empty() {
            log::debug!("No field set, skipping particle update");
            return false;
        }
        let uniforms = UpdateUniforms::new(
            store.lattice(),
            store.channels(),
            params,
            frame_seed,
            fields.field1.is_some(),
            fields.field2.is_some(),
        );
        buffer_util::set_uniforms(device, encoder, &self.uniform_buffer, &uniforms);

        {
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Update bind group"),
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
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&store.target().storage_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(
                            fields.field1.unwrap_or(&self.zero_field),
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: wgpu::BindingResource::TextureView(
                            fields.field2.unwrap_or(&self.zero_field),
                        ),
                    },
                ],
            });
            let lattice = store.lattice();
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Particle update"),
                timestamp_writes: None,
            });
            cpass.set_pipeline(&self.pipeline);
            cpass.set_bind_group(0, &bind_group, &[]);
            cpass.dispatch_workgroups(
                shader_util::work_groups(lattice.width),
                shader_util::work_groups(lattice.height),
                1,
            );
        }
        store.swap();
        true
    }
}
