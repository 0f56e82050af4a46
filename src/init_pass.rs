use crate::buffer_util::{self, SizedBuffer};
use crate::lattice::Region;
use crate::particle_store::{ParticleStore, STATE_FORMAT};
use crate::shader_util;

// This should match the struct defined in init.wgsl.
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct InitUniforms {
    region_start: [u32; 2],
    region_size: [u32; 2],
    channel: u32,
    seed: f32,
    min_weight: f32,
    max_weight: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WeightRange {
    pub min: f32,
    pub max: f32,
}

// Procedurally fills lattice regions with starting values.
pub struct InitPass {
    uniform_buffer: SizedBuffer,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

impl InitPass {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_buffer =
            buffer_util::make_default_uniform_buffer::<InitUniforms>(device, "Init uniforms");
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Init bind group layout"),
            entries: &[
                buffer_util::uniform_layout_entry(
                    0,
                    wgpu::ShaderStages::COMPUTE,
                    &uniform_buffer,
                ),
                // Active particle state, written in place.
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: STATE_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                    },
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Init pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let module = shader_util::create_shader_module(
            device,
            "Init shader module",
            crate::include_shader!("init.wgsl"),
        );
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Init pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: "main",
        });
        InitPass {
            uniform_buffer,
            bind_group_layout,
            pipeline,
        }
    }

    // Whether `channel` is one this pass generates values for.
    pub fn initializes(channel: usize) -> bool {
        channel == shader_util::POSITION_CHANNEL
            || channel == shader_util::VELOCITY_CHANNEL
            || channel == shader_util::WEIGHT_CHANNEL
    }

    // Fills `region` of one channel of the store's source buffer. The same
    // (cell, seed) always produces the same value.
    pub fn initialize_region(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        store: &ParticleStore,
        channel: usize,
        region: Region,
        seed: f32,
        weights: WeightRange,
    ) {
        if !store.has_channel(channel) {
            log::error!(
                "Ignoring init of channel {}, store has {} channels",
                channel,
                store.channels()
            );
            return;
        }
        if !InitPass::initializes(channel) {
            log::debug!("Channel {} has no initial values, leaving it untouched", channel);
            return;
        }
        let lattice = store.lattice();
        let region = Region {
            x: region.x,
            y: region.y,
            width: region.width.min(lattice.width.saturating_sub(region.x)),
            height: region.height.min(lattice.height.saturating_sub(region.y)),
        };
        if region.is_empty() {
            return;
        }
        log::debug!("Initializing channel {} in {:?} with seed {}", channel, region, seed);

        let uniforms = InitUniforms {
            region_start: [region.x, region.y],
            region_size: [region.width, region.height],
            channel: channel as u32,
            seed,
            min_weight: weights.min,
            max_weight: weights.max,
        };
        buffer_util::set_uniforms(device, encoder, &self.uniform_buffer, &uniforms);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Init bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&store.source().storage_view),
                },
            ],
        });
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Particle init"),
            timestamp_writes: None,
        });
        cpass.set_pipeline(&self.pipeline);
        cpass.set_bind_group(0, &bind_group, &[]);
        cpass.dispatch_workgroups(
            shader_util::work_groups(region.width),
            shader_util::work_groups(region.height),
            1,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu_kernels;
    use crate::lattice::LatticeSize;
    use crate::particle_store::read_channel;

    const WEIGHTS: WeightRange = WeightRange { min: 0.5, max: 2.0 };

    #[test]
    fn recognized_channels() {
        assert!(InitPass::initializes(shader_util::POSITION_CHANNEL));
        assert!(InitPass::initializes(shader_util::VELOCITY_CHANNEL));
        assert!(!InitPass::initializes(shader_util::JITTER_CHANNEL));
        assert!(InitPass::initializes(shader_util::WEIGHT_CHANNEL));
        assert!(!InitPass::initializes(7));
    }

    #[test]
    #[ignore] // Needs a GPU adapter, run on demand.
    fn region_matches_cpu_kernels() {
        let (device, queue) = crate::gpu::test_device();
        let lattice = LatticeSize::new(6, 5);
        let store = ParticleStore::new(&device, lattice, 4);
        let pass = InitPass::new(&device);
        let region = Region { x: 2, y: 1, width: 3, height: 3 };
        let seed = 12345.5;
        let mut encoder = device.create_command_encoder(&Default::default());
        for channel in 0..4 {
            pass.initialize_region(&device, &mut encoder, &store, channel, region, seed, WEIGHTS);
        }
        // Out of range channel is a logged no-op.
        pass.initialize_region(&device, &mut encoder, &store, 4, region, seed, WEIGHTS);
        queue.submit(Some(encoder.finish()));

        let positions = read_channel(&device, &queue, &store, 0);
        let velocities = read_channel(&device, &queue, &store, 1);
        let jitter = read_channel(&device, &queue, &store, 2);
        let weights = read_channel(&device, &queue, &store, 3);
        for y in 0..lattice.height {
            for x in 0..lattice.width {
                let i = (y * lattice.width + x) as usize;
                assert_eq!(jitter[i], [0.0, 0.0]);
                if !region.contains(x, y) {
                    assert_eq!(positions[i], [0.0, 0.0]);
                    assert_eq!(weights[i], [0.0, 0.0]);
                    continue;
                }
                assert_eq!(positions[i], cpu_kernels::initial_position([x, y], seed));
                let v = cpu_kernels::initial_velocity([x, y], seed);
                assert!((velocities[i][0] - v[0]).abs() < 1e-6);
                assert!((velocities[i][1] - v[1]).abs() < 1e-6);
                let w = cpu_kernels::initial_weight([x, y], seed, WEIGHTS.min, WEIGHTS.max);
                assert!((weights[i][0] - w).abs() < 1e-5);
            }
        }
    }
}
