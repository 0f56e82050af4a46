use rand::Rng;
use wgpu::util::DeviceExt;

use crate::buffer_util::SizedBuffer;
use crate::lattice::LatticeSize;

// One instance per particle. This should match the vertex inputs in draw.wgsl.
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ParticleVertex {
    pub lattice: [u32; 2],
    pub color: [f32; 4],
}

impl ParticleVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Uint32x2, 1 => Float32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ParticleVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

// Lattice-ordered vertices, column by column.
pub fn lattice_vertices(lattice: LatticeSize, tint: [f32; 4]) -> Vec<ParticleVertex> {
    let mut vertices = Vec::with_capacity(lattice.count());
    for x in 0..lattice.width {
        for y in 0..lattice.height {
            vertices.push(ParticleVertex {
                lattice: [x, y],
                color: tint,
            });
        }
    }
    vertices
}

// Picks `num_blocks` random contiguous runs of `block_size` vertices and gives
// each run one color from `color_fn`. Returns the touched ranges.
pub fn tint_random_blocks<R: Rng, F: FnMut() -> [f32; 4]>(
    vertices: &mut [ParticleVertex],
    rng: &mut R,
    num_blocks: usize,
    block_size: usize,
    mut color_fn: F,
) -> Vec<std::ops::Range<usize>> {
    let mut ranges = vec![];
    if vertices.is_empty() || block_size == 0 {
        return ranges;
    }
    let block_size = block_size.min(vertices.len());
    for _ in 0..num_blocks {
        let start = rng.gen_range(0..=vertices.len() - block_size);
        let color = color_fn();
        for vertex in &mut vertices[start..start + block_size] {
            vertex.color = color;
        }
        ranges.push(start..start + block_size);
    }
    ranges
}

pub struct ParticleMesh {
    vertices: Vec<ParticleVertex>,
    vertex_buffer: SizedBuffer,
}

impl ParticleMesh {
    pub fn new(device: &wgpu::Device, lattice: LatticeSize, tint: [f32; 4]) -> Self {
        let vertices = lattice_vertices(lattice, tint);
        let contents: &[u8] = bytemuck::cast_slice(&vertices);
        let vertex_buffer = SizedBuffer {
            buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Particle vertices"),
                contents,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            }),
            size: contents.len() as _,
        };
        ParticleMesh {
            vertices,
            vertex_buffer,
        }
    }

    pub fn vertices(&self) -> &[ParticleVertex] {
        &self.vertices
    }

    pub fn instance_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer.buffer
    }

    pub fn update_random_color_blocks<F: FnMut() -> [f32; 4]>(
        &mut self,
        queue: &wgpu::Queue,
        num_blocks: usize,
        block_size: usize,
        color_fn: F,
    ) {
        let ranges = tint_random_blocks(
            &mut self.vertices,
            &mut rand::thread_rng(),
            num_blocks,
            block_size,
            color_fn,
        );
        let stride = std::mem::size_of::<ParticleVertex>();
        for range in ranges {
            queue.write_buffer(
                &self.vertex_buffer.buffer,
                (range.start * stride) as wgpu::BufferAddress,
                bytemuck::cast_slice(&self.vertices[range]),
            );
        }
    }
}
