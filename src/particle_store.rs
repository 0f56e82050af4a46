// Double-buffered particle state. Each buffer is one Rg32Float 2-D array
// texture whose layers are the per-particle channels, addressed by integer
// lattice coordinate.
use crate::lattice::{LatticeSize, Region};

pub const STATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg32Float;
// Bytes per texel of STATE_FORMAT.
pub const TEXEL_SIZE: u32 = 8;

pub struct StateTexture {
    pub texture: wgpu::Texture,
    // texture_2d_array<f32> view for textureLoad.
    pub sampled_view: wgpu::TextureView,
    // texture_storage_2d_array<rg32float, write> view.
    pub storage_view: wgpu::TextureView,
}

impl StateTexture {
    fn new(device: &wgpu::Device, lattice: LatticeSize, channels: usize, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: lattice.width,
                height: lattice.height,
                depth_or_array_layers: channels as u32,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: STATE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let array_view = |label: &str| {
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some(label),
                format: Some(STATE_FORMAT),
                dimension: Some(wgpu::TextureViewDimension::D2Array),
                aspect: wgpu::TextureAspect::All,
                base_mip_level: 0,
                mip_level_count: Some(1),
                base_array_layer: 0,
                array_layer_count: Some(channels as u32),
            })
        };
        let sampled_view = array_view("Particle state sampled view");
        let storage_view = array_view("Particle state storage view");
        StateTexture {
            texture,
            sampled_view,
            storage_view,
        }
    }
}

pub struct ParticleStore {
    lattice: LatticeSize,
    channels: usize,
    buffers: [StateTexture; 2],
    source_index: usize,
}

impl ParticleStore {
    // New textures are zero filled.
    pub fn new(device: &wgpu::Device, lattice: LatticeSize, channels: usize) -> Self {
        log::info!(
            "Allocating particle store {}x{} ({} particles, {} channels)",
            lattice.width,
            lattice.height,
            lattice.count(),
            channels
        );
        ParticleStore {
            lattice,
            channels,
            buffers: [
                StateTexture::new(device, lattice, channels, "Particle state A"),
                StateTexture::new(device, lattice, channels, "Particle state B"),
            ],
            source_index: 0,
        }
    }

    pub fn lattice(&self) -> LatticeSize {
        self.lattice
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn source(&self) -> &StateTexture {
        &self.buffers[self.source_index]
    }

    pub fn target(&self) -> &StateTexture {
        &self.buffers[1 - self.source_index]
    }

    pub fn swap(&mut self) {
        self.source_index = 1 - self.source_index;
    }

    pub fn has_channel(&self, channel: usize) -> bool {
        channel < self.channels
    }

    // Copies the cells of `region` in every channel of `old`'s source buffer
    // into this store's source buffer at the same coordinates.
    pub fn copy_region_from(
        &self,
        old: &ParticleStore,
        region: Region,
        encoder: &mut wgpu::CommandEncoder,
    ) {
        if region.is_empty() {
            return;
        }
        let layers = self.channels.min(old.channels) as u32;
        let origin = wgpu::Origin3d {
            x: region.x,
            y: region.y,
            z: 0,
        };
        encoder.copy_texture_to_texture(
            wgpu::ImageCopyTexture {
                texture: &old.source().texture,
                mip_level: 0,
                origin,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyTexture {
                texture: &self.source().texture,
                mip_level: 0,
                origin,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: layers,
            },
        );
    }

    // Uploads one value pair per particle, row-major, into a channel of the
    // source buffer. Takes effect at the start of the next queue submission.
    pub fn load_channel(&self, queue: &wgpu::Queue, channel: usize, data: &[[f32; 2]]) {
        if !self.has_channel(channel) {
            log::error!(
                "Ignoring load into channel {}, store has {} channels",
                channel,
                self.channels
            );
            return;
        }
        if data.len() != self.lattice.count() {
            log::error!(
                "Ignoring load of {} values into channel {}, lattice holds {}",
                data.len(),
                channel,
                self.lattice.count()
            );
            return;
        }
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.source().texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: channel as u32,
                },
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(data),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(TEXEL_SIZE * self.lattice.width),
                rows_per_image: Some(self.lattice.height),
            },
            wgpu::Extent3d {
                width: self.lattice.width,
                height: self.lattice.height,
                depth_or_array_layers: 1,
            },
        );
    }
}

// Blocking readback of one channel of the source buffer, row-major.
#[cfg(test)]
pub fn read_channel(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    store: &ParticleStore,
    channel: usize,
) -> Vec<[f32; 2]> {
    let lattice = store.lattice();
    let unpadded_row = TEXEL_SIZE * lattice.width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_row = (unpadded_row + align - 1) / align * align;
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback"),
        size: (padded_row * lattice.height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture: &store.source().texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: channel as u32,
            },
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &staging,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(lattice.height),
            },
        },
        wgpu::Extent3d {
            width: lattice.width,
            height: lattice.height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(Some(encoder.finish()));
    let slice = staging.slice(..);
    slice.map_async(wgpu::MapMode::Read, |result| result.unwrap());
    device.poll(wgpu::Maintain::Wait);
    let mapped = slice.get_mapped_range();
    let mut values = Vec::with_capacity(lattice.count());
    for row in mapped.chunks(padded_row as usize) {
        let texels: &[[f32; 2]] = bytemuck::cast_slice(&row[..unpadded_row as usize]);
        values.extend_from_slice(texels);
    }
    drop(mapped);
    staging.unmap();
    values
}
