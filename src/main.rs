// Headless demo: drifts particles through a swirl field, resizes the lattice
// half way through and writes the last frame to a PNG.
use anyhow::{anyhow, Context};
use log::{error, info};
use rand::Rng;

use particle_field::draw_pass::Destination;
use particle_field::field_params::{self, FieldParams};
use particle_field::frame_timer::FrameTimer;
use particle_field::particle_field::ParticleField;
use particle_field::update_pass::FieldInputs;

gflags::define! {
    --config: &str = "field_config.toml"
}
gflags::define! {
    --frames: u32 = 240
}
gflags::define! {
    --fps: u32 = 0
}
gflags::define! {
    --output: &str = "particle_field.png"
}
gflags::define! {
    --width: u32 = 640
}
gflags::define! {
    --height: u32 = 360
}
gflags::define! {
    --log_filter: &str = "warn,particle_field=info"
}
gflags::define! {
    -h, --help = false
}

const FIELD_SIZE: u32 = 64;
const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn read_config_from_file(path: &str) -> anyhow::Result<FieldParams> {
    let params = std::fs::read_to_string(path)?.parse()?;
    Ok(params)
}

fn get_field_config() -> FieldParams {
    match read_config_from_file(CONFIG.flag) {
        Ok(params) => params,
        Err(e) => {
            error!("Failed to parse config file({}): {:?}", CONFIG.flag, e);
            field_params::get_field_config_from_default_file()
        }
    }
}

// Field texture holding f(u, v) at each texel center.
fn make_field<F: Fn(f32, f32) -> [f32; 2]>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    f: F,
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width: FIELD_SIZE,
        height: FIELD_SIZE,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rg32Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let mut values = Vec::with_capacity((FIELD_SIZE * FIELD_SIZE) as usize);
    for y in 0..FIELD_SIZE {
        for x in 0..FIELD_SIZE {
            let u = (x as f32 + 0.5) / FIELD_SIZE as f32;
            let v = (y as f32 + 0.5) / FIELD_SIZE as f32;
            values.push(f(u, v));
        }
    }
    queue.write_texture(
        texture.as_image_copy(),
        bytemuck::cast_slice(&values),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(8 * FIELD_SIZE),
            rows_per_image: Some(FIELD_SIZE),
        },
        size,
    );
    texture
}

// Stored in [0, 1] around 0.5, the way noise generators hand fields over.
fn swirl(u: f32, v: f32) -> [f32; 2] {
    let (dx, dy) = (u - 0.5, v - 0.5);
    [0.5 - dy, 0.5 + dx]
}

fn drift(_u: f32, v: f32) -> [f32; 2] {
    [0.5 + 0.1 * (v * std::f32::consts::TAU).sin(), 0.5]
}

fn random_color() -> [f32; 4] {
    let mut rng = rand::thread_rng();
    [rng.gen(), rng.gen(), rng.gen(), 1.0]
}

async fn save_frame(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
    path: &str,
) -> anyhow::Result<()> {
    let unpadded_row = 4 * width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_row = (unpadded_row + align - 1) / align * align;
    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Frame readback"),
        size: (padded_row * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Frame readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        texture.as_image_copy(),
        wgpu::ImageCopyBuffer {
            buffer: &readback,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(Some(encoder.finish()));

    let slice = readback.slice(..);
    let (sender, receiver) = futures::channel::oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    receiver
        .await
        .context("Readback was cancelled")?
        .context("Failed to map readback buffer")?;

    let mut pixels = Vec::with_capacity((unpadded_row * height) as usize);
    {
        let mapped = slice.get_mapped_range();
        for row in mapped.chunks(padded_row as usize) {
            pixels.extend_from_slice(&row[..unpadded_row as usize]);
        }
    }
    readback.unmap();
    let image = image::RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("Frame buffer does not match {}x{}", width, height))?;
    image
        .save(path)
        .with_context(|| format!("Failed to write {}", path))?;
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let params = get_field_config();
    let (device, queue) = particle_field::gpu::request_headless_device().await?;
    let (width, height) = (WIDTH.flag, HEIGHT.flag);

    let swirl_texture = make_field(&device, &queue, "Swirl field", swirl);
    let swirl_view = swirl_texture.create_view(&wgpu::TextureViewDescriptor::default());
    let drift_texture = make_field(&device, &queue, "Drift field", drift);
    let drift_view = drift_texture.create_view(&wgpu::TextureViewDescriptor::default());

    let output = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Output frame"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OUTPUT_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());
    let destination = Destination {
        view: &output_view,
        width,
        height,
        format: OUTPUT_FORMAT,
    };

    let mut init_encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Setup encoder"),
    });
    let initial_count = params.particle_count;
    let mut field = ParticleField::new(&device, &mut init_encoder, params);
    queue.submit(Some(init_encoder.finish()));

    let fields = FieldInputs::new()
        .with_field1(&swirl_view)
        .with_field2(&drift_view);
    let frames = FRAMES.flag.max(1);
    let mut timer = FrameTimer::new(FPS.flag as f64);
    for frame in 0..frames {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame encoder"),
        });
        if frame == frames / 2 {
            let grown = initial_count + initial_count / 2;
            field.apply_resize(&device, &mut encoder, grown);
            let block_size = (field.particle_count() / 100).max(1);
            field.update_random_color_blocks(&queue, 8, block_size, random_color);
        }
        field.update(&device, &mut encoder, &fields);
        field.draw(&device, &mut encoder, &destination, false);
        queue.submit(Some(encoder.finish()));
        timer.tick();
    }
    info!(
        "Ran {} frames of {} particles, average frame time {:?}",
        timer.frames(),
        field.particle_count(),
        timer.average()
    );

    save_frame(&device, &queue, &output, width, height, OUTPUT.flag).await?;
    info!("Wrote {}", OUTPUT.flag);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    gflags::parse();
    if HELP.flag {
        gflags::print_help_and_exit(0);
    }
    scrub_log::init_with_filter_string(LOG_FILTER.flag)
        .map_err(|e| anyhow!("Failed to initialize logging: {:?}", e))?;
    futures::executor::block_on(run())
}
