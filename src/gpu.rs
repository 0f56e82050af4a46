use anyhow::{anyhow, Context};

// Device without a surface, for offscreen simulation and rendering.
pub async fn request_headless_device() -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| anyhow!("No suitable GPU adapter found"))?;
    log::info!("Using adapter: {:?}", adapter.get_info());
    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Particle field device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        )
        .await
        .context("Failed to create device")?;
    Ok((device, queue))
}

// The GPU tests are #[ignore]d and only run on request, so a missing adapter
// is a failure rather than a silent pass.
#[cfg(test)]
pub fn test_device() -> (wgpu::Device, wgpu::Queue) {
    match futures::executor::block_on(request_headless_device()) {
        Ok(gpu) => gpu,
        Err(e) => panic!("GPU tests need an adapter: {:?}", e),
    }
}
