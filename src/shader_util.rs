// These need to match the tera context in build.rs.
pub const WORKGROUP_SIZE: u32 = 8;
pub const POSITION_CHANNEL: usize = 0;
pub const VELOCITY_CHANNEL: usize = 1;
pub const JITTER_CHANNEL: usize = 2;
pub const WEIGHT_CHANNEL: usize = 3;

// Include generated shader source by specifying a path relative to the shader
// source directory.
#[macro_export]
macro_rules! include_shader {
    ($path:literal) => {
        include_str!(concat!(env!("OUT_DIR"), "/shaders/", $path))
    };
}

pub fn create_shader_module(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(source)),
    })
}

// Number of workgroups needed to cover `extent` cells along one axis.
pub fn work_groups(extent: u32) -> u32 {
    (extent + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shaders_are_generated() {
        assert!(crate::include_shader!("init.wgsl").contains("fn main"));
        assert!(crate::include_shader!("update.wgsl").contains("fn main"));
        assert!(crate::include_shader!("draw.wgsl").contains("fn vs_main"));
    }

    fn validate(name: &str, source: &str) {
        let module = match naga::front::wgsl::parse_str(source) {
            Ok(module) => module,
            Err(e) => panic!("{} failed to parse:\n{}", name, e.emit_to_string(source)),
        };
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        );
        if let Err(e) = validator.validate(&module) {
            panic!("{} failed validation: {:?}", name, e);
        }
    }

    #[test]
    fn shaders_validate() {
        validate("init.wgsl", crate::include_shader!("init.wgsl"));
        validate("update.wgsl", crate::include_shader!("update.wgsl"));
        validate("draw.wgsl", crate::include_shader!("draw.wgsl"));
    }

    #[test]
    fn work_groups_cover_extent() {
        assert_eq!(work_groups(0), 0);
        assert_eq!(work_groups(1), 1);
        assert_eq!(work_groups(8), 1);
        assert_eq!(work_groups(9), 2);
        assert_eq!(work_groups(707), 89);
    }
}
