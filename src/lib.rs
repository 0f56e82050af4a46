pub mod buffer_util;
#[cfg(test)]
mod cpu_kernels;
pub mod draw_pass;
pub mod field_params;
pub mod frame_timer;
pub mod gpu;
pub mod init_pass;
pub mod lattice;
pub mod particle_field;
pub mod particle_store;
pub mod render_mesh;
pub mod resize_controller;
pub mod shader_util;
pub mod update_pass;
