use std::{env, error::Error, fs};

// These need to match the constants in src/shader_util.rs.
const WORKGROUP_SIZE: u32 = 8;
const POSITION_CHANNEL: u32 = 0;
const VELOCITY_CHANNEL: u32 = 1;
const JITTER_CHANNEL: u32 = 2;
const WEIGHT_CHANNEL: u32 = 3;

// All shaders reside in the 'src/shaders' directory. Only *.wgsl files are
// emitted, anything else is an include-only template.
fn generate_shaders() -> std::result::Result<(), Box<dyn Error>> {
    let tera = tera::Tera::new("src/shaders/*")?;
    println!("cargo:rerun-if-changed=src/shaders/");
    let mut context = tera::Context::new();
    context.insert("workgroup_size", &WORKGROUP_SIZE);
    context.insert("position_channel", &POSITION_CHANNEL);
    context.insert("velocity_channel", &VELOCITY_CHANNEL);
    context.insert("jitter_channel", &JITTER_CHANNEL);
    context.insert("weight_channel", &WEIGHT_CHANNEL);
    let output_path = env::var("OUT_DIR")?;
    fs::create_dir_all(format!("{}/shaders/", output_path))?;
    for file in fs::read_dir("src/shaders")? {
        let file = file?;
        println!("cargo:rerun-if-changed={}", file.path().display());
        let is_wgsl = file
            .path()
            .extension()
            .map(|ext| ext == "wgsl")
            .unwrap_or(false);
        if is_wgsl {
            let file = file.file_name();
            let file_name = file.to_str().ok_or("non utf-8 shader file name")?;
            let result = tera.render(file_name, &context)?;
            fs::write(format!("{}/shaders/{}", output_path, file_name), result)?;
        }
    }
    Ok(())
}

fn main() {
    if let Err(err) = generate_shaders() {
        // panic here for a nicer error message, otherwise it will
        // be flattened to one line for some reason
        panic!("Unable to generate shaders\n{}", err);
    }
}
