// Build script to compile the triangle shaders to SPIR-V
//
// The bootstrap loads the .spv files at runtime; a missing glslc only
// produces a warning here and an I/O error at pipeline-layout time.

use std::path::Path;
use std::process::Command;

const SHADERS: &[(&str, &str)] = &[
    ("shaders/triangle.vert", "shaders/triangle.vert.spv"),
    ("shaders/triangle.frag", "shaders/triangle.frag.spv"),
];

fn main() {
    for (input, output) in SHADERS {
        println!("cargo:rerun-if-changed={}", input);
        compile_shader(input, output);
    }
}

fn compile_shader(input: &str, output: &str) {
    let input_path = Path::new(input);
    let output_path = Path::new(output);

    let result = Command::new("glslc")
        .arg(input_path)
        .arg("-o")
        .arg(output_path)
        .status();

    match result {
        Ok(status) if status.success() => {}
        Ok(status) => {
            println!("cargo:warning=glslc failed on {}: exit code {:?}", input, status.code());
        }
        Err(e) => {
            println!(
                "cargo:warning=glslc not found ({}); compile manually: glslc {} -o {}",
                e, input, output
            );
        }
    }
}
