use std::{env, fs, path::PathBuf};

// Vertex layout must match `mesh::Vertex`:
//   binding 0, location 0: R32G32_SFLOAT    (pos)
//   binding 0, location 1: R32G32B32_SFLOAT (color)
// Uniform block must match `uniforms::CameraUbo` (std140, three mat4).
const MESH_VERT: &str = r#"
#version 450
layout(location = 0) in vec2 inPos;
layout(location = 1) in vec3 inColor;

layout(set = 0, binding = 0) uniform Camera {
    mat4 model;
    mat4 view;
    mat4 proj;
} u;

layout(location = 0) out vec3 vColor;

void main() {
    vColor = inColor;
    gl_Position = u.proj * u.view * u.model * vec4(inPos, 0.0, 1.0);
}
"#;

const MESH_FRAG: &str = r#"
#version 450
layout(location = 0) in vec3 vColor;
layout(location = 0) out vec4 outColor;

void main() {
    outColor = vec4(vColor, 1.0);
}
"#;

fn main() {
    let out = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));

    let compiler = shaderc::Compiler::new().expect("shaderc compiler");
    let mut opts = shaderc::CompileOptions::new().expect("shaderc options");
    opts.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_0 as u32,
    );
    opts.set_optimization_level(shaderc::OptimizationLevel::Performance);

    let shaders = [
        ("mesh.vert", MESH_VERT, shaderc::ShaderKind::Vertex),
        ("mesh.frag", MESH_FRAG, shaderc::ShaderKind::Fragment),
    ];
    for (name, src, kind) in shaders {
        let spv = compiler
            .compile_into_spirv(src, kind, name, "main", Some(&opts))
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        fs::write(out.join(format!("{name}.spv")), spv.as_binary_u8())
            .unwrap_or_else(|e| panic!("write {name}.spv: {e}"));
    }

    println!("cargo:rerun-if-changed=build.rs");
}
