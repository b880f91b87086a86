use gl_generator::{Api, Fallbacks, Profile, Registry};
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn main() {
    let dest = env::var("OUT_DIR").unwrap();
    let dest = Path::new(&dest);

    println!("cargo:rerun-if-changed=build.rs");

    let mut file_output = File::create(dest.join("gl_bindings.rs")).unwrap();
    generate_gl_bindings(&mut file_output);
}

fn generate_gl_bindings<W>(dest: &mut W)
where
    W: Write,
{
    let gl_registry = Registry::new(
        Api::Gl,
        (4, 6),
        Profile::Core,
        Fallbacks::None,
        vec![
            "GL_ARB_framebuffer_sRGB",
            "GL_ARB_texture_float",
            "GL_EXT_framebuffer_blit",
            "GL_EXT_framebuffer_object",
            "GL_EXT_framebuffer_sRGB",
            "GL_EXT_texture_sRGB",
        ],
    );

    (gl_registry)
        .write_bindings(gl_generator::StructGenerator, dest)
        .unwrap();
}
