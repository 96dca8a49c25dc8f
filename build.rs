use std::env;

fn main() {
    // Linker scripts only apply to the bare-metal firmware image
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("none") {
        // Tell the linker where to find memory.x
        println!("cargo:rustc-link-search={}", env::var("CARGO_MANIFEST_DIR").unwrap_or_default());
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }

    // Only re-run the build script when memory.x is changed
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}
