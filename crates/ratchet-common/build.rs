//! ---
//! ratchet_section: "06-release"
//! ratchet_subsection: "build"
//! ratchet_type: "source"
//! ratchet_scope: "build"
//! ratchet_description: "Emit build metadata consumed by the version module."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    EmitBuilder::builder()
        .build_timestamp()
        .cargo_target_triple()
        .cargo_opt_level()
        .emit()?;

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=RATCHET_BUILD_REVISION");
    Ok(())
}
