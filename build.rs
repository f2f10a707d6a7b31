use std::{env, path::PathBuf};

fn main() -> anyhow::Result<()> {
    // Rerun when the asset directory appears or changes.
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets = manifest_dir.join("assets");
    println!("cargo:rustc-env=RENDER_DOJO_ASSETS={}", assets.display());

    Ok(())
}
