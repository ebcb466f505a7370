use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

const SPRITES: [&str; 3] = ["sun.png", "robot.png", "cone.png"];

fn main() -> Result<()> {
    // Rerun whenever a sprite image changes.
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets_src = manifest_dir.join("assets");
    for sprite in SPRITES {
        if !assets_src.join(sprite).exists() {
            println!("cargo:warning=assets/{sprite} is missing, the demo will fail to start");
        }
    }

    if assets_src.exists() {
        let out_dir = env::var("OUT_DIR")?;
        let mut copy_options = CopyOptions::new();
        copy_options.overwrite = true;
        copy_items(&[assets_src], out_dir, &copy_options)?;
    }

    Ok(())
}
