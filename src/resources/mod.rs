use std::path::{Path, PathBuf};

use anyhow::Context as _;

/**
 * This module contains all logic for loading textures from the assets directory.
 */
pub mod texture;

pub use texture::{load_texture, texture_bind_group_layout};

/// Directory all asset names are resolved against.
pub const ASSETS_DIR: &str = "assets";

/// Copy of the assets made by the build script.
const BUNDLED_ASSETS: &str = concat!(env!("OUT_DIR"), "/assets");

/// Resolve `file_name` in `./assets`, falling back to the copy made at build
/// time so the binary also starts outside the crate root.
pub fn asset_path(file_name: &str) -> PathBuf {
    let local = Path::new("./").join(ASSETS_DIR).join(file_name);
    if local.exists() {
        return local;
    }
    Path::new(BUNDLED_ASSETS).join(file_name)
}

/// Read an asset into memory. Needs to run inside a tokio runtime.
pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = asset_path(file_name);
    let data = tokio::fs::read(&path).await.with_context(|| {
        format!(
            "Unable to load {}. Make sure the path is correct",
            path.display()
        )
    })?;
    log::debug!("loaded {} ({} bytes)", path.display(), data.len());
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_names_inside_assets() {
        let path = asset_path("sun.png");
        assert!(path.ends_with("assets/sun.png"));
    }

    #[test]
    fn build_copies_assets_into_out_dir() {
        for name in ["sun.png", "robot.png", "cone.png"] {
            let bundled = Path::new(BUNDLED_ASSETS).join(name);
            assert!(bundled.exists(), "{} is missing", bundled.display());
        }
    }

    #[test]
    fn unknown_names_fall_back_to_the_bundled_copy() {
        let path = asset_path("does-not-exist.png");
        assert!(path.starts_with(BUNDLED_ASSETS), "{}", path.display());
    }

    #[tokio::test]
    async fn missing_file_names_the_path() {
        let err = load_binary("does-not-exist.png").await.unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("does-not-exist.png"), "{msg}");
    }
}
