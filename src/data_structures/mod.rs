//! Engine data structures: the shared quad, sprite instances and textures.
//!
//! - `quad` holds the unit quad every sprite is drawn with
//! - `instance` holds per-sprite model matrices as they are stored on the GPU
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `sprite` bundles a texture, an instance buffer and a model matrix

pub mod instance;
pub mod quad;
pub mod sprite;
pub mod texture;
