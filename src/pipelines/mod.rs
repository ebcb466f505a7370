//! Render pipeline definitions.

pub mod sprite;
