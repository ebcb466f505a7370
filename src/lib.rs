//! flow-sprites
//!
//! A small wgpu/winit sprite animation built around flow-style scene hooks.
//! Three textured unit quads (a sun, a robot and a cone) are drawn in an
//! orthographic scene: the sun spins in the top-left corner while the robot
//! and the cone slide to the right and wrap back around.
//!
//! High-level modules
//! - `animation`: animation scalars and the model matrices derived from them
//! - `camera`: orthographic projection, view and the camera uniform
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: the shared quad, per-sprite instances and textures
//! - `flow`: high level flow control (scene hooks / event loop)
//! - `pipelines`: the textured sprite pipeline
//! - `resources`: helpers to load textures from the assets directory
//! - `render`: render composition for ordered sprite batches
//! - `scene`: the animated sun/robot/cone flow
//!

pub mod animation;
pub mod camera;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;
pub use wgpu::Color;
