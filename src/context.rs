//! Central GPU and window context.
//!
//! [`Context`] owns the surface, device, queue, the camera and the sprite
//! pipeline. Flows receive a shared reference every frame and may change the
//! [`RuntimeConfig`] (`clear_colour`, `tick_duration_millis`) through
//! [`crate::flow::Out::Configure`].
//!
//! Colours are given the way the sprites' PNGs store them: gamma encoded.
//! The surface is therefore preferably a non-sRGB one, so that a clear colour
//! of `0.6` ends up as the byte `153` on screen and alpha blending happens in
//! the same space the images were painted in.

use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::{
    camera::{CameraResources, Projection},
    data_structures::quad::QuadBuffer,
    pipelines::sprite::mk_sprite_pipeline,
    resources::texture_bind_group_layout,
};

/// Engine default behind every flow. Scenes pick their own in `on_init`.
pub const DEFAULT_CLEAR_COLOUR: wgpu::Color = wgpu::Color::BLACK;

/// Settings flows may change at runtime through [`crate::flow::Out::Configure`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RuntimeConfig {
    /// Gamma-encoded clear colour, see [`clear_colour_for`].
    pub clear_colour: wgpu::Color,
    pub tick_duration_millis: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            clear_colour: DEFAULT_CLEAR_COLOUR,
            tick_duration_millis: 1000,
        }
    }
}

/// Pick a surface format that stores colours as they are written.
///
/// Falls back to the first (usually sRGB) format if the surface offers
/// nothing else; [`clear_colour_for`] compensates for that case.
pub fn pick_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first().copied())
}

/// The value handed to `LoadOp::Clear` so that `colour` shows up unchanged
/// on a surface of `format`.
///
/// An sRGB surface encodes whatever it is given, so the colour is decoded to
/// linear first. Alpha is never encoded.
pub fn clear_colour_for(format: wgpu::TextureFormat, colour: wgpu::Color) -> wgpu::Color {
    if !format.is_srgb() {
        return colour;
    }
    wgpu::Color {
        r: srgb_to_linear(colour.r),
        g: srgb_to_linear(colour.g),
        b: srgb_to_linear(colour.b),
        a: colour.a,
    }
}

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Parameters of the window created on startup.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Animation".to_string(),
            width: 640,
            height: 480,
            resizable: false,
        }
    }
}

#[derive(Debug)]
pub struct Pipelines {
    pub sprite: wgpu::RenderPipeline,
}

/// Implemented by everything that keeps a CPU copy of GPU data.
pub trait BufferWriter {
    fn write_to_buffer(&mut self, ctx: &Context);
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub pipelines: Pipelines,
    pub quad: QuadBuffer,
    pub texture_layout: wgpu::BindGroupLayout,
    pub runtime: RuntimeConfig,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // The instance is a handle to our GPU
        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("creating the window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter is compatible with the window surface")?;
        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("requesting a GPU device")?;

        log::info!("Surface");
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = pick_surface_format(&surface_caps.formats)
            .context("the surface reports no supported texture formats")?;
        log::info!("surface format {:?}", surface_format);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let projection = Projection::default();
        let camera = CameraResources::new(&device, &projection);
        let texture_layout = texture_bind_group_layout(&device);
        let pipelines = Pipelines {
            sprite: mk_sprite_pipeline(
                &device,
                &config,
                &texture_layout,
                &camera.bind_group_layout,
            ),
        };
        let quad = QuadBuffer::new(&device);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            pipelines,
            quad,
            texture_layout,
            runtime: RuntimeConfig::default(),
        })
    }

    /// The clear value for the current surface, see [`clear_colour_for`].
    pub fn surface_clear_colour(&self) -> wgpu::Color {
        clear_colour_for(self.config.format, self.runtime.clear_colour)
    }
}

/// The part of the [`Context`] flow constructors need to create GPU resources.
///
/// `wgpu::Device` and `wgpu::Queue` are reference counted, so cloning them
/// only clones the handle.
#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub texture_layout: wgpu::BindGroupLayout,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            texture_layout: ctx.texture_layout.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_a_fixed_640_by_480() {
        let cfg = WindowConfig::default();
        assert_eq!(cfg.title, "Animation");
        assert_eq!((cfg.width, cfg.height), (640, 480));
        assert!(!cfg.resizable);
    }

    #[test]
    fn prefers_a_surface_format_without_srgb_encoding() {
        let formats = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Bgra8Unorm,
        ];
        assert_eq!(
            pick_surface_format(&formats),
            Some(wgpu::TextureFormat::Bgra8Unorm)
        );
        assert_eq!(
            pick_surface_format(&formats[..1]),
            Some(wgpu::TextureFormat::Bgra8UnormSrgb)
        );
        assert_eq!(pick_surface_format(&[]), None);
    }

    #[test]
    fn clear_colour_is_written_unchanged_on_plain_surfaces() {
        let sky = wgpu::Color {
            r: 0.6,
            g: 0.95,
            b: 1.0,
            a: 1.0,
        };
        let clear = clear_colour_for(wgpu::TextureFormat::Bgra8Unorm, sky);
        assert_eq!(clear, sky);
        // 0.6 lands on byte 153, not a paler re-encoded value
        assert_eq!((clear.r * 255.0).round() as u8, 153);
    }

    #[test]
    fn clear_colour_is_decoded_for_srgb_surfaces() {
        let sky = wgpu::Color {
            r: 0.6,
            g: 0.95,
            b: 1.0,
            a: 0.5,
        };
        let clear = clear_colour_for(wgpu::TextureFormat::Rgba8UnormSrgb, sky);
        assert!((clear.r - 0.3185).abs() < 1e-3, "{clear:?}");
        assert!((clear.g - 0.8900).abs() < 1e-3, "{clear:?}");
        assert!((clear.b - 1.0).abs() < 1e-9, "{clear:?}");
        assert_eq!(clear.a, 0.5);
    }

    #[test]
    fn runtime_defaults() {
        let runtime = RuntimeConfig::default();
        assert_eq!(runtime.clear_colour, DEFAULT_CLEAR_COLOUR);
        assert_eq!(runtime.tick_duration_millis, 1000);
    }

    #[test]
    fn window_aspect_matches_projection() {
        let cfg = WindowConfig::default();
        let p = Projection::default();
        let window_aspect = cfg.width as f32 / cfg.height as f32;
        let world_aspect = (p.right - p.left) / (p.top - p.bottom);
        assert!((window_aspect - world_aspect).abs() < 1e-6);
    }
}
