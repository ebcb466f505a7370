//! Render composition and draw ordering.
//!
//! This module defines the [`Render`] enum, which flows use to describe what
//! they want drawn this frame. The engine flattens the renders of all flows
//! into one ordered list of [`Textured`] draws and submits them with the
//! sprite pipeline. There is no depth buffer: the order of the list is the
//! order on screen, back to front.
//!
//! # Key types
//!
//! - [`Render<'a, 'pass>`] is the primary enum describing render operations
//! - [`Textured<'a>`] contains data for one instanced, textured quad draw
//!

use wgpu::RenderPass;

use crate::context::Context;

/// Data for one textured draw: a texture bind group, an instance buffer and
/// the number of instances in it.
#[derive(Clone, Copy)]
pub struct Textured<'a> {
    pub instance: &'a wgpu::Buffer,
    pub group: &'a wgpu::BindGroup,
    pub amount: usize,
    pub id: u32,
}

/// A closure drawing straight into the render pass.
pub type CustomDraw<'a, 'pass> = Box<dyn 'a + FnOnce(&Context, &mut wgpu::RenderPass<'pass>)>;

/// Specifies how a flow should be rendered.
///
/// # Variants
///
/// - `None` renders nothing
/// - `Sprite(Textured)` renders a single textured quad batch
/// - `Sprites(Vec<Textured>)` renders several batches in order
/// - `Composed(Vec<Render>)` recursively renders composition of multiple renders
/// - `Custom(...)` invokes a user-defined closure on the render pass
///
pub enum Render<'a, 'pass>
where
    'pass: 'a,
{
    None,
    Sprite(Textured<'a>),
    Sprites(Vec<Textured<'a>>),
    Composed(Vec<Render<'a, 'pass>>),
    Custom(CustomDraw<'a, 'pass>),
}

impl<'a, 'pass> Render<'a, 'pass> {
    /// Append all textured draws to `sprites` and all custom closures to
    /// `custom`, each in the order they appear.
    pub(crate) fn flatten(
        self,
        sprites: &mut Vec<Textured<'a>>,
        custom: &mut Vec<CustomDraw<'a, 'pass>>,
    ) {
        match self {
            Render::Sprite(textured) => sprites.push(textured),
            Render::Sprites(mut vec) => sprites.append(&mut vec),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.flatten(sprites, custom)),
            Render::Custom(f) => custom.push(f),
            Render::None => (),
        }
    }

    /// Append all textured draws to `sprites` in order.
    ///
    /// Custom closures are run right away, so they draw underneath every
    /// batched sprite of this frame.
    pub(crate) fn collect(
        self,
        ctx: &Context,
        render_pass: &mut RenderPass<'pass>,
        sprites: &mut Vec<Textured<'a>>,
    ) {
        let mut custom = Vec::new();
        self.flatten(sprites, &mut custom);
        custom.into_iter().for_each(|f| f(ctx, render_pass));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Handles {
        buffer: wgpu::Buffer,
        group: wgpu::BindGroup,
    }

    fn handles() -> Handles {
        let (device, _queue) = wgpu::Device::noop(&wgpu::DeviceDescriptor::default());
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size: 64,
            usage: wgpu::BufferUsages::VERTEX,
            mapped_at_creation: false,
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: None,
            entries: &[],
        });
        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &layout,
            entries: &[],
        });
        Handles { buffer, group }
    }

    fn textured(handles: &Handles, id: u32) -> Textured<'_> {
        Textured {
            instance: &handles.buffer,
            group: &handles.group,
            amount: 1,
            id,
        }
    }

    #[test]
    fn composed_renders_flatten_in_order() {
        let h = handles();
        let render = Render::Composed(vec![
            Render::Sprites(vec![textured(&h, 0), textured(&h, 1)]),
            Render::None,
            Render::Sprite(textured(&h, 2)),
        ]);
        let mut sprites = Vec::new();
        let mut custom = Vec::new();
        render.flatten(&mut sprites, &mut custom);

        let ids: Vec<u32> = sprites.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(custom.is_empty());
    }

    #[test]
    fn custom_draws_do_not_reorder_sprites() {
        let h = handles();
        let render = Render::Composed(vec![
            Render::Sprite(textured(&h, 7)),
            Render::Custom(Box::new(|_, _| {})),
            Render::Composed(vec![Render::Sprite(textured(&h, 3)), Render::None]),
        ]);
        let mut sprites = Vec::new();
        let mut custom = Vec::new();
        render.flatten(&mut sprites, &mut custom);

        let ids: Vec<u32> = sprites.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![7, 3]);
        assert_eq!(custom.len(), 1);
    }
}
