//! A textured unit quad with its own model matrix.

use cgmath::Matrix4;
use wgpu::util::DeviceExt;

use crate::{
    context::{BufferWriter, Context, InitContext},
    data_structures::{instance::InstanceRaw, texture::Texture},
    render::{Render, Textured},
    resources::load_texture,
};

/**
 * A `Sprite` draws the shared quad once with its texture and model matrix.
 *
 * The model matrix is kept on the CPU; call [`BufferWriter::write_to_buffer`]
 * after [`Sprite::set_model`] to make the change visible on the next frame.
 */
#[derive(Debug)]
pub struct Sprite {
    pub id: u32,
    pub texture: Texture,
    bind_group: wgpu::BindGroup,
    model: Matrix4<f32>,
    pub instance_buffer: wgpu::Buffer,
}

impl Sprite {
    pub fn new(id: u32, ctx: &InitContext, texture: Texture, label: &str) -> Self {
        let bind_group = texture.bind_group(&ctx.device, &ctx.texture_layout, label);
        let raw = InstanceRaw::default();
        let instance_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&[raw]),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
        Self {
            id,
            texture,
            bind_group,
            model: raw.model(),
            instance_buffer,
        }
    }

    /// Load `file_name` from the assets directory and wrap it in a sprite.
    pub async fn load(id: u32, ctx: &InitContext, file_name: &str) -> anyhow::Result<Self> {
        let texture = load_texture(file_name, &ctx.device, &ctx.queue).await?;
        log::info!(
            "loaded sprite {} from {} ({}x{})",
            id,
            file_name,
            texture.size.0,
            texture.size.1
        );
        Ok(Self::new(id, ctx, texture, file_name))
    }

    pub fn set_model(&mut self, model: Matrix4<f32>) {
        self.model = model;
    }
}

impl BufferWriter for Sprite {
    fn write_to_buffer(&mut self, ctx: &Context) {
        let raw = InstanceRaw::from(self.model);
        ctx.queue
            .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&[raw]));
    }
}

impl<'a> From<&'a Sprite> for Textured<'a> {
    fn from(sprite: &'a Sprite) -> Self {
        Textured {
            instance: &sprite.instance_buffer,
            group: &sprite.bind_group,
            amount: 1,
            id: sprite.id,
        }
    }
}

impl<'a, 'pass> From<&'a Sprite> for Render<'a, 'pass> {
    fn from(sprite: &'a Sprite) -> Self {
        Render::Sprite(sprite.into())
    }
}
