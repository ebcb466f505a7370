//! The animated sun/robot/cone scene.
//!
//! [`AnimationScene`] owns the three sprites and the [`AnimationState`]. Every
//! frame it advances the animation, copies the fresh model matrices into the
//! sprites and uploads them. It draws the sun first, then the robot and the
//! cone on top, over a sky-blue background.

use std::pin::Pin;

use instant::Duration;

use crate::{
    animation::{AnimationConfig, AnimationState},
    context::{BufferWriter, Context, InitContext, RuntimeConfig},
    data_structures::sprite::Sprite,
    flow::{FlowConstructor, GraphicsFlow, Out},
    render::{Render, Textured},
    DeviceEvent, WindowEvent,
};

pub const SUN_TEXTURE: &str = "sun.png";
pub const ROBOT_TEXTURE: &str = "robot.png";
pub const CONE_TEXTURE: &str = "cone.png";

/// Gamma-encoded sky behind the sprites.
pub const SKY_COLOUR: wgpu::Color = wgpu::Color {
    r: 0.6,
    g: 0.95,
    b: 1.0,
    a: 1.0,
};

/// Render ids of the three sprites.
pub const SUN_ID: u32 = 0;
pub const ROBOT_ID: u32 = 1;
pub const CONE_ID: u32 = 2;

/// Frame statistics shared across flows.
#[derive(Debug, Default)]
pub struct SceneState {
    pub frames: u64,
    pub elapsed: Duration,
}

type BoxedScene<E> = Box<dyn GraphicsFlow<SceneState, E>>;

pub struct AnimationScene {
    animation: AnimationState,
    sun: Sprite,
    robot: Sprite,
    cone: Sprite,
}

impl AnimationScene {
    pub async fn new(ctx: &InitContext, config: AnimationConfig) -> anyhow::Result<Self> {
        let sun = Sprite::load(SUN_ID, ctx, SUN_TEXTURE).await?;
        let robot = Sprite::load(ROBOT_ID, ctx, ROBOT_TEXTURE).await?;
        let cone = Sprite::load(CONE_ID, ctx, CONE_TEXTURE).await?;
        Ok(Self {
            animation: AnimationState::new(config),
            sun,
            robot,
            cone,
        })
    }

    pub fn constructor<E: 'static>(config: AnimationConfig) -> FlowConstructor<SceneState, E> {
        Box::new(move |ctx: InitContext| {
            let fut: Pin<Box<dyn Future<Output = anyhow::Result<BoxedScene<E>>>>> =
                Box::pin(async move {
                    let scene = AnimationScene::new(&ctx, config).await?;
                    Ok::<_, anyhow::Error>(Box::new(scene) as BoxedScene<E>)
                });
            fut
        })
    }

    fn sync_sprites(&mut self) {
        self.sun.set_model(self.animation.sun_matrix());
        self.robot.set_model(self.animation.robot_matrix());
        self.cone.set_model(self.animation.cone_matrix());
    }
}

impl<E> GraphicsFlow<SceneState, E> for AnimationScene {
    fn on_init(&mut self, ctx: &mut Context, _: &mut SceneState) -> Out<SceneState, E> {
        // Place the sprites before the first frame is drawn.
        self.animation.advance(0.0);
        self.sync_sprites();
        for sprite in [&mut self.sun, &mut self.robot, &mut self.cone] {
            sprite.write_to_buffer(ctx);
        }
        sky::<E>()
    }

    fn on_update(
        &mut self,
        ctx: &Context,
        state: &mut SceneState,
        dt: Duration,
    ) -> Out<SceneState, E> {
        state.frames += 1;
        state.elapsed += dt;
        self.animation.advance(dt.as_secs_f32());
        self.sync_sprites();
        self.sun.write_to_buffer(ctx);
        self.robot.write_to_buffer(ctx);
        self.cone.write_to_buffer(ctx);
        Out::Empty
    }

    fn on_tick(&mut self, _: &Context, state: &mut SceneState) -> Out<SceneState, E> {
        log::debug!(
            "{} frames in {:.1}s, robot at {:.2}, cone at {:.2}",
            state.frames,
            state.elapsed.as_secs_f32(),
            self.animation.robot_x(),
            self.animation.cone_x()
        );
        Out::Empty
    }

    fn on_device_events(
        &mut self,
        _: &Context,
        _: &mut SceneState,
        _: &DeviceEvent,
    ) -> Out<SceneState, E> {
        Out::Empty
    }

    fn on_window_events(
        &mut self,
        _: &Context,
        _: &mut SceneState,
        _: &WindowEvent,
    ) -> Out<SceneState, E> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut SceneState, event: E) -> Option<E> {
        Some(event)
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        let sprites: Vec<Textured> = [&self.sun, &self.robot, &self.cone]
            .into_iter()
            .map(Textured::from)
            .collect();
        Render::Sprites(sprites)
    }
}

fn sky<E>() -> Out<SceneState, E> {
    Out::Configure(Box::new(|runtime: &mut RuntimeConfig| {
        runtime.clear_colour = SKY_COLOUR;
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{flow::handle_flow_output, resources::texture_bind_group_layout};

    fn init_context() -> InitContext {
        let (device, queue) = wgpu::Device::noop(&wgpu::DeviceDescriptor::default());
        let texture_layout = texture_bind_group_layout(&device);
        InitContext {
            device,
            queue,
            texture_layout,
        }
    }

    #[tokio::test]
    async fn draws_sun_then_robot_then_cone() {
        let ctx = init_context();
        let scene = AnimationScene::new(&ctx, AnimationConfig::default())
            .await
            .unwrap();

        let render = GraphicsFlow::<SceneState, ()>::on_render(&scene);
        let mut sprites = Vec::new();
        let mut custom = Vec::new();
        render.flatten(&mut sprites, &mut custom);

        let ids: Vec<u32> = sprites.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![SUN_ID, ROBOT_ID, CONE_ID]);
        assert!(sprites.iter().all(|s| s.amount == 1));
        assert!(custom.is_empty());
    }

    #[test]
    fn init_paints_the_sky() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut state = SceneState::default();
        let mut runtime = RuntimeConfig::default();
        assert_ne!(runtime.clear_colour, SKY_COLOUR);

        let events = handle_flow_output(&rt, &mut state, &mut runtime, sky::<()>());
        assert!(events.is_empty());
        assert_eq!(runtime.clear_colour, SKY_COLOUR);
        assert_eq!(runtime.tick_duration_millis, 1000);
    }
}
