//! Flow control and application event loop.
//!
//! This module provides the main event loop and the flow abstraction. A "flow"
//! represents a scene that handles input, updates its animation and provides
//! renderable sprites each frame. The engine drives any number of flows and
//! composes their renders in order.
//!
//! # User-facing types
//!
//! - [`GraphicsFlow<S, E>`] is the trait for scenes that handle events and rendering
//! - [`Out<S, E>`] is the output type for async event handling and context configuration
//!
//! # Lifecycle Flow
//!
//! The event loop follows this pattern each frame:
//! 1. Collect window/device events and hand them to `on_<device/window/custom>_event`
//! 2. Quit on a close request
//! 3. Update flow state (via `on_update` / `on_tick`)
//! 4. Call flows' `on_render()` to collect sprites
//! 5. Clear, draw all sprites back to front and present the frame

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    context::{Context, InitContext, RuntimeConfig, WindowConfig},
    render::{Render, Textured},
};

///
/// This is the Output Type for every lifecycle hook where the user can pass async events that are
/// handled by the engine.
///
/// `Out::FutEvent` can be used to resolve a future of an Event that is put in the Event Queue after
/// being resolved. The caller is responsible for handling the event later on and it will have no
/// side effects unless handled.
///
/// `Out::FutFn` can be used to directly modify the state and the mutation is handled internally
/// with no further action required by the callee.
///
/// `Out::Configure` can be used to modify the [`RuntimeConfig`] of the Context during runtime for
/// instance to change the tick speed or the clear colour.
///
/// `Empty` is the default output used when no eventing/futures need to be handled.
///
pub enum Out<S, E> {
    FutEvent(Vec<Box<dyn Future<Output = E>>>),
    FutFn(Vec<Box<dyn Future<Output = Box<dyn FnOnce(&mut S)>>>>),
    Configure(Box<dyn FnOnce(&mut RuntimeConfig)>),
    Empty,
}

impl<S, E> Default for Out<S, E> {
    fn default() -> Self {
        Self::Empty
    }
}

/// Trait for implementing a renderable scene.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once when the flow is created; configure context (clear color, etc.)
/// 2. `on_window_events()` and `on_device_events()` are called for each winit input event
/// 3. `on_update()` is called every frame
/// 4. `on_tick()` is called every `tick_duration_millis`
/// 5. `on_custom_events()` is called for custom application events
/// 6. `on_render()` is called each frame and specifies how to render `self`
///
pub trait GraphicsFlow<S, E> {
    /// Initialize the flow and configure the context.
    fn on_init(&mut self, ctx: &mut Context, state: &mut S) -> Out<S, E>;

    /// Update state every frame.
    ///
    /// Called every frame with the elapsed time `dt`. Use for animations and
    /// other per-frame logic.
    fn on_update(&mut self, ctx: &Context, state: &mut S, dt: Duration) -> Out<S, E>;

    /// Update state periodically.
    ///
    /// Called every `tick_duration_millis` milliseconds (see [`RuntimeConfig`]).
    fn on_tick(&mut self, ctx: &Context, state: &mut S) -> Out<S, E>;

    /// Handle raw device events (keyboard, mouse hardware input).
    fn on_device_events(&mut self, ctx: &Context, state: &mut S, event: &DeviceEvent) -> Out<S, E>;

    /// Handle window events (keyboard, mouse, window resizing, etc.).
    fn on_window_events(&mut self, ctx: &Context, state: &mut S, event: &WindowEvent) -> Out<S, E>;

    /// Handle custom application events.
    ///
    /// Returns the event if it was not consumed, allowing it to be passed to
    /// the next flow. Returning `None` means the event was consumed.
    fn on_custom_events(&mut self, ctx: &Context, state: &mut S, event: E) -> Option<E>;

    /// Return renderable objects for this flow.
    ///
    /// Called each frame. Flows are drawn in the order they were passed to
    /// [`run`], and within a flow in the order of the returned [`Render`].
    fn on_render<'pass>(&self) -> Render<'_, 'pass>;
}

impl<State, Event> Debug for dyn GraphicsFlow<State, Event> + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Type alias for a flow constructor (factory function).
///
/// A flow constructor takes an `InitContext` and asynchronously returns a
/// boxed `GraphicsFlow`. Loading assets may fail, in which case the error is
/// reported by [`run`] and the window closes.
pub type FlowConstructor<S, E> = Box<
    dyn FnOnce(
        InitContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Box<dyn GraphicsFlow<S, E>>>>>>,
>;

/// Application state bundle: GPU context, app state, and surface status.
#[derive(Debug)]
pub struct AppState<State: 'static> {
    pub(crate) ctx: Context,
    state: State,
    is_surface_configured: bool,
}

impl<State: Default> AppState<State> {
    async fn new(window: Arc<Window>) -> Self {
        let ctx = match Context::new(window).await {
            Ok(ctx) => ctx,
            Err(e) => panic!(
                "App initialization failed. Cannot create the main context: {:#}",
                e
            ),
        };
        Self {
            ctx,
            state: State::default(),
            is_surface_configured: false,
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.config.width = width;
            self.ctx.config.height = height;
            self.is_surface_configured = true;
            self.ctx
                .surface
                .configure(&self.ctx.device, &self.ctx.config);
        }
    }

    fn render<Event>(
        &mut self,
        graphics_flows: &[Box<dyn GraphicsFlow<State, Event>>],
    ) -> Result<(), FrameError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let mut suboptimal = false;
        let output = match self.ctx.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(texture) => texture,
            wgpu::CurrentSurfaceTexture::Suboptimal(texture) => {
                suboptimal = true;
                texture
            }
            wgpu::CurrentSurfaceTexture::Timeout | wgpu::CurrentSurfaceTexture::Occluded => {
                return Err(FrameError::Skipped);
            }
            wgpu::CurrentSurfaceTexture::Outdated | wgpu::CurrentSurfaceTexture::Lost => {
                return Err(FrameError::Reconfigure);
            }
            wgpu::CurrentSurfaceTexture::Validation => return Err(FrameError::Validation),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder: wgpu::CommandEncoder =
            self.ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });
        {
            let mut render_pass: wgpu::RenderPass<'_> =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.ctx.surface_clear_colour()),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                    multiview_mask: None,
                });

            let mut sprites: Vec<Textured> = Vec::new();
            graphics_flows.iter().for_each(|flow| {
                flow.on_render()
                    .collect(&self.ctx, &mut render_pass, &mut sprites);
            });

            render_pass.set_pipeline(&self.ctx.pipelines.sprite);
            render_pass.set_bind_group(1, &self.ctx.camera.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.ctx.quad.vertex.slice(..));
            for sprite in sprites {
                if sprite.amount == 0 || sprite.instance.size() == 0 {
                    log::warn!("you attempted to render sprite {} with zero instances", sprite.id);
                    continue;
                }
                render_pass.set_bind_group(0, sprite.group, &[]);
                render_pass.set_vertex_buffer(1, sprite.instance.slice(..));
                render_pass.draw(0..self.ctx.quad.vertex_count, 0..sprite.amount as u32);
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        if suboptimal {
            return Err(FrameError::Reconfigure);
        }
        Ok(())
    }
}

/// Why the last frame was not (or not optimally) drawn.
#[derive(Debug, PartialEq)]
enum FrameError {
    /// The surface no longer matches the window, configure it again.
    Reconfigure,
    /// Timed out or occluded, try again next frame.
    Skipped,
    Validation,
}

pub struct App<State: 'static, Event: 'static> {
    async_runtime: tokio::runtime::Runtime,
    proxy: winit::event_loop::EventLoopProxy<FlowEvent<Event>>,
    window_config: WindowConfig,
    state: Option<AppState<State>>,
    // This will hold the fully initialized flows once they are ready.
    graphics_flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
    // This holds the constructors at the start.
    // We use Option to `take()` it after use.
    constructors: Option<Vec<FlowConstructor<State, Event>>>,
    startup_error: Option<anyhow::Error>,
    last_time: Instant,
    time_since_tick: Duration,
}

impl<State, Event> App<State, Event>
where
    State: 'static,
    Event: 'static,
{
    fn new(
        event_loop: &EventLoop<FlowEvent<Event>>,
        window_config: WindowConfig,
        constructors: Vec<FlowConstructor<State, Event>>,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            async_runtime,
            proxy,
            window_config,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            startup_error: None,
            last_time: Instant::now(),
            time_since_tick: Duration::from_millis(0),
        })
    }
}

/// Events sent through the winit proxy back into the loop.
pub(crate) enum FlowEvent<Event: 'static> {
    Custom(Event),
}

impl<Event> Debug for FlowEvent<Event> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Custom(_) => f.write_str("Custom(E)"),
        }
    }
}

impl<State: 'static + Default, Event: 'static> ApplicationHandler<FlowEvent<Event>>
    for App<State, Event>
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // Only the first resume creates the window and the flows.
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        let window_attributes = Window::default_attributes()
            .with_title(self.window_config.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.window_config.width,
                self.window_config.height,
            ))
            .with_resizable(self.window_config.resizable);

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.startup_error = Some(anyhow::Error::new(e).context("creating the window"));
                event_loop.exit();
                return;
            }
        };

        let init_future = async move {
            let app_state = AppState::<State>::new(window).await;

            let flow_futures: Vec<_> = constructors
                .into_iter()
                // into() only clones the reference counted Device and Queue handles
                .map(|constructor| constructor((&app_state.ctx).into()))
                .collect();
            let flows: Vec<_> = futures::future::join_all(flow_futures).await;
            (app_state, flows)
        };

        let (mut app_state, flows) = self.async_runtime.block_on(init_future);
        let flows: anyhow::Result<Vec<_>> = flows.into_iter().collect();
        match flows {
            Ok(flows) => self.graphics_flows = flows,
            Err(e) => {
                log::error!("Failed to initialize flows: {:#}", e);
                self.startup_error = Some(e);
                event_loop.exit();
                return;
            }
        }

        let size = app_state.ctx.window.inner_size();
        app_state.resize(size.width, size.height);
        self.graphics_flows.iter_mut().for_each(|flow| {
            let out = flow.on_init(&mut app_state.ctx, &mut app_state.state);
            let events = handle_flow_output(
                &self.async_runtime,
                &mut app_state.state,
                &mut app_state.ctx.runtime,
                out,
            );
            send_events(&self.proxy, events);
        });
        log::info!("{} flow(s) initialized", self.graphics_flows.len());
        self.last_time = Instant::now();
        app_state.ctx.window.request_redraw();
        self.state = Some(app_state);
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: FlowEvent<Event>) {
        match event {
            FlowEvent::Custom(custom_event) => {
                if let Some(state) = &mut self.state {
                    let result = self
                        .graphics_flows
                        .iter_mut()
                        .fold(Some(custom_event), |event, flow| {
                            flow.on_custom_events(&state.ctx, &mut state.state, event?)
                        });
                    if result.is_some() {
                        log::warn!("Warning! Custom event was not consumed this cycle");
                    }
                }
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };
        self.graphics_flows.iter_mut().for_each(|f| {
            let out = f.on_device_events(&state.ctx, &mut state.state, &event);
            let events = handle_flow_output(
                &self.async_runtime,
                &mut state.state,
                &mut state.ctx.runtime,
                out,
            );
            send_events(&self.proxy, events);
        });
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        self.graphics_flows.iter_mut().for_each(|f| {
            let out = f.on_window_events(&state.ctx, &mut state.state, &event);
            let events = handle_flow_output(
                &self.async_runtime,
                &mut state.state,
                &mut state.ctx.runtime,
                out,
            );
            send_events(&self.proxy, events);
        });

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                log::info!("Quit requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                self.time_since_tick += dt;

                let tick = Duration::from_millis(state.ctx.runtime.tick_duration_millis);
                if self.time_since_tick >= tick {
                    self.graphics_flows.iter_mut().for_each(|f| {
                        let out = f.on_tick(&state.ctx, &mut state.state);
                        let events = handle_flow_output(
                            &self.async_runtime,
                            &mut state.state,
                            &mut state.ctx.runtime,
                            out,
                        );
                        send_events(&self.proxy, events);
                    });
                    self.time_since_tick = Duration::from_millis(0);
                }
                self.graphics_flows.iter_mut().for_each(|f| {
                    let out = f.on_update(&state.ctx, &mut state.state, dt);
                    let events = handle_flow_output(
                        &self.async_runtime,
                        &mut state.state,
                        &mut state.ctx.runtime,
                        out,
                    );
                    send_events(&self.proxy, events);
                });
                // The camera never moves but flows may swap the projection.
                state
                    .ctx
                    .camera
                    .write_to_buffer(&state.ctx.queue, &state.ctx.projection);

                match state.render(&self.graphics_flows) {
                    Ok(_) | Err(FrameError::Skipped) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(FrameError::Reconfigure) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {:?}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Resolve the output of a lifecycle hook.
///
/// State mutations and configuration are applied right away. Resolved events
/// are returned in order so the caller can put them into the event queue.
pub(crate) fn handle_flow_output<State, Event>(
    async_runtime: &tokio::runtime::Runtime,
    state: &mut State,
    runtime: &mut RuntimeConfig,
    out: Out<State, Event>,
) -> Vec<Event> {
    match out {
        Out::FutEvent(pending) => {
            let fut =
                async move { futures::future::join_all(pending.into_iter().map(Pin::from)).await };
            async_runtime.block_on(fut)
        }
        // Resolve the futures and apply the mutations right away
        Out::FutFn(pending) => {
            let mutations: Vec<Pin<Box<dyn Future<Output = Box<dyn FnOnce(&mut State)>>>>> =
                pending.into_iter().map(Pin::from).collect();
            let fut = async move { futures::future::join_all(mutations.into_iter()).await };
            let resolved: Vec<Box<dyn FnOnce(&mut State)>> = async_runtime.block_on(fut);
            resolved.into_iter().for_each(|mutation| {
                mutation(state);
            });
            Vec::new()
        }
        Out::Configure(f) => {
            f(runtime);
            Vec::new()
        }
        Out::Empty => Vec::new(),
    }
}

// Send the events passed by the user to winit
fn send_events<Event>(
    proxy: &winit::event_loop::EventLoopProxy<FlowEvent<Event>>,
    events: Vec<Event>,
) {
    events.into_iter().for_each(|event| {
        if let Err(err) = proxy.send_event(FlowEvent::Custom(event)) {
            log::error!("Event loop was closed before all events could be processed: {}", err);
        }
    });
}

/// Open a window with the default [`WindowConfig`] and run `constructors`
/// until the window is closed.
pub fn run<State: 'static + Default, Event: 'static>(
    constructors: Vec<FlowConstructor<State, Event>>,
) -> anyhow::Result<()> {
    run_with(WindowConfig::default(), constructors)
}

pub fn run_with<State: 'static + Default, Event: 'static>(
    window_config: WindowConfig,
    constructors: Vec<FlowConstructor<State, Event>>,
) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop: EventLoop<FlowEvent<Event>> = EventLoop::with_user_event().build()?;

    let mut app: App<State, Event> = App::new(&event_loop, window_config, constructors)?;

    event_loop.run_app(&mut app)?;

    match app.startup_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Served(String);

    #[derive(Debug, PartialEq)]
    enum Event {
        Ping(u8),
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Runtime::new().unwrap()
    }

    #[test]
    fn state_mutations_are_applied_in_order() {
        let rt = runtime();
        let mut state = Served::default();
        let mut config = RuntimeConfig::default();
        let sencha: Box<dyn FnOnce(&mut Served)> = Box::new(|s: &mut Served| s.0.push('s'));
        let mate: Box<dyn FnOnce(&mut Served)> = Box::new(|s: &mut Served| s.0.push('m'));
        let out: Out<Served, Event> = Out::FutFn(vec![
            Box::new(async move { sencha }),
            Box::new(async move { mate }),
        ]);

        let events = handle_flow_output(&rt, &mut state, &mut config, out);
        assert!(events.is_empty());
        assert_eq!(state.0, "sm");
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn future_events_resolve_in_order() {
        let rt = runtime();
        let mut state = Served::default();
        let mut config = RuntimeConfig::default();
        let out: Out<Served, Event> = Out::FutEvent(vec![
            Box::new(async { Event::Ping(1) }),
            Box::new(async { Event::Ping(2) }),
        ]);

        let events = handle_flow_output(&rt, &mut state, &mut config, out);
        assert_eq!(events, vec![Event::Ping(1), Event::Ping(2)]);
        assert!(state.0.is_empty());
    }

    #[test]
    fn configure_changes_runtime_settings() {
        let rt = runtime();
        let mut state = Served::default();
        let mut config = RuntimeConfig::default();
        let out: Out<Served, Event> = Out::Configure(Box::new(|config: &mut RuntimeConfig| {
            config.clear_colour = wgpu::Color::WHITE;
            config.tick_duration_millis = 250;
        }));

        let events = handle_flow_output(&rt, &mut state, &mut config, out);
        assert!(events.is_empty());
        assert_eq!(config.clear_colour, wgpu::Color::WHITE);
        assert_eq!(config.tick_duration_millis, 250);
    }

    #[test]
    fn empty_output_changes_nothing() {
        let rt = runtime();
        let mut state = Served::default();
        let mut config = RuntimeConfig::default();
        let events = handle_flow_output(&rt, &mut state, &mut config, Out::<Served, Event>::Empty);
        assert!(events.is_empty());
        assert_eq!(config, RuntimeConfig::default());
    }
}
