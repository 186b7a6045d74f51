use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::engine::animation_loop::FrameScheduler;
use crate::engine::cli::ViewerKind;
use crate::engine::config::Config;
use crate::engine::ecs::system::TextureLoadMode;
use crate::engine::graphics::{HeadlessBackendFactory, VulkanoBackendFactory};
use crate::engine::mount::{HeadlessMount, WindowMount};
use crate::engine::viewer::{MountainViewer, PanoramaViewer, Viewer, ViewerCommand, ViewerHost};
use crate::engine::{EngineError, EngineResult};

/// What a key press asks the front end to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Exit,
    Command(ViewerCommand),
}

fn key_action(key: Key<&str>) -> Option<KeyAction> {
    match key {
        Key::Named(NamedKey::Escape) => Some(KeyAction::Exit),
        Key::Named(NamedKey::ArrowLeft) | Key::Character("p" | "P") => {
            Some(KeyAction::Command(ViewerCommand::Previous))
        }
        Key::Named(NamedKey::ArrowRight) | Key::Character("n" | "N") => {
            Some(KeyAction::Command(ViewerCommand::Next))
        }
        _ => None,
    }
}

/// Build the viewer `kind` from `config`.
pub fn build_viewer(
    config: &Config,
    kind: &ViewerKind,
    seed: u64,
    textures: TextureLoadMode,
) -> EngineResult<Box<dyn Viewer>> {
    Ok(match kind {
        ViewerKind::Panorama { .. } => Box::new(PanoramaViewer::new(
            &config.panorama,
            config.motion,
            textures,
            seed,
        )?),
        ViewerKind::Mountain => Box::new(MountainViewer::new(
            &config.mountain,
            config.motion,
            textures,
            seed,
        )),
    })
}

/// Outcome of a window-less run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessReport {
    pub ticks: usize,
    pub frames_rendered: u64,
    pub live_meshes: usize,
    pub live_textures: usize,
}

/// winit front end (ApplicationHandler style).
pub struct Windowing;

impl Windowing {
    /// Open a window, mount the viewer and run until closed.
    pub fn run(config: Config, kind: ViewerKind, seed: u64) -> EngineResult<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Wait);

        let mut app = App {
            config,
            kind,
            seed,
            window: None,
            host: None,
            error: None,
        };
        event_loop.run_app(&mut app)?;

        match app.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Mount the viewer on a headless mount, run `frames` redraws at a nominal 60 Hz,
    /// then unmount.
    pub fn run_headless(
        config: &Config,
        kind: &ViewerKind,
        seed: u64,
        frames: u64,
    ) -> EngineResult<HeadlessReport> {
        let backends = HeadlessBackendFactory::new();
        let ledger = backends.ledger();
        let mut host = ViewerHost::new(
            HeadlessMount::new(config.window.width, config.window.height),
            FrameScheduler::headless(),
            Box::new(backends),
        );
        host.mount_viewer(build_viewer(config, kind, seed, TextureLoadMode::Inline)?)?;

        let start = Instant::now();
        let mut ticks = 0;
        for i in 0..frames {
            ticks += host.redraw(start + Duration::from_secs_f64(i as f64 / 60.0));
        }
        host.unmount();

        let l = ledger.borrow();
        let report = HeadlessReport {
            ticks,
            frames_rendered: l.frames,
            live_meshes: l.live_meshes.len(),
            live_textures: l.live_textures.len(),
        };
        tracing::info!(?report, "headless run finished");
        Ok(report)
    }
}

struct App {
    config: Config,
    kind: ViewerKind,
    seed: u64,
    window: Option<Arc<Window>>,
    host: Option<ViewerHost<WindowMount>>,
    error: Option<EngineError>,
}

impl App {
    fn fail(&mut self, event_loop: &ActiveEventLoop, e: EngineError) {
        tracing::error!(error = %e, "shutting down");
        if let Some(host) = self.host.as_mut() {
            host.unmount();
        }
        self.error = Some(e);
        event_loop.exit();
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> EngineResult<()> {
        let attrs: WindowAttributes = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(LogicalSize::new(
                self.config.window.width as f64,
                self.config.window.height as f64,
            ));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .map_err(|e| EngineError::Backend(Box::new(e)))?,
        );

        let mut host = ViewerHost::new(
            WindowMount::new(window.clone()),
            FrameScheduler::for_window(window.clone()),
            Box::new(VulkanoBackendFactory::new()),
        );
        let viewer = build_viewer(&self.config, &self.kind, self.seed, self.config.textures)?;
        host.mount_viewer(viewer)?;

        self.window = Some(window);
        self.host = Some(host);
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(host) = self.host.as_mut() else {
            return;
        };

        match &event {
            WindowEvent::CloseRequested => {
                host.unmount();
                event_loop.exit();
            }

            WindowEvent::Resized(_) => {
                host.resize();
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(w) = &self.window {
                    w.pre_present_notify();
                }
                host.redraw(Instant::now());
            }

            WindowEvent::KeyboardInput { event: key, .. } if key.state == ElementState::Pressed => {
                match key_action(key.logical_key.as_ref()) {
                    Some(KeyAction::Exit) => {
                        host.unmount();
                        event_loop.exit();
                    }
                    Some(KeyAction::Command(cmd)) if !key.repeat => {
                        if let Err(e) = host.command(cmd) {
                            tracing::warn!(?cmd, error = %e, "scene change failed");
                        }
                    }
                    _ => {
                        host.handle_window_event(&event);
                    }
                }
            }

            _ => {
                host.handle_window_event(&event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_and_letter_keys_map_to_scene_commands() {
        assert_eq!(
            key_action(Key::Named(NamedKey::ArrowRight)),
            Some(KeyAction::Command(ViewerCommand::Next))
        );
        assert_eq!(
            key_action(Key::Character("p")),
            Some(KeyAction::Command(ViewerCommand::Previous))
        );
        assert_eq!(key_action(Key::Named(NamedKey::Escape)), Some(KeyAction::Exit));
        assert_eq!(key_action(Key::Character("x")), None);
    }

    #[test]
    fn headless_panorama_run_leaves_nothing_behind() {
        let config = Config::default();
        let kind = ViewerKind::Panorama { scene: None };
        let report = Windowing::run_headless(&config, &kind, 3, 12).unwrap();

        assert_eq!(report.ticks, 12);
        assert_eq!(report.frames_rendered, 12);
        assert_eq!(report.live_meshes, 0);
        assert_eq!(report.live_textures, 0);
    }

    #[test]
    fn headless_mountain_run_under_timed_motion() {
        let mut config = Config::default();
        config.motion = crate::engine::animation_loop::MotionMode::Timed { reference_hz: 60.0 };
        let report = Windowing::run_headless(&config, &ViewerKind::Mountain, 3, 5).unwrap();
        assert_eq!(report.ticks, 5);
        assert_eq!(report.live_meshes, 0);
    }
}
