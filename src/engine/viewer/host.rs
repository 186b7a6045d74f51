use std::time::Instant;

use winit::event::WindowEvent;

use crate::engine::EngineResult;
use crate::engine::animation_loop::FrameScheduler;
use crate::engine::controls::OrbitInput;
use crate::engine::events::ResizeListeners;
use crate::engine::graphics::BackendFactory;
use crate::engine::mount::Mount;
use crate::engine::user_input::{InputState, UserInput};
use crate::engine::viewer::{Viewer, ViewerCommand, ViewerContext};

/// Owns everything that outlives a viewer activation and routes host events to the
/// mounted viewer.
pub struct ViewerHost<M: Mount> {
    mount: M,
    scheduler: FrameScheduler,
    listeners: ResizeListeners,
    backends: Box<dyn BackendFactory>,
    input: UserInput,
    viewer: Option<Box<dyn Viewer>>,
}

impl<M: Mount> ViewerHost<M> {
    pub fn new(mount: M, scheduler: FrameScheduler, backends: Box<dyn BackendFactory>) -> Self {
        Self {
            mount,
            scheduler,
            listeners: ResizeListeners::new(),
            backends,
            input: UserInput::new(),
            viewer: None,
        }
    }

    pub fn mount(&self) -> &M {
        &self.mount
    }

    pub fn mount_mut(&mut self) -> &mut M {
        &mut self.mount
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn listeners(&self) -> &ResizeListeners {
        &self.listeners
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        self.input.state_mut()
    }

    pub fn viewer(&self) -> Option<&dyn Viewer> {
        self.viewer.as_deref()
    }

    pub fn viewer_as<T: Viewer>(&self) -> Option<&T> {
        self.viewer.as_deref()?.as_any().downcast_ref::<T>()
    }

    /// Activate `viewer` on the mount, replacing whatever was mounted before.
    ///
    /// On failure nothing stays mounted.
    pub fn mount_viewer(&mut self, mut viewer: Box<dyn Viewer>) -> EngineResult<()> {
        self.unmount();

        let mut ctx = ViewerContext {
            mount: &mut self.mount,
            scheduler: &mut self.scheduler,
            listeners: &mut self.listeners,
            backends: self.backends.as_mut(),
        };
        if let Err(e) = viewer.activate(&mut ctx) {
            viewer.deactivate(&mut ctx);
            return Err(e);
        }
        tracing::info!(viewer = viewer.name(), "viewer mounted");
        self.viewer = Some(viewer);
        Ok(())
    }

    pub fn unmount(&mut self) {
        let Some(mut viewer) = self.viewer.take() else {
            return;
        };
        let mut ctx = ViewerContext {
            mount: &mut self.mount,
            scheduler: &mut self.scheduler,
            listeners: &mut self.listeners,
            backends: self.backends.as_mut(),
        };
        viewer.deactivate(&mut ctx);
        tracing::info!(viewer = viewer.name(), "viewer unmounted");
    }

    /// Deliver a size change to every resize listener. A mounted viewer without a
    /// session gets a chance to reopen one at the new size.
    pub fn resize(&mut self) {
        for key in self.listeners.keys() {
            let Some(session) = self.viewer.as_mut().and_then(|v| v.session_mut()) else {
                continue;
            };
            if session.listens_to(key) {
                session.stage_mut().resize(&self.mount);
            }
        }

        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        if viewer.is_active() {
            return;
        }
        let mut ctx = ViewerContext {
            mount: &mut self.mount,
            scheduler: &mut self.scheduler,
            listeners: &mut self.listeners,
            backends: self.backends.as_mut(),
        };
        match viewer.recover(&mut ctx) {
            Ok(()) if viewer.is_active() => tracing::info!(viewer = viewer.name(), "viewer recovered"),
            Ok(()) => {}
            Err(e) => tracing::debug!(viewer = viewer.name(), reason = %e, "viewer still inactive"),
        }
    }

    /// Run every due frame request. Returns how many ticks ran.
    pub fn redraw(&mut self, now: Instant) -> usize {
        let input = OrbitInput::from_state(self.input.state());
        let mut ran = 0;

        for req in self.scheduler.take_due() {
            let Some(session) = self.viewer.as_mut().and_then(|v| v.session_mut()) else {
                continue;
            };
            if session.frame(req, &mut self.scheduler, now, input) {
                ran += 1;
            }
        }

        self.input.begin_frame();
        ran
    }

    /// Forward `cmd` to the mounted viewer. On error the viewer stays mounted and a
    /// later command or resize can bring its session back.
    pub fn command(&mut self, cmd: ViewerCommand) -> EngineResult<()> {
        let Some(viewer) = self.viewer.as_mut() else {
            return Ok(());
        };
        let mut ctx = ViewerContext {
            mount: &mut self.mount,
            scheduler: &mut self.scheduler,
            listeners: &mut self.listeners,
            backends: self.backends.as_mut(),
        };
        viewer.command(cmd, &mut ctx)
    }

    /// Feed a window event to the input tracker. Returns `true` if it was input.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        self.input.handle_window_event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use crate::engine::animation_loop::{LoopState, MotionMode};
    use crate::engine::config::MountainConfig;
    use crate::engine::ecs::system::TextureLoadMode;
    use crate::engine::graphics::HeadlessBackendFactory;
    use crate::engine::mount::{HeadlessMount, Viewport};
    use crate::engine::viewer::MountainViewer;

    fn mountain() -> Box<MountainViewer> {
        Box::new(MountainViewer::new(
            &MountainConfig::default(),
            MotionMode::PerFrame,
            TextureLoadMode::Inline,
            1,
        ))
    }

    fn host(w: u32, h: u32) -> ViewerHost<HeadlessMount> {
        ViewerHost::new(
            HeadlessMount::new(w, h),
            FrameScheduler::headless(),
            Box::new(HeadlessBackendFactory::new()),
        )
    }

    #[test]
    fn zero_sized_mount_fails_and_mounts_nothing() {
        let mut host = host(0, 0);
        let err = host.mount_viewer(mountain()).unwrap_err();
        assert!(matches!(err, EngineError::DegenerateViewport { .. }));
        assert!(host.viewer().is_none());
        assert!(host.listeners().is_empty());
        assert_eq!(host.scheduler().pending_len(), 0);
    }

    #[test]
    fn no_tick_fires_after_unmount() {
        let mut host = host(640, 480);
        host.mount_viewer(mountain()).unwrap();
        assert_eq!(host.redraw(Instant::now()), 1);
        assert_eq!(host.redraw(Instant::now()), 1);
        assert_eq!(
            host.viewer().and_then(|v| v.session()).map(|s| s.loop_state()),
            Some(LoopState::Running)
        );

        host.unmount();
        assert!(host.mount().surfaces().is_empty());
        assert!(host.listeners().is_empty());
        assert_eq!(host.scheduler().pending_len(), 0);
        for _ in 0..5 {
            assert_eq!(host.redraw(Instant::now()), 0);
        }
    }

    #[test]
    fn resize_updates_camera_aspect_and_renderer_size() {
        let mut host = host(640, 480);
        host.mount_viewer(mountain()).unwrap();

        host.mount_mut().set_size(1000, 250);
        host.resize();

        let stage = host.viewer().and_then(|v| v.session()).unwrap().stage();
        assert_eq!(stage.camera().aspect, 4.0);
        assert_eq!(stage.renderer().size(), Viewport::new(1000, 250).unwrap());
    }

    #[test]
    fn mounting_again_replaces_the_previous_viewer() {
        let mut host = host(640, 480);
        host.mount_viewer(mountain()).unwrap();
        host.mount_viewer(mountain()).unwrap();

        assert_eq!(host.mount().surfaces().len(), 1);
        assert_eq!(host.listeners().len(), 1);
        assert_eq!(host.scheduler().pending_len(), 1);
    }
}
