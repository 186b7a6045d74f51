//! Viewers: a `Viewer` owns at most one live `Session` (stage + animation loop + resize
//! listener) and rebuilds it when its content changes.

mod host;
mod mountain;
mod panorama;

pub use host::ViewerHost;
pub use mountain::MountainViewer;
pub use panorama::{PanoramaViewer, SceneIndex};

use std::any::Any;
use std::time::Instant;

use crate::engine::EngineResult;
use crate::engine::animation_loop::{AnimationLoop, FrameRequest, FrameScheduler, LoopState, MotionMode};
use crate::engine::controls::OrbitInput;
use crate::engine::events::{ListenerKey, ResizeListeners};
use crate::engine::graphics::BackendFactory;
use crate::engine::mount::Mount;
use crate::engine::stage::{Stage, StageDesc};

/// Host resources a viewer borrows while it (de)activates.
pub struct ViewerContext<'a> {
    pub mount: &'a mut dyn Mount,
    pub scheduler: &'a mut FrameScheduler,
    pub listeners: &'a mut ResizeListeners,
    pub backends: &'a mut dyn BackendFactory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    Next,
    Previous,
    Select(usize),
}

pub trait Viewer: Any {
    fn name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    /// Build and start a session on `ctx.mount`. Activating twice is a no-op.
    fn activate(&mut self, ctx: &mut ViewerContext<'_>) -> EngineResult<()>;

    /// Stop and dispose the live session, if any.
    fn deactivate(&mut self, ctx: &mut ViewerContext<'_>);

    fn session(&self) -> Option<&Session>;

    fn session_mut(&mut self) -> Option<&mut Session>;

    fn command(&mut self, cmd: ViewerCommand, _ctx: &mut ViewerContext<'_>) -> EngineResult<()> {
        tracing::debug!(viewer = self.name(), ?cmd, "command ignored");
        Ok(())
    }

    /// Reopen a session lost to a failed rebuild. No-op while a session is live.
    fn recover(&mut self, _ctx: &mut ViewerContext<'_>) -> EngineResult<()> {
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.session().is_some()
    }
}

/// One activation of a viewer.
pub struct Session {
    stage: Stage,
    animation: AnimationLoop,
    resize_listener: ListenerKey,
}

impl Session {
    /// Bootstrap a stage, subscribe to resizes and request the first frame.
    pub fn open(ctx: &mut ViewerContext<'_>, desc: StageDesc, motion: MotionMode) -> EngineResult<Self> {
        let name = desc.name;
        let stage = Stage::bootstrap(&mut *ctx.mount, desc, &mut *ctx.backends)?;
        let resize_listener = ctx.listeners.subscribe(name);

        let mut animation = AnimationLoop::new(motion);
        animation.start(ctx.scheduler);

        Ok(Self {
            stage,
            animation,
            resize_listener,
        })
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    pub fn loop_state(&self) -> LoopState {
        self.animation.state()
    }

    pub fn ticks(&self) -> u64 {
        self.animation.ticks()
    }

    pub fn listens_to(&self, key: ListenerKey) -> bool {
        self.resize_listener == key
    }

    /// Run one tick if `req` is the frame this session is waiting for.
    pub fn frame(
        &mut self,
        req: FrameRequest,
        scheduler: &mut FrameScheduler,
        now: Instant,
        input: OrbitInput,
    ) -> bool {
        match self.animation.accept(req, scheduler, now) {
            Some(tick) => {
                self.stage.tick(input, tick.time_scale);
                true
            }
            None => false,
        }
    }

    /// Cancel the pending frame, drop the resize listener, then dispose the stage.
    pub fn close(mut self, ctx: &mut ViewerContext<'_>) {
        self.animation.stop(ctx.scheduler);
        if !ctx.listeners.unsubscribe(self.resize_listener) {
            tracing::warn!(stage = self.stage.name(), "resize listener was already gone");
        }
        self.stage.dispose(&mut *ctx.mount);
    }
}
