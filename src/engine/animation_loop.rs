//! Frame scheduling and the per-activation animation loop.
//!
//! `FrameScheduler` hands out one-shot frame requests (request/cancel, like a display
//! refresh callback queue). `AnimationLoop` keeps exactly one request pending while it
//! runs and re-arms itself at the top of every accepted frame.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use winit::window::Window;

/// How per-tick motion quantities relate to wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MotionMode {
    /// Every accepted frame applies one full step. Speed follows the refresh rate.
    PerFrame,
    /// Each frame applies `elapsed_seconds * reference_hz` steps.
    Timed { reference_hz: f32 },
}

impl Default for MotionMode {
    fn default() -> Self {
        MotionMode::PerFrame
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(u64);

/// One-shot frame request queue.
///
/// With a window attached every request also asks winit for a redraw; the host then
/// drains due requests on `RedrawRequested`.
#[derive(Default)]
pub struct FrameScheduler {
    next: u64,
    pending: Vec<FrameRequest>,
    window: Option<Arc<Window>>,
}

impl FrameScheduler {
    pub fn headless() -> Self {
        Self::default()
    }

    pub fn for_window(window: Arc<Window>) -> Self {
        Self {
            window: Some(window),
            ..Self::default()
        }
    }

    pub fn request_frame(&mut self) -> FrameRequest {
        self.next += 1;
        let req = FrameRequest(self.next);
        self.pending.push(req);
        if let Some(w) = &self.window {
            w.request_redraw();
        }
        req
    }

    pub fn cancel_frame(&mut self, req: FrameRequest) {
        self.pending.retain(|r| *r != req);
    }

    /// Take every request that is due now. Requests made while handling these
    /// belong to the next frame.
    pub fn take_due(&mut self) -> Vec<FrameRequest> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Data for one accepted frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// 1-based tick number within this loop.
    pub index: u64,
    pub dt_sec: f32,
    /// Multiplier for per-tick motion (1.0 in `PerFrame` mode).
    pub time_scale: f32,
}

#[derive(Debug)]
pub struct AnimationLoop {
    state: LoopState,
    pending: Option<FrameRequest>,
    ticks: u64,
    last_frame: Option<Instant>,
    motion: MotionMode,
}

impl AnimationLoop {
    pub fn new(motion: MotionMode) -> Self {
        Self {
            state: LoopState::Stopped,
            pending: None,
            ticks: 0,
            last_frame: None,
            motion,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn start(&mut self, scheduler: &mut FrameScheduler) {
        if self.state == LoopState::Running {
            return;
        }
        self.state = LoopState::Running;
        self.last_frame = None;
        self.pending = Some(scheduler.request_frame());
    }

    /// Cancel the pending request. No further frames are accepted.
    pub fn stop(&mut self, scheduler: &mut FrameScheduler) {
        if let Some(req) = self.pending.take() {
            scheduler.cancel_frame(req);
        }
        self.state = LoopState::Stopped;
    }

    /// Accept `req` if it is the one this loop is waiting on.
    ///
    /// Schedules the next frame before returning, so the loop keeps running even if
    /// the caller's tick body fails.
    pub fn accept(
        &mut self,
        req: FrameRequest,
        scheduler: &mut FrameScheduler,
        now: Instant,
    ) -> Option<FrameTick> {
        if self.state != LoopState::Running || self.pending != Some(req) {
            return None;
        }

        self.pending = Some(scheduler.request_frame());
        self.ticks += 1;

        let dt_sec = self
            .last_frame
            .replace(now)
            .map(|prev| now.saturating_duration_since(prev).as_secs_f32())
            .unwrap_or(0.0);

        let time_scale = match self.motion {
            MotionMode::PerFrame => 1.0,
            // First frame has no interval yet; count it as one nominal step.
            MotionMode::Timed { .. } if self.ticks == 1 => 1.0,
            MotionMode::Timed { reference_hz } => dt_sec * reference_hz,
        };

        Some(FrameTick {
            index: self.ticks,
            dt_sec,
            time_scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pump(lp: &mut AnimationLoop, s: &mut FrameScheduler, now: Instant) -> Vec<FrameTick> {
        s.take_due()
            .into_iter()
            .filter_map(|r| lp.accept(r, s, now))
            .collect()
    }

    #[test]
    fn running_loop_keeps_one_request_pending() {
        let mut s = FrameScheduler::headless();
        let mut lp = AnimationLoop::new(MotionMode::PerFrame);
        lp.start(&mut s);
        assert_eq!(s.pending_len(), 1);

        let now = Instant::now();
        for _ in 0..5 {
            assert_eq!(pump(&mut lp, &mut s, now).len(), 1);
            assert_eq!(s.pending_len(), 1);
        }
        assert_eq!(lp.ticks(), 5);
    }

    #[test]
    fn stop_cancels_and_no_tick_fires_afterwards() {
        let mut s = FrameScheduler::headless();
        let mut lp = AnimationLoop::new(MotionMode::PerFrame);
        lp.start(&mut s);
        pump(&mut lp, &mut s, Instant::now());

        lp.stop(&mut s);
        assert_eq!(lp.state(), LoopState::Stopped);
        assert_eq!(s.pending_len(), 0);

        for _ in 0..3 {
            assert!(pump(&mut lp, &mut s, Instant::now()).is_empty());
        }
        assert_eq!(lp.ticks(), 1);
    }

    #[test]
    fn stale_request_is_ignored() {
        let mut s = FrameScheduler::headless();
        let mut lp = AnimationLoop::new(MotionMode::PerFrame);
        lp.start(&mut s);
        let first = s.take_due()[0];

        assert!(lp.accept(first, &mut s, Instant::now()).is_some());
        // Same request again: no longer the pending one.
        assert!(lp.accept(first, &mut s, Instant::now()).is_none());
    }

    #[test]
    fn timed_mode_scales_by_elapsed_time() {
        let mut s = FrameScheduler::headless();
        let mut lp = AnimationLoop::new(MotionMode::Timed { reference_hz: 60.0 });
        lp.start(&mut s);

        let t0 = Instant::now();
        let first = pump(&mut lp, &mut s, t0);
        assert_eq!(first[0].time_scale, 1.0);

        let second = pump(&mut lp, &mut s, t0 + Duration::from_millis(50));
        assert!((second[0].time_scale - 3.0).abs() < 1e-3);
        assert!((second[0].dt_sec - 0.05).abs() < 1e-4);
    }

    #[test]
    fn per_frame_mode_ignores_elapsed_time() {
        let mut s = FrameScheduler::headless();
        let mut lp = AnimationLoop::new(MotionMode::PerFrame);
        lp.start(&mut s);
        let t0 = Instant::now();
        pump(&mut lp, &mut s, t0);
        let t = pump(&mut lp, &mut s, t0 + Duration::from_millis(500));
        assert_eq!(t[0].time_scale, 1.0);
    }
}
