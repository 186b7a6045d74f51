use crate::engine::ecs::component::Component;
use crate::engine::ecs::{CommandQueue, ComponentId};

/// Reset rule applied after each drift step: once `position[axis] > max`, it is set to
/// `reset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wrap {
    pub axis: usize,
    pub max: f32,
    pub reset: f32,
}

/// Constant per-tick motion of the sibling `TransformComponent`.
///
/// Values are fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftComponent {
    /// Added to position every tick.
    pub velocity: [f32; 3],
    /// Added to the Euler rotation every tick (radians).
    pub spin: [f32; 3],
    pub wrap: Option<Wrap>,
}

impl DriftComponent {
    pub fn new(velocity: [f32; 3]) -> Self {
        Self {
            velocity,
            spin: [0.0; 3],
            wrap: None,
        }
    }

    pub fn with_spin(mut self, spin: [f32; 3]) -> Self {
        self.spin = spin;
        self
    }

    pub fn with_wrap(mut self, axis: usize, max: f32, reset: f32) -> Self {
        self.wrap = Some(Wrap { axis, max, reset });
        self
    }
}

impl Component for DriftComponent {
    fn name(&self) -> &'static str {
        "drift"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn init(&mut self, queue: &mut CommandQueue, component: ComponentId) {
        queue.queue_register_drift(component);
    }

    fn cleanup(&mut self, queue: &mut CommandQueue, component: ComponentId) {
        queue.queue_unregister_drift(component);
    }
}
