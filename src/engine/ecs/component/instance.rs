use super::Component;

use crate::engine::graphics::primitives::InstanceHandle;

/// Root of a drawable entity. Holds the `VisualWorld` instance once its renderable child
/// has been uploaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceComponent {
    pub handle: Option<InstanceHandle>,
}

impl InstanceComponent {
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Returns None until the renderable under this instance is on the GPU.
    pub fn get_handle(&self) -> Option<InstanceHandle> {
        self.handle
    }
}

impl Component for InstanceComponent {
    fn name(&self) -> &'static str {
        "instance"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
