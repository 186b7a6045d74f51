use crate::engine::ecs::component::Component;
use crate::engine::ecs::{CommandQueue, ComponentId};
use crate::engine::graphics::primitives::{CpuMeshHandle, Material, RenderLayer};

/// Mesh + material drawn at the transform of the nearest `InstanceComponent` ancestor.
#[derive(Debug, Clone, Copy)]
pub struct RenderableComponent {
    pub mesh: CpuMeshHandle,
    pub material: Material,
    pub layer: RenderLayer,
}

impl RenderableComponent {
    pub fn new(mesh: CpuMeshHandle, material: Material, layer: RenderLayer) -> Self {
        Self {
            mesh,
            material,
            layer,
        }
    }
}

impl Component for RenderableComponent {
    fn name(&self) -> &'static str {
        "renderable"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn init(&mut self, queue: &mut CommandQueue, component: ComponentId) {
        queue.queue_register_renderable(component);
    }

    fn cleanup(&mut self, queue: &mut CommandQueue, component: ComponentId) {
        queue.queue_unregister_renderable(component);
    }
}
