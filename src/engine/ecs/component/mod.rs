pub mod drift;
pub mod instance;
pub mod light;
pub mod renderable;
pub mod texture;
pub mod transform;

pub use drift::{DriftComponent, Wrap};
pub use instance::InstanceComponent;
pub use light::LightComponent;
pub use renderable::RenderableComponent;
pub use texture::{TextureComponent, TextureFormat};
pub use transform::TransformComponent;

use crate::engine::ecs::{CommandQueue, ComponentId};

/// World-owned record for a component payload plus its topology.
pub struct ComponentNode {
    pub name: &'static str,
    pub component: Box<dyn Component>,
    pub parent: Option<ComponentId>,
    pub children: Vec<ComponentId>,
}

impl ComponentNode {
    pub fn new(component: Box<dyn Component>) -> Self {
        Self {
            name: component.name(),
            component,
            parent: None,
            children: Vec::new(),
        }
    }
}

impl std::fmt::Debug for ComponentNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentNode")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children.len())
            .finish()
    }
}

/// Component interface.
///
/// Components never talk to systems directly; they queue commands that are flushed
/// before the next render.
pub trait Component: std::any::Any {
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;

    /// Short debug/type name for this component kind (e.g. "transform").
    fn name(&self) -> &'static str;

    /// Called once the component is part of the world.
    fn init(&mut self, _queue: &mut CommandQueue, _component: ComponentId) {}

    /// Called before the component is removed from the world.
    fn cleanup(&mut self, _queue: &mut CommandQueue, _component: ComponentId) {}
}
