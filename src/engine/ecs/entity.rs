use crate::engine::ecs::component::{Component, InstanceComponent};
use crate::engine::ecs::{ComponentId, World};

struct Part {
    component: Box<dyn Component>,
    children: Vec<Part>,
}

/// Builder for a component tree rooted at an `InstanceComponent`.
///
/// Nothing touches the world until [`World::spawn`] inserts the tree.
pub struct Entity {
    root: Box<dyn Component>,
    parts: Vec<Part>,
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl Entity {
    pub fn new() -> Self {
        Self::with_root(InstanceComponent::new())
    }

    /// Entity rooted at something other than an instance (lights, for example).
    pub fn with_root(root: impl Component) -> Self {
        Self {
            root: Box::new(root),
            parts: Vec::new(),
        }
    }

    /// Attach `c` directly under the root.
    pub fn with_component(mut self, c: impl Component) -> Self {
        self.parts.push(Part {
            component: Box::new(c),
            children: Vec::new(),
        });
        self
    }

    /// Attach `c` under the root with `child` nested beneath it.
    pub fn with_nested(mut self, c: impl Component, child: impl Component) -> Self {
        self.parts.push(Part {
            component: Box::new(c),
            children: vec![Part {
                component: Box::new(child),
                children: Vec::new(),
            }],
        });
        self
    }

    pub(crate) fn insert_into(self, world: &mut World) -> ComponentId {
        let root = world.add_component_boxed(self.root);
        let mut stack: Vec<(ComponentId, Part)> =
            self.parts.into_iter().rev().map(|p| (root, p)).collect();

        while let Some((parent, part)) = stack.pop() {
            let cid = world.add_component_boxed(part.component);
            if let Err(e) = world.add_child(parent, cid) {
                tracing::error!(error = %e, "failed to link entity part");
            }
            stack.extend(part.children.into_iter().rev().map(|p| (cid, p)));
        }
        root
    }
}
