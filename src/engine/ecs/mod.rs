pub mod command_queue;
pub mod component;
pub mod entity;
pub mod system;

#[cfg(test)]
mod world_graph_tests;

use slotmap::SlotMap;

pub use command_queue::CommandQueue;
pub use component::{Component, ComponentNode};
pub use entity::Entity;

slotmap::new_key_type! {
    /// World-wide component identity.
    pub struct ComponentId;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("component {0:?} not found")]
    NotFound(ComponentId),

    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle {
        parent: ComponentId,
        child: ComponentId,
    },

    #[error("component {0:?} still has children")]
    HasChildren(ComponentId),
}

/// Component-centric scene graph: one flat store of components, each carrying its
/// parent/children links.
#[derive(Default)]
pub struct World {
    components: SlotMap<ComponentId, ComponentNode>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn contains(&self, cid: ComponentId) -> bool {
        self.components.contains_key(cid)
    }

    /// Insert a detached component. `init` is not run; see [`World::spawn`].
    pub fn add_component(&mut self, c: impl Component) -> ComponentId {
        self.add_component_boxed(Box::new(c))
    }

    pub fn add_component_boxed(&mut self, c: Box<dyn Component>) -> ComponentId {
        self.components.insert(ComponentNode::new(c))
    }

    pub fn get_component_node(&self, cid: ComponentId) -> Option<&ComponentNode> {
        self.components.get(cid)
    }

    pub fn get_component_by_id_as<T: 'static>(&self, cid: ComponentId) -> Option<&T> {
        self.components
            .get(cid)
            .and_then(|n| n.component.as_any().downcast_ref::<T>())
    }

    pub fn get_component_by_id_as_mut<T: 'static>(&mut self, cid: ComponentId) -> Option<&mut T> {
        self.components
            .get_mut(cid)
            .and_then(|n| n.component.as_any_mut().downcast_mut::<T>())
    }

    pub fn parent_of(&self, cid: ComponentId) -> Option<ComponentId> {
        self.components.get(cid).and_then(|n| n.parent)
    }

    pub fn children_of(&self, cid: ComponentId) -> &[ComponentId] {
        self.components
            .get(cid)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// All component ids of type `T`.
    pub fn all_components<T: 'static>(&self) -> Vec<ComponentId> {
        self.components
            .iter()
            .filter(|(_, n)| n.component.as_any().is::<T>())
            .map(|(cid, _)| cid)
            .collect()
    }

    /// Nearest strict ancestor of `cid` holding a `T`.
    pub fn find_ancestor<T: 'static>(&self, cid: ComponentId) -> Option<ComponentId> {
        let mut cur = self.parent_of(cid);
        while let Some(p) = cur {
            if self.get_component_by_id_as::<T>(p).is_some() {
                return Some(p);
            }
            cur = self.parent_of(p);
        }
        None
    }

    /// First direct child of `cid` holding a `T`.
    pub fn find_child<T: 'static>(&self, cid: ComponentId) -> Option<ComponentId> {
        self.children_of(cid)
            .iter()
            .copied()
            .find(|&c| self.get_component_by_id_as::<T>(c).is_some())
    }

    fn is_ancestor_or_self(&self, ancestor: ComponentId, cid: ComponentId) -> bool {
        let mut cur = Some(cid);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.parent_of(c);
        }
        false
    }

    /// Attach `child` under `parent`, detaching it from any previous parent.
    pub fn add_child(&mut self, parent: ComponentId, child: ComponentId) -> Result<(), WorldError> {
        self.set_parent(child, Some(parent))
    }

    pub fn set_parent(
        &mut self,
        child: ComponentId,
        parent: Option<ComponentId>,
    ) -> Result<(), WorldError> {
        if !self.contains(child) {
            return Err(WorldError::NotFound(child));
        }
        if let Some(p) = parent {
            if !self.contains(p) {
                return Err(WorldError::NotFound(p));
            }
            if self.is_ancestor_or_self(child, p) {
                return Err(WorldError::Cycle { parent: p, child });
            }
        }

        if let Some(old) = self.parent_of(child) {
            if let Some(n) = self.components.get_mut(old) {
                n.children.retain(|&c| c != child);
            }
        }
        if let Some(p) = parent {
            if let Some(n) = self.components.get_mut(p) {
                n.children.push(child);
            }
        }
        if let Some(n) = self.components.get_mut(child) {
            n.parent = parent;
        }
        Ok(())
    }

    /// `cid` and all descendants, parents before children.
    pub fn subtree(&self, cid: ComponentId) -> Vec<ComponentId> {
        let mut order = Vec::new();
        if !self.contains(cid) {
            return order;
        }
        let mut stack = vec![cid];
        while let Some(id) = stack.pop() {
            order.push(id);
            for &ch in self.children_of(id).iter().rev() {
                stack.push(ch);
            }
        }
        order
    }

    pub fn remove_component_leaf(&mut self, cid: ComponentId) -> Result<ComponentNode, WorldError> {
        let node = self.components.get(cid).ok_or(WorldError::NotFound(cid))?;
        if !node.children.is_empty() {
            return Err(WorldError::HasChildren(cid));
        }
        self.set_parent(cid, None)?;
        self.components.remove(cid).ok_or(WorldError::NotFound(cid))
    }

    /// Remove `cid` and every descendant. Returns the removed nodes, root first.
    pub fn remove_component_subtree(
        &mut self,
        cid: ComponentId,
    ) -> Result<Vec<ComponentNode>, WorldError> {
        if !self.contains(cid) {
            return Err(WorldError::NotFound(cid));
        }
        self.set_parent(cid, None)?;
        Ok(self
            .subtree(cid)
            .into_iter()
            .filter_map(|id| self.components.remove(id))
            .collect())
    }

    /// Insert an entity tree and run `init` on every component, root to leaves.
    pub fn spawn(&mut self, entity: Entity, queue: &mut CommandQueue) -> ComponentId {
        let root = entity.insert_into(self);
        for cid in self.subtree(root) {
            if let Some(n) = self.components.get_mut(cid) {
                n.component.init(queue, cid);
            }
        }
        tracing::trace!(?root, "spawned entity");
        root
    }

    /// Run `cleanup` on a subtree, leaves first. Nodes stay in the world so systems can
    /// still read them while the queue is flushed.
    pub fn cleanup_subtree(&mut self, root: ComponentId, queue: &mut CommandQueue) {
        for cid in self.subtree(root).into_iter().rev() {
            if let Some(n) = self.components.get_mut(cid) {
                n.component.cleanup(queue, cid);
            }
        }
    }
}
