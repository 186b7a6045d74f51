use std::collections::HashMap;

use crate::engine::ecs::component::{InstanceComponent, RenderableComponent, TransformComponent};
use crate::engine::ecs::{ComponentId, World};
use crate::engine::graphics::primitives::{CpuMeshHandle, InstanceHandle};
use crate::engine::graphics::{Instance, RenderAssets, RenderBackend, VisualWorld};

/// Registers renderables in the `VisualWorld`.
///
/// Contract:
/// - A `RenderableComponent` lives under an `InstanceComponent`.
/// - Each `InstanceComponent` maps to exactly one `VisualWorld` instance, created when the
///   renderable's mesh has been uploaded.
/// - The instance transform is the `TransformComponent` directly under the instance, or
///   identity.
#[derive(Debug, Default)]
pub struct RenderableSystem {
    renderables: HashMap<ComponentId, Registered>,

    /// Registered but not yet in `VisualWorld` (mesh not uploaded), in registration order.
    pending: Vec<ComponentId>,

    /// GPU mesh users dropped since the last flush.
    released: Vec<CpuMeshHandle>,
}

#[derive(Debug, Clone, Copy)]
struct Registered {
    instance_cid: ComponentId,
    cpu_mesh: CpuMeshHandle,
    handle: Option<InstanceHandle>,
}

impl RenderableSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.renderables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderables.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// `VisualWorld` instance for a renderable, once uploaded.
    pub fn instance_of(&self, renderable: ComponentId) -> Option<InstanceHandle> {
        self.renderables.get(&renderable).and_then(|r| r.handle)
    }

    pub fn register_renderable(&mut self, world: &World, component: ComponentId) {
        let Some(renderable) = world.get_component_by_id_as::<RenderableComponent>(component) else {
            return;
        };
        let Some(instance_cid) = world.find_ancestor::<InstanceComponent>(component) else {
            tracing::warn!(?component, "renderable has no InstanceComponent ancestor; not drawn");
            return;
        };
        if self.renderables.values().any(|r| r.instance_cid == instance_cid) {
            tracing::warn!(?component, "instance already has a renderable; extra one ignored");
            return;
        }

        self.renderables.insert(
            component,
            Registered {
                instance_cid,
                cpu_mesh: renderable.mesh,
                handle: None,
            },
        );
        self.pending.push(component);
        tracing::trace!(?component, pending = self.pending.len(), "renderable registered");
    }

    pub fn unregister_renderable(
        &mut self,
        world: &mut World,
        visuals: &mut VisualWorld,
        component: ComponentId,
    ) {
        let Some(r) = self.renderables.remove(&component) else {
            return;
        };
        self.pending.retain(|c| *c != component);

        if let Some(handle) = r.handle {
            visuals.remove(handle);
            self.released.push(r.cpu_mesh);
        }
        if let Some(inst) = world.get_component_by_id_as_mut::<InstanceComponent>(r.instance_cid) {
            inst.handle = None;
        }
    }

    /// Upload meshes for pending renderables and insert them into `VisualWorld`, then
    /// return dropped mesh users to `assets`.
    ///
    /// Acquires run first: a mesh handed to a new owner in the same frame stays uploaded.
    pub fn flush_pending(
        &mut self,
        world: &mut World,
        visuals: &mut VisualWorld,
        assets: &mut RenderAssets,
        backend: &mut dyn RenderBackend,
    ) {
        for component in std::mem::take(&mut self.pending) {
            let Some(reg) = self.renderables.get(&component).copied() else {
                continue;
            };
            let Some(renderable) = world
                .get_component_by_id_as::<RenderableComponent>(component)
                .copied()
            else {
                self.renderables.remove(&component);
                continue;
            };

            let transform = world
                .find_child::<TransformComponent>(reg.instance_cid)
                .and_then(|t| world.get_component_by_id_as::<TransformComponent>(t))
                .map(|t| t.transform)
                .unwrap_or_default();

            let mesh = match assets.acquire(backend, reg.cpu_mesh) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(?component, error = %e, "mesh upload failed; renderable dropped");
                    self.renderables.remove(&component);
                    continue;
                }
            };

            let handle = visuals.insert(Instance {
                model: transform.model(),
                mesh,
                material: renderable.material,
                texture: None,
                layer: renderable.layer,
            });
            if let Some(r) = self.renderables.get_mut(&component) {
                r.handle = Some(handle);
            }
            if let Some(inst) = world.get_component_by_id_as_mut::<InstanceComponent>(reg.instance_cid) {
                inst.handle = Some(handle);
            }
        }

        for mesh in self.released.drain(..) {
            assets.release(backend, mesh);
        }
    }

    /// Drop every instance and GPU mesh.
    pub fn release_all(
        &mut self,
        visuals: &mut VisualWorld,
        assets: &mut RenderAssets,
        backend: &mut dyn RenderBackend,
    ) {
        for (_, r) in self.renderables.drain() {
            if let Some(h) = r.handle {
                visuals.remove(h);
            }
        }
        self.pending.clear();
        self.released.clear();
        assets.release_all(backend);
    }
}
