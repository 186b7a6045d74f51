use crate::engine::ecs::component::{InstanceComponent, TransformComponent};
use crate::engine::ecs::{ComponentId, World};
use crate::engine::graphics::VisualWorld;
use crate::engine::graphics::primitives::Transform;

/// Syncs `TransformComponent` values into `VisualWorld`.
///
/// - A transform belongs to the nearest `InstanceComponent` ancestor.
/// - The instance owns the `InstanceHandle`; until the renderable is uploaded there is
///   nothing to update and the renderable picks the transform up on insertion.
#[derive(Debug, Default)]
pub struct TransformSystem {
    updates: u64,
}

impl TransformSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform_changed(
        &mut self,
        world: &World,
        visuals: &mut VisualWorld,
        component: ComponentId,
    ) {
        let Some(transform) = world.get_component_by_id_as::<TransformComponent>(component) else {
            return;
        };
        let Some(handle) = world
            .find_ancestor::<InstanceComponent>(component)
            .and_then(|i| world.get_component_by_id_as::<InstanceComponent>(i))
            .and_then(InstanceComponent::get_handle)
        else {
            return;
        };

        if visuals.update_model(handle, transform.transform.model()) {
            self.updates += 1;
        }
    }

    /// Overwrite the component, then sync it.
    pub fn update_transform(
        &mut self,
        world: &mut World,
        visuals: &mut VisualWorld,
        component: ComponentId,
        transform: Transform,
    ) {
        let Some(tc) = world.get_component_by_id_as_mut::<TransformComponent>(component) else {
            tracing::debug!(?component, "update for missing transform ignored");
            return;
        };
        tc.transform = transform;
        self.transform_changed(world, visuals, component);
    }

    /// Number of instance models written so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }
}
