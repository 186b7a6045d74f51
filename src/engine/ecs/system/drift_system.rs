use crate::engine::ecs::component::{DriftComponent, TransformComponent};
use crate::engine::ecs::{CommandQueue, ComponentId, World};

/// Moves decorative objects by their per-tick drift and applies wrap rules.
///
/// A `DriftComponent` drives the `TransformComponent` that shares its parent.
#[derive(Debug, Default)]
pub struct DriftSystem {
    drifting: Vec<ComponentId>,
}

impl DriftSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_drift(&mut self, component: ComponentId) {
        if !self.drifting.contains(&component) {
            self.drifting.push(component);
        }
    }

    pub fn unregister_drift(&mut self, component: ComponentId) {
        self.drifting.retain(|c| *c != component);
    }

    pub fn len(&self) -> usize {
        self.drifting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drifting.is_empty()
    }

    /// Advance every drifting transform by `time_scale` ticks' worth of motion.
    pub fn tick(&mut self, world: &World, queue: &mut CommandQueue, time_scale: f32) {
        for &cid in &self.drifting {
            let Some(drift) = world.get_component_by_id_as::<DriftComponent>(cid) else {
                continue;
            };
            let Some(tcid) = world
                .parent_of(cid)
                .and_then(|p| world.find_child::<TransformComponent>(p))
            else {
                continue;
            };
            let Some(tc) = world.get_component_by_id_as::<TransformComponent>(tcid) else {
                continue;
            };

            let mut t = tc.transform;
            for i in 0..3 {
                t.position[i] += drift.velocity[i] * time_scale;
                t.rotation[i] += drift.spin[i] * time_scale;
            }
            if let Some(w) = drift.wrap {
                if t.position[w.axis] > w.max {
                    t.position[w.axis] = w.reset;
                }
            }
            queue.queue_update_transform(tcid, t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ecs::Entity;
    use crate::engine::ecs::system::SystemWorld;
    use crate::engine::graphics::VisualWorld;
    use crate::engine::graphics::primitives::Transform;

    fn spawn_cloud(world: &mut World, queue: &mut CommandQueue, x: f32) -> ComponentId {
        let root = world.spawn(
            Entity::new()
                .with_component(TransformComponent::new(Transform::from_position(x, 0.0, 0.0)))
                .with_component(
                    DriftComponent::new([0.5, 0.0, 0.0])
                        .with_spin([0.0, 0.0, 0.1])
                        .with_wrap(0, 1.0, -1.0),
                ),
            queue,
        );
        world.find_child::<TransformComponent>(root).unwrap()
    }

    #[test]
    fn drift_accumulates_then_wraps_by_assignment() {
        let mut world = World::new();
        let mut queue = CommandQueue::new();
        let mut systems = SystemWorld::new();
        let mut visuals = VisualWorld::new();

        let t = spawn_cloud(&mut world, &mut queue, 0.0);
        queue.flush(&mut world, &mut systems, &mut visuals);
        assert_eq!(systems.drift.len(), 1);

        let mut xs = Vec::new();
        for _ in 0..4 {
            systems.tick(&world, &mut queue, 1.0);
            queue.flush(&mut world, &mut systems, &mut visuals);
            xs.push(world.get_component_by_id_as::<TransformComponent>(t).unwrap().transform.position[0]);
        }
        // 0.5, 1.0 (not > 1), 1.5 -> -1.0, -0.5
        assert_eq!(xs, vec![0.5, 1.0, -1.0, -0.5]);

        let rz = world.get_component_by_id_as::<TransformComponent>(t).unwrap().transform.rotation[2];
        assert!((rz - 0.4).abs() < 1e-6);
    }

    #[test]
    fn time_scale_multiplies_motion() {
        let mut world = World::new();
        let mut queue = CommandQueue::new();
        let mut systems = SystemWorld::new();
        let mut visuals = VisualWorld::new();

        let t = spawn_cloud(&mut world, &mut queue, -1.0);
        queue.flush(&mut world, &mut systems, &mut visuals);

        systems.tick(&world, &mut queue, 1.5);
        queue.flush(&mut world, &mut systems, &mut visuals);
        let x = world.get_component_by_id_as::<TransformComponent>(t).unwrap().transform.position[0];
        assert!((x - -0.25).abs() < 1e-6);
    }
}
