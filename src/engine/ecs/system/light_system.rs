use crate::engine::ecs::component::LightComponent;
use crate::engine::ecs::{ComponentId, World};
use crate::engine::graphics::VisualWorld;

/// Gathers light components into `VisualWorld`'s light lists.
#[derive(Debug, Default)]
pub struct LightSystem {
    lights: Vec<(ComponentId, LightComponent)>,
}

impl LightSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_light(&mut self, world: &World, visuals: &mut VisualWorld, component: ComponentId) {
        let Some(light) = world.get_component_by_id_as::<LightComponent>(component) else {
            return;
        };
        match self.lights.iter_mut().find(|(c, _)| *c == component) {
            Some(entry) => entry.1 = *light,
            None => self.lights.push((component, *light)),
        }
        self.sync(visuals);
    }

    pub fn unregister_light(&mut self, visuals: &mut VisualWorld, component: ComponentId) {
        self.lights.retain(|(c, _)| *c != component);
        self.sync(visuals);
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    fn sync(&self, visuals: &mut VisualWorld) {
        let mut ambient = Vec::new();
        let mut directional = Vec::new();
        for (_, l) in &self.lights {
            match l {
                LightComponent::Ambient(a) => ambient.push(*a),
                LightComponent::Directional(d) => directional.push(*d),
            }
        }
        visuals.set_lights(ambient, directional);
    }
}
