use crate::engine::ecs::component::Component;
use crate::engine::ecs::{CommandQueue, ComponentId};
use crate::engine::graphics::primitives::{AmbientLight, DirectionalLight, rgb_hex};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightComponent {
    Ambient(AmbientLight),
    Directional(DirectionalLight),
}

impl LightComponent {
    pub fn ambient(hex: u32, intensity: f32) -> Self {
        Self::Ambient(AmbientLight {
            color: rgb_hex(hex),
            intensity,
        })
    }

    /// Directional light placed at `position`, shining towards the origin.
    pub fn directional(hex: u32, intensity: f32, position: [f32; 3]) -> Self {
        let dir = glam::Vec3::from(position).normalize_or(glam::Vec3::Y);
        Self::Directional(DirectionalLight {
            color: rgb_hex(hex),
            intensity,
            direction: dir.to_array(),
        })
    }
}

impl Component for LightComponent {
    fn name(&self) -> &'static str {
        "light"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn init(&mut self, queue: &mut CommandQueue, component: ComponentId) {
        queue.queue_register_light(component);
    }

    fn cleanup(&mut self, queue: &mut CommandQueue, component: ComponentId) {
        queue.queue_unregister_light(component);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directional_points_from_origin_to_light() {
        let LightComponent::Directional(d) = LightComponent::directional(0xffffff, 1.0, [10.0, 10.0, 10.0])
        else {
            panic!("expected directional light");
        };
        let inv = 1.0 / 3f32.sqrt();
        for c in d.direction {
            assert!((c - inv).abs() < 1e-6);
        }
    }
}
