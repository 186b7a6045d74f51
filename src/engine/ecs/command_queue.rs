//! Commands queued by components (on init/cleanup) and by systems during a tick.
//! They reach the systems in one batch before the next frame is rendered.

use crate::engine::ecs::system::SystemWorld;
use crate::engine::ecs::{ComponentId, World};
use crate::engine::graphics::VisualWorld;
use crate::engine::graphics::primitives::Transform;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    RegisterRenderable(ComponentId),
    UnregisterRenderable(ComponentId),
    RegisterTransform(ComponentId),
    UpdateTransform(ComponentId, Transform),
    RegisterTexture(ComponentId),
    UnregisterTexture(ComponentId),
    RegisterLight(ComponentId),
    UnregisterLight(ComponentId),
    RegisterDrift(ComponentId),
    UnregisterDrift(ComponentId),
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: Vec<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn queue_register_renderable(&mut self, component: ComponentId) {
        self.commands.push(Command::RegisterRenderable(component));
    }

    pub fn queue_unregister_renderable(&mut self, component: ComponentId) {
        self.commands.push(Command::UnregisterRenderable(component));
    }

    pub fn queue_register_transform(&mut self, component: ComponentId) {
        self.commands.push(Command::RegisterTransform(component));
    }

    pub fn queue_update_transform(&mut self, component: ComponentId, transform: Transform) {
        self.commands
            .push(Command::UpdateTransform(component, transform));
    }

    pub fn queue_register_texture(&mut self, component: ComponentId) {
        self.commands.push(Command::RegisterTexture(component));
    }

    pub fn queue_unregister_texture(&mut self, component: ComponentId) {
        self.commands.push(Command::UnregisterTexture(component));
    }

    pub fn queue_register_light(&mut self, component: ComponentId) {
        self.commands.push(Command::RegisterLight(component));
    }

    pub fn queue_unregister_light(&mut self, component: ComponentId) {
        self.commands.push(Command::UnregisterLight(component));
    }

    pub fn queue_register_drift(&mut self, component: ComponentId) {
        self.commands.push(Command::RegisterDrift(component));
    }

    pub fn queue_unregister_drift(&mut self, component: ComponentId) {
        self.commands.push(Command::UnregisterDrift(component));
    }

    /// Execute every queued command, in order, through the systems.
    pub fn flush(&mut self, world: &mut World, systems: &mut SystemWorld, visuals: &mut VisualWorld) {
        for cmd in std::mem::take(&mut self.commands) {
            match cmd {
                Command::RegisterRenderable(cid) => systems.register_renderable(world, cid),
                Command::UnregisterRenderable(cid) => {
                    systems.unregister_renderable(world, visuals, cid)
                }
                Command::RegisterTransform(cid) => systems.transform_changed(world, visuals, cid),
                Command::UpdateTransform(cid, transform) => {
                    systems.update_transform(world, visuals, cid, transform)
                }
                Command::RegisterTexture(cid) => systems.register_texture(world, cid),
                Command::UnregisterTexture(cid) => systems.unregister_texture(cid),
                Command::RegisterLight(cid) => systems.register_light(world, visuals, cid),
                Command::UnregisterLight(cid) => systems.unregister_light(visuals, cid),
                Command::RegisterDrift(cid) => systems.register_drift(cid),
                Command::UnregisterDrift(cid) => systems.unregister_drift(cid),
            }
        }
    }
}
