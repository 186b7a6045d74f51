use crate::engine::ecs::system::{
    DriftSystem, LightSystem, RenderableSystem, TextureLoadMode, TextureSystem, TransformSystem,
};
use crate::engine::ecs::{CommandQueue, ComponentId, World};
use crate::engine::graphics::primitives::Transform;
use crate::engine::graphics::{RenderAssets, RenderBackend, VisualWorld};

/// Holds every system of one stage and routes queued commands to them.
#[derive(Debug, Default)]
pub struct SystemWorld {
    pub renderable: RenderableSystem,
    pub transform: TransformSystem,
    pub texture: TextureSystem,
    pub light: LightSystem,
    pub drift: DriftSystem,
}

impl SystemWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_texture_mode(mode: TextureLoadMode) -> Self {
        Self {
            texture: TextureSystem::new(mode),
            ..Self::default()
        }
    }

    pub fn register_renderable(&mut self, world: &World, component: ComponentId) {
        self.renderable.register_renderable(world, component);
    }

    pub fn unregister_renderable(
        &mut self,
        world: &mut World,
        visuals: &mut VisualWorld,
        component: ComponentId,
    ) {
        self.renderable
            .unregister_renderable(world, visuals, component);
    }

    pub fn transform_changed(&mut self, world: &World, visuals: &mut VisualWorld, component: ComponentId) {
        self.transform.transform_changed(world, visuals, component);
    }

    pub fn update_transform(
        &mut self,
        world: &mut World,
        visuals: &mut VisualWorld,
        component: ComponentId,
        transform: Transform,
    ) {
        self.transform
            .update_transform(world, visuals, component, transform);
    }

    pub fn register_texture(&mut self, world: &World, component: ComponentId) {
        self.texture.register_texture(world, component);
    }

    pub fn unregister_texture(&mut self, component: ComponentId) {
        self.texture.unregister_texture(component);
    }

    pub fn register_light(&mut self, world: &World, visuals: &mut VisualWorld, component: ComponentId) {
        self.light.register_light(world, visuals, component);
    }

    pub fn unregister_light(&mut self, visuals: &mut VisualWorld, component: ComponentId) {
        self.light.unregister_light(visuals, component);
    }

    pub fn register_drift(&mut self, component: ComponentId) {
        self.drift.register_drift(component);
    }

    pub fn unregister_drift(&mut self, component: ComponentId) {
        self.drift.unregister_drift(component);
    }

    /// Per-tick simulation. Results land in `queue`.
    pub fn tick(&mut self, world: &World, queue: &mut CommandQueue, time_scale: f32) {
        self.drift.tick(world, queue, time_scale);
    }

    /// Upload pending meshes and textures so `visuals` is ready to draw.
    pub fn prepare_render(
        &mut self,
        world: &mut World,
        visuals: &mut VisualWorld,
        assets: &mut RenderAssets,
        backend: &mut dyn RenderBackend,
    ) {
        self.renderable
            .flush_pending(world, visuals, assets, backend);
        self.texture
            .flush_pending(visuals, &self.renderable, backend);
    }

    /// Give every GPU resource back to `backend`.
    pub fn release_all(
        &mut self,
        visuals: &mut VisualWorld,
        assets: &mut RenderAssets,
        backend: &mut dyn RenderBackend,
    ) {
        self.renderable.release_all(visuals, assets, backend);
        self.texture.release_all(backend);
    }
}
