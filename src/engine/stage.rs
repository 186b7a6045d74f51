//! One viewer activation's scene: component world, systems, draw cache, camera,
//! controls and the renderer bound to the mount.

use glam::Vec3;

use crate::engine::camera::PerspectiveCamera;
use crate::engine::controls::{OrbitControls, OrbitInput};
use crate::engine::ecs::component::{LightComponent, TransformComponent};
use crate::engine::ecs::system::{SystemWorld, TextureLoadMode};
use crate::engine::ecs::{CommandQueue, ComponentId, Entity, World, WorldError};
use crate::engine::graphics::primitives::{CpuMeshHandle, Fog, Transform};
use crate::engine::graphics::{BackendFactory, CpuMesh, RenderAssets, Renderer, VisualWorld};
use crate::engine::mount::{Mount, Viewport};
use crate::engine::EngineResult;

/// Fixed parameters of a stage.
#[derive(Debug, Clone)]
pub struct StageDesc {
    pub name: &'static str,
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub camera_position: Vec3,
    /// `None` keeps the surface transparent.
    pub clear_color: Option<[f32; 3]>,
    pub fog: Option<Fog>,
    pub lights: Vec<LightComponent>,
    pub controls: OrbitControls,
    pub textures: TextureLoadMode,
}

pub struct Stage {
    name: &'static str,
    world: World,
    systems: SystemWorld,
    visuals: VisualWorld,
    assets: RenderAssets,
    queue: CommandQueue,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    renderer: Renderer,
    primary: Option<ComponentId>,
    decorations: Vec<ComponentId>,
    ticks: u64,
}

impl Stage {
    /// Measure `mount`, bind a renderer to it and set up camera, lights and controls.
    ///
    /// Fails before creating a backend if the mount is missing or zero-sized.
    pub fn bootstrap(
        mount: &mut dyn Mount,
        desc: StageDesc,
        backends: &mut dyn BackendFactory,
    ) -> EngineResult<Self> {
        let size = Viewport::measure(mount)?;
        let backend = backends.create_backend(mount)?;
        let renderer = Renderer::attach(backend, mount, size);

        let mut camera = PerspectiveCamera::new(desc.fov_y_deg, size.aspect(), desc.near, desc.far)
            .with_position(desc.camera_position);
        camera.look_at(desc.controls.target);

        let mut visuals = VisualWorld::new();
        visuals.set_clear_color(desc.clear_color);
        visuals.set_fog(desc.fog);
        visuals.set_viewport([size.width() as f32, size.height() as f32]);
        visuals.set_camera(camera.matrices());

        let mut stage = Self {
            name: desc.name,
            world: World::new(),
            systems: SystemWorld::with_texture_mode(desc.textures),
            visuals,
            assets: RenderAssets::new(),
            queue: CommandQueue::new(),
            camera,
            controls: desc.controls,
            renderer,
            primary: None,
            decorations: Vec::new(),
            ticks: 0,
        };

        for light in desc.lights {
            stage.spawn(Entity::with_root(light));
        }

        tracing::info!(
            stage = stage.name,
            width = size.width(),
            height = size.height(),
            "stage bootstrapped"
        );
        Ok(stage)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn systems(&self) -> &SystemWorld {
        &self.systems
    }

    pub fn visuals(&self) -> &VisualWorld {
        &self.visuals
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn register_mesh(&mut self, mesh: CpuMesh) -> CpuMeshHandle {
        self.assets.register_mesh(mesh)
    }

    /// Insert an entity and hand its components to the systems.
    pub fn spawn(&mut self, entity: Entity) -> ComponentId {
        let root = self.world.spawn(entity, &mut self.queue);
        self.queue
            .flush(&mut self.world, &mut self.systems, &mut self.visuals);
        root
    }

    /// Unregister and remove everything under `root`.
    pub fn despawn(&mut self, root: ComponentId) -> Result<(), WorldError> {
        if !self.world.contains(root) {
            return Err(WorldError::NotFound(root));
        }
        self.world.cleanup_subtree(root, &mut self.queue);
        self.queue
            .flush(&mut self.world, &mut self.systems, &mut self.visuals);
        self.world.remove_component_subtree(root)?;
        self.decorations.retain(|d| *d != root);
        if self.primary == Some(root) {
            self.primary = None;
        }
        Ok(())
    }

    /// Spawn a decorative object. These live until the stage is disposed.
    pub fn add_decoration(&mut self, entity: Entity) -> ComponentId {
        let root = self.spawn(entity);
        self.decorations.push(root);
        root
    }

    pub fn decorations(&self) -> &[ComponentId] {
        &self.decorations
    }

    /// Swap in a new primary surface. The old one is gone before the new one is spawned.
    pub fn replace_primary_surface(&mut self, entity: Entity) -> ComponentId {
        if let Some(old) = self.primary.take() {
            if let Err(e) = self.despawn(old) {
                tracing::warn!(stage = self.name, error = %e, "failed to remove old primary surface");
            }
        }
        let root = self.spawn(entity);
        self.primary = Some(root);
        root
    }

    pub fn primary_surface(&self) -> Option<ComponentId> {
        self.primary
    }

    /// Current transform of an entity root.
    pub fn transform_of(&self, root: ComponentId) -> Option<Transform> {
        let t = self.world.find_child::<TransformComponent>(root)?;
        self.world
            .get_component_by_id_as::<TransformComponent>(t)
            .map(|t| t.transform)
    }

    /// One frame: controls, decoration motion, then a single render.
    ///
    /// Render failures are logged; the caller keeps ticking.
    pub fn tick(&mut self, input: OrbitInput, time_scale: f32) {
        let height = self.renderer.size().height() as f32;
        self.controls
            .tick(&mut self.camera, input, height, time_scale);

        self.systems
            .tick(&self.world, &mut self.queue, time_scale);
        self.queue
            .flush(&mut self.world, &mut self.systems, &mut self.visuals);

        self.systems.prepare_render(
            &mut self.world,
            &mut self.visuals,
            &mut self.assets,
            self.renderer.backend_mut(),
        );
        self.visuals.set_camera(self.camera.matrices());

        if let Err(e) = self.renderer.render(&self.visuals) {
            tracing::error!(stage = self.name, error = %e, "render failed");
        }
        self.ticks += 1;
    }

    /// Re-measure `mount` and follow its size. Degenerate sizes are skipped.
    pub fn resize(&mut self, mount: &dyn Mount) -> bool {
        let size = match Viewport::measure(mount) {
            Ok(size) => size,
            Err(e) => {
                tracing::debug!(stage = self.name, reason = %e, "resize skipped");
                return false;
            }
        };

        self.camera.set_aspect(size.aspect());
        self.renderer.set_size(size);
        self.visuals
            .set_viewport([size.width() as f32, size.height() as f32]);
        tracing::debug!(stage = self.name, width = size.width(), height = size.height(), "resized");
        true
    }

    /// Free GPU resources, detach the surface from `mount` and drop every entity.
    pub fn dispose(&mut self, mount: &mut dyn Mount) {
        if self.renderer.is_disposed() {
            return;
        }
        self.systems.release_all(
            &mut self.visuals,
            &mut self.assets,
            self.renderer.backend_mut(),
        );
        self.renderer.dispose(mount);

        self.world = World::new();
        self.systems = SystemWorld::new();
        self.queue = CommandQueue::new();
        self.primary = None;
        self.decorations.clear();
        tracing::info!(stage = self.name, ticks = self.ticks, "stage disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.renderer.is_disposed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use crate::engine::ecs::component::RenderableComponent;
    use crate::engine::graphics::primitives::{Material, RenderLayer};
    use crate::engine::graphics::{HeadlessBackendFactory, MeshFactory};
    use crate::engine::mount::HeadlessMount;

    fn desc() -> StageDesc {
        StageDesc {
            name: "test",
            fov_y_deg: 60.0,
            near: 0.1,
            far: 1000.0,
            camera_position: Vec3::new(0.0, 5.0, 10.0),
            clear_color: None,
            fog: None,
            lights: vec![LightComponent::ambient(0xffffff, 0.6)],
            controls: OrbitControls::default(),
            textures: TextureLoadMode::Inline,
        }
    }

    fn cube_entity(stage: &mut Stage, x: f32) -> Entity {
        let mesh = stage.register_mesh(MeshFactory::plane(1.0, 1.0));
        Entity::new()
            .with_component(TransformComponent::new(Transform::from_position(x, 0.0, 0.0)))
            .with_component(RenderableComponent::new(mesh, Material::unlit(), RenderLayer::Terrain))
    }

    #[test]
    fn zero_sized_mount_fails_before_any_backend_exists() {
        let mut mount = HeadlessMount::new(0, 300);
        let mut backends = HeadlessBackendFactory::new();
        let err = Stage::bootstrap(&mut mount, desc(), &mut backends).err();

        assert!(matches!(err, Some(EngineError::DegenerateViewport { width: 0, height: 300 })));
        assert_eq!(backends.ledger().borrow().backends_created, 0);
        assert!(mount.surfaces().is_empty());
    }

    #[test]
    fn bootstrap_attaches_one_surface_and_matches_aspect() {
        let mut mount = HeadlessMount::new(800, 400);
        let mut backends = HeadlessBackendFactory::new();
        let stage = Stage::bootstrap(&mut mount, desc(), &mut backends).unwrap();

        assert_eq!(mount.surfaces(), &[stage.renderer().surface()]);
        assert_eq!(stage.camera().aspect, 2.0);
        assert_eq!(stage.systems().light.len(), 1);
        assert_eq!(backends.ledger().borrow().last_size, Some((800, 400)));
    }

    #[test]
    fn resize_follows_mount_and_skips_degenerate_sizes() {
        let mut mount = HeadlessMount::new(800, 400);
        let mut backends = HeadlessBackendFactory::new();
        let mut stage = Stage::bootstrap(&mut mount, desc(), &mut backends).unwrap();

        mount.set_size(300, 600);
        assert!(stage.resize(&mount));
        assert_eq!(stage.camera().aspect, 0.5);
        assert_eq!(stage.renderer().size(), Viewport::new(300, 600).unwrap());

        mount.set_size(300, 0);
        assert!(!stage.resize(&mount));
        assert_eq!(stage.camera().aspect, 0.5);
    }

    #[test]
    fn replacing_primary_surface_keeps_exactly_one() {
        let mut mount = HeadlessMount::new(64, 64);
        let mut backends = HeadlessBackendFactory::new();
        let mut stage = Stage::bootstrap(&mut mount, desc(), &mut backends).unwrap();

        let a = cube_entity(&mut stage, 0.0);
        let first = stage.replace_primary_surface(a);
        stage.tick(OrbitInput::default(), 1.0);
        let b = cube_entity(&mut stage, 1.0);
        let second = stage.replace_primary_surface(b);
        stage.tick(OrbitInput::default(), 1.0);

        assert!(!stage.world().contains(first));
        assert_eq!(stage.primary_surface(), Some(second));
        assert_eq!(stage.visuals().len(), 1);
        assert_eq!(backends.ledger().borrow().live_meshes.len(), 1);
    }

    #[test]
    fn repeated_surface_swaps_do_not_keep_old_meshes() {
        let mut mount = HeadlessMount::new(64, 64);
        let mut backends = HeadlessBackendFactory::new();
        let mut stage = Stage::bootstrap(&mut mount, desc(), &mut backends).unwrap();

        for i in 0..20 {
            let e = cube_entity(&mut stage, i as f32);
            stage.replace_primary_surface(e);
            stage.tick(OrbitInput::default(), 1.0);
            assert_eq!(stage.assets.cpu_len(), 1);
            assert_eq!(stage.assets.uploaded_len(), 1);
        }
        assert_eq!(backends.ledger().borrow().live_meshes.len(), 1);
    }

    #[test]
    fn shared_mesh_survives_a_change_of_owner() {
        let mut mount = HeadlessMount::new(64, 64);
        let mut backends = HeadlessBackendFactory::new();
        let mut stage = Stage::bootstrap(&mut mount, desc(), &mut backends).unwrap();
        let mesh = stage.register_mesh(MeshFactory::plane(1.0, 1.0));
        let entity = || {
            Entity::new()
                .with_component(TransformComponent::new(Transform::default()))
                .with_component(RenderableComponent::new(mesh, Material::unlit(), RenderLayer::Terrain))
        };

        stage.replace_primary_surface(entity());
        stage.tick(OrbitInput::default(), 1.0);
        stage.replace_primary_surface(entity());
        stage.tick(OrbitInput::default(), 1.0);

        assert_eq!(stage.visuals().len(), 1);
        assert!(stage.assets.cpu_mesh(mesh).is_some());
        assert_eq!(backends.ledger().borrow().live_meshes.len(), 1);
    }

    #[test]
    fn dispose_detaches_and_frees_everything() {
        let mut mount = HeadlessMount::new(64, 64);
        let mut backends = HeadlessBackendFactory::new();
        let ledger = backends.ledger();
        let mut stage = Stage::bootstrap(&mut mount, desc(), &mut backends).unwrap();

        let e = cube_entity(&mut stage, 0.0);
        stage.add_decoration(e);
        stage.tick(OrbitInput::default(), 1.0);
        assert_eq!(ledger.borrow().live_meshes.len(), 1);
        assert_eq!(ledger.borrow().frames, 1);

        stage.dispose(&mut mount);
        assert!(stage.is_disposed());
        assert!(mount.surfaces().is_empty());
        assert!(ledger.borrow().live_meshes.is_empty());
        assert_eq!(ledger.borrow().backends_disposed, 1);
        assert!(stage.decorations().is_empty());

        // Second dispose is a no-op.
        stage.dispose(&mut mount);
        assert_eq!(ledger.borrow().backends_disposed, 1);
    }
}
