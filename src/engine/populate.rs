//! Scene content: panorama sphere, mountain cones and drifting cloud planes.
//!
//! Placement is uniform random inside fixed bounds. The random source is passed in so
//! callers decide between a fixed seed and the clock.

use std::f32::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::ecs::component::{
    DriftComponent, RenderableComponent, TextureComponent, TransformComponent,
};
use crate::engine::ecs::{ComponentId, Entity};
use crate::engine::graphics::primitives::{Material, RenderLayer, Transform, rgb_hex};
use crate::engine::graphics::MeshFactory;
use crate::engine::stage::Stage;

pub const PANORAMA_RADIUS: f32 = 500.0;
pub const PANORAMA_SEGMENTS: u32 = 128;
pub const MOUNTAIN_SEGMENTS: u32 = 32;
pub const MOUNTAIN_COLOR: u32 = 0x888888;

/// One panorama: an equirectangular image and its turn about +Y.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanoramaScene {
    pub src: String,
    pub rotation_y_deg: f32,
}

impl PanoramaScene {
    pub fn new(src: impl Into<String>, rotation_y_deg: f32) -> Self {
        Self {
            src: src.into(),
            rotation_y_deg,
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("assets/img/1.jpg", 0.0),
            Self::new("assets/img/2.jpg", 90.0),
            Self::new("assets/img/3.jpg", 180.0),
            Self::new("assets/img/4.jpg", 270.0),
        ]
    }
}

fn mountain_material() -> Material {
    Material::standard(rgb_hex(MOUNTAIN_COLOR)).with_surface(1.0, 0.1)
}

/// Inward-facing textured sphere for `scene`, replacing the stage's current one.
pub fn spawn_panorama_surface(stage: &mut Stage, scene: &PanoramaScene) -> ComponentId {
    let mesh = stage.register_mesh(
        MeshFactory::sphere(PANORAMA_RADIUS, PANORAMA_SEGMENTS, PANORAMA_SEGMENTS).mirrored_x(),
    );
    let transform = Transform::default().with_rotation(0.0, scene.rotation_y_deg.to_radians(), 0.0);

    stage.replace_primary_surface(
        Entity::new()
            .with_component(TransformComponent::new(transform))
            .with_nested(
                RenderableComponent::new(mesh, Material::unlit(), RenderLayer::Backdrop),
                TextureComponent::new(scene.src.clone()),
            ),
    )
}

/// One cone mountain.
pub fn spawn_mountain(stage: &mut Stage, radius: f32, height: f32, position: [f32; 3]) -> ComponentId {
    let mesh = stage.register_mesh(MeshFactory::cone(radius, height, MOUNTAIN_SEGMENTS));
    let [x, y, z] = position;
    stage.add_decoration(
        Entity::new()
            .with_component(TransformComponent::new(Transform::from_position(x, y, z)))
            .with_component(RenderableComponent::new(mesh, mountain_material(), RenderLayer::Terrain)),
    )
}

/// Distant ring of mountains behind the panorama's default view.
pub fn scatter_mountains(stage: &mut Stage, rng: &mut impl Rng, count: usize) -> Vec<ComponentId> {
    (0..count)
        .map(|_| {
            let radius = 5.0 + rng.random::<f32>() * 5.0;
            let height = 8.0 + rng.random::<f32>() * 5.0;
            let x = rng.random::<f32>() * 80.0 - 40.0;
            let z = -40.0 - rng.random::<f32>() * 30.0;
            spawn_mountain(stage, radius, height, [x, -2.0, z])
        })
        .collect()
}

/// Large sky clouds: own mesh and opacity each, drifting along +X and spinning about Z.
/// Wrap from `x > 100` back to `-100`.
pub fn scatter_sky_clouds(
    stage: &mut Stage,
    rng: &mut impl Rng,
    texture: &str,
    count: usize,
) -> Vec<ComponentId> {
    (0..count)
        .map(|_| {
            let opacity = 0.6 + rng.random::<f32>() * 0.2;
            let width = 20.0 + rng.random::<f32>() * 30.0;
            let height = 10.0 + rng.random::<f32>() * 20.0;
            let x = rng.random::<f32>() * 200.0 - 100.0;
            let y = 10.0 + rng.random::<f32>() * 30.0;
            let z = -30.0 - rng.random::<f32>() * 40.0;
            let speed = 0.01 + rng.random::<f32>() * 0.05;
            let spin = 0.001 + rng.random::<f32>() * 0.005;

            let mesh = stage.register_mesh(MeshFactory::plane(width, height));
            let material = Material::unlit().translucent(opacity).double_sided();

            stage.add_decoration(
                Entity::new()
                    .with_component(TransformComponent::new(Transform::from_position(x, y, z)))
                    .with_nested(
                        RenderableComponent::new(mesh, material, RenderLayer::Decoration),
                        TextureComponent::new(texture),
                    )
                    .with_component(
                        DriftComponent::new([speed, 0.0, 0.0])
                            .with_spin([0.0, 0.0, spin])
                            .with_wrap(0, 100.0, -100.0),
                    ),
            )
        })
        .collect()
}

/// Small valley clouds sharing one 4×2 plane, drifting 0.01 per tick along +X.
/// Wrap from `x > 10` back to `-10`.
pub fn scatter_valley_clouds(
    stage: &mut Stage,
    rng: &mut impl Rng,
    texture: &str,
    count: usize,
) -> Vec<ComponentId> {
    let mesh = stage.register_mesh(MeshFactory::plane(4.0, 2.0));
    let material = Material::unlit().translucent(0.8).without_depth_write();

    (0..count)
        .map(|_| {
            let x = rng.random::<f32>() * 20.0 - 10.0;
            let y = rng.random::<f32>() * 5.0 + 2.0;
            let z = rng.random::<f32>() * -10.0;
            let turn = rng.random::<f32>() * PI;

            stage.add_decoration(
                Entity::new()
                    .with_component(TransformComponent::new(
                        Transform::from_position(x, y, z).with_rotation(0.0, turn, 0.0),
                    ))
                    .with_nested(
                        RenderableComponent::new(mesh, material, RenderLayer::Decoration),
                        TextureComponent::new(texture),
                    )
                    .with_component(DriftComponent::new([0.01, 0.0, 0.0]).with_wrap(0, 10.0, -10.0)),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::engine::controls::OrbitControls;
    use crate::engine::ecs::system::TextureLoadMode;
    use crate::engine::graphics::HeadlessBackendFactory;
    use crate::engine::mount::HeadlessMount;
    use crate::engine::stage::StageDesc;

    fn stage() -> (Stage, HeadlessMount) {
        let mut mount = HeadlessMount::new(320, 240);
        let desc = StageDesc {
            name: "populate",
            fov_y_deg: 75.0,
            near: 0.1,
            far: 1000.0,
            camera_position: Vec3::new(0.0, 0.0, 0.1),
            clear_color: None,
            fog: None,
            lights: Vec::new(),
            controls: OrbitControls::default(),
            textures: TextureLoadMode::Inline,
        };
        let stage = Stage::bootstrap(&mut mount, desc, &mut HeadlessBackendFactory::new()).unwrap();
        (stage, mount)
    }

    #[test]
    fn sky_clouds_stay_inside_their_bounds() {
        let (mut stage, _mount) = stage();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let clouds = scatter_sky_clouds(&mut stage, &mut rng, "assets/img/cloud.png", 10);
        assert_eq!(clouds.len(), 10);

        for c in clouds {
            let p = stage.transform_of(c).unwrap().position;
            assert!((-100.0..100.0).contains(&p[0]));
            assert!((10.0..40.0).contains(&p[1]));
            assert!(p[2] <= -30.0 && p[2] > -70.0);

            let world = stage.world();
            let drift = world
                .find_child::<DriftComponent>(c)
                .and_then(|d| world.get_component_by_id_as::<DriftComponent>(d))
                .unwrap();
            assert!((0.01..0.06).contains(&drift.velocity[0]));
            assert!((0.001..0.006).contains(&drift.spin[2]));
            assert_eq!(drift.wrap.unwrap().reset, -100.0);
        }
    }

    #[test]
    fn mountains_sit_on_the_ground_line() {
        let (mut stage, _mount) = stage();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for m in scatter_mountains(&mut stage, &mut rng, 5) {
            let p = stage.transform_of(m).unwrap().position;
            assert_eq!(p[1], -2.0);
            assert!((-40.0..40.0).contains(&p[0]));
            assert!(p[2] <= -40.0 && p[2] > -70.0);

            let world = stage.world();
            let r = world
                .find_child::<RenderableComponent>(m)
                .and_then(|r| world.get_component_by_id_as::<RenderableComponent>(r))
                .unwrap();
            assert_eq!(r.layer, RenderLayer::Terrain);
            assert_eq!(r.material.metalness, 0.1);
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let layout = |seed| {
            let (mut stage, _mount) = stage();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            scatter_valley_clouds(&mut stage, &mut rng, "assets/img/cloud.png", 10)
                .into_iter()
                .map(|c| stage.transform_of(c).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(layout(3), layout(3));
        assert_ne!(layout(3), layout(4));
    }

    #[test]
    fn panorama_surface_turns_by_scene_offset() {
        let (mut stage, _mount) = stage();
        let scene = PanoramaScene::new("assets/img/2.jpg", 90.0);
        let root = spawn_panorama_surface(&mut stage, &scene);

        let t = stage.transform_of(root).unwrap();
        assert!((t.rotation[1] - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!(stage.primary_surface(), Some(root));
        assert!(stage.decorations().is_empty());
    }
}
