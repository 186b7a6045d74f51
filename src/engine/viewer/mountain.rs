use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::engine::EngineResult;
use crate::engine::animation_loop::MotionMode;
use crate::engine::config::MountainConfig;
use crate::engine::controls::OrbitControls;
use crate::engine::ecs::component::LightComponent;
use crate::engine::ecs::system::TextureLoadMode;
use crate::engine::graphics::primitives::{Fog, rgb_hex};
use crate::engine::populate;
use crate::engine::stage::StageDesc;
use crate::engine::viewer::{Session, Viewer, ViewerContext};

const SKY: u32 = 0xbfd1e5;
const CLOUDS: usize = 10;

/// Single cone mountain under a pale sky, with fog and a few drifting clouds.
pub struct MountainViewer {
    cloud_texture: String,
    motion: MotionMode,
    textures: TextureLoadMode,
    rng: ChaCha8Rng,
    session: Option<Session>,
}

impl MountainViewer {
    pub fn new(config: &MountainConfig, motion: MotionMode, textures: TextureLoadMode, seed: u64) -> Self {
        Self {
            cloud_texture: config.cloud_texture.clone(),
            motion,
            textures,
            rng: ChaCha8Rng::seed_from_u64(seed),
            session: None,
        }
    }

    fn stage_desc(&self) -> StageDesc {
        let mut controls = OrbitControls::new(Vec3::ZERO);
        controls.enable_damping = true;
        controls.damping_factor = 0.03;

        StageDesc {
            name: self.name(),
            fov_y_deg: 60.0,
            near: 0.1,
            far: 1000.0,
            camera_position: Vec3::new(0.0, 5.0, 10.0),
            clear_color: Some(rgb_hex(SKY)),
            fog: Some(Fog {
                color: rgb_hex(SKY),
                density: 0.02,
            }),
            lights: vec![
                LightComponent::ambient(0xffffff, 0.6),
                LightComponent::directional(0xffffff, 1.0, [10.0, 10.0, 10.0]),
            ],
            controls,
            textures: self.textures,
        }
    }
}

impl Viewer for MountainViewer {
    fn name(&self) -> &'static str {
        "mountain"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn activate(&mut self, ctx: &mut ViewerContext<'_>) -> EngineResult<()> {
        if self.session.is_some() {
            return Ok(());
        }
        let mut session = Session::open(ctx, self.stage_desc(), self.motion)?;

        let stage = session.stage_mut();
        populate::spawn_mountain(stage, 5.0, 8.0, [0.0, -2.0, 0.0]);
        populate::scatter_valley_clouds(stage, &mut self.rng, &self.cloud_texture, CLOUDS);

        self.session = Some(session);
        Ok(())
    }

    fn deactivate(&mut self, ctx: &mut ViewerContext<'_>) {
        if let Some(session) = self.session.take() {
            session.close(ctx);
        }
    }

    fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use crate::engine::animation_loop::FrameScheduler;
    use crate::engine::ecs::component::{DriftComponent, RenderableComponent};
    use crate::engine::graphics::HeadlessBackendFactory;
    use crate::engine::graphics::primitives::RenderLayer;
    use crate::engine::mount::HeadlessMount;
    use crate::engine::viewer::{ViewerCommand, ViewerHost};

    fn mounted() -> ViewerHost<HeadlessMount> {
        let mut host = ViewerHost::new(
            HeadlessMount::new(640, 480),
            FrameScheduler::headless(),
            Box::new(HeadlessBackendFactory::new()),
        );
        let v = MountainViewer::new(
            &MountainConfig::default(),
            MotionMode::PerFrame,
            TextureLoadMode::Inline,
            7,
        );
        host.mount_viewer(Box::new(v)).unwrap();
        host
    }

    #[test]
    fn one_mountain_and_ten_clouds_regardless_of_ticks() {
        let mut host = mounted();
        for _ in 0..200 {
            host.redraw(Instant::now());
        }
        let stage = host.viewer().and_then(|v| v.session()).unwrap().stage();
        let world = stage.world();
        let layers: Vec<RenderLayer> = world
            .all_components::<RenderableComponent>()
            .into_iter()
            .filter_map(|r| world.get_component_by_id_as::<RenderableComponent>(r))
            .map(|r| r.layer)
            .collect();

        assert_eq!(layers.iter().filter(|l| **l == RenderLayer::Terrain).count(), 1);
        assert_eq!(layers.iter().filter(|l| **l == RenderLayer::Decoration).count(), 10);
        assert_eq!(stage.decorations().len(), 11);
        assert_eq!(stage.visuals().fog().map(|f| f.density), Some(0.02));
        assert_eq!(stage.visuals().clear_color(), Some(rgb_hex(SKY)));
    }

    #[test]
    fn clouds_step_a_hundredth_and_wrap_at_ten() {
        let mut host = mounted();
        let stage = host.viewer().and_then(|v| v.session()).unwrap().stage();
        let world = stage.world();
        let clouds: Vec<_> = stage
            .decorations()
            .iter()
            .copied()
            .filter(|d| world.find_child::<DriftComponent>(*d).is_some())
            .collect();
        let expected: Vec<f32> = clouds
            .iter()
            .map(|c| {
                let mut x = stage.transform_of(*c).unwrap().position[0];
                for _ in 0..1500 {
                    x += 0.01;
                    if x > 10.0 {
                        x = -10.0;
                    }
                }
                x
            })
            .collect();

        for _ in 0..1500 {
            host.redraw(Instant::now());
        }

        let stage = host.viewer().and_then(|v| v.session()).unwrap().stage();
        for (c, x) in clouds.iter().zip(expected) {
            let t = stage.transform_of(*c).unwrap();
            assert_eq!(t.position[0], x);
            assert_eq!(t.rotation[2], 0.0);
        }
    }

    #[test]
    fn damping_keeps_camera_moving_after_a_drag() {
        let mut host = mounted();
        host.input_mut().on_mouse_button(winit::event::MouseButton::Left, true);
        host.input_mut().on_cursor_moved(100.0, 100.0);
        host.input_mut().on_cursor_moved(160.0, 100.0);
        host.redraw(Instant::now());
        host.input_mut().on_mouse_button(winit::event::MouseButton::Left, false);

        let pos = |h: &ViewerHost<HeadlessMount>| {
            h.viewer().and_then(|v| v.session()).unwrap().stage().camera().position
        };
        let a = pos(&host);
        host.redraw(Instant::now());
        let b = pos(&host);
        assert_ne!(a, b);
        assert!(((b - Vec3::ZERO).length() - (a - Vec3::ZERO).length()).abs() < 1e-3);
    }

    #[test]
    fn scene_commands_are_ignored() {
        let mut host = mounted();
        host.command(ViewerCommand::Next).unwrap();
        assert!(host.viewer().unwrap().is_active());
        assert_eq!(host.listeners().len(), 1);
    }
}
