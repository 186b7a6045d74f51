use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::engine::animation_loop::MotionMode;
use crate::engine::config::PanoramaConfig;
use crate::engine::controls::OrbitControls;
use crate::engine::ecs::component::LightComponent;
use crate::engine::ecs::system::TextureLoadMode;
use crate::engine::populate::{self, PanoramaScene};
use crate::engine::stage::StageDesc;
use crate::engine::viewer::{Session, Viewer, ViewerCommand, ViewerContext};
use crate::engine::{EngineError, EngineResult};

const MOUNTAINS: usize = 5;
const CLOUDS: usize = 10;

/// Position in a fixed-length scene list; Previous/Next wrap around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneIndex {
    current: usize,
    len: usize,
}

impl SceneIndex {
    pub fn new(current: usize, len: usize) -> EngineResult<Self> {
        if current >= len {
            return Err(EngineError::InvalidSceneIndex { index: current, len });
        }
        Ok(Self { current, len })
    }

    pub fn get(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn next(&mut self) {
        self.current = (self.current + 1) % self.len;
    }

    pub fn previous(&mut self) {
        self.current = (self.current + self.len - 1) % self.len;
    }

    pub fn select(&mut self, index: usize) -> EngineResult<()> {
        *self = Self::new(index, self.len)?;
        Ok(())
    }
}

/// 360° panorama with decorative mountains and clouds. Changing scene rebuilds the
/// whole session.
pub struct PanoramaViewer {
    scenes: Vec<PanoramaScene>,
    cloud_texture: String,
    index: SceneIndex,
    motion: MotionMode,
    textures: TextureLoadMode,
    rng: ChaCha8Rng,
    session: Option<Session>,
    /// Mounted by a host. Stays set while a failed rebuild leaves no session.
    mounted: bool,
}

impl PanoramaViewer {
    pub fn new(
        config: &PanoramaConfig,
        motion: MotionMode,
        textures: TextureLoadMode,
        seed: u64,
    ) -> EngineResult<Self> {
        let index = SceneIndex::new(config.start_index, config.scenes.len())?;
        Ok(Self {
            scenes: config.scenes.clone(),
            cloud_texture: config.cloud_texture.clone(),
            index,
            motion,
            textures,
            rng: ChaCha8Rng::seed_from_u64(seed),
            session: None,
            mounted: false,
        })
    }

    pub fn index(&self) -> SceneIndex {
        self.index
    }

    pub fn current_scene(&self) -> &PanoramaScene {
        &self.scenes[self.index.get()]
    }

    fn stage_desc(&self) -> StageDesc {
        let mut controls = OrbitControls::new(Vec3::new(0.0, 0.0, -1.0));
        controls.enable_zoom = false;
        controls.enable_pan = false;
        controls.rotate_speed = 0.3;
        controls.auto_rotate = true;
        controls.auto_rotate_speed = 0.2;

        StageDesc {
            name: self.name(),
            fov_y_deg: 75.0,
            near: 0.1,
            far: 1000.0,
            camera_position: Vec3::new(0.0, 0.0, 0.1),
            clear_color: None,
            fog: None,
            lights: vec![
                LightComponent::ambient(0xffffff, 0.6),
                LightComponent::directional(0xffffff, 1.0, [50.0, 50.0, 50.0]),
            ],
            controls,
            textures: self.textures,
        }
    }

    fn open_session(&mut self, ctx: &mut ViewerContext<'_>) -> EngineResult<()> {
        let mut session = Session::open(ctx, self.stage_desc(), self.motion)?;

        let scene = self.scenes[self.index.get()].clone();
        let stage = session.stage_mut();
        populate::spawn_panorama_surface(stage, &scene);
        populate::scatter_mountains(stage, &mut self.rng, MOUNTAINS);
        populate::scatter_sky_clouds(stage, &mut self.rng, &self.cloud_texture, CLOUDS);

        tracing::info!(index = self.index.get(), src = %scene.src, "panorama scene active");
        self.session = Some(session);
        Ok(())
    }

    /// Close the live session (if any) and open one for the current index.
    fn rebuild(&mut self, ctx: &mut ViewerContext<'_>) -> EngineResult<()> {
        if !self.mounted {
            return Ok(());
        }
        if let Some(session) = self.session.take() {
            session.close(ctx);
        }
        self.open_session(ctx)
    }
}

impl Viewer for PanoramaViewer {
    fn name(&self) -> &'static str {
        "panorama"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn activate(&mut self, ctx: &mut ViewerContext<'_>) -> EngineResult<()> {
        if self.session.is_some() {
            return Ok(());
        }
        self.open_session(ctx)?;
        self.mounted = true;
        Ok(())
    }

    fn deactivate(&mut self, ctx: &mut ViewerContext<'_>) {
        self.mounted = false;
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

    fn command(&mut self, cmd: ViewerCommand, ctx: &mut ViewerContext<'_>) -> EngineResult<()> {
        let before = self.index;
        match cmd {
            ViewerCommand::Next => self.index.next(),
            ViewerCommand::Previous => self.index.previous(),
            ViewerCommand::Select(i) => self.index.select(i)?,
        }
        tracing::debug!(from = before.get(), to = self.index.get(), "scene change");
        if let Err(e) = self.rebuild(ctx) {
            self.index = before;
            return Err(e);
        }
        Ok(())
    }

    fn recover(&mut self, ctx: &mut ViewerContext<'_>) -> EngineResult<()> {
        if self.session.is_some() {
            return Ok(());
        }
        self.rebuild(ctx)
    }
}
