pub mod animation_loop;
pub mod camera;
pub mod cli;
pub mod config;
pub mod controls;
pub mod ecs;
pub mod events;
pub mod graphics;
pub mod mount;
pub mod populate;
pub mod stage;
pub mod user_input;
pub mod viewer;
pub mod windowing;

pub use stage::Stage;
pub use windowing::Windowing;

/// Engine-level error type.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The mount has no measurable client area (window gone, not yet created, ...).
    #[error("mount point is missing or has no client area")]
    MissingMount,

    /// The mount measured zero in at least one dimension.
    #[error("viewport is degenerate: {width}x{height}")]
    DegenerateViewport { width: u32, height: u32 },

    /// Renderer backend failure (device, swapchain, upload, ...).
    #[error("renderer backend: {0}")]
    Backend(Box<dyn std::error::Error>),

    #[error("event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("texture '{uri}': {reason}")]
    Texture { uri: String, reason: String },

    #[error("scene index {index} out of range (have {len} scenes)")]
    InvalidSceneIndex { index: usize, len: usize },

    /// An operation that needs a live activation was called on an inactive viewer.
    #[error("viewer '{0}' is not active")]
    NotActive(&'static str),
}

impl From<Box<dyn std::error::Error>> for EngineError {
    fn from(e: Box<dyn std::error::Error>) -> Self {
        EngineError::Backend(e)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
