pub mod drift_system;
pub mod light_system;
pub mod renderable_system;
pub mod system_world;
pub mod texture_system;
pub mod transform_system;

pub use drift_system::DriftSystem;
pub use light_system::LightSystem;
pub use renderable_system::RenderableSystem;
pub use system_world::SystemWorld;
pub use texture_system::{FALLBACK_COLOR, TextureLoadMode, TextureSystem};
pub use transform_system::TransformSystem;
