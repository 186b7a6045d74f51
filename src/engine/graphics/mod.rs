pub mod headless;
pub mod mesh;
pub mod pipeline_descriptor_set_layouts;
pub mod primitives;
pub mod render_assets;
pub mod renderer;
pub mod visual_world;
pub mod vulkano_renderer;

pub use headless::{HeadlessBackendFactory, HeadlessLedger};
pub use mesh::{CpuMesh, CpuVertex, MeshFactory};
pub use primitives::{
    AmbientLight, CpuMeshHandle, DirectionalLight, Fog, InstanceHandle, Material, MeshHandle,
    RenderLayer, Side, TextureHandle, Transform, rgb_hex,
};
pub use render_assets::RenderAssets;
pub use renderer::{BackendFactory, RenderBackend, Renderer};
pub use visual_world::{Instance, VisualWorld};
pub use vulkano_renderer::VulkanoBackendFactory;
