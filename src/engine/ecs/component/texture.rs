use std::path::Path;

use crate::engine::ecs::component::Component;
use crate::engine::ecs::{CommandQueue, ComponentId};

/// Encoding the texture loader will expect, derived from the URI extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// Anything `image` can decode; uploaded as RGBA8.
    Rgba8,
    /// DDS container holding BC7 blocks.
    DdsBc7,
}

impl TextureFormat {
    pub fn from_uri(uri: &str) -> Self {
        let raw = uri.strip_prefix("file://").unwrap_or(uri);
        let ext = Path::new(raw)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        if ext.eq_ignore_ascii_case("dds") {
            TextureFormat::DdsBc7
        } else {
            TextureFormat::Rgba8
        }
    }
}

/// Image applied to the parent `RenderableComponent`.
#[derive(Debug, Clone)]
pub struct TextureComponent {
    pub uri: String,
    pub format: TextureFormat,
    /// Upload RGBA8 data as sRGB (colour images).
    pub srgb: bool,
}

impl TextureComponent {
    pub fn new(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let format = TextureFormat::from_uri(&uri);
        Self {
            uri,
            format,
            srgb: true,
        }
    }
}

impl Component for TextureComponent {
    fn name(&self) -> &'static str {
        "texture"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn init(&mut self, queue: &mut CommandQueue, component: ComponentId) {
        queue.queue_register_texture(component);
    }

    fn cleanup(&mut self, queue: &mut CommandQueue, component: ComponentId) {
        queue.queue_unregister_texture(component);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(TextureFormat::from_uri("assets/img/1.jpg"), TextureFormat::Rgba8);
        assert_eq!(TextureFormat::from_uri("file://sky.DDS"), TextureFormat::DdsBc7);
        assert_eq!(TextureFormat::from_uri("no_extension"), TextureFormat::Rgba8);
    }
}
