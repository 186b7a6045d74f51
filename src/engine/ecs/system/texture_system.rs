use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::engine::ecs::component::{RenderableComponent, TextureComponent, TextureFormat};
use crate::engine::ecs::system::RenderableSystem;
use crate::engine::ecs::{ComponentId, World};
use crate::engine::graphics::{RenderBackend, TextureHandle, VisualWorld};

/// Solid colour shown on a surface whose texture could not be loaded.
pub const FALLBACK_COLOR: [f32; 3] = [1.0, 0.0, 1.0];

/// Where image files are read and decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureLoadMode {
    /// Worker thread; results are polled each frame.
    #[default]
    Background,
    /// On the render thread, during the flush that first needs the texture.
    Inline,
}

#[derive(Debug, Clone)]
struct TextureRecord {
    uri: String,
    format: TextureFormat,
    srgb: bool,
}

enum Decoded {
    Rgba8 {
        rgba: Vec<u8>,
        width: u32,
        height: u32,
    },
    Bc7 {
        blocks: Vec<u8>,
        width: u32,
        height: u32,
        srgb: bool,
    },
}

type LoadResult = (String, Result<Decoded, String>);

/// Loads textures by URI and attaches them to the renderable they sit under.
pub struct TextureSystem {
    mode: TextureLoadMode,
    textures: HashMap<ComponentId, TextureRecord>,
    /// RenderableComponent cid -> TextureComponent cid
    pending_attach: HashMap<ComponentId, ComponentId>,
    uri_cache: HashMap<String, TextureHandle>,
    failed: HashSet<String>,
    in_flight: HashSet<String>,
    results_tx: Sender<LoadResult>,
    results_rx: Receiver<LoadResult>,
}

impl std::fmt::Debug for TextureSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureSystem")
            .field("mode", &self.mode)
            .field("textures", &self.textures.len())
            .field("pending_attach", &self.pending_attach.len())
            .field("uploaded", &self.uri_cache.len())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl Default for TextureSystem {
    fn default() -> Self {
        Self::new(TextureLoadMode::default())
    }
}

impl TextureSystem {
    pub fn new(mode: TextureLoadMode) -> Self {
        let (results_tx, results_rx) = crossbeam_channel::unbounded();
        Self {
            mode,
            textures: HashMap::new(),
            pending_attach: HashMap::new(),
            uri_cache: HashMap::new(),
            failed: HashSet::new(),
            in_flight: HashSet::new(),
            results_tx,
            results_rx,
        }
    }

    pub fn set_mode(&mut self, mode: TextureLoadMode) {
        self.mode = mode;
    }

    pub fn uploaded_len(&self) -> usize {
        self.uri_cache.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending_attach.len()
    }

    pub fn register_texture(&mut self, world: &World, component: ComponentId) {
        let Some(tex) = world.get_component_by_id_as::<TextureComponent>(component) else {
            return;
        };
        self.textures.entry(component).or_insert_with(|| TextureRecord {
            uri: tex.uri.clone(),
            format: tex.format,
            srgb: tex.srgb,
        });

        match world.find_ancestor::<RenderableComponent>(component) {
            Some(renderable) => {
                self.pending_attach.insert(renderable, component);
            }
            None => tracing::warn!(uri = %tex.uri, "texture is not under a renderable; ignored"),
        }
    }

    pub fn unregister_texture(&mut self, component: ComponentId) {
        self.textures.remove(&component);
        self.pending_attach.retain(|_, t| *t != component);
    }

    /// Collect finished loads, upload them and attach textures to renderables that are
    /// now in `VisualWorld`.
    ///
    /// Must run after renderables are flushed so instance handles exist.
    pub fn flush_pending(
        &mut self,
        visuals: &mut VisualWorld,
        renderables: &RenderableSystem,
        backend: &mut dyn RenderBackend,
    ) {
        while let Ok((uri, result)) = self.results_rx.try_recv() {
            self.in_flight.remove(&uri);
            self.finish_load(backend, uri, result);
        }

        let pairs: Vec<(ComponentId, ComponentId)> =
            self.pending_attach.iter().map(|(&r, &t)| (r, t)).collect();

        for (renderable_cid, texture_cid) in pairs {
            let Some(instance) = renderables.instance_of(renderable_cid) else {
                continue;
            };
            let Some(record) = self.textures.get(&texture_cid).cloned() else {
                self.pending_attach.remove(&renderable_cid);
                continue;
            };

            if let Some(&tex) = self.uri_cache.get(&record.uri) {
                visuals.update_texture(instance, Some(tex));
                self.pending_attach.remove(&renderable_cid);
                continue;
            }
            if self.failed.contains(&record.uri) {
                visuals.update_texture(instance, None);
                visuals.update_color(instance, FALLBACK_COLOR);
                self.pending_attach.remove(&renderable_cid);
                continue;
            }
            if self.in_flight.contains(&record.uri) {
                continue;
            }

            match self.mode {
                TextureLoadMode::Inline => {
                    let result = load_and_decode(&record);
                    self.finish_load(backend, record.uri.clone(), result);
                    if let Some(&tex) = self.uri_cache.get(&record.uri) {
                        visuals.update_texture(instance, Some(tex));
                    } else {
                        visuals.update_color(instance, FALLBACK_COLOR);
                    }
                    self.pending_attach.remove(&renderable_cid);
                }
                TextureLoadMode::Background => {
                    self.in_flight.insert(record.uri.clone());
                    let tx = self.results_tx.clone();
                    std::thread::spawn(move || {
                        let result = load_and_decode(&record);
                        // The receiver is gone if the stage was disposed meanwhile.
                        let _ = tx.send((record.uri, result));
                    });
                }
            }
        }
    }

    fn finish_load(
        &mut self,
        backend: &mut dyn RenderBackend,
        uri: String,
        result: Result<Decoded, String>,
    ) {
        let uploaded = result.and_then(|decoded| {
            match decoded {
                Decoded::Rgba8 {
                    rgba,
                    width,
                    height,
                } => {
                    let srgb = self
                        .textures
                        .values()
                        .find(|r| r.uri == uri)
                        .map(|r| r.srgb)
                        .unwrap_or(true);
                    backend.upload_texture_rgba8(&rgba, width, height, srgb)
                }
                Decoded::Bc7 {
                    blocks,
                    width,
                    height,
                    srgb,
                } => backend.upload_texture_bc7(&blocks, width, height, srgb),
            }
            .map_err(|e| format!("upload failed: {e}"))
        });

        match uploaded {
            Ok(handle) => {
                tracing::debug!(%uri, ?handle, "texture uploaded");
                self.uri_cache.insert(uri, handle);
            }
            Err(reason) => {
                tracing::warn!(%uri, %reason, "texture unavailable; using fallback colour");
                self.failed.insert(uri);
            }
        }
    }

    /// Free every uploaded texture and forget all records.
    pub fn release_all(&mut self, backend: &mut dyn RenderBackend) {
        for (_, tex) in self.uri_cache.drain() {
            backend.release_texture(tex);
        }
        self.textures.clear();
        self.pending_attach.clear();
        self.failed.clear();
        self.in_flight.clear();
    }
}

fn load_and_decode(record: &TextureRecord) -> Result<Decoded, String> {
    let path = resolve_texture_path(&record.uri)?;
    let bytes = std::fs::read(&path).map_err(|e| format!("read {}: {e}", path.display()))?;

    match record.format {
        TextureFormat::DdsBc7 => decode_dds_bc7(&bytes),
        TextureFormat::Rgba8 => {
            let img = image::load_from_memory(&bytes).map_err(|e| format!("decode: {e}"))?;
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            Ok(Decoded::Rgba8 {
                rgba: rgba.into_raw(),
                width,
                height,
            })
        }
    }
}

/// Absolute paths as-is; relative paths against the working directory, then the crate
/// root (so runs from `target/` still find `assets/`).
fn resolve_texture_path(uri: &str) -> Result<PathBuf, String> {
    let raw = Path::new(uri.strip_prefix("file://").unwrap_or(uri));
    if raw.is_absolute() {
        return if raw.exists() {
            Ok(raw.to_path_buf())
        } else {
            Err(format!("not found: {}", raw.display()))
        };
    }

    let mut tried = Vec::new();
    let bases = std::env::current_dir()
        .into_iter()
        .chain(std::iter::once(PathBuf::from(env!("CARGO_MANIFEST_DIR"))));
    for base in bases {
        let p = base.join(raw);
        if p.exists() {
            return Ok(p);
        }
        tried.push(p.display().to_string());
    }
    Err(format!("not found (tried {})", tried.join(", ")))
}

fn decode_dds_bc7(bytes: &[u8]) -> Result<Decoded, String> {
    let dds = ddsfile::Dds::read(&mut Cursor::new(bytes)).map_err(|e| format!("{e:?}"))?;

    let width = dds.get_width();
    let height = dds.get_height();
    if width == 0 || height == 0 {
        return Err("DDS has zero size".to_string());
    }

    let srgb = match dds.get_dxgi_format() {
        Some(ddsfile::DxgiFormat::BC7_UNorm) => false,
        Some(ddsfile::DxgiFormat::BC7_UNorm_sRGB) => true,
        Some(other) => return Err(format!("DDS is not BC7 (got {other:?})")),
        None => return Err("DDS missing DXGI format (need BC7 in DX10 header)".to_string()),
    };

    // Top mip only.
    let expected_len = width.div_ceil(4) as usize * height.div_ceil(4) as usize * 16;
    let data: &[u8] = dds.data.as_ref();
    if data.len() < expected_len {
        return Err(format!(
            "DDS data too small for BC7 level 0: got={}, need={expected_len}",
            data.len()
        ));
    }

    Ok(Decoded::Bc7 {
        blocks: data[..expected_len].to_vec(),
        width,
        height,
        srgb,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reports_every_candidate() {
        let err = resolve_texture_path("assets/img/definitely-missing.png").unwrap_err();
        assert!(err.contains("definitely-missing.png"));
    }

    #[test]
    fn absolute_paths_are_not_rebased() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("sky.png");
        std::fs::write(&p, b"not really a png").unwrap();

        let uri = format!("file://{}", p.display());
        assert_eq!(resolve_texture_path(&uri).unwrap(), p);

        let record = TextureRecord {
            uri,
            format: TextureFormat::Rgba8,
            srgb: true,
        };
        assert!(load_and_decode(&record).unwrap_err().starts_with("decode"));
    }

    #[test]
    fn shipped_default_images_decode() {
        let defaults = crate::engine::config::Config::default();
        let uris = defaults
            .panorama
            .scenes
            .iter()
            .map(|s| s.src.clone())
            .chain([defaults.panorama.cloud_texture, defaults.mountain.cloud_texture]);

        for uri in uris {
            let record = TextureRecord {
                format: TextureFormat::from_uri(&uri),
                uri,
                srgb: true,
            };
            match load_and_decode(&record) {
                Ok(Decoded::Rgba8 { rgba, width, height }) => {
                    assert!(width > 0 && height > 0);
                    assert_eq!(rgba.len(), (width * height * 4) as usize);
                }
                Ok(Decoded::Bc7 { .. }) => panic!("{}: expected rgba8", record.uri),
                Err(e) => panic!("{}: {e}", record.uri),
            }
        }
    }

    #[test]
    fn garbage_dds_is_rejected() {
        assert!(decode_dds_bc7(&[0u8; 16]).is_err());
    }
}
