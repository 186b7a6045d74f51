//! Backend that records what it is asked to do instead of touching a GPU.
//!
//! Used for `--headless-frames` runs and by the viewer tests.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::engine::EngineResult;
use crate::engine::graphics::mesh::CpuMesh;
use crate::engine::graphics::primitives::{MeshHandle, TextureHandle};
use crate::engine::graphics::renderer::{BackendFactory, BackendResult, RenderBackend};
use crate::engine::graphics::visual_world::VisualWorld;
use crate::engine::mount::Mount;

/// Observable state of every headless backend made by one factory.
#[derive(Debug, Default)]
pub struct HeadlessLedger {
    pub live_meshes: HashSet<MeshHandle>,
    pub live_textures: HashSet<TextureHandle>,
    pub frames: u64,
    pub last_size: Option<(u32, u32)>,
    pub last_draw_count: usize,
    pub backends_created: u32,
    pub backends_disposed: u32,
    next_id: u32,
}

impl HeadlessLedger {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

pub type SharedLedger = Rc<RefCell<HeadlessLedger>>;

pub struct HeadlessBackend {
    ledger: SharedLedger,
    meshes: Vec<MeshHandle>,
    textures: Vec<TextureHandle>,
    disposed: bool,
}

impl HeadlessBackend {
    pub fn new(ledger: SharedLedger) -> Self {
        ledger.borrow_mut().backends_created += 1;
        Self {
            ledger,
            meshes: Vec::new(),
            textures: Vec::new(),
            disposed: false,
        }
    }

    fn check_live(&self) -> BackendResult<()> {
        if self.disposed {
            return Err("headless backend used after dispose".into());
        }
        Ok(())
    }

    fn new_texture(&mut self) -> TextureHandle {
        let mut l = self.ledger.borrow_mut();
        let h = TextureHandle(l.next_id());
        l.live_textures.insert(h);
        self.textures.push(h);
        h
    }
}

impl RenderBackend for HeadlessBackend {
    fn upload_mesh(&mut self, mesh: &CpuMesh) -> BackendResult<MeshHandle> {
        self.check_live()?;
        if mesh.indices_u32.is_empty() {
            return Err("upload_mesh: empty index buffer".into());
        }
        let mut l = self.ledger.borrow_mut();
        let h = MeshHandle(l.next_id());
        l.live_meshes.insert(h);
        self.meshes.push(h);
        Ok(h)
    }

    fn release_mesh(&mut self, mesh: MeshHandle) {
        self.meshes.retain(|m| *m != mesh);
        self.ledger.borrow_mut().live_meshes.remove(&mesh);
    }

    fn upload_texture_rgba8(
        &mut self,
        rgba: &[u8],
        width: u32,
        height: u32,
        _srgb: bool,
    ) -> BackendResult<TextureHandle> {
        self.check_live()?;
        if rgba.len() != (width as usize) * (height as usize) * 4 {
            return Err(format!("rgba8 size mismatch for {width}x{height}").into());
        }
        Ok(self.new_texture())
    }

    fn upload_texture_bc7(
        &mut self,
        bc7_blocks: &[u8],
        width: u32,
        height: u32,
        _srgb: bool,
    ) -> BackendResult<TextureHandle> {
        self.check_live()?;
        let blocks = (width.div_ceil(4) as usize) * (height.div_ceil(4) as usize);
        if bc7_blocks.len() < blocks * 16 {
            return Err(format!("bc7 data too short for {width}x{height}").into());
        }
        Ok(self.new_texture())
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        self.textures.retain(|t| *t != texture);
        self.ledger.borrow_mut().live_textures.remove(&texture);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.ledger.borrow_mut().last_size = Some((width, height));
    }

    fn render(&mut self, visuals: &VisualWorld) -> BackendResult<()> {
        self.check_live()?;
        let draw_count = visuals.draw_list().len();
        let mut l = self.ledger.borrow_mut();
        l.frames += 1;
        l.last_draw_count = draw_count;
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let mut l = self.ledger.borrow_mut();
        for m in self.meshes.drain(..) {
            l.live_meshes.remove(&m);
        }
        for t in self.textures.drain(..) {
            l.live_textures.remove(&t);
        }
        l.backends_disposed += 1;
        self.disposed = true;
    }
}

/// Hands out headless backends that all report into one ledger.
#[derive(Default)]
pub struct HeadlessBackendFactory {
    ledger: SharedLedger,
}

impl HeadlessBackendFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> SharedLedger {
        Rc::clone(&self.ledger)
    }
}

impl BackendFactory for HeadlessBackendFactory {
    fn create_backend(&mut self, _mount: &dyn Mount) -> EngineResult<Box<dyn RenderBackend>> {
        Ok(Box::new(HeadlessBackend::new(self.ledger())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graphics::mesh::MeshFactory;

    #[test]
    fn dispose_frees_everything_the_backend_uploaded() {
        let factory = HeadlessBackendFactory::new();
        let ledger = factory.ledger();
        let mut b = HeadlessBackend::new(factory.ledger());

        let m = b.upload_mesh(&MeshFactory::plane(1.0, 1.0)).unwrap();
        b.upload_texture_rgba8(&[0; 16], 2, 2, true).unwrap();
        assert_eq!(ledger.borrow().live_meshes.len(), 1);
        assert_eq!(ledger.borrow().live_textures.len(), 1);

        b.release_mesh(m);
        assert!(ledger.borrow().live_meshes.is_empty());

        b.dispose();
        assert!(ledger.borrow().live_textures.is_empty());
        assert_eq!(ledger.borrow().backends_disposed, 1);
        assert!(b.render(&VisualWorld::new()).is_err());
    }

    #[test]
    fn texture_upload_checks_payload_size() {
        let mut b = HeadlessBackend::new(SharedLedger::default());
        assert!(b.upload_texture_rgba8(&[0; 15], 2, 2, false).is_err());
        assert!(b.upload_texture_bc7(&[0; 16], 4, 4, false).is_ok());
        assert!(b.upload_texture_bc7(&[0; 16], 8, 4, false).is_err());
    }
}
