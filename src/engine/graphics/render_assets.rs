use std::collections::HashMap;

use crate::engine::graphics::mesh::CpuMesh;
use crate::engine::graphics::primitives::{CpuMeshHandle, MeshHandle};
use crate::engine::graphics::renderer::{BackendResult, RenderBackend};

#[derive(Debug, Clone, Copy)]
struct Upload {
    gpu: MeshHandle,
    users: u32,
}

/// Bridges CPU mesh identity to renderer-owned GPU meshes.
///
/// - Scene code refers to geometry by `CpuMeshHandle`.
/// - The first user uploads; later users share the upload.
/// - The last `release` frees the GPU mesh and drops the CPU copy; the handle is dead
///   afterwards.
#[derive(Debug, Default)]
pub struct RenderAssets {
    cpu_meshes: Vec<Option<CpuMesh>>,
    gpu_meshes: HashMap<CpuMeshHandle, Upload>,
}

impl RenderAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_mesh(&mut self, mesh: CpuMesh) -> CpuMeshHandle {
        let h = CpuMeshHandle(self.cpu_meshes.len() as u32);
        self.cpu_meshes.push(Some(mesh));
        h
    }

    pub fn cpu_mesh(&self, h: CpuMeshHandle) -> Option<&CpuMesh> {
        self.cpu_meshes.get(h.0 as usize)?.as_ref()
    }

    /// CPU meshes still held.
    pub fn cpu_len(&self) -> usize {
        self.cpu_meshes.iter().filter(|m| m.is_some()).count()
    }

    /// Get (or upload) the GPU mesh for `cpu_mesh` and count one more user.
    pub fn acquire(
        &mut self,
        backend: &mut dyn RenderBackend,
        cpu_mesh: CpuMeshHandle,
    ) -> BackendResult<MeshHandle> {
        if let Some(up) = self.gpu_meshes.get_mut(&cpu_mesh) {
            up.users += 1;
            return Ok(up.gpu);
        }

        let mesh = self
            .cpu_mesh(cpu_mesh)
            .ok_or("RenderAssets: invalid or released CpuMeshHandle")?;
        let gpu = backend.upload_mesh(mesh)?;
        self.gpu_meshes.insert(cpu_mesh, Upload { gpu, users: 1 });
        Ok(gpu)
    }

    /// Drop one user; frees the GPU mesh and the CPU copy when none remain.
    pub fn release(&mut self, backend: &mut dyn RenderBackend, cpu_mesh: CpuMeshHandle) {
        let Some(up) = self.gpu_meshes.get_mut(&cpu_mesh) else {
            return;
        };
        up.users = up.users.saturating_sub(1);
        if up.users == 0 {
            let gpu = up.gpu;
            self.gpu_meshes.remove(&cpu_mesh);
            backend.release_mesh(gpu);
            if let Some(slot) = self.cpu_meshes.get_mut(cpu_mesh.0 as usize) {
                *slot = None;
            }
        }
    }

    /// Free every GPU mesh regardless of users, and every CPU mesh.
    pub fn release_all(&mut self, backend: &mut dyn RenderBackend) {
        for (_, up) in self.gpu_meshes.drain() {
            backend.release_mesh(up.gpu);
        }
        self.cpu_meshes.clear();
    }

    pub fn uploaded_len(&self) -> usize {
        self.gpu_meshes.len()
    }
}
