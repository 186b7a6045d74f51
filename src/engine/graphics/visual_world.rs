use slotmap::SlotMap;

use crate::engine::graphics::primitives::{
    AmbientLight, DirectionalLight, Fog, InstanceHandle, Material, MeshHandle, RenderLayer,
    TextureHandle,
};

/// GPU-ready draw record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instance {
    pub model: [[f32; 4]; 4],
    pub mesh: MeshHandle,
    pub material: Material,
    pub texture: Option<TextureHandle>,
    pub layer: RenderLayer,
}

/// Camera data the renderer needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub position: [f32; 3],
}

impl Default for CameraMatrices {
    fn default() -> Self {
        let id = glam::Mat4::IDENTITY.to_cols_array_2d();
        Self {
            view: id,
            proj: id,
            position: [0.0; 3],
        }
    }
}

/// Renderer-facing view of the scene: instances, camera, lights and environment.
#[derive(Debug, Default)]
pub struct VisualWorld {
    instances: SlotMap<InstanceHandle, Instance>,
    camera: CameraMatrices,
    viewport: [f32; 2],
    /// `None` clears to transparent black.
    clear_color: Option<[f32; 3]>,
    fog: Option<Fog>,
    ambient: Vec<AmbientLight>,
    directional: Vec<DirectionalLight>,
}

impl VisualWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instance: Instance) -> InstanceHandle {
        self.instances.insert(instance)
    }

    pub fn remove(&mut self, handle: InstanceHandle) -> Option<Instance> {
        self.instances.remove(handle)
    }

    pub fn get(&self, handle: InstanceHandle) -> Option<&Instance> {
        self.instances.get(handle)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn update_model(&mut self, handle: InstanceHandle, model: [[f32; 4]; 4]) -> bool {
        match self.instances.get_mut(handle) {
            Some(inst) => {
                inst.model = model;
                true
            }
            None => false,
        }
    }

    pub fn update_texture(&mut self, handle: InstanceHandle, texture: Option<TextureHandle>) -> bool {
        match self.instances.get_mut(handle) {
            Some(inst) => {
                inst.texture = texture;
                true
            }
            None => false,
        }
    }

    pub fn update_color(&mut self, handle: InstanceHandle, color: [f32; 3]) -> bool {
        match self.instances.get_mut(handle) {
            Some(inst) => {
                inst.material.color = color;
                true
            }
            None => false,
        }
    }

    pub fn set_camera(&mut self, camera: CameraMatrices) {
        self.camera = camera;
    }

    pub fn camera(&self) -> &CameraMatrices {
        &self.camera
    }

    pub fn set_viewport(&mut self, size: [f32; 2]) {
        self.viewport = size;
    }

    pub fn viewport(&self) -> [f32; 2] {
        self.viewport
    }

    pub fn set_clear_color(&mut self, color: Option<[f32; 3]>) {
        self.clear_color = color;
    }

    pub fn clear_color(&self) -> Option<[f32; 3]> {
        self.clear_color
    }

    pub fn set_fog(&mut self, fog: Option<Fog>) {
        self.fog = fog;
    }

    pub fn fog(&self) -> Option<Fog> {
        self.fog
    }

    pub fn set_lights(&mut self, ambient: Vec<AmbientLight>, directional: Vec<DirectionalLight>) {
        self.ambient = ambient;
        self.directional = directional;
    }

    /// Sum of all ambient lights (colour × intensity).
    pub fn ambient(&self) -> [f32; 3] {
        self.ambient.iter().fold([0.0; 3], |acc, l| {
            [
                acc[0] + l.color[0] * l.intensity,
                acc[1] + l.color[1] * l.intensity,
                acc[2] + l.color[2] * l.intensity,
            ]
        })
    }

    pub fn directional_lights(&self) -> &[DirectionalLight] {
        &self.directional
    }

    /// Instances in submission order: by layer, opaque before blended within a layer,
    /// blended back-to-front.
    pub fn draw_list(&self) -> Vec<(InstanceHandle, &Instance)> {
        let eye = glam::Vec3::from(self.camera.position);
        let depth = |inst: &Instance| -> f32 {
            let p = glam::Vec3::new(inst.model[3][0], inst.model[3][1], inst.model[3][2]);
            p.distance_squared(eye)
        };

        let mut list: Vec<(InstanceHandle, &Instance)> = self.instances.iter().collect();
        list.sort_by(|(_, a), (_, b)| {
            a.layer
                .cmp(&b.layer)
                .then(a.material.is_blended().cmp(&b.material.is_blended()))
                .then_with(|| {
                    if a.material.is_blended() && b.material.is_blended() {
                        depth(b).total_cmp(&depth(a))
                    } else {
                        std::cmp::Ordering::Equal
                    }
                })
        });
        list
    }
}
