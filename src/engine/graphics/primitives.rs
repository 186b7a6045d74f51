use glam::{EulerRot, Mat4, Quat, Vec3};

/// CPU-side mesh identity (index into `RenderAssets`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CpuMeshHandle(pub u32);

/// Renderer-owned mesh resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// Renderer-owned texture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

slotmap::new_key_type! {
    /// Slot in `VisualWorld`.
    pub struct InstanceHandle;
}

/// `0xRRGGBB` to linear-ish 0..1 floats (no gamma conversion).
pub fn rgb_hex(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

/// Position, Euler rotation (XYZ order, radians) and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl Transform {
    pub fn from_position(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: [x, y, z],
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = [x, y, z];
        self
    }

    /// Column-major model matrix.
    pub fn model(&self) -> [[f32; 4]; 4] {
        let [rx, ry, rz] = self.rotation;
        Mat4::from_scale_rotation_translation(
            Vec3::from(self.scale),
            Quat::from_euler(EulerRot::XYZ, rx, ry, rz),
            Vec3::from(self.position),
        )
        .to_cols_array_2d()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shading {
    /// Colour/texture only, ignores lights.
    Unlit,
    /// Ambient + directional Lambert.
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Front,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub shading: Shading,
    pub color: [f32; 3],
    pub opacity: f32,
    pub transparent: bool,
    pub side: Side,
    pub depth_write: bool,
    pub roughness: f32,
    pub metalness: f32,
}

impl Material {
    pub fn unlit() -> Self {
        Self {
            shading: Shading::Unlit,
            color: [1.0, 1.0, 1.0],
            opacity: 1.0,
            transparent: false,
            side: Side::Front,
            depth_write: true,
            roughness: 1.0,
            metalness: 0.0,
        }
    }

    pub fn standard(color: [f32; 3]) -> Self {
        Self {
            shading: Shading::Standard,
            color,
            ..Self::unlit()
        }
    }

    /// Marks the material as alpha-blended with the given opacity.
    pub fn translucent(mut self, opacity: f32) -> Self {
        self.transparent = true;
        self.opacity = opacity;
        self
    }

    pub fn double_sided(mut self) -> Self {
        self.side = Side::Double;
        self
    }

    pub fn without_depth_write(mut self) -> Self {
        self.depth_write = false;
        self
    }

    pub fn with_surface(mut self, roughness: f32, metalness: f32) -> Self {
        self.roughness = roughness;
        self.metalness = metalness;
        self
    }

    pub fn is_blended(&self) -> bool {
        self.transparent || self.opacity < 1.0
    }
}

/// Coarse draw ordering: lower layers draw first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderLayer {
    Backdrop,
    Terrain,
    Decoration,
}

/// Exponential-squared fog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: [f32; 3],
    pub density: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    /// Unit vector pointing from the scene towards the light.
    pub direction: [f32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colour_unpacks() {
        assert_eq!(rgb_hex(0xffffff), [1.0, 1.0, 1.0]);
        let c = rgb_hex(0x888888);
        assert!((c[0] - 136.0 / 255.0).abs() < 1e-6);
        assert_eq!(c[0], c[2]);
    }

    #[test]
    fn model_carries_translation_in_last_column() {
        let t = Transform::from_position(1.0, 2.0, 3.0);
        let m = t.model();
        assert_eq!(m[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(m[0][0], 1.0);
    }

    #[test]
    fn y_rotation_turns_x_into_minus_z() {
        let t = Transform::default().with_rotation(0.0, std::f32::consts::FRAC_PI_2, 0.0);
        let m = Mat4::from_cols_array_2d(&t.model());
        let v = m.transform_vector3(Vec3::X);
        assert!((v - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn opacity_below_one_blends() {
        assert!(!Material::unlit().is_blended());
        assert!(Material::unlit().translucent(0.7).is_blended());
    }
}
