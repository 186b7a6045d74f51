//! CPU-side procedural mesh generation.
//!
//! These meshes are staging data. The renderer uploads them into GPU vertex/index
//! buffers and returns a `MeshHandle` referenced by `VisualWorld` instances.

use std::f32::consts::{PI, TAU};

use vulkano::buffer::BufferContents;
use vulkano::pipeline::graphics::vertex_input::Vertex;

/// Vertex layout shared by every procedural mesh.
#[derive(BufferContents, Vertex, Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct CpuVertex {
    #[format(R32G32B32_SFLOAT)]
    pub pos: [f32; 3],
    #[format(R32G32B32_SFLOAT)]
    pub normal: [f32; 3],
    #[format(R32G32_SFLOAT)]
    pub uv: [f32; 2],
}

/// Indexed triangle list.
///
/// Front faces are counter-clockwise in object space.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuMesh {
    pub vertices: Vec<CpuVertex>,
    pub indices_u32: Vec<u32>,
}

impl CpuMesh {
    pub fn new(vertices: Vec<CpuVertex>, indices_u32: Vec<u32>) -> Self {
        Self {
            vertices,
            indices_u32,
        }
    }

    pub fn index_count(&self) -> u32 {
        self.indices_u32.len() as u32
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// Mirror across the YZ plane. Winding is kept, so faces that pointed out now
    /// point in (used to view a sphere from inside).
    pub fn mirrored_x(mut self) -> Self {
        for v in &mut self.vertices {
            v.pos[0] = -v.pos[0];
            v.normal[0] = -v.normal[0];
        }
        self
    }
}

pub struct MeshFactory;

impl MeshFactory {
    /// UV sphere with `width_segments` around and `height_segments` pole to pole.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> CpuMesh {
        let ws = width_segments.max(3);
        let hs = height_segments.max(2);

        let mut vertices = Vec::with_capacity(((ws + 1) * (hs + 1)) as usize);
        for iy in 0..=hs {
            let v = iy as f32 / hs as f32;
            for ix in 0..=ws {
                let u = ix as f32 / ws as f32;
                let n = [
                    -(u * TAU).cos() * (v * PI).sin(),
                    (v * PI).cos(),
                    (u * TAU).sin() * (v * PI).sin(),
                ];
                vertices.push(CpuVertex {
                    pos: [n[0] * radius, n[1] * radius, n[2] * radius],
                    normal: n,
                    uv: [u, 1.0 - v],
                });
            }
        }

        let row = ws + 1;
        let mut indices = Vec::new();
        for iy in 0..hs {
            for ix in 0..ws {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != hs - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        CpuMesh::new(vertices, indices)
    }

    /// Cone standing on the XZ plane, centred on the origin, tip at `+height / 2`.
    pub fn cone(radius: f32, height: f32, radial_segments: u32) -> CpuMesh {
        let rs = radial_segments.max(3);
        let half = height * 0.5;
        let slope = radius / height;

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        // Side: two rings, tip (radius 0) then base.
        for y in 0..=1u32 {
            let v = y as f32;
            let ring_radius = v * radius;
            for x in 0..=rs {
                let u = x as f32 / rs as f32;
                let theta = u * TAU;
                let (sin_t, cos_t) = theta.sin_cos();
                let n = glam::Vec3::new(sin_t, slope, cos_t).normalize();
                vertices.push(CpuVertex {
                    pos: [ring_radius * sin_t, -v * height + half, ring_radius * cos_t],
                    normal: n.to_array(),
                    uv: [u, 1.0 - v],
                });
            }
        }
        let row = rs + 1;
        for x in 0..rs {
            let b = row + x;
            let c = row + x + 1;
            let d = x + 1;
            indices.extend_from_slice(&[b, c, d]);
        }

        // Base cap.
        let center_start = vertices.len() as u32;
        for _ in 0..rs {
            vertices.push(CpuVertex {
                pos: [0.0, -half, 0.0],
                normal: [0.0, -1.0, 0.0],
                uv: [0.5, 0.5],
            });
        }
        let ring_start = vertices.len() as u32;
        for x in 0..=rs {
            let theta = x as f32 / rs as f32 * TAU;
            let (sin_t, cos_t) = theta.sin_cos();
            vertices.push(CpuVertex {
                pos: [radius * sin_t, -half, radius * cos_t],
                normal: [0.0, -1.0, 0.0],
                uv: [cos_t * 0.5 + 0.5, -sin_t * 0.5 + 0.5],
            });
        }
        for x in 0..rs {
            let c = center_start + x;
            let i = ring_start + x;
            indices.extend_from_slice(&[i + 1, i, c]);
        }

        CpuMesh::new(vertices, indices)
    }

    /// Single-quad plane in XY facing +Z.
    pub fn plane(width: f32, height: f32) -> CpuMesh {
        let hw = width * 0.5;
        let hh = height * 0.5;
        let v = |x: f32, y: f32, u: f32, t: f32| CpuVertex {
            pos: [x, y, 0.0],
            normal: [0.0, 0.0, 1.0],
            uv: [u, t],
        };

        let vertices = vec![
            v(-hw, hh, 0.0, 1.0),  // 0 top-left
            v(hw, hh, 1.0, 1.0),   // 1 top-right
            v(-hw, -hh, 0.0, 0.0), // 2 bottom-left
            v(hw, -hh, 1.0, 0.0),  // 3 bottom-right
        ];

        CpuMesh::new(vertices, vec![0, 2, 1, 2, 3, 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_normal(m: &CpuMesh, tri: usize) -> glam::Vec3 {
        let i = &m.indices_u32[tri * 3..tri * 3 + 3];
        let p = |k: u32| glam::Vec3::from(m.vertices[k as usize].pos);
        (p(i[1]) - p(i[0])).cross(p(i[2]) - p(i[0]))
    }

    #[test]
    fn sphere_counts() {
        let m = MeshFactory::sphere(500.0, 128, 128);
        assert_eq!(m.vertex_count(), 129 * 129);
        // Pole rows contribute one triangle per segment, the rest two.
        assert_eq!(m.index_count(), 128 * (2 * 128 - 2) * 3);
    }

    #[test]
    fn sphere_vertices_sit_on_radius() {
        let m = MeshFactory::sphere(2.0, 16, 8);
        for v in &m.vertices {
            let len = glam::Vec3::from(v.pos).length();
            assert!((len - 2.0).abs() < 1e-4);
        }
    }

    #[test]
    fn sphere_faces_outward_until_mirrored() {
        let m = MeshFactory::sphere(1.0, 16, 8);
        // A triangle from a middle row.
        let tri = 16 * 3;
        let centroid = {
            let i = &m.indices_u32[tri * 3..tri * 3 + 3];
            i.iter()
                .map(|&k| glam::Vec3::from(m.vertices[k as usize].pos))
                .sum::<glam::Vec3>()
                / 3.0
        };
        assert!(face_normal(&m, tri).dot(centroid) > 0.0);

        let inward = m.mirrored_x();
        let centroid_m = glam::Vec3::new(-centroid.x, centroid.y, centroid.z);
        assert!(face_normal(&inward, tri).dot(centroid_m) < 0.0);
    }

    #[test]
    fn cone_counts_and_extent() {
        let m = MeshFactory::cone(5.0, 8.0, 32);
        assert_eq!(m.vertex_count(), 2 * 33 + 32 + 33);
        assert_eq!(m.index_count(), 32 * 3 * 2);

        let max_y = m.vertices.iter().map(|v| v.pos[1]).fold(f32::MIN, f32::max);
        let min_y = m.vertices.iter().map(|v| v.pos[1]).fold(f32::MAX, f32::min);
        assert!((max_y - 4.0).abs() < 1e-5);
        assert!((min_y + 4.0).abs() < 1e-5);
    }

    #[test]
    fn plane_faces_plus_z() {
        let m = MeshFactory::plane(4.0, 2.0);
        assert_eq!(m.vertex_count(), 4);
        assert!(face_normal(&m, 0).z > 0.0);
        assert!(face_normal(&m, 1).z > 0.0);
        assert_eq!(m.vertices[1].pos, [2.0, 1.0, 0.0]);
    }
}
