use std::f32::consts::PI;
use std::path::Path;

use glam::Vec3;

use crate::AssetError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// CPU-side indexed triangle list.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Loads the first model of an OBJ file, triangulated with a single index stream.
    /// Smooth normals are generated when the file carries none.
    pub fn from_obj(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        log::info!("[Assets] Loading mesh: {}", path.display());

        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                single_index: true,
                triangulate: true,
                ..Default::default()
            },
        )?;

        let mesh = models
            .into_iter()
            .next()
            .map(|m| m.mesh)
            .filter(|m| !m.indices.is_empty())
            .ok_or_else(|| AssetError::EmptyMesh(path.display().to_string()))?;

        let vertex_count = mesh.positions.len() / 3;
        let has_normals = mesh.normals.len() == mesh.positions.len();
        let has_uvs = mesh.texcoords.len() / 2 == vertex_count;

        let vertices = (0..vertex_count)
            .map(|i| Vertex {
                position: [
                    mesh.positions[i * 3],
                    mesh.positions[i * 3 + 1],
                    mesh.positions[i * 3 + 2],
                ],
                normal: if has_normals {
                    [
                        mesh.normals[i * 3],
                        mesh.normals[i * 3 + 1],
                        mesh.normals[i * 3 + 2],
                    ]
                } else {
                    [0.0; 3]
                },
                uv: if has_uvs {
                    [mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1]]
                } else {
                    [0.0; 2]
                },
            })
            .collect();

        let mut data = Self {
            vertices,
            indices: mesh.indices,
        };

        if !has_normals {
            log::debug!("[Assets] {} has no normals, generating", path.display());
            data.compute_smooth_normals();
        }

        Ok(data)
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Area-weighted vertex normals from the triangle list.
    pub fn compute_smooth_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertices.len()];

        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let pa = Vec3::from(self.vertices[a].position);
            let pb = Vec3::from(self.vertices[b].position);
            let pc = Vec3::from(self.vertices[c].position);
            // Unnormalised cross product weights by triangle area
            let n = (pb - pa).cross(pc - pa);
            accum[a] += n;
            accum[b] += n;
            accum[c] += n;
        }

        for (vertex, n) in self.vertices.iter_mut().zip(accum) {
            vertex.normal = n.normalize_or_zero().to_array();
        }
    }

    /// Axis-aligned cube spanning [-1, 1], outward normals, counter-clockwise faces.
    /// Used by the skybox and the cubemap renders.
    pub fn unit_cube() -> Self {
        // (normal, tangent u, tangent v) per face
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in faces {
            let base = vertices.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let p = normal + u * su + v * sv;
                vertices.push(Vertex {
                    position: p.to_array(),
                    normal: normal.to_array(),
                    uv: [(su + 1.0) * 0.5, (1.0 - sv) * 0.5],
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self { vertices, indices }
    }

    /// UV sphere of radius 1 (the lamp bulb when no sphere OBJ is configured).
    pub fn uv_sphere(segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
        for r in 0..=rings {
            let v = r as f32 / rings as f32;
            let theta = v * PI;
            for s in 0..=segments {
                let u = s as f32 / segments as f32;
                let phi = u * 2.0 * PI;
                let n = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                vertices.push(Vertex {
                    position: n.to_array(),
                    normal: n.to_array(),
                    uv: [u, v],
                });
            }
        }

        let stride = segments + 1;
        let mut indices = Vec::with_capacity((segments * rings * 6) as usize);
        for r in 0..rings {
            for s in 0..segments {
                let a = r * stride + s;
                let b = a + stride;
                indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }

        Self { vertices, indices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn winding_normal(mesh: &MeshData, tri: &[u32]) -> Vec3 {
        let p = |i: u32| Vec3::from(mesh.vertices[i as usize].position);
        (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]))
    }

    #[test]
    fn cube_faces_wind_outward() {
        let cube = MeshData::unit_cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.index_count(), 36);

        for tri in cube.indices.chunks_exact(3) {
            let n = Vec3::from(cube.vertices[tri[0] as usize].normal);
            assert!(winding_normal(&cube, tri).dot(n) > 0.0);
        }
    }

    #[test]
    fn sphere_winds_outward() {
        let sphere = MeshData::uv_sphere(16, 8);
        for tri in sphere.indices.chunks_exact(3) {
            let w = winding_normal(&sphere, tri);
            if w.length_squared() < 1e-10 {
                // Degenerate pole triangles
                continue;
            }
            let center = (Vec3::from(sphere.vertices[tri[0] as usize].position)
                + Vec3::from(sphere.vertices[tri[1] as usize].position)
                + Vec3::from(sphere.vertices[tri[2] as usize].position))
                / 3.0;
            assert!(w.dot(center) > 0.0);
        }
    }

    #[test]
    fn smooth_normals_match_sphere_positions() {
        let mut sphere = MeshData::uv_sphere(24, 12);
        for v in &mut sphere.vertices {
            v.normal = [0.0; 3];
        }
        sphere.compute_smooth_normals();

        for v in &sphere.vertices[30..60] {
            let n = Vec3::from(v.normal);
            let p = Vec3::from(v.position);
            assert!(n.dot(p) > 0.95);
        }
    }

    #[test]
    fn missing_obj_is_an_error() {
        assert!(MeshData::from_obj("no/such/bunny.obj").is_err());
    }
}
