//! Procedural meshes.
//!
//! Pure builders with no scene dependency. Every mesh comes back with one
//! subset spanning all indices and its bounds already computed, so it can be
//! inserted into a scene as is.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::components::{MeshComponent, MeshSubset};

/// Wrap `mesh` in a single subset and compute its bounds.
fn finish(mut mesh: MeshComponent) -> MeshComponent {
    mesh.subsets.push(MeshSubset {
        index_offset: 0,
        index_count: mesh.indices.len() as u32,
        ..Default::default()
    });
    mesh.create_render_data();
    mesh
}

/// A quad in the XY plane facing +Z with half extents `scale.x`, `scale.y`.
pub fn make_plane_mesh(scale: Vec3) -> MeshComponent {
    let (x, y) = (scale.x, scale.y);
    let mesh = MeshComponent {
        positions: vec![
            Vec3::new(-x, y, 0.0),
            Vec3::new(-x, -y, 0.0),
            Vec3::new(x, -y, 0.0),
            Vec3::new(x, y, 0.0),
        ],
        normals: vec![Vec3::Z; 4],
        texcoords_0: vec![
            Vec2::new(0.0, 1.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
        ],
        indices: vec![0, 1, 3, 3, 1, 2],
        ..Default::default()
    };
    finish(mesh)
}

/// An axis-aligned box with half extents `scale`, four vertices per face.
pub fn make_cube_mesh(scale: Vec3) -> MeshComponent {
    let s = scale;
    // Faces in -Z, +Z, -X, +X, -Y, +Y order.
    let positions = vec![
        Vec3::new(-s.x, s.y, -s.z),
        Vec3::new(-s.x, -s.y, -s.z),
        Vec3::new(s.x, -s.y, -s.z),
        Vec3::new(s.x, s.y, -s.z),
        Vec3::new(-s.x, s.y, s.z),
        Vec3::new(-s.x, -s.y, s.z),
        Vec3::new(s.x, -s.y, s.z),
        Vec3::new(s.x, s.y, s.z),
        Vec3::new(-s.x, -s.y, s.z),
        Vec3::new(-s.x, -s.y, -s.z),
        Vec3::new(-s.x, s.y, -s.z),
        Vec3::new(-s.x, s.y, s.z),
        Vec3::new(s.x, -s.y, s.z),
        Vec3::new(s.x, -s.y, -s.z),
        Vec3::new(s.x, s.y, -s.z),
        Vec3::new(s.x, s.y, s.z),
        Vec3::new(-s.x, -s.y, s.z),
        Vec3::new(-s.x, -s.y, -s.z),
        Vec3::new(s.x, -s.y, -s.z),
        Vec3::new(s.x, -s.y, s.z),
        Vec3::new(-s.x, s.y, s.z),
        Vec3::new(-s.x, s.y, -s.z),
        Vec3::new(s.x, s.y, -s.z),
        Vec3::new(s.x, s.y, s.z),
    ];
    let face_normals = [Vec3::NEG_Z, Vec3::Z, Vec3::NEG_X, Vec3::X, Vec3::NEG_Y, Vec3::Y];
    let normals = face_normals.iter().flat_map(|&n| [n; 4]).collect();
    let texcoords_0 = (0..6)
        .flat_map(|_| {
            [
                Vec2::new(0.0, 0.0),
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(1.0, 0.0),
            ]
        })
        .collect();

    // Faces whose vertices wind clockwise seen from outside get the
    // opposite quad split so every triangle ends up counter-clockwise.
    let mut indices = Vec::with_capacity(36);
    for face in 0..6u32 {
        let base = face * 4;
        let quad: [u32; 6] = match face {
            0 | 2 | 5 => [0, 1, 2, 0, 2, 3],
            _ => [0, 2, 1, 0, 3, 2],
        };
        for tri in quad.chunks_exact(3) {
            indices.extend([base + tri[0], base + tri[2], base + tri[1]]);
        }
    }

    finish(MeshComponent {
        positions,
        normals,
        texcoords_0,
        indices,
        ..Default::default()
    })
}

/// A UV sphere; `rings` runs pole to pole, `sectors` around the Y axis.
///
/// # Panics
///
/// Panics if `rings` or `sectors` is zero.
pub fn make_sphere_mesh(radius: f32, rings: u32, sectors: u32) -> MeshComponent {
    assert!(rings > 0 && sectors > 0, "sphere needs at least one ring and sector");

    let mut mesh = MeshComponent::default();
    for step_x in 0..=sectors {
        for step_y in 0..=rings {
            let x_seg = step_x as f32 / sectors as f32;
            let y_seg = step_y as f32 / rings as f32;
            let normal = Vec3::new(
                (x_seg * 2.0 * PI).cos() * (y_seg * PI).sin(),
                (y_seg * PI).cos(),
                (x_seg * 2.0 * PI).sin() * (y_seg * PI).sin(),
            );
            mesh.positions.push(radius * normal);
            mesh.normals.push(normal);
            mesh.texcoords_0.push(Vec2::new(x_seg, y_seg));
        }
    }

    let stride = sectors + 1;
    for y in 0..rings {
        for x in 0..sectors {
            let a = y * stride + x;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            mesh.indices.extend([a, c, b, b, c, d]);
        }
    }

    finish(mesh)
}

/// A capped cylinder along Y, centred on the origin.
///
/// # Panics
///
/// Panics if `sectors` is zero.
pub fn make_cylinder_mesh(radius: f32, height: f32, sectors: u32) -> MeshComponent {
    assert!(sectors > 0, "cylinder needs at least one sector");

    let mut mesh = MeshComponent::default();
    let heights = [0.5 * height, -0.5 * height];
    let rim = |index: u32| {
        let angle = 2.0 * PI * index as f32 / sectors as f32;
        (radius * angle.cos(), radius * angle.sin())
    };

    for index in 0..=sectors {
        let (x, z) = rim(index);
        let normal = Vec3::new(x, 0.0, z).normalize_or_zero();
        for h in heights {
            mesh.positions.push(Vec3::new(x, h, z));
            mesh.normals.push(normal);
            mesh.texcoords_0.push(Vec2::ZERO);
        }
    }
    for index in 0..sectors {
        let (a, c, b, d) = (2 * index, 2 * index + 1, 2 * index + 2, 2 * index + 3);
        mesh.indices.extend([a, b, c, c, b, d]);
    }

    for h in heights {
        let offset = mesh.positions.len() as u32;
        let normal = Vec3::new(0.0, h, 0.0).normalize_or_zero();
        for index in 0..=sectors {
            let (x, z) = rim(index);
            mesh.positions.push(Vec3::new(x, h, z));
            mesh.normals.push(normal);
            mesh.texcoords_0.push(Vec2::ZERO);
        }
        mesh.positions.push(Vec3::new(0.0, h, 0.0));
        mesh.normals.push(normal);
        mesh.texcoords_0.push(Vec2::ZERO);

        let center = mesh.positions.len() as u32 - 1;
        for index in 0..sectors {
            if h < 0.0 {
                mesh.indices.extend([offset + index, offset + index + 1, center]);
            } else {
                mesh.indices.extend([offset + index + 1, offset + index, center]);
            }
        }
    }

    finish(mesh)
}
