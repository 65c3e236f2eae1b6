use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::{mesh::Indices, render_resource::PrimitiveTopology};

/// Extrudes a closed planar ring into a prism: fan-triangulated top cap plus
/// side walls from `base` up to `base + depth`. Ring points are scene-frame
/// (x, z) pairs; the fan cap assumes a roughly convex ring, which holds for
/// the building and floor outlines these datasets carry.
pub fn extrude_ring_mesh(ring: &[Vec2], base: f32, depth: f32) -> Mesh {
    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    );
    if ring.len() < 3 {
        warn!("extruded ring needs at least 3 vertices, got {}", ring.len());
        return mesh;
    }

    // Drop a duplicated closing vertex so wall quads don't degenerate.
    let ring = if ring.len() > 3 && ring.first() == ring.last() {
        &ring[..ring.len() - 1]
    } else {
        ring
    };
    let n = ring.len();
    let top = base + depth;

    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(n * 5);
    let mut normals: Vec<[f32; 3]> = Vec::with_capacity(n * 5);
    let mut uvs: Vec<[f32; 2]> = Vec::with_capacity(n * 5);
    let mut indices: Vec<u32> = Vec::with_capacity((n - 2) * 3 + n * 6);

    // Top cap
    for p in ring {
        positions.push([p.x, top, p.y]);
        normals.push([0.0, 1.0, 0.0]);
        uvs.push([0.0, 0.0]);
    }
    for i in 1..(n - 1) as u32 {
        indices.extend_from_slice(&[0, i, i + 1]);
    }

    // Side walls, one quad per edge with its own flat normal
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        let edge = b - a;
        let normal = Vec3::new(edge.y, 0.0, -edge.x).normalize_or_zero();

        let start = positions.len() as u32;
        positions.push([a.x, base, a.y]);
        positions.push([b.x, base, b.y]);
        positions.push([b.x, top, b.y]);
        positions.push([a.x, top, a.y]);
        for _ in 0..4 {
            normals.push(normal.to_array());
        }
        uvs.extend_from_slice(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        indices.extend_from_slice(&[start, start + 1, start + 2, start, start + 2, start + 3]);
    }

    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

/// Flat ribbon along an open path, lying in the XZ plane at `elevation`.
/// Used for unclosed line features such as corridors and platform edges.
pub fn ribbon_mesh(path: &[Vec2], elevation: f32, width: f32) -> Mesh {
    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    );
    if path.len() < 2 {
        warn!("ribbon needs at least 2 path vertices, got {}", path.len());
        return mesh;
    }

    let n = path.len();
    let half = width * 0.5;
    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(n * 2);
    let mut normals: Vec<[f32; 3]> = Vec::with_capacity(n * 2);
    let mut uvs: Vec<[f32; 2]> = Vec::with_capacity(n * 2);
    let mut indices: Vec<u32> = Vec::with_capacity((n - 1) * 6);

    for i in 0..n {
        let tangent = if i == 0 {
            (path[1] - path[0]).normalize_or_zero()
        } else if i == n - 1 {
            (path[i] - path[i - 1]).normalize_or_zero()
        } else {
            ((path[i + 1] - path[i]).normalize_or_zero()
                + (path[i] - path[i - 1]).normalize_or_zero())
            .normalize_or_zero()
        };
        let side = Vec2::new(-tangent.y, tangent.x) * half;

        let v = i as f32 / (n - 1) as f32;
        let left = path[i] - side;
        let right = path[i] + side;
        positions.push([left.x, elevation, left.y]);
        positions.push([right.x, elevation, right.y]);
        normals.push([0.0, 1.0, 0.0]);
        normals.push([0.0, 1.0, 0.0]);
        uvs.push([0.0, v]);
        uvs.push([1.0, v]);
    }

    for i in 0..(n - 1) as u32 {
        let bl = i * 2;
        let br = bl + 1;
        let tl = bl + 2;
        let tr = bl + 3;
        indices.extend_from_slice(&[bl, tl, br, br, tl, tr]);
    }

    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

/// One line primitive per network link segment.
pub fn line_segments_mesh(segments: &[[Vec3; 2]]) -> Mesh {
    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(segments.len() * 2);
    let mut normals: Vec<[f32; 3]> = Vec::with_capacity(segments.len() * 2);
    for [a, b] in segments {
        positions.push(a.to_array());
        positions.push(b.to_array());
        normals.push([0.0, 1.0, 0.0]);
        normals.push([0.0, 1.0, 0.0]);
    }

    let mut mesh = Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ]
    }

    #[test]
    fn extruded_square_has_cap_and_walls() {
        let mesh = extrude_ring_mesh(&square(), 12.0, 3.0);
        // 4 cap vertices + 4 walls x 4 vertices
        assert_eq!(mesh.count_vertices(), 4 + 16);
        let indices = mesh.indices().unwrap().len();
        // 2 cap triangles + 2 per wall
        assert_eq!(indices, 2 * 3 + 4 * 6);
    }

    #[test]
    fn extrusion_drops_duplicated_closing_vertex() {
        let mut ring = square();
        ring.push(ring[0]);
        let mesh = extrude_ring_mesh(&ring, 0.0, 1.0);
        assert_eq!(mesh.count_vertices(), 4 + 16);
    }

    #[test]
    fn degenerate_ring_yields_empty_mesh() {
        let mesh = extrude_ring_mesh(&[Vec2::ZERO, Vec2::ONE], 0.0, 1.0);
        assert_eq!(mesh.count_vertices(), 0);
    }

    #[test]
    fn ribbon_spans_path() {
        let path = [Vec2::new(0.0, 0.0), Vec2::new(5.0, 0.0), Vec2::new(10.0, 0.0)];
        let mesh = ribbon_mesh(&path, 1.0, 2.0);
        assert_eq!(mesh.count_vertices(), 6);
        assert_eq!(mesh.indices().unwrap().len(), 12);
    }

    #[test]
    fn line_mesh_pairs_vertices() {
        let segments = [
            [Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)],
            [Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 1.0)],
        ];
        let mesh = line_segments_mesh(&segments);
        assert_eq!(mesh.count_vertices(), 4);
    }
}
