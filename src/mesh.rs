use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Vertex stride in floats: position.xyz, normal.xyz, texcoord.uv.
pub const VERTEX_STRIDE: usize = 8;

/// Interleaved mesh data ready for GPU upload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }
}

/// Parses an OBJ file from memory.
///
/// Supports `v`, `vn`, `vt` and polygonal `f` records (fan-triangulated).
/// Missing normals are computed from face geometry; missing texcoords
/// default to the origin.
pub fn load_obj_from_str(data: &str) -> Result<MeshData> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut texcoords = Vec::new();
    let mut faces: Vec<[FaceIndex; 3]> = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        match tag {
            "v" => positions.push(
                parse_vec3(parts)
                    .with_context(|| format!("invalid vertex on line {}", line_no + 1))?,
            ),
            "vn" => normals.push(
                parse_vec3(parts)
                    .with_context(|| format!("invalid normal on line {}", line_no + 1))?,
            ),
            "vt" => texcoords.push(
                parse_vec2(parts)
                    .with_context(|| format!("invalid texcoord on line {}", line_no + 1))?,
            ),
            "f" => {
                let polygon = parse_face(parts)
                    .with_context(|| format!("invalid face on line {}", line_no + 1))?;
                triangulate_face(&polygon, &mut faces);
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(anyhow!("OBJ file does not define any vertices"));
    }

    let mut mesh = build_mesh(&positions, &normals, &texcoords, &faces)?;
    if needs_normals(&mesh.vertices) {
        compute_normals(&mut mesh);
    }
    Ok(mesh)
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let x = next_component(&mut parts)?;
    let y = next_component(&mut parts)?;
    let z = next_component(&mut parts)?;
    Ok(Vec3::new(x, y, z))
}

fn parse_vec2<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec2> {
    let u = next_component(&mut parts)?;
    let v = next_component(&mut parts)?;
    Ok(Vec2::new(u, v))
}

fn next_component<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<f32> {
    Ok(parts
        .next()
        .ok_or_else(|| anyhow!("missing vector component"))?
        .parse::<f32>()?)
}

#[derive(Debug, Clone, Copy)]
struct FaceIndex {
    v: i32,
    vt: i32,
    vn: i32,
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<FaceIndex>> {
    let mut indices = Vec::new();
    for part in parts {
        let mut segments = part.split('/');
        let v = segments
            .next()
            .ok_or_else(|| anyhow!("missing vertex index"))?
            .parse::<i32>()?;
        let vt = parse_optional_index(segments.next());
        let vn = parse_optional_index(segments.next());
        indices.push(FaceIndex { v, vt, vn });
    }
    if indices.len() < 3 {
        return Err(anyhow!("faces must reference at least 3 vertices"));
    }
    Ok(indices)
}

fn parse_optional_index(segment: Option<&str>) -> i32 {
    segment
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<i32>().ok())
        .unwrap_or(0)
}

fn triangulate_face(polygon: &[FaceIndex], faces: &mut Vec<[FaceIndex; 3]>) {
    for i in 1..polygon.len().saturating_sub(1) {
        faces.push([polygon[0], polygon[i], polygon[i + 1]]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Key {
    position: usize,
    normal: Option<usize>,
    texcoord: Option<usize>,
}

fn build_mesh(
    positions: &[Vec3],
    normals: &[Vec3],
    texcoords: &[Vec2],
    faces: &[[FaceIndex; 3]],
) -> Result<MeshData> {
    let mut lookup: HashMap<Key, u32> = HashMap::new();
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for face in faces {
        for idx in face {
            let position_index =
                fix_index(idx.v, positions.len()).ok_or_else(|| anyhow!("invalid vertex index"))?;
            let key = Key {
                position: position_index,
                normal: fix_index(idx.vn, normals.len()),
                texcoord: fix_index(idx.vt, texcoords.len()),
            };
            let next_index = (vertices.len() / VERTEX_STRIDE) as u32;
            let entry = lookup.entry(key).or_insert_with(|| {
                let position = positions[key.position];
                vertices.extend_from_slice(&[position.x, position.y, position.z]);
                let normal = key.normal.map(|i| normals[i]).unwrap_or(Vec3::ZERO);
                vertices.extend_from_slice(&[normal.x, normal.y, normal.z]);
                let uv = key.texcoord.map(|i| texcoords[i]).unwrap_or(Vec2::ZERO);
                vertices.extend_from_slice(&[uv.x, uv.y]);
                next_index
            });
            indices.push(*entry);
        }
    }

    Ok(MeshData { vertices, indices })
}

fn fix_index(index: i32, len: usize) -> Option<usize> {
    if index > 0 {
        let zero_based = index as usize - 1;
        (zero_based < len).then_some(zero_based)
    } else if index < 0 {
        let abs = (-index) as usize;
        (abs <= len).then_some(len - abs)
    } else {
        None
    }
}

fn needs_normals(vertices: &[f32]) -> bool {
    vertices
        .chunks_exact(VERTEX_STRIDE)
        .any(|chunk| chunk[3] == 0.0 && chunk[4] == 0.0 && chunk[5] == 0.0)
}

fn compute_normals(mesh: &mut MeshData) {
    let vertex_count = mesh.vertex_count();
    let mut accum = vec![Vec3::ZERO; vertex_count];

    for triangle in mesh.indices.chunks_exact(3) {
        let i0 = triangle[0] as usize;
        let i1 = triangle[1] as usize;
        let i2 = triangle[2] as usize;
        let p0 = Vec3::from_slice(&mesh.vertices[i0 * VERTEX_STRIDE..i0 * VERTEX_STRIDE + 3]);
        let p1 = Vec3::from_slice(&mesh.vertices[i1 * VERTEX_STRIDE..i1 * VERTEX_STRIDE + 3]);
        let p2 = Vec3::from_slice(&mesh.vertices[i2 * VERTEX_STRIDE..i2 * VERTEX_STRIDE + 3]);
        let normal = (p1 - p0).cross(p2 - p0);
        if normal.length_squared() > f32::EPSILON {
            let normal = normal.normalize();
            accum[i0] += normal;
            accum[i1] += normal;
            accum[i2] += normal;
        }
    }

    for (i, normal) in accum.into_iter().enumerate() {
        let normal = normal.normalize_or_zero();
        mesh.vertices[i * VERTEX_STRIDE + 3] = normal.x;
        mesh.vertices[i * VERTEX_STRIDE + 4] = normal.y;
        mesh.vertices[i * VERTEX_STRIDE + 5] = normal.z;
    }
}
