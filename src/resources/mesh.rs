use crate::data_structures::model;

/// Convert OBJ meshes into GPU meshes.
///
/// Positions without normals get a zero normal; OBJ v coordinates are flipped
/// to wgpu's top-left texture origin.
pub fn load_meshes(
    models: &[tobj::Model],
    file_name: &str,
    material_count: usize,
    device: &wgpu::Device,
) -> Vec<model::Mesh> {
    models
        .iter()
        .filter_map(|m| {
            if m.mesh.indices.is_empty() {
                log::warn!("Skipping empty mesh {} in {}", m.name, file_name);
                return None;
            }
            let vertices = (0..m.mesh.positions.len() / 3)
                .map(|i| model::ModelVertex {
                    position: [
                        m.mesh.positions[i * 3],
                        m.mesh.positions[i * 3 + 1],
                        m.mesh.positions[i * 3 + 2],
                    ],
                    tex_coords: [
                        m.mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                        1.0 - m.mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
                    ],
                    normal: [
                        m.mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                        m.mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                        m.mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
                    ],
                })
                .collect::<Vec<_>>();

            let material = m
                .mesh
                .material_id
                .filter(|&id| id < material_count)
                .unwrap_or(0);
            Some(model::Mesh::new(
                device,
                &format!("{file_name}:{}", m.name),
                &vertices,
                &m.mesh.indices,
                material,
            ))
        })
        .collect()
}
