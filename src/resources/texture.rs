use std::{
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::data_structures::{model, texture};

/// Resolve an asset name. Absolute paths are used as given, everything else
/// is looked up in `./assets` and then in the crate's own `assets` directory.
pub fn asset_path(file_name: &str) -> PathBuf {
    let path = Path::new(file_name);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let local = Path::new("./").join("assets").join(path);
    if local.exists() {
        local
    } else {
        Path::new(env!("RENDER_DOJO_ASSETS")).join(path)
    }
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    let path = asset_path(file_name);
    tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = asset_path(file_name);
    tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Name of `reference` relative to the directory of `file_name`, as used by
/// material libraries and external glTF buffers.
pub fn sibling(file_name: &str, reference: &str) -> String {
    match Path::new(file_name).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(reference).to_string_lossy().into(),
        _ => reference.to_string(),
    }
}

pub async fn load_texture(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    format: Option<&str>,
) -> anyhow::Result<texture::Texture> {
    let data = load_binary(file_name).await?;
    texture::Texture::from_bytes(device, queue, &data, file_name, format)
}

/// Parse an OBJ file and build one material per MTL entry.
///
/// Materials without a diffuse map get a 1x1 texture of their diffuse colour.
pub async fn load_obj_materials(
    file_name: &str,
    queue: &wgpu::Queue,
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
) -> anyhow::Result<(Vec<model::Material>, Vec<tobj::Model>)> {
    let obj_text: String = load_string(file_name).await?;
    let obj_cursor = Cursor::new(obj_text);
    let mut obj_reader = BufReader::new(obj_cursor);

    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| async move {
            match load_string(&sibling(file_name, &p)).await {
                Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
                Err(e) => {
                    log::warn!("Material library {p} of {file_name} not found: {e:#}");
                    Err(tobj::LoadError::OpenFileFailed)
                }
            }
        },
    )
    .await
    .with_context(|| format!("Failed to parse {file_name}"))?;

    let obj_materials = obj_materials.unwrap_or_else(|e| {
        log::warn!("{file_name} has no usable materials ({e}), using a default one");
        Vec::new()
    });

    let mut materials = Vec::new();
    for m in obj_materials {
        let material = match &m.diffuse_texture {
            Some(diffuse) => {
                let diffuse_texture =
                    load_texture(&sibling(file_name, diffuse), device, queue, None).await?;
                model::Material::new(device, &m.name, diffuse_texture, layout)
            }
            None => {
                let [r, g, b] = m.diffuse.unwrap_or([0.8, 0.8, 0.8]);
                let rgba = [r, g, b, 1.0].map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
                model::Material::solid(device, queue, &m.name, rgba, layout)
            }
        };
        materials.push(material);
    }
    if materials.is_empty() {
        materials.push(model::Material::solid(
            device,
            queue,
            "default",
            [204, 204, 204, 255],
            layout,
        ));
    }
    Ok((materials, models))
}
