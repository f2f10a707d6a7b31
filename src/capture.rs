//! Reading rendered textures back to the CPU and saving them as PNG.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

/// Rows of a texture-to-buffer copy must start at multiples of
/// [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`].
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Copy an RGBA8 texture into an image.
pub async fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> anyhow::Result<image::RgbaImage> {
    let size = texture.size();
    anyhow::ensure!(
        texture.format().block_copy_size(None) == Some(4),
        "cannot read back texture format {:?}",
        texture.format()
    );
    let padded_row = padded_bytes_per_row(size.width);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("capture buffer"),
        size: padded_row as wgpu::BufferAddress * size.height as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("capture encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(size.height),
            },
        },
        wgpu::Extent3d {
            depth_or_array_layers: 1,
            ..size
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    let buffer_slice = buffer.slice(..);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        // the receiver only goes away if the read-back was abandoned
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        })
        .context("Failed to wait for the capture copy")?;
    rx.receive()
        .await
        .context("Capture buffer mapping was cancelled")?
        .context("Failed to map the capture buffer")?;

    let pixels = {
        let data = buffer_slice.get_mapped_range();
        unpad_rows(&data, size.width, size.height)
    };
    buffer.unmap();

    image::RgbaImage::from_raw(size.width, size.height, pixels)
        .context("Capture buffer does not match the texture size")
}

/// Strip the row padding of a texture copy.
pub fn unpad_rows(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let padded_row = padded_bytes_per_row(width) as usize;
    let row = width as usize * 4;
    data.chunks(padded_row)
        .take(height as usize)
        .flat_map(|chunk| &chunk[..row.min(chunk.len())])
        .copied()
        .collect()
}

/// File name for a capture of `name`, e.g. `point-light-shadows-1700000000000.png`.
pub fn capture_file_name(name: &str, millis: u128) -> String {
    let slug: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let slug = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    format!("{slug}-{millis}.png")
}

/// Read `texture` back and write it to `dir` as PNG. Returns the file written.
pub async fn save_png(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    dir: &Path,
    name: &str,
) -> anyhow::Result<PathBuf> {
    let image = read_texture(device, queue, texture).await?;
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create capture directory {}", dir.display()))?;
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let path = dir.join(capture_file_name(name, millis));
    image
        .save_with_format(&path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_the_copy_alignment() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(1), 256);
        for width in [1, 100, 1280, 1366, 1919] {
            let padded = padded_bytes_per_row(width);
            assert_eq!(padded % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT, 0);
            assert!(padded >= width * 4 && padded - width * 4 < 256);
        }
    }

    #[test]
    fn unpadding_keeps_only_pixels() {
        let (width, height) = (3, 2);
        let padded = padded_bytes_per_row(width) as usize;
        let mut data = vec![0xAAu8; padded * height as usize];
        for row in 0..height as usize {
            for byte in 0..(width as usize * 4) {
                data[row * padded + byte] = row as u8;
            }
        }
        let pixels = unpad_rows(&data, width, height);
        assert_eq!(pixels.len(), 24);
        assert!(pixels[..12].iter().all(|&b| b == 0));
        assert!(pixels[12..].iter().all(|&b| b == 1));
    }

    #[test]
    fn capture_names_are_file_friendly() {
        assert_eq!(
            capture_file_name("Cascaded Shadow Maps", 42),
            "cascaded-shadow-maps-42.png"
        );
        assert_eq!(capture_file_name("  A/B  ", 7), "a-b-7.png");
    }
}
