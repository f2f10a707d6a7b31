//! The welcome grid.
//!
//! Every demo is shown as a tile textured with its live output. Hovering a
//! tile grows it a little, clicking it (or pressing its number key) makes it
//! grow until it covers the window. Layout, hit testing and the animation
//! curve are plain functions over [`Rect`]s so they can be tested without a
//! GPU.

use wgpu::util::DeviceExt;

use crate::{
    camera::{Camera, CameraUniform, OrthographicCamera},
    data_structures::texture::Texture,
    input::InputState,
    pipelines::welcome::{TileVertex, WelcomePipeline},
};

/// Unscaled tile size in pixels.
pub const COL_WIDTH: f32 = 900.0;
pub const ROW_HEIGHT: f32 = 400.0;
/// Unscaled space between tiles and around the grid.
pub const GAP: f32 = 24.0;
/// Relative growth of a hovered tile.
pub const HOVER_GROW: f32 = 0.04;
/// Speed of the hover and open animations, per second.
pub const ANIMATION_RATE: f32 = 8.0;
/// Above this open progress the tile counts as full screen.
const FULLY_OPEN: f32 = 0.999;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.06,
    a: 1.0,
};

/// Axis aligned rectangle in pixels, `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, point: [f32; 2]) -> bool {
        point[0] >= self.x
            && point[0] <= self.x + self.width
            && point[1] >= self.y
            && point[1] <= self.y + self.height
    }

    /// Scale around the centre by `1 + amount`.
    pub fn grow(&self, amount: f32) -> Self {
        let dw = self.width * amount;
        let dh = self.height * amount;
        Self::new(
            self.x - dw * 0.5,
            self.y - dh * 0.5,
            self.width + dw,
            self.height + dh,
        )
    }

    pub fn lerp(&self, other: &Rect, t: f32) -> Self {
        let mix = |a: f32, b: f32| a * (1.0 - t) + b * t;
        Self::new(
            mix(self.x, other.x),
            mix(self.y, other.y),
            mix(self.width, other.width),
            mix(self.height, other.height),
        )
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height.max(f32::EPSILON)
    }
}

/// Tile rectangles for `count` tiles, in row-major order, centred in the
/// viewport. Tiles keep their `COL_WIDTH : ROW_HEIGHT` proportions and are
/// scaled down (never up) until the whole grid fits.
pub fn grid_layout(count: usize, viewport: [f32; 2]) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let fitting = ((viewport[0] - GAP) / (COL_WIDTH + GAP)).floor().max(1.0) as usize;
    let columns = fitting.min(count);
    let rows = count.div_ceil(columns);

    let grid_width = columns as f32 * COL_WIDTH + (columns as f32 - 1.0) * GAP;
    let grid_height = rows as f32 * ROW_HEIGHT + (rows as f32 - 1.0) * GAP;
    let scale = ((viewport[0] - 2.0 * GAP) / grid_width)
        .min((viewport[1] - 2.0 * GAP) / grid_height)
        .clamp(f32::EPSILON, 1.0);

    let origin_x = (viewport[0] - grid_width * scale) * 0.5;
    let origin_y = (viewport[1] - grid_height * scale) * 0.5;
    (0..count)
        .map(|i| {
            let (col, row) = ((i % columns) as f32, (i / columns) as f32);
            Rect::new(
                origin_x + col * (COL_WIDTH + GAP) * scale,
                origin_y + row * (ROW_HEIGHT + GAP) * scale,
                COL_WIDTH * scale,
                ROW_HEIGHT * scale,
            )
        })
        .collect()
}

/// Index of the tile under `point`.
pub fn tile_at(tiles: &[Rect], point: [f32; 2]) -> Option<usize> {
    tiles.iter().position(|tile| tile.contains(point))
}

/// Texture coordinates `[u0, v0, u1, v1]` that crop a texture of
/// `texture_aspect` so it covers a quad of `quad_aspect` without stretching.
pub fn cover_uv(quad_aspect: f32, texture_aspect: f32) -> [f32; 4] {
    if quad_aspect > texture_aspect {
        let visible = texture_aspect / quad_aspect;
        let v0 = (1.0 - visible) * 0.5;
        [0.0, v0, 1.0, v0 + visible]
    } else {
        let visible = quad_aspect / texture_aspect;
        let u0 = (1.0 - visible) * 0.5;
        [u0, 0.0, u0 + visible, 1.0]
    }
}

/// Frame rate independent exponential approach of `current` towards `target`.
pub fn approach(current: f32, target: f32, dt: f32) -> f32 {
    let t = 1.0 - (-ANIMATION_RATE * dt.max(0.0)).exp();
    let next = current + (target - current) * t;
    if (target - next).abs() < 1e-4 {
        target
    } else {
        next
    }
}

/// Where a tile is drawn given its grid slot and animation state.
pub fn animated_rect(slot: &Rect, screen: &Rect, hover: f32, open: f32) -> Rect {
    slot.grow(HOVER_GROW * hover).lerp(screen, open)
}

/// Two triangles covering `rect`.
pub fn tile_vertices(rect: &Rect, uv: [f32; 4]) -> [TileVertex; 6] {
    let (x0, y0) = (rect.x, rect.y);
    let (x1, y1) = (rect.x + rect.width, rect.y + rect.height);
    let [u0, v0, u1, v1] = uv;
    let top_left = TileVertex {
        position: [x0, y0],
        uv: [u0, v0],
    };
    let top_right = TileVertex {
        position: [x1, y0],
        uv: [u1, v0],
    };
    let bottom_left = TileVertex {
        position: [x0, y1],
        uv: [u0, v1],
    };
    let bottom_right = TileVertex {
        position: [x1, y1],
        uv: [u1, v1],
    };
    [
        top_left,
        bottom_left,
        bottom_right,
        top_left,
        bottom_right,
        top_right,
    ]
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TileState {
    /// 0 at rest, 1 fully hovered.
    pub hover: f32,
    /// 0 in the grid, 1 covering the window.
    pub open: f32,
}

#[derive(Debug)]
pub struct WelcomeScreen {
    pipeline: WelcomePipeline,
    camera: OrthographicCamera,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    tile_bind_groups: Vec<wgpu::BindGroup>,
    texture_aspects: Vec<f32>,
    tiles: Vec<TileState>,
    opened: Option<usize>,
    viewport: [f32; 2],
}

impl WelcomeScreen {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        size: [u32; 2],
        outputs: &[&Texture],
    ) -> Self {
        let pipeline = WelcomePipeline::new(device, surface_format);

        let mut camera = OrthographicCamera::default();
        camera.resize(size[0], size[1]);
        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update(&camera);
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("welcome camera buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("welcome camera bind group"),
            layout: &pipeline.camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("welcome tile vertices"),
            size: (outputs.len().max(1) * 6 * std::mem::size_of::<TileVertex>())
                as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut screen = Self {
            pipeline,
            camera,
            camera_uniform,
            camera_buffer,
            camera_bind_group,
            vertex_buffer,
            tile_bind_groups: Vec::new(),
            texture_aspects: Vec::new(),
            tiles: vec![TileState::default(); outputs.len()],
            opened: None,
            viewport: [size[0] as f32, size[1] as f32],
        };
        screen.set_outputs(device, outputs);
        screen
    }

    /// Rebind the demo outputs. Needed whenever a demo recreated its output.
    pub fn set_outputs(&mut self, device: &wgpu::Device, outputs: &[&Texture]) {
        self.texture_aspects = outputs
            .iter()
            .map(|output| {
                let size = output.texture.size();
                size.width as f32 / size.height.max(1) as f32
            })
            .collect();
        self.tile_bind_groups = outputs
            .iter()
            .enumerate()
            .map(|(i, output)| {
                let sampler = match &output.sampler {
                    Some(sampler) => sampler.clone(),
                    None => crate::data_structures::texture::create_default_sampler(device),
                };
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("welcome tile {i}")),
                    layout: &self.pipeline.tile_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&output.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&sampler),
                        },
                    ],
                })
            })
            .collect();
    }

    pub fn resize(&mut self, queue: &wgpu::Queue, width: u32, height: u32) {
        self.viewport = [width as f32, height as f32];
        self.camera.resize(width, height);
        self.camera_uniform.update(&self.camera);
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
    }

    pub fn open(&mut self, index: usize) {
        if index < self.tiles.len() {
            self.opened = Some(index);
        }
    }

    pub fn close(&mut self) {
        self.opened = None;
    }

    pub fn opened(&self) -> Option<usize> {
        self.opened
    }

    /// The open demo once its tile covers the whole window.
    pub fn fully_open(&self) -> Option<usize> {
        self.opened
            .filter(|&i| self.tiles.get(i).is_some_and(|tile| tile.open >= FULLY_OPEN))
    }

    /// Animate the tiles and rebuild their vertices. Returns the tile that
    /// was clicked this frame, if any.
    pub fn update(&mut self, queue: &wgpu::Queue, input: &InputState, dt: f32) -> Option<usize> {
        let slots = grid_layout(self.tiles.len(), self.viewport);
        let cursor = [input.cursor.x, input.cursor.y];
        let hovered = match self.opened {
            None => tile_at(&slots, cursor),
            Some(_) => None,
        };
        let clicked = hovered.filter(|_| input.clicked);

        for (i, tile) in self.tiles.iter_mut().enumerate() {
            let hover_target = if hovered == Some(i) { 1.0 } else { 0.0 };
            let open_target = if self.opened == Some(i) { 1.0 } else { 0.0 };
            tile.hover = approach(tile.hover, hover_target, dt);
            tile.open = approach(tile.open, open_target, dt);
        }

        let screen = Rect::new(0.0, 0.0, self.viewport[0], self.viewport[1]);
        let vertices: Vec<TileVertex> = slots
            .iter()
            .zip(&self.tiles)
            .zip(&self.texture_aspects)
            .flat_map(|((slot, tile), &texture_aspect)| {
                let rect = animated_rect(slot, &screen, tile.hover, tile.open);
                tile_vertices(&rect, cover_uv(rect.aspect(), texture_aspect))
            })
            .collect();
        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));

        clicked
    }

    /// Tile indices in drawing order: the most open tile last.
    fn draw_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.tiles.len()).collect();
        order.sort_by(|&a, &b| self.tiles[a].open.total_cmp(&self.tiles[b].open));
        order
    }

    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("welcome pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
            multiview_mask: None,
        });
        render_pass.set_pipeline(&self.pipeline.pipeline);
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        for i in self.draw_order() {
            let Some(bind_group) = self.tile_bind_groups.get(i) else {
                continue;
            };
            render_pass.set_bind_group(1, bind_group, &[]);
            let first = i as u32 * 6;
            render_pass.draw(first..first + 6, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_fits_the_viewport_without_overlap() {
        for viewport in [[1280.0, 720.0], [3840.0, 2160.0], [500.0, 900.0], [2000.0, 300.0]] {
            let tiles = grid_layout(5, viewport);
            assert_eq!(tiles.len(), 5);
            for tile in &tiles {
                assert!(tile.x >= 0.0 && tile.y >= 0.0, "{tile:?} in {viewport:?}");
                assert!(tile.x + tile.width <= viewport[0] + 1e-3);
                assert!(tile.y + tile.height <= viewport[1] + 1e-3);
                assert!((tile.aspect() - COL_WIDTH / ROW_HEIGHT).abs() < 1e-3);
            }
            for (i, a) in tiles.iter().enumerate() {
                for b in &tiles[i + 1..] {
                    let apart = a.x + a.width <= b.x + 1e-3
                        || b.x + b.width <= a.x + 1e-3
                        || a.y + a.height <= b.y + 1e-3
                        || b.y + b.height <= a.y + 1e-3;
                    assert!(apart, "{a:?} overlaps {b:?}");
                }
            }
        }
    }

    #[test]
    fn tiles_are_never_scaled_up() {
        let tiles = grid_layout(2, [10_000.0, 10_000.0]);
        assert_eq!(tiles[0].width, COL_WIDTH);
        assert_eq!(tiles[0].height, ROW_HEIGHT);
        // both fit in one row
        assert_eq!(tiles[0].y, tiles[1].y);
    }

    #[test]
    fn hit_testing_finds_the_tile_under_the_cursor() {
        let tiles = grid_layout(2, [1280.0, 720.0]);
        for (i, tile) in tiles.iter().enumerate() {
            let centre = [tile.x + tile.width * 0.5, tile.y + tile.height * 0.5];
            assert_eq!(tile_at(&tiles, centre), Some(i));
        }
        assert_eq!(tile_at(&tiles, [1.0, 1.0]), None);
    }

    #[test]
    fn cover_uv_crops_the_longer_side() {
        // wide quad, square texture: crop top and bottom
        let [u0, v0, u1, v1] = cover_uv(2.0, 1.0);
        assert_eq!((u0, u1), (0.0, 1.0));
        assert!((v0 - 0.25).abs() < 1e-6 && (v1 - 0.75).abs() < 1e-6);
        // tall quad: crop the sides
        let [u0, v0, u1, v1] = cover_uv(0.5, 1.0);
        assert_eq!((v0, v1), (0.0, 1.0));
        assert!((u0 - 0.25).abs() < 1e-6 && (u1 - 0.75).abs() < 1e-6);
        assert_eq!(cover_uv(1.5, 1.5), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn animation_converges_monotonically() {
        let mut value = 0.0;
        let mut previous = value;
        for _ in 0..240 {
            value = approach(value, 1.0, 1.0 / 60.0);
            assert!(value >= previous && value <= 1.0);
            previous = value;
        }
        assert_eq!(value, 1.0);
        // a long frame does not overshoot
        assert!(approach(0.0, 1.0, 10.0) <= 1.0);
    }

    #[test]
    fn open_tile_covers_the_screen() {
        let screen = Rect::new(0.0, 0.0, 1280.0, 720.0);
        let slot = grid_layout(2, [1280.0, 720.0])[1];
        assert_eq!(animated_rect(&slot, &screen, 1.0, 1.0), screen);
        assert_eq!(animated_rect(&slot, &screen, 0.0, 0.0), slot);
        let hovered = animated_rect(&slot, &screen, 1.0, 0.0);
        assert!(hovered.width > slot.width && hovered.contains([slot.x, slot.y]));
    }

    #[test]
    fn tile_quad_spans_the_rect() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        let vertices = tile_vertices(&rect, [0.0, 0.0, 1.0, 1.0]);
        let xs: Vec<f32> = vertices.iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = vertices.iter().map(|v| v.position[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), 10.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 110.0);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), 20.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 70.0);
    }
}
