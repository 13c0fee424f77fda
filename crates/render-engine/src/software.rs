//! CPU implementation of [`RenderSurface`].
//!
//! Keeps an RGBA8 framebuffer and rasterizes each strip over the pixel
//! bounds of its quad with nearest-neighbour sampling. Used by the
//! headless platform and by tests.

use std::collections::HashMap;

use framemix_common::error::{FramemixError, FramemixResult};
use framemix_media_model::geometry::{Quad, Size};
use framemix_media_model::media::{MediaTrack, PixelFormat, VideoFrame};

use crate::surface::{BufferId, RenderSurface};

/// Texture coordinates matching the strip order of [`Quad`]
/// (top-left, bottom-left, top-right, bottom-right), y-up.
const TEXCOORDS: [f32; 8] = [0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0];

pub struct SoftwareSurface {
    size: Size,
    framebuffer: Vec<u8>,
    initialized: bool,
    flip_y: bool,
    texcoords: [f32; 8],
    texture: Option<VideoFrame>,
    buffers: HashMap<BufferId, Quad>,
    next_buffer: u64,
    capture: Option<MediaTrack>,
    capture_fps: u32,
}

impl SoftwareSurface {
    /// Create an uninitialized surface. [`SoftwareSurface::initialize`]
    /// must run before anything can be drawn.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            framebuffer: vec![0; size.area() as usize * 4],
            initialized: false,
            flip_y: false,
            texcoords: [0.0; 8],
            texture: None,
            buffers: HashMap::new(),
            next_buffer: 0,
            capture: None,
            capture_fps: 0,
        }
    }

    /// Set up the program state: static texture coordinates and
    /// upload-time vertical flip, so frames stored top row first come
    /// out upright without flipping every upload.
    pub fn initialize(&mut self) {
        self.texcoords = TEXCOORDS;
        self.flip_y = true;
        self.initialized = true;
        tracing::debug!(width = self.size.width, height = self.size.height, "Software surface initialized");
    }

    /// Build and initialize a surface in one step.
    pub fn initialized(size: Size) -> Self {
        let mut surface = Self::new(size);
        surface.initialize();
        surface
    }

    /// RGBA value at `(x, y)` of the framebuffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let offset = (y as usize * self.size.width as usize + x as usize) * 4;
        let px = &self.framebuffer[offset..offset + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Nominal rate of the captured track, zero if not capturing.
    pub fn capture_fps(&self) -> u32 {
        self.capture_fps
    }

    fn snapshot(&self, timestamp_ns: u64) -> FramemixResult<VideoFrame> {
        VideoFrame::new(
            self.size.width,
            self.size.height,
            PixelFormat::Rgba8,
            self.framebuffer.clone(),
        )
        .map(|frame| frame.with_timestamp(timestamp_ns))
    }

    /// Texture coordinate `(s, t)` at the given fraction across the quad's
    /// pixel bounds, interpolated from the static coordinates.
    fn texcoord_at(&self, across: f32, down: f32) -> (f32, f32) {
        let [left_s, top_t, _, bottom_t, right_s, ..] = self.texcoords;
        (
            left_s + (right_s - left_s) * across,
            top_t + (bottom_t - top_t) * down,
        )
    }
}

impl RenderSurface for SoftwareSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn resize(&mut self, size: Size) {
        self.size = size;
        self.framebuffer = vec![0; size.area() as usize * 4];
        tracing::debug!(width = size.width, height = size.height, "Software surface resized");
    }

    fn clear(&mut self) {
        self.framebuffer.fill(0);
    }

    fn create_vertex_buffer(&mut self, vertices: &Quad) -> FramemixResult<BufferId> {
        if !self.initialized {
            return Err(FramemixError::render("surface program is not initialized"));
        }
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(id, *vertices);
        Ok(id)
    }

    fn upload_texture(&mut self, frame: &VideoFrame) -> FramemixResult<()> {
        if frame.is_empty() {
            return Err(FramemixError::render("cannot upload an empty texture"));
        }
        self.texture = Some(frame.clone());
        Ok(())
    }

    fn draw_strip(&mut self, buffer: BufferId) -> FramemixResult<()> {
        let quad = *self
            .buffers
            .get(&buffer)
            .ok_or_else(|| FramemixError::render(format!("unknown vertex buffer {}", buffer.0)))?;
        let texture = self
            .texture
            .as_ref()
            .ok_or_else(|| FramemixError::render("no texture bound"))?;

        let width = self.size.width as f32;
        let height = self.size.height as f32;
        let (min_x, min_y, max_x, max_y) = quad.bounds();
        let left = (min_x + 1.0) * 0.5 * width;
        let right = (max_x + 1.0) * 0.5 * width;
        let top = (1.0 - max_y) * 0.5 * height;
        let bottom = (1.0 - min_y) * 0.5 * height;
        if right <= left || bottom <= top {
            return Ok(());
        }

        let x0 = left.round().clamp(0.0, width) as u32;
        let x1 = right.round().clamp(0.0, width) as u32;
        let y0 = top.round().clamp(0.0, height) as u32;
        let y1 = bottom.round().clamp(0.0, height) as u32;
        let (tex_w, tex_h) = (texture.width(), texture.height());
        let row_stride = self.size.width as usize * 4;

        for py in y0..y1 {
            let down = (py as f32 + 0.5 - top) / (bottom - top);
            for px in x0..x1 {
                let across = (px as f32 + 0.5 - left) / (right - left);
                let (s, t) = self.texcoord_at(across, down);
                // Texture rows are stored top first; with flip-y the top
                // row sits at t = 1.
                let row = if self.flip_y { 1.0 - t } else { t };
                let tx = ((s * tex_w as f32) as u32).min(tex_w - 1);
                let ty = ((row * tex_h as f32) as u32).min(tex_h - 1);
                if let Some(rgba) = texture.pixel(tx, ty) {
                    let offset = py as usize * row_stride + px as usize * 4;
                    self.framebuffer[offset..offset + 4].copy_from_slice(&rgba);
                }
            }
        }
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
    }

    fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    fn capture_stream(&mut self, fps: u32) -> FramemixResult<MediaTrack> {
        if !self.initialized {
            return Err(FramemixError::render("surface program is not initialized"));
        }
        let track = self
            .capture
            .get_or_insert_with(|| MediaTrack::video("framemix-output"))
            .clone();
        self.capture_fps = fps;
        Ok(track)
    }

    fn set_capture_rate(&mut self, fps: u32) {
        if self.capture.is_some() {
            self.capture_fps = fps;
        }
    }

    fn present(&mut self, timestamp_ns: u64) {
        let Some(track) = self.capture.as_ref().filter(|track| track.is_live()) else {
            return;
        };
        match self.snapshot(timestamp_ns) {
            Ok(frame) => track.frames().push(frame),
            Err(e) => tracing::warn!(error = %e, "Failed to publish output frame"),
        }
    }
}
