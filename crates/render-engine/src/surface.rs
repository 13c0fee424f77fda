//! Rendering surface abstraction.
//!
//! The surface owns the output texture, the shader program, and the static
//! buffers set up when it was created. The render loop talks to it through
//! a small GL-shaped command set: one transient vertex buffer per draw,
//! one texture upload, one four-vertex triangle strip.

use framemix_common::error::FramemixResult;
use framemix_media_model::geometry::{Quad, Size};
use framemix_media_model::media::{MediaTrack, VideoFrame};

/// Handle to a vertex buffer allocated on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

/// A drawing target capable of compositing frames into one output texture.
pub trait RenderSurface: Send {
    /// Current output dimensions.
    fn size(&self) -> Size;

    /// Resize the output texture and the viewport used for drawing.
    fn resize(&mut self, size: Size);

    /// Clear color and depth to transparent black.
    fn clear(&mut self);

    /// Allocate a vertex buffer holding the quad to draw.
    fn create_vertex_buffer(&mut self, vertices: &Quad) -> FramemixResult<BufferId>;

    /// Upload a frame as the 2D texture sampled by the next draw.
    fn upload_texture(&mut self, frame: &VideoFrame) -> FramemixResult<()>;

    /// Draw the buffer's four vertices as a triangle strip.
    fn draw_strip(&mut self, buffer: BufferId) -> FramemixResult<()>;

    /// Release a vertex buffer. Unknown ids are ignored.
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Number of vertex buffers currently allocated.
    fn live_buffers(&self) -> usize;

    /// Start capturing the surface as a video track at the given rate.
    fn capture_stream(&mut self, fps: u32) -> FramemixResult<MediaTrack>;

    /// Change the nominal rate of the captured track.
    fn set_capture_rate(&mut self, _fps: u32) {}

    /// Publish the current contents to the captured track.
    fn present(&mut self, timestamp_ns: u64);
}
