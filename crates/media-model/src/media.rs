//! Frames, frame slots, and media track handles.
//!
//! Decoding and capture happen outside the compositor. Producers push
//! decoded frames into a [`FrameSlot`]; the render loop only ever reads
//! the most recent frame and never waits for one.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use framemix_common::error::{FramemixError, FramemixResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Pixel layout of a [`VideoFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// A decoded frame, stored row by row from the top.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
    timestamp_ns: u64,
}

impl VideoFrame {
    /// Wrap a pixel buffer, checking that its length matches the dimensions.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> FramemixResult<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(FramemixError::invalid_frame(format!(
                "{width}x{height} {format:?} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
            timestamp_ns: 0,
        })
    }

    /// A frame filled with a single color.
    pub fn solid_rgb(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self {
            width,
            height,
            format: PixelFormat::Rgb8,
            data,
            timestamp_ns: 0,
        }
    }

    pub fn with_timestamp(mut self, timestamp_ns: u64) -> Self {
        self.timestamp_ns = timestamp_ns;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// RGBA value of the pixel at `(x, y)`; opaque for RGB frames.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = (y as usize * self.width as usize + x as usize) * bpp;
        let px = &self.data[offset..offset + bpp];
        Some(match self.format {
            PixelFormat::Rgb8 => [px[0], px[1], px[2], 255],
            PixelFormat::Rgba8 => [px[0], px[1], px[2], px[3]],
        })
    }
}

/// Latest-frame cell shared between a producer and the render loop.
#[derive(Debug, Clone, Default)]
pub struct FrameSlot {
    inner: Arc<Mutex<Option<Arc<VideoFrame>>>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current frame.
    pub fn push(&self, frame: VideoFrame) {
        *self.inner.lock() = Some(Arc::new(frame));
    }

    /// The most recent frame, if any.
    pub fn current(&self) -> Option<Arc<VideoFrame>> {
        self.inner.lock().clone()
    }

    /// Drop the current frame.
    pub fn clear(&self) {
        self.inner.lock().take();
    }
}

/// Kind of media carried by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
}

#[derive(Debug)]
struct TrackInner {
    id: String,
    kind: TrackKind,
    label: String,
    ended: AtomicBool,
    frames: FrameSlot,
}

/// Cloneable handle to a live media track.
///
/// Clones share state: stopping any handle ends the track for all of
/// them. Video tracks carry a [`FrameSlot`] holding their latest frame.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id: uuid::Uuid::new_v4().to_string(),
                kind,
                label: label.into(),
                ended: AtomicBool::new(false),
                frames: FrameSlot::new(),
            }),
        }
    }

    pub fn video(label: impl Into<String>) -> Self {
        Self::new(TrackKind::Video, label)
    }

    pub fn audio(label: impl Into<String>) -> Self {
        Self::new(TrackKind::Audio, label)
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Frame slot of a video track.
    pub fn frames(&self) -> &FrameSlot {
        &self.inner.frames
    }

    /// Latest frame carried by the track, if it is still live.
    pub fn latest_frame(&self) -> Option<Arc<VideoFrame>> {
        if self.is_live() {
            self.inner.frames.current()
        } else {
            None
        }
    }

    pub fn is_live(&self) -> bool {
        !self.inner.ended.load(Ordering::Acquire)
    }

    /// End the track. Stopping an ended track does nothing.
    pub fn stop(&self) {
        if !self.inner.ended.swap(true, Ordering::AcqRel) {
            self.inner.frames.clear();
            tracing::debug!(track_id = %self.inner.id, kind = ?self.inner.kind, "Track stopped");
        }
    }
}

impl PartialEq for MediaTrack {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for MediaTrack {}

/// How much data a file-backed video has buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

impl ReadyState {
    /// Minimum state at which a video element can be drawn.
    pub const DRAWABLE: ReadyState = ReadyState::HaveCurrentData;

    fn from_u8(value: u8) -> Self {
        match value {
            0 => ReadyState::HaveNothing,
            1 => ReadyState::HaveMetadata,
            2 => ReadyState::HaveCurrentData,
            3 => ReadyState::HaveFutureData,
            _ => ReadyState::HaveEnoughData,
        }
    }
}

/// Shared, atomically updated [`ReadyState`].
#[derive(Debug, Clone)]
pub struct SharedReadyState(Arc<AtomicU8>);

impl SharedReadyState {
    pub fn new(state: ReadyState) -> Self {
        Self(Arc::new(AtomicU8::new(state as u8)))
    }

    pub fn get(&self) -> ReadyState {
        ReadyState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ReadyState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Default for SharedReadyState {
    fn default() -> Self {
        Self::new(ReadyState::HaveNothing)
    }
}
