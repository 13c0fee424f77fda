//! Source descriptors, registry records, and frame providers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geometry::{to_drawing_space, Quad, Rect, Size};
use crate::media::{
    FrameSlot, MediaTrack, ReadyState, SharedReadyState, TrackKind, VideoFrame,
};

/// Whether a source contributes pictures or only sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Visual,
    Sound,
}

/// Where a source's media originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Camera or microphone.
    InputDevice,
    ScreenCapture,
    WindowCapture,
    BrowserCapture,
    FileVideo,
    FileAudio,
    FileImage,
}

/// How a record obtained its rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Assigned by the grid layout; moves when the grid reflows.
    Auto,
    /// Supplied by the caller; never moved by the layout.
    Explicit,
}

/// A live stream made of one or more tracks (camera, screen capture, ...).
#[derive(Debug, Clone, Default)]
pub struct LiveStream {
    tracks: Vec<MediaTrack>,
}

impl LiveStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    fn live_track(&self, kind: TrackKind) -> Option<&MediaTrack> {
        self.tracks
            .iter()
            .find(|track| track.kind() == kind && track.is_live())
    }
}

/// A file-backed video whose decoder pushes frames into `frames`.
#[derive(Debug, Clone, Default)]
pub struct VideoElement {
    frames: FrameSlot,
    ready_state: SharedReadyState,
    audio: Option<MediaTrack>,
}

impl VideoElement {
    pub fn new(frames: FrameSlot, ready_state: SharedReadyState) -> Self {
        Self {
            frames,
            ready_state,
            audio: None,
        }
    }

    /// Attach the decoded soundtrack.
    pub fn with_audio(mut self, track: MediaTrack) -> Self {
        self.audio = Some(track);
        self
    }

    pub fn frames(&self) -> &FrameSlot {
        &self.frames
    }

    pub fn ready_state(&self) -> &SharedReadyState {
        &self.ready_state
    }
}

/// A still image; always ready once constructed.
#[derive(Debug, Clone)]
pub struct ImageElement {
    frame: Arc<VideoFrame>,
}

impl ImageElement {
    pub fn new(frame: VideoFrame) -> Self {
        Self {
            frame: Arc::new(frame),
        }
    }
}

/// A file-backed audio clip.
#[derive(Debug, Clone)]
pub struct AudioElement {
    track: MediaTrack,
}

impl AudioElement {
    pub fn new(track: MediaTrack) -> Self {
        Self { track }
    }

    pub fn track(&self) -> &MediaTrack {
        &self.track
    }
}

/// The frame provider behind a source.
#[derive(Debug, Clone)]
pub enum MediaSource {
    LiveStream(LiveStream),
    FileVideo(VideoElement),
    FileImage(ImageElement),
    FileAudio(AudioElement),
}

impl MediaSource {
    /// The frame to draw right now, if one is available.
    pub fn current_frame(&self) -> Option<Arc<VideoFrame>> {
        match self {
            MediaSource::LiveStream(stream) => stream
                .live_track(TrackKind::Video)
                .and_then(MediaTrack::latest_frame),
            MediaSource::FileVideo(video) => video.frames.current(),
            MediaSource::FileImage(image) => Some(image.frame.clone()),
            MediaSource::FileAudio(_) => None,
        }
    }

    /// Whether enough data is buffered to produce a frame.
    pub fn is_ready(&self) -> bool {
        match self {
            MediaSource::LiveStream(stream) => stream.live_track(TrackKind::Video).is_some(),
            MediaSource::FileVideo(video) => video.ready_state.get() >= ReadyState::DRAWABLE,
            MediaSource::FileImage(_) => true,
            MediaSource::FileAudio(_) => false,
        }
    }

    /// The audio track to hand to the mixer, if the source carries sound.
    pub fn audio_track(&self) -> Option<MediaTrack> {
        match self {
            MediaSource::LiveStream(stream) => stream.live_track(TrackKind::Audio).cloned(),
            MediaSource::FileVideo(video) => video.audio.clone().filter(MediaTrack::is_live),
            MediaSource::FileImage(_) => None,
            MediaSource::FileAudio(audio) => Some(audio.track.clone()).filter(MediaTrack::is_live),
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio_track().is_some()
    }

    /// Stop every track backing the source and drop buffered frames.
    pub fn stop(&self) {
        match self {
            MediaSource::LiveStream(stream) => stream.tracks.iter().for_each(MediaTrack::stop),
            MediaSource::FileVideo(video) => {
                video.frames.clear();
                video.ready_state.set(ReadyState::HaveNothing);
                if let Some(track) = &video.audio {
                    track.stop();
                }
            }
            MediaSource::FileImage(_) => {}
            MediaSource::FileAudio(audio) => audio.track.stop(),
        }
    }
}

/// What a caller hands to the compositor to add a source.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    /// Identity; generated when absent.
    pub id: Option<String>,
    /// Draw order; defaults to the number of visual sources.
    pub index: Option<i64>,
    /// Frame provider; `None` for sources that are not ready yet.
    pub source: Option<MediaSource>,
    /// Label, also used as the mixer input name.
    pub name: String,
    pub source_type: SourceType,
    pub kind: SourceKind,
    /// Caller-supplied rectangle; grid layout is used when absent.
    pub position: Option<Rect>,
}

impl SourceDescriptor {
    pub fn visual(kind: SourceKind, source: MediaSource) -> Self {
        Self {
            id: None,
            index: None,
            source: Some(source),
            name: String::new(),
            source_type: SourceType::Visual,
            kind,
            position: None,
        }
    }

    pub fn sound(kind: SourceKind, source: MediaSource) -> Self {
        Self {
            source_type: SourceType::Sound,
            ..Self::visual(kind, source)
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_index(mut self, index: i64) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_position(mut self, position: Rect) -> Self {
        self.position = Some(position);
        self
    }
}

/// A visual source as held by the registry.
///
/// `vertices` always matches `position` for the canvas the record was last
/// fitted to; the only way to move a record is through methods that
/// recompute both together.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    id: String,
    index: i64,
    name: String,
    source_type: SourceType,
    kind: SourceKind,
    placement: Placement,
    position: Rect,
    vertices: Quad,
    source: Option<MediaSource>,
}

impl SourceRecord {
    /// Build a record from a descriptor. Auto-placed records start with an
    /// empty rectangle until the layout assigns them a slot.
    pub fn new(id: String, index: i64, descriptor: SourceDescriptor, canvas: Size) -> Self {
        let (placement, position) = match descriptor.position {
            Some(rect) => (Placement::Explicit, rect),
            None => (Placement::Auto, Rect::default()),
        };
        Self {
            id,
            index,
            name: descriptor.name,
            source_type: descriptor.source_type,
            kind: descriptor.kind,
            placement,
            position,
            vertices: to_drawing_space(position, canvas),
            source: descriptor.source,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn index(&self) -> i64 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn position(&self) -> Rect {
        self.position
    }

    pub fn vertices(&self) -> &Quad {
        &self.vertices
    }

    pub fn source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    pub fn is_auto_placed(&self) -> bool {
        self.placement == Placement::Auto
    }

    pub fn set_index(&mut self, index: i64) {
        self.index = index;
    }

    /// Move the record, recomputing its vertices.
    pub fn place(&mut self, position: Rect, placement: Placement, canvas: Size) {
        self.position = position;
        self.placement = placement;
        self.vertices = to_drawing_space(position, canvas);
    }

    /// Recompute vertices for a new canvas size.
    pub fn refit(&mut self, canvas: Size) {
        self.vertices = to_drawing_space(self.position, canvas);
    }

    /// Stop the underlying media.
    pub fn stop(&self) {
        if let Some(source) = &self.source {
            source.stop();
        }
    }
}
