//! The composited output stream.

use framemix_media_model::media::{MediaTrack, TrackKind};

/// A set of media tracks: the captured surface plus, once audio exists,
/// the mixed audio track.
///
/// Tracks are shared handles, so a clone observes frames and stop state
/// of the stream it came from; tracks added after cloning are not.
#[derive(Debug, Clone)]
pub struct OutputStream {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl OutputStream {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tracks: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Add a track unless it is already part of the stream.
    pub fn add_track(&mut self, track: MediaTrack) {
        if !self.tracks.contains(&track) {
            self.tracks.push(track);
        }
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn tracks_of(&self, kind: TrackKind) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(move |track| track.kind() == kind)
    }

    /// The composited video track.
    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.tracks_of(TrackKind::Video).next()
    }

    /// The mixed audio track.
    pub fn audio_track(&self) -> Option<&MediaTrack> {
        self.tracks_of(TrackKind::Audio).next()
    }

    /// Tracks that have not ended.
    pub fn active_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|track| track.is_live())
    }

    pub fn is_active(&self) -> bool {
        self.active_tracks().next().is_some()
    }

    /// Stop every track and remove it from the stream.
    pub fn stop_all(&mut self) {
        for track in self.tracks.drain(..) {
            track.stop();
        }
    }
}

impl Default for OutputStream {
    fn default() -> Self {
        Self::new()
    }
}
