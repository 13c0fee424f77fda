//! Bridge to the external audio mixer.
//!
//! The mixer merges every audible source into a single output track. The
//! bridge creates it lazily, forwards audible sources to it, and attaches
//! its merged track to the output stream once.

use indexmap::IndexMap;

use framemix_common::error::{FramemixError, FramemixResult};
use framemix_media_model::media::MediaTrack;
use framemix_media_model::source::MediaSource;

use crate::output::OutputStream;
use crate::platform::Platform;

/// Trait for the audio mixing subsystem.
///
/// Implementations own the actual sample mixing; the compositor only
/// registers and unregisters inputs and picks up the merged track.
pub trait AudioMixer: Send {
    /// Register a source's audio under `id`.
    fn add_input(&mut self, id: &str, name: &str, source: &MediaSource) -> FramemixResult<()>;

    /// Unregister an input. Unknown ids are ignored.
    fn remove_input(&mut self, id: &str);

    /// The merged output track, once one exists.
    fn output_track(&self) -> Option<MediaTrack>;

    /// Release the mixer and end its output track.
    fn close(&mut self);
}

/// Mixer that tracks its inputs and exposes one output track without
/// touching samples.
#[derive(Debug, Default)]
pub struct HeadlessMixer {
    inputs: IndexMap<String, MediaTrack>,
    output: Option<MediaTrack>,
}

impl HeadlessMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of the registered inputs, in registration order.
    pub fn input_ids(&self) -> impl Iterator<Item = &str> {
        self.inputs.keys().map(String::as_str)
    }
}

impl AudioMixer for HeadlessMixer {
    fn add_input(&mut self, id: &str, name: &str, source: &MediaSource) -> FramemixResult<()> {
        let track = source
            .audio_track()
            .ok_or_else(|| FramemixError::audio(format!("source {id} has no live audio track")))?;
        tracing::debug!(source_id = id, name, track_id = track.id(), "Mixer input added");
        self.inputs.insert(id.to_string(), track);
        self.output
            .get_or_insert_with(|| MediaTrack::audio("framemix-mix"));
        Ok(())
    }

    fn remove_input(&mut self, id: &str) {
        self.inputs.shift_remove(id);
    }

    fn output_track(&self) -> Option<MediaTrack> {
        self.output.clone()
    }

    fn close(&mut self) {
        if let Some(output) = self.output.take() {
            output.stop();
        }
        self.inputs.clear();
    }
}

/// Adapter between the compositor and the platform's [`AudioMixer`].
#[derive(Default)]
pub struct AudioBridge {
    mixer: Option<Box<dyn AudioMixer>>,
    inputs: IndexMap<String, MediaSource>,
    attached: Option<MediaTrack>,
}

impl AudioBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the mixer if it does not exist yet.
    pub fn ensure_mixer(&mut self, platform: &dyn Platform) -> FramemixResult<()> {
        if self.mixer.is_none() {
            self.mixer = Some(platform.create_mixer()?);
            tracing::debug!(platform = platform.name(), "Audio mixer created");
        }
        Ok(())
    }

    /// Forward an audible source to the mixer.
    pub fn add(&mut self, id: &str, name: &str, source: &MediaSource) -> FramemixResult<()> {
        let mixer = self
            .mixer
            .as_mut()
            .ok_or_else(|| FramemixError::audio("audio mixer is not available"))?;
        mixer.add_input(id, name, source)?;
        self.inputs.insert(id.to_string(), source.clone());
        Ok(())
    }

    /// Attach the mixer's merged track to `output`, once. Returns whether
    /// a track is attached after the call.
    pub fn attach_output(&mut self, output: &mut OutputStream) -> bool {
        if self.attached.is_some() {
            return true;
        }
        if self.inputs.is_empty() {
            return false;
        }
        let Some(track) = self.mixer.as_ref().and_then(|mixer| mixer.output_track()) else {
            return false;
        };
        tracing::info!(track_id = track.id(), "Mixed audio track attached to output");
        output.add_track(track.clone());
        self.attached = Some(track);
        true
    }

    /// Unregister an input, handing back its source.
    pub fn remove(&mut self, id: &str) -> Option<MediaSource> {
        let source = self.inputs.shift_remove(id)?;
        if let Some(mixer) = self.mixer.as_mut() {
            mixer.remove_input(id);
        }
        Some(source)
    }

    /// Unregister every input, handing back their sources.
    pub fn drain(&mut self) -> Vec<(String, MediaSource)> {
        let drained: Vec<_> = self.inputs.drain(..).collect();
        if let Some(mixer) = self.mixer.as_mut() {
            for (id, _) in &drained {
                mixer.remove_input(id);
            }
        }
        drained
    }

    /// Release the mixer. A later source addition creates a fresh one.
    pub fn close(&mut self) {
        if let Some(mut mixer) = self.mixer.take() {
            mixer.close();
            tracing::debug!("Audio mixer closed");
        }
        self.inputs.clear();
        self.attached = None;
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inputs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn has_mixer(&self) -> bool {
        self.mixer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HeadlessPlatform;
    use framemix_media_model::media::TrackKind;
    use framemix_media_model::source::{AudioElement, ImageElement};
    use framemix_media_model::media::VideoFrame;

    fn mic() -> MediaSource {
        MediaSource::FileAudio(AudioElement::new(MediaTrack::audio("mic")))
    }

    #[test]
    fn mixer_is_created_lazily() {
        let mut bridge = AudioBridge::new();
        assert!(!bridge.has_mixer());
        assert!(bridge.add("a", "a", &mic()).is_err());

        bridge.ensure_mixer(&HeadlessPlatform::new()).unwrap();
        assert!(bridge.has_mixer());
        bridge.add("a", "a", &mic()).unwrap();
        assert!(bridge.contains("a"));
    }

    #[test]
    fn output_track_is_attached_once() {
        let mut bridge = AudioBridge::new();
        let mut output = OutputStream::new();
        bridge.ensure_mixer(&HeadlessPlatform::new()).unwrap();
        assert!(!bridge.attach_output(&mut output));

        bridge.add("a", "first", &mic()).unwrap();
        bridge.add("b", "second", &mic()).unwrap();
        assert!(bridge.attach_output(&mut output));
        assert!(bridge.attach_output(&mut output));

        let audio: Vec<_> = output.tracks_of(TrackKind::Audio).collect();
        assert_eq!(audio.len(), 1);
    }

    #[test]
    fn silent_sources_are_rejected() {
        let mut bridge = AudioBridge::new();
        bridge.ensure_mixer(&HeadlessPlatform::new()).unwrap();
        let image = MediaSource::FileImage(ImageElement::new(VideoFrame::solid_rgb(1, 1, [0; 3])));
        let err = bridge.add("img", "img", &image).unwrap_err();
        assert!(matches!(err, FramemixError::Audio { .. }));
        assert!(bridge.is_empty());
    }

    #[test]
    fn remove_and_close() {
        let mut bridge = AudioBridge::new();
        let mut output = OutputStream::new();
        bridge.ensure_mixer(&HeadlessPlatform::new()).unwrap();
        bridge.add("a", "a", &mic()).unwrap();
        bridge.attach_output(&mut output);

        assert!(bridge.remove("a").is_some());
        assert!(bridge.remove("a").is_none());

        let mixed = output.tracks_of(TrackKind::Audio).next().cloned().unwrap();
        bridge.close();
        assert!(!mixed.is_live());
        assert!(!bridge.has_mixer());
    }

    #[test]
    fn headless_mixer_tracks_inputs() {
        let mut mixer = HeadlessMixer::new();
        assert!(mixer.output_track().is_none());
        mixer.add_input("x", "x", &mic()).unwrap();
        mixer.add_input("y", "y", &mic()).unwrap();
        mixer.remove_input("x");
        assert_eq!(mixer.input_ids().collect::<Vec<_>>(), vec!["y"]);
        assert!(mixer.output_track().is_some());
    }
}
