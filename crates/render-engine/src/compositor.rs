//! Compositor facade: wires the registry, render loop, and audio bridge
//! together and exposes the public lifecycle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use framemix_common::config::{FramemixConfig, OutputDefaults};
use framemix_common::error::{FramemixError, FramemixResult};
use framemix_media_model::geometry::{Rect, Size};
use framemix_media_model::source::{MediaSource, SourceDescriptor, SourceRecord, SourceType};

use crate::audio::AudioBridge;
use crate::output::OutputStream;
use crate::platform::Platform;
use crate::registry::SourceRegistry;
use crate::render_loop::{RenderLoop, RenderStats, RenderTarget};

/// Construction options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompositorOptions {
    /// Emit per-tick diagnostics at debug level.
    pub debug: bool,

    /// Output size, frame rate, and idle behaviour.
    pub output: OutputDefaults,
}

impl CompositorOptions {
    /// Options taking the output settings from a loaded configuration.
    /// Per-tick diagnostics stay off.
    pub fn from_config(config: &FramemixConfig) -> Self {
        Self {
            debug: false,
            output: config.output.clone(),
        }
    }

    /// Options from the configuration file at its standard location,
    /// falling back to defaults.
    pub fn load() -> Self {
        Self::from_config(&FramemixConfig::load())
    }
}

/// Composites every added source into one output stream.
///
/// Must be created inside a tokio runtime; the render loop runs as a task
/// on that runtime.
pub struct Compositor {
    options: CompositorOptions,
    platform: Box<dyn Platform>,
    runtime: Handle,
    target: Arc<RenderTarget>,
    render_loop: RenderLoop,
    audio: AudioBridge,
    output: OutputStream,
    destroyed: bool,
}

impl Compositor {
    /// Check platform capabilities and set up the surface and output
    /// stream.
    pub fn new(options: CompositorOptions, platform: Box<dyn Platform>) -> FramemixResult<Self> {
        if let Some(missing) = platform.capabilities().missing() {
            return Err(FramemixError::capability(format!(
                "{missing} is not supported by the {} platform",
                platform.name()
            )));
        }
        let runtime = Handle::try_current()
            .map_err(|_| FramemixError::capability("no tokio runtime to drive the render loop"))?;

        let mut options = options;
        options.output.fps = options.output.fps.max(1);
        let size = Size::checked(options.output.width, options.output.height)?;

        let mut surface = platform.create_surface(size)?;
        let video = surface.capture_stream(options.output.fps)?;
        let mut output = OutputStream::new();
        output.add_track(video);

        let target = Arc::new(RenderTarget::new(
            SourceRegistry::new(size),
            surface,
            options.debug,
        ));

        tracing::info!(
            platform = platform.name(),
            width = size.width,
            height = size.height,
            fps = options.output.fps,
            "Compositor created"
        );

        Ok(Self {
            options,
            platform,
            runtime,
            target,
            render_loop: RenderLoop::new(),
            audio: AudioBridge::new(),
            output,
            destroyed: false,
        })
    }

    /// Add a source and return its id.
    ///
    /// Sound sources, and visual sources carrying audio, are handed to the
    /// mixer; visual sources join the registry. Starts rendering if it is
    /// not running yet.
    ///
    /// A sound source the mixer rejects is returned as an audio error and
    /// kept nowhere. A visual source whose audio is rejected is still drawn.
    pub fn add_source(&mut self, descriptor: SourceDescriptor) -> FramemixResult<String> {
        if self.destroyed {
            return Err(FramemixError::Destroyed);
        }

        let id = descriptor
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        if let Err(e) = self.audio.ensure_mixer(self.platform.as_ref()) {
            tracing::warn!(error = %e, "Audio mixer unavailable");
        }

        let audible = descriptor.source_type == SourceType::Sound
            || descriptor.source.as_ref().is_some_and(MediaSource::has_audio);
        if audible {
            let name = if descriptor.name.is_empty() { &id } else { &descriptor.name };
            let added = match descriptor.source.as_ref() {
                Some(source) => self.audio.add(&id, name, source),
                None => Err(FramemixError::audio(format!("sound source {id} has no media"))),
            };
            match added {
                Ok(()) => {
                    self.audio.attach_output(&mut self.output);
                }
                Err(e) if descriptor.source_type == SourceType::Sound => {
                    tracing::warn!(source_id = %id, error = %e, "Sound source rejected");
                    return Err(e);
                }
                Err(e) => tracing::warn!(source_id = %id, error = %e, "Failed to add audio input"),
            }
        }

        if descriptor.source_type == SourceType::Visual {
            let mut registry = self.target.registry.lock();
            let index = descriptor.index.unwrap_or(registry.len() as i64);
            let canvas = registry.canvas();
            registry.add(SourceRecord::new(id.clone(), index, descriptor, canvas));
            tracing::info!(source_id = %id, index, sources = registry.len(), "Visual source added");
        } else {
            tracing::info!(source_id = %id, "Sound source added");
        }

        self.ensure_rendering();
        Ok(id)
    }

    /// Remove a source from the mixer and the registry. Unknown ids are
    /// ignored.
    pub fn remove_stream(&mut self, id: &str) {
        let from_audio = self.audio.remove(id);
        if let Some(source) = &from_audio {
            source.stop();
        }
        let (from_registry, registry_empty) = {
            let mut registry = self.target.registry.lock();
            let removed = registry.remove(id);
            (removed, registry.is_empty())
        };

        if from_audio.is_none() && from_registry.is_none() {
            tracing::debug!(source_id = id, "Remove ignored, unknown source");
            return;
        }
        tracing::info!(source_id = id, "Source removed");

        if from_registry.is_some() && registry_empty {
            self.schedule_idle_clear();
        }
        if !self.has_sources() {
            self.render_loop.stop();
            tracing::info!("No sources left, rendering stops");
        }
    }

    /// Snapshot of the visual sources in draw order.
    pub fn get_sources(&self) -> Vec<SourceRecord> {
        self.target.registry.lock().list()
    }

    /// Snapshot of one visual source.
    pub fn get_source(&self, id: &str) -> Option<SourceRecord> {
        self.target.registry.lock().get(id).cloned()
    }

    /// Change a source's draw order. Unknown ids are ignored.
    pub fn update_index(&mut self, id: &str, index: i64) -> FramemixResult<()> {
        self.ensure_alive()?;
        if !self.target.registry.lock().update_index(id, index) {
            tracing::debug!(source_id = id, "Index update ignored, unknown source");
        }
        Ok(())
    }

    /// Pin a source to a rectangle. Unknown ids are ignored.
    pub fn update_position(&mut self, id: &str, position: Rect) -> FramemixResult<()> {
        self.ensure_alive()?;
        if !self.target.registry.lock().update_position(id, position) {
            tracing::debug!(source_id = id, "Position update ignored, unknown source");
        }
        Ok(())
    }

    /// Resize the output. Auto-placed sources are laid out again for the
    /// new canvas. Sizes above [`MAX_CANVAS_DIMENSION`] are rejected.
    ///
    /// [`MAX_CANVAS_DIMENSION`]: framemix_media_model::geometry::MAX_CANVAS_DIMENSION
    pub fn set_output_size(&mut self, width: u32, height: u32) -> FramemixResult<()> {
        self.ensure_alive()?;
        let size = Size::checked(width, height)?;
        {
            // No tick may see the new canvas with the old layout.
            let mut surface = self.target.surface.lock();
            surface.resize(size);
            self.target.registry.lock().resize(size);
        }
        self.options.output.width = width;
        self.options.output.height = height;
        tracing::info!(width, height, "Output size changed");
        Ok(())
    }

    /// Change the output frame rate, restarting a running loop.
    pub fn set_fps(&mut self, fps: u32) -> FramemixResult<()> {
        self.ensure_alive()?;
        let fps = fps.max(1);
        self.options.output.fps = fps;
        self.target.surface.lock().set_capture_rate(fps);
        if self.render_loop.is_running() {
            self.render_loop.abort();
            self.ensure_rendering();
        }
        tracing::info!(fps, "Output frame rate changed");
        Ok(())
    }

    /// The output stream. Tracks are shared handles.
    pub fn output_stream(&self) -> OutputStream {
        self.output.clone()
    }

    /// Current output canvas size.
    pub fn output_size(&self) -> Size {
        Size::new(self.options.output.width, self.options.output.height)
    }

    /// Current output frame rate.
    pub fn fps(&self) -> u32 {
        self.options.output.fps
    }

    /// Counters accumulated by every run of the render loop.
    pub fn stats(&self) -> RenderStats {
        self.target.stats()
    }

    /// Whether a render loop run is active.
    pub fn is_rendering(&self) -> bool {
        self.render_loop.is_running()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Tear everything down: stop rendering, stop every source, close the
    /// mixer, and end the output tracks. Later calls do nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            tracing::debug!("Compositor already destroyed");
            return;
        }

        self.render_loop.abort();

        let visual = self.target.registry.lock().drain();
        let audio = self.audio.drain();
        for (_, source) in &audio {
            source.stop();
        }
        self.audio.close();

        self.target.clear_surface();
        self.output.stop_all();
        self.destroyed = true;

        tracing::info!(
            visual = visual.len(),
            audio = audio.len(),
            "Compositor destroyed"
        );
    }

    fn ensure_alive(&self) -> FramemixResult<()> {
        if self.destroyed {
            Err(FramemixError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn has_sources(&self) -> bool {
        !self.audio.is_empty() || !self.target.registry.lock().is_empty()
    }

    fn ensure_rendering(&mut self) {
        if !self.render_loop.is_running() && self.has_sources() {
            self.render_loop.start(
                &self.runtime,
                Arc::clone(&self.target),
                self.options.output.frame_period(),
            );
        }
    }

    /// Blank the surface shortly after the last visual source goes away,
    /// so the output does not freeze on its final frame.
    fn schedule_idle_clear(&self) {
        let target = Arc::clone(&self.target);
        let delay = self.options.output.idle_clear_delay();
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            target.clear_if_idle();
        });
    }
}

impl Drop for Compositor {
    fn drop(&mut self) {
        self.destroy();
    }
}
