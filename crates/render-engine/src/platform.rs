//! Platform seam: capability report plus factories for the rendering
//! surface and the audio mixer.

use serde::{Deserialize, Serialize};

use framemix_common::error::FramemixResult;
use framemix_media_model::geometry::Size;

use crate::audio::{AudioMixer, HeadlessMixer};
use crate::software::SoftwareSurface;
use crate::surface::RenderSurface;

/// Platform primitives the compositor cannot work without.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// An audio context able to mix tracks.
    pub audio_context: bool,
    /// Capturing a rendering surface as a media stream.
    pub stream_capture: bool,
    /// A GPU rendering context.
    pub gpu_context: bool,
}

impl Capabilities {
    pub const ALL: Capabilities = Capabilities {
        audio_context: true,
        stream_capture: true,
        gpu_context: true,
    };

    /// Name of the first missing primitive, if any.
    pub fn missing(&self) -> Option<&'static str> {
        if !self.audio_context {
            Some("audio context")
        } else if !self.stream_capture {
            Some("surface stream capture")
        } else if !self.gpu_context {
            Some("GPU rendering context")
        } else {
            None
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::ALL
    }
}

/// Abstract interface for platform-specific rendering and audio support.
pub trait Platform: Send + Sync {
    /// Platform name for logging.
    fn name(&self) -> &str;

    /// Report which primitives are available.
    fn capabilities(&self) -> Capabilities;

    /// Create a surface with its program and static buffers initialized.
    fn create_surface(&self, size: Size) -> FramemixResult<Box<dyn RenderSurface>>;

    /// Create the audio mixer. Called lazily on the first source addition.
    fn create_mixer(&self) -> FramemixResult<Box<dyn AudioMixer>>;
}

/// Platform backed by the software surface and the bookkeeping mixer.
#[derive(Debug, Clone, Default)]
pub struct HeadlessPlatform {
    capabilities: Capabilities,
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a custom capability set, e.g. to exercise failure paths.
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }
}

impl Platform for HeadlessPlatform {
    fn name(&self) -> &str {
        "headless"
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn create_surface(&self, size: Size) -> FramemixResult<Box<dyn RenderSurface>> {
        Ok(Box::new(SoftwareSurface::initialized(size)))
    }

    fn create_mixer(&self) -> FramemixResult<Box<dyn AudioMixer>> {
        Ok(Box::new(HeadlessMixer::new()))
    }
}
