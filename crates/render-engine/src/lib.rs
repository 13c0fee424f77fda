//! framemix Render Engine
//!
//! Real-time compositor that draws every registered visual source into a
//! shared rendering surface at a fixed frame rate and exposes the result,
//! together with the mixed audio of all audible sources, as one output
//! stream.
//!
//! # Architecture
//!
//! ```text
//! add_source ──► Compositor ──┬──► AudioBridge ──► AudioMixer ──┐
//!                             │                                 │
//!                             └──► SourceRegistry               │
//!                                    │  (grid layout,           │
//!                                    │   drawing-space quads)   │
//!                                    ▼                          │
//!                   RenderLoop tick (every 1000/fps ms)         │
//!                                    │                          │
//!                                    ▼                          ▼
//!                            RenderSurface ──► OutputStream (video + audio)
//! ```

pub mod audio;
pub mod compositor;
pub mod output;
pub mod platform;
pub mod registry;
pub mod render_loop;
pub mod software;
pub mod surface;

pub use audio::{AudioBridge, AudioMixer, HeadlessMixer};
pub use compositor::{Compositor, CompositorOptions};
pub use output::OutputStream;
pub use platform::{Capabilities, HeadlessPlatform, Platform};
pub use registry::SourceRegistry;
pub use render_loop::{RenderLoop, RenderStats};
pub use software::SoftwareSurface;
pub use surface::{BufferId, RenderSurface};
