//! framemix Media Model
//!
//! Defines the core data contracts for the compositor:
//! - **Geometry:** Pixel rectangles and their drawing-space quads
//! - **Layout:** Automatic grid placement for sources without a position
//! - **Media:** Frames, shared frame slots, and media track handles
//! - **Source:** Source descriptors, registry records, and frame providers
//!
//! Rectangles are expressed in output pixels with a top-left origin;
//! quads are in drawing space (`[-1.0, 1.0]`, y-up, origin at center).

pub mod geometry;
pub mod layout;
pub mod media;
pub mod source;

pub use geometry::*;
pub use layout::*;
pub use media::*;
pub use source::*;
