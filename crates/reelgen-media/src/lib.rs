//! Media stages of the pipeline: subtitle alignment, timeline
//! composition, and the render pipeline with its retry policy.

pub mod compose;
pub mod error;
pub mod render;
pub mod subtitle;

pub use compose::{compose, ComposerConfig};
pub use error::{AlignmentError, CompositionError, RenderError};
pub use render::{RenderBackend, RenderPipeline, RenderPolicy};
pub use subtitle::{align_lines, align_text, AlignerConfig};
