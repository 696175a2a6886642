//! Editable presentation output for slide decks.
//!
//! Builds `.pptx` packages (Office Open XML) whose picture and placeholder
//! rectangles come from the same slot geometry as the HTML preview, and
//! reads them back for inspection.

pub mod builder;
pub mod media;
pub mod package;
pub mod reader;
pub mod shape;
pub mod slide;

pub use builder::PresentationBuilder;
pub use media::ImageFormat;
pub use reader::{PackageReader, ShapeSummary, SlideSummary};
pub use slide::{bullet_font_size, PLACEHOLDER_CAPTION};

/// Slide width in EMU (13.333 in, 16:9).
pub const CANVAS_WIDTH: i64 = 12_192_000;

/// Slide height in EMU (7.5 in).
pub const CANVAS_HEIGHT: i64 = 6_858_000;

pub const EMU_PER_INCH: i64 = 914_400;
