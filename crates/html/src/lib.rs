//! Markup renderer for slide decks.
//!
//! Renders a whole deck to a single self-contained HTML document with one
//! positioned placeholder per planned image slot. Placeholders can later be
//! filled in place with [`patch_image`] without re-rendering.

pub mod patch;
pub mod renderer;
mod view;

pub use patch::patch_image;
pub use renderer::{HtmlRenderer, OVERFLOW_CHAR_LIMIT};
