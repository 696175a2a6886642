//! Error types for deck rendering.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while planning or rendering a deck.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse a JSON document (deck, style or registry).
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A geometry value fell outside the normalized [0, 1] range.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A page's `index` does not match its position in the deck.
    #[error("Invalid page index: {0}")]
    InvalidPageIndex(String),

    /// A layout id is not part of the catalog.
    #[error("Unknown layout: {0}")]
    UnknownLayout(String),

    /// A template id was not found in the registry.
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    /// A scene tag is not one of theory, practice, review or mixed.
    #[error("Unknown scene: {0}")]
    UnknownScene(String),

    /// Failed to render the markup template.
    #[error("Template rendering error: {0}")]
    TemplateError(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML generation or parsing error (for PPTX).
    #[error("XML error: {0}")]
    XmlError(String),

    /// An image could not be embedded.
    #[error("Image error: {0}")]
    ImageError(String),
}
