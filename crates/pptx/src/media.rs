//! Image loading for embedded pictures.

use std::fs;
use std::path::Path;

use deck_core::{Error, Result};

/// Raster formats that can be embedded in a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 4] = [Self::Png, Self::Jpeg, Self::Gif, Self::Bmp];

    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PNG: 89 50 4E 47
        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // GIF8
        if bytes.starts_with(b"GIF8") {
            return Some(Self::Gif);
        }

        // BM
        if bytes.starts_with(b"BM") {
            return Some(Self::Bmp);
        }

        None
    }

    /// File extension used for the media part.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
        }
    }

    fn decoder_format(&self) -> ::image::ImageFormat {
        match self {
            Self::Png => ::image::ImageFormat::Png,
            Self::Jpeg => ::image::ImageFormat::Jpeg,
            Self::Gif => ::image::ImageFormat::Gif,
            Self::Bmp => ::image::ImageFormat::Bmp,
        }
    }
}

/// Image bytes ready to be written as a media part.
///
/// Only files that decode cleanly are loaded; the original bytes are what
/// gets embedded.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl LoadedImage {
    /// Read an image file, sniff its format and decode it once.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)
            .map_err(|e| Error::ImageError(format!("{}: {}", path.display(), e)))?;
        let format = ImageFormat::from_magic(&data).ok_or_else(|| {
            Error::ImageError(format!("{}: unrecognized image format", path.display()))
        })?;
        let decoded = ::image::load_from_memory_with_format(&data, format.decoder_format())
            .map_err(|e| {
                Error::ImageError(format!("{}: failed to decode image: {}", path.display(), e))
            })?;
        log::debug!(
            "Loaded {} ({}x{} {})",
            path.display(),
            decoded.width(),
            decoded.height(),
            format.extension()
        );
        Ok(Self {
            format,
            width: decoded.width(),
            height: decoded.height(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_detection() {
        assert_eq!(
            ImageFormat::from_magic(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::from_magic(b"GIF89a"), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::from_magic(b"BM\0\0\0\0"), Some(ImageFormat::Bmp));
        assert_eq!(ImageFormat::from_magic(b"<svg"), None);
        assert_eq!(ImageFormat::from_magic(b"BM"), None);
    }

    #[test]
    fn test_load_rejects_unknown_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.png");
        fs::write(&path, "not an image").unwrap();
        assert!(matches!(LoadedImage::load(&path), Err(Error::ImageError(_))));
        assert!(matches!(
            LoadedImage::load(&dir.path().join("missing.png")),
            Err(Error::ImageError(_))
        ));
    }

    #[test]
    fn test_load_decodes_real_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        ::image::RgbImage::from_pixel(3, 2, ::image::Rgb([200, 30, 30]))
            .save(&path)
            .unwrap();

        let loaded = LoadedImage::load(&path).unwrap();
        assert_eq!(loaded.format, ImageFormat::Png);
        assert_eq!((loaded.width, loaded.height), (3, 2));
        assert_eq!(loaded.data, fs::read(&path).unwrap());
    }

    #[test]
    fn test_load_rejects_corrupt_body_with_valid_signature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truncated.png");
        fs::write(&path, [0x89, b'P', b'N', b'G', 0, 1, 2, 3, 4, 5]).unwrap();

        let err = LoadedImage::load(&path).unwrap_err();
        assert!(matches!(err, Error::ImageError(ref msg) if msg.contains("decode")));
    }
}
