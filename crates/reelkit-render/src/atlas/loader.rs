//! Symbol descriptors and asynchronous image loading.

use std::path::PathBuf;
use std::sync::Arc;

use futures_lite::future::Boxed;
use image::RgbaImage;

use crate::Color;

/// Where a symbol's pixels come from.
#[derive(Debug, Clone, Default)]
pub enum SymbolImage {
    /// An encoded image file on disk.
    Path(PathBuf),
    /// Encoded image bytes (PNG).
    Encoded(Arc<[u8]>),
    /// Already decoded pixels.
    Rgba(RgbaImage),
    /// No image; the symbol always uses its fallback tile.
    #[default]
    None,
}

/// One symbol to pack into the atlas.
#[derive(Debug, Clone)]
pub struct SymbolDescriptor {
    pub id: String,
    pub image: SymbolImage,
    /// Fill color for the fallback tile. Derived from the ID when unset.
    pub fallback_color: Option<Color>,
    /// Share pixels with another symbol while keeping a separate entry.
    pub alias_of: Option<String>,
}

impl SymbolDescriptor {
    pub fn new(id: impl Into<String>, image: SymbolImage) -> Self {
        Self {
            id: id.into(),
            image,
            fallback_color: None,
            alias_of: None,
        }
    }

    pub fn from_path(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(id, SymbolImage::Path(path.into()))
    }

    /// A symbol drawn with the same pixels as `target`, such as the blank `_`.
    pub fn alias(id: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            alias_of: Some(target.into()),
            ..Self::new(id, SymbolImage::None)
        }
    }

    pub fn with_fallback_color(mut self, color: Color) -> Self {
        self.fallback_color = Some(color);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageLoadError {
    Io { path: PathBuf, message: String },
    Decode(String),
    NoImage,
}

impl std::fmt::Display for ImageLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageLoadError::Io { path, message } => write!(f, "Failed to read {}: {}", path.display(), message),
            ImageLoadError::Decode(msg) => write!(f, "Failed to decode image: {}", msg),
            ImageLoadError::NoImage => write!(f, "Symbol has no image"),
        }
    }
}

impl std::error::Error for ImageLoadError {}

/// Loads symbol images for the atlas.
///
/// Loading happens before the render loop consumes the atlas, so
/// implementations may do blocking I/O inside the returned future.
pub trait ImageLoader: Send + Sync {
    fn load(&self, source: &SymbolImage) -> Boxed<Result<RgbaImage, ImageLoadError>>;
}

/// Reads files from disk and decodes them with the `image` crate.
#[derive(Debug, Default, Clone)]
pub struct FileImageLoader {
    /// Relative paths are resolved against this directory.
    pub base_dir: Option<PathBuf>,
}

impl FileImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }
}

fn decode(bytes: &[u8]) -> Result<RgbaImage, ImageLoadError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| ImageLoadError::Decode(e.to_string()))
}

impl ImageLoader for FileImageLoader {
    fn load(&self, source: &SymbolImage) -> Boxed<Result<RgbaImage, ImageLoadError>> {
        let source = source.clone();
        let base_dir = self.base_dir.clone();
        Box::pin(async move {
            match source {
                SymbolImage::Path(path) => {
                    let path = match base_dir {
                        Some(base) if path.is_relative() => base.join(path),
                        _ => path,
                    };
                    let bytes = std::fs::read(&path).map_err(|e| ImageLoadError::Io {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
                    decode(&bytes)
                }
                SymbolImage::Encoded(bytes) => decode(&bytes),
                SymbolImage::Rgba(image) => Ok(image),
                SymbolImage::None => Err(ImageLoadError::NoImage),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(color: [u8; 4]) -> Vec<u8> {
        let image = RgbaImage::from_pixel(4, 4, image::Rgba(color));
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cherry.png"), png_bytes([255, 0, 0, 255])).unwrap();

        let loader = FileImageLoader::with_base_dir(dir.path());
        let image = pollster::block_on(loader.load(&SymbolImage::Path("cherry.png".into()))).unwrap();
        assert_eq!(image.dimensions(), (4, 4));
        assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileImageLoader::new();
        let err = pollster::block_on(loader.load(&SymbolImage::Path(dir.path().join("nope.png")))).unwrap_err();
        assert!(matches!(err, ImageLoadError::Io { .. }));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let loader = FileImageLoader::new();
        let err = pollster::block_on(loader.load(&SymbolImage::Encoded(Arc::from(&b"not a png"[..])))).unwrap_err();
        assert!(matches!(err, ImageLoadError::Decode(_)));
    }

    #[test]
    fn test_encoded_png() {
        let loader = FileImageLoader::new();
        let bytes: Arc<[u8]> = png_bytes([0, 255, 0, 255]).into();
        let image = pollster::block_on(loader.load(&SymbolImage::Encoded(bytes))).unwrap();
        assert_eq!(image.get_pixel(3, 3).0, [0, 255, 0, 255]);
    }
}
