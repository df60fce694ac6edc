//! Texture images and their GPU copies
//!
//! Images are decoded to RGBA8 when a textured material is registered, so a
//! missing or corrupt file is reported before the renderer exists. The GPU
//! side only copies already-decoded pixels.

use std::fmt;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use thiserror::Error;
use wgpu::util::DeviceExt;

/// Errors from reading texture files
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to read texture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode texture {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("texture {0} has no pixels")]
    Empty(PathBuf),
}

/// Decoded RGBA8 pixels, plus the file they came from
#[derive(Clone)]
pub struct TextureImage {
    pixels: RgbaImage,
    source: Option<PathBuf>,
}

impl TextureImage {
    /// Read and decode an image file (PNG or JPEG)
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not an image, or is
    /// zero-sized
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| TextureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let pixels = image::load_from_memory(&bytes)
            .map_err(|source| TextureError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .into_rgba8();
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(TextureError::Empty(path.to_path_buf()));
        }

        log::debug!(
            "decoded texture {} ({}x{})",
            path.display(),
            pixels.width(),
            pixels.height()
        );
        Ok(Self {
            pixels,
            source: Some(path.to_path_buf()),
        })
    }

    /// A single pixel of one color
    #[must_use]
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(1, 1, Rgba(rgba)),
            source: None,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Row-major RGBA bytes
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

impl fmt::Debug for TextureImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("source", &self.source)
            .finish()
    }
}

/// A sampled GPU texture
#[derive(Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    /// Copy decoded pixels into a new sRGB texture with a repeating sampler
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &TextureImage,
        label: Option<&str>,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label,
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            image.pixels(),
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        log::debug!(
            "uploaded texture {} ({}x{})",
            label.unwrap_or("<unnamed>"),
            size.width,
            size.height
        );
        Self {
            texture,
            view,
            sampler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brick.png");
        RgbaImage::from_pixel(4, 2, Rgba([200, 80, 60, 255]))
            .save(&path)
            .unwrap();

        let image = TextureImage::load(&path).unwrap();
        assert_eq!((image.width(), image.height()), (4, 2));
        assert_eq!(image.pixels().len(), 4 * 2 * 4);
        assert_eq!(&image.pixels()[..4], &[200, 80, 60, 255]);
        assert_eq!(image.source(), Some(path.as_path()));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TextureImage::load(dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, TextureError::Io { .. }));
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = TextureImage::load(&path).unwrap_err();
        assert!(matches!(err, TextureError::Decode { .. }));
    }

    #[test]
    fn test_solid() {
        let white = TextureImage::solid([255; 4]);
        assert_eq!((white.width(), white.height()), (1, 1));
        assert_eq!(white.pixels(), &[255, 255, 255, 255]);
        assert_eq!(white.source(), None);
    }
}
