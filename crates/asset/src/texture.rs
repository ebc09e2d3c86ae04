//! Texture loading and data structures.

use std::borrow::Cow;
use std::path::Path;

use anyhow::{Context, ensure};

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgb8,
    Rgba8,
}

impl TextureFormat {
    /// Three-channel images keep RGB, everything else is widened to RGBA.
    pub fn for_channel_count(channels: u8) -> Self {
        if channels == 3 {
            TextureFormat::Rgb8
        } else {
            TextureFormat::Rgba8
        }
    }

    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::Rgb8 => 3,
            TextureFormat::Rgba8 => 4,
        }
    }
}

impl TextureData {
    pub fn new(width: u32, height: u32, format: TextureFormat, data: Vec<u8>) -> anyhow::Result<Self> {
        let expected = byte_len(width, height, format)
            .with_context(|| format!("{width}x{height} texture is too large to address"))?;
        ensure!(
            data.len() == expected,
            "{width}x{height} {format:?} texture needs {expected} bytes, got {}",
            data.len()
        );
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    /// Load a texture from an image file (PNG or JPEG).
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let img = image::open(path).with_context(|| format!("Failed to open image {:?}", path))?;
        let channels = img.color().channel_count();
        let (width, height) = (img.width(), img.height());

        let format = TextureFormat::for_channel_count(channels);
        let data = match format {
            TextureFormat::Rgb8 => img.into_rgb8().into_raw(),
            TextureFormat::Rgba8 => img.into_rgba8().into_raw(),
        };

        log::info!(
            "Loaded texture {}x{} ({} channels, {:?}) with {} bytes",
            width,
            height,
            channels,
            format,
            data.len()
        );

        Self::new(width, height, format, data)
    }

    /// Create a simple test texture (checkerboard pattern).
    pub fn create_test_texture(size: u32) -> Self {
        let mut data = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let checker = ((x / 8) + (y / 8)) % 2;
                if checker == 0 {
                    data.extend_from_slice(&[255, 255, 255, 255]);
                } else {
                    data.extend_from_slice(&[128, 128, 128, 255]);
                }
            }
        }

        Self {
            data,
            width: size,
            height: size,
            format: TextureFormat::Rgba8,
        }
    }

    /// 1x1 opaque white, bound when an exercise does not sample a texture.
    pub fn white() -> Self {
        Self {
            data: vec![255; 4],
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8,
        }
    }

    /// Pixels as tightly packed RGBA8, widening RGB with opaque alpha.
    pub fn rgba8_pixels(&self) -> Cow<'_, [u8]> {
        match self.format {
            TextureFormat::Rgba8 => Cow::Borrowed(&self.data),
            TextureFormat::Rgb8 => Cow::Owned(
                self.data
                    .chunks_exact(3)
                    .flat_map(|px| [px[0], px[1], px[2], 255])
                    .collect(),
            ),
        }
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        byte_len(self.width, self.height, self.format) == Some(self.data.len())
            && self.width > 0
            && self.height > 0
    }
}

fn byte_len(width: u32, height: u32, format: TextureFormat) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(format.bytes_per_pixel() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_channel_count() {
        assert_eq!(TextureFormat::for_channel_count(3), TextureFormat::Rgb8);
        for channels in [1, 2, 4] {
            assert_eq!(TextureFormat::for_channel_count(channels), TextureFormat::Rgba8);
        }
    }

    #[test]
    fn rgb_is_widened_for_upload() {
        let tex = TextureData::new(2, 1, TextureFormat::Rgb8, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(tex.rgba8_pixels().as_ref(), &[1, 2, 3, 255, 4, 5, 6, 255]);
        assert!(tex.is_valid());
    }

    #[test]
    fn size_mismatch_is_rejected() {
        assert!(TextureData::new(2, 2, TextureFormat::Rgba8, vec![0; 15]).is_err());
    }

    #[test]
    fn huge_dimensions_are_invalid_not_overflowing() {
        let tex = TextureData {
            data: Vec::new(),
            width: 65_536,
            height: 65_536,
            format: TextureFormat::Rgba8,
        };
        assert!(!tex.is_valid());
        assert!(TextureData::new(u32::MAX, u32::MAX, TextureFormat::Rgba8, Vec::new()).is_err());
    }

    #[test]
    fn fallback_textures_are_valid() {
        assert!(TextureData::create_test_texture(64).is_valid());
        assert!(TextureData::white().is_valid());
    }

    #[test]
    fn loads_rgb_png_as_rgb() {
        let path = std::env::temp_dir().join(format!("cubeview-rgb-{}.png", std::process::id()));
        image::RgbImage::from_pixel(4, 2, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();
        let tex = TextureData::load(&path);
        std::fs::remove_file(&path).ok();

        let tex = tex.unwrap();
        assert_eq!((tex.width, tex.height, tex.format), (4, 2, TextureFormat::Rgb8));
        assert_eq!(&tex.data[..3], &[10, 20, 30]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(TextureData::load("/nonexistent/cubeview.png").is_err());
    }
}
