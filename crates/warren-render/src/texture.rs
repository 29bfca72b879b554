//! RGB textures sampled by the rasterizer.

use std::path::Path;

use crate::error::RenderError;

/// An 8-bit RGB image, row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Texture {
    /// Wrap raw RGB bytes. `data` must hold `width * height * 3` bytes.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RenderError> {
        if width == 0 || height == 0 || data.len() != (width * height * 3) as usize {
            return Err(RenderError::InvalidTexture(format!(
                "{}x{} texture with {} bytes",
                width,
                height,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Single-texel texture of one color (components in `0..=1`).
    pub fn solid(color: [f32; 3]) -> Self {
        Self {
            width: 1,
            height: 1,
            data: color.iter().map(|&c| to_byte(c)).collect(),
        }
    }

    /// Load a PNG or JPEG file.
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let image = image::open(path).map_err(|source| RenderError::TextureLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self::from_rgb(width, height, rgb.into_raw())
    }

    /// Width in texels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Nearest-texel lookup with repeat wrapping. Returns linear `0..=1`
    /// components.
    pub fn sample(&self, u: f32, v: f32) -> [f32; 3] {
        let u = u - u.floor();
        let v = v - v.floor();
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        let i = ((y * self.width + x) * 3) as usize;
        [
            self.data[i] as f32 / 255.0,
            self.data[i + 1] as f32 / 255.0,
            self.data[i + 2] as f32 / 255.0,
        ]
    }
}

/// Convert a `0..=1` component to a byte.
pub(crate) fn to_byte(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> Texture {
        // 2x2: red, green / blue, white
        Texture::from_rgb(
            2,
            2,
            vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255],
        )
        .unwrap()
    }

    #[test]
    fn test_sample_quadrants() {
        let tex = checker();
        assert_eq!(tex.sample(0.25, 0.25), [1.0, 0.0, 0.0]);
        assert_eq!(tex.sample(0.75, 0.25), [0.0, 1.0, 0.0]);
        assert_eq!(tex.sample(0.25, 0.75), [0.0, 0.0, 1.0]);
        assert_eq!(tex.sample(0.75, 0.75), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_sample_wraps() {
        let tex = checker();
        assert_eq!(tex.sample(1.25, -0.75), tex.sample(0.25, 0.25));
        assert_eq!(tex.sample(1.0, 1.0), tex.sample(0.0, 0.0));
    }

    #[test]
    fn test_invalid_size() {
        assert!(Texture::from_rgb(2, 2, vec![0; 5]).is_err());
        assert!(Texture::from_rgb(0, 2, vec![]).is_err());
    }

    #[test]
    fn test_load_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        image::RgbImage::from_pixel(4, 4, image::Rgb([255, 0, 0]))
            .save(&path)
            .unwrap();

        let tex = Texture::load(&path).unwrap();
        assert_eq!((tex.width(), tex.height()), (4, 4));
        assert_eq!(tex.sample(0.5, 0.5), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_load_missing() {
        let err = Texture::load(Path::new("/nonexistent/texture.png"));
        assert!(matches!(err, Err(RenderError::TextureLoad { .. })));
    }
}
