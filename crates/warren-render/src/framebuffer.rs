//! Offscreen render targets.
//!
//! A [`FrameBuffer`] holds an RGB8 color buffer and a depth buffer. Drawing
//! goes through a [`BoundFrameBuffer`] obtained from [`FrameBuffer::bind`];
//! the buffer is marked unbound again when the guard is dropped, on every
//! exit path.

use std::ops::{Deref, DerefMut};

use crate::error::RenderError;
use crate::texture::to_byte;

/// RGB8 color buffer plus depth buffer. Row 0 is the top of the image.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    color: Vec<u8>,
    depth: Vec<f32>,
    bound: bool,
}

impl FrameBuffer {
    /// Allocate a `width` x `height` target.
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        let pixels = (width as usize) * (height as usize);
        Ok(Self {
            width,
            height,
            color: vec![0; pixels * 3],
            depth: vec![f32::INFINITY; pixels],
            bound: false,
        })
    }

    /// Bind the buffer for drawing until the returned guard is dropped.
    pub fn bind(&mut self) -> BoundFrameBuffer<'_> {
        self.bound = true;
        BoundFrameBuffer { target: self }
    }

    /// `true` while a [`BoundFrameBuffer`] guard is alive.
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size of the color buffer in bytes (`width * height * 3`).
    pub fn size(&self) -> usize {
        self.color.len()
    }

    /// Color bytes, row-major RGB, row 0 at the top.
    pub fn pixels(&self) -> &[u8] {
        &self.color
    }

    /// Depth value at a pixel (NDC depth in `[-1, 1]`, infinity if empty).
    pub fn depth_at(&self, x: u32, y: u32) -> f32 {
        self.depth[(y * self.width + x) as usize]
    }

    /// Color of a pixel.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * self.width + x) * 3) as usize;
        [self.color[i], self.color[i + 1], self.color[i + 2]]
    }

    /// Fill the color buffer with `background` and reset depth.
    pub fn clear(&mut self, background: [f32; 3]) {
        let rgb = background.map(to_byte);
        for px in self.color.chunks_exact_mut(3) {
            px.copy_from_slice(&rgb);
        }
        self.depth.fill(f32::INFINITY);
    }

    /// Depth-tested write. Returns `true` if the fragment was kept.
    pub(crate) fn write(&mut self, x: u32, y: u32, depth: f32, color: [f32; 3]) -> bool {
        let i = (y * self.width + x) as usize;
        if depth >= self.depth[i] {
            return false;
        }
        self.depth[i] = depth;
        self.color[i * 3..i * 3 + 3].copy_from_slice(&color.map(to_byte));
        true
    }
}

/// A bound [`FrameBuffer`]. Unbinds on drop.
#[derive(Debug)]
pub struct BoundFrameBuffer<'a> {
    target: &'a mut FrameBuffer,
}

impl Deref for BoundFrameBuffer<'_> {
    type Target = FrameBuffer;

    fn deref(&self) -> &FrameBuffer {
        self.target
    }
}

impl DerefMut for BoundFrameBuffer<'_> {
    fn deref_mut(&mut self) -> &mut FrameBuffer {
        self.target
    }
}

impl Drop for BoundFrameBuffer<'_> {
    fn drop(&mut self) {
        self.target.bound = false;
    }
}

/// Square depth-only target used for the shadow pass.
#[derive(Debug, Clone)]
pub struct DepthMap {
    size: u32,
    depth: Vec<f32>,
}

impl DepthMap {
    /// Allocate a `size` x `size` depth map.
    pub fn new(size: u32) -> Result<Self, RenderError> {
        if size == 0 {
            return Err(RenderError::InvalidDimensions {
                width: size,
                height: size,
            });
        }
        Ok(Self {
            size,
            depth: vec![f32::INFINITY; (size as usize) * (size as usize)],
        })
    }

    /// Edge length in texels.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Reset every texel to "nothing drawn".
    pub fn clear(&mut self) {
        self.depth.fill(f32::INFINITY);
    }

    /// Stored depth at a texel.
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.depth[(y * self.size + x) as usize]
    }

    /// Keep the nearer of the stored and the given depth.
    pub(crate) fn write_min(&mut self, x: u32, y: u32, depth: f32) {
        let i = (y * self.size + x) as usize;
        if depth < self.depth[i] {
            self.depth[i] = depth;
        }
    }
}
