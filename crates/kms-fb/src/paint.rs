// SPDX-FileCopyrightText: Copyright 2025 Au-Zone Technologies
// SPDX-License-Identifier: Apache-2.0

//! CPU drawing on packed pixel buffers.
//!
//! Rectangles are clipped to the canvas. Colours are normalised `[0, 1]`
//! components and are quantised to the channel width of the target format
//! with round-to-nearest. [`DrawFormat::Argb32`] stores premultiplied alpha.

use crate::error::{Error, Result};
use crate::format::DrawFormat;

/// Normalised RGB colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    fn lerp(self, other: Color, t: f64) -> Color {
        Color::rgb(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }
}

fn quantize(value: f64, max: u32) -> u32 {
    (value.clamp(0.0, 1.0) * max as f64 + 0.5) as u32
}

fn dequantize(value: u32, max: u32) -> f64 {
    value as f64 / max as f64
}

/// Mutable view of a packed pixel buffer.
pub struct Canvas<'a> {
    data: &'a mut [u8],
    width: u32,
    height: u32,
    stride: usize,
    format: DrawFormat,
}

impl<'a> Canvas<'a> {
    pub fn new(
        data: &'a mut [u8],
        width: u32,
        height: u32,
        stride: usize,
        format: DrawFormat,
    ) -> Result<Self> {
        let row = width as usize * format.bytes_per_pixel();
        if stride < row {
            return Err(Error::InvalidDimensions { width, height });
        }
        if height > 0 {
            let needed = (height as usize - 1) * stride + row;
            if data.len() < needed {
                return Err(Error::BufferTooSmall {
                    needed,
                    actual: data.len(),
                });
            }
        }

        Ok(Self {
            data,
            width,
            height,
            stride,
            format,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> DrawFormat {
        self.format
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride + x as usize * self.format.bytes_per_pixel()
    }

    /// Raw little-endian pixel value at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        let at = self.offset(x, y);
        match self.format {
            DrawFormat::Rgb565 => u16::from_le_bytes([self.data[at], self.data[at + 1]]) as u32,
            _ => u32::from_le_bytes([
                self.data[at],
                self.data[at + 1],
                self.data[at + 2],
                self.data[at + 3],
            ]),
        }
    }

    fn store(&mut self, x: u32, y: u32, value: u32) {
        let at = self.offset(x, y);
        match self.format {
            DrawFormat::Rgb565 => {
                self.data[at..at + 2].copy_from_slice(&(value as u16).to_le_bytes())
            }
            _ => self.data[at..at + 4].copy_from_slice(&value.to_le_bytes()),
        }
    }

    /// Colour and alpha stored at `(x, y)`, alpha premultiplication undone.
    pub fn color_at(&self, x: u32, y: u32) -> (Color, f64) {
        let v = self.pixel(x, y);
        match self.format {
            DrawFormat::Rgb565 => (
                Color::rgb(
                    dequantize(v >> 11 & 0x1f, 0x1f),
                    dequantize(v >> 5 & 0x3f, 0x3f),
                    dequantize(v & 0x1f, 0x1f),
                ),
                1.0,
            ),
            DrawFormat::Rgb24 => (
                Color::rgb(
                    dequantize(v >> 16 & 0xff, 0xff),
                    dequantize(v >> 8 & 0xff, 0xff),
                    dequantize(v & 0xff, 0xff),
                ),
                1.0,
            ),
            DrawFormat::Rgb30 => (
                Color::rgb(
                    dequantize(v >> 20 & 0x3ff, 0x3ff),
                    dequantize(v >> 10 & 0x3ff, 0x3ff),
                    dequantize(v & 0x3ff, 0x3ff),
                ),
                1.0,
            ),
            DrawFormat::Argb32 => {
                let a = dequantize(v >> 24, 0xff);
                let un = |c: u32| {
                    if a > 0.0 {
                        (dequantize(c, 0xff) / a).min(1.0)
                    } else {
                        0.0
                    }
                };
                (
                    Color::rgb(un(v >> 16 & 0xff), un(v >> 8 & 0xff), un(v & 0xff)),
                    a,
                )
            }
        }
    }

    fn encode(&self, color: Color, alpha: f64) -> u32 {
        match self.format {
            DrawFormat::Rgb565 => {
                quantize(color.r, 0x1f) << 11 | quantize(color.g, 0x3f) << 5 | quantize(color.b, 0x1f)
            }
            DrawFormat::Rgb24 => {
                0xff << 24
                    | quantize(color.r, 0xff) << 16
                    | quantize(color.g, 0xff) << 8
                    | quantize(color.b, 0xff)
            }
            DrawFormat::Rgb30 => {
                0x3 << 30
                    | quantize(color.r, 0x3ff) << 20
                    | quantize(color.g, 0x3ff) << 10
                    | quantize(color.b, 0x3ff)
            }
            DrawFormat::Argb32 => {
                quantize(alpha, 0xff) << 24
                    | quantize(color.r * alpha, 0xff) << 16
                    | quantize(color.g * alpha, 0xff) << 8
                    | quantize(color.b * alpha, 0xff)
            }
        }
    }

    /// Sets one pixel, ignoring coordinates outside the canvas.
    pub fn put_pixel(&mut self, x: i32, y: i32, color: Color) {
        if x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height {
            let value = self.encode(color, 1.0);
            self.store(x as u32, y as u32, value);
        }
    }

    /// Visits every in-bounds pixel of the rectangle.
    fn fill_with<F>(&mut self, x: i32, y: i32, w: i32, h: i32, mut shade: F)
    where
        F: FnMut(&Self, u32, u32) -> u32,
    {
        let x0 = x.max(0) as i64;
        let y0 = y.max(0) as i64;
        let x1 = (x as i64 + w.max(0) as i64).min(self.width as i64);
        let y1 = (y as i64 + h.max(0) as i64).min(self.height as i64);

        for py in y0..y1 {
            for px in x0..x1 {
                let value = shade(self, px as u32, py as u32);
                self.store(px as u32, py as u32, value);
            }
        }
    }

    // =========================================================================
    // Painting operations
    // =========================================================================

    /// Fills a rectangle with a solid colour.
    pub fn paint_color(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        let value = self.encode(color, 1.0);
        self.fill_with(x, y, w, h, |_, _, _| value);
    }

    /// Composites a translucent rectangle over the existing contents.
    pub fn paint_color_alpha(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color, alpha: f64) {
        let alpha = alpha.clamp(0.0, 1.0);
        self.fill_with(x, y, w, h, |canvas, px, py| {
            let (dst, dst_alpha) = canvas.color_at(px, py);
            let out_alpha = alpha + dst_alpha * (1.0 - alpha);
            let mixed = if out_alpha > 0.0 {
                let blend = |s: f64, d: f64| (s * alpha + d * dst_alpha * (1.0 - alpha)) / out_alpha;
                Color::rgb(
                    blend(color.r, dst.r),
                    blend(color.g, dst.g),
                    blend(color.b, dst.b),
                )
            } else {
                Color::BLACK
            };
            canvas.encode(mixed, out_alpha)
        });
    }

    /// Fills a rectangle with a gradient fading from `color` to black along
    /// its diagonal.
    pub fn paint_gradient(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        self.paint_gradient_range(x, y, w, h, Color::BLACK, color);
    }

    /// Fills a rectangle with a linear gradient from `end` at `(x, y)` to
    /// `start` at `(x + w, y + h)`, sampled at pixel centres and padded beyond
    /// the end points.
    pub fn paint_gradient_range(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        start: Color,
        end: Color,
    ) {
        let (dx, dy) = (w as f64, h as f64);
        let len2 = dx * dx + dy * dy;

        self.fill_with(x, y, w, h, |canvas, px, py| {
            let cx = px as f64 + 0.5 - x as f64;
            let cy = py as f64 + 0.5 - y as f64;
            let t = if len2 > 0.0 {
                ((cx * dx + cy * dy) / len2).clamp(0.0, 1.0)
            } else {
                0.0
            };
            canvas.encode(end.lerp(start, t), 1.0)
        });
    }

    /// Draws the standard test pattern: four gradient bars (red, green,
    /// blue, white) across the middle and a marker on every corner.
    pub fn paint_test_pattern(&mut self) {
        let bar_width = self.width as f64 * 0.75;
        let bar_height = self.height as f64 * 0.08;
        let x = ((self.width / 2) as f64 - bar_width / 2.0) as i32;
        // Bar origins are whole pixels, so the 8% steps truncate as they add up.
        let mut y = (self.height as f64 * 0.10) as i32;

        for color in [Color::RED, Color::GREEN, Color::BLUE, Color::WHITE] {
            self.paint_gradient(x, y, bar_width as i32, bar_height as i32, color);
            y = (y as f64 + bar_height) as i32;
        }

        let (w, h) = (self.width as i32, self.height as i32);
        for (cx, cy) in [(0, 0), (w, 0), (0, h), (w, h)] {
            self.paint_marker(cx, cy);
        }
    }

    /// Crosshair and ring centred on `(x, y)`: a black outline under a white
    /// core.
    fn paint_marker(&mut self, x: i32, y: i32) {
        const ARM: i32 = 20;
        const RADIUS: i32 = 10;

        for (half, color) in [(2, Color::BLACK), (1, Color::WHITE)] {
            let reach = ARM + half;
            self.paint_color(x - half, y - reach, 2 * half, 2 * reach, color);
            self.paint_color(x - reach, y - half, 2 * reach, 2 * half, color);

            let value = self.encode(color, 1.0);
            let outer = RADIUS + half;
            self.fill_with(x - outer, y - outer, 2 * outer, 2 * outer, |canvas, px, py| {
                let dx = px as f64 + 0.5 - x as f64;
                let dy = py as f64 + 0.5 - y as f64;
                if (dx.hypot(dy) - RADIUS as f64).abs() <= half as f64 {
                    value
                } else {
                    canvas.pixel(px, py)
                }
            });
        }
    }
}
