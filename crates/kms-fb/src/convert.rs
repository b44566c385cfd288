// SPDX-FileCopyrightText: Copyright 2025 Au-Zone Technologies
// SPDX-License-Identifier: Apache-2.0

//! NV12 <-> XRGB8888 conversion.
//!
//! Limited-range YCbCr with fixed coefficients, single-precision math and
//! truncating 8-bit output. The packed side is little-endian XRGB8888, i.e.
//! bytes `B, G, R, X` per pixel; the `X` byte is left untouched.

use crate::error::{Error, Result};
use crate::format::{PixelFormat, DRM_FORMAT_NV12};

/// Plane placement of an NV12 image inside a byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nv12Layout {
    /// Bytes per row, shared by the luma and chroma planes.
    pub stride: usize,
    pub y_offset: usize,
    pub uv_offset: usize,
}

/// Fails unless `format` is one the CPU conversion supports.
pub fn ensure_convertible(format: &PixelFormat) -> Result<()> {
    if format.drm_id == DRM_FORMAT_NV12 {
        Ok(())
    } else {
        Err(Error::ConversionNotImplemented(format.name))
    }
}

fn clamp_rgb(value: f32) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

fn ensure_len(buf: &[u8], needed: usize) -> Result<()> {
    if buf.len() < needed {
        Err(Error::BufferTooSmall {
            needed,
            actual: buf.len(),
        })
    } else {
        Ok(())
    }
}

fn check_nv12(width: usize, height: usize, buf: &[u8], layout: &Nv12Layout) -> Result<()> {
    let chroma_rows = height.div_ceil(2);
    let chroma_bytes = width.div_ceil(2) * 2;
    ensure_len(buf, layout.y_offset + (height - 1) * layout.stride + width)?;
    ensure_len(
        buf,
        layout.uv_offset + (chroma_rows - 1) * layout.stride + chroma_bytes,
    )
}

fn check_packed(width: usize, height: usize, buf: &[u8], stride: usize) -> Result<()> {
    ensure_len(buf, (height - 1) * stride + width * 4)
}

// =============================================================================
// Decode
// =============================================================================

/// Converts one pixel from luma and a Cb/Cr pair into `out[0..3]` (B, G, R).
#[inline]
fn decode_pixel(y: u8, cb: f32, cr: f32, out: &mut [u8]) {
    let luma = 1.164f32 * (y as f32 - 16.0);

    let r = 0.000f32 * cb + 1.793f32 * cr;
    let g = -0.213f32 * cb + -0.533f32 * cr;
    let b = 2.112f32 * cb + 0.000f32 * cr;

    out[0] = clamp_rgb(luma + b);
    out[1] = clamp_rgb(luma + g);
    out[2] = clamp_rgb(luma + r);
}

/// Decodes a `width` x `height` NV12 image into packed XRGB8888.
pub fn nv12_to_xrgb8888(
    width: u32,
    height: u32,
    src: &[u8],
    layout: &Nv12Layout,
    dst: &mut [u8],
    dst_stride: usize,
) -> Result<()> {
    let (width, height) = (width as usize, height as usize);
    if width == 0 || height == 0 {
        return Ok(());
    }
    check_nv12(width, height, src, layout)?;
    check_packed(width, height, dst, dst_stride)?;

    let stride = layout.stride;

    // Row pairs share one chroma row; a trailing odd row reuses the next one.
    for row in (0..height).step_by(2) {
        let uv = &src[layout.uv_offset + (row / 2) * stride..];
        let rows = if row + 1 < height { 2 } else { 1 };

        for j in 0..width {
            let cb = uv[j & !1] as f32 - 128.0;
            let cr = uv[j | 1] as f32 - 128.0;

            for r in row..row + rows {
                let y = src[layout.y_offset + r * stride + j];
                let px = r * dst_stride + j * 4;
                decode_pixel(y, cb, cr, &mut dst[px..px + 3]);
            }
        }
    }

    Ok(())
}

// =============================================================================
// Encode
// =============================================================================

#[inline]
fn bgr(src: &[u8], offset: usize) -> (f32, f32, f32) {
    (
        src[offset] as f32,
        src[offset + 1] as f32,
        src[offset + 2] as f32,
    )
}

/// Encodes a packed XRGB8888 image into NV12.
///
/// Chroma is sampled at the left column of each 2x2 block and averaged over
/// its two rows; a trailing odd row is sampled on its own.
pub fn xrgb8888_to_nv12(
    width: u32,
    height: u32,
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    layout: &Nv12Layout,
) -> Result<()> {
    let (width, height) = (width as usize, height as usize);
    if width == 0 || height == 0 {
        return Ok(());
    }
    check_packed(width, height, src, src_stride)?;
    check_nv12(width, height, dst, layout)?;

    let stride = layout.stride;

    for i in 0..height {
        for j in 0..width {
            let (b, g, r) = bgr(src, i * src_stride + j * 4);
            let y = 0.183f32 * r + 0.614f32 * g + 0.062f32 * b + 16.0;
            dst[layout.y_offset + i * stride + j] = y as u8;
        }
    }

    let chroma_width = width.div_ceil(2);

    for i in 0..height / 2 {
        let top = 2 * i * src_stride;
        let bottom = top + src_stride;
        let uv = layout.uv_offset + i * stride;

        for j in 0..chroma_width {
            let (b0, g0, r0) = bgr(src, top + j * 8);
            let (b1, g1, r1) = bgr(src, bottom + j * 8);

            let u = -0.101f32 / 2.0 * r0
                + -0.101f32 / 2.0 * r1
                + -0.339f32 / 2.0 * g0
                + -0.339f32 / 2.0 * g1
                + 0.439f32 / 2.0 * b0
                + 0.439f32 / 2.0 * b1
                + 128.0;
            let v = 0.439f32 / 2.0 * r0
                + 0.439f32 / 2.0 * r1
                + -0.339f32 / 2.0 * g0
                + -0.339f32 / 2.0 * g1
                + -0.040f32 / 2.0 * b0
                + -0.040f32 / 2.0 * b1
                + 128.0;

            dst[uv + j * 2] = u as u8;
            dst[uv + j * 2 + 1] = v as u8;
        }
    }

    if height % 2 == 1 {
        let last = (height - 1) * src_stride;
        let uv = layout.uv_offset + (height / 2) * stride;

        for j in 0..chroma_width {
            let (b, g, r) = bgr(src, last + j * 8);

            let u = -0.101f32 * r + -0.339f32 * g + 0.439f32 * b + 128.0;
            let v = 0.439f32 * r + -0.339f32 * g + -0.040f32 * b + 128.0;

            dst[uv + j * 2] = u as u8;
            dst[uv + j * 2 + 1] = v as u8;
        }
    }

    Ok(())
}
