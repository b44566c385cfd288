// SPDX-FileCopyrightText: Copyright 2025 Au-Zone Technologies
// SPDX-License-Identifier: Apache-2.0

//! Stride, size and plane offset computation.
//!
//! The values produced here are what the kernel expects when the buffer is
//! registered as a scanout surface, so they must be bit-exact and
//! deterministic for a given input.

use crate::error::{Error, Result};
use crate::format::{PixelFormat, MAX_PLANES};
use crate::tiling::{tile_size, DeviceInfo, Tiling};

/// Smallest stride handed out for tiled buffers on fence-register hardware.
pub const LEGACY_STRIDE_FLOOR: u32 = 512;

/// Smallest allocation handed out for tiled buffers on fence-register
/// hardware.
pub const LEGACY_SIZE_FLOOR: u32 = 1024 * 1024;

/// Geometry of a framebuffer's backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferLayout {
    /// Bytes per row, shared by every plane.
    pub stride: u32,
    /// Total allocation size in bytes.
    pub size: u32,
    /// Byte offset of each plane; unused slots are zero.
    pub offsets: [u32; MAX_PLANES],
}

// =============================================================================
// Plane geometry
// =============================================================================

fn is_subsampled_chroma(format: &PixelFormat, plane: usize) -> bool {
    format.is_planar() && plane == 1
}

/// Width in pixels of `plane`. The NV12 chroma plane is half width, rounded up.
pub fn plane_width(format: &PixelFormat, width: u32, plane: usize) -> u32 {
    if is_subsampled_chroma(format, plane) {
        width.div_ceil(2)
    } else {
        width
    }
}

/// Height in rows of `plane`. The NV12 chroma plane is half height, rounded up.
pub fn plane_height(format: &PixelFormat, height: u32, plane: usize) -> u32 {
    if is_subsampled_chroma(format, plane) {
        height.div_ceil(2)
    } else {
        height
    }
}

/// Unaligned bytes per row of `plane`.
pub fn plane_stride(format: &PixelFormat, width: u32, plane: usize) -> Result<u32> {
    plane_width(format, width, plane)
        .checked_mul(format.plane_bpp(plane) / 8)
        .ok_or(Error::Overflow)
}

/// Rounds `value` up to a multiple of `align`.
pub fn align_up(value: u32, align: u32) -> Result<u32> {
    value
        .div_ceil(align)
        .checked_mul(align)
        .ok_or(Error::Overflow)
}

// =============================================================================
// Layout calculation
// =============================================================================

/// Computes the layout of a `width` x `height` buffer in `format` with
/// `tiling` on `device`.
pub fn calc_fb_layout(
    device: &DeviceInfo,
    width: u32,
    height: u32,
    format: &PixelFormat,
    tiling: Tiling,
) -> Result<BufferLayout> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }

    if format.is_planar() {
        calc_planar(device, width, height, format, tiling)
    } else {
        calc_packed(device, width, height, format, tiling)
    }
}

/// Returns `(size, stride)` for the given parameters.
pub fn calc_fb_size(
    device: &DeviceInfo,
    width: u32,
    height: u32,
    format: &PixelFormat,
    tiling: Tiling,
) -> Result<(u32, u32)> {
    let layout = calc_fb_layout(device, width, height, format, tiling)?;
    Ok((layout.size, layout.stride))
}

fn calc_planar(
    device: &DeviceInfo,
    width: u32,
    height: u32,
    format: &PixelFormat,
    tiling: Tiling,
) -> Result<BufferLayout> {
    let planes = format.num_planes();
    let mut layout = BufferLayout::default();

    for plane in 0..planes {
        let (tile_width, _) = tile_size(device, tiling, format.plane_bpp(plane))?;
        let stride = align_up(plane_stride(format, width, plane)?, tile_width)?;
        layout.stride = layout.stride.max(stride);
    }

    for plane in 0..planes {
        let (_, tile_height) = tile_size(device, tiling, format.plane_bpp(plane))?;
        let rows = align_up(plane_height(format, height, plane), tile_height)?;

        layout.offsets[plane] = layout.size;
        layout.size = layout
            .stride
            .checked_mul(rows)
            .and_then(|bytes| layout.size.checked_add(bytes))
            .ok_or(Error::Overflow)?;
    }

    Ok(layout)
}

fn calc_packed(
    device: &DeviceInfo,
    width: u32,
    height: u32,
    format: &PixelFormat,
    tiling: Tiling,
) -> Result<BufferLayout> {
    let (tile_width, tile_height) = tile_size(device, tiling, format.bpp)?;
    let byte_width = width.checked_mul(format.bpp / 8).ok_or(Error::Overflow)?;

    let (stride, size) = if tiling != Tiling::Linear && device.has_legacy_fences() {
        // Fences cover power-of-two regions with power-of-two pitches.
        let stride = next_pot_from(LEGACY_STRIDE_FLOOR, byte_width)?;
        let min_size = stride.checked_mul(height).ok_or(Error::Overflow)?;
        (stride, next_pot_from(LEGACY_SIZE_FLOOR, min_size)?)
    } else {
        let stride = align_up(byte_width, tile_width)?;
        let size = align_up(height, tile_height)?
            .checked_mul(stride)
            .ok_or(Error::Overflow)?;
        (stride, size)
    };

    Ok(BufferLayout {
        stride,
        size,
        offsets: [0; MAX_PLANES],
    })
}

/// Doubles `floor` until it reaches `min`.
fn next_pot_from(floor: u32, min: u32) -> Result<u32> {
    let mut value = floor;
    while value < min {
        value = value.checked_mul(2).ok_or(Error::Overflow)?;
    }
    Ok(value)
}
