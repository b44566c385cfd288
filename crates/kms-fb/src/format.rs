// SPDX-FileCopyrightText: Copyright 2025 Au-Zone Technologies
// SPDX-License-Identifier: Apache-2.0

//! Pixel format registry.
//!
//! The registry is a fixed table built at compile time. Formats are looked up
//! either by their [`FourCharCode`] or by the little-endian DRM fourcc value
//! the kernel uses in its buffer-description structures.

use crate::error::{Error, Result};
use four_char_code::{four_char_code, FourCharCode};
use std::sync::OnceLock;

// =============================================================================
// Four-character codes
// =============================================================================

pub const RGB565: FourCharCode = four_char_code!("RG16");
pub const XRGB8888: FourCharCode = four_char_code!("XR24");
pub const XRGB2101010: FourCharCode = four_char_code!("XR30");
pub const ARGB8888: FourCharCode = four_char_code!("AR24");
pub const NV12: FourCharCode = four_char_code!("NV12");

/// Builds the DRM fourcc value (`fourcc_code()` in `drm_fourcc.h`).
pub const fn drm_fourcc(code: &[u8; 4]) -> u32 {
    (code[0] as u32) | (code[1] as u32) << 8 | (code[2] as u32) << 16 | (code[3] as u32) << 24
}

pub const DRM_FORMAT_RGB565: u32 = drm_fourcc(b"RG16");
pub const DRM_FORMAT_XRGB8888: u32 = drm_fourcc(b"XR24");
pub const DRM_FORMAT_XRGB2101010: u32 = drm_fourcc(b"XR30");
pub const DRM_FORMAT_ARGB8888: u32 = drm_fourcc(b"AR24");
pub const DRM_FORMAT_NV12: u32 = drm_fourcc(b"NV12");

/// Maximum number of planes a framebuffer can describe.
pub const MAX_PLANES: usize = 4;

// =============================================================================
// Format descriptions
// =============================================================================

/// Packed pixel layout the CPU drawing code renders into.
///
/// Planar formats are drawn through a converted [`DrawFormat::Rgb24`] view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawFormat {
    /// 16-bit 5:6:5 RGB.
    Rgb565,
    /// 32-bit xRGB, upper byte unused.
    Rgb24,
    /// 32-bit x:10:10:10 RGB.
    Rgb30,
    /// 32-bit ARGB.
    Argb32,
}

impl DrawFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            DrawFormat::Rgb565 => 2,
            DrawFormat::Rgb24 | DrawFormat::Rgb30 | DrawFormat::Argb32 => 4,
        }
    }
}

/// Immutable description of a pixel encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelFormat {
    pub code: FourCharCode,
    pub drm_id: u32,
    pub name: &'static str,
    /// Bits per pixel of the packed representation.
    pub bpp: u32,
    /// Colour depth, `None` for YUV formats.
    pub depth: Option<u32>,
    /// Zero for packed formats.
    pub planes: u32,
    pub plane_bpp: [u32; MAX_PLANES],
    pub draw_format: DrawFormat,
}

impl PixelFormat {
    const fn packed(
        code: FourCharCode,
        drm_id: u32,
        name: &'static str,
        bpp: u32,
        depth: u32,
        draw_format: DrawFormat,
    ) -> Self {
        Self {
            code,
            drm_id,
            name,
            bpp,
            depth: Some(depth),
            planes: 0,
            plane_bpp: [0; MAX_PLANES],
            draw_format,
        }
    }

    /// Looks a format up by four-character code.
    pub fn lookup(code: FourCharCode) -> Result<&'static PixelFormat> {
        FORMATS
            .iter()
            .find(|f| f.code == code)
            .ok_or(Error::UnknownFourcc(code))
    }

    /// Looks a format up by DRM fourcc value.
    pub fn lookup_drm(drm_id: u32) -> Result<&'static PixelFormat> {
        FORMATS
            .iter()
            .find(|f| f.drm_id == drm_id)
            .ok_or(Error::UnknownFormat(drm_id))
    }

    pub fn is_planar(&self) -> bool {
        self.planes > 1
    }

    /// Number of memory planes, 1 for packed formats.
    pub fn num_planes(&self) -> usize {
        self.planes.max(1) as usize
    }

    /// Bits per pixel of `plane`; packed formats report their overall bpp.
    pub fn plane_bpp(&self, plane: usize) -> u32 {
        if self.is_planar() {
            self.plane_bpp[plane]
        } else {
            self.bpp
        }
    }
}

static FORMATS: [PixelFormat; 5] = [
    PixelFormat::packed(RGB565, DRM_FORMAT_RGB565, "RGB565", 16, 16, DrawFormat::Rgb565),
    PixelFormat::packed(XRGB8888, DRM_FORMAT_XRGB8888, "XRGB8888", 32, 24, DrawFormat::Rgb24),
    PixelFormat::packed(
        XRGB2101010,
        DRM_FORMAT_XRGB2101010,
        "XRGB2101010",
        32,
        30,
        DrawFormat::Rgb30,
    ),
    PixelFormat::packed(ARGB8888, DRM_FORMAT_ARGB8888, "ARGB8888", 32, 32, DrawFormat::Argb32),
    PixelFormat {
        code: NV12,
        drm_id: DRM_FORMAT_NV12,
        name: "NV12",
        bpp: 32,
        depth: None,
        planes: 2,
        plane_bpp: [8, 16, 0, 0],
        draw_format: DrawFormat::Rgb24,
    },
];

// =============================================================================
// Registry queries
// =============================================================================

/// All registered formats, in registry order.
pub fn formats() -> &'static [PixelFormat] {
    &FORMATS
}

/// Returns the packed RGB format matching `bpp` and `depth`.
pub fn bpp_depth_to_format(bpp: u32, depth: u32) -> Result<&'static PixelFormat> {
    FORMATS
        .iter()
        .find(|f| f.bpp == bpp && f.depth == Some(depth))
        .ok_or(Error::BppDepthNotFound { bpp, depth })
}

/// Bits per pixel of the format with DRM fourcc `drm_id`.
pub fn format_to_bpp(drm_id: u32) -> Result<u32> {
    PixelFormat::lookup_drm(drm_id).map(|f| f.bpp)
}

/// Human-readable name of `drm_id`, or `"invalid"` when it is not registered.
pub fn format_str(drm_id: u32) -> &'static str {
    PixelFormat::lookup_drm(drm_id).map_or("invalid", |f| f.name)
}

static DRAWABLE: OnceLock<Vec<u32>> = OnceLock::new();

/// DRM fourcc values of every format the CPU drawing code can render into.
pub fn drawable_formats() -> &'static [u32] {
    DRAWABLE.get_or_init(|| FORMATS.iter().map(|f| f.drm_id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drm_codes_are_little_endian() {
        assert_eq!(DRM_FORMAT_XRGB8888, 0x3432_5258);
        assert_eq!(DRM_FORMAT_NV12, 0x3231_564e);
    }

    #[test]
    fn packed_formats_report_one_plane() {
        let f = PixelFormat::lookup(XRGB8888).unwrap();
        assert!(!f.is_planar());
        assert_eq!(f.num_planes(), 1);
        assert_eq!(f.plane_bpp(0), 32);
    }
}
