// SPDX-FileCopyrightText: Copyright 2025 Au-Zone Technologies
// SPDX-License-Identifier: Apache-2.0

//! Framebuffer layout for stereo 3D display modes.

use crate::error::{Error, Result};

pub const DRM_MODE_FLAG_3D_MASK: u32 = 0x1f << 14;
pub const DRM_MODE_FLAG_3D_FRAME_PACKING: u32 = 1 << 14;
pub const DRM_MODE_FLAG_3D_TOP_AND_BOTTOM: u32 = 7 << 14;
pub const DRM_MODE_FLAG_3D_SIDE_BY_SIDE_HALF: u32 = 8 << 14;

/// Stereo packing of a display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StereoMode {
    TopAndBottom,
    SideBySideHalf,
    FramePacking,
}

impl StereoMode {
    /// Extracts the stereo packing from DRM mode flags.
    pub fn from_mode_flags(flags: u32) -> Result<Self> {
        match flags & DRM_MODE_FLAG_3D_MASK {
            DRM_MODE_FLAG_3D_TOP_AND_BOTTOM => Ok(StereoMode::TopAndBottom),
            DRM_MODE_FLAG_3D_SIDE_BY_SIDE_HALF => Ok(StereoMode::SideBySideHalf),
            DRM_MODE_FLAG_3D_FRAME_PACKING => Ok(StereoMode::FramePacking),
            other => Err(Error::UnsupportedStereoMode(other)),
        }
    }
}

/// Timing fields of a display mode that stereo layout depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTiming {
    pub hdisplay: u32,
    pub vdisplay: u32,
    pub vtotal: u32,
    pub flags: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Framebuffer size and per-eye regions for a stereo mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StereoLayout {
    pub fb_width: u32,
    pub fb_height: u32,
    pub left: Rect,
    pub right: Rect,
}

impl StereoLayout {
    pub fn from_mode(mode: &ModeTiming) -> Result<Self> {
        let (h, v) = (mode.hdisplay, mode.vdisplay);

        let layout = match StereoMode::from_mode_flags(mode.flags)? {
            StereoMode::TopAndBottom => {
                let middle = v / 2;
                StereoLayout {
                    fb_width: h,
                    fb_height: v,
                    left: Rect::new(0, 0, h, middle),
                    right: Rect::new(0, middle, h, v - middle),
                }
            }
            StereoMode::SideBySideHalf => {
                let middle = h / 2;
                StereoLayout {
                    fb_width: h,
                    fb_height: v,
                    left: Rect::new(0, 0, middle, v),
                    right: Rect::new(middle, 0, h - middle, v),
                }
            }
            StereoMode::FramePacking => {
                // The vertical blank between the eyes is active space.
                let gap = mode.vtotal.saturating_sub(v);
                StereoLayout {
                    fb_width: h,
                    fb_height: 2 * v + gap,
                    left: Rect::new(0, 0, h, v),
                    right: Rect::new(0, v + gap, h, v),
                }
            }
        };

        Ok(layout)
    }
}
