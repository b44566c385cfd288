// SPDX-FileCopyrightText: Copyright 2025 Au-Zone Technologies
// SPDX-License-Identifier: Apache-2.0

use crate::backend::BufferHandle;
use crate::tiling::Tiling;
use four_char_code::FourCharCode;
use std::fmt;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors reported by the layout engine and its collaborators.
///
/// Unknown formats, modifiers and tile geometries are caller programming
/// errors; test harnesses are expected to fail hard on them.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// No registry entry for this DRM fourcc value.
    UnknownFormat(u32),
    /// No registry entry for this four-character code.
    UnknownFourcc(FourCharCode),
    /// Modifier or legacy tiling constant that maps to no tiling mode.
    UnknownModifier(u64),
    /// The tiling mode has no tile geometry for this bits-per-pixel value.
    UnsupportedBpp { tiling: Tiling, bpp: u32 },
    /// No registry entry with this bpp/depth pair.
    BppDepthNotFound { bpp: u32, depth: u32 },
    /// CPU conversion exists only for NV12 among the planar formats.
    ConversionNotImplemented(&'static str),
    InvalidDimensions { width: u32, height: u32 },
    /// A stride or size computation overflowed `u32`.
    Overflow,
    UnknownBuffer(BufferHandle),
    OutOfBounds {
        buffer: BufferHandle,
        offset: usize,
        len: usize,
        size: usize,
    },
    /// A pixel buffer handed to a conversion is shorter than its layout.
    BufferTooSmall { needed: usize, actual: usize },
    /// Failure reported by a collaborator implementation.
    Backend(String),
    UnsupportedStereoMode(u32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownFormat(code) => write!(f, "DRM format {code:08x} not found"),
            Error::UnknownFourcc(code) => write!(f, "pixel format {code:?} not found"),
            Error::UnknownModifier(m) => write!(f, "unknown tiling modifier 0x{m:x}"),
            Error::UnsupportedBpp { tiling, bpp } => {
                write!(f, "{tiling} tiling has no tile geometry for {bpp} bpp")
            }
            Error::BppDepthNotFound { bpp, depth } => {
                write!(f, "can't find drm format with bpp={bpp}, depth={depth}")
            }
            Error::ConversionNotImplemented(name) => {
                write!(f, "conversion not implemented for planar format {name}")
            }
            Error::InvalidDimensions { width, height } => {
                write!(f, "invalid framebuffer dimensions {width}x{height}")
            }
            Error::Overflow => write!(f, "framebuffer layout overflows u32"),
            Error::UnknownBuffer(handle) => write!(f, "unknown buffer {handle}"),
            Error::OutOfBounds {
                buffer,
                offset,
                len,
                size,
            } => write!(
                f,
                "range {offset}..{} exceeds buffer {buffer} of {size} bytes",
                offset.saturating_add(*len)
            ),
            Error::BufferTooSmall { needed, actual } => {
                write!(f, "pixel buffer holds {actual} bytes, layout needs {needed}")
            }
            Error::Backend(msg) => write!(f, "backend failure: {msg}"),
            Error::UnsupportedStereoMode(flags) => {
                write!(f, "unsupported stereo 3D mode flags 0x{flags:x}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<nix::Error> for Error {
    fn from(err: nix::Error) -> Self {
        Error::Backend(err.to_string())
    }
}
