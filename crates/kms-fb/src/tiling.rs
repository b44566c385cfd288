// SPDX-FileCopyrightText: Copyright 2025 Au-Zone Technologies
// SPDX-License-Identifier: Apache-2.0

//! Tiling modes and tile geometry.
//!
//! Tile dimensions depend on the tiling mode, the hardware generation and,
//! for Yf tiling, the bits per pixel of the plane. The dependency is encoded
//! as a rule table rather than nested branches: [`tile_size`] returns the
//! first rule matching `(tiling, generation class, bpp class)`.

use crate::error::{Error, Result};
use log::warn;
use std::fmt;

// =============================================================================
// Modifier and legacy tiling constants
// =============================================================================

const DRM_FORMAT_MOD_VENDOR_INTEL: u64 = 0x01;

const fn fourcc_mod_code(vendor: u64, val: u64) -> u64 {
    (vendor << 56) | (val & 0x00ff_ffff_ffff_ffff)
}

pub const DRM_FORMAT_MOD_NONE: u64 = 0;
pub const I915_FORMAT_MOD_X_TILED: u64 = fourcc_mod_code(DRM_FORMAT_MOD_VENDOR_INTEL, 1);
pub const I915_FORMAT_MOD_Y_TILED: u64 = fourcc_mod_code(DRM_FORMAT_MOD_VENDOR_INTEL, 2);
pub const I915_FORMAT_MOD_YF_TILED: u64 = fourcc_mod_code(DRM_FORMAT_MOD_VENDOR_INTEL, 3);

pub const I915_TILING_NONE: u32 = 0;
pub const I915_TILING_X: u32 = 1;
pub const I915_TILING_Y: u32 = 2;
pub const I915_TILING_YF: u32 = 3;

/// Memory layout of a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tiling {
    #[default]
    Linear,
    X,
    Y,
    Yf,
}

impl Tiling {
    pub const ALL: [Tiling; 4] = [Tiling::Linear, Tiling::X, Tiling::Y, Tiling::Yf];

    /// Converts a framebuffer modifier into a tiling mode.
    pub fn from_modifier(modifier: u64) -> Result<Self> {
        match modifier {
            DRM_FORMAT_MOD_NONE => Ok(Tiling::Linear),
            I915_FORMAT_MOD_X_TILED => Ok(Tiling::X),
            I915_FORMAT_MOD_Y_TILED => Ok(Tiling::Y),
            I915_FORMAT_MOD_YF_TILED => Ok(Tiling::Yf),
            other => Err(Error::UnknownModifier(other)),
        }
    }

    pub fn modifier(self) -> u64 {
        match self {
            Tiling::Linear => DRM_FORMAT_MOD_NONE,
            Tiling::X => I915_FORMAT_MOD_X_TILED,
            Tiling::Y => I915_FORMAT_MOD_Y_TILED,
            Tiling::Yf => I915_FORMAT_MOD_YF_TILED,
        }
    }

    /// Converts a legacy object tiling constant into a tiling mode.
    pub fn from_object_tiling(tiling: u32) -> Result<Self> {
        match tiling {
            I915_TILING_NONE => Ok(Tiling::Linear),
            I915_TILING_X => Ok(Tiling::X),
            I915_TILING_Y => Ok(Tiling::Y),
            I915_TILING_YF => Ok(Tiling::Yf),
            other => Err(Error::UnknownModifier(other as u64)),
        }
    }

    /// Legacy object tiling constant passed to `set_tiling`.
    pub fn object_tiling(self) -> u32 {
        match self {
            Tiling::Linear => I915_TILING_NONE,
            Tiling::X => I915_TILING_X,
            Tiling::Y => I915_TILING_Y,
            Tiling::Yf => I915_TILING_YF,
        }
    }

    /// Whether the CPU cannot access the layout through an aperture mapping
    /// and must go through a linear copy made by the blitter.
    pub fn needs_blit(self) -> bool {
        matches!(self, Tiling::Y | Tiling::Yf)
    }
}

impl fmt::Display for Tiling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tiling::Linear => "linear",
            Tiling::X => "X",
            Tiling::Y => "Y",
            Tiling::Yf => "Yf",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Device description
// =============================================================================

/// Generation used when nothing else is configured.
pub const DEFAULT_GEN: u32 = 9;

/// Last generation whose tiled scanout goes through power-of-two fence
/// registers.
pub const LEGACY_FENCE_MAX_GEN: u32 = 3;

/// Hardware generation parameters that affect buffer layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub gen: u32,
    /// 915-class part: a generation-3 device with the older Y-tile shape.
    pub is_915: bool,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self::new(DEFAULT_GEN)
    }
}

impl DeviceInfo {
    pub fn new(gen: u32) -> Self {
        Self { gen, is_915: false }
    }

    pub fn i915() -> Self {
        Self {
            gen: 3,
            is_915: true,
        }
    }

    /// Reads `KMS_FB_GEN` and `KMS_FB_IS_915`, falling back to
    /// [`DeviceInfo::default`] for unset or malformed values.
    pub fn from_env() -> Self {
        let mut info = Self::default();

        if let Ok(value) = std::env::var("KMS_FB_GEN") {
            match value.trim().parse::<u32>() {
                Ok(gen) => info.gen = gen,
                Err(e) => warn!("ignoring KMS_FB_GEN={value:?}: {e}"),
            }
        }

        if let Ok(value) = std::env::var("KMS_FB_IS_915") {
            info.is_915 = matches!(value.trim(), "1" | "true" | "yes");
        }

        info
    }

    /// `is_915` only applies to generation 3; other generations ignore it.
    pub fn gen_class(&self) -> GenClass {
        if self.gen == 2 {
            GenClass::Gen2
        } else if self.gen == 3 && self.is_915 {
            GenClass::I915
        } else {
            GenClass::Other
        }
    }

    /// Tiled buffers on these generations need power-of-two stride and size.
    pub fn has_legacy_fences(&self) -> bool {
        self.gen <= LEGACY_FENCE_MAX_GEN
    }
}

/// Generation buckets that tile geometry distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenClass {
    Gen2,
    I915,
    Other,
}

/// Bits-per-pixel buckets used by Yf tiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BppClass {
    Bpp8,
    Bpp16To32,
    Bpp64To128,
}

impl BppClass {
    pub fn of(bpp: u32) -> Option<Self> {
        match bpp {
            8 => Some(BppClass::Bpp8),
            16 | 32 => Some(BppClass::Bpp16To32),
            64 | 128 => Some(BppClass::Bpp64To128),
            _ => None,
        }
    }
}

// =============================================================================
// Tile geometry
// =============================================================================

struct TileRule {
    tiling: Tiling,
    gen: Option<GenClass>,
    bpp: Option<BppClass>,
    width: u32,
    height: u32,
}

const fn rule(
    tiling: Tiling,
    gen: Option<GenClass>,
    bpp: Option<BppClass>,
    width: u32,
    height: u32,
) -> TileRule {
    TileRule {
        tiling,
        gen,
        bpp,
        width,
        height,
    }
}

// First match wins, so specific rules precede catch-alls.
static TILE_RULES: [TileRule; 9] = [
    rule(Tiling::Linear, None, None, 64, 1),
    rule(Tiling::X, Some(GenClass::Gen2), None, 128, 16),
    rule(Tiling::X, None, None, 512, 8),
    rule(Tiling::Y, Some(GenClass::Gen2), None, 128, 16),
    rule(Tiling::Y, Some(GenClass::I915), None, 512, 8),
    rule(Tiling::Y, Some(GenClass::Other), None, 128, 32),
    rule(Tiling::Yf, None, Some(BppClass::Bpp8), 64, 64),
    rule(Tiling::Yf, None, Some(BppClass::Bpp16To32), 128, 32),
    rule(Tiling::Yf, None, Some(BppClass::Bpp64To128), 256, 16),
];

/// Returns `(tile width in bytes, tile height in rows)`.
pub fn tile_size(device: &DeviceInfo, tiling: Tiling, bpp: u32) -> Result<(u32, u32)> {
    let gen = device.gen_class();
    let bpp_class = BppClass::of(bpp);

    TILE_RULES
        .iter()
        .find(|r| {
            r.tiling == tiling
                && r.gen.map_or(true, |g| g == gen)
                && r.bpp.map_or(true, |b| Some(b) == bpp_class)
        })
        .map(|r| (r.width, r.height))
        .ok_or(Error::UnsupportedBpp { tiling, bpp })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_carry_intel_vendor() {
        assert_eq!(I915_FORMAT_MOD_X_TILED, 0x0100_0000_0000_0001);
        assert_eq!(I915_FORMAT_MOD_YF_TILED >> 56, DRM_FORMAT_MOD_VENDOR_INTEL);
    }

    #[test]
    fn gen_class_prefers_gen2() {
        let dev = DeviceInfo {
            gen: 2,
            is_915: true,
        };
        assert_eq!(dev.gen_class(), GenClass::Gen2);
        assert_eq!(DeviceInfo::i915().gen_class(), GenClass::I915);
    }

    #[test]
    fn is_915_outside_gen3_is_ignored() {
        let dev = DeviceInfo {
            gen: 9,
            is_915: true,
        };
        assert_eq!(dev.gen_class(), GenClass::Other);
        assert_eq!(tile_size(&dev, Tiling::Y, 32).unwrap(), (128, 32));
        assert_eq!(tile_size(&DeviceInfo::i915(), Tiling::Y, 32).unwrap(), (512, 8));
    }
}
