// SPDX-FileCopyrightText: Copyright 2025 Au-Zone Technologies
// SPDX-License-Identifier: Apache-2.0

//! Framebuffer layout engine for KMS test buffers.
//!
//! Computes strides, sizes and plane offsets that match what the kernel
//! expects when a buffer is registered as a scanout surface, and gives the
//! CPU a packed-RGB view of any supported framebuffer, converting NV12 and
//! going through linear shadow copies for tilings the CPU cannot address.
//!
//! Buffer allocation, mapping, GPU copies and domain synchronisation are
//! supplied by a [`Backend`]; [`MemoryBackend`] runs everything in host
//! memory.
//!
//! ```
//! use kms_fb::{Color, DeviceInfo, Framebuffer, MemoryBackend, Tiling, NV12};
//!
//! let mut backend = MemoryBackend::new();
//! let device = DeviceInfo::default();
//! let fb = Framebuffer::create_color(
//!     &mut backend, &device, 64, 48, NV12, Tiling::Y, Color::RED,
//! )?;
//! assert_eq!(fb.stride(), 128);
//! fb.remove(&mut backend)?;
//! # Ok::<(), kms_fb::Error>(())
//! ```

pub mod backend;
pub mod convert;
pub mod error;
pub mod format;
pub mod framebuffer;
pub mod layout;
pub mod paint;
pub mod stereo;
pub mod tiling;
pub mod view;

pub use backend::{
    Access, Backend, BackendStats, BlitSurface, Blitter, BufferAllocator, BufferHandle,
    CpuMapping, DomainSync, Mapping, MemoryBackend,
};
pub use error::{Error, Result};
pub use format::{DrawFormat, PixelFormat, ARGB8888, NV12, RGB565, XRGB2101010, XRGB8888};
pub use framebuffer::Framebuffer;
pub use layout::{calc_fb_layout, calc_fb_size, BufferLayout};
pub use paint::{Canvas, Color};
pub use stereo::{ModeTiming, StereoLayout, StereoMode};
pub use tiling::{tile_size, DeviceInfo, Tiling};
pub use view::{CpuView, ViewKind};
