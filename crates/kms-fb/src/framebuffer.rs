// SPDX-FileCopyrightText: Copyright 2025 Au-Zone Technologies
// SPDX-License-Identifier: Apache-2.0

//! Framebuffer handles.

use crate::backend::{Access, Backend, BlitSurface, BufferHandle};
use crate::error::Result;
use crate::format::{PixelFormat, DRM_FORMAT_NV12, MAX_PLANES};
use crate::layout::{calc_fb_layout, plane_height, plane_width, BufferLayout};
use crate::paint::{Canvas, Color};
use crate::tiling::{DeviceInfo, Tiling};
use four_char_code::FourCharCode;
use log::debug;

/// Luma value of black in limited-range YCbCr.
const NV12_LUMA_BLACK: u8 = 16;
/// Chroma value of zero colour difference.
const NV12_CHROMA_NEUTRAL: u8 = 0x80;

/// A buffer object together with the geometry needed to scan it out.
///
/// The backing buffer belongs to the framebuffer from creation until
/// [`Framebuffer::remove`].
#[derive(Debug)]
pub struct Framebuffer {
    buffer: BufferHandle,
    width: u32,
    height: u32,
    format: &'static PixelFormat,
    tiling: Tiling,
    device: DeviceInfo,
    layout: BufferLayout,
    num_planes: usize,
    plane_width: [u32; MAX_PLANES],
    plane_height: [u32; MAX_PLANES],
    plane_bpp: [u32; MAX_PLANES],
}

impl Framebuffer {
    /// Allocates a framebuffer with the computed stride and size.
    ///
    /// RGB formats start out zeroed (black); NV12 starts out as limited-range
    /// black.
    pub fn create<B: Backend + ?Sized>(
        backend: &mut B,
        device: &DeviceInfo,
        width: u32,
        height: u32,
        format: FourCharCode,
        tiling: Tiling,
    ) -> Result<Self> {
        Self::create_with_bo_size(backend, device, width, height, format, tiling, 0, 0)
    }

    /// Like [`Framebuffer::create`], with an explicit buffer size and stride.
    /// Zero keeps the computed value.
    #[allow(clippy::too_many_arguments)]
    pub fn create_with_bo_size<B: Backend + ?Sized>(
        backend: &mut B,
        device: &DeviceInfo,
        width: u32,
        height: u32,
        format: FourCharCode,
        tiling: Tiling,
        bo_size: u32,
        bo_stride: u32,
    ) -> Result<Self> {
        let format = PixelFormat::lookup(format)?;
        let mut layout = calc_fb_layout(device, width, height, format, tiling)?;

        if bo_stride != 0 {
            layout.stride = bo_stride;
        }
        if bo_size != 0 {
            layout.size = bo_size;
        }

        debug!(
            "create_fb(width={width}, height={height}, format={}, tiling={tiling}, size={})",
            format.name, layout.size
        );

        let buffer = backend.allocate(layout.size as usize)?;
        if let Err(e) = Self::init_buffer(backend, buffer, format, tiling, &layout, height) {
            backend.free(buffer)?;
            return Err(e);
        }

        debug!("create_fb(handle={buffer}, pitch={})", layout.stride);

        let num_planes = format.num_planes();
        let mut widths = [0; MAX_PLANES];
        let mut heights = [0; MAX_PLANES];
        let mut bpps = [0; MAX_PLANES];
        for plane in 0..num_planes {
            widths[plane] = plane_width(format, width, plane);
            heights[plane] = plane_height(format, height, plane);
            bpps[plane] = format.plane_bpp(plane);
        }

        Ok(Self {
            buffer,
            width,
            height,
            format,
            tiling,
            device: *device,
            layout,
            num_planes,
            plane_width: widths,
            plane_height: heights,
            plane_bpp: bpps,
        })
    }

    fn init_buffer<B: Backend + ?Sized>(
        backend: &mut B,
        buffer: BufferHandle,
        format: &PixelFormat,
        tiling: Tiling,
        layout: &BufferLayout,
        height: u32,
    ) -> Result<()> {
        backend.set_tiling(buffer, tiling, layout.stride)?;

        if format.drm_id != DRM_FORMAT_NV12 {
            return Ok(());
        }

        // YUV formats have a different zero point than RGB.
        let size = layout.size as usize;
        let uv_start = (layout.offsets[1] as usize).min(size);
        let uv_end = (uv_start + height.div_ceil(2) as usize * layout.stride as usize).min(size);

        backend.sync_before_cpu_access(buffer)?;
        let mut map = backend.map(buffer, 0, size, Access::Write)?;
        let data = map.as_mut_slice();
        data[..uv_start].fill(NV12_LUMA_BLACK);
        data[uv_start..uv_end].fill(NV12_CHROMA_NEUTRAL);
        backend.unmap(map)?;
        backend.sync_before_gpu_access(buffer)
    }

    /// Creates a framebuffer filled with `color`.
    pub fn create_color<B: Backend + ?Sized>(
        backend: &mut B,
        device: &DeviceInfo,
        width: u32,
        height: u32,
        format: FourCharCode,
        tiling: Tiling,
        color: Color,
    ) -> Result<Self> {
        let mut fb = Self::create(backend, device, width, height, format, tiling)?;
        fb.draw(backend, |canvas| {
            canvas.paint_color(0, 0, width as i32, height as i32, color)
        })?;
        Ok(fb)
    }

    /// Creates a framebuffer showing the standard test pattern on black.
    pub fn create_pattern<B: Backend + ?Sized>(
        backend: &mut B,
        device: &DeviceInfo,
        width: u32,
        height: u32,
        format: FourCharCode,
        tiling: Tiling,
    ) -> Result<Self> {
        let mut fb = Self::create(backend, device, width, height, format, tiling)?;
        fb.draw(backend, |canvas| canvas.paint_test_pattern())?;
        Ok(fb)
    }

    /// Creates a framebuffer filled with `color` with the test pattern on top.
    pub fn create_color_pattern<B: Backend + ?Sized>(
        backend: &mut B,
        device: &DeviceInfo,
        width: u32,
        height: u32,
        format: FourCharCode,
        tiling: Tiling,
        color: Color,
    ) -> Result<Self> {
        let mut fb = Self::create(backend, device, width, height, format, tiling)?;
        fb.draw(backend, |canvas| {
            canvas.paint_color(0, 0, width as i32, height as i32, color);
            canvas.paint_test_pattern();
        })?;
        Ok(fb)
    }

    /// Runs `paint` on a CPU view of the framebuffer and writes the result
    /// back.
    pub fn draw<B, F>(&mut self, backend: &mut B, paint: F) -> Result<()>
    where
        B: Backend + ?Sized,
        F: FnOnce(&mut Canvas<'_>),
    {
        let mut view = self.cpu_view(backend)?;
        paint(&mut view.canvas()?);
        view.finish()
    }

    /// Releases the backing buffer.
    pub fn remove<B: Backend + ?Sized>(self, backend: &mut B) -> Result<()> {
        debug!("remove_fb(handle={})", self.buffer);
        backend.free(self.buffer)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> &'static PixelFormat {
        self.format
    }

    pub fn tiling(&self) -> Tiling {
        self.tiling
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    pub fn stride(&self) -> u32 {
        self.layout.stride
    }

    pub fn size(&self) -> u32 {
        self.layout.size
    }

    pub fn offsets(&self) -> [u32; MAX_PLANES] {
        self.layout.offsets
    }

    pub fn num_planes(&self) -> usize {
        self.num_planes
    }

    pub fn plane_width(&self, plane: usize) -> u32 {
        self.plane_width[plane]
    }

    pub fn plane_height(&self, plane: usize) -> u32 {
        self.plane_height[plane]
    }

    pub fn plane_bpp(&self, plane: usize) -> u32 {
        self.plane_bpp[plane]
    }

    /// Blitter description of `plane`.
    pub fn blit_surface(&self, plane: usize) -> BlitSurface {
        BlitSurface {
            buffer: self.buffer,
            offset: self.layout.offsets[plane],
            stride: self.layout.stride,
            tiling: self.tiling,
        }
    }
}
