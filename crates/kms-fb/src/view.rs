// SPDX-FileCopyrightText: Copyright 2025 Au-Zone Technologies
// SPDX-License-Identifier: Apache-2.0

//! Scoped CPU access to a framebuffer.
//!
//! A [`CpuView`] exposes the framebuffer as packed pixels for the lifetime
//! of the guard. Depending on format and tiling the pixels are either the
//! mapped buffer itself, a linear shadow copy made by the blitter, or a
//! host-memory XRGB8888 scratch image decoded from NV12. Whatever was
//! acquired is written back and released exactly once, by
//! [`CpuView::finish`] or on drop.

use crate::backend::{Access, Backend, BlitSurface, BufferHandle, Mapping};
use crate::convert::{ensure_convertible, nv12_to_xrgb8888, xrgb8888_to_nv12, Nv12Layout};
use crate::error::{Error, Result};
use crate::format::DrawFormat;
use crate::framebuffer::Framebuffer;
use crate::layout::{align_up, calc_fb_layout, BufferLayout};
use crate::paint::Canvas;
use crate::tiling::Tiling;
use log::{error, trace};
use nix::unistd::{sysconf, SysconfVar};

/// Row alignment of the XRGB8888 scratch image.
const SCRATCH_STRIDE_ALIGN: u32 = 16;

const FALLBACK_PAGE_SIZE: usize = 4096;

fn page_size() -> usize {
    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(size)) if size > 0 => size as usize,
        _ => FALLBACK_PAGE_SIZE,
    }
}

/// How the view reaches the framebuffer's pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// The buffer is mapped and drawn on in place.
    Direct,
    /// A linear shadow buffer is blitted in, mapped, and blitted back.
    Blit,
    /// Planar data is decoded to XRGB8888 and re-encoded on release.
    Convert,
}

impl ViewKind {
    fn select(fb: &Framebuffer) -> Self {
        if fb.format().is_planar() {
            ViewKind::Convert
        } else if fb.tiling().needs_blit() {
            ViewKind::Blit
        } else {
            ViewKind::Direct
        }
    }
}

#[derive(Debug)]
struct Shadow {
    buffer: BufferHandle,
    layout: BufferLayout,
}

#[derive(Debug)]
struct Scratch {
    data: Vec<u8>,
    stride: usize,
}

/// Exclusive CPU view of a [`Framebuffer`].
pub struct CpuView<'a, B: Backend + ?Sized> {
    fb: &'a mut Framebuffer,
    backend: &'a mut B,
    kind: ViewKind,
    mapping: Option<Mapping>,
    shadow: Option<Shadow>,
    scratch: Option<Scratch>,
    released: bool,
}

impl Framebuffer {
    /// Makes the framebuffer's pixels available to the CPU.
    ///
    /// The view borrows the framebuffer mutably, so at most one view exists
    /// per framebuffer at a time.
    pub fn cpu_view<'a, B: Backend + ?Sized>(
        &'a mut self,
        backend: &'a mut B,
    ) -> Result<CpuView<'a, B>> {
        CpuView::acquire(self, backend)
    }
}

impl<'a, B: Backend + ?Sized> CpuView<'a, B> {
    fn acquire(fb: &'a mut Framebuffer, backend: &'a mut B) -> Result<Self> {
        let kind = ViewKind::select(fb);
        if kind == ViewKind::Convert {
            ensure_convertible(fb.format())?;
        }

        trace!(
            "acquire {kind:?} view of {} ({}x{} {}, {} tiling)",
            fb.buffer(),
            fb.width(),
            fb.height(),
            fb.format().name,
            fb.tiling()
        );

        let mut view = Self {
            fb,
            backend,
            kind,
            mapping: None,
            shadow: None,
            scratch: None,
            released: false,
        };

        // From here on, dropping `view` undoes whatever has been acquired.
        view.open_linear()?;
        if kind == ViewKind::Convert {
            view.decode()?;
        }

        Ok(view)
    }

    /// Maps the framebuffer, through a linear shadow copy if its tiling is
    /// not CPU accessible.
    fn open_linear(&mut self) -> Result<()> {
        let fb = &*self.fb;

        if !fb.tiling().needs_blit() {
            self.backend.sync_before_cpu_access(fb.buffer())?;
            let map = self
                .backend
                .map(fb.buffer(), 0, fb.size() as usize, Access::ReadWrite)?;
            self.mapping = Some(map);
            return Ok(());
        }

        let layout = calc_fb_layout(
            fb.device(),
            fb.width(),
            fb.height(),
            fb.format(),
            Tiling::Linear,
        )?;
        let buffer = self.backend.allocate(layout.size as usize)?;
        self.shadow = Some(Shadow { buffer, layout });
        self.backend.set_tiling(buffer, Tiling::Linear, layout.stride)?;

        for plane in 0..fb.num_planes() {
            let dst = BlitSurface {
                buffer,
                offset: layout.offsets[plane],
                stride: layout.stride,
                tiling: Tiling::Linear,
            };
            self.backend.copy(
                &fb.blit_surface(plane),
                &dst,
                fb.plane_width(plane),
                fb.plane_height(plane),
                fb.plane_bpp(plane),
            )?;
        }

        self.backend.sync_before_cpu_access(buffer)?;
        let map = self
            .backend
            .map(buffer, 0, layout.size as usize, Access::ReadWrite)?;
        self.mapping = Some(map);

        Ok(())
    }

    /// Stride and plane offsets of the mapped planar data.
    fn linear_layout(&self) -> BufferLayout {
        match &self.shadow {
            Some(shadow) => shadow.layout,
            None => *self.fb.layout(),
        }
    }

    fn nv12_layout(&self) -> Nv12Layout {
        let layout = self.linear_layout();
        Nv12Layout {
            stride: layout.stride as usize,
            y_offset: layout.offsets[0] as usize,
            uv_offset: layout.offsets[1] as usize,
        }
    }

    fn decode(&mut self) -> Result<()> {
        let (width, height) = (self.fb.width(), self.fb.height());
        let row = width.checked_mul(4).ok_or(Error::Overflow)?;
        let stride = align_up(row, SCRATCH_STRIDE_ALIGN)? as usize;
        let size = (stride * height as usize).next_multiple_of(page_size());
        let mut data = vec![0u8; size];

        let planar = self.nv12_layout();
        if let Some(map) = &self.mapping {
            nv12_to_xrgb8888(width, height, map.as_slice(), &planar, &mut data, stride)?;
        }

        self.scratch = Some(Scratch { data, stride });
        Ok(())
    }

    // =========================================================================
    // Pixel access
    // =========================================================================

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn width(&self) -> u32 {
        self.fb.width()
    }

    pub fn height(&self) -> u32 {
        self.fb.height()
    }

    /// Packed layout of [`CpuView::pixels`].
    pub fn draw_format(&self) -> DrawFormat {
        self.fb.format().draw_format
    }

    /// Bytes per row of [`CpuView::pixels`].
    pub fn stride(&self) -> usize {
        match &self.scratch {
            Some(scratch) => scratch.stride,
            None => self.linear_layout().stride as usize,
        }
    }

    /// Packed pixel data, starting at the top-left pixel.
    pub fn pixels(&mut self) -> &mut [u8] {
        if let Some(scratch) = &mut self.scratch {
            return &mut scratch.data;
        }
        match &mut self.mapping {
            Some(map) => map.as_mut_slice(),
            None => &mut [],
        }
    }

    /// Drawing context over [`CpuView::pixels`].
    pub fn canvas(&mut self) -> Result<Canvas<'_>> {
        let (width, height) = (self.width(), self.height());
        let (stride, format) = (self.stride(), self.draw_format());
        Canvas::new(self.pixels(), width, height, stride, format)
    }

    // =========================================================================
    // Release
    // =========================================================================

    /// Writes the pixels back and releases every temporary resource.
    pub fn finish(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        trace!("release {:?} view of {}", self.kind, self.fb.buffer());

        // Keep going after a failure so nothing leaks; report the first error.
        let mut result = Ok(());

        if let Some(scratch) = self.scratch.take() {
            let planar = self.nv12_layout();
            if let Some(map) = &mut self.mapping {
                result = xrgb8888_to_nv12(
                    self.fb.width(),
                    self.fb.height(),
                    &scratch.data,
                    scratch.stride,
                    map.as_mut_slice(),
                    &planar,
                );
            }
        }

        if let Some(map) = self.mapping.take() {
            let buffer = map.buffer();
            result = result
                .and(self.backend.unmap(map))
                .and(self.backend.sync_before_gpu_access(buffer));
        }

        if let Some(shadow) = self.shadow.take() {
            result = result.and(self.write_back(&shadow));
            result = result.and(self.backend.free(shadow.buffer));
        }

        result
    }

    fn write_back(&mut self, shadow: &Shadow) -> Result<()> {
        let fb = &*self.fb;
        for plane in 0..fb.num_planes() {
            let src = BlitSurface {
                buffer: shadow.buffer,
                offset: shadow.layout.offsets[plane],
                stride: shadow.layout.stride,
                tiling: Tiling::Linear,
            };
            self.backend.copy(
                &src,
                &fb.blit_surface(plane),
                fb.plane_width(plane),
                fb.plane_height(plane),
                fb.plane_bpp(plane),
            )?;
        }
        Ok(())
    }
}

impl<B: Backend + ?Sized> Drop for CpuView<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            error!("failed to release CPU view of {}: {e}", self.fb.buffer());
        }
    }
}
