// SPDX-FileCopyrightText: Copyright 2025 Au-Zone Technologies
// SPDX-License-Identifier: Apache-2.0

//! Collaborators the layout engine drives.
//!
//! Buffer allocation, CPU mapping, GPU copies and cache-domain
//! synchronisation all belong to the host driver. They are modelled as
//! traits so the engine can run against a kernel-backed implementation or
//! the in-memory [`MemoryBackend`].

use crate::error::{Error, Result};
use crate::tiling::Tiling;
use log::{trace, warn};
use std::cell::UnsafeCell;
use std::collections::BTreeMap;
use std::fmt;
use std::ptr::NonNull;
use std::rc::Rc;

// =============================================================================
// Handles and mappings
// =============================================================================

/// Opaque buffer object handle issued by a [`BufferAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Requested CPU access for a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

/// A CPU-visible window onto part of a buffer.
///
/// Mappings are returned to the backend that produced them through
/// [`CpuMapping::unmap`].
#[derive(Debug)]
pub struct Mapping {
    buffer: BufferHandle,
    offset: usize,
    ptr: NonNull<u8>,
    len: usize,
    /// Host memory behind the mapping, kept alive until the mapping is gone.
    storage: Option<Rc<Storage>>,
}

impl Mapping {
    /// Wraps a mapped region.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` bytes, and nothing
    /// else may access that memory until the mapping is unmapped.
    pub unsafe fn from_raw_parts(
        buffer: BufferHandle,
        offset: usize,
        ptr: NonNull<u8>,
        len: usize,
    ) -> Self {
        Self {
            buffer,
            offset,
            ptr,
            len,
            storage: None,
        }
    }

    /// Maps `len` bytes of `storage` starting at `offset`, which the caller
    /// has bounds checked.
    fn from_storage(
        buffer: BufferHandle,
        offset: usize,
        len: usize,
        storage: Rc<Storage>,
    ) -> Self {
        let ptr = NonNull::new(storage.as_ptr().wrapping_add(offset))
            .unwrap_or(NonNull::dangling());
        Self {
            buffer,
            offset,
            ptr,
            len,
            storage: Some(storage),
        }
    }

    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    /// Offset of the mapping within its buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `from_raw_parts` requires `ptr` to be valid and exclusive
        // for `len` bytes for the lifetime of the mapping. Backend-owned
        // storage is held alive by `storage`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as in `as_slice`; `&mut self` guarantees a unique borrow.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    fn maps(&self, storage: &Rc<Storage>) -> bool {
        self.storage
            .as_ref()
            .is_some_and(|own| Rc::ptr_eq(own, storage))
    }
}

/// One side of a GPU copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitSurface {
    pub buffer: BufferHandle,
    /// Byte offset of the first row.
    pub offset: u32,
    pub stride: u32,
    pub tiling: Tiling,
}

// =============================================================================
// Collaborator traits
// =============================================================================

pub trait BufferAllocator {
    /// Allocates a zero-filled buffer of at least `size` bytes.
    fn allocate(&mut self, size: usize) -> Result<BufferHandle>;

    /// Declares the tiling layout and pitch of `buffer`.
    fn set_tiling(&mut self, buffer: BufferHandle, tiling: Tiling, stride: u32) -> Result<()>;

    fn free(&mut self, buffer: BufferHandle) -> Result<()>;
}

pub trait CpuMapping {
    fn map(
        &mut self,
        buffer: BufferHandle,
        offset: usize,
        size: usize,
        access: Access,
    ) -> Result<Mapping>;

    fn unmap(&mut self, mapping: Mapping) -> Result<()>;
}

pub trait Blitter {
    /// Copies a `width` x `height` rectangle of `bpp`-bit pixels, converting
    /// between the tiling layouts of `src` and `dst`.
    fn copy(
        &mut self,
        src: &BlitSurface,
        dst: &BlitSurface,
        width: u32,
        height: u32,
        bpp: u32,
    ) -> Result<()>;
}

/// Cache-domain barriers around CPU access.
pub trait DomainSync {
    /// Waits for outstanding GPU work and moves `buffer` to the CPU domain.
    fn sync_before_cpu_access(&mut self, buffer: BufferHandle) -> Result<()>;

    /// Flushes CPU writes so the GPU observes them.
    fn sync_before_gpu_access(&mut self, buffer: BufferHandle) -> Result<()>;
}

/// Everything a [`Framebuffer`](crate::Framebuffer) needs from the host.
pub trait Backend: BufferAllocator + CpuMapping + Blitter + DomainSync {}

impl<T: BufferAllocator + CpuMapping + Blitter + DomainSync + ?Sized> Backend for T {}

// =============================================================================
// In-memory backend
// =============================================================================

/// Operation counters kept by [`MemoryBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub allocations: usize,
    pub frees: usize,
    pub maps: usize,
    pub unmaps: usize,
    pub blits: usize,
    pub cpu_syncs: usize,
    pub gpu_syncs: usize,
}

/// Zero-filled host memory shared by a buffer and its mapping.
struct Storage {
    cells: Box<[UnsafeCell<u8>]>,
}

impl Storage {
    fn zeroed(size: usize) -> Rc<Self> {
        Rc::new(Self {
            cells: (0..size).map(|_| UnsafeCell::new(0)).collect(),
        })
    }

    fn len(&self) -> usize {
        self.cells.len()
    }

    fn as_ptr(&self) -> *mut u8 {
        UnsafeCell::raw_get(self.cells.as_ptr())
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage").field("len", &self.len()).finish()
    }
}

#[derive(Debug)]
struct MemoryBuffer {
    storage: Rc<Storage>,
    tiling: Tiling,
    stride: u32,
}

impl MemoryBuffer {
    /// A live [`Mapping`] holds the only other reference to the storage.
    fn is_mapped(&self) -> bool {
        Rc::strong_count(&self.storage) > 1
    }

    fn ensure_unmapped(&self, buffer: BufferHandle, op: &str) -> Result<()> {
        if self.is_mapped() {
            warn!("{op} on buffer {buffer} while it is mapped");
            return Err(Error::Backend(format!("{op} on mapped buffer {buffer}")));
        }
        Ok(())
    }

    fn bytes(&self, buffer: BufferHandle, op: &str) -> Result<&[u8]> {
        self.ensure_unmapped(buffer, op)?;
        // SAFETY: storage is only shared with mappings, and there are none.
        Ok(unsafe { std::slice::from_raw_parts(self.storage.as_ptr(), self.storage.len()) })
    }

    fn bytes_mut(&mut self, buffer: BufferHandle, op: &str) -> Result<&mut [u8]> {
        self.ensure_unmapped(buffer, op)?;
        // SAFETY: as in `bytes`; `&mut self` makes the borrow unique.
        Ok(unsafe { std::slice::from_raw_parts_mut(self.storage.as_ptr(), self.storage.len()) })
    }
}

/// Host-memory backend.
///
/// Buffers are stored linearly whatever their declared tiling, so a copy
/// between layouts is a strided row copy. Misuse a kernel would reject
/// (mapping a buffer twice, freeing, blitting or reading a mapped buffer,
/// out-of-range access) is an error. A mapping keeps its memory alive even
/// if the backend is dropped first.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    buffers: BTreeMap<BufferHandle, MemoryBuffer>,
    next_handle: u32,
    stats: BackendStats,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> BackendStats {
        self.stats
    }

    /// Number of allocated, not yet freed buffers.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Raw contents of `buffer`, which must not be mapped.
    pub fn contents(&self, buffer: BufferHandle) -> Result<&[u8]> {
        self.buffer(buffer)?.bytes(buffer, "read")
    }

    pub fn tiling(&self, buffer: BufferHandle) -> Result<(Tiling, u32)> {
        self.buffer(buffer).map(|b| (b.tiling, b.stride))
    }

    fn buffer(&self, buffer: BufferHandle) -> Result<&MemoryBuffer> {
        self.buffers
            .get(&buffer)
            .ok_or(Error::UnknownBuffer(buffer))
    }

    fn buffer_mut(&mut self, buffer: BufferHandle) -> Result<&mut MemoryBuffer> {
        self.buffers
            .get_mut(&buffer)
            .ok_or(Error::UnknownBuffer(buffer))
    }

    fn check_range(buffer: BufferHandle, offset: usize, len: usize, size: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok(()),
            _ => Err(Error::OutOfBounds {
                buffer,
                offset,
                len,
                size,
            }),
        }
    }
}

impl BufferAllocator for MemoryBackend {
    fn allocate(&mut self, size: usize) -> Result<BufferHandle> {
        self.next_handle += 1;
        let handle = BufferHandle(self.next_handle);

        self.buffers.insert(
            handle,
            MemoryBuffer {
                storage: Storage::zeroed(size),
                tiling: Tiling::Linear,
                stride: 0,
            },
        );
        self.stats.allocations += 1;

        trace!("allocate(size={size}) -> {handle}");
        Ok(handle)
    }

    fn set_tiling(&mut self, buffer: BufferHandle, tiling: Tiling, stride: u32) -> Result<()> {
        let buf = self.buffer_mut(buffer)?;
        buf.tiling = tiling;
        buf.stride = stride;
        Ok(())
    }

    fn free(&mut self, buffer: BufferHandle) -> Result<()> {
        self.buffer(buffer)?.ensure_unmapped(buffer, "free")?;
        self.buffers.remove(&buffer);
        self.stats.frees += 1;

        trace!("free({buffer})");
        Ok(())
    }
}

impl CpuMapping for MemoryBackend {
    fn map(
        &mut self,
        buffer: BufferHandle,
        offset: usize,
        size: usize,
        _access: Access,
    ) -> Result<Mapping> {
        let buf = self.buffer(buffer)?;
        buf.ensure_unmapped(buffer, "map")?;
        Self::check_range(buffer, offset, size, buf.storage.len())?;

        let mapping = Mapping::from_storage(buffer, offset, size, Rc::clone(&buf.storage));
        self.stats.maps += 1;

        Ok(mapping)
    }

    fn unmap(&mut self, mapping: Mapping) -> Result<()> {
        let buffer = mapping.buffer();
        let buf = self.buffer(buffer)?;
        if !mapping.maps(&buf.storage) {
            warn!("unmap of buffer {buffer} with a foreign mapping");
            return Err(Error::Backend(format!(
                "mapping was not issued for buffer {buffer}"
            )));
        }

        drop(mapping);
        self.stats.unmaps += 1;
        Ok(())
    }
}

impl Blitter for MemoryBackend {
    fn copy(
        &mut self,
        src: &BlitSurface,
        dst: &BlitSurface,
        width: u32,
        height: u32,
        bpp: u32,
    ) -> Result<()> {
        trace!(
            "blit {}x{}@{bpp} {}+{} ({}) -> {}+{} ({})",
            width,
            height,
            src.buffer,
            src.offset,
            src.tiling,
            dst.buffer,
            dst.offset,
            dst.tiling
        );

        let row_bytes = width as usize * (bpp as usize / 8);
        let rows = height as usize;

        // Gather first so source and destination may be the same buffer.
        let source = self.buffer(src.buffer)?.bytes(src.buffer, "blit")?;
        let mut staged = Vec::with_capacity(row_bytes * rows);
        for row in 0..rows {
            let start = src.offset as usize + row * src.stride as usize;
            Self::check_range(src.buffer, start, row_bytes, source.len())?;
            staged.extend_from_slice(&source[start..start + row_bytes]);
        }

        let target = self.buffer_mut(dst.buffer)?.bytes_mut(dst.buffer, "blit")?;
        for (row, bytes) in staged.chunks_exact(row_bytes.max(1)).enumerate() {
            let start = dst.offset as usize + row * dst.stride as usize;
            Self::check_range(dst.buffer, start, row_bytes, target.len())?;
            target[start..start + row_bytes].copy_from_slice(bytes);
        }

        self.stats.blits += 1;
        Ok(())
    }
}

impl DomainSync for MemoryBackend {
    fn sync_before_cpu_access(&mut self, buffer: BufferHandle) -> Result<()> {
        self.buffer(buffer)?;
        self.stats.cpu_syncs += 1;
        Ok(())
    }

    fn sync_before_gpu_access(&mut self, buffer: BufferHandle) -> Result<()> {
        self.buffer(buffer)?;
        self.stats.gpu_syncs += 1;
        Ok(())
    }
}
