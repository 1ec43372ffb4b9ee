//! Device buffer handles and CPU-side device memory.
//!
//! Backends hand out opaque [`BufferHandle`]s; the caller never sees
//! the storage behind them. In the CPU fallback the storage is a
//! [`DeviceMemory`] block, in the wgpu backend a `wgpu::Buffer`.

use heatflow_types::DeviceError;

use crate::status;

/// How a kernel may access a buffer. Host reads and writes are always allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    /// True if a kernel may read the buffer.
    pub fn kernel_readable(self) -> bool {
        !matches!(self, AccessMode::WriteOnly)
    }

    /// True if a kernel may write the buffer.
    pub fn kernel_writable(self) -> bool {
        !matches!(self, AccessMode::ReadOnly)
    }
}

/// Opaque handle to a buffer owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Byte-addressed device memory for the CPU fallback.
///
/// Backed by `u64` words so that the bytes can be reinterpreted as
/// `f64`/`u32` slices with `bytemuck` without alignment failures.
#[derive(Debug, Clone)]
pub struct DeviceMemory {
    words: Vec<u64>,
    /// Size in bytes (not words).
    len: usize,
}

impl DeviceMemory {
    /// Allocates `len` zeroed bytes.
    pub fn zeroed(len: usize) -> Result<Self, DeviceError> {
        let word_count = len.div_ceil(8);
        let mut words = Vec::new();
        words.try_reserve_exact(word_count).map_err(|_| {
            DeviceError::new(
                status::OUT_OF_HOST_MEMORY,
                format!("cannot reserve {len} bytes of device memory"),
            )
        })?;
        words.resize(word_count, 0);
        Ok(Self { words, len })
    }

    /// Returns the size in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the block holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.len]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.words)[..self.len]
    }

    /// Copies `src` into the block starting at byte 0.
    pub fn write(&mut self, src: &[u8]) -> Result<(), DeviceError> {
        if src.len() > self.len {
            return Err(DeviceError::new(
                status::INVALID_VALUE,
                format!("write of {} bytes into {}-byte buffer", src.len(), self.len),
            ));
        }
        self.as_bytes_mut()[..src.len()].copy_from_slice(src);
        Ok(())
    }

    /// Copies the first `dst.len()` bytes of the block into `dst`.
    pub fn read(&self, dst: &mut [u8]) -> Result<(), DeviceError> {
        if dst.len() > self.len {
            return Err(DeviceError::new(
                status::INVALID_VALUE,
                format!("read of {} bytes from {}-byte buffer", dst.len(), self.len),
            ));
        }
        dst.copy_from_slice(&self.as_bytes()[..dst.len()]);
        Ok(())
    }
}
