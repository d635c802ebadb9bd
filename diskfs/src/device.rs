//! Block device capability
//!
//! The access layer consumes storage through [`BlockDevice`]: sector-granular,
//! asynchronous reads keyed by logical block address. A read hands back an
//! owned buffer; nothing is borrowed from the device after completion.
//!
//! Two devices ship with the crate:
//! - [`MemDisk`] - an in-memory image whose reads complete immediately
//! - [`BlockIoDevice`] - adapts any synchronous `gpt_disk_io::BlockIo`

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::future::{ready, Future};

use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;

/// Sector size assumed by the partition table and shipped drivers
pub const SECTOR_SIZE: usize = 512;

/// Owned bytes of one or more sectors, moved out of the device on completion
pub type SectorBuf = Vec<u8>;

/// Block I/O error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// Request extends past the last sector of the device
    OutOfRange { lba: u64, count: u32 },
    /// Device not ready.
    DeviceNotReady,
    /// I/O error from device.
    IoError,
    /// Error reported by a wrapped backend
    Backend(String),
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { lba, count } => {
                write!(f, "read of {} sectors at LBA {} beyond device capacity", count, lba)
            }
            Self::DeviceNotReady => write!(f, "Block device not ready"),
            Self::IoError => write!(f, "I/O error from device"),
            Self::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

/// Core block device interface.
///
/// Reads return immediately with a future; the future resolves once the
/// device completes the transfer. Independent reads may complete in any
/// order the device chooses.
pub trait BlockDevice {
    /// Logical sector size in bytes
    fn sector_size(&self) -> usize {
        SECTOR_SIZE
    }

    /// Total capacity in sectors
    fn sector_count(&self) -> u64;

    /// Read `count` sectors starting at `lba`.
    ///
    /// # Contract
    /// - resolves exactly once
    /// - on success the buffer holds `count * sector_size()` bytes
    /// - a range past `sector_count()` fails with [`BlockError::OutOfRange`]
    fn read(&self, lba: Lba, count: u32) -> impl Future<Output = Result<SectorBuf, BlockError>> + '_;
}

/// Bounds check shared by the shipped devices
fn check_range(lba: Lba, count: u32, capacity: u64) -> Result<(), BlockError> {
    match lba.0.checked_add(count as u64) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(BlockError::OutOfRange { lba: lba.0, count }),
    }
}

/// In-memory disk image.
///
/// Reads complete without suspending. The image can be patched in place with
/// [`MemDisk::write`] to model media changing between operations.
#[derive(Debug)]
pub struct MemDisk {
    data: RefCell<Vec<u8>>,
    sector_size: usize,
}

impl MemDisk {
    /// Wrap a raw image; a trailing partial sector is not addressable
    pub fn new(data: Vec<u8>) -> Self {
        Self::with_sector_size(data, SECTOR_SIZE)
    }

    pub fn with_sector_size(data: Vec<u8>, sector_size: usize) -> Self {
        Self {
            data: RefCell::new(data),
            sector_size,
        }
    }

    /// Zero-filled image of `sectors` sectors
    pub fn zeroed(sectors: u64) -> Self {
        Self::new(vec![0u8; sectors as usize * SECTOR_SIZE])
    }

    /// Overwrite whole sectors starting at `lba`
    pub fn write(&self, lba: Lba, src: &[u8]) -> Result<(), BlockError> {
        let count = src.len().div_ceil(self.sector_size) as u32;
        check_range(lba, count, self.sector_count())?;

        let offset = lba.0 as usize * self.sector_size;
        self.data.borrow_mut()[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn read_now(&self, lba: Lba, count: u32) -> Result<SectorBuf, BlockError> {
        check_range(lba, count, self.sector_count())?;

        let offset = lba.0 as usize * self.sector_size;
        let len = count as usize * self.sector_size;
        Ok(self.data.borrow()[offset..offset + len].to_vec())
    }
}

impl BlockDevice for MemDisk {
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn sector_count(&self) -> u64 {
        (self.data.borrow().len() / self.sector_size) as u64
    }

    fn read(&self, lba: Lba, count: u32) -> impl Future<Output = Result<SectorBuf, BlockError>> + '_ {
        ready(self.read_now(lba, count))
    }
}

/// Adapter exposing a synchronous `BlockIo` as a [`BlockDevice`].
///
/// Each read is performed in full when the request is issued, so the returned
/// future is already complete.
pub struct BlockIoDevice<B: BlockIo> {
    io: RefCell<B>,
    sector_size: usize,
    sector_count: u64,
}

impl<B: BlockIo> BlockIoDevice<B> {
    /// Wrap `io`, querying its geometry once
    pub fn new(mut io: B) -> Result<Self, BlockError> {
        let sector_size = io.block_size().to_u32() as usize;
        let sector_count = io
            .num_blocks()
            .map_err(|e| BlockError::Backend(format!("{:?}", e)))?;

        Ok(Self {
            io: RefCell::new(io),
            sector_size,
            sector_count,
        })
    }

    /// Give back the wrapped `BlockIo`
    pub fn into_inner(self) -> B {
        self.io.into_inner()
    }

    fn read_now(&self, lba: Lba, count: u32) -> Result<SectorBuf, BlockError> {
        check_range(lba, count, self.sector_count)?;

        let mut buf = vec![0u8; count as usize * self.sector_size];
        if count > 0 {
            self.io
                .borrow_mut()
                .read_blocks(lba, &mut buf)
                .map_err(|e| BlockError::Backend(format!("{:?}", e)))?;
        }
        Ok(buf)
    }
}

impl<B: BlockIo> BlockDevice for BlockIoDevice<B> {
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn sector_count(&self) -> u64 {
        self.sector_count
    }

    fn read(&self, lba: Lba, count: u32) -> impl Future<Output = Result<SectorBuf, BlockError>> + '_ {
        ready(self.read_now(lba, count))
    }
}
