// FAT32 driver errors

use alloc::format;
use core::fmt;

use diskfs::{ErrorKind, FsError};

/// On-disk inconsistencies found by the FAT32 driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fat32Error {
    /// VBR does not end in 0x55 0xAA
    InvalidSignature,
    /// Only 512-byte logical sectors are supported
    UnsupportedSectorSize(u16),
    /// Sectors per cluster is zero or not a power of two
    InvalidClusterSize(u8),
    /// Reserved sector count or FAT count is zero
    InvalidLayout,
    /// FAT12/16 geometry (fixed root directory or 16-bit FAT size)
    NotFat32,
    /// Root directory cluster outside the data area
    InvalidRootCluster(u32),
    /// Free, reserved or bad cluster reached inside a chain
    BadCluster(u32),
    /// Chain longer than the volume has clusters
    ChainCycle(u32),
    /// Chain ends before covering the recorded size
    ChainTooShort { needed: u32, found: u32 },
}

impl Fat32Error {
    /// Whether the error came from the VBR (mount-time) rather than a chain walk
    pub fn is_boot_sector_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature
                | Self::UnsupportedSectorSize(_)
                | Self::InvalidClusterSize(_)
                | Self::InvalidLayout
                | Self::NotFat32
                | Self::InvalidRootCluster(_)
        )
    }
}

impl fmt::Display for Fat32Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "Boot sector signature missing"),
            Self::UnsupportedSectorSize(size) => write!(f, "Unsupported sector size {}", size),
            Self::InvalidClusterSize(spc) => write!(f, "Invalid sectors per cluster {}", spc),
            Self::InvalidLayout => write!(f, "Invalid reserved/FAT layout"),
            Self::NotFat32 => write!(f, "Volume is not FAT32"),
            Self::InvalidRootCluster(c) => write!(f, "Invalid root cluster {}", c),
            Self::BadCluster(c) => write!(f, "Bad cluster {} in chain", c),
            Self::ChainCycle(c) => write!(f, "Cluster chain from {} does not terminate", c),
            Self::ChainTooShort { needed, found } => {
                write!(f, "Cluster chain too short: {} of {} clusters", found, needed)
            }
        }
    }
}

impl From<Fat32Error> for FsError {
    fn from(err: Fat32Error) -> Self {
        let kind = if err.is_boot_sector_error() {
            ErrorKind::MountFailed
        } else {
            ErrorKind::DeviceIo
        };
        FsError::new(kind).with_detail(format!("{}", err))
    }
}
