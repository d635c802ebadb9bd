//! Read-only FAT32 driver for `diskfs`
//!
//! Implements [`diskfs::FilesystemDriver`] for FAT32 volumes found in MBR
//! partitions of type `0x0B` or `0x0C` (or on a whole superfloppy device).
//!
//! # Architecture
//!
//! 1. **Context** - VBR validation and geometry ([`Fat32Context`])
//! 2. **Entries** - 32-byte directory records, 8.3 names, VFAT long names
//! 3. **Directories** - listing a directory's cluster chain
//! 4. **Filesystem** - chain walking, path resolution, file reads ([`Fat32`])
//!
//! Lookups are ASCII case-insensitive and match either the long name or the
//! 8.3 alias. Listings report the long name when one is present.
//!
//! # Usage
//!
//! ```ignore
//! use diskfs::{Disk, MemDisk, MountSelector};
//! use fat32::Fat32;
//!
//! let disk: Disk<MemDisk, Fat32<MemDisk>> = Disk::new(MemDisk::new(image));
//! disk.mount(MountSelector::Auto)?.await?;
//! let entry = disk.stat("/Sample Pictures/Koala.jpg").await?;
//! let jpeg = disk.read_file(&entry).await?;
//! ```

#![no_std]

extern crate alloc;

pub mod context;
pub mod dir;
pub mod entry;
pub mod error;
pub mod fs;

pub use context::Fat32Context;
pub use error::Fat32Error;
pub use fs::{Fat32, FAT32_PARTITION_TYPES};
