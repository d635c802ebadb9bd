//! Asynchronous disk and filesystem access layer
//!
//! A `no_std` layer that takes a raw block device to a browsable filesystem.
//!
//! # Architecture
//!
//! 1. **Device layer** - [`BlockDevice`]: sector reads that complete later
//! 2. **Partition layer** - MBR scan of LBA 0 into [`PartitionEntry`] values
//! 3. **Mount layer** - [`Disk`] selects a partition and hands a [`Volume`]
//!    to a [`FilesystemDriver`]
//! 4. **Completion layer** - [`Dispatcher`] and [`SharedDisk`] deliver each
//!    result to exactly one callback
//!
//! Drivers live in their own crates; `fat32` is the shipped one.
//!
//! # Usage
//!
//! ```ignore
//! use diskfs::{Disk, MemDisk, MountSelector};
//! use fat32::Fat32;
//!
//! let disk: Disk<MemDisk, Fat32<MemDisk>> = Disk::new(MemDisk::new(image));
//! disk.mount(MountSelector::Auto)?.await?;
//!
//! for entry in disk.ls("/").await? {
//!     info!("{} {} {}", entry.type_string(), entry.name, entry.size);
//! }
//! let hello = disk.read_file("/test.txt").await?;
//! ```

#![no_std]

extern crate alloc;

pub mod device;
pub mod disk;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod partition;
pub mod shared;
pub mod types;
pub mod volume;

pub use device::{BlockDevice, BlockError, BlockIoDevice, MemDisk, SectorBuf, SECTOR_SIZE};
pub use disk::{select_partition, Disk, MountSelector, MountState};
pub use dispatch::{block_on, Dispatcher, TaskId};
pub use driver::FilesystemDriver;
pub use error::{ErrorKind, FsError, Result};
pub use partition::{PartitionEntry, PartitionTable};
pub use shared::SharedDisk;
pub use types::{path_components, DirEntry, EntryType, FileBuffer, FileTarget};
pub use volume::Volume;

// Block addressing types shared with `gpt_disk_io` backends
pub use gpt_disk_types::{BlockSize, Lba};
