//! Disk orchestrator
//!
//! [`Disk`] owns a block device and, once mounted, a filesystem driver of
//! type `F`. Mounting is a staged state machine:
//!
//! ```text
//! Unmounted ──mount()──▶ Scanning ──▶ Mounting ──▶ Ready
//!     ▲                     │            │
//!     │                     ▼            ▼
//!     └──────mount()────── Failed ◀──────┘
//! ```
//!
//! `mount()` is accepted only in `Unmounted` or `Failed`; the acceptance and
//! the move to `Scanning` happen synchronously, before any device read. A
//! mount that fails at any stage lands in `Failed` and leaves no filesystem
//! behind. Filesystem operations are dispatchable only in `Ready`.
//!
//! # Usage
//!
//! ```ignore
//! let disk: Disk<MemDisk, Fat32> = Disk::new(device);
//!
//! for part in disk.partitions().await? {
//!     info!("* Volume: {} at LBA {}", part.name, part.lba_begin);
//! }
//!
//! disk.mount(MountSelector::Auto)?.await?;
//! let entries = disk.fs()?.ls("/").await?;
//! ```

use alloc::format;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, OnceCell};
use core::fmt;
use core::future::Future;

use log::{debug, info, warn};

use crate::device::BlockDevice;
use crate::driver::FilesystemDriver;
use crate::error::{ErrorKind, FsError, Result};
use crate::partition::{PartitionEntry, PartitionTable};
use crate::types::{DirEntry, FileBuffer, FileTarget};
use crate::volume::Volume;

/// Mount lifecycle of a [`Disk`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Unmounted,
    Scanning,
    Mounting,
    Ready,
    Failed,
}

impl fmt::Display for MountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unmounted => "unmounted",
            Self::Scanning => "scanning",
            Self::Mounting => "mounting",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Which partition `mount()` binds the driver to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MountSelector {
    /// First partition, in slot order, whose type the driver recognizes
    #[default]
    Auto,
    /// First recognized partition carrying the bootable flag
    Bootable,
    /// Explicit MBR slot (0..=3); the partition type is not checked
    Slot(u8),
    /// Whole device from LBA 0, no partition table (superfloppy layout)
    WholeDisk,
}

/// Pick the partition `selector` designates for driver `F`
pub fn select_partition<D, F>(entries: &[PartitionEntry], selector: MountSelector) -> Result<&PartitionEntry>
where
    D: BlockDevice,
    F: FilesystemDriver<D>,
{
    let found = match selector {
        MountSelector::Auto => entries.iter().find(|e| F::recognizes(e.part_type)),
        MountSelector::Bootable => entries
            .iter()
            .find(|e| e.bootable && F::recognizes(e.part_type)),
        MountSelector::Slot(slot) => entries.iter().find(|e| e.slot == slot),
        MountSelector::WholeDisk => None,
    };

    found.ok_or_else(|| {
        FsError::new(ErrorKind::UnknownFilesystem)
            .with_detail(format!("no partition matches {:?}", selector))
    })
}

/// Moves an abandoned mount attempt to `Failed`.
///
/// Held by the mount future; if the future is dropped while a stage is still
/// in flight the disk does not stay stuck in `Scanning`/`Mounting`.
pub(crate) struct MountGuard {
    state: Rc<Cell<MountState>>,
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        if matches!(self.state.get(), MountState::Scanning | MountState::Mounting) {
            warn!(target: "diskfs", "mount abandoned while {}", self.state.get());
            self.state.set(MountState::Failed);
        }
    }
}

struct Mounted<F> {
    fs: F,
    partition: Option<PartitionEntry>,
}

/// Block device plus the filesystem mounted on one of its partitions
pub struct Disk<D: BlockDevice, F: FilesystemDriver<D>> {
    device: Rc<D>,
    state: Rc<Cell<MountState>>,
    mounted: OnceCell<Mounted<F>>,
}

impl<D: BlockDevice, F: FilesystemDriver<D>> Disk<D, F> {
    pub fn new(device: D) -> Self {
        Self::from_shared(Rc::new(device))
    }

    /// Build over a device handle the caller keeps a clone of
    pub fn from_shared(device: Rc<D>) -> Self {
        Self {
            device,
            state: Rc::new(Cell::new(MountState::Unmounted)),
            mounted: OnceCell::new(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn state(&self) -> MountState {
        self.state.get()
    }

    /// Partition the filesystem is mounted on; `None` before mount or for
    /// [`MountSelector::WholeDisk`]
    pub fn mounted_partition(&self) -> Option<&PartitionEntry> {
        self.mounted.get().and_then(|m| m.partition.as_ref())
    }

    /// Partition table of the device.
    ///
    /// Valid in every state and never changes the mount state.
    pub async fn partitions(&self) -> Result<Vec<PartitionEntry>> {
        Ok(PartitionTable::scan(&*self.device).await?.into_entries())
    }

    /// Start mounting the partition chosen by `selector`.
    ///
    /// Fails synchronously with `Busy` unless the disk is `Unmounted` or
    /// `Failed`; an in-flight attempt is left untouched. On acceptance the
    /// disk is already `Scanning` when this returns, and the future resolves
    /// once with the outcome of the whole attempt.
    pub fn mount(&self, selector: MountSelector) -> Result<impl Future<Output = Result<()>> + '_> {
        let guard = self.begin_mount()?;
        Ok(self.drive_mount(guard, selector))
    }

    pub(crate) fn begin_mount(&self) -> Result<MountGuard> {
        match self.state.get() {
            MountState::Unmounted | MountState::Failed => {}
            state => {
                warn!(target: "diskfs", "mount rejected: disk is {}", state);
                return Err(FsError::new(ErrorKind::Busy).with_detail(format!("disk is {}", state)));
            }
        }

        self.set_state(MountState::Scanning);
        Ok(MountGuard {
            state: Rc::clone(&self.state),
        })
    }

    pub(crate) async fn drive_mount(&self, guard: MountGuard, selector: MountSelector) -> Result<()> {
        let result = self.mount_stages(selector).await;
        match &result {
            Ok(()) => {
                self.set_state(MountState::Ready);
                match self.mounted_partition() {
                    Some(part) => info!(
                        target: "diskfs",
                        "mounted {} on slot {} ({}) at LBA {}",
                        self.mounted.get().map_or("?", |m| m.fs.name()),
                        part.slot, part.name, part.lba_begin
                    ),
                    None => info!(target: "diskfs", "mounted whole device"),
                }
            }
            Err(err) => {
                self.set_state(MountState::Failed);
                warn!(target: "diskfs", "mount failed: {}", err);
            }
        }
        drop(guard);
        result
    }

    async fn mount_stages(&self, selector: MountSelector) -> Result<()> {
        let (volume, partition) = match selector {
            MountSelector::WholeDisk => (Volume::whole_device(Rc::clone(&self.device)), None),
            _ => {
                let table = PartitionTable::scan(&*self.device).await?;
                let entry = select_partition::<D, F>(table.entries(), selector)?.clone();
                debug!(
                    target: "diskfs",
                    "selected slot {} type {:#04x} at LBA {}",
                    entry.slot, entry.part_type, entry.lba_begin
                );
                (Volume::for_partition(Rc::clone(&self.device), &entry), Some(entry))
            }
        };

        self.set_state(MountState::Mounting);
        let fs = F::init(volume).await.map_err(|err| {
            FsError::new(ErrorKind::MountFailed).with_detail(format!("{}", err))
        })?;

        self.mounted
            .set(Mounted { fs, partition })
            .map_err(|_| FsError::new(ErrorKind::Busy).with_detail("filesystem already mounted"))
    }

    fn set_state(&self, next: MountState) {
        debug!(target: "diskfs", "mount state {} -> {}", self.state.get(), next);
        self.state.set(next);
    }

    /// The mounted filesystem.
    ///
    /// `NotMounted` unless the disk is `Ready`; never dereferences an absent
    /// filesystem.
    pub fn fs(&self) -> Result<&F> {
        if self.state.get() != MountState::Ready {
            return Err(FsError::not_mounted());
        }
        self.mounted.get().map(|m| &m.fs).ok_or(FsError::not_mounted())
    }

    /// `fs()?.ls(path)`
    pub async fn ls(&self, path: &str) -> Result<Vec<DirEntry>> {
        self.fs()?.ls(path).await
    }

    /// `fs()?.stat(path)`
    pub async fn stat(&self, path: &str) -> Result<DirEntry> {
        self.fs()?.stat(path).await
    }

    /// `fs()?.read_file(target)`, with the delivered length checked against
    /// the size an entry target was observed with
    pub async fn read_file(&self, target: impl Into<FileTarget>) -> Result<FileBuffer> {
        let target = target.into();
        let expected = match &target {
            FileTarget::Entry(entry) => Some(entry.size),
            FileTarget::Path(_) => None,
        };

        let buffer = self.fs()?.read_file(target).await?;
        match expected {
            Some(size) if buffer.len() as u64 != size => Err(FsError::device_io(format!(
                "short read: {} of {} bytes",
                buffer.len(),
                size
            ))),
            _ => Ok(buffer),
        }
    }

    /// `fs()?.read(target, offset, len)`
    pub async fn read(&self, target: impl Into<FileTarget>, offset: u64, len: u64) -> Result<FileBuffer> {
        self.fs()?.read(target.into(), offset, len).await
    }
}
