//! Filesystem driver capability
//!
//! A driver turns a partition-bounded [`Volume`] into a directory tree. The
//! orchestrator only ever talks to this trait, so a new on-disk format plugs
//! in by implementing it; nothing in [`Disk`](crate::Disk) changes.
//!
//! Every operation returns a future that resolves exactly once. Suspension
//! happens only inside volume reads.

use alloc::vec::Vec;
use core::future::Future;

use crate::device::BlockDevice;
use crate::error::Result;
use crate::types::{DirEntry, FileBuffer, FileTarget};
use crate::volume::Volume;

pub trait FilesystemDriver<D: BlockDevice>: Sized {
    /// Short filesystem name, e.g. `"FAT32"`
    fn name(&self) -> &'static str;

    /// Whether an MBR partition type id may hold this filesystem.
    ///
    /// Drives auto-detection during mount.
    fn recognizes(part_type: u8) -> bool;

    /// Validate the on-disk metadata of `volume` and build a driver over it.
    ///
    /// Invoked once per mount attempt.
    fn init(volume: Volume<D>) -> impl Future<Output = Result<Self>>;

    /// Immediate children of the directory at `path`.
    ///
    /// `PathNotFound` when `path` does not resolve to a directory. An empty
    /// directory yields an empty vector.
    fn ls<'a>(&'a self, path: &'a str) -> impl Future<Output = Result<Vec<DirEntry>>> + 'a;

    /// Metadata of the single entry at `path`
    fn stat<'a>(&'a self, path: &'a str) -> impl Future<Output = Result<DirEntry>> + 'a;

    /// Whole contents of a file.
    ///
    /// # Contract
    /// - `PathNotFound` when the target is gone or is not a file
    /// - the buffer length equals the size the target was observed with
    /// - a short read fails with `DeviceIo`, never truncates
    fn read_file(&self, target: FileTarget) -> impl Future<Output = Result<FileBuffer>> + '_;

    /// Bytes `[offset, offset + len)` of a file, clamped at end of file
    fn read(
        &self,
        target: FileTarget,
        offset: u64,
        len: u64,
    ) -> impl Future<Output = Result<FileBuffer>> + '_ {
        async move {
            let mut data = self.read_file(target).await?.into_vec();
            let start = (offset.min(data.len() as u64)) as usize;
            let end = (offset.saturating_add(len).min(data.len() as u64)) as usize;
            data.truncate(end);
            data.drain(..start);
            Ok(FileBuffer::new(data))
        }
    }
}
