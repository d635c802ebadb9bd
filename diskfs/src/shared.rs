//! Callback-style disk handle
//!
//! [`SharedDisk`] pairs an `Rc<Disk>` with a [`Dispatcher`] and exposes every
//! operation as "issue now, get one callback later". Requests the disk cannot
//! accept (mount while busy, filesystem calls before `Ready`) are refused
//! synchronously and their callback is never invoked.
//!
//! ```ignore
//! let disk = SharedDisk::new(Disk::<_, Fat32>::new(device), dispatcher.clone());
//! let chained = disk.clone();
//! disk.mount(MountSelector::Auto, move |res| {
//!     res.expect("mount");
//!     chained.ls("/", |entries| { /* ... */ }).expect("ready");
//! })?;
//! dispatcher.run_until_stalled();
//! ```

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use crate::device::BlockDevice;
use crate::disk::{Disk, MountSelector};
use crate::dispatch::{Dispatcher, TaskId};
use crate::driver::FilesystemDriver;
use crate::error::Result;
use crate::partition::PartitionEntry;
use crate::types::{DirEntry, FileBuffer, FileTarget};

pub struct SharedDisk<D, F>
where
    D: BlockDevice + 'static,
    F: FilesystemDriver<D> + 'static,
{
    disk: Rc<Disk<D, F>>,
    dispatcher: Dispatcher,
}

impl<D, F> Clone for SharedDisk<D, F>
where
    D: BlockDevice + 'static,
    F: FilesystemDriver<D> + 'static,
{
    fn clone(&self) -> Self {
        Self {
            disk: Rc::clone(&self.disk),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<D, F> SharedDisk<D, F>
where
    D: BlockDevice + 'static,
    F: FilesystemDriver<D> + 'static,
{
    pub fn new(disk: Disk<D, F>, dispatcher: Dispatcher) -> Self {
        Self {
            disk: Rc::new(disk),
            dispatcher,
        }
    }

    pub fn disk(&self) -> &Disk<D, F> {
        &self.disk
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn partitions<Cb>(&self, callback: Cb) -> TaskId
    where
        Cb: FnOnce(Result<Vec<PartitionEntry>>) + 'static,
    {
        let disk = Rc::clone(&self.disk);
        self.dispatcher
            .spawn(async move { disk.partitions().await }, callback)
    }

    /// Mount; `Busy` is returned here, not through `callback`
    pub fn mount<Cb>(&self, selector: MountSelector, callback: Cb) -> Result<TaskId>
    where
        Cb: FnOnce(Result<()>) + 'static,
    {
        let guard = self.disk.begin_mount()?;
        let disk = Rc::clone(&self.disk);
        Ok(self.dispatcher.spawn(
            async move { disk.drive_mount(guard, selector).await },
            callback,
        ))
    }

    pub fn ls<Cb>(&self, path: &str, callback: Cb) -> Result<TaskId>
    where
        Cb: FnOnce(Result<Vec<DirEntry>>) + 'static,
    {
        self.disk.fs()?;
        let disk = Rc::clone(&self.disk);
        let path = String::from(path);
        Ok(self
            .dispatcher
            .spawn(async move { disk.ls(&path).await }, callback))
    }

    pub fn stat<Cb>(&self, path: &str, callback: Cb) -> Result<TaskId>
    where
        Cb: FnOnce(Result<DirEntry>) + 'static,
    {
        self.disk.fs()?;
        let disk = Rc::clone(&self.disk);
        let path = String::from(path);
        Ok(self
            .dispatcher
            .spawn(async move { disk.stat(&path).await }, callback))
    }

    pub fn read_file<T, Cb>(&self, target: T, callback: Cb) -> Result<TaskId>
    where
        T: Into<FileTarget>,
        Cb: FnOnce(Result<FileBuffer>) + 'static,
    {
        self.disk.fs()?;
        let disk = Rc::clone(&self.disk);
        let target = target.into();
        Ok(self
            .dispatcher
            .spawn(async move { disk.read_file(target).await }, callback))
    }

    pub fn read<T, Cb>(&self, target: T, offset: u64, len: u64, callback: Cb) -> Result<TaskId>
    where
        T: Into<FileTarget>,
        Cb: FnOnce(Result<FileBuffer>) + 'static,
    {
        self.disk.fs()?;
        let disk = Rc::clone(&self.disk);
        let target = target.into();
        Ok(self.dispatcher.spawn(
            async move { disk.read(target, offset, len).await },
            callback,
        ))
    }
}
