//! Common test utilities, mock block devices and a toy filesystem driver

#![allow(dead_code)]

pub mod builder;
pub use builder::ImageBuilder;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use diskfs::{
    path_components, BlockDevice, BlockError, DirEntry, EntryType, ErrorKind, FileBuffer,
    FileTarget, FilesystemDriver, FsError, MemDisk, Result, SectorBuf, Volume, SECTOR_SIZE,
};
use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};

/// In-memory `BlockIo` device for testing
#[derive(Debug, Clone)]
pub struct MemoryBlockDevice {
    pub data: Vec<u8>,
    pub block_size: usize,
    pub reads: usize,
}

impl MemoryBlockDevice {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            block_size: SECTOR_SIZE,
            reads: 0,
        }
    }
}

impl BlockIo for MemoryBlockDevice {
    type Error = io::Error;

    fn block_size(&self) -> BlockSize {
        BlockSize::new(self.block_size as u32).expect("valid block size")
    }

    fn num_blocks(&mut self) -> std::result::Result<u64, Self::Error> {
        Ok((self.data.len() / self.block_size) as u64)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> std::result::Result<(), Self::Error> {
        self.reads += 1;
        let offset = start_lba.0 as usize * self.block_size;
        if offset + dst.len() > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "read beyond end of device",
            ));
        }
        dst.copy_from_slice(&self.data[offset..offset + dst.len()]);
        Ok(())
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> std::result::Result<(), Self::Error> {
        let offset = start_lba.0 as usize * self.block_size;
        if offset + src.len() > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "write beyond end of device",
            ));
        }
        self.data[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn flush(&mut self) -> std::result::Result<(), Self::Error> {
        Ok(())
    }
}

struct NoopWaker;

impl Wake for NoopWaker {
    fn wake(self: Arc<Self>) {}
}

/// Poll `future` once with a waker that does nothing
pub fn poll_once<F: Future>(future: Pin<&mut F>) -> Poll<F::Output> {
    let waker = Waker::from(Arc::new(NoopWaker));
    future.poll(&mut Context::from_waker(&waker))
}

struct Slot {
    lba: u64,
    done: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

struct SlotWait(Rc<Slot>);

impl Future for SlotWait {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0.done.get() {
            Poll::Ready(())
        } else {
            *self.0.waker.borrow_mut() = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

/// Device whose reads stay in flight until the test completes them.
///
/// Requests are recorded when first polled; `complete_*` picks which one
/// finishes, so tests control completion order.
pub struct QueuedDisk {
    inner: MemDisk,
    in_flight: RefCell<VecDeque<Rc<Slot>>>,
    issued: RefCell<Vec<u64>>,
}

impl QueuedDisk {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            inner: MemDisk::new(data),
            in_flight: RefCell::new(VecDeque::new()),
            issued: RefCell::new(Vec::new()),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.borrow().len()
    }

    /// LBAs of every read issued so far, in issue order
    pub fn issued(&self) -> Vec<u64> {
        self.issued.borrow().clone()
    }

    /// Complete the oldest outstanding read; returns its LBA
    pub fn complete_oldest(&self) -> Option<u64> {
        let slot = self.in_flight.borrow_mut().pop_front();
        slot.map(|slot| Self::finish(&slot))
    }

    /// Complete the newest outstanding read; returns its LBA
    pub fn complete_newest(&self) -> Option<u64> {
        let slot = self.in_flight.borrow_mut().pop_back();
        slot.map(|slot| Self::finish(&slot))
    }

    fn finish(slot: &Slot) -> u64 {
        slot.done.set(true);
        if let Some(waker) = slot.waker.borrow_mut().take() {
            waker.wake();
        }
        slot.lba
    }
}

impl BlockDevice for QueuedDisk {
    fn sector_count(&self) -> u64 {
        self.inner.sector_count()
    }

    fn read(&self, lba: Lba, count: u32) -> impl Future<Output = std::result::Result<SectorBuf, BlockError>> + '_ {
        async move {
            let slot = Rc::new(Slot {
                lba: lba.0,
                done: Cell::new(false),
                waker: RefCell::new(None),
            });
            self.in_flight.borrow_mut().push_back(Rc::clone(&slot));
            self.issued.borrow_mut().push(lba.0);

            SlotWait(slot).await;
            self.inner.read(lba, count).await
        }
    }
}

/// MBR type id claimed by [`TextFs`]
pub const TEXTFS_TYPE: u8 = 0x7F;
pub const TEXTFS_MAGIC: &[u8; 8] = b"TEXTFS\0\0";
/// Bytes per file record in the TextFs header sector
pub const TEXTFS_RECORD: usize = 48;

/// Flat toy filesystem used to exercise the orchestrator.
///
/// Sector 0 of the volume holds the magic, a record count and one
/// 48-byte record per entry: 32-byte name, start sector, size, kind.
pub struct TextFs<D: BlockDevice> {
    volume: Volume<D>,
    entries: Vec<DirEntry>,
}

impl<D: BlockDevice> TextFs<D> {
    fn find(&self, path: &str) -> Result<&DirEntry> {
        let mut parts = path_components(path);
        let name = parts.next();
        match (name, parts.next()) {
            (Some(name), None) => self
                .entries
                .iter()
                .find(|e| e.name == name)
                .ok_or_else(|| FsError::path_not_found(path)),
            _ => Err(FsError::path_not_found(path)),
        }
    }
}

impl<D: BlockDevice> FilesystemDriver<D> for TextFs<D> {
    fn name(&self) -> &'static str {
        "TextFs"
    }

    fn recognizes(part_type: u8) -> bool {
        part_type == TEXTFS_TYPE
    }

    async fn init(volume: Volume<D>) -> Result<Self> {
        let header = volume.read(0, 1).await?;
        if &header[..8] != TEXTFS_MAGIC {
            return Err(FsError::new(ErrorKind::MountFailed).with_detail("bad TextFs magic"));
        }

        let count = header[8] as usize;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let rec = &header[16 + i * TEXTFS_RECORD..][..TEXTFS_RECORD];
            let name_len = rec[..32].iter().position(|&b| b == 0).unwrap_or(32);
            entries.push(DirEntry {
                name: String::from_utf8_lossy(&rec[..name_len]).into_owned(),
                entry_type: if rec[40] == 1 {
                    EntryType::Directory
                } else {
                    EntryType::File
                },
                size: u32::from_le_bytes(rec[36..40].try_into().unwrap()) as u64,
                block: u32::from_le_bytes(rec[32..36].try_into().unwrap()) as u64,
                parent: 0,
            });
        }

        Ok(Self { volume, entries })
    }

    async fn ls<'a>(&'a self, path: &'a str) -> Result<Vec<DirEntry>> {
        if path_components(path).next().is_none() {
            // Root listing touches the device like a real directory walk
            self.volume.read(0, 1).await?;
            return Ok(self.entries.clone());
        }
        match self.find(path)? {
            entry if entry.is_dir() => Ok(Vec::new()),
            _ => Err(FsError::path_not_found(path)),
        }
    }

    async fn stat<'a>(&'a self, path: &'a str) -> Result<DirEntry> {
        self.find(path).cloned()
    }

    async fn read_file(&self, target: FileTarget) -> Result<FileBuffer> {
        let entry = match &target {
            FileTarget::Path(path) => self.find(path)?.clone(),
            FileTarget::Entry(entry) => entry.clone(),
        };
        if !entry.is_file() {
            return Err(FsError::path_not_found(&entry.name));
        }

        let sectors = (entry.size as usize).div_ceil(SECTOR_SIZE) as u32;
        let mut data = self.volume.read(entry.block, sectors).await?;
        data.truncate(entry.size as usize);
        Ok(FileBuffer::new(data))
    }
}
