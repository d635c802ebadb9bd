//! Partition-bounded device view
//!
//! A [`Volume`] is what a filesystem driver receives at mount time: the shared
//! device plus the sector range of the selected partition. Drivers address
//! sectors relative to the partition start and can never read outside it.

use alloc::format;
use alloc::rc::Rc;

use gpt_disk_types::Lba;
use log::trace;

use crate::device::{BlockDevice, SectorBuf};
use crate::error::{FsError, Result};
use crate::partition::PartitionEntry;

/// Device view restricted to one partition's LBA range
pub struct Volume<D: BlockDevice> {
    device: Rc<D>,
    lba_begin: u64,
    sector_count: u64,
}

impl<D: BlockDevice> Clone for Volume<D> {
    fn clone(&self) -> Self {
        Self {
            device: Rc::clone(&self.device),
            lba_begin: self.lba_begin,
            sector_count: self.sector_count,
        }
    }
}

impl<D: BlockDevice> Volume<D> {
    pub fn new(device: Rc<D>, lba_begin: u64, sector_count: u64) -> Self {
        Self {
            device,
            lba_begin,
            sector_count,
        }
    }

    /// View covering `entry`'s range
    pub fn for_partition(device: Rc<D>, entry: &PartitionEntry) -> Self {
        Self::new(device, entry.lba_begin, entry.sector_count)
    }

    /// View covering the whole device from LBA 0
    pub fn whole_device(device: Rc<D>) -> Self {
        let sectors = device.sector_count();
        Self::new(device, 0, sectors)
    }

    pub fn lba_begin(&self) -> u64 {
        self.lba_begin
    }

    pub fn sector_count(&self) -> u64 {
        self.sector_count
    }

    pub fn sector_size(&self) -> usize {
        self.device.sector_size()
    }

    /// Read `count` sectors at partition-relative sector `sector`
    pub async fn read(&self, sector: u64, count: u32) -> Result<SectorBuf> {
        let in_range = sector
            .checked_add(count as u64)
            .map_or(false, |end| end <= self.sector_count);
        if !in_range {
            return Err(FsError::device_io(format!(
                "sectors {}+{} outside partition of {} sectors",
                sector, count, self.sector_count
            )));
        }

        let lba = self.lba_begin + sector;
        trace!(target: "diskfs", "volume read: LBA {} x{}", lba, count);
        Ok(self.device.read(Lba(lba), count).await?)
    }
}
