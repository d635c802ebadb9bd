// MBR partition table discovery

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use gpt_disk_types::Lba;
use log::{debug, trace};

use crate::device::{BlockDevice, SECTOR_SIZE};
use crate::error::{ErrorKind, FsError, Result};

/// Offset of the first partition slot in the boot sector
pub const MBR_TABLE_OFFSET: usize = 446;
/// Size of one partition slot
pub const MBR_ENTRY_SIZE: usize = 16;
/// Number of primary partition slots
pub const MBR_SLOTS: usize = 4;
/// Boot sector signature at bytes 510..512
pub const MBR_SIGNATURE: [u8; 2] = [0x55, 0xAA];

const STATUS_BOOTABLE: u8 = 0x80;

/// One non-empty primary partition slot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionEntry {
    pub name: String,
    pub lba_begin: u64,
    pub sector_count: u64,
    pub part_type: u8,
    pub bootable: bool,
    /// On-disk slot number (0..=3)
    pub slot: u8,
}

impl PartitionEntry {
    pub fn lba_end(&self) -> u64 {
        self.lba_begin + self.sector_count
    }

    pub fn size_mb(&self) -> u64 {
        (self.sector_count * SECTOR_SIZE as u64) / (1024 * 1024)
    }

    pub fn type_name(&self) -> &'static str {
        type_name(self.part_type)
    }
}

/// Human-readable name of an MBR partition type id
pub fn type_name(part_type: u8) -> &'static str {
    match part_type {
        0x00 => "Empty",
        0x01 => "FAT12",
        0x04 => "FAT16 (<32M)",
        0x05 => "Extended",
        0x06 => "FAT16",
        0x07 => "NTFS/exFAT",
        0x0B => "FAT32",
        0x0C => "FAT32 (LBA)",
        0x0E => "FAT16 (LBA)",
        0x0F => "Extended (LBA)",
        0x82 => "Linux Swap",
        0x83 => "Linux FS",
        0x8E => "Linux LVM",
        0xA5 => "FreeBSD",
        0xEE => "GPT Protective",
        0xEF => "EFI System",
        _ => "Unknown",
    }
}

/// Partition table for a disk
pub struct PartitionTable {
    entries: Vec<PartitionEntry>,
}

impl PartitionTable {
    /// Read LBA 0 of `device` and parse its partition table.
    ///
    /// Issues exactly one device read and touches nothing else.
    pub async fn scan<D: BlockDevice>(device: &D) -> Result<Self> {
        let sector = device.read(Lba(0), 1).await?;
        let table = Self::parse(&sector)?;
        debug!(target: "diskfs", "partition scan: {} entries", table.count());
        Ok(table)
    }

    /// Parse a boot sector image
    pub fn parse(sector: &[u8]) -> Result<Self> {
        if sector.len() < 512 || sector[510..512] != MBR_SIGNATURE {
            return Err(FsError::new(ErrorKind::NoPartitionTable)
                .with_detail("boot sector signature missing"));
        }

        let mut entries = Vec::with_capacity(MBR_SLOTS);
        for slot in 0..MBR_SLOTS {
            let raw = &sector[MBR_TABLE_OFFSET + slot * MBR_ENTRY_SIZE..][..MBR_ENTRY_SIZE];
            let part_type = raw[4];
            if part_type == 0 {
                continue;
            }

            let lba_begin = u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]) as u64;
            let sector_count = u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]) as u64;
            trace!(
                target: "diskfs",
                "slot {}: type {:#04x} at LBA {} ({} sectors)",
                slot, part_type, lba_begin, sector_count
            );

            entries.push(PartitionEntry {
                name: type_name(part_type).to_string(),
                lba_begin,
                sector_count,
                part_type,
                bootable: raw[0] & STATUS_BOOTABLE != 0,
                slot: slot as u8,
            });
        }

        Ok(Self { entries })
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, index: usize) -> Option<&PartitionEntry> {
        self.entries.get(index)
    }

    /// Entry occupying on-disk slot `slot`, if that slot is in use
    pub fn by_slot(&self, slot: u8) -> Option<&PartitionEntry> {
        self.entries.iter().find(|e| e.slot == slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartitionEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[PartitionEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<PartitionEntry> {
        self.entries
    }
}
