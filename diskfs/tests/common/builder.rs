//! Disk image builder for tests
//!
//! Lays out an MBR boot sector plus optional TextFs volumes inside the
//! partitions.

use diskfs::SECTOR_SIZE;

use super::{TEXTFS_MAGIC, TEXTFS_RECORD};

#[derive(Clone, Copy)]
struct Slot {
    status: u8,
    part_type: u8,
    lba_begin: u32,
    sectors: u32,
}

pub struct ImageBuilder {
    data: Vec<u8>,
    slots: [Option<Slot>; 4],
    signature: bool,
}

impl ImageBuilder {
    pub fn new(total_sectors: usize) -> Self {
        Self {
            data: vec![0u8; total_sectors * SECTOR_SIZE],
            slots: [None; 4],
            signature: true,
        }
    }

    pub fn partition(mut self, slot: usize, part_type: u8, lba_begin: u32, sectors: u32) -> Self {
        self.slots[slot] = Some(Slot {
            status: 0,
            part_type,
            lba_begin,
            sectors,
        });
        self
    }

    pub fn bootable(mut self, slot: usize) -> Self {
        if let Some(entry) = self.slots[slot].as_mut() {
            entry.status = 0x80;
        }
        self
    }

    /// Leave bytes 510..512 zeroed
    pub fn without_signature(mut self) -> Self {
        self.signature = false;
        self
    }

    /// Write a TextFs volume at `lba_begin` holding `files` and empty `dirs`
    pub fn textfs(mut self, lba_begin: usize, files: &[(&str, &[u8])], dirs: &[&str]) -> Self {
        let base = lba_begin * SECTOR_SIZE;
        self.data[base..base + 8].copy_from_slice(TEXTFS_MAGIC);
        self.data[base + 8] = (files.len() + dirs.len()) as u8;

        let mut next_sector = 1u32;
        let records = files
            .iter()
            .map(|(name, content)| (*name, Some(*content)))
            .chain(dirs.iter().map(|name| (*name, None)));

        for (i, (name, content)) in records.enumerate() {
            let rec = base + 16 + i * TEXTFS_RECORD;
            self.data[rec..rec + name.len()].copy_from_slice(name.as_bytes());

            match content {
                Some(content) => {
                    self.data[rec + 32..rec + 36].copy_from_slice(&next_sector.to_le_bytes());
                    self.data[rec + 36..rec + 40]
                        .copy_from_slice(&(content.len() as u32).to_le_bytes());

                    let at = base + next_sector as usize * SECTOR_SIZE;
                    self.data[at..at + content.len()].copy_from_slice(content);
                    next_sector += content.len().div_ceil(SECTOR_SIZE).max(1) as u32;
                }
                None => self.data[rec + 40] = 1,
            }
        }
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        for (i, slot) in self.slots.iter().enumerate() {
            let Some(slot) = slot else { continue };
            let off = 446 + i * 16;
            self.data[off] = slot.status;
            self.data[off + 4] = slot.part_type;
            self.data[off + 8..off + 12].copy_from_slice(&slot.lba_begin.to_le_bytes());
            self.data[off + 12..off + 16].copy_from_slice(&slot.sectors.to_le_bytes());
        }
        if self.signature {
            self.data[510] = 0x55;
            self.data[511] = 0xAA;
        }
        self.data
    }
}

/// 64-sector disk: Linux partition in slot 0, TextFs in slot 1 at LBA 16
/// holding `test.txt`, `big.bin` (1100 bytes) and an empty `docs` directory
pub fn standard_image() -> Vec<u8> {
    let big: Vec<u8> = (0..1100u32).map(|i| (i % 251) as u8).collect();
    ImageBuilder::new(64)
        .partition(0, 0x83, 4, 8)
        .partition(1, super::TEXTFS_TYPE, 16, 32)
        .textfs(
            16,
            &[("test.txt", &b"hello world\n"[..]), ("big.bin", big.as_slice())],
            &["docs"],
        )
        .build()
}
