//! Common test utilities for the FAT32 driver

#![allow(dead_code)]

pub use builder::{FatBuilder, FatImage, PART_LBA};

use std::io;

use diskfs::{block_on, Disk, MemDisk, MountSelector, SECTOR_SIZE};
use fat32::Fat32;
use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};

pub type FatDisk = Disk<MemDisk, Fat32<MemDisk>>;

/// In-memory `BlockIo` device for testing
#[derive(Debug, Clone)]
pub struct MemoryBlockDevice {
    pub data: Vec<u8>,
}

impl BlockIo for MemoryBlockDevice {
    type Error = io::Error;

    fn block_size(&self) -> BlockSize {
        BlockSize::new(SECTOR_SIZE as u32).expect("valid block size")
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok((self.data.len() / SECTOR_SIZE) as u64)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        let offset = start_lba.0 as usize * SECTOR_SIZE;
        if offset + dst.len() > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "read beyond end of device",
            ));
        }
        dst.copy_from_slice(&self.data[offset..offset + dst.len()]);
        Ok(())
    }

    fn write_blocks(&mut self, _start_lba: Lba, _src: &[u8]) -> Result<(), Self::Error> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only test device"))
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Root holds `test.txt`; `Sample Pictures/` holds two long-named files
pub fn sample_image() -> FatImage {
    FatBuilder::new()
        .file("/test.txt", b"Hello from FAT32\n")
        .file("/Sample Pictures/Koala.jpg", &pattern(3000))
        .file("/Sample Pictures/Desert Sunset.jpg", &pattern(700))
        .dir("/empty")
        .build()
}

/// Deterministic non-repeating-per-sector content
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 512) as u8).collect()
}

/// Mount `image` with auto-detection, panicking on failure
pub fn mounted(image: FatImage) -> FatDisk {
    let disk: FatDisk = Disk::new(image.into_disk());
    block_on(disk.mount(MountSelector::Auto).expect("accepted")).expect("mount");
    disk
}
