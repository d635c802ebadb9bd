// FAT32 boot sector geometry and FAT entry arithmetic

use crate::error::Fat32Error;

pub const SECTOR_SIZE: usize = 512;

/// Low 28 bits of a FAT entry are the cluster number
pub const FAT_ENTRY_MASK: u32 = 0x0FFF_FFFF;
/// Entries at or above this value end a chain
pub const END_OF_CHAIN: u32 = 0x0FFF_FFF8;
pub const BAD_CLUSTER: u32 = 0x0FFF_FFF7;

/// FAT32 filesystem context parsed from the volume boot record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fat32Context {
    pub sectors_per_cluster: u32,
    pub reserved_sectors: u32,
    pub fat_size: u32,
    pub num_fats: u32,
    pub root_cluster: u32,
    pub data_start_sector: u32,
    pub total_sectors: u32,
    /// Highest valid cluster number
    pub max_cluster: u32,
    pub volume_label: [u8; 11],
}

fn le16(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

fn le32(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

impl Fat32Context {
    /// Parse and validate a VBR image
    pub fn from_boot_sector(boot_sector: &[u8]) -> Result<Self, Fat32Error> {
        if boot_sector.len() < SECTOR_SIZE || boot_sector[510..512] != [0x55, 0xAA] {
            return Err(Fat32Error::InvalidSignature);
        }

        let bytes_per_sector = le16(boot_sector, 0x0B);
        if bytes_per_sector as usize != SECTOR_SIZE {
            return Err(Fat32Error::UnsupportedSectorSize(bytes_per_sector));
        }

        let spc = boot_sector[0x0D];
        if spc == 0 || !spc.is_power_of_two() {
            return Err(Fat32Error::InvalidClusterSize(spc));
        }

        let reserved_sectors = le16(boot_sector, 0x0E) as u32;
        let num_fats = boot_sector[0x10] as u32;
        if reserved_sectors == 0 || num_fats == 0 {
            return Err(Fat32Error::InvalidLayout);
        }

        // FAT32 has no fixed root directory and only the 32-bit FAT size
        let root_entry_count = le16(boot_sector, 0x11);
        let fat_size_16 = le16(boot_sector, 0x16);
        let fat_size = le32(boot_sector, 0x24);
        if root_entry_count != 0 || fat_size_16 != 0 || fat_size == 0 {
            return Err(Fat32Error::NotFat32);
        }

        let total_sectors = match le16(boot_sector, 0x13) {
            0 => le32(boot_sector, 0x20),
            small => small as u32,
        };

        let data_start_sector = num_fats
            .checked_mul(fat_size)
            .and_then(|fats| fats.checked_add(reserved_sectors))
            .filter(|&start| start < total_sectors)
            .ok_or(Fat32Error::InvalidLayout)?;

        // Bounded by the data area and by the entries one FAT can hold
        let cluster_count = (total_sectors - data_start_sector) / spc as u32;
        let fat_entries = fat_size.saturating_mul((SECTOR_SIZE / 4) as u32);
        let max_cluster = (cluster_count + 1).min(fat_entries - 1);

        let root_cluster = le32(boot_sector, 0x2C) & FAT_ENTRY_MASK;
        if root_cluster < 2 || root_cluster > max_cluster {
            return Err(Fat32Error::InvalidRootCluster(root_cluster));
        }

        let mut volume_label = [0u8; 11];
        volume_label.copy_from_slice(&boot_sector[0x47..0x52]);

        Ok(Self {
            sectors_per_cluster: spc as u32,
            reserved_sectors,
            fat_size,
            num_fats,
            root_cluster,
            data_start_sector,
            total_sectors,
            max_cluster,
            volume_label,
        })
    }

    pub fn cluster_size(&self) -> usize {
        self.sectors_per_cluster as usize * SECTOR_SIZE
    }

    pub fn cluster_to_sector(&self, cluster: u32) -> u32 {
        self.data_start_sector + ((cluster - 2) * self.sectors_per_cluster)
    }

    pub fn is_valid_cluster(&self, cluster: u32) -> bool {
        (2..=self.max_cluster).contains(&cluster)
    }

    /// Sector of the first FAT holding `cluster`'s entry, and the byte offset
    /// of the entry inside it
    pub fn fat_entry_location(&self, cluster: u32) -> (u32, usize) {
        let fat_offset = cluster * 4;
        let fat_sector = self.reserved_sectors + (fat_offset / SECTOR_SIZE as u32);
        let entry_offset = (fat_offset % SECTOR_SIZE as u32) as usize;
        (fat_sector, entry_offset)
    }

    /// Label from the extended BPB, trailing spaces removed
    pub fn label(&self) -> &str {
        let end = self
            .volume_label
            .iter()
            .rposition(|&b| b != b' ' && b != 0)
            .map_or(0, |i| i + 1);
        core::str::from_utf8(&self.volume_label[..end]).unwrap_or("")
    }
}

/// Decode one FAT entry out of a FAT sector
pub fn fat_entry(sector: &[u8], entry_offset: usize) -> u32 {
    le32(sector, entry_offset) & FAT_ENTRY_MASK
}
