// FAT32 directory entry decoding (8.3 and VFAT long names)

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

pub const DIR_ENTRY_SIZE: usize = 32;

pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
pub const ATTR_LONG_NAME: u8 = ATTR_READ_ONLY | ATTR_HIDDEN | ATTR_SYSTEM | ATTR_VOLUME_ID;

/// First name byte of a deleted entry
pub const DELETED: u8 = 0xE5;
/// First name byte marking the end of the directory
pub const END_OF_DIR: u8 = 0x00;

const LFN_LAST: u8 = 0x40;
const LFN_SEQ_MASK: u8 = 0x1F;
const LFN_CHARS: usize = 13;

// NT reserved byte: lowercase base / extension
const NT_LOWER_BASE: u8 = 0x08;
const NT_LOWER_EXT: u8 = 0x10;

/// One decoded 32-byte short directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortEntry {
    pub name: [u8; 11],
    pub attr: u8,
    pub nt_flags: u8,
    pub cluster_high: u16,
    pub cluster_low: u16,
    pub file_size: u32,
}

impl ShortEntry {
    pub fn parse(raw: &[u8]) -> Self {
        let mut name = [0u8; 11];
        name.copy_from_slice(&raw[..11]);
        Self {
            name,
            attr: raw[11],
            nt_flags: raw[12],
            cluster_high: u16::from_le_bytes([raw[20], raw[21]]),
            cluster_low: u16::from_le_bytes([raw[26], raw[27]]),
            file_size: u32::from_le_bytes([raw[28], raw[29], raw[30], raw[31]]),
        }
    }

    pub fn first_cluster(&self) -> u32 {
        ((self.cluster_high as u32) << 16) | (self.cluster_low as u32)
    }

    pub fn is_dir(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }

    pub fn is_volume_label(&self) -> bool {
        self.attr & ATTR_VOLUME_ID != 0
    }

    pub fn is_dot(&self) -> bool {
        self.name[0] == b'.'
    }

    /// Render as `NAME.EXT` (or `NAME` without extension)
    pub fn display_name(&self) -> String {
        let mut base = self.name;
        // 0x05 stands in for a leading 0xE5 byte
        if base[0] == 0x05 {
            base[0] = DELETED;
        }

        let trim = |part: &[u8], lower: bool| -> String {
            let end = part.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
            part[..end]
                .iter()
                .map(|&b| if lower { b.to_ascii_lowercase() as char } else { b as char })
                .collect()
        };

        let mut name = trim(&base[..8], self.nt_flags & NT_LOWER_BASE != 0);
        let ext = trim(&base[8..], self.nt_flags & NT_LOWER_EXT != 0);
        if !ext.is_empty() {
            name.push('.');
            name.push_str(&ext);
        }
        name
    }
}

/// Checksum of an 11-byte short name, stored in each of its LFN entries
pub fn lfn_checksum(short_name: &[u8; 11]) -> u8 {
    short_name
        .iter()
        .fold(0u8, |sum, &b| ((sum & 1) << 7).wrapping_add(sum >> 1).wrapping_add(b))
}

/// Accumulates VFAT long-name entries preceding a short entry.
///
/// LFN entries are stored last-fragment-first; the sequence must count down
/// to 1 with a single checksum, otherwise the fragments are discarded and the
/// short name is used.
#[derive(Default)]
pub struct LongNameBuilder {
    units: Vec<[u16; LFN_CHARS]>,
    checksum: u8,
    next_seq: u8,
}

impl LongNameBuilder {
    pub fn reset(&mut self) {
        self.units.clear();
        self.next_seq = 0;
    }

    /// Feed one raw LFN entry
    pub fn push(&mut self, raw: &[u8]) {
        let ord = raw[0];
        let seq = ord & LFN_SEQ_MASK;
        let checksum = raw[13];

        if ord & LFN_LAST != 0 {
            if seq == 0 {
                self.reset();
                return;
            }
            self.units = vec![[0xFFFF; LFN_CHARS]; seq as usize];
            self.checksum = checksum;
        } else if self.units.is_empty() || seq == 0 || seq != self.next_seq || checksum != self.checksum {
            self.reset();
            return;
        }

        let chunk = &mut self.units[seq as usize - 1];
        let offsets = [1, 3, 5, 7, 9, 14, 16, 18, 20, 22, 24, 28, 30];
        for (unit, &at) in chunk.iter_mut().zip(offsets.iter()) {
            *unit = u16::from_le_bytes([raw[at], raw[at + 1]]);
        }
        self.next_seq = seq - 1;
    }

    /// Complete long name for `short`, if the collected fragments belong to it
    pub fn finish(&mut self, short: &ShortEntry) -> Option<String> {
        let complete =
            !self.units.is_empty() && self.next_seq == 0 && self.checksum == lfn_checksum(&short.name);
        let name = if complete {
            let units = self
                .units
                .iter()
                .flatten()
                .copied()
                .take_while(|&u| u != 0x0000 && u != 0xFFFF);
            Some(
                char::decode_utf16(units)
                    .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect(),
            )
        } else {
            None
        };
        self.reset();
        name
    }
}
