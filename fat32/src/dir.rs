// FAT32 directory listing

use alloc::string::String;
use alloc::vec::Vec;

use diskfs::{DirEntry, EntryType};

use crate::entry::{
    LongNameBuilder, ShortEntry, ATTR_LONG_NAME, DELETED, DIR_ENTRY_SIZE, END_OF_DIR,
};

/// A listed entry plus the 8.3 alias it can also be looked up by
#[derive(Debug, Clone)]
pub struct Listed {
    pub entry: DirEntry,
    pub short_name: String,
}

impl Listed {
    /// Case-insensitive match on the long or the short name
    pub fn matches(&self, name: &str) -> bool {
        self.entry.name.eq_ignore_ascii_case(name) || self.short_name.eq_ignore_ascii_case(name)
    }
}

/// Decode the raw bytes of a directory's cluster chain.
///
/// Stops at the end-of-directory marker. Deleted entries, volume labels and
/// the `.`/`..` links are skipped.
pub fn parse_directory(data: &[u8], dir_cluster: u32, root_cluster: u32) -> Vec<Listed> {
    let mut listed = Vec::new();
    let mut long_name = LongNameBuilder::default();

    for raw in data.chunks_exact(DIR_ENTRY_SIZE) {
        match raw[0] {
            END_OF_DIR => break,
            DELETED => {
                long_name.reset();
                continue;
            }
            _ => {}
        }

        if raw[11] & 0x3F == ATTR_LONG_NAME {
            long_name.push(raw);
            continue;
        }

        let short = ShortEntry::parse(raw);
        if short.is_volume_label() || short.is_dot() {
            long_name.reset();
            continue;
        }

        let short_name = short.display_name();
        let name = long_name.finish(&short).unwrap_or_else(|| short_name.clone());

        let (entry_type, size, block) = if short.is_dir() {
            // A directory cluster of 0 refers to the root
            let cluster = match short.first_cluster() {
                0 => root_cluster,
                c => c,
            };
            (EntryType::Directory, 0, cluster)
        } else {
            (EntryType::File, short.file_size as u64, short.first_cluster())
        };

        listed.push(Listed {
            entry: DirEntry {
                name,
                entry_type,
                size,
                block: block as u64,
                parent: dir_cluster as u64,
            },
            short_name,
        });
    }

    listed
}
