//! Common types shared by the orchestrator and filesystem drivers

use alloc::string::String;
use alloc::vec::Vec;
use core::ops::Deref;

/// Directory entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    File,
    Directory,
}

/// Directory entry metadata.
///
/// Produced fresh by every listing or lookup; two observations of the same
/// path carry no shared identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (long name when the filesystem has one)
    pub name: String,

    pub entry_type: EntryType,

    /// Size in bytes, 0 for directories
    pub size: u64,

    /// First allocation unit (cluster, extent, ...)
    pub block: u64,

    /// Allocation unit of the directory that listed this entry
    pub parent: u64,
}

impl DirEntry {
    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    pub fn type_string(&self) -> &'static str {
        match self.entry_type {
            EntryType::File => "File",
            EntryType::Directory => "Dir",
        }
    }
}

/// File contents handed to the caller.
///
/// The buffer is owned: once delivered, the access layer keeps no reference
/// to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileBuffer {
    data: Vec<u8>,
}

impl FileBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl Deref for FileBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for FileBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

/// What a read addresses: a path, or an entry observed by `ls`/`stat`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTarget {
    Path(String),
    Entry(DirEntry),
}

impl From<&str> for FileTarget {
    fn from(path: &str) -> Self {
        Self::Path(String::from(path))
    }
}

impl From<String> for FileTarget {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<DirEntry> for FileTarget {
    fn from(entry: DirEntry) -> Self {
        Self::Entry(entry)
    }
}

impl From<&DirEntry> for FileTarget {
    fn from(entry: &DirEntry) -> Self {
        Self::Entry(entry.clone())
    }
}

/// Split a path into its non-empty components.
///
/// Both `/` and `\` separate components; `"/"` and `""` name the root.
pub fn path_components(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\']).filter(|c| !c.is_empty() && *c != ".")
}
