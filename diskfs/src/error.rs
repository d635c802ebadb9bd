//! Error types for disk and filesystem operations
//!
//! Every asynchronous operation resolves to exactly one [`Result`]. `Ok`
//! is the success code; an [`FsError`] carries the failure kind and an
//! optional human-readable detail.

use alloc::string::String;
use core::fmt;

use crate::device::BlockError;

/// Result type for diskfs operations
pub type Result<T> = core::result::Result<T, FsError>;

/// Failure categories surfaced by the access layer and its drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Block device read failed or went beyond device/partition capacity
    DeviceIo,

    /// Sector 0 carries no valid boot-sector signature
    NoPartitionTable,

    /// No partition matches what the filesystem driver recognizes
    UnknownFilesystem,

    /// The filesystem driver rejected the selected partition
    MountFailed,

    /// Path does not resolve, or resolves to the wrong entry type
    PathNotFound,

    /// Filesystem operation issued while the disk is not mounted
    NotMounted,

    /// Mount already in progress or already mounted
    Busy,
}

impl ErrorKind {
    /// Short lowercase name, stable for log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeviceIo => "device-io",
            Self::NoPartitionTable => "no-partition-table",
            Self::UnknownFilesystem => "unknown-filesystem",
            Self::MountFailed => "mount-failed",
            Self::PathNotFound => "path-not-found",
            Self::NotMounted => "not-mounted",
            Self::Busy => "busy",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceIo => write!(f, "Block device I/O error"),
            Self::NoPartitionTable => write!(f, "No partition table found"),
            Self::UnknownFilesystem => write!(f, "No recognizable filesystem"),
            Self::MountFailed => write!(f, "Filesystem mount failed"),
            Self::PathNotFound => write!(f, "Path not found"),
            Self::NotMounted => write!(f, "Filesystem not mounted"),
            Self::Busy => write!(f, "Mount already in progress or already mounted"),
        }
    }
}

/// Error value delivered to every failed completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsError {
    kind: ErrorKind,
    detail: Option<String>,
}

impl FsError {
    /// Create an error without detail
    pub const fn new(kind: ErrorKind) -> Self {
        Self { kind, detail: None }
    }

    /// Attach a human-readable detail
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn device_io(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeviceIo).with_detail(detail)
    }

    pub fn path_not_found(path: &str) -> Self {
        Self::new(ErrorKind::PathNotFound).with_detail(path)
    }

    pub const fn not_mounted() -> Self {
        Self::new(ErrorKind::NotMounted)
    }
}

impl From<ErrorKind> for FsError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<BlockError> for FsError {
    fn from(err: BlockError) -> Self {
        Self::device_io(alloc::format!("{}", err))
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.kind, detail),
            None => write!(f, "{}", self.kind),
        }
    }
}
