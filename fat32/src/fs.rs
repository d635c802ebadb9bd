// FAT32 driver: cluster chains, path resolution, file reads

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;

use diskfs::{
    path_components, BlockDevice, DirEntry, EntryType, FileBuffer, FileTarget, FilesystemDriver,
    FsError, Result, SectorBuf, Volume, SECTOR_SIZE,
};
use log::{debug, warn};
#[cfg(feature = "trace")]
use log::trace;

use crate::context::{fat_entry, Fat32Context, END_OF_CHAIN};
use crate::dir::{parse_directory, Listed};
use crate::error::Fat32Error;

/// MBR partition type ids that hold FAT32
pub const FAT32_PARTITION_TYPES: [u8; 2] = [0x0B, 0x0C];

/// Read-only FAT32 filesystem mounted on a [`Volume`]
pub struct Fat32<D: BlockDevice> {
    volume: Volume<D>,
    ctx: Fat32Context,
}

impl<D: BlockDevice> Fat32<D> {
    pub fn context(&self) -> &Fat32Context {
        &self.ctx
    }

    pub fn label(&self) -> &str {
        self.ctx.label()
    }

    pub fn volume(&self) -> &Volume<D> {
        &self.volume
    }

    fn root_entry(&self) -> DirEntry {
        DirEntry {
            name: String::from("/"),
            entry_type: EntryType::Directory,
            size: 0,
            block: self.ctx.root_cluster as u64,
            parent: self.ctx.root_cluster as u64,
        }
    }

    /// FAT successor of `cluster`; `fat_cache` keeps the last FAT sector read
    async fn next_cluster(&self, cluster: u32, fat_cache: &mut Option<(u32, SectorBuf)>) -> Result<u32> {
        let (fat_sector, entry_offset) = self.ctx.fat_entry_location(cluster);

        let cached = matches!(fat_cache.as_ref(), Some((sector, _)) if *sector == fat_sector);
        if !cached {
            let buf = self.volume.read(fat_sector as u64, 1).await?;
            *fat_cache = Some((fat_sector, buf));
        }

        match fat_cache.as_ref() {
            Some((_, buf)) => Ok(fat_entry(buf, entry_offset)),
            None => Err(FsError::device_io("FAT sector unavailable")),
        }
    }

    /// Clusters of the chain starting at `start`, up to `limit` of them
    async fn chain(&self, start: u32, limit: Option<usize>) -> Result<Vec<u32>> {
        if !self.ctx.is_valid_cluster(start) {
            return Err(Fat32Error::BadCluster(start).into());
        }

        let mut clusters = Vec::new();
        clusters.push(start);
        let mut visited = BTreeSet::new();
        visited.insert(start);
        let mut fat_cache = None;
        let mut current = start;

        while limit.map_or(true, |n| clusters.len() < n) {
            let next = self.next_cluster(current, &mut fat_cache).await?;
            if next >= END_OF_CHAIN {
                break;
            }
            if !self.ctx.is_valid_cluster(next) {
                return Err(Fat32Error::BadCluster(next).into());
            }
            // Revisiting a cluster means the chain loops
            if !visited.insert(next) {
                return Err(Fat32Error::ChainCycle(start).into());
            }
            clusters.push(next);
            current = next;
        }

        #[cfg(feature = "trace")]
        trace!(target: "fat32", "chain from {}: {} clusters", start, clusters.len());
        Ok(clusters)
    }

    /// Read whole clusters, merging contiguous runs into single device reads
    async fn read_clusters(&self, clusters: &[u32]) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(clusters.len() * self.ctx.cluster_size());

        let mut i = 0;
        while i < clusters.len() {
            let first = clusters[i];
            let mut run = 1;
            while i + run < clusters.len() && clusters[i + run] == first + run as u32 {
                run += 1;
            }

            let sector = self.ctx.cluster_to_sector(first) as u64;
            let count = run as u32 * self.ctx.sectors_per_cluster;
            #[cfg(feature = "trace")]
            trace!(target: "fat32", "cluster {} x{} -> sector {}", first, run, sector);
            data.extend_from_slice(&self.volume.read(sector, count).await?);
            i += run;
        }

        Ok(data)
    }

    async fn read_dir(&self, cluster: u32) -> Result<Vec<Listed>> {
        let clusters = self.chain(cluster, None).await?;
        let data = self.read_clusters(&clusters).await?;
        Ok(parse_directory(&data, cluster, self.ctx.root_cluster))
    }

    /// Walk `path` from the root directory
    async fn resolve(&self, path: &str) -> Result<DirEntry> {
        let mut current = self.root_entry();

        for component in path_components(path) {
            if !current.is_dir() {
                return Err(FsError::path_not_found(path));
            }
            current = self
                .read_dir(current.block as u32)
                .await?
                .into_iter()
                .find(|listed| listed.matches(component))
                .map(|listed| listed.entry)
                .ok_or_else(|| FsError::path_not_found(path))?;
        }

        Ok(current)
    }

    /// Confirm an entry observed earlier is still present in its directory
    async fn revalidate(&self, observed: &DirEntry) -> Result<DirEntry> {
        let parent = observed.parent as u32;
        if !self.ctx.is_valid_cluster(parent) {
            return Err(FsError::path_not_found(&observed.name));
        }

        self.read_dir(parent)
            .await?
            .into_iter()
            .map(|listed| listed.entry)
            .find(|e| e.block == observed.block && e.name == observed.name)
            .ok_or_else(|| FsError::path_not_found(&observed.name))
    }

    async fn read_range(&self, target: FileTarget, offset: u64, len: u64) -> Result<FileBuffer> {
        let entry = match target {
            FileTarget::Path(path) => self.resolve(&path).await?,
            FileTarget::Entry(observed) => {
                if !self.revalidate(&observed).await?.is_file() {
                    return Err(FsError::path_not_found(&observed.name));
                }
                observed
            }
        };
        if !entry.is_file() {
            return Err(FsError::path_not_found(&entry.name));
        }

        let end = offset.saturating_add(len).min(entry.size);
        if offset >= end {
            return Ok(FileBuffer::default());
        }

        let cluster_size = self.ctx.cluster_size() as u64;
        let first = (offset / cluster_size) as usize;
        let needed = end.div_ceil(cluster_size) as usize;

        let clusters = self.chain(entry.block as u32, Some(needed)).await?;
        if clusters.len() < needed {
            warn!(
                target: "fat32",
                "{}: chain covers {} of {} clusters",
                entry.name, clusters.len(), needed
            );
            return Err(Fat32Error::ChainTooShort {
                needed: needed as u32,
                found: clusters.len() as u32,
            }
            .into());
        }

        let mut data = self.read_clusters(&clusters[first..]).await?;
        let skip = (offset - first as u64 * cluster_size) as usize;
        data.truncate(skip + (end - offset) as usize);
        data.drain(..skip);
        Ok(FileBuffer::new(data))
    }
}

impl<D: BlockDevice> FilesystemDriver<D> for Fat32<D> {
    fn name(&self) -> &'static str {
        "FAT32"
    }

    fn recognizes(part_type: u8) -> bool {
        FAT32_PARTITION_TYPES.contains(&part_type)
    }

    async fn init(volume: Volume<D>) -> Result<Self> {
        if volume.sector_size() != SECTOR_SIZE {
            return Err(Fat32Error::UnsupportedSectorSize(volume.sector_size() as u16).into());
        }

        let boot_sector = volume.read(0, 1).await?;
        let ctx = Fat32Context::from_boot_sector(&boot_sector)?;

        if ctx.total_sectors as u64 > volume.sector_count() {
            warn!(
                target: "fat32",
                "VBR claims {} sectors, partition has {}",
                ctx.total_sectors,
                volume.sector_count()
            );
        }
        debug!(
            target: "fat32",
            "mounted '{}': {} sectors/cluster, FAT {}x{} sectors, root cluster {}, data at {}",
            ctx.label(),
            ctx.sectors_per_cluster,
            ctx.num_fats,
            ctx.fat_size,
            ctx.root_cluster,
            ctx.data_start_sector
        );

        Ok(Self { volume, ctx })
    }

    async fn ls<'a>(&'a self, path: &'a str) -> Result<Vec<DirEntry>> {
        let dir = self.resolve(path).await?;
        if !dir.is_dir() {
            return Err(FsError::path_not_found(path));
        }

        let entries: Vec<DirEntry> = self
            .read_dir(dir.block as u32)
            .await?
            .into_iter()
            .map(|listed| listed.entry)
            .collect();
        debug!(target: "fat32", "ls {}: {} entries", path, entries.len());
        Ok(entries)
    }

    async fn stat<'a>(&'a self, path: &'a str) -> Result<DirEntry> {
        self.resolve(path).await
    }

    async fn read_file(&self, target: FileTarget) -> Result<FileBuffer> {
        self.read_range(target, 0, u64::MAX).await
    }

    async fn read(&self, target: FileTarget, offset: u64, len: u64) -> Result<FileBuffer> {
        let buffer = self.read_range(target, offset, len).await?;
        if buffer.is_empty() {
            debug!(target: "fat32", "empty read at offset {}", offset);
        }
        Ok(buffer)
    }
}
