use crate::common::config::{PageId, PAGE_SIZE};
use crate::common::error::Result;
use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Bookkeeping persisted alongside the data file so a disk manager can be
/// reopened without losing track of which page-ids have been deallocated.
/// This is bookkeeping for the disk manager itself, not pool-visible state:
/// the pool remains a pure cache (§6, "Persisted state: none beyond whatever
/// the disk manager persists").
#[derive(Default, Serialize, Deserialize)]
struct Metadata {
    deallocated: HashSet<PageId>,
}

/// Snapshot of disk manager activity, logged rather than exported through a
/// metrics dependency (none is in the crate's stack).
#[derive(Debug, Clone, Copy)]
pub struct DiskManagerStats {
    pub num_reads: u64,
    pub num_writes: u64,
    pub read_latency_us_p99: u64,
    pub write_latency_us_p99: u64,
}

/// File-backed implementation of the disk manager the buffer pool consumes
/// as an external collaborator (§6). Its own design is out of scope for the
/// pool's contract -- this is a single growable file, addressed by
/// `page_id * PAGE_SIZE` byte offsets, sufficient to exercise the pool.
pub struct DiskManager {
    file: File,
    meta_path: PathBuf,
    metadata: Metadata,
    num_reads: u64,
    num_writes: u64,
    read_latency_us: Histogram<u64>,
    write_latency_us: Histogram<u64>,
}

impl DiskManager {
    /// Opens (creating if necessary) a database file at `path`. A sidecar
    /// `<path>.meta` file tracks deallocated page-ids across reopens.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;

        let meta_path = Self::meta_path(path);
        let metadata = Self::load_metadata(&meta_path);

        Ok(Self {
            file,
            meta_path,
            metadata,
            num_reads: 0,
            num_writes: 0,
            read_latency_us: Histogram::new(3).expect("valid histogram parameters"),
            write_latency_us: Histogram::new(3).expect("valid histogram parameters"),
        })
    }

    fn meta_path(db_path: &Path) -> PathBuf {
        let mut meta = db_path.as_os_str().to_owned();
        meta.push(".meta");
        PathBuf::from(meta)
    }

    fn load_metadata(meta_path: &Path) -> Metadata {
        match File::open(meta_path) {
            Ok(mut f) => {
                let mut bytes = Vec::new();
                if f.read_to_end(&mut bytes).is_ok() {
                    bincode::deserialize(&bytes).unwrap_or_default()
                } else {
                    Metadata::default()
                }
            }
            Err(_) => Metadata::default(),
        }
    }

    fn persist_metadata(&self) {
        if let Ok(bytes) = bincode::serialize(&self.metadata) {
            if let Err(err) = std::fs::write(&self.meta_path, bytes) {
                log::warn!("failed to persist disk manager metadata: {err}");
            }
        }
    }

    /// Reads `PAGE_SIZE` bytes for `page_id` into `dst`. Pages never written
    /// to are read back as zero-filled (the file is sparse past the first
    /// write for any given offset).
    pub fn read_page(&mut self, page_id: PageId, dst: &mut [u8; PAGE_SIZE]) -> Result<()> {
        let start = Instant::now();
        let offset = Self::offset_of(page_id);
        self.file.seek(SeekFrom::Start(offset))?;
        match self.file.read_exact(dst) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                dst.fill(0);
            }
            Err(err) => return Err(err.into()),
        }
        self.num_reads += 1;
        let _ = self
            .read_latency_us
            .record(start.elapsed().as_micros() as u64);
        log::trace!("disk read page_id={page_id}");
        Ok(())
    }

    /// Writes `src` to `page_id`'s slot, growing the backing file as needed.
    pub fn write_page(&mut self, page_id: PageId, src: &[u8; PAGE_SIZE]) -> Result<()> {
        let start = Instant::now();
        let offset = Self::offset_of(page_id);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(src)?;
        self.file.flush()?;
        self.num_writes += 1;
        let _ = self
            .write_latency_us
            .record(start.elapsed().as_micros() as u64);
        log::trace!("disk write page_id={page_id}");
        Ok(())
    }

    /// Marks `page_id` deallocated. The backing space is not reclaimed (no
    /// compaction); this is bookkeeping only, matching bustub's own
    /// placeholder `DeallocatePage` (it imitates freeing the page on disk
    /// without a real free-space map).
    pub fn deallocate_page(&mut self, page_id: PageId) {
        self.metadata.deallocated.insert(page_id);
        self.persist_metadata();
        log::trace!("disk deallocate page_id={page_id}");
    }

    pub fn is_deallocated(&self, page_id: PageId) -> bool {
        self.metadata.deallocated.contains(&page_id)
    }

    pub fn stats(&self) -> DiskManagerStats {
        DiskManagerStats {
            num_reads: self.num_reads,
            num_writes: self.num_writes,
            read_latency_us_p99: self.read_latency_us.value_at_quantile(0.99),
            write_latency_us_p99: self.write_latency_us.value_at_quantile(0.99),
        }
    }

    fn offset_of(page_id: PageId) -> u64 {
        (page_id as u64) * (PAGE_SIZE as u64)
    }
}
