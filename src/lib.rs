//! A disk-resident database's buffer pool: a bounded in-memory cache of
//! fixed-size page frames mediating every read and write between higher
//! layers and a block-addressable disk.
//!
//! [`storage::buffer::BufferPoolManager`] is the single-shard cache; an LRU
//! [`storage::buffer::LRUReplacer`] backs its eviction policy.
//! [`storage::buffer::ParallelBufferPoolManager`] composes several
//! instances, partitioning the page-id space by residue for concurrent
//! throughput. Disk I/O and write-ahead logging are external collaborators,
//! consumed through the narrow contracts in [`storage::disk`] and
//! [`storage::log`].

pub mod common;
pub mod storage;

pub use common::config::{BufferPoolConfig, FrameId, PageId, INVALID_PAGE_ID, PAGE_SIZE};
pub use common::error::{Error, Result};
pub use storage::buffer::{BufferPoolManager, LRUReplacer, ParallelBufferPoolManager};
pub use storage::disk::{DiskManager, DiskManagerStats};
pub use storage::log::LogManager;
pub use storage::page::{Page, PageHandle};
