use crate::common::config::{FrameId, PageId, INVALID_PAGE_ID, PAGE_SIZE};
use crate::storage::buffer::lru_replacer::LRUReplacer;
use crate::storage::disk::DiskManager;
use crate::storage::log::LogManager;
use crate::storage::page::{Page, PageHandle};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Mutable state guarded by the instance's single latch (§4.2, §5): the
/// frame array, the page table, the free list, and the per-instance
/// allocator. Held for the whole duration of every public operation,
/// including disk I/O -- holding the latch across I/O is intentional, per
/// §5, so no operation on this instance can observe a half-replaced frame.
struct PoolState {
    pages: Vec<PageHandle>,
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    next_page_id: PageId,
}

/// A single shard of the buffer pool: a fixed array of frames, a page
/// table, a free list, and an LRU replacer, mediating reads and writes for
/// one residue class of the page-id space (§2, §4.2).
///
/// Every public operation here takes `state` for its entire duration --
/// "each pool instance serializes all of its operations with one mutex"
/// (§5). The replacer carries its own nested mutex, acquired only while
/// `state` is already held. Frames are additionally `RwLock`-wrapped so a
/// caller holding a pin can read or write page bytes after this instance's
/// own operation has returned and released `state`.
pub struct BufferPoolManager {
    pool_size: usize,
    num_instances: usize,
    state: Mutex<PoolState>,
    replacer: Mutex<LRUReplacer>,
    disk_manager: Arc<Mutex<DiskManager>>,
    _log_manager: LogManager,
}

impl BufferPoolManager {
    /// Creates an unsharded instance (`instance_index = 0`, `num_instances =
    /// 1`) -- the common case when the pool isn't composed under a
    /// [`crate::storage::buffer::ParallelBufferPoolManager`].
    pub fn new(pool_size: usize, disk_manager: Arc<Mutex<DiskManager>>) -> Self {
        Self::new_shard(pool_size, 0, 1, disk_manager, LogManager::new())
    }

    /// Creates one shard of a sharded pool. `instance_index` seeds the
    /// per-instance allocator at `instance_index`, advancing by
    /// `num_instances` on every allocation, so that
    /// `page_id mod num_instances == instance_index` for every page this
    /// instance ever allocates (§3, §6).
    pub fn new_shard(
        pool_size: usize,
        instance_index: usize,
        num_instances: usize,
        disk_manager: Arc<Mutex<DiskManager>>,
        log_manager: LogManager,
    ) -> Self {
        assert!(pool_size > 0, "pool_size must be positive");
        assert!(num_instances > 0, "num_instances must be positive");
        let pages = (0..pool_size)
            .map(|_| Arc::new(std::sync::RwLock::new(Page::empty())))
            .collect();
        Self {
            pool_size,
            num_instances,
            state: Mutex::new(PoolState {
                pages,
                page_table: HashMap::new(),
                free_list: (0..pool_size).collect(),
                next_page_id: instance_index as PageId,
            }),
            replacer: Mutex::new(LRUReplacer::new(pool_size)),
            disk_manager,
            _log_manager: log_manager,
        }
    }

    pub fn size(&self) -> usize {
        self.pool_size
    }

    /// Fetches the page identified by `page_id`, pinning it. Returns `None`
    /// only when the page is not resident and no victim frame is available
    /// (every frame pinned and the free list empty) -- §4.2.
    pub fn fetch_page(&self, page_id: PageId) -> Option<PageHandle> {
        if page_id == INVALID_PAGE_ID {
            return None;
        }
        let mut state = self.state.lock().unwrap();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let handle = state.pages[frame_id].clone();
            handle.write().unwrap().pin();
            self.replacer.lock().unwrap().pin(frame_id);
            log::debug!("fetch_page hit page_id={page_id} frame_id={frame_id}");
            return Some(handle);
        }

        let frame_id = self.find_replacement(&mut state)?;

        let mut buf = [0u8; PAGE_SIZE];
        if let Err(err) = self.disk_manager.lock().unwrap().read_page(page_id, &mut buf) {
            log::warn!("fetch_page: read failed for page_id={page_id}: {err}");
            state.free_list.push_back(frame_id);
            return None;
        }

        {
            let frame = &state.pages[frame_id];
            let mut guard = frame.write().unwrap();
            guard.reset(page_id);
            guard.data_mut().copy_from_slice(&buf);
            guard.pin();
        }

        state.page_table.insert(page_id, frame_id);
        self.replacer.lock().unwrap().pin(frame_id);
        log::debug!("fetch_page miss page_id={page_id} frame_id={frame_id}");
        Some(state.pages[frame_id].clone())
    }

    /// Allocates a fresh page-id via the per-instance allocator and returns
    /// a pinned handle to it. Returns `None` if every frame is currently
    /// pinned (§4.2.2's "all pinned" pre-check).
    pub fn new_page(&self) -> Option<(PageId, PageHandle)> {
        let mut state = self.state.lock().unwrap();

        if state.free_list.is_empty() && self.replacer.lock().unwrap().size() == 0 {
            log::warn!("new_page: pool saturated, every frame pinned");
            return None;
        }

        let frame_id = self.find_replacement(&mut state)?;

        let page_id = state.next_page_id;
        state.next_page_id += self.num_instances as PageId;

        {
            let frame = &state.pages[frame_id];
            let mut guard = frame.write().unwrap();
            guard.reset(page_id);
            guard.pin();
        }
        state.page_table.insert(page_id, frame_id);
        self.replacer.lock().unwrap().pin(frame_id);

        // Written through immediately so the page exists on disk for future
        // fetches -- kept from the source's behavior per §9.
        let data = *state.pages[frame_id].read().unwrap().data();
        if let Err(err) = self.disk_manager.lock().unwrap().write_page(page_id, &data) {
            log::warn!("new_page: write-through failed for page_id={page_id}: {err}");
        }

        log::debug!("new_page allocated page_id={page_id} frame_id={frame_id}");
        Some((page_id, state.pages[frame_id].clone()))
    }

    /// Decrements the pin count for `page_id`. Returns `false` on a miss or
    /// a double-unpin (pin count already zero) without altering the count
    /// (§4.2, §9: the specified fix for the source's ambiguous behavior).
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let state = self.state.lock().unwrap();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };

        let now_zero = {
            let mut guard = state.pages[frame_id].write().unwrap();
            if guard.pin_count() == 0 {
                return false;
            }
            guard.mark_dirty(is_dirty);
            guard.unpin();
            guard.pin_count() == 0
        };

        if now_zero {
            self.replacer.lock().unwrap().unpin(frame_id);
        }
        true
    }

    /// Writes the page's bytes through the disk manager regardless of the
    /// dirty flag, then clears it (§4.2, §9). Returns `false` on a miss, the
    /// sentinel id, or an I/O failure.
    pub fn flush_page(&self, page_id: PageId) -> bool {
        if page_id == INVALID_PAGE_ID {
            return false;
        }
        let state = self.state.lock().unwrap();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };
        self.flush_frame(&state, frame_id, page_id)
    }

    /// Writes frame `frame_id`'s bytes for `page_id` through the disk
    /// manager. Called with `state` already held.
    fn flush_frame(&self, state: &MutexGuard<'_, PoolState>, frame_id: FrameId, page_id: PageId) -> bool {
        let data = *state.pages[frame_id].read().unwrap().data();
        match self.disk_manager.lock().unwrap().write_page(page_id, &data) {
            Ok(()) => {
                state.pages[frame_id].write().unwrap().set_dirty(false);
                true
            }
            Err(err) => {
                log::warn!("flush_page: write failed for page_id={page_id}: {err}");
                false
            }
        }
    }

    /// Flushes every resident page. Order is unspecified; this is not an
    /// atomic snapshot (§4.2, §5).
    pub fn flush_all_pages(&self) {
        let state = self.state.lock().unwrap();
        let entries: Vec<(PageId, FrameId)> = state
            .page_table
            .iter()
            .map(|(&pid, &fid)| (pid, fid))
            .collect();
        for (page_id, frame_id) in entries {
            self.flush_frame(&state, frame_id, page_id);
        }
    }

    /// Deletes `page_id`. A miss returns `true` (idempotent absence). A
    /// pinned page returns `false`. Otherwise flushes if dirty, deallocates
    /// on disk, clears the table entry, resets the frame, and returns it to
    /// the free list (§4.2).
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let mut state = self.state.lock().unwrap();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return true;
        };

        if state.pages[frame_id].read().unwrap().pin_count() > 0 {
            return false;
        }

        if state.pages[frame_id].read().unwrap().is_dirty() && !self.flush_frame(&state, frame_id, page_id) {
            // Flush failed: leave the page resident and dirty rather than
            // deallocating it and losing its bytes (§7 propagation policy).
            return false;
        }

        state.page_table.remove(&page_id);
        state.pages[frame_id].write().unwrap().reset(INVALID_PAGE_ID);
        state.free_list.push_back(frame_id);
        self.replacer.lock().unwrap().pin(frame_id);

        self.disk_manager.lock().unwrap().deallocate_page(page_id);
        log::debug!("delete_page removed page_id={page_id} frame_id={frame_id}");
        true
    }

    pub fn get_pin_count(&self, page_id: PageId) -> Option<usize> {
        let state = self.state.lock().unwrap();
        let &frame_id = state.page_table.get(&page_id)?;
        Some(state.pages[frame_id].read().unwrap().pin_count())
    }

    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let state = self.state.lock().unwrap();
        let &frame_id = state.page_table.get(&page_id)?;
        Some(state.pages[frame_id].read().unwrap().is_dirty())
    }

    /// §4.2.1: the only place a frame moves into pinned use. Prefers the
    /// free list; falls back to the replacer's victim. A dirty victim is
    /// written through using *its own* page-id (read from the frame before
    /// it's overwritten), never the frame-id -- the bug flagged in §9.
    fn find_replacement(&self, state: &mut PoolState) -> Option<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Some(frame_id);
        }

        let frame_id = self.replacer.lock().unwrap().victim()?;
        let (old_page_id, is_dirty, data) = {
            let guard = state.pages[frame_id].read().unwrap();
            (guard.page_id(), guard.is_dirty(), *guard.data())
        };

        if old_page_id != INVALID_PAGE_ID {
            if is_dirty {
                if let Err(err) = self.disk_manager.lock().unwrap().write_page(old_page_id, &data) {
                    log::warn!(
                        "find_replacement: writeback failed for page_id={old_page_id}, rolling back eviction: {err}"
                    );
                    // Roll back per §7: the old page stays resident, the new
                    // page is not inserted. The frame's metadata was never
                    // touched, so restoring it as an eviction candidate is
                    // enough to undo the victim() call above.
                    self.replacer.lock().unwrap().unpin(frame_id);
                    return None;
                }
            }
            state.page_table.remove(&old_page_id);
        }

        Some(frame_id)
    }
}
