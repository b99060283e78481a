use crate::common::config::{PageId, INVALID_PAGE_ID, PAGE_SIZE};
use std::sync::{Arc, RwLock};

/// A fixed-size unit of disk storage and cache residency, identified by a
/// page-id (§3 of the buffer pool contract).
///
/// The byte block is owned by the frame that contains it; the page-id is the
/// logical address that outlives frame occupancy. This type carries no
/// slotted-page or tuple layout -- that belongs to the access-methods layer,
/// which the buffer pool never touches.
pub struct Page {
    page_id: PageId,
    data: Box<[u8; PAGE_SIZE]>,
    pin_count: usize,
    is_dirty: bool,
}

/// A `Page` is never handed outside the pool by value (§3); callers receive
/// a shared handle whose validity is tied to their pin.
pub type PageHandle = Arc<RwLock<Page>>;

impl Page {
    /// An empty, unpinned, clean frame holding no page. Mirrors the "free"
    /// frame state described in §3.
    pub fn empty() -> Self {
        Self {
            page_id: INVALID_PAGE_ID,
            data: Box::new([0u8; PAGE_SIZE]),
            pin_count: 0,
            is_dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn set_page_id(&mut self, page_id: PageId) {
        self.page_id = page_id;
    }

    pub fn data(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.data
    }

    pub fn pin_count(&self) -> usize {
        self.pin_count
    }

    pub fn pin(&mut self) {
        self.pin_count += 1;
    }

    /// Decrements the pin count. Panics if already zero -- callers are
    /// responsible for checking `pin_count()` first (the pool's `unpin`
    /// operation does this itself before calling in).
    pub fn unpin(&mut self) {
        assert!(self.pin_count > 0, "unpin called on a page with pin_count 0");
        self.pin_count -= 1;
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Dirty is sticky until flush: this only ORs in `true`.
    pub fn mark_dirty(&mut self, is_dirty: bool) {
        self.is_dirty = self.is_dirty || is_dirty;
    }

    pub fn set_dirty(&mut self, is_dirty: bool) {
        self.is_dirty = is_dirty;
    }

    /// Resets metadata for reuse by a different page-id. Contents are left
    /// untouched; the caller overwrites them before anyone observes them.
    pub fn reset(&mut self, page_id: PageId) {
        self.page_id = page_id;
        self.pin_count = 0;
        self.is_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_page_is_sentinel() {
        let page = Page::empty();
        assert_eq!(page.page_id(), INVALID_PAGE_ID);
        assert_eq!(page.pin_count(), 0);
        assert!(!page.is_dirty());
    }

    #[test]
    fn dirty_is_sticky() {
        let mut page = Page::empty();
        page.mark_dirty(true);
        page.mark_dirty(false);
        assert!(page.is_dirty());
    }

    #[test]
    #[should_panic]
    fn unpin_below_zero_panics() {
        let mut page = Page::empty();
        page.unpin();
    }
}
