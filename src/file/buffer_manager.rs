use log::error;

use super::error::{FileError, FileResult};
use super::file_manager::{FileHandle, PagedFileManager};
use super::page_index::PageIndex;
use super::{BUFFER_POOL_SIZE, FrameId, PAGE_SIZE, PageId};

/// Bookkeeping for one frame of the buffer pool
#[derive(Debug)]
struct FrameDesc {
    /// File whose page occupies this frame, if any
    file: Option<FileHandle>,
    /// Page number held in this frame
    page_id: PageId,
    /// Number of outstanding pins; the frame is evictable only at zero
    pin_count: u32,
    /// Frame content differs from the on-disk page
    dirty: bool,
    /// Frame holds a meaningful page
    valid: bool,
    /// Second-chance bit, set on every successful pin
    ref_bit: bool,
}

impl FrameDesc {
    fn new() -> Self {
        Self {
            file: None,
            page_id: 0,
            pin_count: 0,
            dirty: false,
            valid: false,
            ref_bit: false,
        }
    }

    /// Reset to the invalid state
    fn clear(&mut self) {
        *self = Self::new();
    }

    /// Initialize for a freshly loaded page, pinned once
    fn set(&mut self, file: FileHandle, page_id: PageId) {
        self.file = Some(file);
        self.page_id = page_id;
        self.pin_count = 1;
        self.dirty = false;
        self.valid = true;
        self.ref_bit = true;
    }
}

/// Manages a fixed pool of page frames with pin accounting and
/// clock (second-chance) replacement
pub struct BufferManager {
    /// Underlying file manager
    file_manager: PagedFileManager,
    /// Page storage, one PAGE_SIZE buffer per frame
    frames: Vec<Vec<u8>>,
    /// Per-frame bookkeeping, parallel to `frames`
    descriptors: Vec<FrameDesc>,
    /// Where each resident (file, page) lives
    index: PageIndex,
    /// Clock hand, advanced before each inspection
    clock_hand: usize,
}

impl BufferManager {
    /// Create a new buffer manager with the default pool size
    pub fn new(file_manager: PagedFileManager) -> Self {
        Self::with_capacity(file_manager, BUFFER_POOL_SIZE)
    }

    /// Create a new buffer manager with the specified number of frames
    pub fn with_capacity(file_manager: PagedFileManager, capacity: usize) -> Self {
        assert!(capacity > 0, "buffer pool needs at least one frame");
        Self {
            file_manager,
            frames: vec![vec![0u8; PAGE_SIZE]; capacity],
            descriptors: (0..capacity).map(|_| FrameDesc::new()).collect(),
            index: PageIndex::with_pool_size(capacity),
            // first advance lands on frame 0
            clock_hand: capacity - 1,
        }
    }

    /// Get a reference to the file manager
    pub fn file_manager(&self) -> &PagedFileManager {
        &self.file_manager
    }

    /// Get a mutable reference to the file manager
    pub fn file_manager_mut(&mut self) -> &mut PagedFileManager {
        &mut self.file_manager
    }

    /// Pin a page into the pool and return its frame contents.
    /// A hit bumps the pin count and reference bit; a miss evicts a victim
    /// frame and reads the page from disk. Every successful call must be
    /// paired with exactly one `unpin_page`.
    pub fn read_page(&mut self, file: FileHandle, page_id: PageId) -> FileResult<&mut [u8]> {
        match self.index.lookup(file, page_id) {
            Ok(frame) => {
                let desc = &mut self.descriptors[frame];
                desc.ref_bit = true;
                desc.pin_count += 1;
                Ok(&mut self.frames[frame])
            }
            Err(FileError::PageNotCached(_)) => {
                let frame = self.alloc_buf()?;
                self.file_manager
                    .read_page(file, page_id, &mut self.frames[frame])?;
                self.index.insert(file, page_id, frame)?;
                self.descriptors[frame].set(file, page_id);
                Ok(&mut self.frames[frame])
            }
            Err(e) => Err(e),
        }
    }

    /// Release one pin on a page; `dirty` records that the caller modified it.
    /// The dirty bit is only ever set here, never cleared.
    pub fn unpin_page(&mut self, file: FileHandle, page_id: PageId, dirty: bool) -> FileResult<()> {
        let frame = self.index.lookup(file, page_id)?;
        let desc = &mut self.descriptors[frame];
        if desc.pin_count == 0 {
            return Err(FileError::PageNotPinned(page_id));
        }
        desc.pin_count -= 1;
        if dirty {
            desc.dirty = true;
        }
        Ok(())
    }

    /// Allocate a fresh page in `file` and pin it into the pool.
    /// The returned frame is zeroed; the caller is responsible for
    /// initializing and eventually unpinning it.
    pub fn alloc_page(&mut self, file: FileHandle) -> FileResult<(PageId, &mut [u8])> {
        let page_id = self.file_manager.allocate_page(file)?;
        let frame = self.alloc_buf()?;
        self.index.insert(file, page_id, frame)?;
        self.descriptors[frame].set(file, page_id);
        self.frames[frame].fill(0);
        Ok((page_id, &mut self.frames[frame]))
    }

    /// Drop a page from the pool (if resident) and dispose of it on disk
    pub fn dispose_page(&mut self, file: FileHandle, page_id: PageId) -> FileResult<()> {
        if self.index.lookup(file, page_id).is_ok() {
            let frame = self.index.remove(file, page_id)?;
            self.descriptors[frame].clear();
        }
        self.file_manager.dispose_page(file, page_id)
    }

    /// Write back and invalidate every resident page of `file`.
    /// Fails with `PagePinned` if any of them is still pinned, leaving the
    /// pool unchanged up to that frame.
    pub fn flush_file(&mut self, file: FileHandle) -> FileResult<()> {
        for frame in 0..self.descriptors.len() {
            let (d_file, d_page, d_valid, d_pins, d_dirty) = {
                let d = &self.descriptors[frame];
                (d.file, d.page_id, d.valid, d.pin_count, d.dirty)
            };
            if d_file != Some(file) {
                continue;
            }
            if !d_valid {
                return Err(FileError::StaleFrame(frame));
            }
            if d_pins > 0 {
                return Err(FileError::PagePinned(d_page));
            }
            if d_dirty {
                self.file_manager
                    .write_page(file, d_page, &self.frames[frame])?;
                self.descriptors[frame].dirty = false;
            }
            self.index.remove(file, d_page)?;
            self.descriptors[frame].clear();
        }
        self.file_manager.sync_file(file)?;
        Ok(())
    }

    /// Re-borrow the frame contents of a page the caller already pinned.
    /// Does not touch pin count or reference bit; the pin taken out by
    /// `read_page`/`alloc_page` is the reservation that keeps the borrow
    /// valid.
    pub fn pinned_page(&mut self, file: FileHandle, page_id: PageId) -> FileResult<&mut [u8]> {
        let frame = self.index.lookup(file, page_id)?;
        if self.descriptors[frame].pin_count == 0 {
            return Err(FileError::PageNotPinned(page_id));
        }
        Ok(&mut self.frames[frame])
    }

    /// Select a victim frame with the clock algorithm, writing back a dirty
    /// victim first. The returned frame is cleared; the caller loads it.
    fn alloc_buf(&mut self) -> FileResult<FrameId> {
        // With every frame pinned the sweep below would spin forever
        // clearing reference bits, so check that up front.
        if self.descriptors.iter().all(|d| d.pin_count > 0) {
            return Err(FileError::BufferExceeded);
        }

        loop {
            self.clock_hand = (self.clock_hand + 1) % self.descriptors.len();
            let hand = self.clock_hand;

            if !self.descriptors[hand].valid {
                return Ok(hand);
            }
            if self.descriptors[hand].ref_bit {
                // Second chance: clear and move on
                self.descriptors[hand].ref_bit = false;
                continue;
            }
            if self.descriptors[hand].pin_count > 0 {
                continue;
            }

            let (file, page_id) = match self.descriptors[hand].file {
                Some(file) => (file, self.descriptors[hand].page_id),
                None => return Err(FileError::StaleFrame(hand)),
            };
            if self.descriptors[hand].dirty {
                self.file_manager
                    .write_page(file, page_id, &self.frames[hand])?;
                self.descriptors[hand].dirty = false;
            }
            self.index.remove(file, page_id)?;
            self.descriptors[hand].clear();
            return Ok(hand);
        }
    }

    /// Number of frames in the pool
    pub fn pool_size(&self) -> usize {
        self.descriptors.len()
    }

    /// Number of pages currently resident in the pool
    pub fn cached_page_count(&self) -> usize {
        self.index.len()
    }

    /// Check if a page is resident in the pool
    pub fn is_page_cached(&self, file: FileHandle, page_id: PageId) -> bool {
        self.index.lookup(file, page_id).is_ok()
    }

    /// Pin count of a resident page, or None if it is not resident
    pub fn pin_count(&self, file: FileHandle, page_id: PageId) -> Option<u32> {
        self.index
            .lookup(file, page_id)
            .ok()
            .map(|frame| self.descriptors[frame].pin_count)
    }

    /// Number of frames with at least one pin outstanding
    pub fn pinned_frame_count(&self) -> usize {
        self.descriptors.iter().filter(|d| d.pin_count > 0).count()
    }

    /// Number of dirty frames in the pool
    pub fn dirty_page_count(&self) -> usize {
        self.descriptors.iter().filter(|d| d.dirty).count()
    }
}

impl Drop for BufferManager {
    fn drop(&mut self) {
        // Write back whatever is still dirty, pinned or not; the pool is
        // going away either way.
        for frame in 0..self.descriptors.len() {
            let d = &self.descriptors[frame];
            if !(d.valid && d.dirty) {
                continue;
            }
            let Some(file) = d.file else { continue };
            let page_id = d.page_id;
            if let Err(e) = self
                .file_manager
                .write_page(file, page_id, &self.frames[frame])
            {
                error!("write-back of page {page_id} failed on pool teardown: {e}");
            }
        }
    }
}
