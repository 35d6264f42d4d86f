use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::error::{FileError, FileResult};
use super::file_manager::FileHandle;
use super::{FrameId, PageId};

/// A key identifying a page in the buffer pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BufferKey {
    file: FileHandle,
    page_id: PageId,
}

/// Maps resident (file, page) pairs to their buffer pool frame.
/// Each resident page has exactly one entry; duplicate inserts are rejected.
pub struct PageIndex {
    entries: HashMap<BufferKey, FrameId>,
}

impl PageIndex {
    /// Create an index sized for a pool of `pool_size` frames.
    /// Capacity runs ahead of the pool so the map never rehashes in steady state.
    pub fn with_pool_size(pool_size: usize) -> Self {
        Self {
            entries: HashMap::with_capacity((pool_size * 12).div_ceil(10)),
        }
    }

    /// Find the frame holding (file, page_id)
    pub fn lookup(&self, file: FileHandle, page_id: PageId) -> FileResult<FrameId> {
        self.entries
            .get(&BufferKey { file, page_id })
            .copied()
            .ok_or(FileError::PageNotCached(page_id))
    }

    /// Record that (file, page_id) now occupies `frame`
    pub fn insert(&mut self, file: FileHandle, page_id: PageId, frame: FrameId) -> FileResult<()> {
        match self.entries.entry(BufferKey { file, page_id }) {
            Entry::Occupied(_) => Err(FileError::PageAlreadyCached(page_id)),
            Entry::Vacant(slot) => {
                slot.insert(frame);
                Ok(())
            }
        }
    }

    /// Drop the entry for (file, page_id), returning the frame it mapped to
    pub fn remove(&mut self, file: FileHandle, page_id: PageId) -> FileResult<FrameId> {
        self.entries
            .remove(&BufferKey { file, page_id })
            .ok_or(FileError::PageNotCached(page_id))
    }

    /// Number of resident pages
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
