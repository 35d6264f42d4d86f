use log::error;

use super::RecordId;
use super::error::{RecordError, RecordResult};
use super::page::DataPage;
use crate::file::{BufferManager, FileHandle, PAGE_SIZE, PageId};

/// Longest file name a header page can carry
const MAX_FILE_NAME: usize = 256;

/// File header stored in the first page of each heap file.
/// Page links use 0 as the "no page" sentinel; the header itself is always
/// page 0, so 0 can never name a data page.
#[derive(Debug, Clone)]
pub(crate) struct FileHeader {
    pub(crate) file_name: String,
    pub(crate) first_page: Option<PageId>,
    pub(crate) last_page: Option<PageId>,
    pub(crate) page_cnt: u32,
    pub(crate) rec_cnt: u32,
}

fn encode_page(page: Option<PageId>) -> u32 {
    page.map_or(0, |p| p as u32)
}

fn decode_page(raw: u32) -> Option<PageId> {
    (raw != 0).then_some(raw as PageId)
}

impl FileHeader {
    const NAME_OFFSET: usize = 18;

    /// Serialize into a header page frame
    pub(crate) fn write_to(&self, buffer: &mut [u8]) -> RecordResult<()> {
        if buffer.len() != PAGE_SIZE {
            return Err(RecordError::Deserialization(format!(
                "Buffer must be PAGE_SIZE ({}) bytes, got {}",
                PAGE_SIZE,
                buffer.len()
            )));
        }
        let name = self.file_name.as_bytes();
        if name.len() > MAX_FILE_NAME {
            return Err(RecordError::InvalidFileName(self.file_name.clone()));
        }

        buffer[0..4].copy_from_slice(&encode_page(self.first_page).to_le_bytes());
        buffer[4..8].copy_from_slice(&encode_page(self.last_page).to_le_bytes());
        buffer[8..12].copy_from_slice(&self.page_cnt.to_le_bytes());
        buffer[12..16].copy_from_slice(&self.rec_cnt.to_le_bytes());
        buffer[16..18].copy_from_slice(&(name.len() as u16).to_le_bytes());
        buffer[Self::NAME_OFFSET..Self::NAME_OFFSET + name.len()].copy_from_slice(name);
        Ok(())
    }

    /// Deserialize from a header page frame
    pub(crate) fn read_from(buffer: &[u8]) -> RecordResult<Self> {
        if buffer.len() != PAGE_SIZE {
            return Err(RecordError::Deserialization(format!(
                "Invalid page size: {} bytes",
                buffer.len()
            )));
        }

        let name_len = u16::from_le_bytes([buffer[16], buffer[17]]) as usize;
        if name_len > MAX_FILE_NAME {
            return Err(RecordError::Deserialization(format!(
                "File name length {name_len} out of range"
            )));
        }
        let file_name =
            String::from_utf8(buffer[Self::NAME_OFFSET..Self::NAME_OFFSET + name_len].to_vec())
                .map_err(|e| RecordError::Deserialization(format!("File name not UTF-8: {e}")))?;

        Ok(Self {
            file_name,
            first_page: decode_page(u32::from_le_bytes([
                buffer[0], buffer[1], buffer[2], buffer[3],
            ])),
            last_page: decode_page(u32::from_le_bytes([
                buffer[4], buffer[5], buffer[6], buffer[7],
            ])),
            page_cnt: u32::from_le_bytes([buffer[8], buffer[9], buffer[10], buffer[11]]),
            rec_cnt: u32::from_le_bytes([buffer[12], buffer[13], buffer[14], buffer[15]]),
        })
    }
}

/// A file of unordered variable-length records, organized as a header page
/// followed by a singly-linked chain of data pages.
///
/// An open heap file keeps its header page pinned for its whole lifetime and
/// at most one data page pinned as the "current page" cursor. Every method
/// threads the buffer manager explicitly; the pool must outlive the file.
pub struct HeapFile {
    pub(crate) file: FileHandle,
    pub(crate) header_page_id: PageId,
    pub(crate) header: FileHeader,
    pub(crate) hdr_dirty: bool,
    pub(crate) cur_page: Option<PageId>,
    pub(crate) cur_dirty: bool,
    pub(crate) cur_rec: Option<RecordId>,
}

impl HeapFile {
    /// Create a new heap file with a header page and one empty data page
    pub fn create(buffer_mgr: &mut BufferManager, name: &str) -> RecordResult<()> {
        if name.len() > MAX_FILE_NAME {
            return Err(RecordError::InvalidFileName(name.to_string()));
        }

        buffer_mgr.file_manager_mut().create_file(name)?;
        let file = buffer_mgr.file_manager_mut().open_file(name)?;

        let (header_page_id, _) = buffer_mgr.alloc_page(file)?;
        let (first_page_id, frame) = buffer_mgr.alloc_page(file)?;
        DataPage::init(frame, first_page_id)?;

        let header = FileHeader {
            file_name: name.to_string(),
            first_page: Some(first_page_id),
            last_page: Some(first_page_id),
            page_cnt: 1,
            rec_cnt: 0,
        };
        header.write_to(buffer_mgr.pinned_page(file, header_page_id)?)?;

        buffer_mgr.unpin_page(file, header_page_id, true)?;
        buffer_mgr.unpin_page(file, first_page_id, true)?;
        // A reopen gets a fresh handle, so settle both pages before closing
        buffer_mgr.flush_file(file)?;
        buffer_mgr.file_manager_mut().close_file(file)?;
        Ok(())
    }

    /// Remove a heap file from disk
    pub fn destroy(buffer_mgr: &mut BufferManager, name: &str) -> RecordResult<()> {
        buffer_mgr.file_manager_mut().remove_file(name)?;
        Ok(())
    }

    /// Open an existing heap file, pinning its header page and first data page
    pub fn open(buffer_mgr: &mut BufferManager, name: &str) -> RecordResult<Self> {
        let file = buffer_mgr.file_manager_mut().open_file(name)?;
        let header_page_id = buffer_mgr.file_manager().first_page(file)?;

        let header = FileHeader::read_from(buffer_mgr.read_page(file, header_page_id)?)?;

        let cur_page = header.first_page;
        if let Some(page_id) = cur_page {
            buffer_mgr.read_page(file, page_id)?;
        }

        Ok(Self {
            file,
            header_page_id,
            header,
            hdr_dirty: false,
            cur_page,
            cur_dirty: false,
            cur_rec: None,
        })
    }

    /// Close the heap file: release both pins, write the file's dirty pages
    /// back, and close the underlying file. Errors are logged, not
    /// propagated.
    pub fn close(mut self, buffer_mgr: &mut BufferManager) {
        let name = self.header.file_name.clone();

        if let Some(page_id) = self.cur_page.take() {
            if let Err(e) = buffer_mgr.unpin_page(self.file, page_id, self.cur_dirty) {
                error!("heap file {name}: unpin of data page {page_id} failed on close: {e}");
            }
        }
        if let Err(e) = buffer_mgr.unpin_page(self.file, self.header_page_id, self.hdr_dirty) {
            error!("heap file {name}: unpin of header page failed on close: {e}");
        }
        // Pages of a closed file could not be written back later, so settle
        // them now. A still-pinned page means the caller leaked a pin; leave
        // the file open in that case.
        if let Err(e) = buffer_mgr.flush_file(self.file) {
            error!("heap file {name}: flush on close failed: {e}");
            return;
        }
        if let Err(e) = buffer_mgr.file_manager_mut().close_file(self.file) {
            error!("heap file {name}: close failed: {e}");
        }
    }

    /// Number of records in the file
    pub fn rec_cnt(&self) -> u32 {
        self.header.rec_cnt
    }

    /// Name recorded in the file header
    pub fn name(&self) -> &str {
        &self.header.file_name
    }

    /// Fetch a record by RID, moving the current-page cursor to its page.
    /// A failed page switch leaves the cursor invalidated.
    pub fn get_record(
        &mut self,
        buffer_mgr: &mut BufferManager,
        rid: RecordId,
    ) -> RecordResult<Vec<u8>> {
        if self.cur_page != Some(rid.page_id) {
            if let Some(old_page) = self.cur_page.take() {
                let dirty = std::mem::replace(&mut self.cur_dirty, false);
                buffer_mgr.unpin_page(self.file, old_page, dirty)?;
            }
            buffer_mgr.read_page(self.file, rid.page_id)?;
            self.cur_page = Some(rid.page_id);
            self.cur_dirty = false;
        }
        self.cur_rec = Some(rid);

        let frame = buffer_mgr.pinned_page(self.file, rid.page_id)?;
        let page = DataPage::from_buffer(frame)?;
        Ok(page.record(rid)?.to_vec())
    }

    /// Serialize the in-memory header into its pinned frame
    pub(crate) fn write_header(&mut self, buffer_mgr: &mut BufferManager) -> RecordResult<()> {
        let frame = buffer_mgr.pinned_page(self.file, self.header_page_id)?;
        self.header.write_to(frame)?;
        self.hdr_dirty = true;
        Ok(())
    }
}
