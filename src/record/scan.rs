use std::cmp::Ordering;
use std::mem;

use super::RecordId;
use super::error::{RecordError, RecordResult};
use super::heap_file::HeapFile;
use super::page::DataPage;
use crate::file::{BufferManager, PageId};

/// Attribute types a scan filter can compare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    String,
    Integer,
    Float,
}

/// Comparison operators for scan predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Lte,
    Eq,
    Gte,
    Gt,
    Ne,
}

/// Validated predicate over a fixed byte range of each record
#[derive(Debug, Clone)]
struct ScanFilter {
    offset: usize,
    length: usize,
    datatype: Datatype,
    op: Operator,
    value: Vec<u8>,
}

fn int_value(bytes: &[u8]) -> Option<i32> {
    bytes.try_into().ok().map(i32::from_ne_bytes)
}

fn float_value(bytes: &[u8]) -> Option<f32> {
    bytes.try_into().ok().map(f32::from_ne_bytes)
}

impl ScanFilter {
    fn matches(&self, rec: &[u8]) -> bool {
        // The attribute must lie entirely inside the record
        if self.offset + self.length > rec.len() {
            return false;
        }
        let attr = &rec[self.offset..self.offset + self.length];

        let ord = match self.datatype {
            Datatype::Integer => {
                let (Some(a), Some(b)) = (int_value(attr), int_value(&self.value)) else {
                    return false;
                };
                a.cmp(&b)
            }
            Datatype::Float => {
                let (Some(a), Some(b)) = (float_value(attr), float_value(&self.value)) else {
                    return false;
                };
                match a.partial_cmp(&b) {
                    Some(ord) => ord,
                    // NaN compares unequal to everything
                    None => return self.op == Operator::Ne,
                }
            }
            // Exactly `length` bytes, unpadded
            Datatype::String => attr.cmp(&self.value[..]),
        };

        match self.op {
            Operator::Lt => ord == Ordering::Less,
            Operator::Lte => ord != Ordering::Greater,
            Operator::Eq => ord == Ordering::Equal,
            Operator::Gte => ord != Ordering::Less,
            Operator::Gt => ord == Ordering::Greater,
            Operator::Ne => ord != Ordering::Equal,
        }
    }
}

/// Sequential scan over a heap file with an optional pushdown predicate.
///
/// The page holding the most recent match stays pinned between calls so the
/// caller can fetch, delete, or dirty the record before advancing.
pub struct HeapFileScan {
    file: HeapFile,
    filter: Option<ScanFilter>,
    marked_page: Option<PageId>,
    marked_rec: Option<RecordId>,
}

impl HeapFileScan {
    /// Open a heap file for scanning
    pub fn open(buffer_mgr: &mut BufferManager, name: &str) -> RecordResult<Self> {
        Ok(Self {
            file: HeapFile::open(buffer_mgr, name)?,
            filter: None,
            marked_page: None,
            marked_rec: None,
        })
    }

    /// Configure the scan predicate. A `None` filter matches every record.
    pub fn start_scan(
        &mut self,
        offset: usize,
        length: usize,
        datatype: Datatype,
        filter: Option<&[u8]>,
        op: Operator,
    ) -> RecordResult<()> {
        let Some(value) = filter else {
            self.filter = None;
            return Ok(());
        };

        if length < 1 {
            return Err(RecordError::BadScanParameter(
                "filter length must be at least 1".to_string(),
            ));
        }
        if datatype == Datatype::Integer && length != mem::size_of::<i32>() {
            return Err(RecordError::BadScanParameter(format!(
                "integer filter must be {} bytes, got {length}",
                mem::size_of::<i32>()
            )));
        }
        if datatype == Datatype::Float && length != mem::size_of::<f32>() {
            return Err(RecordError::BadScanParameter(format!(
                "float filter must be {} bytes, got {length}",
                mem::size_of::<f32>()
            )));
        }
        if value.len() != length {
            return Err(RecordError::BadScanParameter(format!(
                "filter value is {} bytes but length is {length}",
                value.len()
            )));
        }

        self.filter = Some(ScanFilter {
            offset,
            length,
            datatype,
            op,
            value: value.to_vec(),
        });
        Ok(())
    }

    /// Advance to the next matching record and return its RID.
    /// Returns `EndOfFile` past the last record; the page of a match stays
    /// pinned as the current page.
    pub fn scan_next(&mut self, buffer_mgr: &mut BufferManager) -> RecordResult<RecordId> {
        let mut page_id = match self.file.cur_page {
            Some(page_id) => page_id,
            None => {
                let Some(first) = self.file.header.first_page else {
                    return Err(RecordError::EndOfFile);
                };
                buffer_mgr.read_page(self.file.file, first)?;
                self.file.cur_page = Some(first);
                self.file.cur_dirty = false;
                self.file.cur_rec = None;
                first
            }
        };

        loop {
            let (matched, next_page) = {
                let frame = buffer_mgr.pinned_page(self.file.file, page_id)?;
                let page = DataPage::from_buffer(frame)?;

                let mut candidate = match self.file.cur_rec {
                    Some(rid) if rid.page_id == page_id => page.next_record(rid),
                    _ => page.first_record(),
                };
                let mut matched = None;
                loop {
                    match candidate {
                        Ok(rid) => {
                            if self.matches(page.record(rid)?) {
                                matched = Some(rid);
                                break;
                            }
                            candidate = page.next_record(rid);
                        }
                        Err(RecordError::NoMoreRecords) => break,
                        Err(e) => return Err(e),
                    }
                }
                (matched, page.next_page())
            };

            if let Some(rid) = matched {
                self.file.cur_rec = Some(rid);
                return Ok(rid);
            }

            let Some(next) = next_page else {
                return Err(RecordError::EndOfFile);
            };

            // Hand the exhausted page back before pinning its successor
            let dirty = mem::replace(&mut self.file.cur_dirty, false);
            self.file.cur_page = None;
            buffer_mgr.unpin_page(self.file.file, page_id, dirty)?;
            buffer_mgr.read_page(self.file.file, next)?;
            self.file.cur_page = Some(next);
            self.file.cur_rec = None;
            page_id = next;
        }
    }

    fn matches(&self, rec: &[u8]) -> bool {
        match &self.filter {
            Some(filter) => filter.matches(rec),
            None => true,
        }
    }

    /// Snapshot the scan position for a later `reset_scan`
    pub fn mark_scan(&mut self) {
        self.marked_page = self.file.cur_page;
        self.marked_rec = self.file.cur_rec;
    }

    /// Rewind the scan to the last `mark_scan` snapshot.
    /// Only re-pins when the marked page differs from the current one.
    pub fn reset_scan(&mut self, buffer_mgr: &mut BufferManager) -> RecordResult<()> {
        if self.marked_page != self.file.cur_page {
            if let Some(cur) = self.file.cur_page.take() {
                let dirty = mem::replace(&mut self.file.cur_dirty, false);
                buffer_mgr.unpin_page(self.file.file, cur, dirty)?;
            }
            if let Some(marked) = self.marked_page {
                buffer_mgr.read_page(self.file.file, marked)?;
            }
            self.file.cur_page = self.marked_page;
            self.file.cur_dirty = false;
        }
        self.file.cur_rec = self.marked_rec;
        Ok(())
    }

    /// Release the current page pin. Idempotent.
    pub fn end_scan(&mut self, buffer_mgr: &mut BufferManager) -> RecordResult<()> {
        if let Some(cur) = self.file.cur_page.take() {
            let dirty = mem::replace(&mut self.file.cur_dirty, false);
            self.file.cur_rec = None;
            buffer_mgr.unpin_page(self.file.file, cur, dirty)?;
        }
        Ok(())
    }

    /// Fetch the record the scan is positioned on
    pub fn get_record(&self, buffer_mgr: &mut BufferManager) -> RecordResult<Vec<u8>> {
        let rid = self.file.cur_rec.ok_or(RecordError::NoCurrentRecord)?;
        let frame = buffer_mgr.pinned_page(self.file.file, rid.page_id)?;
        let page = DataPage::from_buffer(frame)?;
        Ok(page.record(rid)?.to_vec())
    }

    /// Delete the record the scan is positioned on
    pub fn delete_record(&mut self, buffer_mgr: &mut BufferManager) -> RecordResult<()> {
        let rid = self.file.cur_rec.ok_or(RecordError::NoCurrentRecord)?;
        {
            let frame = buffer_mgr.pinned_page(self.file.file, rid.page_id)?;
            let mut page = DataPage::from_buffer(frame)?;
            page.delete_record(rid)?;
        }
        self.file.cur_dirty = true;
        self.file.header.rec_cnt = self.file.header.rec_cnt.saturating_sub(1);
        self.file.write_header(buffer_mgr)?;
        Ok(())
    }

    /// Mark the current page as modified
    pub fn mark_dirty(&mut self) {
        self.file.cur_dirty = true;
    }

    /// Number of records in the underlying file
    pub fn rec_cnt(&self) -> u32 {
        self.file.rec_cnt()
    }

    /// Close the scan and its heap file
    pub fn close(self, buffer_mgr: &mut BufferManager) {
        self.file.close(buffer_mgr);
    }
}

/// Record insertion over a heap file, filling the tail of the page chain
/// and growing it one page at a time.
pub struct InsertFileScan {
    file: HeapFile,
}

impl InsertFileScan {
    /// Open a heap file for insertion
    pub fn open(buffer_mgr: &mut BufferManager, name: &str) -> RecordResult<Self> {
        Ok(Self {
            file: HeapFile::open(buffer_mgr, name)?,
        })
    }

    /// Insert a record, returning its RID.
    /// Tries the current page first (else the chain tail), and extends the
    /// chain with a fresh page when the candidate is full.
    pub fn insert_record(
        &mut self,
        buffer_mgr: &mut BufferManager,
        rec: &[u8],
    ) -> RecordResult<RecordId> {
        if rec.len() > DataPage::MAX_RECORD_LEN {
            return Err(RecordError::InvalidRecordLength {
                len: rec.len(),
                max: DataPage::MAX_RECORD_LEN,
            });
        }

        let page_id = match self.file.cur_page {
            Some(page_id) => page_id,
            None => match self.file.header.last_page {
                Some(last) => {
                    buffer_mgr.read_page(self.file.file, last)?;
                    self.file.cur_page = Some(last);
                    self.file.cur_dirty = false;
                    last
                }
                None => self.extend_chain(buffer_mgr)?,
            },
        };

        let attempt = {
            let frame = buffer_mgr.pinned_page(self.file.file, page_id)?;
            DataPage::from_buffer(frame)?.insert_record(rec)
        };
        let rid = match attempt {
            Ok(rid) => rid,
            Err(RecordError::PageFull(_)) => {
                let new_page = self.extend_chain(buffer_mgr)?;
                let frame = buffer_mgr.pinned_page(self.file.file, new_page)?;
                // Cannot run out of space again: the record fits an empty page
                DataPage::from_buffer(frame)?.insert_record(rec)?
            }
            Err(e) => return Err(e),
        };

        self.file.cur_dirty = true;
        self.file.cur_rec = Some(rid);
        self.file.header.rec_cnt += 1;
        self.file.write_header(buffer_mgr)?;
        Ok(rid)
    }

    /// Grow the file by one data page, link it at the chain tail, and make
    /// it the pinned current page.
    fn extend_chain(&mut self, buffer_mgr: &mut BufferManager) -> RecordResult<PageId> {
        let handle = self.file.file;
        let (new_page, frame) = buffer_mgr.alloc_page(handle)?;
        DataPage::init(frame, new_page)?;

        match self.file.header.last_page {
            Some(old_last) if self.file.cur_page == Some(old_last) => {
                // The tail is the pinned current page; link in place, then
                // release it
                let frame = buffer_mgr.pinned_page(handle, old_last)?;
                DataPage::from_buffer(frame)?.set_next_page(Some(new_page));
                self.file.cur_page = None;
                self.file.cur_dirty = false;
                buffer_mgr.unpin_page(handle, old_last, true)?;
            }
            Some(old_last) => {
                buffer_mgr.read_page(handle, old_last)?;
                let frame = buffer_mgr.pinned_page(handle, old_last)?;
                DataPage::from_buffer(frame)?.set_next_page(Some(new_page));
                buffer_mgr.unpin_page(handle, old_last, true)?;
                if let Some(cur) = self.file.cur_page.take() {
                    let dirty = mem::replace(&mut self.file.cur_dirty, false);
                    buffer_mgr.unpin_page(handle, cur, dirty)?;
                }
            }
            None => {
                // Empty chain: the new page is also the first page
                self.file.header.first_page = Some(new_page);
                if let Some(cur) = self.file.cur_page.take() {
                    let dirty = mem::replace(&mut self.file.cur_dirty, false);
                    buffer_mgr.unpin_page(handle, cur, dirty)?;
                }
            }
        }

        self.file.header.last_page = Some(new_page);
        self.file.header.page_cnt += 1;
        self.file.cur_page = Some(new_page);
        self.file.cur_dirty = true;
        self.file.cur_rec = None;
        self.file.write_header(buffer_mgr)?;
        Ok(new_page)
    }

    /// Number of records in the underlying file
    pub fn rec_cnt(&self) -> u32 {
        self.file.rec_cnt()
    }

    /// Close the scan and its heap file
    pub fn close(self, buffer_mgr: &mut BufferManager) {
        self.file.close(buffer_mgr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::PagedFileManager;
    use tempfile::TempDir;

    fn setup_pool(capacity: usize) -> (TempDir, BufferManager) {
        let _ = env_logger::builder().is_test(true).try_init();
        let temp_dir = tempfile::tempdir().unwrap();
        let file_manager = PagedFileManager::new();
        (temp_dir, BufferManager::with_capacity(file_manager, capacity))
    }

    fn heap_path(temp_dir: &TempDir) -> String {
        temp_dir.path().join("t.hf").to_str().unwrap().to_string()
    }

    /// A record of `len` bytes carrying an i32 key at offset 0
    fn keyed_record(key: i32, len: usize) -> Vec<u8> {
        let mut rec = vec![0u8; len];
        rec[..4].copy_from_slice(&key.to_ne_bytes());
        rec
    }

    fn insert_keys(bm: &mut BufferManager, name: &str, keys: &[i32], rec_len: usize) {
        let mut scan = InsertFileScan::open(bm, name).unwrap();
        for &key in keys {
            scan.insert_record(bm, &keyed_record(key, rec_len)).unwrap();
        }
        scan.close(bm);
    }

    fn collect_keys(scan: &mut HeapFileScan, bm: &mut BufferManager) -> Vec<i32> {
        let mut keys = Vec::new();
        loop {
            match scan.scan_next(bm) {
                Ok(_) => {
                    let rec = scan.get_record(bm).unwrap();
                    keys.push(int_value(&rec[..4]).unwrap());
                }
                Err(RecordError::EndOfFile) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        keys
    }

    #[test]
    fn test_scan_empty_file() {
        let (temp_dir, mut bm) = setup_pool(8);
        let name = heap_path(&temp_dir);

        HeapFile::create(&mut bm, &name).unwrap();
        let mut scan = HeapFileScan::open(&mut bm, &name).unwrap();
        assert_eq!(scan.rec_cnt(), 0);

        let result = scan.scan_next(&mut bm);
        assert!(matches!(result, Err(RecordError::EndOfFile)));

        scan.close(&mut bm);
        assert_eq!(bm.pinned_frame_count(), 0);
    }

    #[test]
    fn test_insert_then_filtered_scan() {
        let (temp_dir, mut bm) = setup_pool(8);
        let name = heap_path(&temp_dir);

        HeapFile::create(&mut bm, &name).unwrap();
        insert_keys(&mut bm, &name, &[7, 4, 9], 50);

        let mut scan = HeapFileScan::open(&mut bm, &name).unwrap();
        assert_eq!(scan.rec_cnt(), 3);
        scan.start_scan(0, 4, Datatype::Integer, Some(&5i32.to_ne_bytes()), Operator::Gt)
            .unwrap();

        assert_eq!(collect_keys(&mut scan, &mut bm), vec![7, 9]);
        scan.close(&mut bm);
        assert_eq!(bm.pinned_frame_count(), 0);
    }

    #[test]
    fn test_unfiltered_scan_returns_everything() {
        let (temp_dir, mut bm) = setup_pool(8);
        let name = heap_path(&temp_dir);

        HeapFile::create(&mut bm, &name).unwrap();
        insert_keys(&mut bm, &name, &[1, 2, 3, 4], 20);

        let mut scan = HeapFileScan::open(&mut bm, &name).unwrap();
        scan.start_scan(0, 4, Datatype::Integer, None, Operator::Eq)
            .unwrap();
        assert_eq!(collect_keys(&mut scan, &mut bm), vec![1, 2, 3, 4]);
        scan.close(&mut bm);
    }

    #[test]
    fn test_operator_matrix() {
        let (temp_dir, mut bm) = setup_pool(8);
        let name = heap_path(&temp_dir);

        HeapFile::create(&mut bm, &name).unwrap();
        let keys: Vec<i32> = (0..20).collect();
        insert_keys(&mut bm, &name, &keys, 16);

        let cases: &[(Operator, fn(i32) -> bool)] = &[
            (Operator::Lt, |k| k < 10),
            (Operator::Lte, |k| k <= 10),
            (Operator::Eq, |k| k == 10),
            (Operator::Gte, |k| k >= 10),
            (Operator::Gt, |k| k > 10),
            (Operator::Ne, |k| k != 10),
        ];

        let mut scan = HeapFileScan::open(&mut bm, &name).unwrap();
        for &(op, predicate) in cases {
            scan.start_scan(0, 4, Datatype::Integer, Some(&10i32.to_ne_bytes()), op)
                .unwrap();
            let expected: Vec<i32> = keys.iter().copied().filter(|&k| predicate(k)).collect();
            assert_eq!(collect_keys(&mut scan, &mut bm), expected, "{op:?}");
            scan.end_scan(&mut bm).unwrap();
        }
        scan.close(&mut bm);
        assert_eq!(bm.pinned_frame_count(), 0);
    }

    #[test]
    fn test_cross_page_scan() {
        let (temp_dir, mut bm) = setup_pool(8);
        let name = heap_path(&temp_dir);

        HeapFile::create(&mut bm, &name).unwrap();
        // 1020-byte records, 7 per page: 20 of them span 3 data pages
        let keys: Vec<i32> = (0..20).collect();
        insert_keys(&mut bm, &name, &keys, 1020);

        let mut scan = HeapFileScan::open(&mut bm, &name).unwrap();
        assert_eq!(scan.file.header.page_cnt, 3);
        assert_eq!(scan.file.header.last_page, Some(3));

        // Key 10 lives on the middle page
        scan.start_scan(0, 4, Datatype::Integer, Some(&10i32.to_ne_bytes()), Operator::Eq)
            .unwrap();
        let rid = scan.scan_next(&mut bm).unwrap();
        assert_eq!(rid.page_id, 2);
        assert_eq!(scan.get_record(&mut bm).unwrap()[..4], 10i32.to_ne_bytes());

        // Exactly the header page and the current page are pinned mid-scan
        assert_eq!(bm.pinned_frame_count(), 2);

        assert!(matches!(
            scan.scan_next(&mut bm),
            Err(RecordError::EndOfFile)
        ));
        scan.close(&mut bm);
        assert_eq!(bm.pinned_frame_count(), 0);
    }

    #[test]
    fn test_cross_page_scan_with_small_pool() {
        let (temp_dir, mut bm) = setup_pool(3);
        let name = heap_path(&temp_dir);

        HeapFile::create(&mut bm, &name).unwrap();
        let keys: Vec<i32> = (0..20).collect();
        insert_keys(&mut bm, &name, &keys, 1020);

        // Pool of 3 frames: header + current page + one spare. The scan
        // result must not depend on the pool size.
        let mut scan = HeapFileScan::open(&mut bm, &name).unwrap();
        scan.start_scan(0, 4, Datatype::Integer, None, Operator::Eq)
            .unwrap();
        assert_eq!(collect_keys(&mut scan, &mut bm), keys);
        scan.close(&mut bm);
        assert_eq!(bm.pinned_frame_count(), 0);
    }

    #[test]
    fn test_delete_then_rescan() {
        let (temp_dir, mut bm) = setup_pool(8);
        let name = heap_path(&temp_dir);

        HeapFile::create(&mut bm, &name).unwrap();
        insert_keys(&mut bm, &name, &[1, 2, 3, 4, 5], 20);

        let mut scan = HeapFileScan::open(&mut bm, &name).unwrap();
        scan.start_scan(0, 4, Datatype::Integer, Some(&3i32.to_ne_bytes()), Operator::Eq)
            .unwrap();
        scan.scan_next(&mut bm).unwrap();
        scan.delete_record(&mut bm).unwrap();
        assert_eq!(scan.rec_cnt(), 4);
        scan.end_scan(&mut bm).unwrap();

        // The deleted key is gone; everything else survives
        scan.start_scan(0, 4, Datatype::Integer, Some(&3i32.to_ne_bytes()), Operator::Eq)
            .unwrap();
        assert!(matches!(
            scan.scan_next(&mut bm),
            Err(RecordError::EndOfFile)
        ));
        scan.end_scan(&mut bm).unwrap();

        scan.start_scan(0, 4, Datatype::Integer, None, Operator::Eq)
            .unwrap();
        assert_eq!(collect_keys(&mut scan, &mut bm), vec![1, 2, 4, 5]);
        scan.close(&mut bm);
        assert_eq!(bm.pinned_frame_count(), 0);
    }

    #[test]
    fn test_mark_and_reset_same_page() {
        let (temp_dir, mut bm) = setup_pool(8);
        let name = heap_path(&temp_dir);

        HeapFile::create(&mut bm, &name).unwrap();
        insert_keys(&mut bm, &name, &(0..10).collect::<Vec<_>>(), 16);

        let mut scan = HeapFileScan::open(&mut bm, &name).unwrap();
        scan.start_scan(0, 4, Datatype::Integer, None, Operator::Eq)
            .unwrap();

        scan.scan_next(&mut bm).unwrap();
        scan.scan_next(&mut bm).unwrap();
        scan.mark_scan();
        let expected = scan.scan_next(&mut bm).unwrap();
        scan.scan_next(&mut bm).unwrap();

        scan.reset_scan(&mut bm).unwrap();
        assert_eq!(scan.scan_next(&mut bm).unwrap(), expected);
        scan.close(&mut bm);
    }

    #[test]
    fn test_mark_and_reset_across_pages() {
        let (temp_dir, mut bm) = setup_pool(8);
        let name = heap_path(&temp_dir);

        HeapFile::create(&mut bm, &name).unwrap();
        let keys: Vec<i32> = (0..20).collect();
        insert_keys(&mut bm, &name, &keys, 1020);

        let mut scan = HeapFileScan::open(&mut bm, &name).unwrap();
        scan.start_scan(0, 4, Datatype::Integer, None, Operator::Eq)
            .unwrap();

        // Position on the first page, then walk into the third
        scan.scan_next(&mut bm).unwrap();
        scan.mark_scan();
        let expected = scan.scan_next(&mut bm).unwrap();
        for _ in 0..12 {
            scan.scan_next(&mut bm).unwrap();
        }

        scan.reset_scan(&mut bm).unwrap();
        assert_eq!(scan.scan_next(&mut bm).unwrap(), expected);

        scan.close(&mut bm);
        assert_eq!(bm.pinned_frame_count(), 0);
    }

    #[test]
    fn test_string_filter_is_unpadded() {
        let (temp_dir, mut bm) = setup_pool(8);
        let name = heap_path(&temp_dir);

        HeapFile::create(&mut bm, &name).unwrap();
        {
            let mut insert = InsertFileScan::open(&mut bm, &name).unwrap();
            insert.insert_record(&mut bm, b"applesauce").unwrap();
            insert.insert_record(&mut bm, b"apple").unwrap();
            insert.insert_record(&mut bm, b"banana").unwrap();
            insert.close(&mut bm);
        }

        let mut scan = HeapFileScan::open(&mut bm, &name).unwrap();
        // Only the first five bytes take part in the comparison
        scan.start_scan(0, 5, Datatype::String, Some(b"apple"), Operator::Eq)
            .unwrap();
        let mut matches = Vec::new();
        while let Ok(_) = scan.scan_next(&mut bm) {
            matches.push(scan.get_record(&mut bm).unwrap());
        }
        assert_eq!(matches, vec![b"applesauce".to_vec(), b"apple".to_vec()]);
        scan.close(&mut bm);
    }

    #[test]
    fn test_float_filter() {
        let (temp_dir, mut bm) = setup_pool(8);
        let name = heap_path(&temp_dir);

        HeapFile::create(&mut bm, &name).unwrap();
        {
            let mut insert = InsertFileScan::open(&mut bm, &name).unwrap();
            for value in [1.5f32, 2.5, 3.5] {
                insert.insert_record(&mut bm, &value.to_ne_bytes()).unwrap();
            }
            insert.close(&mut bm);
        }

        let mut scan = HeapFileScan::open(&mut bm, &name).unwrap();
        scan.start_scan(0, 4, Datatype::Float, Some(&2.5f32.to_ne_bytes()), Operator::Lt)
            .unwrap();
        let rid = scan.scan_next(&mut bm).unwrap();
        let rec = scan.get_record(&mut bm).unwrap();
        assert_eq!(float_value(&rec).unwrap(), 1.5);
        assert_eq!(rid.slot_id, 0);
        assert!(matches!(
            scan.scan_next(&mut bm),
            Err(RecordError::EndOfFile)
        ));
        scan.close(&mut bm);
    }

    #[test]
    fn test_short_record_never_matches() {
        let (temp_dir, mut bm) = setup_pool(8);
        let name = heap_path(&temp_dir);

        HeapFile::create(&mut bm, &name).unwrap();
        {
            let mut insert = InsertFileScan::open(&mut bm, &name).unwrap();
            insert.insert_record(&mut bm, b"ab").unwrap();
            insert.close(&mut bm);
        }

        let mut scan = HeapFileScan::open(&mut bm, &name).unwrap();
        // The attribute window falls off the end of the two-byte record
        scan.start_scan(0, 4, Datatype::Integer, Some(&0i32.to_ne_bytes()), Operator::Ne)
            .unwrap();
        assert!(matches!(
            scan.scan_next(&mut bm),
            Err(RecordError::EndOfFile)
        ));
        scan.close(&mut bm);
    }

    #[test]
    fn test_bad_scan_parameters() {
        let (temp_dir, mut bm) = setup_pool(8);
        let name = heap_path(&temp_dir);

        HeapFile::create(&mut bm, &name).unwrap();
        let mut scan = HeapFileScan::open(&mut bm, &name).unwrap();

        let bad = [
            scan.start_scan(0, 0, Datatype::String, Some(b""), Operator::Eq),
            scan.start_scan(0, 3, Datatype::Integer, Some(b"abc"), Operator::Eq),
            scan.start_scan(0, 2, Datatype::Float, Some(b"ab"), Operator::Eq),
            scan.start_scan(0, 4, Datatype::String, Some(b"abcde"), Operator::Eq),
        ];
        for result in bad {
            assert!(matches!(result, Err(RecordError::BadScanParameter(_))));
        }
        scan.close(&mut bm);
    }

    #[test]
    fn test_insert_oversized_record() {
        let (temp_dir, mut bm) = setup_pool(8);
        let name = heap_path(&temp_dir);

        HeapFile::create(&mut bm, &name).unwrap();
        let mut insert = InsertFileScan::open(&mut bm, &name).unwrap();

        let rec = vec![0u8; DataPage::MAX_RECORD_LEN + 1];
        let result = insert.insert_record(&mut bm, &rec);
        assert!(matches!(
            result,
            Err(RecordError::InvalidRecordLength { .. })
        ));
        assert_eq!(insert.rec_cnt(), 0);
        insert.close(&mut bm);
    }

    #[test]
    fn test_get_record_by_rid_across_pages() {
        let (temp_dir, mut bm) = setup_pool(8);
        let name = heap_path(&temp_dir);

        HeapFile::create(&mut bm, &name).unwrap();
        let mut rids = Vec::new();
        {
            let mut insert = InsertFileScan::open(&mut bm, &name).unwrap();
            for key in 0..20 {
                rids.push(
                    insert
                        .insert_record(&mut bm, &keyed_record(key, 1020))
                        .unwrap(),
                );
            }
            insert.close(&mut bm);
        }

        let mut file = HeapFile::open(&mut bm, &name).unwrap();
        // Jump between pages in an arbitrary order
        for &i in &[15usize, 2, 19, 0, 8] {
            let rec = file.get_record(&mut bm, rids[i]).unwrap();
            assert_eq!(int_value(&rec[..4]).unwrap(), i as i32);
            assert_eq!(bm.pinned_frame_count(), 2);
        }
        file.close(&mut bm);
        assert_eq!(bm.pinned_frame_count(), 0);
    }

    #[test]
    fn test_reopened_file_keeps_records() {
        let (temp_dir, mut bm) = setup_pool(8);
        let name = heap_path(&temp_dir);

        HeapFile::create(&mut bm, &name).unwrap();
        insert_keys(&mut bm, &name, &[11, 22, 33], 20);

        // A fresh scan over the reopened file sees all three records
        let mut scan = HeapFileScan::open(&mut bm, &name).unwrap();
        assert_eq!(scan.rec_cnt(), 3);
        scan.start_scan(0, 4, Datatype::Integer, None, Operator::Eq)
            .unwrap();
        assert_eq!(collect_keys(&mut scan, &mut bm), vec![11, 22, 33]);
        scan.close(&mut bm);
    }
}
