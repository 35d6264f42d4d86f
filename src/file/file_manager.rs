use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use super::error::{FileError, FileResult};
use super::{PAGE_SIZE, PageId};

/// Identifier for an open file, issued by the file manager.
/// Handle numbers are never reused, so a stale handle stays invalid
/// instead of silently aliasing a later open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(usize);

impl FileHandle {
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// An open file together with the canonical path it was opened under
struct OpenFile {
    file: std::fs::File,
    path: PathBuf,
}

/// Page-granular file store. A file is a flat array of `PAGE_SIZE` blocks
/// addressed by page number. All page I/O is positioned (`read_at` /
/// `write_at`), so no call ever depends on a shared file cursor.
pub struct PagedFileManager {
    /// Open files by handle; the canonical path stored with each entry is
    /// what lets a second open of the same file find the existing handle
    files: HashMap<FileHandle, OpenFile>,
    /// Source of fresh handle numbers
    next_id: usize,
    /// Cap on simultaneously open files
    max_open: usize,
}

impl PagedFileManager {
    pub fn new() -> Self {
        Self::with_max_files(128)
    }

    pub fn with_max_files(max_open: usize) -> Self {
        Self {
            files: HashMap::new(),
            next_id: 0,
            max_open,
        }
    }

    fn entry(&self, handle: FileHandle) -> FileResult<&OpenFile> {
        self.files
            .get(&handle)
            .ok_or(FileError::InvalidHandle(handle.0))
    }

    /// Create an empty file, failing if the path is already taken
    pub fn create_file<P: AsRef<Path>>(&mut self, path: P) -> FileResult<()> {
        let path = path.as_ref();
        // create_new makes the existence check and the creation one atomic
        // step
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => {
                    FileError::FileAlreadyExists(path.display().to_string())
                }
                _ => FileError::Io(e),
            })?;
        Ok(())
    }

    /// Open a file for paged access. Opening a path that is already open
    /// returns the handle issued the first time.
    pub fn open_file<P: AsRef<Path>>(&mut self, path: P) -> FileResult<FileHandle> {
        let path = path.as_ref();
        let canonical = path
            .canonicalize()
            .map_err(|_| FileError::FileNotFound(path.display().to_string()))?;

        if let Some(&handle) = self
            .files
            .iter()
            .find_map(|(handle, open)| (open.path == canonical).then_some(handle))
        {
            return Ok(handle);
        }
        if self.files.len() >= self.max_open {
            return Err(FileError::TooManyOpenFiles);
        }

        let file = OpenOptions::new().read(true).write(true).open(&canonical)?;
        let handle = FileHandle(self.next_id);
        self.next_id += 1;
        self.files.insert(
            handle,
            OpenFile {
                file,
                path: canonical,
            },
        );
        Ok(handle)
    }

    /// Close an open file, invalidating its handle
    pub fn close_file(&mut self, handle: FileHandle) -> FileResult<()> {
        self.files
            .remove(&handle)
            .map(|_| ())
            .ok_or(FileError::InvalidHandle(handle.0))
    }

    /// Delete a file from disk, dropping any handle still open on it
    pub fn remove_file<P: AsRef<Path>>(&mut self, path: P) -> FileResult<()> {
        if let Ok(canonical) = path.as_ref().canonicalize() {
            self.files.retain(|_, open| open.path != canonical);
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    /// Read one page into `buffer`. Pages past the end of the file, and any
    /// unwritten hole inside it, read as zeros.
    pub fn read_page(
        &self,
        handle: FileHandle,
        page_id: PageId,
        buffer: &mut [u8],
    ) -> FileResult<()> {
        check_page_buffer(buffer.len())?;
        let file = &self.entry(handle)?.file;

        let base = (page_id * PAGE_SIZE) as u64;
        let mut filled = 0;
        while filled < buffer.len() {
            match file.read_at(&mut buffer[filled..], base + filled as u64)? {
                0 => break,
                n => filled += n,
            }
        }
        buffer[filled..].fill(0);
        Ok(())
    }

    /// Write one page. A write past the current end grows the file, and the
    /// skipped-over range reads back as zeros.
    pub fn write_page(&self, handle: FileHandle, page_id: PageId, buffer: &[u8]) -> FileResult<()> {
        check_page_buffer(buffer.len())?;
        let file = &self.entry(handle)?.file;
        file.write_all_at(buffer, (page_id * PAGE_SIZE) as u64)?;
        Ok(())
    }

    /// Extend the file by one page and return its number.
    /// Fresh pages read back zeroed until written.
    pub fn allocate_page(&self, handle: FileHandle) -> FileResult<PageId> {
        let file = &self.entry(handle)?.file;
        let page_id = file.metadata()?.len().div_ceil(PAGE_SIZE as u64) as PageId;
        file.set_len(((page_id + 1) * PAGE_SIZE) as u64)?;
        Ok(page_id)
    }

    /// Dispose of a page by zeroing it on disk.
    /// Page numbers are never reused within a file's lifetime.
    pub fn dispose_page(&self, handle: FileHandle, page_id: PageId) -> FileResult<()> {
        if page_id >= self.page_count(handle)? {
            return Err(FileError::PageNotFound(page_id));
        }
        self.write_page(handle, page_id, &[0u8; PAGE_SIZE])
    }

    /// Number of the first page of a file
    pub fn first_page(&self, handle: FileHandle) -> FileResult<PageId> {
        self.entry(handle).map(|_| 0)
    }

    /// Number of pages in a file
    pub fn page_count(&self, handle: FileHandle) -> FileResult<usize> {
        let file = &self.entry(handle)?.file;
        Ok(file.metadata()?.len().div_ceil(PAGE_SIZE as u64) as usize)
    }

    /// Push a file's outstanding writes down to stable storage
    pub fn sync_file(&self, handle: FileHandle) -> FileResult<()> {
        self.entry(handle)?.file.sync_data()?;
        Ok(())
    }

    /// Check if a handle is still valid
    pub fn is_file_open(&self, handle: FileHandle) -> bool {
        self.files.contains_key(&handle)
    }

    /// Number of currently open files
    pub fn open_file_count(&self) -> usize {
        self.files.len()
    }
}

fn check_page_buffer(len: usize) -> FileResult<()> {
    if len != PAGE_SIZE {
        return Err(FileError::InvalidPageSize {
            expected: PAGE_SIZE,
            actual: len,
        });
    }
    Ok(())
}

impl Default for PagedFileManager {
    fn default() -> Self {
        Self::new()
    }
}
