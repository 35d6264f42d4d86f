use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File already exists: {0}")]
    FileAlreadyExists(String),

    #[error("Invalid file handle: {0}")]
    InvalidHandle(usize),

    #[error("Page not found: page_id={0}")]
    PageNotFound(usize),

    #[error("Page not in buffer pool: page_id={0}")]
    PageNotCached(usize),

    #[error("Page already in buffer pool: page_id={0}")]
    PageAlreadyCached(usize),

    #[error("All buffer frames are pinned")]
    BufferExceeded,

    #[error("Page not pinned: page_id={0}")]
    PageNotPinned(usize),

    #[error("Page still pinned: page_id={0}")]
    PagePinned(usize),

    #[error("Invalid frame claims a file: frame_no={0}")]
    StaleFrame(usize),

    #[error("Invalid page size: expected {expected}, got {actual}")]
    InvalidPageSize { expected: usize, actual: usize },

    #[error("File handle limit reached")]
    TooManyOpenFiles,
}

pub type FileResult<T> = Result<T, FileError>;
