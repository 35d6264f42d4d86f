use crate::file::FileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Invalid slot: page_id={0}, slot_id={1}")]
    InvalidSlot(usize, usize),

    #[error("No more records in page")]
    NoMoreRecords,

    #[error("Page full: page_id={0}")]
    PageFull(usize),

    #[error("Record length {len} exceeds page capacity {max}")]
    InvalidRecordLength { len: usize, max: usize },

    #[error("Bad scan parameter: {0}")]
    BadScanParameter(String),

    #[error("Scan reached end of file")]
    EndOfFile,

    #[error("Scan has no current record")]
    NoCurrentRecord,

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

pub type RecordResult<T> = Result<T, RecordError>;
