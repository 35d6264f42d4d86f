pub mod file;
pub mod record;

pub use file::{BUFFER_POOL_SIZE, BufferManager, FileHandle, PAGE_SIZE, PagedFileManager};
pub use record::{Datatype, HeapFile, HeapFileScan, InsertFileScan, Operator, RecordId};
