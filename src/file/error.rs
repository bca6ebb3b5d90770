use std::io;
use thiserror::Error;

use super::PageNumber;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File already exists: {0}")]
    FileAlreadyExists(String),

    #[error("Page out of range: page {page}, file has {total} pages")]
    PageOutOfRange { page: PageNumber, total: usize },

    #[error("Buffer pool must have at least one frame")]
    InvalidPoolSize,

    #[error("All frames are pinned, cannot place page {0}")]
    PoolExhausted(PageNumber),

    #[error("Page {0} is not resident in the buffer pool")]
    PageNotResident(PageNumber),

    #[error("Cannot shut down: page {0} is still pinned")]
    PinnedAtShutdown(PageNumber),
}

pub type FileResult<T> = Result<T, FileError>;
