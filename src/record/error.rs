use crate::file::{FileError, PageNumber};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Slot is empty: page {page}, slot {slot}")]
    SlotEmpty { page: PageNumber, slot: usize },

    #[error("Slot out of range: page {page}, slot {slot}, page holds {max_slots}")]
    SlotOutOfRange {
        page: PageNumber,
        slot: usize,
        max_slots: usize,
    },

    #[error("Attribute index {0} out of range")]
    AttributeOutOfRange(usize),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("String of {len} bytes exceeds declared length {max}")]
    StringTooLong { len: usize, max: usize },

    #[error("Record of {0} bytes does not fit a data page")]
    RecordTooLarge(usize),

    #[error("Record buffer size mismatch: expected {expected}, got {actual}")]
    RecordSizeMismatch { expected: usize, actual: usize },

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Attribute name {0:?} is not a single whitespace-free token")]
    InvalidAttributeName(String),

    #[error("Table metadata of {needed} bytes exceeds the page size {limit}")]
    MetadataTooLarge { needed: usize, limit: usize },

    #[error("Corrupt table metadata: {0}")]
    CorruptMetadata(String),
}

pub type RecordResult<T> = Result<T, RecordError>;
