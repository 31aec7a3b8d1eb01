//! Storage layer error types.

use thiserror::Error;

use crate::PageId;

/// Errors raised by the pager, pages, tables and cursors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Table full.")]
    TableFull,

    #[error("Db file is not a whole number of pages ({len} bytes). Corrupt file.")]
    CorruptFile { len: u64 },

    #[error("Tried to fetch page number out of bounds: {page_id} (max: {max})")]
    PageOutOfBounds { page_id: PageId, max: PageId },

    #[error("Short read at offset {offset}: expected {expected} bytes, read {actual}")]
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Short write at offset {offset}: expected {expected} bytes, wrote {actual}")]
    ShortWrite {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Cannot advance cursor on an empty table")]
    EmptyTable,

    #[error("Cannot advance page cursor on empty page {page_id}")]
    EmptyPage { page_id: PageId },

    #[error("Invalid slot {slot} for page {page_id} ({num_rows} rows, capacity {capacity})")]
    SlotOutOfRange {
        page_id: PageId,
        slot: usize,
        num_rows: usize,
        capacity: usize,
    },

    #[error("Cursor is past the last row")]
    CursorAtEnd,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DbError {
    /// I/O class errors end the session; everything else is reported and the
    /// caller may carry on.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DbError::Io(_)
                | DbError::ShortRead { .. }
                | DbError::ShortWrite { .. }
                | DbError::CorruptFile { .. }
        )
    }
}

pub type DbResult<T> = Result<T, DbError>;
