use std::path::Path;

use log::info;

use crate::cursor::{Cursor, Rows};
use crate::error::{DbError, DbResult};
use crate::pager::Pager;
use crate::row::Row;
use crate::{PAGE_SIZE, PageId, ROW_SIZE, ROWS_PER_PAGE, TABLE_MAX_ROWS};

/// A dense, append-only sequence of rows stored in one file.
pub struct Table {
    pub(crate) pager: Pager,
    pub(crate) num_rows: u64,
}

impl Table {
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let pager = Pager::open(path)?;
        let num_rows = rows_in_file(pager.file_length());
        info!("table has {num_rows} rows");
        Ok(Self { pager, num_rows })
    }

    pub fn close(self) -> DbResult<()> {
        self.pager.close()
    }

    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    pub fn is_full(&self) -> bool {
        self.num_rows >= TABLE_MAX_ROWS as u64
    }

    pub fn last_row_id(&self) -> Option<u64> {
        self.num_rows.checked_sub(1)
    }

    pub fn append_row(&mut self, row: &Row) -> DbResult<()> {
        if self.is_full() {
            return Err(DbError::TableFull);
        }
        self.end_next_cursor()?.insert(row)?;
        self.num_rows += 1;
        Ok(())
    }

    pub fn start_cursor(&mut self) -> DbResult<Cursor<'_>> {
        Cursor::start(self)
    }

    pub fn end_next_cursor(&mut self) -> DbResult<Cursor<'_>> {
        Cursor::end_next(self)
    }

    /// Full scan in row-number order. Each call starts from row 0.
    pub fn scan(&mut self) -> DbResult<Rows<'_>> {
        Ok(Rows::new(self.start_cursor()?))
    }

    pub fn select_rows(&mut self) -> DbResult<Vec<Row>> {
        self.scan()?.collect()
    }
}

pub fn page_of(row_num: u64) -> PageId {
    row_num / ROWS_PER_PAGE as u64
}

pub fn slot_of(row_num: u64) -> usize {
    (row_num % ROWS_PER_PAGE as u64) as usize
}

/// Whole pages hold `ROWS_PER_PAGE` rows each, the trailing partial page holds
/// whatever whole rows fit in its length.
fn rows_in_file(file_length: u64) -> u64 {
    let full_pages = file_length / PAGE_SIZE as u64;
    let tail = file_length % PAGE_SIZE as u64;
    full_pages * ROWS_PER_PAGE as u64 + tail / ROW_SIZE as u64
}
