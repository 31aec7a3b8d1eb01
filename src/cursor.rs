//! Forward cursor over a table's rows. Crosses page boundaries by asking the
//! pager for the next page; callers only ever see row numbers.

use log::trace;

use crate::error::{DbError, DbResult};
use crate::page::PageCursor;
use crate::row::Row;
use crate::table::{Table, page_of, slot_of};

pub struct Cursor<'t> {
    table: &'t mut Table,
    row_num: u64,
    page_cursor: PageCursor,
    // Set once the cursor points one past the last row.
    is_end: bool,
}

impl<'t> Cursor<'t> {
    pub(crate) fn start(table: &'t mut Table) -> DbResult<Self> {
        let page_cursor = table.pager.get_page(0)?.start_cursor();
        let is_end = table.is_empty();
        Ok(Self {
            table,
            row_num: 0,
            page_cursor,
            is_end,
        })
    }

    pub(crate) fn end_next(table: &'t mut Table) -> DbResult<Self> {
        let row_num = table.num_rows;
        let page_cursor = table.pager.get_page(page_of(row_num))?.end_next_cursor();
        debug_assert_eq!(page_cursor.slot(), slot_of(row_num));
        Ok(Self {
            table,
            row_num,
            page_cursor,
            is_end: true,
        })
    }

    pub fn row_num(&self) -> u64 {
        self.row_num
    }

    pub fn is_end(&self) -> bool {
        self.is_end
    }

    pub fn advance(&mut self) -> DbResult<()> {
        if self.table.is_empty() {
            return Err(DbError::EmptyTable);
        }
        if self.is_end {
            return Ok(());
        }

        trace!("cursor advance: row {} of {}", self.row_num, self.table.num_rows);
        self.row_num += 1;
        if self.row_num == self.table.num_rows {
            self.is_end = true;
            return Ok(());
        }

        let page = self.table.pager.get_page(self.page_cursor.page_id())?;
        self.page_cursor.advance(page)?;
        if self.page_cursor.is_end() {
            let next = self.table.pager.get_page(self.page_cursor.page_id() + 1)?;
            self.page_cursor = next.start_cursor();
        }
        debug_assert_eq!(self.page_cursor.page_id(), page_of(self.row_num));
        debug_assert_eq!(self.page_cursor.slot(), slot_of(self.row_num));
        Ok(())
    }

    pub fn row(&mut self) -> DbResult<Row> {
        if self.row_num >= self.table.num_rows {
            return Err(DbError::CursorAtEnd);
        }
        self.table
            .pager
            .get_page(self.page_cursor.page_id())?
            .row(self.page_cursor.slot())
    }

    /// Writes `row` at the cursor position. Only the end-next cursor does this;
    /// the table bumps its row count afterwards.
    pub fn insert(&mut self, row: &Row) -> DbResult<()> {
        self.table
            .pager
            .get_page(self.page_cursor.page_id())?
            .insert(self.page_cursor.slot(), row)
    }
}

/// Rows of one full scan. Stops after the last row or the first error.
pub struct Rows<'t> {
    cursor: Cursor<'t>,
    done: bool,
}

impl<'t> Rows<'t> {
    pub(crate) fn new(cursor: Cursor<'t>) -> Self {
        Self {
            cursor,
            done: false,
        }
    }
}

impl Iterator for Rows<'_> {
    type Item = DbResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.cursor.is_end() {
            return None;
        }
        let item = self
            .cursor
            .row()
            .and_then(|row| self.cursor.advance().map(|()| row));
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}
