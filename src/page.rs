use crate::error::{DbError, DbResult};
use crate::row::Row;
use crate::{PAGE_SIZE, PageId, ROW_SIZE, ROWS_PER_PAGE};

/// A cached page: rows are packed from offset 0, `num_rows` slots are in use.
pub struct Page {
    id: PageId,
    dirty: bool,
    num_rows: usize,
    data: Box<[u8; PAGE_SIZE]>,
}

impl Page {
    pub fn new(id: PageId) -> Self {
        Self {
            id,
            dirty: false,
            num_rows: 0,
            data: Box::new([0u8; PAGE_SIZE]),
        }
    }

    /// Builds a page from bytes read off disk. A short buffer (the last page of
    /// the file) holds fewer rows; the rest of the page stays zeroed.
    pub fn from_bytes(id: PageId, buf: &[u8]) -> Self {
        let len = buf.len().min(PAGE_SIZE);
        let mut page = Self::new(id);
        page.data[..len].copy_from_slice(&buf[..len]);
        page.num_rows = len / ROW_SIZE;
        page
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    pub fn last_slot(&self) -> Option<usize> {
        self.num_rows.checked_sub(1)
    }

    /// Bytes that hold rows; this is what gets written back on close.
    pub fn len_bytes(&self) -> usize {
        self.num_rows * ROW_SIZE
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len_bytes()]
    }

    pub fn insert(&mut self, slot: usize, row: &Row) -> DbResult<()> {
        // Slots past num_rows would leave a hole in the occupied prefix.
        if slot >= ROWS_PER_PAGE || slot > self.num_rows {
            return Err(self.slot_out_of_range(slot));
        }
        let offset = slot * ROW_SIZE;
        row.serialize(&mut self.data[offset..offset + ROW_SIZE]);
        if slot == self.num_rows {
            self.num_rows += 1;
        }
        self.dirty = true;
        Ok(())
    }

    pub fn row(&self, slot: usize) -> DbResult<Row> {
        if slot >= ROWS_PER_PAGE {
            return Err(self.slot_out_of_range(slot));
        }
        let offset = slot * ROW_SIZE;
        Ok(Row::deserialize(&self.data[offset..offset + ROW_SIZE]))
    }

    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        self.data
            .chunks_exact(ROW_SIZE)
            .take(self.num_rows)
            .map(Row::deserialize)
    }

    pub fn start_cursor(&self) -> PageCursor {
        PageCursor {
            page_id: self.id,
            slot: 0,
            is_end: self.is_empty(),
        }
    }

    pub fn end_next_cursor(&self) -> PageCursor {
        PageCursor {
            page_id: self.id,
            slot: self.num_rows,
            is_end: true,
        }
    }

    fn slot_out_of_range(&self, slot: usize) -> DbError {
        DbError::SlotOutOfRange {
            page_id: self.id,
            slot,
            num_rows: self.num_rows,
            capacity: ROWS_PER_PAGE,
        }
    }
}

/// Slot position inside one page. Holds no borrow; the page is passed back in
/// on `advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page_id: PageId,
    slot: usize,
    is_end: bool,
}

impl PageCursor {
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn is_end(&self) -> bool {
        self.is_end
    }

    pub fn advance(&mut self, page: &Page) -> DbResult<()> {
        debug_assert_eq!(page.id(), self.page_id);
        if page.is_empty() {
            return Err(DbError::EmptyPage { page_id: page.id() });
        }
        self.slot += 1;
        if self.slot >= page.num_rows() {
            self.is_end = true;
        }
        Ok(())
    }
}
