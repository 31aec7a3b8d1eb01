//! The Pager owns the database file and the cache of pages read from it.
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::file_io::{read_at, write_at};
use crate::page::Page;
use crate::{PAGE_SIZE, PageId, ROW_SIZE, TABLE_MAX_PAGES};

/// Page cache over a single file. Pages stay resident from first access until
/// [`Pager::close`]; nothing is evicted.
pub struct Pager {
    path: PathBuf,
    file: File,
    file_length: u64,
    pages: HashMap<PageId, Page>,
}

impl Pager {
    /// Opens the database file, creating it if it doesn't exist. No pages are
    /// read until they are asked for.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let file_length = file.metadata()?.len();
        if !is_valid_length(file_length) {
            return Err(DbError::CorruptFile { len: file_length });
        }

        let pager = Self {
            path: path.to_path_buf(),
            file,
            file_length,
            pages: HashMap::new(),
        };
        info!(
            "opened {}: {} bytes, {} pages",
            path.display(),
            file_length,
            pager.num_pages()
        );
        Ok(pager)
    }

    pub fn file_length(&self) -> u64 {
        self.file_length
    }

    /// Pages present in the file, counting a short last page.
    pub fn num_pages(&self) -> u64 {
        self.file_length.div_ceil(PAGE_SIZE as u64)
    }

    pub fn last_page_length(&self) -> u64 {
        match self.file_length % PAGE_SIZE as u64 {
            0 => PAGE_SIZE as u64,
            len => len,
        }
    }

    pub fn cached_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn get_page(&mut self, page_id: PageId) -> DbResult<&mut Page> {
        if page_id >= TABLE_MAX_PAGES as PageId {
            return Err(DbError::PageOutOfBounds {
                page_id,
                max: TABLE_MAX_PAGES as PageId - 1,
            });
        }

        let num_pages = self.num_pages();
        let last_page_length = self.last_page_length();
        let Self { file, pages, .. } = self;
        match pages.entry(page_id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let page = if page_id >= num_pages {
                    debug!("page {page_id} is beyond the file, allocating a fresh page");
                    Page::new(page_id)
                } else {
                    let len = if page_id == num_pages - 1 {
                        last_page_length
                    } else {
                        PAGE_SIZE as u64
                    };
                    debug!("page {page_id} not cached, reading {len} bytes");
                    let buf = read_at(file, page_id * PAGE_SIZE as u64, len as usize)?;
                    Page::from_bytes(page_id, &buf)
                };
                Ok(entry.insert(page))
            }
        }
    }

    /// Writes back every dirty page and closes the file. The first failed write
    /// is returned and the remaining pages are left unwritten.
    pub fn close(mut self) -> DbResult<()> {
        let pages = std::mem::take(&mut self.pages);
        let mut flushed = 0;
        for (page_id, page) in &pages {
            if !page.is_dirty() {
                continue;
            }
            write_at(&mut self.file, page_id * PAGE_SIZE as u64, page.as_bytes())?;
            flushed += 1;
        }
        self.file.sync_all()?;
        info!(
            "closed {}: flushed {flushed} of {} cached pages",
            self.path.display(),
            pages.len()
        );
        Ok(())
    }
}

impl Drop for Pager {
    fn drop(&mut self) {
        let dirty = self.pages.values().filter(|p| p.is_dirty()).count();
        if dirty > 0 {
            warn!(
                "pager for {} dropped without close, discarding {dirty} dirty pages",
                self.path.display()
            );
        }
    }
}

/// Every page but the last is written as a whole page; the last holds a whole
/// number of rows.
fn is_valid_length(len: u64) -> bool {
    let tail = len % PAGE_SIZE as u64;
    tail % ROW_SIZE as u64 == 0 && len.div_ceil(PAGE_SIZE as u64) <= TABLE_MAX_PAGES as u64
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::ROWS_PER_PAGE;
    use crate::row::Row;
    use tempfile::tempdir;

    fn row(i: u64) -> Row {
        Row::new(i, &format!("user{i}"), &format!("person{i}@example.com")).unwrap()
    }

    #[test]
    fn test_open_creates_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let pager = Pager::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(pager.file_length(), 0);
        assert_eq!(pager.num_pages(), 0);
        assert_eq!(pager.cached_pages(), 0);
        pager.close().unwrap();
    }

    #[test]
    fn test_open_rejects_corrupt_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        for len in [1, 100, ROW_SIZE + 1, PAGE_SIZE + 1] {
            fs::write(&path, vec![0u8; len]).unwrap();
            match Pager::open(&path) {
                Err(DbError::CorruptFile { len: got }) => assert_eq!(got, len as u64),
                _ => panic!("expected CorruptFile for {len} bytes"),
            }
        }
    }

    #[test]
    fn test_open_rejects_too_many_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        fs::write(&path, vec![0u8; (TABLE_MAX_PAGES + 1) * PAGE_SIZE]).unwrap();
        assert!(matches!(
            Pager::open(&path),
            Err(DbError::CorruptFile { .. })
        ));
    }

    #[test]
    fn test_page_geometry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        fs::write(&path, vec![0u8; PAGE_SIZE + 2 * ROW_SIZE]).unwrap();

        let pager = Pager::open(&path).unwrap();
        assert_eq!(pager.num_pages(), 2);
        assert_eq!(pager.last_page_length(), 2 * ROW_SIZE as u64);
        pager.close().unwrap();
    }

    #[test]
    fn test_get_page_out_of_bounds() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();
        let err = pager.get_page(TABLE_MAX_PAGES as PageId).err().unwrap();
        assert!(matches!(err, DbError::PageOutOfBounds { page_id: 100, max: 99 }));
        assert!(pager.get_page(TABLE_MAX_PAGES as PageId - 1).is_ok());
    }

    #[test]
    fn test_get_page_caches() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();

        pager.get_page(0).unwrap().insert(0, &row(1)).unwrap();
        assert_eq!(pager.cached_pages(), 1);

        // a second fetch hits the cache and sees the unflushed row
        let page = pager.get_page(0).unwrap();
        assert_eq!(page.num_rows(), 1);
        assert_eq!(page.row(0).unwrap(), row(1));
        assert_eq!(pager.cached_pages(), 1);
        pager.close().unwrap();
    }

    #[test]
    fn test_close_writes_logical_length_and_reopen_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut pager = Pager::open(&path).unwrap();
        for slot in 0..ROWS_PER_PAGE {
            pager.get_page(0).unwrap().insert(slot, &row(slot as u64)).unwrap();
        }
        pager.get_page(1).unwrap().insert(0, &row(100)).unwrap();
        // touched but never written: not flushed
        pager.get_page(5).unwrap();
        pager.close().unwrap();

        let len = fs::metadata(&path).unwrap().len();
        assert_eq!(len, (PAGE_SIZE + ROW_SIZE) as u64);

        let mut pager = Pager::open(&path).unwrap();
        assert_eq!(pager.num_pages(), 2);
        let first = pager.get_page(0).unwrap();
        assert_eq!(first.num_rows(), ROWS_PER_PAGE);
        assert!(!first.is_dirty());
        assert_eq!(first.row(ROWS_PER_PAGE - 1).unwrap(), row(ROWS_PER_PAGE as u64 - 1));
        let second = pager.get_page(1).unwrap();
        assert_eq!(second.num_rows(), 1);
        assert_eq!(second.row(0).unwrap(), row(100));
        pager.close().unwrap();
    }

    #[test]
    fn test_clean_pages_are_not_rewritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut pager = Pager::open(&path).unwrap();
        pager.get_page(0).unwrap().insert(0, &row(1)).unwrap();
        pager.close().unwrap();

        let mut pager = Pager::open(&path).unwrap();
        pager.get_page(0).unwrap();
        pager.close().unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), ROW_SIZE as u64);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_close_surfaces_write_failure() {
        // every write to /dev/full fails with ENOSPC
        let mut pager = Pager::open("/dev/full").unwrap();
        pager.get_page(0).unwrap().insert(0, &row(1)).unwrap();
        assert!(matches!(pager.close(), Err(DbError::Io(_))));
    }
}
