//! Positioned reads and writes with a bounded number of attempts.

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use log::debug;

use crate::error::{DbError, DbResult};

const MAX_ATTEMPTS: usize = 3;

/// Reads `total` bytes starting at `offset`. Partial reads are accumulated over
/// at most three attempts.
pub fn read_at<F: Read + Seek>(file: &mut F, offset: u64, total: usize) -> DbResult<Vec<u8>> {
    debug!("start to read file: offset={offset} total={total}");

    let mut buffer = vec![0u8; total];
    let mut cur = 0;
    for _ in 0..MAX_ATTEMPTS {
        if cur >= total {
            break;
        }
        file.seek(SeekFrom::Start(offset + cur as u64))?;
        match file.read(&mut buffer[cur..]) {
            Ok(n) => cur += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }

    if cur < total {
        return Err(DbError::ShortRead {
            offset,
            expected: total,
            actual: cur,
        });
    }

    debug!("successfully read file: offset={offset} len={total}");
    Ok(buffer)
}

/// Writes all of `buf` at `offset`, with the same retry budget as [`read_at`].
pub fn write_at<F: Write + Seek>(file: &mut F, offset: u64, buf: &[u8]) -> DbResult<()> {
    let total = buf.len();
    debug!("start to write file: offset={offset} total={total}");

    let mut cur = 0;
    for _ in 0..MAX_ATTEMPTS {
        if cur >= total {
            break;
        }
        file.seek(SeekFrom::Start(offset + cur as u64))?;
        match file.write(&buf[cur..]) {
            Ok(n) => cur += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }

    if cur < total {
        return Err(DbError::ShortWrite {
            offset,
            expected: total,
            actual: cur,
        });
    }

    debug!("successfully wrote file: offset={offset} len={total}");
    Ok(())
}
