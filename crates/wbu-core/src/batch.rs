//! Batched streaming between table DAOs and backup files.
//!
//! Rows move in batches of at most `batch_size` items. Reading is pull based
//! through [`BatchReader`]; [`for_each`] drives a reader to completion and
//! stops at the first failure.

use crate::db::TableDao;
use crate::error::{BackupError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Lines, Write};
use std::marker::PhantomData;
use std::path::Path;

pub trait BatchReader {
    type Item;

    /// True when the next `read_next` call yields a batch or an error.
    fn has_next(&self) -> bool;

    fn read_next(&mut self) -> Result<Option<Self::Item>>;
}

/// Feed every batch to `f` in order. Returns the number of batches handled,
/// or the first error tagged with the index of the batch that produced it.
pub fn for_each<B, F>(reader: &mut B, mut f: F) -> Result<usize>
where
    B: BatchReader + ?Sized,
    F: FnMut(usize, B::Item) -> Result<()>,
{
    let mut index = 0;
    while reader.has_next() {
        let batch = match reader.read_next() {
            Ok(Some(batch)) => batch,
            Ok(None) => break,
            Err(e) => return Err(BackupError::in_batch(index, e)),
        };
        f(index, batch).map_err(|e| BackupError::in_batch(index, e))?;
        index += 1;
    }
    Ok(index)
}

// ── Table side ──────────────────────────────────────────────────────────────

/// Pages through a table with `LIMIT/OFFSET`.
///
/// One page is always fetched ahead, so `has_next` only reports a batch that
/// is already in hand (or a fetch error waiting to be returned).
pub struct PagedTableReader<'a, R> {
    dao: &'a dyn TableDao<R>,
    batch_size: usize,
    offset: u64,
    total: u64,
    ahead: Option<Result<Vec<R>>>,
}

impl<'a, R> PagedTableReader<'a, R> {
    pub fn new(dao: &'a dyn TableDao<R>, batch_size: usize) -> Result<Self> {
        let total = dao.count()?;
        let mut reader = Self {
            dao,
            batch_size: batch_size.max(1),
            offset: 0,
            total,
            ahead: None,
        };
        reader.fetch_ahead();
        Ok(reader)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    fn fetch_ahead(&mut self) {
        self.ahead = if self.offset < self.total {
            match self.dao.page(self.offset, self.batch_size) {
                // table shrank since the count was taken
                Ok(page) if page.is_empty() => None,
                fetched => Some(fetched),
            }
        } else {
            None
        };
    }
}

impl<R> BatchReader for PagedTableReader<'_, R> {
    type Item = Vec<R>;

    fn has_next(&self) -> bool {
        self.ahead.is_some()
    }

    fn read_next(&mut self) -> Result<Option<Vec<R>>> {
        match self.ahead.take() {
            None => Ok(None),
            Some(Err(e)) => Err(e),
            Some(Ok(page)) => {
                self.offset += page.len() as u64;
                self.fetch_ahead();
                Ok(Some(page))
            }
        }
    }
}

// ── File side ───────────────────────────────────────────────────────────────

/// Writes models as JSON Lines, one model per line.
pub struct BackupFileWriter<M> {
    out: BufWriter<File>,
    rows: u64,
    _model: PhantomData<fn(M)>,
}

impl<M: Serialize> BackupFileWriter<M> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            out: BufWriter::new(file),
            rows: 0,
            _model: PhantomData,
        })
    }

    pub fn write_batch(&mut self, batch: &[M]) -> Result<()> {
        for model in batch {
            serde_json::to_writer(&mut self.out, model)?;
            self.out.write_all(b"\n")?;
        }
        self.rows += batch.len() as u64;
        Ok(())
    }

    /// Flush and sync the file. Returns the number of rows written.
    pub fn finish(self) -> Result<u64> {
        let file = self
            .out
            .into_inner()
            .map_err(|e| BackupError::Io(e.error().to_string()))?;
        file.sync_all()?;
        Ok(self.rows)
    }
}

/// Reads a JSON Lines backup file in batches of at most `batch_size` models.
pub struct BackupFileReader<M> {
    lines: Lines<BufReader<File>>,
    next: Option<io::Result<String>>,
    line_no: usize,
    batch_size: usize,
    _model: PhantomData<fn() -> M>,
}

impl<M: DeserializeOwned> BackupFileReader<M> {
    pub fn open(path: &Path, batch_size: usize) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = Self {
            lines: BufReader::new(file).lines(),
            next: None,
            line_no: 0,
            batch_size: batch_size.max(1),
            _model: PhantomData,
        };
        reader.advance();
        Ok(reader)
    }

    /// Load the next non-blank line (or a read error) into the lookahead slot.
    fn advance(&mut self) {
        self.next = None;
        for line in self.lines.by_ref() {
            self.line_no += 1;
            match line {
                Ok(text) if text.trim().is_empty() => continue,
                other => {
                    self.next = Some(other);
                    return;
                }
            }
        }
    }
}

impl<M: DeserializeOwned> BatchReader for BackupFileReader<M> {
    type Item = Vec<M>;

    fn has_next(&self) -> bool {
        self.next.is_some()
    }

    fn read_next(&mut self) -> Result<Option<Vec<M>>> {
        let mut batch = Vec::new();
        while batch.len() < self.batch_size {
            let Some(line) = self.next.take() else {
                break;
            };
            let line_no = self.line_no;
            self.advance();
            let text = line?;
            let model = serde_json::from_str(&text).map_err(|e| {
                BackupError::Serialization(format!("line {line_no}: {e}"))
            })?;
            batch.push(model);
        }
        if batch.is_empty() {
            return Ok(None);
        }
        Ok(Some(batch))
    }
}
