//! Ledger file codec
//!
//! A ledger is a line-delimited JSON file: each non-empty line is one
//! independent JSON object. Two write disciplines exist:
//! - append-only (resumable stages): one line appended and flushed per unit
//! - full rewrite (reduction stages): whole file replaced atomically
//!
//! Reads are tolerant: blank lines are ignored, malformed lines are skipped
//! with a warning and never fail the read.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A ledger record with a stable per-ledger key
pub trait LedgerRecord {
    fn key(&self) -> &str;
}

/// Records read from a ledger plus the number of lines skipped
#[derive(Debug, Clone)]
pub struct LedgerContents<T> {
    pub records: Vec<T>,
    pub malformed_lines: usize,
}

/// Read every well-formed record; the file must exist
pub fn read_ledger<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    Ok(read_ledger_contents(path)?.records)
}

/// Read every well-formed record; a missing file reads as empty
pub fn read_ledger_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        debug!("Ledger {} does not exist yet, treating as empty", path.display());
        return Ok(Vec::new());
    }
    read_ledger(path)
}

/// Read a ledger and report how many lines were skipped
pub fn read_ledger_contents<T: DeserializeOwned>(path: &Path) -> Result<LedgerContents<T>> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;

    let mut records = Vec::new();
    let mut malformed_lines = 0usize;

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(trimmed) {
            Ok(record) => records.push(record),
            Err(e) => {
                malformed_lines += 1;
                warn!(
                    ledger = %path.display(),
                    line = index + 1,
                    "Skipping malformed ledger line: {}",
                    e
                );
            }
        }
    }

    Ok(LedgerContents {
        records,
        malformed_lines,
    })
}

/// Keyed read: first occurrence of each key is authoritative
///
/// Returns the deduplicated records (in file order) and the number of
/// duplicate lines ignored.
pub fn read_keyed_ledger<T>(path: &Path) -> Result<(Vec<T>, usize)>
where
    T: DeserializeOwned + LedgerRecord,
{
    let records: Vec<T> = read_ledger_if_exists(path)?;
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());
    let mut duplicates = 0usize;

    for record in records {
        if seen.insert(record.key().to_string()) {
            unique.push(record);
        } else {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        warn!(
            ledger = %path.display(),
            "Ignored {} duplicate key lines (first occurrence wins)",
            duplicates
        );
    }

    Ok((unique, duplicates))
}

/// Sibling temp path used for atomic replacement
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Atomically replace `path` with bytes produced by `fill`
fn write_atomically<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    ensure_parent(path)?;
    let temp_path = temp_path_for(path);

    if let Err(e) = fill_file(&temp_path, fill) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    std::fs::rename(&temp_path, path)?;
    Ok(())
}

fn fill_file<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    fill(&mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Fully rewrite a ledger; returns the number of lines written
pub fn write_ledger<'a, T, I>(path: &Path, records: I) -> Result<usize>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut count = 0usize;
    write_atomically(path, |writer| {
        for record in records {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
            count += 1;
        }
        Ok(())
    })?;
    debug!(ledger = %path.display(), lines = count, "Ledger rewritten");
    Ok(count)
}

/// Atomically write one pretty-printed JSON document
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_atomically(path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, value)?;
        writer.write_all(b"\n")?;
        Ok(())
    })
}

/// Read one JSON document
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Append-only ledger writer
///
/// Every [`LedgerAppender::append`] writes one line and flushes it, so a
/// record is durable as soon as the call returns.
pub struct LedgerAppender {
    path: PathBuf,
    file: File,
}

impl LedgerAppender {
    pub fn open(path: &Path) -> Result<Self> {
        ensure_parent(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut appender = Self {
            path: path.to_path_buf(),
            file,
        };
        appender.repair_trailing_newline()?;
        Ok(appender)
    }

    /// An interrupted writer may leave a partial last line; start on a fresh one
    fn repair_trailing_newline(&mut self) -> Result<()> {
        let content = std::fs::read(&self.path)?;
        if let Some(&last) = content.last() {
            if last != b'\n' {
                warn!(
                    ledger = %self.path.display(),
                    "Ledger does not end with a newline, terminating partial line"
                );
                self.file.write_all(b"\n")?;
                self.file.flush()?;
            }
        }
        Ok(())
    }

    pub fn append<T: Serialize>(&mut self, record: &T) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
