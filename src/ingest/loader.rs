// loader.rs
use crate::batch::{month_of, read_batch_file, BatchError};
use crate::db::{apply_schema, insert_flats, load_identity_set, Database};
use crate::domain::FlatRow;
use crate::errors::StoreError;
use rusqlite::Connection;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

/// Why a single file was left out of the load.
#[derive(Debug, Error)]
pub enum LoadFileError {
    #[error("could not read batch file: {0}")]
    Read(#[from] BatchError),
    #[error("insert failed, file rolled back: {0}")]
    Insert(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileCounts {
    pub accepted: usize,
    pub skipped: usize,
}

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub result: Result<FileCounts, LoadFileError>,
}

#[derive(Debug, Default)]
pub struct LoadSummary {
    pub files: Vec<FileReport>,
}

impl LoadSummary {
    pub fn accepted(&self) -> usize {
        self.counts().map(|c| c.accepted).sum()
    }

    pub fn skipped(&self) -> usize {
        self.counts().map(|c| c.skipped).sum()
    }

    pub fn failed_files(&self) -> usize {
        self.files.iter().filter(|f| f.result.is_err()).count()
    }

    /// Files that were not loaded, in load order.
    pub fn failed_paths(&self) -> Vec<&Path> {
        self.files
            .iter()
            .filter(|f| f.result.is_err())
            .map(|f| f.path.as_path())
            .collect()
    }

    fn counts(&self) -> impl Iterator<Item = &FileCounts> {
        self.files.iter().filter_map(|f| f.result.as_ref().ok())
    }
}

/// Load batch files into the store, oldest month first. Records whose id is
/// already stored, or was admitted earlier in this run, are skipped. Each
/// file is inserted in one transaction; a file that can't be read or inserted
/// is reported and the run moves on.
pub fn load(db: &Database, files: &[PathBuf]) -> Result<LoadSummary, StoreError> {
    let mut files = files.to_vec();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    db.with_conn(|conn| {
        apply_schema(conn)?;
        let mut known = load_identity_set(conn)?;
        info!(files = files.len(), stored = known.len(), "loading batch files");

        let mut summary = LoadSummary::default();
        for path in files {
            let result = load_file(conn, &path, &mut known);
            match &result {
                Ok(counts) => info!(
                    file = %path.display(),
                    accepted = counts.accepted,
                    skipped = counts.skipped,
                    "file loaded"
                ),
                Err(e) => error!(file = %path.display(), error = %e, "file skipped"),
            }
            summary.files.push(FileReport { path, result });
        }

        info!(
            accepted = summary.accepted(),
            skipped = summary.skipped(),
            failed_files = summary.failed_files(),
            "load finished"
        );
        Ok(summary)
    })
}

fn load_file(
    conn: &mut Connection,
    path: &Path,
    known: &mut HashSet<i64>,
) -> Result<FileCounts, LoadFileError> {
    let records = read_batch_file(path)?;
    let month = month_of(path);
    if month.is_none() {
        warn!(file = %path.display(), "no month in file name, date_scraped left empty");
    }

    let mut counts = FileCounts::default();
    let mut seen = HashSet::new();
    let mut fresh = Vec::new();
    for record in records {
        let row = FlatRow::from_record(record, month.as_deref());
        if known.contains(&row.id) || !seen.insert(row.id) {
            counts.skipped += 1;
        } else {
            fresh.push(row);
        }
    }

    let tx = conn.transaction()?;
    counts.accepted = insert_flats(&tx, &fresh)?;
    tx.commit()?;

    known.extend(seen);
    Ok(counts)
}
