// Batch files: one `;`-separated, fully quoted, BOM-prefixed CSV per month,
// appended to after every results page.
mod reader;
mod writer;

pub use reader::{discover_batch_files, month_of, read_batch_file};
pub use writer::BatchWriter;

use thiserror::Error;

pub const DELIMITER: u8 = b';';
pub const BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("unexpected columns in {path}: {found}")]
    Schema { path: String, found: String },
}
