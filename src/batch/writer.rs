use crate::batch::{BatchError, BOM, DELIMITER};
use crate::domain::{ListingRecord, BATCH_COLUMNS};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// `flats_2025-01.csv`
pub fn batch_file_name(month: &str) -> String {
    format!("flats_{month}.csv")
}

/// Appends pages of records to one batch file. The file is opened and closed
/// on every flush; nothing is held between pages.
#[derive(Debug, Clone)]
pub struct BatchWriter {
    path: PathBuf,
}

impl BatchWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_month(dir: &Path, month: &str) -> Self {
        Self::new(dir.join(batch_file_name(month)))
    }

    /// Batch file of the current calendar month.
    pub fn current_month(dir: &Path) -> Self {
        let month = chrono::Local::now().format("%Y-%m").to_string();
        Self::for_month(dir, &month)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `records` at the end of the file, creating it (BOM + header) if
    /// needed. Rows are serialized in memory first and written in one call so a
    /// serialization failure never leaves half a page behind.
    pub fn append(&self, records: &[ListingRecord]) -> Result<usize, BatchError> {
        if records.is_empty() {
            return Ok(0);
        }

        // A file left empty by an earlier failed flush still needs its header.
        let is_new = fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);
        let mut buf: Vec<u8> = Vec::new();
        if is_new {
            buf.extend_from_slice(BOM);
        }

        {
            let mut wtr = WriterBuilder::new()
                .delimiter(DELIMITER)
                .quote_style(QuoteStyle::Always)
                .terminator(Terminator::Any(b'\n'))
                .has_headers(false)
                .from_writer(&mut buf);

            if is_new {
                wtr.write_record(BATCH_COLUMNS)?;
            }
            for record in records {
                wtr.serialize(record)?;
            }
            wtr.flush().map_err(|source| self.io_error(source))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        file.write_all(&buf).map_err(|source| self.io_error(source))?;

        Ok(records.len())
    }

    fn io_error(&self, source: std::io::Error) -> BatchError {
        BatchError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::read_batch_file;
    use crate::domain::listing::MarketType;
    use crate::tests::utils::temp_dir;

    fn record(n: u32) -> ListingRecord {
        let mut r = ListingRecord::new("wola", &format!("https://www.otodom.pl/pl/oferta/{n}"));
        r.price = Some(700_000.0 + n as f64);
        r.market_type = Some(MarketType::Primary);
        r.extras = Some("balcony, lift".to_string());
        r.building_ownership = Some("full; ownership".to_string());
        r
    }

    #[test]
    fn header_and_bom_are_written_once() {
        let dir = temp_dir("writer_header");
        let writer = BatchWriter::for_month(&dir, "2025-01");

        writer.append(&[record(1)]).unwrap();
        writer.append(&[record(2), record(3)]).unwrap();

        let bytes = std::fs::read(writer.path()).unwrap();
        assert!(bytes.starts_with(BOM));
        assert_eq!(bytes.windows(3).filter(|w| *w == BOM).count(), 1);

        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with(r#""price";"rent";"area";"extras""#));
        assert!(lines[0].ends_with(r#""built_year";"url""#));
        assert_eq!(text.matches(r#""price""#).count(), 1);
    }

    #[test]
    fn every_field_is_quoted() {
        let dir = temp_dir("writer_quoted");
        let writer = BatchWriter::for_month(&dir, "2025-02");
        writer.append(&[ListingRecord::new("ursus", "https://x.pl/1")]).unwrap();

        let text = std::fs::read_to_string(writer.path()).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert_eq!(row.split(';').count(), BATCH_COLUMNS.len());
        assert!(row.split(';').all(|f| f.starts_with('"') && f.ends_with('"')));
    }

    #[test]
    fn appended_rows_read_back() {
        let dir = temp_dir("writer_read_back");
        let writer = BatchWriter::for_month(&dir, "2025-03");
        writer.append(&[record(1)]).unwrap();
        writer.append(&[record(2)]).unwrap();

        let rows = read_batch_file(writer.path()).unwrap();
        assert_eq!(rows, vec![record(1), record(2)]);
    }

    #[test]
    fn empty_existing_file_gets_a_header() {
        let dir = temp_dir("writer_empty_existing");
        let writer = BatchWriter::for_month(&dir, "2025-05");
        std::fs::write(writer.path(), b"").unwrap();

        writer.append(&[record(1)]).unwrap();
        writer.append(&[record(2)]).unwrap();

        let bytes = std::fs::read(writer.path()).unwrap();
        assert!(bytes.starts_with(BOM));
        let rows = read_batch_file(writer.path()).unwrap();
        assert_eq!(rows, vec![record(1), record(2)]);
    }

    #[test]
    fn empty_page_does_not_create_file() {
        let dir = temp_dir("writer_empty");
        let writer = BatchWriter::for_month(&dir, "2025-04");
        assert_eq!(writer.append(&[]).unwrap(), 0);
        assert!(!writer.path().exists());
    }
}
