use crate::batch::{BatchError, BOM, DELIMITER};
use crate::domain::{ListingRecord, BATCH_COLUMNS};
use csv::{ReaderBuilder, Trim};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

const BATCH_FILE_PATTERN: &str = r"^flats_(20\d{2}-\d{2})\.csv$";

/// Parse a whole batch file. The header has to match the batch layout exactly.
pub fn read_batch_file(path: &Path) -> Result<Vec<ListingRecord>, BatchError> {
    let bytes = fs::read(path).map_err(|source| BatchError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let body = bytes.strip_prefix(BOM).unwrap_or(&bytes[..]);

    let mut rdr = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .trim(Trim::Headers)
        .from_reader(body);

    let headers = rdr.headers()?.clone();
    let found: Vec<&str> = headers.iter().collect();
    if found != BATCH_COLUMNS {
        return Err(BatchError::Schema {
            path: path.display().to_string(),
            found: found.join(","),
        });
    }

    let records = rdr
        .deserialize::<ListingRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Batch files in `dir`, in filename (= month) order.
pub fn discover_batch_files(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let io_err = |source| BatchError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && month_of(&path).is_some() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// `flats_2025-01.csv` -> `2025-01`
pub fn month_of(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let pattern = Regex::new(BATCH_FILE_PATTERN).ok()?;
    pattern
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::utils::temp_dir;

    #[test]
    fn discovers_only_batch_files_in_month_order() {
        let dir = temp_dir("discover");
        for name in [
            "flats_2025-03.csv",
            "flats_2024-12.csv",
            "flats_2025-01.csv",
            "flats_2025-1.csv",
            "otodom_scraped_2025-02.csv",
            "flats_2025-02.csv.bak",
        ] {
            fs::write(dir.join(name), "").unwrap();
        }

        let names: Vec<String> = discover_batch_files(&dir)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["flats_2024-12.csv", "flats_2025-01.csv", "flats_2025-03.csv"]);
    }

    #[test]
    fn month_comes_from_file_name() {
        assert_eq!(month_of(Path::new("/data/flats_2025-07.csv")).as_deref(), Some("2025-07"));
        assert_eq!(month_of(Path::new("/data/flats.csv")), None);
    }

    #[test]
    fn wrong_header_is_a_schema_error() {
        let dir = temp_dir("wrong_header");
        let path = dir.join("flats_2025-01.csv");
        fs::write(&path, "\"price\";\"url\"\n\"1\";\"https://x.pl/1\"\n").unwrap();
        assert!(matches!(read_batch_file(&path), Err(BatchError::Schema { .. })));
    }

    #[test]
    fn bad_value_is_a_csv_error() {
        let dir = temp_dir("bad_value");
        let path = dir.join("flats_2025-01.csv");
        let header = BATCH_COLUMNS.map(|c| format!("\"{c}\"")).join(";");
        let mut row = vec!["\"\"".to_string(); BATCH_COLUMNS.len()];
        row[0] = "\"expensive\"".to_string();
        fs::write(&path, format!("{header}\n{}\n", row.join(";"))).unwrap();
        assert!(matches!(read_batch_file(&path), Err(BatchError::Csv(_))));
    }

    #[test]
    fn file_without_bom_is_accepted() {
        let dir = temp_dir("no_bom");
        let path = dir.join("flats_2025-01.csv");
        let header = BATCH_COLUMNS.join(";");
        let mut row = vec![String::new(); BATCH_COLUMNS.len()];
        row[15] = "bemowo".to_string();
        row[17] = "https://x.pl/1".to_string();
        fs::write(&path, format!("{header}\n{}\n", row.join(";"))).unwrap();

        let rows = read_batch_file(&path).unwrap();
        assert_eq!(rows, vec![ListingRecord::new("bemowo", "https://x.pl/1")]);
    }
}
