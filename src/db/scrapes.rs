use crate::errors::StoreError;
use rusqlite::{params, Connection};

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeRun {
    pub id: i64,
    pub batch_file: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub partitions_done: Option<i64>,
    pub partitions_failed: Option<i64>,
    pub pages_fetched: Option<i64>,
    pub records_written: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Counters recorded when a run ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTotals {
    pub partitions_done: usize,
    pub partitions_failed: usize,
    pub pages: u32,
    pub records: usize,
}

pub fn start_scrape_run(conn: &Connection, batch_file: &str, now: i64) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO scrape_runs (batch_file, started_at, success) VALUES (?, ?, 0)",
        params![batch_file, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn end_scrape_run(
    conn: &Connection,
    run_id: i64,
    now: i64,
    totals: &RunTotals,
    success: bool,
    error: Option<String>,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE scrape_runs SET finished_at = ?, partitions_done = ?, partitions_failed = ?, \
         pages_fetched = ?, records_written = ?, success = ?, error_message = ? WHERE id = ?",
        params![
            now,
            totals.partitions_done as i64,
            totals.partitions_failed as i64,
            totals.pages,
            totals.records as i64,
            success,
            error,
            run_id
        ],
    )?;
    Ok(())
}

pub fn get_recent_scrapes(conn: &Connection, limit: usize) -> Result<Vec<ScrapeRun>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, batch_file, started_at, finished_at, partitions_done, partitions_failed, \
         pages_fetched, records_written, success, error_message \
         FROM scrape_runs ORDER BY started_at DESC, id DESC LIMIT ?",
    )?;

    let rows = stmt.query_map(params![limit as i64], |row| {
        Ok(ScrapeRun {
            id: row.get(0)?,
            batch_file: row.get(1)?,
            started_at: row.get(2)?,
            finished_at: row.get(3)?,
            partitions_done: row.get(4)?,
            partitions_failed: row.get(5)?,
            pages_fetched: row.get(6)?,
            records_written: row.get(7)?,
            success: row.get(8)?,
            error_message: row.get(9)?,
        })
    })?;

    let mut runs = Vec::new();
    for r in rows {
        runs.push(r?);
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::apply_schema;

    #[test]
    fn run_lifecycle() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let first = start_scrape_run(&conn, "flats_2025-01.csv", 100).unwrap();
        let second = start_scrape_run(&conn, "flats_2025-01.csv", 200).unwrap();
        let totals = RunTotals {
            partitions_done: 17,
            partitions_failed: 1,
            pages: 40,
            records: 1200,
        };
        end_scrape_run(&conn, first, 150, &totals, false, Some("failed: wola".into())).unwrap();

        let runs = get_recent_scrapes(&conn, 10).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, second);
        assert_eq!(runs[0].finished_at, None);
        assert!(!runs[0].success);

        let done = &runs[1];
        assert_eq!(done.finished_at, Some(150));
        assert_eq!(done.partitions_failed, Some(1));
        assert_eq!(done.records_written, Some(1200));
        assert_eq!(done.error_message.as_deref(), Some("failed: wola"));
    }
}
