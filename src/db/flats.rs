// src/db/flats.rs
use crate::domain::filters::{FlatFilter, MarketFilter, Range, SortColumn};
use crate::domain::flat::FlatRow;
use crate::domain::stats::FlatSummary;
use crate::errors::StoreError;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::HashSet;

/// Every id already in the store.
pub fn load_identity_set(conn: &Connection) -> Result<HashSet<i64>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT id FROM flats")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(ids)
}

fn insert_sql() -> String {
    let columns = FlatRow::columns();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO flats ({}) VALUES ({placeholders})",
        columns.join(", ")
    )
}

/// Insert rows on an open connection or transaction. Rows whose id is
/// already stored make the statement fail; callers filter them first.
pub fn insert_flats(conn: &Connection, rows: &[FlatRow]) -> Result<usize, rusqlite::Error> {
    let mut stmt = conn.prepare_cached(&insert_sql())?;
    let mut inserted = 0;
    for row in rows {
        inserted += stmt.execute(params_from_iter(row.values()))?;
    }
    Ok(inserted)
}

pub fn count_flats(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM flats", [], |row| row.get(0))?)
}

/// Distinct non-empty values of a text column, for the filter form.
pub fn distinct_values(conn: &Connection, column: FilterColumn) -> Result<Vec<String>, StoreError> {
    let col = column.name();
    let sql = format!(
        "SELECT DISTINCT {col} FROM flats WHERE {col} IS NOT NULL AND {col} <> '' ORDER BY {col}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let values = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterColumn {
    District,
    Ownership,
    ConstructionStatus,
}

impl FilterColumn {
    fn name(&self) -> &'static str {
        match self {
            FilterColumn::District => "district",
            FilterColumn::Ownership => "building_ownership",
            FilterColumn::ConstructionStatus => "construction_status",
        }
    }
}

#[derive(Default)]
struct WhereClause {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl WhereClause {
    fn any_of(&mut self, column: &str, values: &[String]) {
        if values.is_empty() {
            return;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.clauses.push(format!("{column} IN ({placeholders})"));
        self.params
            .extend(values.iter().map(|v| Value::Text(v.clone())));
    }

    fn range(&mut self, column: &str, range: Range, keep_nulls: bool) {
        for (bound, op) in [(range.min, ">="), (range.max, "<=")] {
            let Some(bound) = bound else { continue };
            if keep_nulls {
                self.clauses.push(format!("({column} IS NULL OR {column} {op} ?)"));
            } else {
                self.clauses.push(format!("{column} {op} ?"));
            }
            self.params.push(Value::Real(bound));
        }
    }

    fn render(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

fn where_clause(filter: &FlatFilter) -> WhereClause {
    let mut w = WhereClause::default();

    w.any_of("district", &filter.districts);
    w.any_of("building_ownership", &filter.ownership);
    w.any_of("construction_status", &filter.construction_status);

    match filter.market {
        MarketFilter::All => {}
        MarketFilter::Primary => w.clauses.push("is_primary = 1".into()),
        MarketFilter::Secondary => w.clauses.push("is_primary = 0".into()),
    }

    w.range("price", filter.price, false);
    w.range("price_per_sq_m", filter.price_per_sq_m, false);
    w.range("area", filter.area, false);
    w.range("no_floor", filter.floor, true);
    w.range("built_year", filter.built_year, true);

    for feature in &filter.features {
        w.clauses.push(format!("{} = 1", feature.column()));
    }

    w
}

const SUMMARY_COLUMNS: &str = "id, district, price, area, price_per_sq_m, no_rooms, no_floor, \
     built_year, is_primary, date_scraped, url";

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<FlatSummary> {
    Ok(FlatSummary {
        id: row.get(0)?,
        district: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        price: row.get(2)?,
        area: row.get(3)?,
        price_per_sq_m: row.get(4)?,
        no_rooms: row.get(5)?,
        no_floor: row.get(6)?,
        built_year: row.get(7)?,
        is_primary: row.get(8)?,
        date_scraped: row.get(9)?,
        url: row.get(10)?,
    })
}

/// Stored flats matching `filter`, most recently scraped first.
pub fn query_flats(conn: &Connection, filter: &FlatFilter) -> Result<Vec<FlatSummary>, StoreError> {
    let w = where_clause(filter);
    let sql = format!(
        "SELECT {SUMMARY_COLUMNS} FROM flats{} ORDER BY date_scraped DESC, price_per_sq_m ASC",
        w.render()
    );

    let mut stmt = conn.prepare(&sql)?;
    let flats = stmt
        .query_map(params_from_iter(w.params.iter()), summary_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(flats)
}

/// The `n` cheapest (or, with `ascending` false, most expensive) flats
/// matching `filter`, ranked by `sort`. Rows without a value in the sort
/// column are left out.
pub fn top_flats(
    conn: &Connection,
    filter: &FlatFilter,
    sort: SortColumn,
    n: usize,
    ascending: bool,
) -> Result<Vec<FlatSummary>, StoreError> {
    let col = sort.column();
    let mut w = where_clause(filter);
    w.clauses.push(format!("{col} IS NOT NULL"));
    let order = if ascending { "ASC" } else { "DESC" };
    let sql = format!(
        "SELECT {SUMMARY_COLUMNS} FROM flats{} ORDER BY {col} {order}, id LIMIT ?",
        w.render()
    );

    let mut params = w.params;
    params.push(Value::Integer(i64::try_from(n).unwrap_or(i64::MAX)));

    let mut stmt = conn.prepare(&sql)?;
    let flats = stmt
        .query_map(params_from_iter(params.iter()), summary_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(flats)
}
