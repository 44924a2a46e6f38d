use crate::db::flats::{count_flats, distinct_values, query_flats, top_flats, FilterColumn};
use crate::db::scrapes::get_recent_scrapes;
use crate::db::Database;
use crate::domain::filters::FlatFilter;
use crate::domain::stats::{district_ranking, kpis};
use crate::errors::ServerError;
use crate::responses::{html_response, ResultResp};
use crate::spreadsheets::export_flats_xlsx;
use crate::templates::pages::{dashboard_page, DashboardVm, FilterOptions};
use astra::Request;
use tracing::debug;

const RECENT_RUNS: usize = 10;

pub fn handle(req: Request, db: &Database) -> ResultResp {
    let method = req.method().as_str();
    let path = req.uri().path();
    let query = req.uri().query().unwrap_or("");
    debug!(%method, %path, %query, "request");

    match (method, path) {
        ("GET", "/") => {
            let filter = parse_filter(query)?;
            let vm = dashboard_vm(db, filter, query)?;
            html_response(dashboard_page(&vm))
        }
        ("GET", "/export") => {
            let filter = parse_filter(query)?;
            let flats = db.with_conn(|conn| query_flats(conn, &filter))?;
            export_flats_xlsx(&flats)
        }
        _ => Err(ServerError::NotFound),
    }
}

fn parse_filter(query: &str) -> Result<FlatFilter, ServerError> {
    FlatFilter::from_query(query).map_err(ServerError::BadRequest)
}

fn dashboard_vm(db: &Database, filter: FlatFilter, query: &str) -> Result<DashboardVm, ServerError> {
    let (flats, lowest, highest, stored, options, recent_runs) = db.with_conn(|conn| {
        let flats = query_flats(conn, &filter)?;
        let lowest = top_flats(conn, &filter, filter.sort, filter.top, true)?;
        let highest = top_flats(conn, &filter, filter.sort, filter.top, false)?;
        let stored = count_flats(conn)?;
        let options = FilterOptions {
            districts: distinct_values(conn, FilterColumn::District)?,
            ownerships: distinct_values(conn, FilterColumn::Ownership)?,
            construction_statuses: distinct_values(conn, FilterColumn::ConstructionStatus)?,
        };
        let runs = get_recent_scrapes(conn, RECENT_RUNS)?;
        Ok::<_, ServerError>((flats, lowest, highest, stored, options, runs))
    })?;

    Ok(DashboardVm {
        kpis: kpis(&flats),
        ranking: district_ranking(&flats),
        filter,
        query: query.to_string(),
        options,
        stored,
        flats,
        lowest,
        highest,
        recent_runs,
    })
}
