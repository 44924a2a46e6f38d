// src/tests/router_tests.rs
use crate::db::connection::{init_db, Database};
use crate::db::flats::insert_flats;
use crate::db::scrapes::start_scrape_run;
use crate::domain::FlatRow;
use crate::errors::{ServerError, StoreError};
use crate::responses::error_to_response;
use crate::responses::xlsx::XLSX_CONTENT_TYPE;
use crate::router::handle;
use crate::tests::utils::{body_bytes, body_string, get, record, temp_db};

fn expect_err(result: crate::responses::ResultResp) -> ServerError {
    match result {
        Ok(resp) => panic!("expected an error, got status {}", resp.status()),
        Err(err) => err,
    }
}

fn seeded_db(name: &str) -> Database {
    let db = temp_db(name);
    init_db(&db).unwrap();
    db.with_conn(|conn| {
        let rows = vec![
            FlatRow::from_record(record("wola", "https://x.pl/a", 650_000.0, 50.0), Some("2025-01")),
            FlatRow::from_record(record("wawer", "https://x.pl/b", 450_000.0, 50.0), Some("2025-01")),
        ];
        insert_flats(conn, &rows)?;
        start_scrape_run(conn, "flats_2025-01.csv", 1_735_689_600)?;
        Ok::<_, StoreError>(())
    })
    .unwrap();
    db
}

#[test]
fn market_view_renders_stored_flats() {
    let db = seeded_db("router_home");
    let mut resp = handle(get("/"), &db).unwrap();
    assert_eq!(resp.status(), 200);

    let body = body_string(&mut resp);
    assert!(body.contains("2 offers stored"));
    assert!(body.contains("https://x.pl/a"));
    assert!(body.contains("flats_2025-01.csv"));
    assert!(body.contains("550 000 zł"));
}

#[test]
fn filters_narrow_the_view() {
    let db = seeded_db("router_filter");
    let mut resp = handle(get("/?district=wola&max_price=700000"), &db).unwrap();
    let body = body_string(&mut resp);
    assert!(body.contains("1 match the filters"));
    assert!(!body.contains("https://x.pl/b"));
}

#[test]
fn top_deals_follow_sort_and_size() {
    let db = seeded_db("router_top_deals");
    let mut resp = handle(get("/?top=5&sort=price"), &db).unwrap();
    let body = body_string(&mut resp);

    let lowest = body.find("Lowest total price").unwrap();
    let highest = body.find("Highest total price").unwrap();
    assert!(lowest < highest);
    // Cheapest first in the lowest table, dearest first in the highest.
    let lowest_card = &body[lowest..highest];
    assert!(lowest_card.find("https://x.pl/b").unwrap() < lowest_card.find("https://x.pl/a").unwrap());
    let highest_card = &body[highest..];
    assert!(highest_card.find("https://x.pl/a").unwrap() < highest_card.find("https://x.pl/b").unwrap());

    let mut resp = handle(get("/?district=bemowo&sort=area"), &db).unwrap();
    let body = body_string(&mut resp);
    assert!(body.contains("Lowest area"));
    assert_eq!(body.matches("No results for selected filters.").count(), 2);

    let err = expect_err(handle(get("/?top=3"), &db));
    assert!(matches!(err, ServerError::BadRequest(_)));
}

#[test]
fn invalid_filter_is_a_bad_request() {
    let db = seeded_db("router_bad_filter");
    let err = expect_err(handle(get("/?min_area=abc"), &db));
    assert!(matches!(err, ServerError::BadRequest(_)));
    assert_eq!(error_to_response(err).status(), 400);
}

#[test]
fn export_returns_a_workbook() {
    let db = seeded_db("router_export");
    let mut resp = handle(get("/export?district=wawer"), &db).unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        XLSX_CONTENT_TYPE
    );
    assert!(body_bytes(&mut resp).starts_with(b"PK"));
}

#[test]
fn unknown_route_is_not_found() {
    let db = seeded_db("router_404");
    let err = expect_err(handle(get("/nope"), &db));
    let mut resp = error_to_response(err);
    assert_eq!(resp.status(), 404);
    assert!(body_string(&mut resp).contains("Not Found"));
}

