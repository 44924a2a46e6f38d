// src/tests/utils.rs
use crate::db::connection::Database;
use crate::domain::ListingRecord;
use crate::scraper::fetcher::{FetchMode, Fetcher};
use crate::scraper::scheduler::{Pacer, Pause};
use crate::scraper::FetchError;
use astra::{Body, Request, Response};
use http::Method;
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn unique(name: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("warsaw_flats_{name}_{}_{nanos}_{n}", std::process::id())
}

/// A fresh, empty directory under the system temp dir.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(unique(name));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Handle to a SQLite file that does not exist yet.
pub fn temp_db(name: &str) -> Database {
    let path = std::env::temp_dir().join(format!("{}.sqlite", unique(name)));
    Database::new(path.to_string_lossy().into_owned())
}

pub fn record(district: &str, url: &str, price: f64, area: f64) -> ListingRecord {
    let mut r = ListingRecord::new(district, url);
    r.price = Some(price);
    r.area = Some(area);
    r.price_per_sq_m = Some((price / area).round());
    r
}

/// Pacer that never sleeps and remembers what it was asked for.
#[derive(Default)]
pub struct NoPacing {
    pub pauses: Vec<Pause>,
}

impl Pacer for NoPacing {
    fn pause(&mut self, pause: Pause) {
        self.pauses.push(pause);
    }
}

/// Serves canned pages by URL; unknown URLs fail like a 404.
#[derive(Default)]
pub struct FakeFetcher {
    pub pages: HashMap<String, String>,
    pub requests: Vec<(String, FetchMode)>,
    pub releases: usize,
}

impl FakeFetcher {
    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(&mut self, url: &str, mode: FetchMode) -> Result<String, FetchError> {
        self.requests.push((url.to_string(), mode));
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Http {
            status: 404,
            url: url.to_string(),
        })
    }

    fn release_session(&mut self) {
        self.releases += 1;
    }
}

pub fn get(uri: &str) -> Request {
    http::Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn body_bytes(resp: &mut Response) -> Vec<u8> {
    let mut bytes = Vec::new();
    resp.body_mut().reader().read_to_end(&mut bytes).unwrap();
    bytes
}

pub fn body_string(resp: &mut Response) -> String {
    String::from_utf8(body_bytes(resp)).unwrap()
}
