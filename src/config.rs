// config.rs
//
// Settings come from the environment, with a `.env` file loaded first when
// there is one.
use crate::scraper::browser::BrowserSettings;
use crate::scraper::fetcher::ClientConfig;
use crate::scraper::scheduler::{CrawlSettings, DelayRange, PacingConfig};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_SEARCH_URL: &str =
    "https://www.otodom.pl/pl/wyniki/sprzedaz/mieszkanie/mazowieckie/warszawa/warszawa/warszawa/{district}";
pub const DEFAULT_SITE_ORIGIN: &str = "https://www.otodom.pl";

pub const DEFAULT_DISTRICTS: [&str; 18] = [
    "bemowo",
    "bialoleka",
    "bielany",
    "mokotow",
    "ochota",
    "praga--poludnie",
    "praga--polnoc",
    "rembertow",
    "srodmiescie",
    "targowek",
    "ursus",
    "ursynow",
    "wawer",
    "wesola",
    "wilanow",
    "wlochy",
    "wola",
    "zoliborz",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost {
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("{key} is not a valid number: '{value}'")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key} must be 'min-max' seconds with min <= max, got '{value}'")]
    InvalidDelay { key: &'static str, value: String },
    #[error("{key} is not a valid URL: {source}")]
    InvalidUrl {
        key: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("FLATS_SEARCH_URL must contain a {{district}} placeholder")]
    MissingPlaceholder,
    #[error("FLATS_DISTRICTS lists no districts")]
    NoDistricts,
    #[error("{key} must be true or false, got '{value}'")]
    InvalidBool { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub store: StoreConfig,
    pub crawl: CrawlConfig,
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    /// Where batch files are written and looked up.
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub search_url_template: String,
    pub site_origin: Url,
    pub districts: Vec<String>,
    pub http_timeout: Duration,
    pub pacing: PacingConfig,
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `load` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("APP_HOST", "127.0.0.1");
        let port = var("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;
        let log_level = var("APP_LOG_LEVEL", "info");

        let search_url_template = var("FLATS_SEARCH_URL", DEFAULT_SEARCH_URL);
        if !search_url_template.contains("{district}") {
            return Err(ConfigError::MissingPlaceholder);
        }
        let site_origin = Url::parse(&var("FLATS_SITE_ORIGIN", DEFAULT_SITE_ORIGIN)).map_err(
            |source| ConfigError::InvalidUrl {
                key: "FLATS_SITE_ORIGIN",
                source,
            },
        )?;

        let districts = match lookup("FLATS_DISTRICTS") {
            Some(raw) => parse_districts(&raw)?,
            None => DEFAULT_DISTRICTS.iter().map(|d| d.to_string()).collect(),
        };

        let timeout_raw = var("FLATS_HTTP_TIMEOUT_SECS", "10");
        let http_timeout = timeout_raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidNumber {
                key: "FLATS_HTTP_TIMEOUT_SECS",
                value: timeout_raw.clone(),
            })?;

        let pacing = PacingConfig {
            page: parse_delay("FLATS_PAGE_DELAY", &var("FLATS_PAGE_DELAY", "3-5"))?,
            detail: parse_delay("FLATS_DETAIL_DELAY", &var("FLATS_DETAIL_DELAY", "0.8-1.5"))?,
            partition: parse_delay("FLATS_PARTITION_DELAY", &var("FLATS_PARTITION_DELAY", "10-20"))?,
        };

        let headless = parse_bool("FLATS_HEADLESS", &var("FLATS_HEADLESS", "true"))?;

        Ok(Self {
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            store: StoreConfig {
                db_path: PathBuf::from(var("FLATS_DB_PATH", "warsaw_flats.db")),
                data_dir: PathBuf::from(var("FLATS_DATA_DIR", ".")),
            },
            crawl: CrawlConfig {
                search_url_template,
                site_origin,
                districts,
                http_timeout,
                pacing,
                chrome_path: lookup("FLATS_CHROME_PATH")
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from),
                headless,
            },
        })
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

impl CrawlConfig {
    pub fn crawl_settings(&self) -> CrawlSettings {
        CrawlSettings {
            search_url_template: self.search_url_template.clone(),
            origin: self.site_origin.clone(),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            referer: self.site_origin.to_string(),
            timeout: self.http_timeout,
            ..ClientConfig::default()
        }
    }

    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            chrome_path: self.chrome_path.clone(),
            headless: self.headless,
            ..BrowserSettings::default()
        }
    }
}

fn parse_districts(raw: &str) -> Result<Vec<String>, ConfigError> {
    let districts: Vec<String> = raw
        .split(',')
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .collect();
    if districts.is_empty() {
        return Err(ConfigError::NoDistricts);
    }
    Ok(districts)
}

/// `"3-5"` or a single `"2"` (fixed delay), in seconds.
fn parse_delay(key: &'static str, raw: &str) -> Result<DelayRange, ConfigError> {
    let invalid = || ConfigError::InvalidDelay {
        key,
        value: raw.to_string(),
    };
    let secs = |s: &str| {
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(invalid)
    };

    let (min, max) = match raw.split_once('-') {
        Some((min, max)) => (secs(min)?, secs(max)?),
        None => {
            let v = secs(raw)?;
            (v, v)
        }
    };
    if min > max {
        return Err(invalid());
    }
    Ok(DelayRange::secs(min, max))
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = from_pairs(&[]).expect("defaults load");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.store.db_path, PathBuf::from("warsaw_flats.db"));
        assert_eq!(config.crawl.districts.len(), 18);
        assert_eq!(config.crawl.http_timeout, Duration::from_secs(10));
        assert_eq!(config.crawl.pacing, PacingConfig::default());
        assert!(config.crawl.headless);
        assert!(config.crawl.chrome_path.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = from_pairs(&[
            ("FLATS_DISTRICTS", " Wola, ochota ,,"),
            ("FLATS_PAGE_DELAY", "1-2"),
            ("FLATS_DETAIL_DELAY", "0"),
            ("FLATS_HEADLESS", "false"),
            ("FLATS_CHROME_PATH", "/usr/bin/chromium"),
        ])
        .expect("config loads");
        assert_eq!(config.crawl.districts, vec!["wola", "ochota"]);
        assert_eq!(config.crawl.pacing.page, DelayRange::secs(1.0, 2.0));
        assert_eq!(config.crawl.pacing.detail, DelayRange::secs(0.0, 0.0));
        assert!(!config.crawl.headless);
        assert_eq!(
            config.crawl.browser_settings().chrome_path,
            Some(PathBuf::from("/usr/bin/chromium"))
        );
    }

    #[test]
    fn inverted_delay_is_rejected() {
        let err = from_pairs(&[("FLATS_PARTITION_DELAY", "20-10")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDelay { key: "FLATS_PARTITION_DELAY", .. }));
    }

    #[test]
    fn search_url_needs_placeholder() {
        let err = from_pairs(&[("FLATS_SEARCH_URL", "https://x.pl/wola")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPlaceholder));
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(matches!(
            from_pairs(&[("APP_PORT", "70000")]).unwrap_err(),
            ConfigError::InvalidPort
        ));
    }

    #[test]
    fn crawl_settings_build_partition_urls() {
        let config = from_pairs(&[]).unwrap();
        let settings = config.crawl.crawl_settings();
        assert!(settings.partition_url("wola").ends_with("/warszawa/wola"));
        assert_eq!(config.crawl.client_config().referer, "https://www.otodom.pl/");
    }

    #[test]
    fn load_reads_process_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load();
        env::remove_var("APP_HOST");

        let addr = config.expect("config loads").server.socket_addr().expect("localhost resolves");
        assert_eq!(addr.ip(), IpAddr::from([127, 0, 0, 1]));
    }
}
