// fetcher.rs
use crate::scraper::browser::{BrowserSession, BrowserSettings};
use crate::scraper::FetchError;
use reqwest::blocking::{Client, ClientBuilder};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, REFERER};
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Plain HTTP GET. Enough for detail pages.
    Static,
    /// Headless browser. Results pages need it for the pagination control.
    Rendered,
}

/// Identification headers and timeout for static requests. Built by the caller
/// and handed to the fetcher.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub referer: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            accept_language: "pl-PL,pl;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
            referer: "https://www.otodom.pl/".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    pub fn build_client(&self) -> Result<Client, FetchError> {
        self.builder()?
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))
    }

    fn builder(&self) -> Result<ClientBuilder, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&self.accept_language)
                .map_err(|e| FetchError::Client(e.to_string()))?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(&self.referer).map_err(|e| FetchError::Client(e.to_string()))?,
        );

        Ok(Client::builder()
            .user_agent(self.user_agent.clone())
            .default_headers(headers)
            .timeout(self.timeout))
    }
}

pub trait Fetcher {
    fn fetch(&mut self, url: &str, mode: FetchMode) -> Result<String, FetchError>;

    /// Quit the browser session opened by rendered fetches, if any.
    fn release_session(&mut self);
}

impl<F: Fetcher + ?Sized> Fetcher for &mut F {
    fn fetch(&mut self, url: &str, mode: FetchMode) -> Result<String, FetchError> {
        (**self).fetch(url, mode)
    }

    fn release_session(&mut self) {
        (**self).release_session()
    }
}

/// Scope of one partition's browser session. Whatever way the partition ends,
/// dropping the guard releases the session.
pub struct PartitionSession<'a, F: Fetcher + ?Sized> {
    fetcher: &'a mut F,
}

impl<'a, F: Fetcher + ?Sized> PartitionSession<'a, F> {
    pub fn open(fetcher: &'a mut F) -> Self {
        Self { fetcher }
    }

    pub fn fetch(&mut self, url: &str, mode: FetchMode) -> Result<String, FetchError> {
        self.fetcher.fetch(url, mode)
    }
}

impl<F: Fetcher + ?Sized> Drop for PartitionSession<'_, F> {
    fn drop(&mut self) {
        self.fetcher.release_session();
    }
}

/// Production fetcher: reqwest for static pages, Chrome for rendered ones.
pub struct HttpFetcher {
    client: Client,
    browser: BrowserSettings,
    session: Option<BrowserSession>,
}

impl HttpFetcher {
    pub fn new(config: &ClientConfig, browser: BrowserSettings) -> Result<Self, FetchError> {
        Ok(Self {
            client: config.build_client()?,
            browser,
            session: None,
        })
    }

    fn fetch_static(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::from_reqwest(e, url))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        resp.text().map_err(|e| FetchError::from_reqwest(e, url))
    }

    fn fetch_rendered(&mut self, url: &str) -> Result<String, FetchError> {
        if self.session.is_none() {
            debug!("launching browser session");
            self.session = Some(BrowserSession::launch(&self.browser)?);
        }

        match self.session.as_mut() {
            Some(session) => session.render(url),
            None => Err(FetchError::Browser("no browser session".into())),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&mut self, url: &str, mode: FetchMode) -> Result<String, FetchError> {
        match mode {
            FetchMode::Static => self.fetch_static(url),
            FetchMode::Rendered => self.fetch_rendered(url),
        }
    }

    fn release_session(&mut self) {
        if let Some(session) = self.session.take() {
            debug!("closing browser session");
            session.quit();
        }
    }
}
