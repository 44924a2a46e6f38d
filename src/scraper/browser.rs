// browser.rs
//
// Blocking facade over chromiumoxide. The session owns a single-threaded tokio
// runtime and drives every browser call through `block_on`, so the rest of the
// crate stays synchronous.
use crate::scraper::discovery::PAGINATION_SELECTOR;
use crate::scraper::fetcher::USER_AGENT;
use crate::scraper::FetchError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const COOKIE_ACCEPT_SELECTOR: &str = "#onetrust-accept-btn-handler";
const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    /// Upper bound for the cookie banner to show up.
    pub consent_wait: Duration,
    /// Upper bound for the pagination control to render.
    pub pagination_wait: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            consent_wait: Duration::from_secs(5),
            pagination_wait: Duration::from_secs(5),
        }
    }
}

pub struct BrowserSession {
    runtime: Runtime,
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    page: Page,
    settings: BrowserSettings,
    consent: ConsentOnce,
}

/// The cookie banner is looked for on the first results page of a session
/// only, whether or not it shows up there.
#[derive(Debug, Default)]
struct ConsentOnce {
    attempted: bool,
}

impl ConsentOnce {
    /// True the first time it is called.
    fn take(&mut self) -> bool {
        !std::mem::replace(&mut self.attempted, true)
    }
}

fn browser_err(e: impl std::fmt::Display) -> FetchError {
    FetchError::Browser(e.to_string())
}

impl BrowserSession {
    pub fn launch(settings: &BrowserSettings) -> Result<Self, FetchError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(browser_err)?;

        let mut builder = BrowserConfig::builder()
            .arg(format!("--user-agent={USER_AGENT}"))
            .arg("--log-level=3")
            .arg("--disable-sync")
            .arg("--disable-blink-features=AutomationControlled");
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(browser_err)?;

        let (browser, handler, page) = runtime.block_on(async {
            let (browser, mut handler) = Browser::launch(config).await.map_err(browser_err)?;
            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });
            let page = browser.new_page("about:blank").await.map_err(browser_err)?;
            Ok::<_, FetchError>((browser, handler, page))
        })?;

        info!("browser session started");

        Ok(Self {
            runtime,
            browser: Some(browser),
            handler: Some(handler),
            page,
            settings: settings.clone(),
            consent: ConsentOnce::default(),
        })
    }

    /// Navigate to `url` and return the rendered HTML once the pagination
    /// control is there, or once the bounded wait for it ran out.
    pub fn render(&mut self, url: &str) -> Result<String, FetchError> {
        let page = &self.page;
        let settings = &self.settings;
        let handle_consent = self.consent.take();

        let html = self.runtime.block_on(async {
            page.goto(url).await.map_err(browser_err)?;

            if handle_consent {
                match wait_for(page, COOKIE_ACCEPT_SELECTOR, settings.consent_wait).await {
                    Some(button) => {
                        if let Err(e) = button.click().await {
                            warn!(error = %e, "could not dismiss cookie banner");
                        }
                    }
                    None => debug!("no cookie banner"),
                }
            }

            // Pagination is rendered lazily at the bottom of the page.
            if let Err(e) = page
                .evaluate("window.scrollTo(0, document.body.scrollHeight);")
                .await
            {
                debug!(error = %e, "scroll failed");
            }
            if wait_for(page, PAGINATION_SELECTOR, settings.pagination_wait)
                .await
                .is_none()
            {
                debug!(%url, "no pagination control, single page");
            }

            let html = page.content().await.map_err(browser_err)?;
            Ok::<_, FetchError>(html)
        })?;

        Ok(html)
    }

    pub fn quit(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(mut browser) = self.browser.take() else {
            return;
        };

        self.runtime.block_on(async {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "browser close failed");
            }
            if let Err(e) = browser.wait().await {
                warn!(error = %e, "browser did not exit cleanly");
            }
        });

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        info!("browser session closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn wait_for(page: &Page, selector: &str, timeout: Duration) -> Option<Element> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Some(element);
        }
        if Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
