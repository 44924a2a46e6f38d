// scheduler.rs
use crate::batch::{BatchError, BatchWriter};
use crate::scraper::discovery::{extract_links, max_page_count, page_url};
use crate::scraper::extractor::Extractor;
use crate::scraper::fetcher::{FetchMode, Fetcher, PartitionSession};
use crate::scraper::{FetchError, ParseError};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("fetching results page failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("results page could not be read: {0}")]
    Parse(#[from] ParseError),
    #[error("flushing batch failed: {0}")]
    Flush(#[from] BatchError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub fn secs(min: f64, max: f64) -> Self {
        Self {
            min: Duration::from_secs_f64(min),
            max: Duration::from_secs_f64(max),
        }
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingConfig {
    pub page: DelayRange,
    pub detail: DelayRange,
    pub partition: DelayRange,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            page: DelayRange::secs(3.0, 5.0),
            detail: DelayRange::secs(0.8, 1.5),
            partition: DelayRange::secs(10.0, 20.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    Page,
    Detail,
    Partition,
}

/// Politeness delays between requests.
pub trait Pacer {
    fn pause(&mut self, pause: Pause);
}

impl<P: Pacer + ?Sized> Pacer for &mut P {
    fn pause(&mut self, pause: Pause) {
        (**self).pause(pause)
    }
}

pub struct RandomPacer {
    config: PacingConfig,
}

impl RandomPacer {
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }
}

impl Pacer for RandomPacer {
    fn pause(&mut self, pause: Pause) {
        let range = match pause {
            Pause::Page => self.config.page,
            Pause::Detail => self.config.detail,
            Pause::Partition => self.config.partition,
        };
        std::thread::sleep(range.sample());
    }
}

/// Where partitions live on the site.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Results URL with a `{district}` placeholder.
    pub search_url_template: String,
    /// Base for relative listing links.
    pub origin: Url,
}

impl CrawlSettings {
    pub fn partition_url(&self, district: &str) -> String {
        self.search_url_template.replace("{district}", district)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionReport {
    pub district: String,
    pub pages: u32,
    pub links: usize,
    pub records: usize,
    pub skipped: usize,
}

#[derive(Debug)]
pub enum PartitionOutcome {
    Done(PartitionReport),
    Failed { district: String, error: PartitionError },
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<PartitionOutcome>,
    pub interrupted: bool,
}

impl RunSummary {
    fn done(&self) -> impl Iterator<Item = &PartitionReport> {
        self.outcomes.iter().filter_map(|o| match o {
            PartitionOutcome::Done(report) => Some(report),
            PartitionOutcome::Failed { .. } => None,
        })
    }

    pub fn pages(&self) -> u32 {
        self.done().map(|r| r.pages).sum()
    }

    pub fn records(&self) -> usize {
        self.done().map(|r| r.records).sum()
    }

    pub fn failed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                PartitionOutcome::Failed { district, .. } => Some(district.as_str()),
                PartitionOutcome::Done(_) => None,
            })
            .collect()
    }
}

/// Walks partitions one after the other: results pages through the browser,
/// detail pages over plain HTTP, one batch flush per results page.
pub struct PartitionScheduler<F: Fetcher, E: Extractor, P: Pacer> {
    fetcher: F,
    extractor: E,
    pacer: P,
    writer: BatchWriter,
    settings: CrawlSettings,
    stop: Arc<AtomicBool>,
}

impl<F: Fetcher, E: Extractor, P: Pacer> PartitionScheduler<F, E, P> {
    pub fn new(fetcher: F, extractor: E, pacer: P, writer: BatchWriter, settings: CrawlSettings) -> Self {
        Self {
            fetcher,
            extractor,
            pacer,
            writer,
            settings,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked before every partition; set it to stop the run.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn run(&mut self, districts: &[String]) -> RunSummary {
        let mut summary = RunSummary::default();
        info!(partitions = districts.len(), file = %self.writer.path().display(), "starting scrape");

        for (i, district) in districts.iter().enumerate() {
            if i > 0 {
                self.pacer.pause(Pause::Partition);
            }
            if self.stop.load(Ordering::SeqCst) {
                warn!(%district, "stopped by the user");
                summary.interrupted = true;
                break;
            }

            match self.scrape_partition(district) {
                Ok(report) => {
                    info!(
                        %district,
                        pages = report.pages,
                        records = report.records,
                        skipped = report.skipped,
                        "partition done"
                    );
                    summary.outcomes.push(PartitionOutcome::Done(report));
                }
                Err(e) => {
                    error!(%district, error = %e, "partition failed");
                    summary.outcomes.push(PartitionOutcome::Failed {
                        district: district.clone(),
                        error: e,
                    });
                }
            }
        }

        info!(
            pages = summary.pages(),
            records = summary.records(),
            failed = summary.failed().len(),
            "scrape finished"
        );
        summary
    }

    pub fn scrape_partition(&mut self, district: &str) -> Result<PartitionReport, PartitionError> {
        let base_url = self.settings.partition_url(district);
        info!(%district, url = %base_url, "starting partition");

        let mut session = PartitionSession::open(&mut self.fetcher);
        let first_page = session.fetch(&base_url, FetchMode::Rendered)?;
        let max_pages = max_page_count(&first_page)?;
        info!(%district, max_pages, "pages found");

        let mut report = PartitionReport {
            district: district.to_string(),
            ..Default::default()
        };

        for page in 1..=max_pages {
            let html = if page == 1 {
                first_page.clone()
            } else {
                self.pacer.pause(Pause::Page);
                session.fetch(&page_url(&base_url, page), FetchMode::Rendered)?
            };
            info!(%district, page, max_pages, "results page");
            report.pages += 1;

            let mut links: Vec<String> = extract_links(&html, &self.settings.origin)?
                .into_iter()
                .collect();
            links.sort();
            if links.is_empty() {
                warn!(%district, page, "no links on the page");
                continue;
            }
            report.links += links.len();

            let mut batch = Vec::with_capacity(links.len());
            for (i, link) in links.iter().enumerate() {
                if i > 0 {
                    self.pacer.pause(Pause::Detail);
                }

                let payload = match session.fetch(link, FetchMode::Static) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(url = %link, error = %e, "detail page fetch failed");
                        report.skipped += 1;
                        continue;
                    }
                };

                match self.extractor.extract(&payload, district, link) {
                    Some(record) => batch.push(record),
                    None => report.skipped += 1,
                }
            }

            let written = self.writer.append(&batch)?;
            report.records += written;
            if written > 0 {
                info!(%district, page, written, "saved offers");
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_samples_stay_in_range() {
        let range = DelayRange::secs(0.8, 1.5);
        for _ in 0..100 {
            let d = range.sample();
            assert!(d >= range.min && d <= range.max);
        }
    }

    #[test]
    fn fixed_delay_is_returned_as_is() {
        assert_eq!(DelayRange::secs(2.0, 2.0).sample(), Duration::from_secs(2));
    }

    #[test]
    fn partition_url_fills_the_district() {
        let settings = CrawlSettings {
            search_url_template: "https://x.pl/warszawa/{district}".into(),
            origin: Url::parse("https://x.pl").unwrap(),
        };
        assert_eq!(settings.partition_url("praga--polnoc"), "https://x.pl/warszawa/praga--polnoc");
    }
}
