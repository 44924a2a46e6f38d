pub mod browser;
pub mod discovery;
pub mod extractor;
pub mod fetcher;
pub mod models;
pub mod scheduler;
mod scraper_error;

pub use extractor::NextDataExtractor;
pub use fetcher::HttpFetcher;
pub use scheduler::{PartitionScheduler, RandomPacer};
pub use scraper_error::{FetchError, ParseError};
