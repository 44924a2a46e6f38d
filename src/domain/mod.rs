pub mod filters;
pub mod flat;
pub mod identity;
pub mod listing;
pub mod stats;

pub use flat::FlatRow;
pub use listing::{Feature, ListingRecord, BATCH_COLUMNS};
