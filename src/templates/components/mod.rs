pub mod card;
pub mod error;

pub use card::{card, kpi};
pub use error::error_page;
