pub mod connection;
pub mod flats;
pub mod scrapes;

pub use connection::{apply_schema, Database};
pub use flats::{insert_flats, load_identity_set};
