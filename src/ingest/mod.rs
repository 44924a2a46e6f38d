// Incremental loading of batch files into the store.
mod loader;

pub use loader::{load, LoadFileError, LoadSummary};
