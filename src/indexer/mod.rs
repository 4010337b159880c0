pub mod discovery;
pub mod error;
pub mod query;
pub mod rows;

pub use discovery::{DiscoveredTable, TableDiscovery};
pub use error::IndexerError;
pub use query::{EventFilter, IndexerQueries};
