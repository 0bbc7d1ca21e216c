pub mod aggregator;
pub mod categories;
pub mod session;

pub use aggregator::{AggregateResult, CategoryAggregator, CategoryOutcome, CategoryRequest};
pub use categories::{browse_requests, category_key, TRENDING_KEY, TRENDING_TITLE};
pub use session::{BrowseSession, BrowseSnapshot, RunStatus};
