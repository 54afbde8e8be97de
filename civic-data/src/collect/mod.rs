//! Count-then-page collection of offset-paginated datasets.
//!
//! A [`PaginatedCollector`] first asks the endpoint how many records match
//! (`$select=count(field)`), then walks `$limit`/`$offset` pages through the
//! resilient fetcher until that many records have been gathered or the
//! endpoint runs dry. The collected records never exceed the count, and any
//! unrecoverable failure aborts the whole collection.

mod collector;
mod page;
mod run;

#[doc(hidden)]
pub mod test_support;

pub use collector::{CollectError, CollectionRequest, PaginatedCollector, SetupError};
pub use page::CountProblem;
pub use run::CollectionRun;
