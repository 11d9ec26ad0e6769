//! `consigno-sources` — cost-report source adapters.
//!
//! Each configured group has one cost source: a portal receipts
//! export, the deals-group HTTP API, a deals or commission site CSV
//! export, or a local CSV folder. The crate normalizes whatever the
//! source reports into the engine's [`consigno_engine::ReconResult`],
//! with bounded retries around every upstream touch.

pub mod api;
pub mod dispatch;
pub mod error;
pub mod fetcher;
pub mod normalize;
pub mod retry;
pub mod upload;

pub use api::DealsApiClient;
pub use dispatch::{fetch_group_costs, GroupSource, SourceKind};
pub use error::SourceError;
pub use fetcher::{CsvFolderFetcher, CsvRow, RowFetcher};
pub use retry::{with_retry, RetryError, COST_FETCH_ATTEMPTS, UPLOAD_ATTEMPTS};
pub use upload::{upload_all, Uploader};
