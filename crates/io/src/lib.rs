//! `consigno-io` — durable cluster snapshot store, the fixed-column
//! CSV export/import surface for spreadsheet consumers, and the
//! archive cache for frozen sub-group results.

pub mod archive;
pub mod error;
pub mod sheet;
pub mod store;

pub use archive::{ArchiveCache, FileArchiveCache};
pub use error::IoError;
pub use sheet::{read_sheet, write_sheet, SHEET_HEADER};
pub use store::ClusterStore;
