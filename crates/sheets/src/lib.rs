//! Row-oriented tabular storage addressed with A1 ranges.
//!
//! The [`SheetStore`] port is what the record store talks to. Three backends
//! implement it: an in-process [`MemoryWorkbook`], the Google Sheets REST API
//! ([`GoogleSheets`]) and a PostgreSQL emulation ([`PgWorkbook`]).

pub mod error;
pub mod google;
pub mod memory;
pub mod postgres;
pub mod range;
pub mod store;

pub use error::SheetsError;
pub use google::{GoogleSheets, ServiceAccount};
pub use memory::MemoryWorkbook;
pub use postgres::PgWorkbook;
pub use range::{column_index, column_letters, A1Range, CellRef, RangeError};
pub use store::{Row, SheetStore, ValueRange};
