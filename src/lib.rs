//! Parser and statistics engine for German "Kampfbericht" battle reports.
//!
//! [`analyse`] turns a raw report into battles, a participant roster, loot
//! ledgers, defeat counts and a grouped [`Report`](models::Report) tree that
//! [`order_report`](report::order_report) can sort level by level.

pub mod api;
pub mod error;
pub mod models;
pub mod options;
pub mod parser;
pub mod report;

pub use error::{KampfberichtError, Result};
pub use options::ReportOptions;
pub use parser::analyse;
