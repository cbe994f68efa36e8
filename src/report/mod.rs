//! Aggregation tree built from normalised events, and its ordering.

pub mod aggregate;
pub mod order;

pub use aggregate::{aggregate, summarize};
pub use order::{default_order, order_report, Direction, Metric, OrderSpec, SortKey};
