//! Record normalization
//!
//! - `flatten`: nested JSON records to single-level rows
//! - `table`: column union over a set of rows

pub mod flatten;
pub mod table;

pub use flatten::{flatten, FlatRow};
pub use table::Table;
