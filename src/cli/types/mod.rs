//! Type-safe wrappers and enums for CLI arguments.

pub mod dataset;
pub mod filters;

pub use dataset::Dataset;
pub use filters::{Filters, SortOrder};
