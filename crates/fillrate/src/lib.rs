#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/fillrate-analytics/fillrate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod registry;
pub mod schema;
pub mod traits;
pub mod transform;
pub mod views;

// Re-export core types
pub use cache::DerivedCache;
pub use error::{FillRateError, Result};
pub use filter::{Filter, FilterKind, FilterSet, FilteredTables};
pub use ingest::{content_hash, read_delimited, read_delimited_file};
pub use registry::{ViewInfo, ViewRegistry};
pub use traits::{ConfigurableView, View, ViewCategory, ViewConfig};
pub use transform::{DerivedTables, derive_tables};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
