//! Arkemy Dataset
//!
//! Turns one unified source file into validated per-record-type tables.
//!
//! # Pipeline
//!
//! ```text
//! file → source adapter → RawTable → Loader(schema) → Dataset + LoadReport
//!                                                        ↓
//!                                               FilterSet::apply → Table
//! ```
//!
//! Load-fatal problems are [`LoadError`]s. Everything else (dropped rows,
//! unknown record kinds, out-of-bounds values) ends up in the
//! [`LoadReport`] so it can be shown to the user as one summary.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod discovery;
pub mod error;
pub mod filter;
pub mod labels;
pub mod loader;
pub mod naming;
pub mod report;
pub mod source;
pub mod table;

pub use discovery::{
    detect_satellites, discover_datasets, select_preferred, DatasetFile, SatelliteAvailability,
};
pub use error::{FilterError, LoadError, LoadResult};
pub use filter::{
    Billability, CategoryFilter, FilterColumns, FilterOutcome, FilterSet, SkippedFilter,
    ValueRange,
};
pub use labels::{tag_columns, TagLabels, TAG_PREFIXES};
pub use loader::{Dataset, Loaded, Loader};
pub use naming::{CurrencyCode, DatasetVersion};
pub use report::{BoundViolation, DropReason, LoadReport};
pub use table::{DateWindow, RawTable, Row, Table};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for loading and filtering datasets
    pub use crate::error::{LoadError, LoadResult};
    pub use crate::filter::{Billability, CategoryFilter, FilterSet, ValueRange};
    pub use crate::loader::{Dataset, Loaded, Loader};
    pub use crate::report::LoadReport;
    pub use crate::table::{DateWindow, RawTable, Table};
}
