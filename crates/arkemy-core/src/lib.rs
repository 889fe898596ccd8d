//! Arkemy Core
//!
//! Application-level glue around the pipeline crates.
//!
//! # Architecture
//!
//! ```text
//! AppConfig ──► Session ──► LoadCache ──► Loader(schema)
//!                  │
//!                  └──► snapshot() : Arc<Dataset> ──► filters / analytics
//! ```
//!
//! The session is the only place a dataset is replaced. Everything
//! downstream works on snapshots.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod config;
pub mod error;
pub mod session;

pub use cache::{CacheStats, CachedLoad, LoadCache, LoadKey};
pub use config::{AppConfig, DEFAULT_LOAD_CACHE_CAPACITY, DEFAULT_SEARCH_PATHS};
pub use error::{ArkemyError, ArkemyResult};
pub use session::Session;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for applications
    pub use crate::config::AppConfig;
    pub use crate::error::{ArkemyError, ArkemyResult};
    pub use crate::session::Session;
}
