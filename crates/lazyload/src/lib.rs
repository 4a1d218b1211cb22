//! Asynchronous asset injection for JavaScript, CSS and LESS.
//!
//! A [`Loader`] takes request strings such as `"app.js < jquery.js|jquery-local.js"`,
//! injects every asset into a [`Document`] in dependency order, falls back to
//! alternate addresses when a load fails, skips paths that were already
//! requested, and reports once the whole batch has settled.
//!
//! ```ignore
//! let loader = Loader::builder(document).build();
//! loader.load(["widget.js < jquery.js", "theme.css"], |report| {
//!     assert!(report.all_satisfied());
//! });
//! ```

pub mod classify;
pub mod config;
pub mod detect;
pub mod document;
pub mod element;
pub mod error;
pub mod fallback;
pub mod ledger;
pub mod less;
pub mod loader;
pub mod net;
pub mod outcome;
pub mod request;
pub mod retry;
pub mod sequence;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use classify::{classify, AssetDescriptor, AssetKind};
pub use config::{ConfigError, LoaderConfig, RetryConfig};
pub use document::{Document, ElementEvent, ElementId, EventStream, ReadyState};
pub use element::{Element, ElementFactory, LESS_CONTAINER_ID};
pub use error::{LoadError, TransportCause};
pub use ledger::Ledger;
pub use less::{CompileError, LessCompiler};
pub use loader::{BatchReport, EntryReport, Loader, LoaderBuilder};
pub use net::{FetchError, Fetcher};
pub use outcome::Outcome;
pub use request::{AssetRequest, AssetSpec, IntoRequests};
pub use retry::{Attempts, PollOutcome, RetryPolicy};
