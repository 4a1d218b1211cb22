//! Headless HTTP collaborators and the command-line driver for `lazyload`.

pub mod cli;
pub mod fetcher;
pub mod headless;
pub mod less;
pub mod output;

pub use fetcher::{HttpFetcher, Probe};
pub use headless::{HeadSnapshot, HeadlessDocument};
pub use less::PassthroughLess;
