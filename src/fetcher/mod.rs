//! Default page fetchers
//!
//! `HttpFetcher` for static pages, `ChromiumFetcher` for pages that need
//! JavaScript, and `HybridFetcher` to choose between them per request.

pub mod browser;
pub mod http;
pub mod hybrid;

pub use browser::{ChromiumFetcher, download_managed_browser, find_browser_executable};
pub use http::HttpFetcher;
pub use hybrid::HybridFetcher;
