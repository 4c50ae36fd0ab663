//! Transport adapters implementing the [`updraft_core::Fetcher`] port.

mod http;

pub use http::HttpFetcher;
