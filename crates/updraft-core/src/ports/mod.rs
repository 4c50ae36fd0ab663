//! Collaborator ports.
//!
//! The engine core depends on two external capabilities only: a transport
//! that can fetch a URL into a local file, and a sink that delivers update
//! events to the host. Both are defined here as traits so adapters stay out
//! of the core.

mod event_sink;
mod fetcher;

pub use event_sink::{ChannelEventSink, NoopEventSink, UpdateEventSink};
pub use fetcher::Fetcher;
