//! The updraft update engine.
//!
//! Wires the domain model from `updraft-core` into a running system: a
//! concurrent [`orchestrator::DownloadOrchestrator`] that executes fetches,
//! the [`updater::AssetsUpdater`] actor that drives the check → diff →
//! download → finalize cycle, and a default [`fetcher::HttpFetcher`]
//! transport adapter.
//!
//! Hosts construct an [`updater::AssetsUpdater`] with a fetcher and an event
//! sink, call its fire-and-forget operations, and consume the typed event
//! stream.

pub mod fetcher;
pub mod orchestrator;
pub mod updater;

pub use fetcher::HttpFetcher;
pub use orchestrator::{DownloadOrchestrator, DownloadOutcome};
pub use updater::{AssetsUpdater, UpdaterConfig, UpdaterSnapshot};
