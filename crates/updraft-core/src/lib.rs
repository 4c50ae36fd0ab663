//! Core domain types and port definitions for the updraft content-update
//! engine.
//!
//! This crate holds everything the engine and its host share: the manifest
//! document model with its diff/resume operations, the typed event stream,
//! the error taxonomy, the update state table, and the collaborator ports
//! (transport fetcher, event sink). It performs no network IO; the engine
//! crate wires these pieces together.

pub mod manifest;
pub mod ports;
pub mod update;

// Re-export commonly used types for convenience
pub use manifest::{AssetDiff, AssetRecord, DiffKind, DownloadState, Manifest};
pub use ports::{ChannelEventSink, Fetcher, NoopEventSink, UpdateEventSink};
pub use update::{
    DownloadUnit, EventCode, MANIFEST_ID, StateInput, UpdateError, UpdateEvent, UpdateResult,
    UpdateState, VERSION_ID,
};
