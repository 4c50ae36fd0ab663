//! Manifest documents: the versioned asset catalog and its diff operations.

mod diff;
mod document;

pub use diff::{AssetDiff, DiffKind};
pub use document::{AssetRecord, DownloadState, Manifest};
