//! Three-way set diff between two manifests' asset catalogs.

use std::collections::HashMap;

use super::document::{AssetRecord, Manifest};

/// The kind of difference one asset exhibits between two catalogs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffKind {
    /// Present in the other catalog only.
    Added,
    /// Present in this catalog only.
    Deleted,
    /// Present in both with a different content hash.
    Modified,
}

/// Difference for one asset, keyed by file name in the diff map.
///
/// Produced transiently by [`Manifest::diff`]; never persisted. `Deleted`
/// carries this catalog's record, `Added` and `Modified` carry the other
/// catalog's (the record that describes what to download).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetDiff {
    /// The relevant asset record.
    pub asset: AssetRecord,
    /// What changed.
    pub kind: DiffKind,
}

impl Manifest {
    /// Compute the per-asset differences between this catalog and `other`.
    ///
    /// Hash-map membership in both directions, O(|self| + |other|); unchanged
    /// assets are absent from the result and the returned map carries no
    /// meaningful iteration order.
    #[must_use]
    pub fn diff(&self, other: &Self) -> HashMap<String, AssetDiff> {
        let mut diffs = HashMap::new();

        for (name, record) in self.assets() {
            match other.assets().get(name) {
                None => {
                    diffs.insert(
                        name.clone(),
                        AssetDiff {
                            asset: record.clone(),
                            kind: DiffKind::Deleted,
                        },
                    );
                }
                Some(theirs) if theirs.md5 != record.md5 => {
                    diffs.insert(
                        name.clone(),
                        AssetDiff {
                            asset: theirs.clone(),
                            kind: DiffKind::Modified,
                        },
                    );
                }
                Some(_) => {}
            }
        }

        for (name, record) in other.assets() {
            if !self.assets().contains_key(name) {
                diffs.insert(
                    name.clone(),
                    AssetDiff {
                        asset: record.clone(),
                        kind: DiffKind::Added,
                    },
                );
            }
        }

        diffs
    }
}
