//! Error types for the state layer.

/// Errors that can occur while snapshotting state or applying diffs.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Converting a snapshot to or from its serialized form failed.
    #[error("snapshot conversion failed: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// A diff edit referenced a path that does not exist in the snapshot
    /// it is being applied to.
    #[error("path {0} not found in snapshot")]
    PathNotFound(String),

    /// A diff edit is inconsistent with the snapshot at its path
    /// (wrong container type, out-of-range index, missing insert position).
    #[error("cannot apply edit at {path}: {reason}")]
    InvalidEdit { path: String, reason: String },
}
