use std::path::PathBuf;

use crate::ids::{LocationId, ObjectId};

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while loading, validating or editing a world.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A file could not be read or written.
    #[error("cannot access {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A file contained malformed JSON or unexpected fields.
    #[error("malformed {what}: {source}")]
    Json {
        /// What was being parsed (file path or description).
        what: String,
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// Two records of the same kind share an ID.
    #[error("duplicate {kind} id {id}")]
    DuplicateId {
        /// The record kind ("location", "road type", ...).
        kind: &'static str,
        /// The duplicated ID.
        id: i32,
    },

    /// The tile layers of one location have different lengths.
    #[error("location {location}: layer {layer} has {actual} tiles, expected {expected}")]
    LayerMismatch {
        /// The inconsistent location.
        location: LocationId,
        /// The offending layer name.
        layer: &'static str,
        /// Width of the road layer.
        expected: usize,
        /// Width of the offending layer.
        actual: usize,
    },

    /// A record refers to a location that does not exist.
    #[error("{owner} refers to unknown location {location}")]
    UnknownLocation {
        /// Description of the referring record.
        owner: String,
        /// The missing location.
        location: LocationId,
    },

    /// The requested object does not exist.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),
}
