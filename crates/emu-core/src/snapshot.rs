//! Opaque context save and restore.
//!
//! Cores serialise their complete internal state with `serde` and pack it
//! as MessagePack. The blob is only meant to round-trip within the same
//! build; it is not a stable file format.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Failure to save or restore a context blob.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to encode context: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("failed to decode context: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("context was saved by a {found}, cannot restore into a {expected}")]
    ModelMismatch { expected: String, found: String },
}

/// A component whose full state can be captured and restored.
///
/// Restoring a context and continuing produces exactly the same bus traffic
/// as the original run would have from the point of the save.
pub trait Snapshot {
    /// Capture the complete internal state.
    fn save_context(&self) -> Result<Vec<u8>, SnapshotError>;

    /// Replace the internal state with a previously saved one. On error the
    /// component is left unchanged.
    fn restore_context(&mut self, blob: &[u8]) -> Result<(), SnapshotError>;
}

/// Encode a context struct.
pub fn encode<T: Serialize>(context: &T) -> Result<Vec<u8>, SnapshotError> {
    Ok(rmp_serde::to_vec_named(context)?)
}

/// Decode a context struct.
pub fn decode<T: DeserializeOwned>(blob: &[u8]) -> Result<T, SnapshotError> {
    Ok(rmp_serde::from_slice(blob)?)
}
