//! The contract between the client and the types it decodes.
//!
//! A `Resource` is one remote entity decoded from a JSON payload. The client
//! only needs to know how to name it in errors and logs; everything else is
//! serde. Resources that live in a collection under the project also
//! implement `ProjectResource`, which gives the path segment to fetch from.

use std::fmt;

use serde::de::DeserializeOwned;

use super::error::{ApiError, Result};

/// A typed, read-only view of one remote entity.
pub trait Resource: DeserializeOwned + fmt::Display {
    /// Human-readable kind, used in error messages (e.g. "story").
    const KIND: &'static str;

    /// The remote identifier.
    fn id(&self) -> u64;

    /// A deterministic summary of the known attributes, for diagnostics.
    ///
    /// Not a stable serialization format.
    fn to_display_string(&self) -> String {
        self.to_string()
    }
}

/// A resource fetched from a collection under the project.
pub trait ProjectResource: Resource {
    /// The collection path segment, relative to `projects/{id}/`.
    const COLLECTION: &'static str;
}

/// Decode one resource from a response body.
pub(crate) fn decode<R: Resource>(body: &str) -> Result<R> {
    serde_json::from_str(body)
        .map_err(|e| ApiError::Schema(format!("failed to decode {}: {}", R::KIND, e)))
}

/// Decode a JSON array of resources, preserving the order of the payload.
pub(crate) fn decode_list<R: Resource>(body: &str) -> Result<Vec<R>> {
    serde_json::from_str(body)
        .map_err(|e| ApiError::Schema(format!("failed to decode {} list: {}", R::KIND, e)))
}
