// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for loading, property queries, and subset operations
//!
//! "Nothing under the cursor" is not an error; it is `None` wherever a pick
//! result is returned.

use crate::{ExpressId, ModelId, SubsetHandle};
use thiserror::Error;

/// Errors raised while decoding a model file
#[derive(Error, Debug)]
pub enum LoadError {
    /// Input is not a model bundle
    #[error("Invalid model format: {0}")]
    InvalidFormat(String),

    /// Bundle version this build cannot read
    #[error("Unsupported bundle version: {0}")]
    UnsupportedVersion(u32),

    /// Input ended before the declared content
    #[error("Model data truncated at byte {0}")]
    Truncated(usize),

    /// Geometry or element index is internally inconsistent
    #[error("Invalid element index: {0}")]
    InvalidIndex(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Create a new format error
    pub fn format(msg: impl Into<String>) -> Self {
        LoadError::InvalidFormat(msg.into())
    }

    /// Create a new index error
    pub fn index(msg: impl Into<String>) -> Self {
        LoadError::InvalidIndex(msg.into())
    }
}

/// Errors raised by a property store query
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    /// No properties are registered for the model
    #[error("No property data for {0}")]
    UnknownModel(ModelId),

    /// The referenced item does not exist in the model
    #[error("Item {id} not found in {model}")]
    MissingItem { model: ModelId, id: ExpressId },

    /// Backend failure
    #[error("Property store error: {0}")]
    Store(String),
}

/// Errors raised by the subset creation primitive
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubsetError {
    /// Element and model disagree on the owning model
    #[error("Element belongs to {element} but subset was requested on {model}")]
    ModelMismatch { element: ModelId, model: ModelId },

    /// Element has no triangles to build an overlay from
    #[error("Element {0} has no geometry")]
    EmptyGeometry(ExpressId),

    /// Release of a subset the renderer no longer tracks
    #[error("Unknown subset {0:?}")]
    UnknownSubset(SubsetHandle),

    /// Renderer-side failure (resource exhaustion etc.)
    #[error("Renderer error: {0}")]
    Renderer(String),
}

/// Interaction-level failures
///
/// Handlers return these to the caller after leaving every highlight channel
/// in a valid state.
#[derive(Error, Debug)]
pub enum InteractionError {
    /// Picked triangle has no element mapping (decoding inconsistency)
    #[error("Triangle {triangle} of {model} has no element mapping")]
    UnresolvedElement { model: ModelId, triangle: u32 },

    /// Deep property resolution failed
    #[error("Property fetch failed: {0}")]
    PropertyFetch(#[from] PropertyError),

    /// Model file could not be decoded
    #[error("Load failed: {0}")]
    Load(#[from] LoadError),

    /// Overlay subset could not be created or released
    #[error("Subset operation failed: {0}")]
    SubsetOperation(#[from] SubsetError),
}

/// Result type alias for interaction operations
pub type Result<T> = std::result::Result<T, InteractionError>;
