// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Collaborator traits for loading and overlay rendering

use crate::{DecodedModel, ExpressId, LoadError, Model, SubsetError};
use serde::{Deserialize, Serialize};

/// Decodes an input file into geometry plus element index
pub trait ModelLoader: Send + Sync {
    /// Decode raw file content
    ///
    /// # Arguments
    /// * `name` - Source name recorded on the model (usually the file name)
    /// * `bytes` - The file content
    fn load(&self, name: &str, bytes: &[u8]) -> Result<DecodedModel, LoadError>;

    /// Read and decode a file from disk
    fn load_path(&self, path: &std::path::Path) -> Result<DecodedModel, LoadError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.load(&name, &bytes)
    }
}

/// Overlay material
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighlightMaterial {
    /// RGB color, 0.0-1.0
    pub color: [f32; 3],
    /// Opacity, 0.0-1.0
    pub opacity: f32,
    /// Whether the overlay is hidden behind nearer geometry
    #[serde(default)]
    pub depth_test: bool,
}

impl HighlightMaterial {
    /// Translucent red used while hovering
    pub fn hover() -> Self {
        Self {
            color: [1.0, 0.0, 0.0],
            opacity: 0.3,
            depth_test: false,
        }
    }

    /// Blue used for the selected element
    pub fn selection() -> Self {
        Self {
            color: [0.0, 0.0, 1.0],
            opacity: 0.7,
            depth_test: false,
        }
    }

    /// Color with opacity as alpha
    pub fn rgba(&self) -> [f32; 4] {
        [self.color[0], self.color[1], self.color[2], self.opacity]
    }
}

/// Opaque renderer-side identity of a live overlay
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubsetHandle(pub u64);

/// Everything a renderer needs to build an overlay
#[derive(Clone, Copy, Debug)]
pub struct SubsetRequest<'a> {
    /// Model whose geometry the overlay is cut from
    pub model: &'a Model,
    /// Elements covered by the overlay
    pub ids: &'a [ExpressId],
    pub material: &'a HighlightMaterial,
}

/// Subset creation primitive
///
/// Creates overlay meshes cut from a model's geometry and releases them.
/// Releasing must detach the overlay from the scene *and* free the
/// renderer-side resources it holds.
pub trait SubsetRenderer {
    /// Build an overlay and attach it to the scene
    fn create_subset(&mut self, request: SubsetRequest<'_>) -> Result<SubsetHandle, SubsetError>;

    /// Detach an overlay and release its resources
    fn remove_subset(&mut self, handle: SubsetHandle) -> Result<(), SubsetError>;
}

impl<R: SubsetRenderer + ?Sized> SubsetRenderer for &mut R {
    fn create_subset(&mut self, request: SubsetRequest<'_>) -> Result<SubsetHandle, SubsetError> {
        (**self).create_subset(request)
    }

    fn remove_subset(&mut self, handle: SubsetHandle) -> Result<(), SubsetError> {
        (**self).remove_subset(handle)
    }
}
