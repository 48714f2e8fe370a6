// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Append-only collection of loaded models

use ifc_pick_model::{DecodedModel, LoadError, Model, ModelId};
use std::sync::Arc;

/// Models loaded during the session, in load order
///
/// Ids are assigned on registration and never reused; models are never
/// removed.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: Vec<Arc<Model>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoded model under the next id
    ///
    /// Models whose geometry and index disagree are rejected without
    /// consuming an id.
    pub fn register(&mut self, decoded: DecodedModel) -> Result<ModelId, LoadError> {
        decoded.validate()?;
        let id = ModelId(self.models.len() as u32);
        log::debug!(
            "Registering {} as {} ({} triangles, {} element spans)",
            decoded.name,
            id,
            decoded.geometry.triangle_count(),
            decoded.index.len()
        );
        self.models.push(Arc::new(Model::new(id, decoded)));
        Ok(id)
    }

    /// All models in registration order
    pub fn all(&self) -> &[Arc<Model>] {
        &self.models
    }

    /// Look up a model by id
    pub fn get(&self, id: ModelId) -> Option<&Arc<Model>> {
        self.models.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
