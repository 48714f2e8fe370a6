// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared fixtures for unit tests

use ifc_pick_model::{
    DecodedModel, ElementIndex, ExpressId, GeometryBuffer, HighlightMaterial, ModelId,
    SubsetError, SubsetHandle, SubsetRenderer, SubsetRequest, TriangleSpan,
};
use std::collections::BTreeMap;

/// Renderer call, in call order
#[derive(Clone, Debug, PartialEq)]
pub enum RenderEvent {
    Created(SubsetHandle, ExpressId),
    Removed(SubsetHandle),
}

/// Live overlay held by the recording renderer
#[derive(Clone, Debug, PartialEq)]
pub struct LiveSubset {
    pub model: ModelId,
    pub ids: Vec<ExpressId>,
    pub material: HighlightMaterial,
}

/// Subset renderer double that records every call
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    next: u64,
    pub live: BTreeMap<SubsetHandle, LiveSubset>,
    pub events: Vec<RenderEvent>,
    /// Highest number of overlays alive at once
    pub peak_live: usize,
    pub fail_create: bool,
    pub fail_remove: bool,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, RenderEvent::Created(..)))
            .count()
    }
}

impl SubsetRenderer for RecordingRenderer {
    fn create_subset(&mut self, request: SubsetRequest<'_>) -> Result<SubsetHandle, SubsetError> {
        if self.fail_create {
            return Err(SubsetError::Renderer("out of buffers".into()));
        }
        self.next += 1;
        let handle = SubsetHandle(self.next);
        self.live.insert(
            handle,
            LiveSubset {
                model: request.model.id(),
                ids: request.ids.to_vec(),
                material: request.material.clone(),
            },
        );
        self.peak_live = self.peak_live.max(self.live.len());
        self.events
            .push(RenderEvent::Created(handle, request.ids.first().copied().unwrap_or_default()));
        Ok(handle)
    }

    fn remove_subset(&mut self, handle: SubsetHandle) -> Result<(), SubsetError> {
        if self.fail_remove {
            return Err(SubsetError::Renderer("scene locked".into()));
        }
        self.live.remove(&handle).ok_or(SubsetError::UnknownSubset(handle))?;
        self.events.push(RenderEvent::Removed(handle));
        Ok(())
    }
}

/// Strip of 20 triangles in the z = 0 plane
///
/// Triangle `i` has its base on `x in [i, i + 1]` at `y = 0` and its apex at
/// `(i + 0.5, 1)`. Triangles 0-9 belong to #7, 10-14 to #42, 15-19 to #8.
pub fn strip_model() -> DecodedModel {
    let mut positions = Vec::new();
    let mut indices = Vec::new();
    for i in 0..20u32 {
        let x = i as f32;
        positions.extend_from_slice(&[x, 0.0, 0.0, x + 1.0, 0.0, 0.0, x + 0.5, 1.0, 0.0]);
        indices.extend_from_slice(&[i * 3, i * 3 + 1, i * 3 + 2]);
    }
    let index = ElementIndex::from_spans(vec![
        TriangleSpan::new(0, 10, ExpressId(7)),
        TriangleSpan::new(10, 5, ExpressId(42)),
        TriangleSpan::new(15, 5, ExpressId(8)),
    ])
    .unwrap();

    DecodedModel {
        name: "strip".into(),
        geometry: GeometryBuffer {
            positions,
            indices,
            ..Default::default()
        },
        index,
        elements: Vec::new(),
    }
}
