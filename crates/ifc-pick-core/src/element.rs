// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangle to element resolution

use crate::spatial::PickResult;
use ifc_pick_model::{ElementId, InteractionError};

/// Recover the element behind a picked triangle
///
/// A triangle without a mapping means the decoder produced geometry the
/// index does not cover. That is reported as
/// [`InteractionError::UnresolvedElement`], never folded into "no pick".
pub fn resolve_element(pick: &PickResult) -> Result<ElementId, InteractionError> {
    let model = &pick.model;
    model
        .index()
        .express_id(pick.triangle)
        .map(|express_id| ElementId::new(model.id(), express_id))
        .ok_or(InteractionError::UnresolvedElement {
            model: model.id(),
            triangle: pick.triangle,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_pick_model::{
        DecodedModel, ElementIndex, ExpressId, GeometryBuffer, Model, ModelId, TriangleSpan,
    };
    use nalgebra::Point3;
    use std::sync::Arc;

    fn pick(triangle: u32) -> PickResult {
        let index = ElementIndex::from_spans(vec![TriangleSpan::new(10, 5, ExpressId(42))]).unwrap();
        let model = Model::new(
            ModelId(3),
            DecodedModel {
                name: "spans".into(),
                geometry: GeometryBuffer::new(),
                index,
                elements: Vec::new(),
            },
        );
        PickResult {
            model: Arc::new(model),
            triangle,
            point: Point3::origin(),
            distance: 1.0,
        }
    }

    #[test]
    fn mapped_triangle_resolves() {
        for triangle in 10..15 {
            let element = resolve_element(&pick(triangle)).unwrap();
            assert_eq!(element, ElementId::new(ModelId(3), ExpressId(42)));
        }
    }

    #[test]
    fn unmapped_triangle_is_an_error() {
        for triangle in [0, 9, 15, 10_000] {
            let err = resolve_element(&pick(triangle)).unwrap_err();
            assert!(matches!(
                err,
                InteractionError::UnresolvedElement { model: ModelId(3), triangle: t } if t == triangle
            ));
        }
    }
}
