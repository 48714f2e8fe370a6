// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory property store
//!
//! Property data for each model is read from a JSON document that sits next
//! to the geometry bundle:
//!
//! ```json
//! {
//!   "items": [{ "express_id": 42, "ifc_type": "IFCWALL", "attributes": [...] }],
//!   "property_sets": [{ "element": 42, "targets": [100] }],
//!   "type_objects": [{ "element": 42, "targets": [200] }],
//!   "materials": [{ "element": 42, "targets": [300] }]
//! }
//! ```

use ifc_pick_model::{
    ExpressId, IfcType, ItemProperties, LoadError, ModelId, PropertyError, PropertyStore,
    PropertyValue,
};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Maximum nesting when inlining references recursively
pub const MAX_RECURSION_DEPTH: usize = 8;

/// Relation from an element to related items
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub element: ExpressId,
    pub targets: Vec<ExpressId>,
}

/// On-disk shape of a model's property data
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDocument {
    #[serde(default)]
    pub items: Vec<ItemProperties>,
    #[serde(default)]
    pub property_sets: Vec<Relation>,
    #[serde(default)]
    pub type_objects: Vec<Relation>,
    #[serde(default)]
    pub materials: Vec<Relation>,
}

/// Indexed property data of one model
#[derive(Clone, Debug, Default)]
pub struct ModelProperties {
    items: Vec<ItemProperties>,
    by_id: FxHashMap<ExpressId, usize>,
    property_sets: FxHashMap<ExpressId, Vec<ExpressId>>,
    type_objects: FxHashMap<ExpressId, Vec<ExpressId>>,
    materials: FxHashMap<ExpressId, Vec<ExpressId>>,
}

impl ModelProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a parsed document
    pub fn from_document(document: PropertyDocument) -> Self {
        let mut props = Self::new();
        for item in document.items {
            props.add_item(item);
        }
        for rel in document.property_sets {
            for target in rel.targets {
                props.relate_property_set(rel.element, target);
            }
        }
        for rel in document.type_objects {
            for target in rel.targets {
                props.relate_type(rel.element, target);
            }
        }
        for rel in document.materials {
            for target in rel.targets {
                props.relate_material(rel.element, target);
            }
        }
        props
    }

    /// Parse and index a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let document: PropertyDocument = serde_json::from_str(json)
            .map_err(|e| LoadError::format(format!("property document: {}", e)))?;
        Ok(Self::from_document(document))
    }

    /// Add an item; a later item with the same id replaces the earlier one
    pub fn add_item(&mut self, item: ItemProperties) {
        match self.by_id.get(&item.express_id) {
            Some(&slot) => self.items[slot] = item,
            None => {
                self.by_id.insert(item.express_id, self.items.len());
                self.items.push(item);
            }
        }
    }

    pub fn relate_property_set(&mut self, element: ExpressId, pset: ExpressId) {
        self.property_sets.entry(element).or_default().push(pset);
    }

    pub fn relate_type(&mut self, element: ExpressId, type_object: ExpressId) {
        self.type_objects.entry(element).or_default().push(type_object);
    }

    pub fn relate_material(&mut self, element: ExpressId, material: ExpressId) {
        self.materials.entry(element).or_default().push(material);
    }

    /// Look up an item by id
    pub fn item(&self, id: ExpressId) -> Option<&ItemProperties> {
        self.by_id.get(&id).map(|&slot| &self.items[slot])
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Copy of an item with references inlined up to `depth` levels
    ///
    /// `path` holds the items on the current branch; a reference back into
    /// the branch is left as a reference.
    fn inline(&self, item: &ItemProperties, depth: usize, path: &mut FxHashSet<ExpressId>) -> ItemProperties {
        let mut out = item.clone();
        if depth == 0 {
            return out;
        }
        path.insert(item.express_id);
        for attr in &mut out.attributes {
            attr.value = self.inline_value(&attr.value, depth, path);
        }
        path.remove(&item.express_id);
        out
    }

    fn inline_value(&self, value: &PropertyValue, depth: usize, path: &mut FxHashSet<ExpressId>) -> PropertyValue {
        match value {
            PropertyValue::Ref(id) if !path.contains(id) => match self.item(*id) {
                Some(target) => PropertyValue::Item(Box::new(self.inline(target, depth - 1, path))),
                None => value.clone(),
            },
            PropertyValue::List(list) => {
                PropertyValue::List(list.iter().map(|v| self.inline_value(v, depth, path)).collect())
            }
            other => other.clone(),
        }
    }

    fn related(&self, relation: &FxHashMap<ExpressId, Vec<ExpressId>>, id: ExpressId, model: ModelId) -> Result<Vec<ItemProperties>, PropertyError> {
        let Some(targets) = relation.get(&id) else {
            return Ok(Vec::new());
        };
        targets
            .iter()
            .map(|&target| {
                self.item(target)
                    .cloned()
                    .ok_or(PropertyError::MissingItem { model, id: target })
            })
            .collect()
    }
}

/// Property store holding every model's data in memory
///
/// Clones share the underlying data and can be moved into background tasks.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPropertyStore {
    models: FxHashMap<ModelId, Arc<ModelProperties>>,
}

impl InMemoryPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the property data of a model
    pub fn insert(&mut self, model: ModelId, props: ModelProperties) {
        log::debug!("Property data for {}: {} items", model, props.len());
        self.models.insert(model, Arc::new(props));
    }

    /// Property data of a model
    pub fn model(&self, model: ModelId) -> Option<&Arc<ModelProperties>> {
        self.models.get(&model)
    }

    fn props(&self, model: ModelId) -> Result<&ModelProperties, PropertyError> {
        self.models
            .get(&model)
            .map(Arc::as_ref)
            .ok_or(PropertyError::UnknownModel(model))
    }
}

impl PropertyStore for InMemoryPropertyStore {
    fn item_properties(
        &self,
        model: ModelId,
        id: ExpressId,
        recursive: bool,
    ) -> Result<ItemProperties, PropertyError> {
        let props = self.props(model)?;
        let item = props.item(id).ok_or(PropertyError::MissingItem { model, id })?;
        if recursive {
            Ok(props.inline(item, MAX_RECURSION_DEPTH, &mut FxHashSet::default()))
        } else {
            Ok(item.clone())
        }
    }

    fn property_sets(&self, model: ModelId, id: ExpressId) -> Result<Vec<ItemProperties>, PropertyError> {
        let props = self.props(model)?;
        props.related(&props.property_sets, id, model)
    }

    fn type_properties(&self, model: ModelId, id: ExpressId) -> Result<Vec<ItemProperties>, PropertyError> {
        let props = self.props(model)?;
        props.related(&props.type_objects, id, model)
    }

    fn material_properties(&self, model: ModelId, id: ExpressId) -> Result<Vec<ItemProperties>, PropertyError> {
        let props = self.props(model)?;
        props.related(&props.materials, id, model)
    }

    fn all_items_of_type(&self, model: ModelId, ifc_type: &IfcType) -> Result<Vec<ExpressId>, PropertyError> {
        let props = self.props(model)?;
        Ok(props
            .items
            .iter()
            .filter(|item| &item.ifc_type == ifc_type)
            .map(|item| item.express_id)
            .collect())
    }
}
