// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property graph resolution
//!
//! Builds a fully dereferenced snapshot of an element: direct attributes,
//! property sets, type objects, materials, and the properties of the
//! model's building. Property-set members and type property sets that are
//! references are replaced by the referenced item's direct properties, one
//! level deep. Resolved targets are not dereferenced further, which bounds
//! the walk even when the source graph contains reference cycles.

use ifc_pick_model::{
    ElementId, ExpressId, IfcType, ItemProperties, ModelId, PropertyError, PropertyStore,
    PropertyValue, HAS_PROPERTIES, HAS_PROPERTY_SETS,
};
use serde::Serialize;

/// Resolved properties of one element
///
/// Built fresh per query and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PropertySnapshot {
    pub element: ElementId,
    /// Direct attributes of the element
    pub item: ItemProperties,
    /// Property sets with members dereferenced
    pub property_sets: Vec<ItemProperties>,
    /// Type objects with their property sets dereferenced
    pub type_properties: Vec<ItemProperties>,
    pub material_properties: Vec<ItemProperties>,
    /// First building of the model, references inlined
    pub building: Option<ItemProperties>,
}

/// A reference the resolver could not dereference
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnresolvedReference {
    /// Property set or type object holding the reference
    pub owner: ExpressId,
    pub id: ExpressId,
    pub reason: String,
}

impl PropertySnapshot {
    /// Every reference left unresolved, in snapshot order
    pub fn unresolved(&self) -> Vec<UnresolvedReference> {
        let owners = self
            .property_sets
            .iter()
            .map(|pset| (pset, HAS_PROPERTIES))
            .chain(self.type_properties.iter().map(|ty| (ty, HAS_PROPERTY_SETS)));

        let mut out = Vec::new();
        for (owner, attribute) in owners {
            let Some(value) = owner.get(attribute) else {
                continue;
            };
            let entries = match value {
                PropertyValue::List(list) => list.as_slice(),
                single => std::slice::from_ref(single),
            };
            for entry in entries {
                if let PropertyValue::Unresolved { id, reason } = entry {
                    out.push(UnresolvedReference {
                        owner: owner.express_id,
                        id: *id,
                        reason: reason.clone(),
                    });
                }
            }
        }
        out
    }

    /// Whether any reference could not be dereferenced
    pub fn is_partial(&self) -> bool {
        !self.unresolved().is_empty()
    }

    /// Pretty JSON dump for logs and panels
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Deep property resolver over a property store
pub struct PropertyGraphResolver<'s, S: PropertyStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: PropertyStore + ?Sized> PropertyGraphResolver<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Resolve the full snapshot of an element
    ///
    /// Fails only when one of the element's own queries fails. A missing
    /// reference target leaves an [`PropertyValue::Unresolved`] marker at
    /// its position and the snapshot is still returned.
    pub fn resolve(&self, element: ElementId) -> Result<PropertySnapshot, PropertyError> {
        let model = element.model;
        let id = element.express_id;

        let item = self.store.item_properties(model, id, false)?;
        let property_sets = self.store.property_sets(model, id)?;
        let type_properties = self.store.type_properties(model, id)?;
        let material_properties = self.store.material_properties(model, id)?;
        let building = self.building(model)?;

        let property_sets = property_sets
            .iter()
            .map(|pset| self.dereference(model, pset, HAS_PROPERTIES))
            .collect();
        let type_properties = type_properties
            .iter()
            .map(|ty| self.dereference(model, ty, HAS_PROPERTY_SETS))
            .collect();

        let snapshot = PropertySnapshot {
            element,
            item,
            property_sets,
            type_properties,
            material_properties,
            building,
        };

        let unresolved = snapshot.unresolved();
        if !unresolved.is_empty() {
            log::warn!(
                "Snapshot of {} is partial: {} unresolved reference(s)",
                element,
                unresolved.len()
            );
        }

        Ok(snapshot)
    }

    /// Properties of the first building in the model
    fn building(&self, model: ModelId) -> Result<Option<ItemProperties>, PropertyError> {
        let buildings = self.store.all_items_of_type(model, &IfcType::IfcBuilding)?;
        match buildings.first() {
            Some(&id) => self.store.item_properties(model, id, true).map(Some),
            None => Ok(None),
        }
    }

    /// Copy of `owner` with the references under `attribute` replaced
    fn dereference(&self, model: ModelId, owner: &ItemProperties, attribute: &str) -> ItemProperties {
        let mut resolved = owner.clone();
        for attr in resolved.attributes.iter_mut().filter(|a| a.name == attribute) {
            attr.value = match &attr.value {
                PropertyValue::List(entries) => PropertyValue::List(
                    entries.iter().map(|entry| self.fetch_target(model, entry)).collect(),
                ),
                single => self.fetch_target(model, single),
            };
        }
        resolved
    }

    fn fetch_target(&self, model: ModelId, value: &PropertyValue) -> PropertyValue {
        let Some(id) = value.as_ref_id() else {
            return value.clone();
        };
        match self.store.item_properties(model, id, false) {
            Ok(target) => PropertyValue::Item(Box::new(target)),
            Err(err) => {
                log::debug!("Cannot dereference {} in {}: {}", id, model, err);
                PropertyValue::Unresolved {
                    id,
                    reason: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryPropertyStore, ModelProperties};

    const MODEL: ModelId = ModelId(0);

    fn text(s: &str) -> PropertyValue {
        PropertyValue::Text(s.to_string())
    }

    fn refs(ids: &[u32]) -> PropertyValue {
        PropertyValue::List(ids.iter().map(|&i| PropertyValue::Ref(ExpressId(i))).collect())
    }

    fn store() -> InMemoryPropertyStore {
        let mut props = ModelProperties::new();
        props.add_item(
            ItemProperties::new(ExpressId(1), IfcType::IfcBuilding).with("Name", text("Office")),
        );
        props.add_item(ItemProperties::new(ExpressId(42), IfcType::IfcWall).with("Name", text("Wall 1")));
        props.add_item(
            ItemProperties::new(ExpressId(100), IfcType::IfcPropertySet)
                .with("Name", text("Pset_WallCommon"))
                .with(HAS_PROPERTIES, refs(&[101, 102])),
        );
        props.add_item(
            ItemProperties::new(ExpressId(101), IfcType::IfcPropertySingleValue)
                .with("Name", text("IsExternal"))
                .with("NominalValue", PropertyValue::Bool(true)),
        );
        props.add_item(
            ItemProperties::new(ExpressId(102), IfcType::IfcPropertySingleValue)
                .with("Name", text("FireRating"))
                .with("NominalValue", text("REI60")),
        );
        props.add_item(
            ItemProperties::new(ExpressId(200), IfcType::IfcWallType)
                .with("Name", text("Basic 200"))
                .with(HAS_PROPERTY_SETS, refs(&[201])),
        );
        props.add_item(
            ItemProperties::new(ExpressId(201), IfcType::IfcPropertySet)
                .with("Name", text("Pset_WallTypeCommon"))
                .with(HAS_PROPERTIES, refs(&[200])),
        );
        props.add_item(ItemProperties::new(ExpressId(300), IfcType::IfcMaterial).with("Name", text("Concrete")));
        props.relate_property_set(ExpressId(42), ExpressId(100));
        props.relate_type(ExpressId(42), ExpressId(200));
        props.relate_material(ExpressId(42), ExpressId(300));

        let mut store = InMemoryPropertyStore::new();
        store.insert(MODEL, props);
        store
    }

    fn wall() -> ElementId {
        ElementId::new(MODEL, ExpressId(42))
    }

    #[test]
    fn property_set_members_equal_direct_item_properties() {
        let store = store();
        let snapshot = PropertyGraphResolver::new(&store).resolve(wall()).unwrap();

        let members = snapshot.property_sets[0].get(HAS_PROPERTIES).unwrap().as_list().unwrap();
        let direct = store.item_properties(MODEL, ExpressId(101), false).unwrap();

        assert_eq!(members[0].as_item(), Some(&direct));
        assert_eq!(members[1].as_item().and_then(|i| i.name()), Some("FireRating"));
        assert!(!snapshot.is_partial());
    }

    #[test]
    fn members_keep_source_order() {
        let store = store();
        let snapshot = PropertyGraphResolver::new(&store).resolve(wall()).unwrap();

        let names: Vec<_> = snapshot.property_sets[0]
            .get(HAS_PROPERTIES)
            .and_then(|v| v.as_list())
            .unwrap()
            .iter()
            .filter_map(|v| v.as_item()?.name())
            .collect();
        assert_eq!(names, ["IsExternal", "FireRating"]);
    }

    #[test]
    fn type_property_sets_dereferenced_one_level() {
        let store = store();
        let snapshot = PropertyGraphResolver::new(&store).resolve(wall()).unwrap();

        let psets = snapshot.type_properties[0].get(HAS_PROPERTY_SETS).unwrap().as_list().unwrap();
        let pset = psets[0].as_item().unwrap();
        assert_eq!(pset.name(), Some("Pset_WallTypeCommon"));

        // #201 points back at #200; the inner reference stays a reference
        let inner = pset.get(HAS_PROPERTIES).unwrap().as_list().unwrap();
        assert_eq!(inner[0], PropertyValue::Ref(ExpressId(200)));
    }

    #[test]
    fn missing_member_becomes_marker() {
        let mut store = store();
        let mut props = store.model(MODEL).unwrap().as_ref().clone();
        props.add_item(
            ItemProperties::new(ExpressId(110), IfcType::IfcPropertySet)
                .with("Name", text("Pset_Broken"))
                .with(HAS_PROPERTIES, refs(&[101, 999])),
        );
        props.relate_property_set(ExpressId(42), ExpressId(110));
        store.insert(MODEL, props);

        let snapshot = PropertyGraphResolver::new(&store).resolve(wall()).unwrap();

        assert_eq!(snapshot.property_sets.len(), 2);
        let members = snapshot.property_sets[1].get(HAS_PROPERTIES).unwrap().as_list().unwrap();
        assert!(members[0].as_item().is_some());
        assert!(members[1].is_unresolved());

        let unresolved = snapshot.unresolved();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].owner, ExpressId(110));
        assert_eq!(unresolved[0].id, ExpressId(999));
        assert!(snapshot.is_partial());
    }

    #[test]
    fn building_and_materials_included() {
        let store = store();
        let snapshot = PropertyGraphResolver::new(&store).resolve(wall()).unwrap();

        assert_eq!(snapshot.building.as_ref().and_then(|b| b.name()), Some("Office"));
        assert_eq!(snapshot.material_properties[0].name(), Some("Concrete"));
        assert_eq!(snapshot.item.name(), Some("Wall 1"));
    }

    #[test]
    fn unknown_element_is_a_hard_failure() {
        let store = store();
        let err = PropertyGraphResolver::new(&store)
            .resolve(ElementId::new(MODEL, ExpressId(4242)))
            .unwrap_err();
        assert_eq!(err, PropertyError::MissingItem { model: MODEL, id: ExpressId(4242) });
    }

    #[test]
    fn source_items_untouched() {
        let store = store();
        PropertyGraphResolver::new(&store).resolve(wall()).unwrap();

        let pset = store.item_properties(MODEL, ExpressId(100), false).unwrap();
        assert_eq!(pset.get(HAS_PROPERTIES), Some(&refs(&[101, 102])));
    }
}
