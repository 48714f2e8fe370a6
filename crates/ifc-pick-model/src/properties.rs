// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property records and the property store interface

use crate::{ExpressId, IfcType, ModelId, PropertyError};
use serde::{Deserialize, Serialize};

/// Attribute holding a property set's member properties
pub const HAS_PROPERTIES: &str = "HasProperties";

/// Attribute holding a type object's property sets
pub const HAS_PROPERTY_SETS: &str = "HasPropertySets";

/// Decoded attribute value of an item
///
/// A value is either inline data, a reference to another item
/// ([`PropertyValue::Ref`]), or, after dereferencing, the resolved target
/// ([`PropertyValue::Item`]) or a marker recording why it could not be
/// resolved ([`PropertyValue::Unresolved`]).
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub enum PropertyValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Enum(String),
    /// Reference to another item (#123)
    Ref(ExpressId),
    List(Vec<PropertyValue>),
    /// Dereferenced target of a former reference
    Item(Box<ItemProperties>),
    /// Reference whose target could not be fetched
    Unresolved { id: ExpressId, reason: String },
}

impl PropertyValue {
    /// Try to get as reference
    pub fn as_ref_id(&self) -> Option<ExpressId> {
        match self {
            PropertyValue::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// Try to get as text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) | PropertyValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as float
    pub fn as_real(&self) -> Option<f64> {
        match self {
            PropertyValue::Real(f) => Some(*f),
            PropertyValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as list
    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::List(list) => Some(list),
            _ => None,
        }
    }

    /// Try to get as resolved item
    pub fn as_item(&self) -> Option<&ItemProperties> {
        match self {
            PropertyValue::Item(item) => Some(item),
            _ => None,
        }
    }

    /// Check if this is an unresolved-reference marker
    pub fn is_unresolved(&self) -> bool {
        matches!(self, PropertyValue::Unresolved { .. })
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }
}

/// A named attribute of an item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: PropertyValue,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Direct properties of one item, attributes in source order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemProperties {
    pub express_id: ExpressId,
    pub ifc_type: IfcType,
    pub attributes: Vec<Attribute>,
}

impl ItemProperties {
    /// Create an item with no attributes
    pub fn new(express_id: ExpressId, ifc_type: IfcType) -> Self {
        Self {
            express_id,
            ifc_type,
            attributes: Vec::new(),
        }
    }

    /// Builder-style attribute append
    pub fn with(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.attributes.push(Attribute::new(name, value));
        self
    }

    /// Get attribute value by name
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }

    /// The `Name` attribute as text
    pub fn name(&self) -> Option<&str> {
        self.get("Name").and_then(|v| v.as_text())
    }
}

/// Element property queries
///
/// Mirrors the query surface of the external property-graph engine. Every
/// call is a read; implementations must be shareable with background tasks.
///
/// # Example
///
/// ```ignore
/// use ifc_pick_model::{PropertyStore, ModelId, ExpressId};
///
/// fn show(store: &dyn PropertyStore, model: ModelId, id: ExpressId) {
///     let item = store.item_properties(model, id, false)?;
///     for pset in store.property_sets(model, id)? {
///         println!("{:?}", pset.name());
///     }
/// }
/// ```
pub trait PropertyStore: Send + Sync {
    /// Direct attributes of an item
    ///
    /// With `recursive`, references inside the attributes are replaced by the
    /// referenced items' properties.
    fn item_properties(
        &self,
        model: ModelId,
        id: ExpressId,
        recursive: bool,
    ) -> Result<ItemProperties, PropertyError>;

    /// Property sets attached to an element, in store order
    fn property_sets(&self, model: ModelId, id: ExpressId)
        -> Result<Vec<ItemProperties>, PropertyError>;

    /// Type objects defining an element, in store order
    fn type_properties(
        &self,
        model: ModelId,
        id: ExpressId,
    ) -> Result<Vec<ItemProperties>, PropertyError>;

    /// Materials associated with an element, in store order
    fn material_properties(
        &self,
        model: ModelId,
        id: ExpressId,
    ) -> Result<Vec<ItemProperties>, PropertyError>;

    /// Every item of a type, in store order
    fn all_items_of_type(
        &self,
        model: ModelId,
        ifc_type: &IfcType,
    ) -> Result<Vec<ExpressId>, PropertyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_lookup_by_name() {
        let item = ItemProperties::new(ExpressId(1), IfcType::IfcWall)
            .with("Name", PropertyValue::Text("Wall 1".into()))
            .with("Height", PropertyValue::Real(3.0));

        assert_eq!(item.name(), Some("Wall 1"));
        assert_eq!(item.get("Height").and_then(|v| v.as_real()), Some(3.0));
        assert!(item.get("Width").is_none());
    }

    #[test]
    fn value_json_shape() {
        let value = PropertyValue::List(vec![PropertyValue::Ref(ExpressId(5))]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"List":[{"Ref":5}]}"#);
    }
}
