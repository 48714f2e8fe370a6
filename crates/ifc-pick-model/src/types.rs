// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identifiers and type tags
//!
//! An express ID is only meaningful together with the model it came from,
//! so element identity is always the pair [`ElementId`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Session-unique identifier of a loaded model
///
/// Assigned once by the model registry in load order, starting at 0.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, Default, PartialOrd, Ord)]
pub struct ModelId(pub u32);

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model {}", self.0)
    }
}

/// Type-safe express identifier
///
/// Wraps the integer a building-model file assigns to each entity
/// (e.g., `#42` becomes `ExpressId(42)`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, Default, PartialOrd, Ord)]
pub struct ExpressId(pub u32);

impl fmt::Display for ExpressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for ExpressId {
    fn from(id: u32) -> Self {
        ExpressId(id)
    }
}

impl From<ExpressId> for u32 {
    fn from(id: ExpressId) -> Self {
        id.0
    }
}

/// A semantic building element: express ID scoped to its model
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ElementId {
    pub model: ModelId,
    pub express_id: ExpressId,
}

impl ElementId {
    pub fn new(model: ModelId, express_id: ExpressId) -> Self {
        Self { model, express_id }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.express_id, self.model.0)
    }
}

/// IFC entity type tag
///
/// Covers the spatial, element, and property-definition types the
/// interaction layer needs to recognise. Anything else keeps its original
/// STEP name in [`IfcType::Unknown`].
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IfcType {
    // Spatial structure
    IfcProject,
    IfcSite,
    IfcBuilding,
    IfcBuildingStorey,
    IfcSpace,

    // Building elements
    IfcWall,
    IfcWallStandardCase,
    IfcSlab,
    IfcRoof,
    IfcBeam,
    IfcColumn,
    IfcDoor,
    IfcWindow,
    IfcStair,
    IfcRailing,
    IfcCovering,
    IfcPlate,
    IfcMember,
    IfcFurnishingElement,
    IfcBuildingElementProxy,

    // Type objects
    IfcWallType,
    IfcSlabType,
    IfcDoorType,
    IfcWindowType,
    IfcColumnType,
    IfcBeamType,

    // Property definitions
    IfcPropertySet,
    IfcElementQuantity,
    IfcPropertySingleValue,
    IfcPropertyEnumeratedValue,
    IfcQuantityLength,
    IfcQuantityArea,
    IfcQuantityVolume,

    // Materials
    IfcMaterial,
    IfcMaterialLayer,
    IfcMaterialLayerSet,
    IfcMaterialLayerSetUsage,

    /// Unknown type - stores the original type name string
    Unknown(String),
}

/// STEP names of the known types
const STEP_NAMES: &[(&str, IfcType)] = &[
    ("IFCPROJECT", IfcType::IfcProject),
    ("IFCSITE", IfcType::IfcSite),
    ("IFCBUILDING", IfcType::IfcBuilding),
    ("IFCBUILDINGSTOREY", IfcType::IfcBuildingStorey),
    ("IFCSPACE", IfcType::IfcSpace),
    ("IFCWALL", IfcType::IfcWall),
    ("IFCWALLSTANDARDCASE", IfcType::IfcWallStandardCase),
    ("IFCSLAB", IfcType::IfcSlab),
    ("IFCROOF", IfcType::IfcRoof),
    ("IFCBEAM", IfcType::IfcBeam),
    ("IFCCOLUMN", IfcType::IfcColumn),
    ("IFCDOOR", IfcType::IfcDoor),
    ("IFCWINDOW", IfcType::IfcWindow),
    ("IFCSTAIR", IfcType::IfcStair),
    ("IFCRAILING", IfcType::IfcRailing),
    ("IFCCOVERING", IfcType::IfcCovering),
    ("IFCPLATE", IfcType::IfcPlate),
    ("IFCMEMBER", IfcType::IfcMember),
    ("IFCFURNISHINGELEMENT", IfcType::IfcFurnishingElement),
    ("IFCBUILDINGELEMENTPROXY", IfcType::IfcBuildingElementProxy),
    ("IFCWALLTYPE", IfcType::IfcWallType),
    ("IFCSLABTYPE", IfcType::IfcSlabType),
    ("IFCDOORTYPE", IfcType::IfcDoorType),
    ("IFCWINDOWTYPE", IfcType::IfcWindowType),
    ("IFCCOLUMNTYPE", IfcType::IfcColumnType),
    ("IFCBEAMTYPE", IfcType::IfcBeamType),
    ("IFCPROPERTYSET", IfcType::IfcPropertySet),
    ("IFCELEMENTQUANTITY", IfcType::IfcElementQuantity),
    ("IFCPROPERTYSINGLEVALUE", IfcType::IfcPropertySingleValue),
    ("IFCPROPERTYENUMERATEDVALUE", IfcType::IfcPropertyEnumeratedValue),
    ("IFCQUANTITYLENGTH", IfcType::IfcQuantityLength),
    ("IFCQUANTITYAREA", IfcType::IfcQuantityArea),
    ("IFCQUANTITYVOLUME", IfcType::IfcQuantityVolume),
    ("IFCMATERIAL", IfcType::IfcMaterial),
    ("IFCMATERIALLAYER", IfcType::IfcMaterialLayer),
    ("IFCMATERIALLAYERSET", IfcType::IfcMaterialLayerSet),
    ("IFCMATERIALLAYERSETUSAGE", IfcType::IfcMaterialLayerSetUsage),
];

impl FromStr for IfcType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl IfcType {
    /// Parse a STEP type name (case-insensitive)
    pub fn parse(s: &str) -> Self {
        let upper = s.to_ascii_uppercase();
        STEP_NAMES
            .iter()
            .find(|(name, _)| *name == upper)
            .map(|(_, t)| t.clone())
            .unwrap_or_else(|| IfcType::Unknown(s.to_string()))
    }

    /// Upper-case STEP name of this type
    pub fn name(&self) -> String {
        match self {
            IfcType::Unknown(s) => s.clone(),
            known => STEP_NAMES
                .iter()
                .find(|(_, t)| t == known)
                .map(|(name, _)| name.to_string())
                .unwrap_or_default(),
        }
    }
}

impl Default for IfcType {
    fn default() -> Self {
        IfcType::Unknown(String::new())
    }
}

impl fmt::Display for IfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<String> for IfcType {
    fn from(s: String) -> Self {
        IfcType::parse(&s)
    }
}

impl From<IfcType> for String {
    fn from(t: IfcType) -> Self {
        t.name()
    }
}
