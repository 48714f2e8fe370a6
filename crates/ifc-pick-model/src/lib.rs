// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Pick Model - shared types and collaborator traits
//!
//! This crate holds the vocabulary shared by the interaction core and the
//! front ends that drive it: identifiers, decoded geometry with its
//! triangle-to-element index, property records, and the traits behind which
//! the external collaborators sit.
//!
//! # Architecture
//!
//! - [`PropertyStore`] - element property queries (item, sets, type, material)
//! - [`ModelLoader`] - decodes an input file into a [`DecodedModel`]
//! - [`SubsetRenderer`] - creates and releases highlight overlay meshes
//!
//! # Example
//!
//! ```ignore
//! use ifc_pick_model::{ElementIndex, ExpressId, TriangleSpan};
//!
//! let index = ElementIndex::from_spans(vec![TriangleSpan::new(10, 5, ExpressId(42))])?;
//! assert_eq!(index.express_id(12), Some(ExpressId(42)));
//! ```

pub mod error;
pub mod geometry;
pub mod properties;
pub mod traits;
pub mod types;

pub use error::*;
pub use geometry::*;
pub use properties::*;
pub use traits::*;
pub use types::*;
