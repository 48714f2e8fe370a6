// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Pick Core - pick-to-element resolution and highlight lifecycle
//!
//! Renderer-independent interaction layer of an IFC viewer. A pointer
//! position is turned into a world ray, the nearest triangle across all
//! loaded models, the element that owns the triangle, optionally a fully
//! dereferenced property snapshot, and finally an overlay subset in the
//! hover or selection channel.
//!
//! # Overview
//!
//! - [`ModelRegistry`] - append-only list of loaded models
//! - [`SpatialIndexAdapter`] - nearest hit across models
//! - [`resolve_element`] - triangle to element id
//! - [`PropertyGraphResolver`] - deep property snapshot
//! - [`HighlightSubsetManager`] - one overlay per channel
//! - [`InteractionController`] - the hover / selection state machine
//!
//! # Example
//!
//! ```ignore
//! use ifc_pick_core::{BundleLoader, InteractionController, PerspectiveCamera, ViewportBounds};
//!
//! let mut controller = InteractionController::default();
//! controller.load_model(&BundleLoader, "house.ifcb", &bytes)?;
//!
//! let viewport = ViewportBounds::new(100.0, 50.0, 900.0, 650.0);
//! controller.on_hover(500.0, 350.0, &camera, &viewport, &mut renderer)?;
//! ```

pub mod controller;
pub mod element;
pub mod highlight;
pub mod loader;
pub mod registry;
pub mod resolver;
pub mod settings;
pub mod spatial;
pub mod store;

#[cfg(test)]
mod testing;

pub use controller::{Applied, InteractionController, Outcome, PickRequest, Resolution, Ticket};
pub use element::resolve_element;
pub use highlight::{Channel, ChannelState, HighlightSubsetManager, Subset};
pub use loader::{BundleLoader, BUNDLE_MAGIC, BUNDLE_VERSION};
pub use registry::ModelRegistry;
pub use resolver::{PropertyGraphResolver, PropertySnapshot, UnresolvedReference};
pub use settings::{InteractionSettings, SettingsError, SETTINGS_ENV};
pub use spatial::{
    MeshIntersector, Ndc, PerspectiveCamera, PickResult, Ray, RayIntersector, RayProjector,
    SpatialIndexAdapter, TriangleHit, ViewportBounds,
};
pub use store::{InMemoryPropertyStore, ModelProperties, PropertyDocument, Relation};

// Re-export the shared vocabulary so front ends need a single dependency
pub use ifc_pick_model;
