// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interaction controller
//!
//! Drives hover and selection from pointer events. Each event runs in three
//! steps so the slow part can leave the interaction thread:
//!
//! 1. [`InteractionController::begin`] casts the ray against the current
//!    models and issues a ticket for the channel.
//! 2. [`PickRequest::resolve`] maps the hit to an element and, for
//!    selection, resolves the property snapshot. It borrows nothing from the
//!    controller and can run on a task pool.
//! 3. [`InteractionController::apply`] swaps the channel's overlay, unless a
//!    newer ticket was issued for the channel in the meantime.

use crate::element::resolve_element;
use crate::highlight::{Channel, ChannelState, HighlightSubsetManager};
use crate::registry::ModelRegistry;
use crate::resolver::{PropertyGraphResolver, PropertySnapshot};
use crate::settings::InteractionSettings;
use crate::spatial::{
    MeshIntersector, PickResult, RayIntersector, RayProjector, SpatialIndexAdapter, ViewportBounds,
};
use ifc_pick_model::{
    DecodedModel, ElementId, InteractionError, Model, ModelId, ModelLoader, PropertyError,
    PropertyStore, Result, SubsetRenderer,
};
use std::path::Path;
use std::sync::Arc;

/// Identity of one pointer event within its channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub channel: Channel,
    generation: u64,
}

/// Latest ticket per channel
#[derive(Debug, Default)]
struct RequestTracker {
    latest: [u64; 2],
}

impl RequestTracker {
    fn issue(&mut self, channel: Channel) -> Ticket {
        let latest = &mut self.latest[channel.index()];
        *latest += 1;
        Ticket {
            channel,
            generation: *latest,
        }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.latest[ticket.channel.index()] == ticket.generation
    }
}

/// Ray cast result waiting for resolution
#[derive(Clone, Debug)]
pub struct PickRequest {
    ticket: Ticket,
    hit: Option<PickResult>,
    with_properties: bool,
}

impl PickRequest {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn hit(&self) -> Option<&PickResult> {
        self.hit.as_ref()
    }

    /// Whether resolution fetches the property snapshot
    pub fn wants_properties(&self) -> bool {
        self.with_properties
    }

    /// Resolve the hit element and, when requested, its properties
    ///
    /// Without a store no properties are fetched.
    pub fn resolve(self, store: Option<&dyn PropertyStore>) -> Resolution {
        let outcome = match self.hit {
            None => Outcome::NoHit,
            Some(hit) => match resolve_element(&hit) {
                Err(err) => Outcome::Failed(err),
                Ok(element) => {
                    log::debug!(
                        "{} hit {} (triangle {}, distance {:.3})",
                        self.ticket.channel,
                        element,
                        hit.triangle,
                        hit.distance
                    );
                    let properties = match store {
                        Some(store) if self.with_properties => {
                            Some(PropertyGraphResolver::new(store).resolve(element))
                        }
                        _ => None,
                    };
                    Outcome::Element {
                        element,
                        model: hit.model,
                        properties,
                    }
                }
            },
        };

        Resolution {
            ticket: self.ticket,
            outcome,
        }
    }
}

/// What a pick resolved to
#[derive(Debug)]
pub enum Outcome {
    /// Nothing under the pointer
    NoHit,
    Element {
        element: ElementId,
        model: Arc<Model>,
        /// Snapshot (selection only); a hard failure still highlights
        properties: Option<std::result::Result<PropertySnapshot, PropertyError>>,
    },
    Failed(InteractionError),
}

/// Resolved pick, ready to apply
#[derive(Debug)]
pub struct Resolution {
    pub ticket: Ticket,
    pub outcome: Outcome,
}

/// Effect of applying a resolution
#[derive(Debug)]
pub enum Applied {
    Highlighted {
        element: ElementId,
        properties: Option<std::result::Result<PropertySnapshot, PropertyError>>,
    },
    Cleared,
    /// A newer event superseded this one; nothing changed
    Stale,
}

/// Pointer-driven state machine over the two highlight channels
#[derive(Debug)]
pub struct InteractionController<I = MeshIntersector> {
    registry: ModelRegistry,
    highlights: HighlightSubsetManager,
    tracker: RequestTracker,
    settings: InteractionSettings,
    spatial: SpatialIndexAdapter<I>,
}

impl InteractionController<MeshIntersector> {
    pub fn new(settings: InteractionSettings) -> Self {
        Self::with_intersector(settings, MeshIntersector)
    }
}

impl Default for InteractionController<MeshIntersector> {
    fn default() -> Self {
        Self::new(InteractionSettings::default())
    }
}

impl<I: RayIntersector> InteractionController<I> {
    /// Controller over a custom intersection primitive
    pub fn with_intersector(settings: InteractionSettings, intersector: I) -> Self {
        Self {
            registry: ModelRegistry::new(),
            highlights: HighlightSubsetManager::new(),
            tracker: RequestTracker::default(),
            settings,
            spatial: SpatialIndexAdapter::with_intersector(intersector),
        }
    }

    pub fn settings(&self) -> &InteractionSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn highlights(&self) -> &HighlightSubsetManager {
        &self.highlights
    }

    pub fn channel_state(&self, channel: Channel) -> ChannelState {
        self.highlights.state(channel)
    }

    /// Register an already decoded model
    ///
    /// Fails for a model whose index points outside its geometry.
    pub fn register_model(&mut self, decoded: DecodedModel) -> Result<ModelId> {
        let name = decoded.name.clone();
        let id = self.registry.register(decoded).map_err(|e| {
            log::warn!("Rejected {}: {}", name, e);
            e
        })?;
        log::info!("Loaded {} as {}", name, id);
        Ok(id)
    }

    /// Decode file content and register the model
    pub fn load_model<L: ModelLoader + ?Sized>(
        &mut self,
        loader: &L,
        name: &str,
        bytes: &[u8],
    ) -> Result<ModelId> {
        let decoded = loader.load(name, bytes).map_err(|e| {
            log::warn!("Failed to load {}: {}", name, e);
            e
        })?;
        self.register_model(decoded)
    }

    /// Read a model file from disk and register it
    pub fn load_model_path<L: ModelLoader + ?Sized>(
        &mut self,
        loader: &L,
        path: &Path,
    ) -> Result<ModelId> {
        let decoded = loader.load_path(path).map_err(|e| {
            log::warn!("Failed to load {}: {}", path.display(), e);
            e
        })?;
        self.register_model(decoded)
    }

    /// Cast the ray for a pointer event and issue its ticket
    ///
    /// Supersedes every earlier request on the same channel.
    pub fn begin(
        &mut self,
        channel: Channel,
        screen_x: f32,
        screen_y: f32,
        camera: &dyn RayProjector,
        viewport: &ViewportBounds,
    ) -> PickRequest {
        let ticket = self.tracker.issue(channel);
        let hit = self
            .spatial
            .cast_ray(screen_x, screen_y, camera, viewport, self.registry.all());
        PickRequest {
            ticket,
            hit,
            with_properties: channel == Channel::Selection,
        }
    }

    /// Apply a resolution to its channel
    ///
    /// Every path leaves the channel either `Empty` or fully highlighted.
    pub fn apply<R: SubsetRenderer + ?Sized>(
        &mut self,
        resolution: Resolution,
        renderer: &mut R,
    ) -> Result<Applied> {
        let channel = resolution.ticket.channel;
        if !self.tracker.is_current(resolution.ticket) {
            log::debug!("Discarding stale {} result", channel);
            return Ok(Applied::Stale);
        }

        match resolution.outcome {
            Outcome::NoHit => {
                self.highlights.clear_highlight(renderer, channel).map_err(|e| {
                    log::warn!("Releasing {} overlay failed: {}", channel, e);
                    e
                })?;
                Ok(Applied::Cleared)
            }
            Outcome::Failed(err) => {
                log::error!("{} pick failed: {}", channel, err);
                if let Err(e) = self.highlights.clear_highlight(renderer, channel) {
                    log::warn!("Releasing {} overlay failed: {}", channel, e);
                }
                Err(err)
            }
            Outcome::Element {
                element,
                model,
                properties,
            } => {
                self.report(element, properties.as_ref());

                let material = match channel {
                    Channel::Hover => &self.settings.hover_material,
                    Channel::Selection => &self.settings.selection_material,
                };
                match self
                    .highlights
                    .set_highlight(renderer, channel, element, material, &model)
                {
                    Ok(_) => Ok(Applied::Highlighted {
                        element,
                        properties,
                    }),
                    Err(err) => {
                        log::warn!("{} overlay for {} failed: {}", channel, element, err);
                        if let Err(e) = self.highlights.clear_highlight(renderer, channel) {
                            log::warn!("Releasing {} overlay failed: {}", channel, e);
                        }
                        Err(InteractionError::SubsetOperation(err))
                    }
                }
            }
        }
    }

    /// Release a channel's overlay outside of a pick
    ///
    /// Supersedes pending requests on the channel, e.g. when the pointer
    /// leaves the canvas.
    pub fn clear_channel<R: SubsetRenderer + ?Sized>(
        &mut self,
        channel: Channel,
        renderer: &mut R,
    ) -> Result<()> {
        self.tracker.issue(channel);
        self.highlights.clear_highlight(renderer, channel)?;
        Ok(())
    }

    /// Hover move, resolved synchronously
    pub fn on_hover<R: SubsetRenderer + ?Sized>(
        &mut self,
        screen_x: f32,
        screen_y: f32,
        camera: &dyn RayProjector,
        viewport: &ViewportBounds,
        renderer: &mut R,
    ) -> Result<Applied> {
        let request = self.begin(Channel::Hover, screen_x, screen_y, camera, viewport);
        self.apply(request.resolve(None), renderer)
    }

    /// Pointer press, resolved synchronously including properties
    pub fn on_press<R: SubsetRenderer + ?Sized>(
        &mut self,
        screen_x: f32,
        screen_y: f32,
        camera: &dyn RayProjector,
        viewport: &ViewportBounds,
        store: &dyn PropertyStore,
        renderer: &mut R,
    ) -> Result<Applied> {
        let request = self.begin(Channel::Selection, screen_x, screen_y, camera, viewport);
        self.apply(request.resolve(Some(store)), renderer)
    }

    fn report(
        &self,
        element: ElementId,
        properties: Option<&std::result::Result<PropertySnapshot, PropertyError>>,
    ) {
        match properties {
            Some(Ok(snapshot)) if self.settings.log_properties => match snapshot.to_json_pretty() {
                Ok(json) => log::info!("Properties of {}:\n{}", element, json),
                Err(e) => log::warn!("Cannot serialize properties of {}: {}", element, e),
            },
            Some(Err(err)) => log::warn!("Properties of {} unavailable: {}", element, err),
            _ => {}
        }
    }
}
