// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Highlight subset manager
//!
//! Each channel owns at most one overlay. Replacing an overlay releases the
//! previous one before the new one is created, so a channel never has two
//! live subsets. An overlay whose release failed stays tracked as detached
//! and is released again before the channel attaches anything new.

use ifc_pick_model::{
    ElementId, HighlightMaterial, Model, SubsetError, SubsetHandle, SubsetRenderer, SubsetRequest,
};
use std::fmt;

/// Independent highlight slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Hover,
    Selection,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Hover, Channel::Selection];

    pub(crate) fn index(self) -> usize {
        match self {
            Channel::Hover => 0,
            Channel::Selection => 1,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Hover => write!(f, "hover"),
            Channel::Selection => write!(f, "selection"),
        }
    }
}

/// Observable state of a channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Empty,
    Highlighted(ElementId),
}

/// Live overlay bound to one element
#[derive(Clone, Debug, PartialEq)]
pub struct Subset {
    pub element: ElementId,
    pub material: HighlightMaterial,
    pub handle: SubsetHandle,
}

/// Owner of the per-channel overlay slots
#[derive(Debug, Default)]
pub struct HighlightSubsetManager {
    slots: [Option<Subset>; 2],
    /// Overlays whose release failed, still present in the scene
    detached: [Vec<SubsetHandle>; 2],
}

impl HighlightSubsetManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `channel` to an overlay of `element`, returning its handle
    ///
    /// Re-issuing the current element and material is a no-op. Otherwise the
    /// previous overlay is released first. On any renderer failure the
    /// channel is left empty; nothing is attached while an earlier overlay
    /// of the channel cannot be released.
    pub fn set_highlight<R: SubsetRenderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        channel: Channel,
        element: ElementId,
        material: &HighlightMaterial,
        model: &Model,
    ) -> Result<SubsetHandle, SubsetError> {
        if element.model != model.id() {
            return Err(SubsetError::ModelMismatch {
                element: element.model,
                model: model.id(),
            });
        }

        let slot = &mut self.slots[channel.index()];
        match slot.take() {
            Some(current) if current.element == element && &current.material == material => {
                let handle = current.handle;
                *slot = Some(current);
                return Ok(handle);
            }
            Some(previous) => {
                self.detached[channel.index()].push(previous.handle);
                log::debug!("Releasing {} overlay of {}", channel, previous.element);
            }
            None => {}
        }
        self.release_detached(renderer, channel)?;

        let handle = renderer.create_subset(SubsetRequest {
            model,
            ids: &[element.express_id],
            material,
        })?;
        log::debug!("Attached {} overlay of {}", channel, element);

        self.slots[channel.index()] = Some(Subset {
            element,
            material: material.clone(),
            handle,
        });
        Ok(handle)
    }

    /// Release the channel's overlay, if any
    pub fn clear_highlight<R: SubsetRenderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        channel: Channel,
    ) -> Result<(), SubsetError> {
        if let Some(previous) = self.slots[channel.index()].take() {
            self.detached[channel.index()].push(previous.handle);
            log::debug!("Clearing {} overlay of {}", channel, previous.element);
        }
        self.release_detached(renderer, channel)
    }

    /// Release every detached overlay of the channel
    ///
    /// Stops at the first failure; unreleased handles are kept for the next
    /// attempt.
    fn release_detached<R: SubsetRenderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        channel: Channel,
    ) -> Result<(), SubsetError> {
        let pending = &mut self.detached[channel.index()];
        while let Some(&handle) = pending.last() {
            if let Err(err) = renderer.remove_subset(handle) {
                log::warn!("Release of {} overlay {:?} failed: {}", channel, handle, err);
                return Err(err);
            }
            pending.pop();
        }
        Ok(())
    }

    pub fn state(&self, channel: Channel) -> ChannelState {
        match &self.slots[channel.index()] {
            Some(subset) => ChannelState::Highlighted(subset.element),
            None => ChannelState::Empty,
        }
    }

    pub fn subset(&self, channel: Channel) -> Option<&Subset> {
        self.slots[channel.index()].as_ref()
    }

    /// Overlays currently attached across all channels
    pub fn live_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Overlays of a channel still waiting to be released
    pub fn detached_count(&self, channel: Channel) -> usize {
        self.detached[channel.index()].len()
    }
}
