// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interaction settings

use ifc_pick_model::HighlightMaterial;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Environment variable naming a settings file
pub const SETTINGS_ENV: &str = "IFC_PICK_SETTINGS";

/// Errors raised while reading settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsed but out of range
    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tunables of the interaction controller
///
/// Missing fields in a settings file fall back to the defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionSettings {
    /// Whether pointer movement highlights elements
    pub hover_enabled: bool,
    /// Hover ray cast every N frames
    pub hover_throttle_frames: u32,
    pub hover_material: HighlightMaterial,
    pub selection_material: HighlightMaterial,
    /// Log the property snapshot of every selected element
    pub log_properties: bool,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            hover_enabled: true,
            hover_throttle_frames: 3,
            hover_material: HighlightMaterial::hover(),
            selection_material: HighlightMaterial::selection(),
            log_properties: true,
        }
    }
}

impl InteractionSettings {
    /// Parse and validate settings JSON
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Settings from the file named by `IFC_PICK_SETTINGS`, or defaults
    ///
    /// A broken settings file is logged and ignored.
    pub fn from_env() -> Self {
        let Ok(path) = std::env::var(SETTINGS_ENV) else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(settings) => {
                log::info!("Loaded interaction settings from {}", path);
                settings
            }
            Err(e) => {
                log::warn!("Ignoring settings file {}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.hover_throttle_frames == 0 {
            return Err(SettingsError::Invalid {
                field: "hover_throttle_frames",
                reason: "must be at least 1".into(),
            });
        }
        check_material("hover_material", &self.hover_material)?;
        check_material("selection_material", &self.selection_material)
    }
}

fn check_material(field: &'static str, material: &HighlightMaterial) -> Result<(), SettingsError> {
    let in_unit = |v: f32| (0.0..=1.0).contains(&v);
    if !in_unit(material.opacity) {
        return Err(SettingsError::Invalid {
            field,
            reason: format!("opacity {} outside [0, 1]", material.opacity),
        });
    }
    if !material.color.iter().copied().all(in_unit) {
        return Err(SettingsError::Invalid {
            field,
            reason: format!("color {:?} outside [0, 1]", material.color),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_presets() {
        let settings = InteractionSettings::default();
        assert_eq!(settings.hover_material.color, [1.0, 0.0, 0.0]);
        assert_eq!(settings.hover_material.opacity, 0.3);
        assert_eq!(settings.selection_material.color, [0.0, 0.0, 1.0]);
        assert_eq!(settings.selection_material.opacity, 0.7);
        assert!(!settings.selection_material.depth_test);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = InteractionSettings::from_json_str(r#"{ "hover_throttle_frames": 1 }"#).unwrap();
        assert_eq!(settings.hover_throttle_frames, 1);
        assert!(settings.hover_enabled);
        assert_eq!(settings.selection_material, HighlightMaterial::selection());
    }

    #[test]
    fn material_override() {
        let json = r#"{ "selection_material": { "color": [0.0, 1.0, 0.0], "opacity": 0.5 } }"#;
        let settings = InteractionSettings::from_json_str(json).unwrap();
        assert_eq!(settings.selection_material.color, [0.0, 1.0, 0.0]);
        assert!(!settings.selection_material.depth_test);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            InteractionSettings::from_json_str(r#"{ "hover_throttle_frames": 0 }"#),
            Err(SettingsError::Invalid { field: "hover_throttle_frames", .. })
        ));
        assert!(matches!(
            InteractionSettings::from_json_str(
                r#"{ "hover_material": { "color": [1.0, 0.0, 0.0], "opacity": 1.5 } }"#
            ),
            Err(SettingsError::Invalid { field: "hover_material", .. })
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            InteractionSettings::from_json_str("{"),
            Err(SettingsError::Json(_))
        ));
    }
}
