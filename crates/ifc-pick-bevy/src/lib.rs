//! IFC-Pick Bevy - desktop viewer front end
//!
//! Binds the renderer-independent [`ifc_pick_core`] interaction layer to a
//! Bevy window:
//!
//! - Camera and lights, auto-fitted to the loaded models
//! - Model loading from a file dialog (`O`) or drag-and-drop
//! - Hover and selection overlays as Bevy entities
//! - Selection property resolution on the async compute pool
//!
//! Run with `DEBUG=1` for verbose viewer output.

use bevy::prelude::*;
use ifc_pick_core::{InMemoryPropertyStore, InteractionController, InteractionSettings};
use std::sync::atomic::{AtomicBool, Ordering};

pub mod camera;
pub mod loader;
pub mod picking;
pub mod scene;
pub mod subset;

/// Global debug flag - set from the `DEBUG` env var
static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

/// Check if debug mode is enabled
pub fn is_debug() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

fn init_debug_from_env() {
    if std::env::var("DEBUG").is_ok_and(|v| v != "0" && !v.is_empty()) {
        DEBUG_MODE.store(true, Ordering::Relaxed);
    }
}

// Re-exports
pub use camera::{CameraPlugin, CameraRig, MainCamera};
pub use loader::{LoadModelRequest, LoaderPlugin, OpenFileDialogRequest};
pub use picking::{PendingSelections, PickingPlugin, ViewportCamera};
pub use scene::{AutoFitState, ModelMesh, ModelRegistered, SceneExtent, ScenePlugin};
pub use subset::{BevySubsetRenderer, HighlightOverlay, SubsetEntities};

/// Interaction state machine shared by the pointer systems
#[derive(Resource, Deref, DerefMut)]
pub struct PickController(pub InteractionController);

impl Default for PickController {
    fn default() -> Self {
        Self(InteractionController::new(InteractionSettings::from_env()))
    }
}

/// Property data of every loaded model
///
/// Cloned into selection tasks; models are reference counted.
#[derive(Resource, Default, Clone, Deref, DerefMut)]
pub struct PropertyCatalog(pub InMemoryPropertyStore);

/// Main viewer plugin
pub struct PickViewerPlugin;

impl Plugin for PickViewerPlugin {
    fn build(&self, app: &mut App) {
        log_info("[Viewer] Initializing IFC-Pick viewer");

        app.init_resource::<PickController>()
            .init_resource::<PropertyCatalog>()
            .add_plugins((CameraPlugin, ScenePlugin, LoaderPlugin, PickingPlugin));
    }
}

/// Viewer message, shown only in debug mode
pub fn log(msg: &str) {
    if is_debug() {
        println!("{}", msg);
    }
}

/// Log info that should always be shown
pub fn log_info(msg: &str) {
    println!("{}", msg);
}

/// Run the viewer in a native window
pub fn run_native() {
    init_debug_from_env();

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "IFC-Pick Viewer".into(),
                resolution: (1280u32, 720u32).into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(ClearColor(Color::srgb(0.1, 0.1, 0.15)))
        .add_plugins(PickViewerPlugin)
        .run();
}
