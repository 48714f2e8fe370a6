//! Model loading from disk
//!
//! A model is a `.ifcb` geometry bundle plus an optional property document
//! next to it (`house.ifcb` + `house.props.json`).

use crate::scene::ModelRegistered;
use crate::{log, log_info, PickController, PropertyCatalog};
use anyhow::Context;
use bevy::prelude::*;
use bevy::tasks::Task;
use ifc_pick_core::ifc_pick_model::ModelId;
use ifc_pick_core::{BundleLoader, InMemoryPropertyStore, InteractionController, ModelProperties};
use std::path::{Path, PathBuf};

/// Bundle file extension
pub const BUNDLE_EXTENSION: &str = "ifcb";
/// Extension of the property document next to a bundle
pub const SIDECAR_EXTENSION: &str = "props.json";

/// Loader plugin
pub struct LoaderPlugin;

impl Plugin for LoaderPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<LoadModelRequest>()
            .add_message::<OpenFileDialogRequest>()
            .init_resource::<FileDialogState>()
            .add_systems(
                Update,
                (
                    open_dialog_shortcut,
                    handle_open_dialog_request,
                    poll_file_dialog,
                    handle_file_drop,
                    handle_load_request,
                )
                    .chain(),
            );
    }
}

/// Load a bundle from disk
#[derive(Message, Clone, Debug)]
pub struct LoadModelRequest {
    pub path: PathBuf,
}

/// Request to open the file dialog
#[derive(Message, Clone, Copy, Debug)]
pub struct OpenFileDialogRequest;

/// Pending file dialog
#[derive(Resource, Default)]
pub struct FileDialogState {
    task: Option<Task<Option<PathBuf>>>,
}

/// Property document expected next to a bundle
pub fn sidecar_path(bundle: &Path) -> PathBuf {
    bundle.with_extension(SIDECAR_EXTENSION)
}

fn is_bundle(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(BUNDLE_EXTENSION))
}

/// Load a bundle and its sidecar, then register both
///
/// The sidecar is parsed before the model is registered so a broken
/// document never leaves a model without a mesh.
pub fn load_model_file(
    path: &Path,
    controller: &mut InteractionController,
    catalog: &mut InMemoryPropertyStore,
) -> anyhow::Result<ModelId> {
    let sidecar = sidecar_path(path);
    let properties = if sidecar.exists() {
        let json = std::fs::read_to_string(&sidecar)
            .with_context(|| format!("reading {}", sidecar.display()))?;
        let props = ModelProperties::from_json_str(&json)
            .with_context(|| format!("parsing {}", sidecar.display()))?;
        Some(props)
    } else {
        None
    };

    let id = controller
        .load_model_path(&BundleLoader, path)
        .with_context(|| format!("loading {}", path.display()))?;

    match properties {
        Some(props) => {
            log(&format!("[Loader] {} property items for {}", props.len(), id));
            catalog.insert(id, props);
        }
        None => log_info(&format!(
            "[Loader] No {} next to {}, selection will show no properties",
            SIDECAR_EXTENSION,
            path.display()
        )),
    }
    Ok(id)
}

/// `O` opens the file dialog
fn open_dialog_shortcut(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut requests: MessageWriter<OpenFileDialogRequest>,
) {
    if keyboard.just_pressed(KeyCode::KeyO) {
        requests.write(OpenFileDialogRequest);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn handle_open_dialog_request(
    mut requests: MessageReader<OpenFileDialogRequest>,
    mut state: ResMut<FileDialogState>,
) {
    use bevy::tasks::IoTaskPool;

    for _ in requests.read() {
        if state.task.is_some() {
            log("[Loader] File dialog already open");
            continue;
        }

        log_info("[Loader] Opening file dialog...");

        let task = IoTaskPool::get().spawn(async {
            rfd::AsyncFileDialog::new()
                .add_filter("IFC Bundles", &[BUNDLE_EXTENSION])
                .set_title("Open IFC Bundle")
                .pick_file()
                .await
                .map(|f| f.path().to_path_buf())
        });
        state.task = Some(task);
    }
}

#[cfg(target_arch = "wasm32")]
fn handle_open_dialog_request(
    mut requests: MessageReader<OpenFileDialogRequest>,
    _state: ResMut<FileDialogState>,
) {
    if requests.read().count() > 0 {
        log_info("[Loader] File dialog unavailable on this platform");
    }
}

fn poll_file_dialog(
    mut state: ResMut<FileDialogState>,
    mut load_requests: MessageWriter<LoadModelRequest>,
) {
    let Some(task) = state.task.as_mut() else { return };
    let Some(result) = bevy::tasks::block_on(bevy::tasks::poll_once(task)) else {
        return;
    };

    match result {
        Some(path) => {
            log_info(&format!("[Loader] File selected: {}", path.display()));
            load_requests.write(LoadModelRequest { path });
        }
        None => log("[Loader] File dialog cancelled"),
    }
    state.task = None;
}

fn handle_file_drop(
    mut drops: MessageReader<bevy::window::FileDragAndDrop>,
    mut load_requests: MessageWriter<LoadModelRequest>,
) {
    for event in drops.read() {
        if let bevy::window::FileDragAndDrop::DroppedFile { path_buf, .. } = event {
            if is_bundle(path_buf) {
                log_info(&format!("[Loader] File dropped: {}", path_buf.display()));
                load_requests.write(LoadModelRequest {
                    path: path_buf.clone(),
                });
            } else {
                log_info(&format!(
                    "[Loader] Ignoring {}: not a .{} bundle",
                    path_buf.display(),
                    BUNDLE_EXTENSION
                ));
            }
        }
    }
}

fn handle_load_request(
    mut requests: MessageReader<LoadModelRequest>,
    mut controller: ResMut<PickController>,
    mut catalog: ResMut<PropertyCatalog>,
    mut registered: MessageWriter<ModelRegistered>,
) {
    for request in requests.read() {
        log_info(&format!("[Loader] Loading {}", request.path.display()));

        match load_model_file(&request.path, &mut controller.0, &mut catalog.0) {
            Ok(model) => {
                registered.write(ModelRegistered { model });
            }
            Err(e) => log_info(&format!("[Loader] Error: {:#}", e)),
        }
    }
}
