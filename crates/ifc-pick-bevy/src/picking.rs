//! Pointer systems
//!
//! Hover is resolved inside the frame, throttled to every Nth frame. A left
//! press casts the ray immediately and resolves the element and its
//! properties on the async compute pool; finished tasks are applied on a
//! later frame, where the controller drops results that a newer press has
//! superseded.

use crate::camera::MainCamera;
use crate::scene::to_ifc;
use crate::subset::{BevySubsetRenderer, SubsetEntities};
use crate::{log, log_info, PickController, PropertyCatalog};
use bevy::prelude::*;
use bevy::tasks::{block_on, poll_once, AsyncComputeTaskPool, Task};
use bevy::window::PrimaryWindow;
use ifc_pick_core::{Applied, Channel, ChannelState, Ndc, Ray, RayProjector, Resolution, ViewportBounds};
use nalgebra::{Point3, Vector3};

/// NDC depth of the near plane (reverse-Z)
const NEAR_DEPTH: f32 = 1.0;
/// NDC depth of a second point along the pixel's line of sight
const MID_DEPTH: f32 = 0.5;

/// Picking plugin
pub struct PickingPlugin;

impl Plugin for PickingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SubsetEntities>()
            .init_resource::<PendingSelections>()
            .add_systems(
                Update,
                (hover_system, press_system, apply_selections_system).chain(),
            );
    }
}

/// Selection resolutions still running on the compute pool
#[derive(Resource, Default)]
pub struct PendingSelections {
    tasks: Vec<Task<Resolution>>,
}

impl PendingSelections {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Bevy camera as a core ray projector
///
/// Rays come out in IFC (Z-up) coordinates.
pub struct ViewportCamera<'a> {
    pub camera: &'a Camera,
    pub transform: &'a GlobalTransform,
}

impl RayProjector for ViewportCamera<'_> {
    fn ray_through(&self, ndc: Ndc) -> Option<Ray> {
        let near = self
            .camera
            .ndc_to_world(self.transform, Vec3::new(ndc.x, ndc.y, NEAR_DEPTH))?;
        let mid = self
            .camera
            .ndc_to_world(self.transform, Vec3::new(ndc.x, ndc.y, MID_DEPTH))?;
        ray_between(near, mid)
    }
}

/// Core ray from two Bevy-space points on a line of sight
pub fn ray_between(near: Vec3, far: Vec3) -> Option<Ray> {
    let direction = far - near;
    if !near.is_finite() || !direction.is_finite() || direction.length_squared() <= f32::EPSILON {
        return None;
    }
    Some(Ray::new(
        Point3::from(to_ifc(near)),
        Vector3::from(to_ifc(direction)),
    ))
}

/// Canvas rectangle in window coordinates
///
/// Uses the camera viewport when one is set, else the whole window.
pub fn viewport_bounds(viewport: Option<Rect>, window_size: Vec2) -> ViewportBounds {
    match viewport {
        Some(rect) => ViewportBounds::new(rect.min.x, rect.min.y, rect.max.x, rect.max.y),
        None => ViewportBounds::from_size(window_size.x, window_size.y),
    }
}

/// Hover system - highlights the element under the cursor
#[allow(clippy::too_many_arguments)]
fn hover_system(
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    mut controller: ResMut<PickController>,
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut overlays: ResMut<SubsetEntities>,
    mut frame_counter: Local<u32>,
) {
    let settings = controller.settings();
    if !settings.hover_enabled {
        return;
    }

    // Throttle hover detection
    *frame_counter = frame_counter.wrapping_add(1);
    if *frame_counter % settings.hover_throttle_frames != 0 {
        return;
    }

    let Ok(window) = windows.single() else { return };
    let Ok((camera, camera_transform)) = cameras.single() else { return };
    let mut renderer =
        BevySubsetRenderer::new(&mut commands, &mut meshes, &mut materials, &mut overlays);

    let Some(cursor) = window.cursor_position() else {
        if controller.channel_state(Channel::Hover) != ChannelState::Empty {
            if let Err(e) = controller.clear_channel(Channel::Hover, &mut renderer) {
                log(&format!("[Picking] Clearing hover failed: {}", e));
            }
        }
        return;
    };

    let viewport = viewport_bounds(camera.logical_viewport_rect(), window.size());
    let projector = ViewportCamera {
        camera,
        transform: camera_transform,
    };

    match controller.on_hover(cursor.x, cursor.y, &projector, &viewport, &mut renderer) {
        Ok(Applied::Highlighted { element, .. }) => {
            log(&format!("[Picking] Hovering {}", element));
        }
        Ok(_) => {}
        Err(e) => log(&format!("[Picking] Hover failed: {}", e)),
    }
}

/// Press system - casts the selection ray and starts property resolution
fn press_system(
    mouse_button: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    mut controller: ResMut<PickController>,
    catalog: Res<PropertyCatalog>,
    mut pending: ResMut<PendingSelections>,
) {
    if !mouse_button.just_pressed(MouseButton::Left) {
        return;
    }

    let Ok(window) = windows.single() else { return };
    let Some(cursor) = window.cursor_position() else { return };
    let Ok((camera, camera_transform)) = cameras.single() else { return };

    let viewport = viewport_bounds(camera.logical_viewport_rect(), window.size());
    let projector = ViewportCamera {
        camera,
        transform: camera_transform,
    };
    let request = controller.begin(Channel::Selection, cursor.x, cursor.y, &projector, &viewport);

    let store = catalog.0.clone();
    let task = AsyncComputeTaskPool::get().spawn(async move { request.resolve(Some(&store)) });
    pending.tasks.push(task);
}

/// Apply finished selection resolutions in completion order
fn apply_selections_system(
    mut pending: ResMut<PendingSelections>,
    mut controller: ResMut<PickController>,
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut overlays: ResMut<SubsetEntities>,
) {
    if pending.tasks.is_empty() {
        return;
    }

    let mut renderer =
        BevySubsetRenderer::new(&mut commands, &mut meshes, &mut materials, &mut overlays);

    pending.tasks.retain_mut(|task| {
        let Some(resolution) = block_on(poll_once(task)) else {
            return true;
        };

        match controller.apply(resolution, &mut renderer) {
            Ok(Applied::Highlighted {
                element,
                properties,
            }) => {
                let name = controller
                    .registry()
                    .get(element.model)
                    .and_then(|m| m.element(element.express_id))
                    .and_then(|e| e.name.clone())
                    .unwrap_or_default();
                log_info(&format!("[Picking] Selected {} {}", element, name));
                if let Some(Err(e)) = properties {
                    log_info(&format!("[Picking] Properties unavailable: {}", e));
                }
            }
            Ok(Applied::Cleared) => log("[Picking] Selection cleared"),
            Ok(Applied::Stale) => log("[Picking] Superseded selection dropped"),
            Err(e) => log_info(&format!("[Picking] Selection failed: {}", e)),
        }
        false
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_converted_to_z_up() {
        // Bevy camera above the origin looking down -Y
        let ray = ray_between(Vec3::new(1.0, 10.0, -2.0), Vec3::new(1.0, 5.0, -2.0)).unwrap();

        assert_eq!(ray.origin, Point3::new(1.0, 2.0, 10.0));
        assert!((ray.direction.into_inner() - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-6);
    }

    #[test]
    fn degenerate_line_of_sight_has_no_ray() {
        assert!(ray_between(Vec3::ONE, Vec3::ONE).is_none());
        assert!(ray_between(Vec3::ZERO, Vec3::new(f32::INFINITY, 0.0, 0.0)).is_none());
    }

    #[test]
    fn viewport_prefers_camera_rect() {
        let rect = Rect::new(100.0, 50.0, 900.0, 650.0);
        let bounds = viewport_bounds(Some(rect), Vec2::new(1280.0, 720.0));
        assert_eq!(bounds, ViewportBounds::new(100.0, 50.0, 900.0, 650.0));

        let ndc = bounds.normalize(500.0, 350.0).unwrap();
        assert_eq!((ndc.x, ndc.y), (0.0, 0.0));
    }

    #[test]
    fn viewport_falls_back_to_window() {
        let bounds = viewport_bounds(None, Vec2::new(1280.0, 720.0));
        assert_eq!(bounds, ViewportBounds::from_size(1280.0, 720.0));
    }

    #[test]
    fn no_pending_selections_by_default() {
        let pending = PendingSelections::default();
        assert!(pending.is_empty());
        assert_eq!(pending.len(), 0);
    }
}
