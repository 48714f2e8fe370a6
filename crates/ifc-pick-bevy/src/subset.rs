//! Highlight overlays as Bevy entities

use crate::scene::geometry_to_mesh;
use bevy::prelude::*;
use ifc_pick_core::ifc_pick_model::{
    GeometryBuffer, HighlightMaterial, SubsetError, SubsetHandle, SubsetRenderer, SubsetRequest,
};
use rustc_hash::FxHashMap;

/// Overlays drawn without depth testing are pushed this far toward the camera
const NO_DEPTH_TEST_BIAS: f32 = 10_000.0;
/// Keeps depth-tested overlays from z-fighting with the base mesh
const COPLANAR_BIAS: f32 = 1.0;

/// Marker on overlay entities
#[derive(Component, Clone, Copy, Debug)]
pub struct HighlightOverlay {
    pub handle: SubsetHandle,
}

#[derive(Debug)]
struct LiveOverlay {
    entity: Entity,
    mesh: Handle<Mesh>,
    material: Handle<StandardMaterial>,
}

/// Live overlays by handle
#[derive(Resource, Default, Debug)]
pub struct SubsetEntities {
    next: u64,
    live: FxHashMap<SubsetHandle, LiveOverlay>,
}

impl SubsetEntities {
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn entity(&self, handle: SubsetHandle) -> Option<Entity> {
        self.live.get(&handle).map(|o| o.entity)
    }
}

/// Overlay material for a highlight preset
pub fn overlay_material(material: &HighlightMaterial) -> StandardMaterial {
    let [r, g, b, a] = material.rgba();
    StandardMaterial {
        base_color: Color::srgba(r, g, b, a),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        double_sided: true,
        cull_mode: None,
        depth_bias: if material.depth_test {
            COPLANAR_BIAS
        } else {
            NO_DEPTH_TEST_BIAS
        },
        ..default()
    }
}

/// [`SubsetRenderer`] over the ECS
///
/// Borrows what a system needs to spawn and despawn overlays; entity changes
/// land when the system's commands are applied.
pub struct BevySubsetRenderer<'a, 'w, 's> {
    commands: &'a mut Commands<'w, 's>,
    meshes: &'a mut Assets<Mesh>,
    materials: &'a mut Assets<StandardMaterial>,
    overlays: &'a mut SubsetEntities,
}

impl<'a, 'w, 's> BevySubsetRenderer<'a, 'w, 's> {
    pub fn new(
        commands: &'a mut Commands<'w, 's>,
        meshes: &'a mut Assets<Mesh>,
        materials: &'a mut Assets<StandardMaterial>,
        overlays: &'a mut SubsetEntities,
    ) -> Self {
        Self {
            commands,
            meshes,
            materials,
            overlays,
        }
    }
}

impl SubsetRenderer for BevySubsetRenderer<'_, '_, '_> {
    fn create_subset(&mut self, request: SubsetRequest<'_>) -> Result<SubsetHandle, SubsetError> {
        let mut geometry = GeometryBuffer::new();
        for &id in request.ids {
            geometry.append(&request.model.element_geometry(id));
        }
        if geometry.is_empty() {
            return Err(SubsetError::EmptyGeometry(
                request.ids.first().copied().unwrap_or_default(),
            ));
        }

        let handle = SubsetHandle(self.overlays.next);
        self.overlays.next += 1;

        let mesh = self.meshes.add(geometry_to_mesh(&geometry, false));
        let material = self.materials.add(overlay_material(request.material));
        let entity = self
            .commands
            .spawn((
                Mesh3d(mesh.clone()),
                MeshMaterial3d(material.clone()),
                Transform::default(),
                HighlightOverlay { handle },
            ))
            .id();

        crate::log(&format!(
            "[Subset] Created overlay {:?} ({} triangles) for {}",
            handle,
            geometry.triangle_count(),
            request.model.name()
        ));
        self.overlays.live.insert(
            handle,
            LiveOverlay {
                entity,
                mesh,
                material,
            },
        );
        Ok(handle)
    }

    fn remove_subset(&mut self, handle: SubsetHandle) -> Result<(), SubsetError> {
        let overlay = self
            .overlays
            .live
            .remove(&handle)
            .ok_or(SubsetError::UnknownSubset(handle))?;

        self.commands.entity(overlay.entity).despawn();
        self.meshes.remove(&overlay.mesh);
        self.materials.remove(&overlay.material);

        crate::log(&format!("[Subset] Removed overlay {:?}", handle));
        Ok(())
    }
}
