//! Model meshes and scene extent
//!
//! IFC geometry is Z-up; Bevy is Y-up. Positions are converted with
//! `[x, z, -y]` when meshes are built and rays are converted back before
//! they reach the core.

use crate::camera::CameraRig;
use crate::{log, log_info, PickController};
use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use ifc_pick_core::ifc_pick_model::{Bounds, GeometryBuffer, ModelId};

/// Scene plugin
pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ModelRegistered>()
            .init_resource::<SceneExtent>()
            .init_resource::<AutoFitState>()
            .add_systems(Update, (spawn_model_system, auto_fit_camera_system).chain());
    }
}

/// A model was added to the registry and needs a mesh
#[derive(Message, Clone, Copy, Debug)]
pub struct ModelRegistered {
    pub model: ModelId,
}

/// Base mesh of a loaded model
#[derive(Component, Clone, Copy, Debug)]
pub struct ModelMesh {
    pub model: ModelId,
}

/// Union of all model bounds, in Bevy coordinates
#[derive(Resource, Default, Clone, Copy, Debug)]
pub struct SceneExtent {
    pub min: Option<Vec3>,
    pub max: Option<Vec3>,
}

impl SceneExtent {
    pub fn include(&mut self, min: Vec3, max: Vec3) {
        self.min = Some(self.min.map_or(min, |m| m.min(min)));
        self.max = Some(self.max.map_or(max, |m| m.max(max)));
    }

    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.min.zip(self.max)
    }
}

/// Camera auto-fit tracking
#[derive(Resource, Default)]
pub struct AutoFitState {
    /// Camera already frames the current extent
    pub has_fit: bool,
}

/// IFC (Z-up) point to Bevy (Y-up)
pub fn to_bevy(p: [f32; 3]) -> [f32; 3] {
    [p[0], p[2], -p[1]]
}

/// Bevy (Y-up) vector to IFC (Z-up)
pub fn to_ifc(v: Vec3) -> [f32; 3] {
    [v.x, -v.z, v.y]
}

/// IFC bounds to a Bevy-space box
pub fn bevy_bounds(bounds: &Bounds) -> (Vec3, Vec3) {
    let a = Vec3::from_array(to_bevy(bounds.min));
    let b = Vec3::from_array(to_bevy(bounds.max));
    (a.min(b), a.max(b))
}

/// Build a Bevy mesh from core geometry
///
/// Missing or zeroed normals are recomputed from the faces.
pub fn geometry_to_mesh(geometry: &GeometryBuffer, with_colors: bool) -> Mesh {
    let positions: Vec<[f32; 3]> = geometry
        .positions
        .chunks_exact(3)
        .map(|p| to_bevy([p[0], p[1], p[2]]))
        .collect();

    let normals: Vec<[f32; 3]> = if geometry.has_normals() && geometry.normals.iter().any(|n| *n != 0.0) {
        geometry
            .normals
            .chunks_exact(3)
            .map(|n| to_bevy([n[0], n[1], n[2]]))
            .collect()
    } else {
        compute_flat_normals(&positions, &geometry.indices)
    };

    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    if with_colors && geometry.has_colors() {
        let colors: Vec<[f32; 4]> = geometry
            .colors
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();
        mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);
    }
    mesh.insert_indices(Indices::U32(geometry.indices.clone()));
    mesh
}

/// Per-vertex normals accumulated from face normals
fn compute_flat_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }

        let p0 = Vec3::from_array(positions[i0]);
        let face_normal = (Vec3::from_array(positions[i1]) - p0).cross(Vec3::from_array(positions[i2]) - p0);
        for idx in [i0, i1, i2] {
            normals[idx] += face_normal;
        }
    }

    normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

/// Spawn the base mesh of each newly registered model
fn spawn_model_system(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut registered: MessageReader<ModelRegistered>,
    controller: Res<PickController>,
    mut extent: ResMut<SceneExtent>,
    mut auto_fit: ResMut<AutoFitState>,
) {
    for message in registered.read() {
        let Some(model) = controller.registry().get(message.model) else {
            log_info(&format!("[Scene] {} is not registered", message.model));
            continue;
        };
        if model.geometry().is_empty() {
            log_info(&format!("[Scene] {} has no geometry", model.name()));
            continue;
        }

        let mesh = meshes.add(geometry_to_mesh(model.geometry(), true));
        let material = materials.add(StandardMaterial {
            base_color: Color::WHITE,
            perceptual_roughness: 0.6,
            metallic: 0.0,
            reflectance: 0.4,
            double_sided: true,
            cull_mode: None,
            ..default()
        });

        commands.spawn((
            Mesh3d(mesh),
            MeshMaterial3d(material),
            Transform::default(),
            ModelMesh { model: model.id() },
            Name::new(model.name().to_string()),
        ));

        if let Some(bounds) = model.bounds() {
            let (min, max) = bevy_bounds(&bounds);
            extent.include(min, max);
            auto_fit.has_fit = false;
        }

        log(&format!(
            "[Scene] Spawned {} ({} triangles, {} elements)",
            model.name(),
            model.geometry().triangle_count(),
            model.elements().len()
        ));
    }
}

/// Frame the scene once its extent changes
fn auto_fit_camera_system(
    extent: Res<SceneExtent>,
    mut auto_fit: ResMut<AutoFitState>,
    mut rig: ResMut<CameraRig>,
) {
    if auto_fit.has_fit {
        return;
    }

    if let Some((min, max)) = extent.bounds() {
        rig.fit_bounds(min, max);
        log(&format!(
            "[Scene] Camera fitted: target={:?}, distance={}",
            rig.target, rig.distance
        ));
        auto_fit.has_fit = true;
    }
}
