//! Camera and lighting
//!
//! The camera is placed on a sphere around a target point. It has no
//! interactive controls; it is re-fitted whenever the scene extent grows.

use bevy::prelude::*;

/// Isometric default azimuth (45 degrees)
pub const DEFAULT_AZIMUTH: f32 = 0.785;
/// Isometric default elevation (~35 degrees)
pub const DEFAULT_ELEVATION: f32 = 0.615;

/// Camera plugin
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraRig>()
            .add_systems(Startup, setup_camera)
            .add_systems(Update, camera_update_system);
    }
}

/// Marker for the viewport camera
#[derive(Component)]
pub struct MainCamera;

/// Spherical camera placement
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct CameraRig {
    /// Point the camera looks at
    pub target: Vec3,
    /// Distance from target
    pub distance: f32,
    /// Horizontal angle
    pub azimuth: f32,
    /// Vertical angle
    pub elevation: f32,
    /// Field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 20.0,
            azimuth: DEFAULT_AZIMUTH,
            elevation: DEFAULT_ELEVATION,
            fov: 45.0,
            near: 0.1,
            far: 100_000.0,
        }
    }
}

impl CameraRig {
    /// Camera position from spherical coordinates
    pub fn get_position(&self) -> Vec3 {
        let x = self.distance * self.elevation.cos() * self.azimuth.sin();
        let y = self.distance * self.elevation.sin();
        let z = self.distance * self.elevation.cos() * self.azimuth.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Frame an axis-aligned box from the isometric angle
    pub fn fit_bounds(&mut self, min: Vec3, max: Vec3) {
        let diagonal = (max - min).length();
        let fov_rad = self.fov.to_radians();

        self.target = (min + max) * 0.5;
        self.distance = (diagonal / (2.0 * (fov_rad / 2.0).tan())).max(1.0);
        self.azimuth = DEFAULT_AZIMUTH;
        self.elevation = DEFAULT_ELEVATION;
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.get_position()).looking_at(self.target, Vec3::Y)
    }
}

fn setup_camera(mut commands: Commands, rig: Res<CameraRig>) {
    use bevy::render::view::Msaa;

    commands.spawn((
        Camera3d::default(),
        rig.transform(),
        Projection::Perspective(PerspectiveProjection {
            fov: rig.fov.to_radians(),
            near: rig.near,
            far: rig.far,
            ..default()
        }),
        MainCamera,
        Msaa::Sample4,
    ));

    commands.spawn(AmbientLight {
        color: Color::WHITE,
        brightness: 80.0,
        affects_lightmapped_meshes: true,
    });

    // Key light
    commands.spawn((
        DirectionalLight {
            color: Color::srgb(1.0, 0.99, 0.97),
            illuminance: 25000.0,
            shadows_enabled: false,
            affects_lightmapped_mesh_diffuse: true,
            ..default()
        },
        Transform::from_xyz(0.5, 1.0, 0.3).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // Fill light
    commands.spawn((
        DirectionalLight {
            color: Color::srgb(0.85, 0.9, 1.0),
            illuminance: 8000.0,
            shadows_enabled: false,
            affects_lightmapped_mesh_diffuse: true,
            ..default()
        },
        Transform::from_xyz(-0.5, 0.3, -0.5).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

/// Move the camera when the rig changes
fn camera_update_system(
    rig: Res<CameraRig>,
    mut cameras: Query<(&mut Transform, &mut Projection), With<MainCamera>>,
) {
    if !rig.is_changed() {
        return;
    }

    for (mut transform, mut projection) in cameras.iter_mut() {
        *transform = rig.transform();
        if let Projection::Perspective(ref mut perspective) = *projection {
            // keep the far plane beyond the whole model
            perspective.far = rig.far.max(rig.distance * 10.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_is_at_distance_from_target() {
        let rig = CameraRig {
            target: Vec3::new(5.0, 1.0, -3.0),
            distance: 12.0,
            ..default()
        };
        let offset = rig.get_position() - rig.target;
        assert!((offset.length() - 12.0).abs() < 1e-4);
        // isometric default looks down onto the target
        assert!(offset.y > 0.0);
    }

    #[test]
    fn fit_bounds_centers_and_backs_off() {
        let mut rig = CameraRig::default();
        rig.fit_bounds(Vec3::new(-10.0, 0.0, -10.0), Vec3::new(10.0, 6.0, 10.0));

        assert_eq!(rig.target, Vec3::new(0.0, 3.0, 0.0));
        let diagonal = Vec3::new(20.0, 6.0, 20.0).length();
        assert!(rig.distance > diagonal);
    }

    #[test]
    fn fit_bounds_of_a_point_keeps_minimum_distance() {
        let mut rig = CameraRig::default();
        rig.fit_bounds(Vec3::ONE, Vec3::ONE);
        assert_eq!(rig.distance, 1.0);
        assert_eq!(rig.target, Vec3::ONE);
    }

    #[test]
    fn transform_looks_at_target() {
        let rig = CameraRig::default();
        let transform = rig.transform();
        let to_target = (rig.target - transform.translation).normalize();
        assert!(transform.forward().dot(to_target) > 0.999);
    }
}
