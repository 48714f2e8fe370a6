// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial index adapter
//!
//! Turns a pointer position into the nearest intersected triangle across all
//! loaded models. Pointer coordinates are normalized against the canvas
//! rectangle, not the window, because the canvas may be offset or smaller
//! than the window.

use ifc_pick_model::{Bounds, Model};
use nalgebra::{Point3, Unit, Vector3};
use std::sync::Arc;

/// Normalized device coordinates: x right, y up, both in [-1, 1] on the canvas
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ndc {
    pub x: f32,
    pub y: f32,
}

/// On-screen rectangle of the rendering surface, in window pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportBounds {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl ViewportBounds {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle anchored at the window origin
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Map a window position to NDC
    ///
    /// Returns `None` for a zero-sized surface.
    pub fn normalize(&self, screen_x: f32, screen_y: f32) -> Option<Ndc> {
        let (width, height) = (self.width(), self.height());
        if width <= 0.0 || height <= 0.0 {
            return None;
        }

        Some(Ndc {
            x: ((screen_x - self.left) / width) * 2.0 - 1.0,
            y: -((screen_y - self.top) / height) * 2.0 + 1.0,
        })
    }
}

/// World-space ray
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Unit<Vector3<f32>>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: Unit::new_normalize(direction),
        }
    }

    /// Point at distance `t` along the ray
    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction.into_inner() * t
    }
}

/// Camera seam: projects NDC into a world ray
pub trait RayProjector {
    fn ray_through(&self, ndc: Ndc) -> Option<Ray>;
}

/// Headless perspective camera
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerspectiveCamera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Width / height
    pub aspect: f32,
}

impl PerspectiveCamera {
    /// Camera at `eye` looking at `target`, Y up, 75° field of view
    pub fn looking_at(eye: Point3<f32>, target: Point3<f32>) -> Self {
        Self {
            eye,
            target,
            up: Vector3::y(),
            fov_y: 75f32.to_radians(),
            aspect: 1.0,
        }
    }

    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }
}

impl RayProjector for PerspectiveCamera {
    fn ray_through(&self, ndc: Ndc) -> Option<Ray> {
        let forward = (self.target - self.eye).try_normalize(f32::EPSILON)?;
        let right = forward.cross(&self.up).try_normalize(f32::EPSILON)?;
        let up = right.cross(&forward);

        let half_height = (self.fov_y * 0.5).tan();
        let half_width = half_height * self.aspect;
        let direction = forward + right * (ndc.x * half_width) + up * (ndc.y * half_height);

        Some(Ray::new(self.eye, direction))
    }
}

/// Nearest triangle hit within one model
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleHit {
    pub triangle: u32,
    pub distance: f32,
}

/// Ray/model intersection primitive, first hit only
pub trait RayIntersector: Send + Sync {
    fn first_hit(&self, ray: &Ray, model: &Model) -> Option<TriangleHit>;
}

/// CPU intersector over a model's geometry buffer
///
/// Rejects whole models by bounding box first, then tests every triangle
/// keeping only the closest hit.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeshIntersector;

impl RayIntersector for MeshIntersector {
    fn first_hit(&self, ray: &Ray, model: &Model) -> Option<TriangleHit> {
        let bounds = model.bounds()?;
        ray_aabb(ray, &bounds)?;

        let geometry = model.geometry();
        let mut closest: Option<TriangleHit> = None;

        for triangle in 0..geometry.triangle_count() as u32 {
            let Some([a, b, c]) = geometry.triangle(triangle) else {
                continue;
            };
            let Some(t) = ray_triangle(ray, a.into(), b.into(), c.into()) else {
                continue;
            };
            if closest.map(|hit| t < hit.distance).unwrap_or(true) {
                closest = Some(TriangleHit {
                    triangle,
                    distance: t,
                });
            }
        }

        closest
    }
}

/// Result of a successful ray cast
#[derive(Clone, Debug)]
pub struct PickResult {
    /// Model that owns the hit triangle
    pub model: Arc<Model>,
    /// Triangle index within the model's geometry buffer
    pub triangle: u32,
    /// World-space hit point
    pub point: Point3<f32>,
    /// Distance from the ray origin
    pub distance: f32,
}

/// Finds the nearest triangle under a pointer across all models
#[derive(Clone, Debug, Default)]
pub struct SpatialIndexAdapter<I = MeshIntersector> {
    intersector: I,
}

impl SpatialIndexAdapter<MeshIntersector> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<I: RayIntersector> SpatialIndexAdapter<I> {
    /// Adapter over a custom intersection primitive
    pub fn with_intersector(intersector: I) -> Self {
        Self { intersector }
    }

    /// Cast from a window position through the canvas
    ///
    /// Returns `None` when no model is loaded, the surface is degenerate,
    /// or nothing is hit.
    pub fn cast_ray(
        &self,
        screen_x: f32,
        screen_y: f32,
        camera: &dyn RayProjector,
        viewport: &ViewportBounds,
        models: &[Arc<Model>],
    ) -> Option<PickResult> {
        if models.is_empty() {
            return None;
        }
        let ndc = viewport.normalize(screen_x, screen_y)?;
        let ray = camera.ray_through(ndc)?;
        self.cast(&ray, models)
    }

    /// Nearest hit of a world ray across models
    pub fn cast(&self, ray: &Ray, models: &[Arc<Model>]) -> Option<PickResult> {
        let mut closest: Option<(&Arc<Model>, TriangleHit)> = None;

        for model in models {
            if let Some(hit) = self.intersector.first_hit(ray, model) {
                if closest.map(|(_, c)| hit.distance < c.distance).unwrap_or(true) {
                    closest = Some((model, hit));
                }
            }
        }

        closest.map(|(model, hit)| PickResult {
            model: Arc::clone(model),
            triangle: hit.triangle,
            point: ray.at(hit.distance),
            distance: hit.distance,
        })
    }
}

/// Ray-AABB intersection (slab method), returns entry distance
fn ray_aabb(ray: &Ray, bounds: &Bounds) -> Option<f32> {
    let min = Vector3::from(bounds.min);
    let max = Vector3::from(bounds.max);
    let origin = ray.origin.coords;
    let inv_dir = ray.direction.into_inner().map(|d| 1.0 / d);

    let t1 = (min - origin).component_mul(&inv_dir);
    let t2 = (max - origin).component_mul(&inv_dir);

    let tmin = t1.inf(&t2);
    let tmax = t1.sup(&t2);

    let t_enter = tmin.x.max(tmin.y).max(tmin.z);
    let t_exit = tmax.x.min(tmax.y).min(tmax.z);

    // Flat models have zero thickness on one axis
    const SLACK: f32 = 1e-5;
    if t_enter <= t_exit + SLACK && t_exit >= 0.0 {
        Some(t_enter.max(0.0))
    } else {
        None
    }
}

/// Möller–Trumbore ray-triangle intersection, returns hit distance
fn ray_triangle(ray: &Ray, v0: Point3<f32>, v1: Point3<f32>, v2: Point3<f32>) -> Option<f32> {
    const EPSILON: f32 = 1e-8;

    let dir = ray.direction.into_inner();
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = dir.cross(&edge2);
    let a = edge1.dot(&h);
    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * dir.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    (t > EPSILON).then_some(t)
}
