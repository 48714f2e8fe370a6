// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ray cast and element resolution over large triangle grids
//!
//! Run with: cargo bench -p ifc-pick-core --bench raycast

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ifc_pick_core::ifc_pick_model::{
    DecodedModel, ElementIndex, ExpressId, GeometryBuffer, Model, ModelId,
};
use ifc_pick_core::{resolve_element, PerspectiveCamera, SpatialIndexAdapter, ViewportBounds};
use nalgebra::Point3;
use std::sync::Arc;

/// Flat `side x side` grid of quads, one element per row
fn grid_model(side: u32) -> Arc<Model> {
    let mut positions = Vec::with_capacity(((side + 1) * (side + 1) * 3) as usize);
    for y in 0..=side {
        for x in 0..=side {
            positions.extend_from_slice(&[x as f32, y as f32, 0.0]);
        }
    }

    let stride = side + 1;
    let mut indices = Vec::with_capacity((side * side * 6) as usize);
    let mut ids = Vec::with_capacity((side * side * 2) as usize);
    for y in 0..side {
        for x in 0..side {
            let a = y * stride + x;
            indices.extend_from_slice(&[a, a + 1, a + stride + 1, a, a + stride + 1, a + stride]);
            ids.extend_from_slice(&[Some(ExpressId(y + 1)); 2]);
        }
    }

    let decoded = DecodedModel {
        name: format!("grid {}", side),
        geometry: GeometryBuffer {
            positions,
            indices,
            ..Default::default()
        },
        index: ElementIndex::from_per_triangle(&ids),
        elements: Vec::new(),
    };
    Arc::new(Model::new(ModelId(0), decoded))
}

fn bench_cast(c: &mut Criterion) {
    let mut group = c.benchmark_group("raycast");
    let adapter = SpatialIndexAdapter::new();
    let viewport = ViewportBounds::from_size(1280.0, 720.0);

    for side in [32u32, 128, 256] {
        let models = vec![grid_model(side)];
        let center = side as f32 * 0.5 + 0.25;
        let camera = PerspectiveCamera::looking_at(
            Point3::new(center, center, side as f32),
            Point3::new(center, center, 0.0),
        )
        .with_aspect(1280.0 / 720.0);

        group.throughput(Throughput::Elements(side as u64 * side as u64 * 2));
        group.bench_with_input(BenchmarkId::new("hit", side), &models, |b, models| {
            b.iter(|| {
                let hit = adapter.cast_ray(black_box(640.0), black_box(360.0), &camera, &viewport, models);
                black_box(hit.map(|h| resolve_element(&h)))
            })
        });
        group.bench_with_input(BenchmarkId::new("miss", side), &models, |b, models| {
            b.iter(|| {
                // corner of the window points past the grid's bounding box
                black_box(adapter.cast_ray(black_box(0.0), black_box(0.0), &camera, &viewport, models))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cast);
criterion_main!(benches);
