// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded geometry and the triangle-to-element index

use crate::{ExpressId, IfcType, LoadError, ModelId};
use serde::{Deserialize, Serialize};

/// GPU-ready triangle soup for one model
///
/// All arrays are flattened: positions and normals as `[x, y, z, ...]`,
/// colors as `[r, g, b, a, ...]` (optional, per vertex).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryBuffer {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub colors: Vec<f32>,
    pub indices: Vec<u32>,
}

impl GeometryBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether per-vertex normals are present for every vertex
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty() && self.normals.len() == self.positions.len()
    }

    /// Whether per-vertex colors are present for every vertex
    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty() && self.colors.len() / 4 == self.vertex_count()
    }

    /// Position of a vertex
    pub fn vertex(&self, index: u32) -> Option<[f32; 3]> {
        let i = index as usize * 3;
        let p = self.positions.get(i..i + 3)?;
        Some([p[0], p[1], p[2]])
    }

    /// The three corner positions of a triangle
    pub fn triangle(&self, triangle: u32) -> Option<[[f32; 3]; 3]> {
        let i = triangle as usize * 3;
        let idx = self.indices.get(i..i + 3)?;
        Some([
            self.vertex(idx[0])?,
            self.vertex(idx[1])?,
            self.vertex(idx[2])?,
        ])
    }

    /// Axis-aligned bounds of all vertices
    pub fn bounds(&self) -> Option<Bounds> {
        let mut chunks = self.positions.chunks_exact(3);
        let first = chunks.next()?;
        let mut bounds = Bounds::point([first[0], first[1], first[2]]);
        for p in chunks {
            bounds.include([p[0], p[1], p[2]]);
        }
        Some(bounds)
    }

    /// Check array lengths and index ranges
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.positions.len() % 3 != 0 {
            return Err(LoadError::format("position array is not a multiple of 3"));
        }
        if self.indices.len() % 3 != 0 {
            return Err(LoadError::format("index array is not a multiple of 3"));
        }
        if !self.normals.is_empty() && self.normals.len() != self.positions.len() {
            return Err(LoadError::format(format!(
                "{} normals for {} positions",
                self.normals.len(),
                self.positions.len()
            )));
        }
        let vertex_count = self.vertex_count() as u32;
        if let Some(bad) = self.indices.iter().find(|&&i| i >= vertex_count) {
            return Err(LoadError::format(format!(
                "vertex index {} out of range ({} vertices)",
                bad, vertex_count
            )));
        }
        Ok(())
    }

    /// Append another buffer, re-basing its indices
    ///
    /// Returns the triangle offset at which `other` starts.
    pub fn append(&mut self, other: &GeometryBuffer) -> u32 {
        let triangle_offset = self.triangle_count() as u32;
        let vertex_offset = self.vertex_count() as u32;

        self.positions.extend_from_slice(&other.positions);
        if other.has_normals() {
            self.normals.extend_from_slice(&other.normals);
        } else {
            self.normals
                .extend(std::iter::repeat(0.0).take(other.positions.len()));
        }
        if other.has_colors() {
            self.colors.extend_from_slice(&other.colors);
        } else {
            self.colors
                .extend(std::iter::repeat(1.0).take(other.vertex_count() * 4));
        }
        self.indices
            .extend(other.indices.iter().map(|i| i + vertex_offset));

        triangle_offset
    }

    /// Copy the triangles covered by `spans` into a standalone buffer
    ///
    /// Vertices are duplicated per triangle; overlays are small and never
    /// share vertices with the base mesh.
    pub fn extract(&self, spans: &[TriangleSpan]) -> GeometryBuffer {
        let triangle_total: usize = spans.iter().map(|s| s.count as usize).sum();
        let mut out = GeometryBuffer {
            positions: Vec::with_capacity(triangle_total * 9),
            normals: Vec::with_capacity(triangle_total * 9),
            colors: Vec::new(),
            indices: Vec::with_capacity(triangle_total * 3),
        };
        let with_normals = self.has_normals();

        for span in spans {
            for triangle in span.start..span.end() {
                let i = triangle as usize * 3;
                let Some(corners) = self.indices.get(i..i + 3) else {
                    break;
                };
                let fetch: fn(&[f32], u32) -> Option<&[f32]> = |data, v| {
                    let p = v as usize * 3;
                    data.get(p..p + 3)
                };
                // skip the whole triangle if any corner is out of range
                let Some(points) = corners
                    .iter()
                    .map(|&v| fetch(&self.positions, v))
                    .collect::<Option<Vec<_>>>()
                else {
                    continue;
                };
                let normals = if with_normals {
                    corners
                        .iter()
                        .map(|&v| fetch(&self.normals, v))
                        .collect::<Option<Vec<_>>>()
                } else {
                    None
                };

                for (k, point) in points.into_iter().enumerate() {
                    out.positions.extend_from_slice(point);
                    if let Some(normals) = &normals {
                        out.normals.extend_from_slice(normals[k]);
                    }
                    out.indices.push(out.indices.len() as u32);
                }
            }
        }

        out
    }
}

/// Axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Bounds {
    /// Degenerate box around a single point
    pub fn point(p: [f32; 3]) -> Self {
        Self { min: p, max: p }
    }

    /// Grow to include a point
    pub fn include(&mut self, p: [f32; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(p[axis]);
            self.max[axis] = self.max[axis].max(p[axis]);
        }
    }
}

/// A contiguous run of triangles belonging to one element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriangleSpan {
    /// First triangle index
    pub start: u32,
    /// Number of triangles
    pub count: u32,
    /// Owning element
    pub express_id: ExpressId,
}

impl TriangleSpan {
    pub fn new(start: u32, count: u32, express_id: ExpressId) -> Self {
        Self {
            start,
            count,
            express_id,
        }
    }

    /// One past the last triangle index, saturating at `u32::MAX`
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.count)
    }

    pub fn contains(&self, triangle: u32) -> bool {
        triangle >= self.start && triangle < self.end()
    }
}

/// Geometry-to-element index
///
/// Maps triangle indices of a model's [`GeometryBuffer`] to the express ID
/// of the element they were tessellated from. Spans are kept sorted and
/// never overlap, so lookup is a binary search.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElementIndex {
    spans: Vec<TriangleSpan>,
}

impl ElementIndex {
    /// Build from spans in any order
    ///
    /// Empty spans are dropped; overlapping spans are rejected.
    pub fn from_spans(mut spans: Vec<TriangleSpan>) -> Result<Self, LoadError> {
        spans.retain(|s| s.count > 0);
        spans.sort_by_key(|s| s.start);

        if let Some(span) = spans.iter().find(|s| s.start.checked_add(s.count).is_none()) {
            return Err(LoadError::index(format!(
                "span of {} at triangle {} with {} triangles runs past the index range",
                span.express_id, span.start, span.count
            )));
        }

        for pair in spans.windows(2) {
            if pair[1].start < pair[0].end() {
                return Err(LoadError::index(format!(
                    "span of {} at triangle {} overlaps span of {} ending at {}",
                    pair[1].express_id,
                    pair[1].start,
                    pair[0].express_id,
                    pair[0].end()
                )));
            }
        }

        Ok(Self { spans })
    }

    /// Build from a per-triangle mapping (`None` = unmapped triangle)
    pub fn from_per_triangle(ids: &[Option<ExpressId>]) -> Self {
        let mut spans: Vec<TriangleSpan> = Vec::new();

        for (triangle, id) in ids.iter().enumerate() {
            let Some(id) = *id else { continue };
            let triangle = triangle as u32;
            match spans.last_mut() {
                Some(last) if last.express_id == id && last.end() == triangle => last.count += 1,
                _ => spans.push(TriangleSpan::new(triangle, 1, id)),
            }
        }

        Self { spans }
    }

    /// Express ID owning a triangle, if mapped
    pub fn express_id(&self, triangle: u32) -> Option<ExpressId> {
        let after = self.spans.partition_point(|s| s.start <= triangle);
        let span = self.spans.get(after.checked_sub(1)?)?;
        span.contains(triangle).then_some(span.express_id)
    }

    /// All spans belonging to an element
    pub fn spans_for(&self, express_id: ExpressId) -> Vec<TriangleSpan> {
        self.spans
            .iter()
            .filter(|s| s.express_id == express_id)
            .copied()
            .collect()
    }

    /// All spans in triangle order
    pub fn spans(&self) -> &[TriangleSpan] {
        &self.spans
    }

    /// Number of spans
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Reject spans reaching past the end of the geometry
    pub fn validate(&self, triangle_count: usize) -> Result<(), LoadError> {
        match self.spans.last() {
            Some(last) if last.end() as usize > triangle_count => Err(LoadError::index(format!(
                "span of {} ends at triangle {} but geometry has {}",
                last.express_id,
                last.end(),
                triangle_count
            ))),
            _ => Ok(()),
        }
    }
}

/// Per-element metadata carried alongside the geometry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementSummary {
    pub express_id: ExpressId,
    pub ifc_type: IfcType,
    pub name: Option<String>,
    /// Base RGBA color
    pub color: [f32; 4],
}

/// Loader output that has not been registered yet
#[derive(Clone, Debug, Default)]
pub struct DecodedModel {
    /// Source name (usually the file name)
    pub name: String,
    pub geometry: GeometryBuffer,
    pub index: ElementIndex,
    pub elements: Vec<ElementSummary>,
}

impl DecodedModel {
    /// Check geometry and index agree
    pub fn validate(&self) -> Result<(), LoadError> {
        self.geometry.validate()?;
        self.index.validate(self.geometry.triangle_count())
    }
}

/// A loaded, registered building model
///
/// Immutable after registration; shared by reference (`Arc<Model>`) between
/// the registry, pick results, and overlay construction.
#[derive(Debug)]
pub struct Model {
    id: ModelId,
    name: String,
    geometry: GeometryBuffer,
    index: ElementIndex,
    elements: Vec<ElementSummary>,
    bounds: Option<Bounds>,
}

impl Model {
    /// Bind decoded data to its registry id
    pub fn new(id: ModelId, decoded: DecodedModel) -> Self {
        let bounds = decoded.geometry.bounds();
        Self {
            id,
            name: decoded.name,
            geometry: decoded.geometry,
            index: decoded.index,
            elements: decoded.elements,
            bounds,
        }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &GeometryBuffer {
        &self.geometry
    }

    pub fn index(&self) -> &ElementIndex {
        &self.index
    }

    pub fn elements(&self) -> &[ElementSummary] {
        &self.elements
    }

    /// Bounds of the whole model (`None` for empty geometry)
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Metadata of one element
    pub fn element(&self, express_id: ExpressId) -> Option<&ElementSummary> {
        self.elements.iter().find(|e| e.express_id == express_id)
    }

    /// Overlay geometry for one element
    pub fn element_geometry(&self, express_id: ExpressId) -> GeometryBuffer {
        self.geometry.extract(&self.index.spans_for(express_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(triangles: u32) -> GeometryBuffer {
        // Triangle i spans x in [i, i + 1] on the z = 0 plane
        let mut geometry = GeometryBuffer::new();
        for i in 0..triangles {
            let x = i as f32;
            let base = geometry.vertex_count() as u32;
            geometry
                .positions
                .extend_from_slice(&[x, 0.0, 0.0, x + 1.0, 0.0, 0.0, x, 1.0, 0.0]);
            geometry.indices.extend_from_slice(&[base, base + 1, base + 2]);
        }
        geometry
    }

    #[test]
    fn lookup_inside_and_outside_spans() {
        let index = ElementIndex::from_spans(vec![
            TriangleSpan::new(10, 5, ExpressId(42)),
            TriangleSpan::new(0, 4, ExpressId(7)),
        ])
        .unwrap();

        assert_eq!(index.express_id(0), Some(ExpressId(7)));
        assert_eq!(index.express_id(3), Some(ExpressId(7)));
        assert_eq!(index.express_id(4), None);
        assert_eq!(index.express_id(10), Some(ExpressId(42)));
        assert_eq!(index.express_id(14), Some(ExpressId(42)));
        assert_eq!(index.express_id(15), None);
        assert_eq!(index.express_id(u32::MAX), None);
    }

    #[test]
    fn overlapping_spans_rejected() {
        let result = ElementIndex::from_spans(vec![
            TriangleSpan::new(0, 5, ExpressId(1)),
            TriangleSpan::new(4, 2, ExpressId(2)),
        ]);
        assert!(matches!(result, Err(LoadError::InvalidIndex(_))));
    }

    #[test]
    fn span_past_index_range_rejected() {
        let span = TriangleSpan::new(u32::MAX - 1, 5, ExpressId(1));
        assert_eq!(span.end(), u32::MAX);
        assert!(span.contains(u32::MAX - 1));

        let result = ElementIndex::from_spans(vec![TriangleSpan::new(0, 2, ExpressId(7)), span]);
        assert!(matches!(result, Err(LoadError::InvalidIndex(_))));
    }

    #[test]
    fn per_triangle_mapping_run_length_encodes() {
        let ids = [
            Some(ExpressId(5)),
            Some(ExpressId(5)),
            None,
            Some(ExpressId(5)),
            Some(ExpressId(9)),
        ];
        let index = ElementIndex::from_per_triangle(&ids);

        assert_eq!(index.len(), 3);
        assert_eq!(index.express_id(2), None);
        assert_eq!(index.spans_for(ExpressId(5)).len(), 2);
        assert_eq!(index.express_id(4), Some(ExpressId(9)));
    }

    #[test]
    fn extract_copies_only_spanned_triangles() {
        let geometry = strip(20);
        let overlay = geometry.extract(&[TriangleSpan::new(10, 5, ExpressId(42))]);

        assert_eq!(overlay.triangle_count(), 5);
        assert_eq!(overlay.vertex_count(), 15);
        assert_eq!(overlay.triangle(0), geometry.triangle(10));
        assert!(overlay.validate().is_ok());
    }

    #[test]
    fn extract_skips_triangles_with_bad_vertices() {
        let geometry = GeometryBuffer {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 1, 2, 0, 1, 9],
            ..Default::default()
        };
        let overlay = geometry.extract(&[TriangleSpan::new(0, 2, ExpressId(42))]);

        assert_eq!(overlay.triangle_count(), 1);
        assert_eq!(overlay.triangle(0), geometry.triangle(0));
        assert!(overlay.validate().is_ok());
    }

    #[test]
    fn mismatched_normals_rejected() {
        let mut geometry = strip(2);
        geometry.normals = vec![0.0, 0.0, 1.0];
        assert!(matches!(geometry.validate(), Err(LoadError::InvalidFormat(_))));
    }

    #[test]
    fn append_rebases_indices() {
        let mut merged = strip(2);
        let offset = merged.append(&strip(3));

        assert_eq!(offset, 2);
        assert_eq!(merged.triangle_count(), 5);
        assert_eq!(merged.triangle(2), strip(3).triangle(0));
        assert!(merged.validate().is_ok());
    }

    #[test]
    fn index_past_geometry_rejected() {
        let decoded = DecodedModel {
            name: "strip".into(),
            geometry: strip(3),
            index: ElementIndex::from_spans(vec![TriangleSpan::new(2, 2, ExpressId(1))]).unwrap(),
            elements: Vec::new(),
        };
        assert!(decoded.validate().is_err());
    }

    #[test]
    fn model_bounds_cover_geometry() {
        let model = Model::new(ModelId(0), DecodedModel {
            geometry: strip(4),
            ..Default::default()
        });
        let bounds = model.bounds().unwrap();
        assert_eq!(bounds.min, [0.0, 0.0, 0.0]);
        assert_eq!(bounds.max, [4.0, 1.0, 0.0]);
    }
}
