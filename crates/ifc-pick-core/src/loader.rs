// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary model bundle loader
//!
//! Bundles are the pre-tessellated output of an IFC-to-mesh decoder. All
//! values are little endian:
//!
//! ```text
//! magic      u32   "IFCB" (0x49464342)
//! version    u32   1
//! mesh_count u32
//! per mesh:
//!   express_id u32
//!   positions  u32 count, count x f32
//!   normals    u32 count, count x f32 (0 or same count as positions)
//!   indices    u32 count, count x u32 (local to the mesh)
//!   color      4 x f32 RGBA
//!   type_name  u8 length, bytes
//!   name       u8 length (0 = none), bytes
//! ```
//!
//! Meshes are merged into one buffer; each mesh becomes one triangle span of
//! its element.

use ifc_pick_model::{
    DecodedModel, ElementIndex, ElementSummary, ExpressId, GeometryBuffer, IfcType, LoadError,
    ModelLoader, TriangleSpan,
};

/// Bundle header magic ("IFCB" in ASCII)
pub const BUNDLE_MAGIC: u32 = 0x49464342;

/// Bundle version this loader reads
pub const BUNDLE_VERSION: u32 = 1;

/// Decoder for `.ifcb` bundles
#[derive(Clone, Copy, Debug, Default)]
pub struct BundleLoader;

impl BundleLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ModelLoader for BundleLoader {
    fn load(&self, name: &str, bytes: &[u8]) -> Result<DecodedModel, LoadError> {
        let mut reader = ByteReader::new(bytes);

        let magic = reader.u32()?;
        if magic != BUNDLE_MAGIC {
            return Err(LoadError::format(format!("bad magic {:08x}", magic)));
        }
        let version = reader.u32()?;
        if version != BUNDLE_VERSION {
            return Err(LoadError::UnsupportedVersion(version));
        }

        let mesh_count = reader.u32()? as usize;
        log::debug!("Decoding {} meshes from {}", mesh_count, name);

        let mut geometry = GeometryBuffer::new();
        let mut spans = Vec::with_capacity(mesh_count.min(reader.remaining() / 4));
        let mut elements: Vec<ElementSummary> = Vec::new();

        for _ in 0..mesh_count {
            let express_id = ExpressId(reader.u32()?);
            let positions = reader.f32_array()?;
            let normals = reader.f32_array()?;
            let indices = reader.u32_array()?;
            let color = [reader.f32()?, reader.f32()?, reader.f32()?, reader.f32()?];
            let ifc_type = IfcType::parse(&reader.short_string()?);
            let element_name = Some(reader.short_string()?).filter(|s| !s.is_empty());

            let vertex_count = positions.len() / 3;
            let mesh = GeometryBuffer {
                colors: color.repeat(vertex_count),
                positions,
                normals,
                indices,
            };
            mesh.validate()?;

            let start = geometry.append(&mesh);
            spans.push(TriangleSpan::new(start, mesh.triangle_count() as u32, express_id));

            if !elements.iter().any(|e| e.express_id == express_id) {
                elements.push(ElementSummary {
                    express_id,
                    ifc_type,
                    name: element_name,
                    color,
                });
            }
        }

        if reader.remaining() > 0 {
            log::warn!("{} trailing bytes after last mesh in {}", reader.remaining(), name);
        }

        let decoded = DecodedModel {
            name: name.to_string(),
            geometry,
            index: ElementIndex::from_spans(spans)?,
            elements,
        };
        decoded.validate()?;
        Ok(decoded)
    }
}

/// Bounds-checked little-endian reader
struct ByteReader<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], LoadError> {
        let end = self
            .cursor
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(LoadError::Truncated(self.cursor))?;
        let slice = &self.data[self.cursor..end];
        self.cursor = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], LoadError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, LoadError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn f32(&mut self) -> Result<f32, LoadError> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    /// Length-prefixed array; the length is checked before allocating
    fn f32_array(&mut self) -> Result<Vec<f32>, LoadError> {
        let len = self.u32()? as usize;
        let raw = self.bytes(len.saturating_mul(4))?;
        Ok(raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    fn u32_array(&mut self) -> Result<Vec<u32>, LoadError> {
        let len = self.u32()? as usize;
        let raw = self.bytes(len.saturating_mul(4))?;
        Ok(raw
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    fn short_string(&mut self) -> Result<String, LoadError> {
        let len = self.bytes(1)?[0] as usize;
        Ok(String::from_utf8_lossy(self.bytes(len)?).into_owned())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) struct TestMesh<'a> {
        pub express_id: u32,
        pub positions: &'a [f32],
        pub indices: &'a [u32],
        pub ifc_type: &'a str,
        pub name: &'a str,
    }

    pub(crate) fn encode(meshes: &[TestMesh<'_>]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&BUNDLE_MAGIC.to_le_bytes());
        out.extend_from_slice(&BUNDLE_VERSION.to_le_bytes());
        out.extend_from_slice(&(meshes.len() as u32).to_le_bytes());
        for mesh in meshes {
            out.extend_from_slice(&mesh.express_id.to_le_bytes());
            out.extend_from_slice(&(mesh.positions.len() as u32).to_le_bytes());
            mesh.positions.iter().for_each(|v| out.extend_from_slice(&v.to_le_bytes()));
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&(mesh.indices.len() as u32).to_le_bytes());
            mesh.indices.iter().for_each(|v| out.extend_from_slice(&v.to_le_bytes()));
            [0.8f32, 0.8, 0.8, 1.0].iter().for_each(|v| out.extend_from_slice(&v.to_le_bytes()));
            out.push(mesh.ifc_type.len() as u8);
            out.extend_from_slice(mesh.ifc_type.as_bytes());
            out.push(mesh.name.len() as u8);
            out.extend_from_slice(mesh.name.as_bytes());
        }
        out
    }

    const QUAD: [f32; 12] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
    const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];
    const TRI: [f32; 9] = [0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0];

    fn two_meshes() -> Vec<u8> {
        encode(&[
            TestMesh {
                express_id: 7,
                positions: &QUAD,
                indices: &QUAD_INDICES,
                ifc_type: "IFCSLAB",
                name: "Floor",
            },
            TestMesh {
                express_id: 42,
                positions: &TRI,
                indices: &[0, 1, 2],
                ifc_type: "IFCWALL",
                name: "",
            },
        ])
    }

    #[test]
    fn decodes_and_merges_meshes() {
        let decoded = BundleLoader.load("two.ifcb", &two_meshes()).unwrap();

        assert_eq!(decoded.name, "two.ifcb");
        assert_eq!(decoded.geometry.triangle_count(), 3);
        assert_eq!(decoded.geometry.vertex_count(), 7);
        assert_eq!(decoded.index.express_id(0), Some(ExpressId(7)));
        assert_eq!(decoded.index.express_id(1), Some(ExpressId(7)));
        assert_eq!(decoded.index.express_id(2), Some(ExpressId(42)));
        // second mesh indices are re-based past the quad's four vertices
        assert_eq!(&decoded.geometry.indices[6..], &[4, 5, 6]);

        assert_eq!(decoded.elements.len(), 2);
        assert_eq!(decoded.elements[0].ifc_type, IfcType::IfcSlab);
        assert_eq!(decoded.elements[0].name.as_deref(), Some("Floor"));
        assert_eq!(decoded.elements[1].name, None);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = two_meshes();
        bytes[0] = b'X';
        assert!(matches!(BundleLoader.load("x", &bytes), Err(LoadError::InvalidFormat(_))));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = two_meshes();
        bytes[4..8].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(BundleLoader.load("x", &bytes), Err(LoadError::UnsupportedVersion(2))));
    }

    #[test]
    fn truncation_never_panics() {
        let bytes = two_meshes();
        for len in 0..bytes.len() {
            assert!(
                BundleLoader.load("x", &bytes[..len]).is_err(),
                "prefix of {} bytes decoded",
                len
            );
        }
    }

    #[test]
    fn huge_declared_length_is_truncation() {
        let mut bytes = two_meshes();
        // positions count of the first mesh
        bytes[16..20].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(BundleLoader.load("x", &bytes), Err(LoadError::Truncated(_))));
    }

    #[test]
    fn out_of_range_index_rejected() {
        let bytes = encode(&[TestMesh {
            express_id: 1,
            positions: &TRI,
            indices: &[0, 1, 3],
            ifc_type: "IFCWALL",
            name: "",
        }]);
        assert!(matches!(BundleLoader.load("x", &bytes), Err(LoadError::InvalidFormat(_))));
    }
}
