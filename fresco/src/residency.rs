// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Residence of compiled paths in the vertex buffer texture.

use std::collections::HashMap;

use fresco_encoding::{
    CompiledPath, CompiledPathset, DrawVertex, Path, PathCache, PathId, StrokeStyle, StrokeStyleId,
    VERTEX_TEXELS,
};
use peniko::kurbo::Rect;

use crate::Error;

/// A compiled path's vertex range in the vertex buffer texture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResidentPath {
    /// Texel address of the first vertex.
    pub address: u32,
    /// Number of resident vertices.
    pub num_vertices: u32,
    /// Path-space bounds of the tessellated geometry.
    pub bounding_box: Rect,
}

/// The resident geometry of one `(path, stroke)` pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResidentPathset {
    /// Stencil geometry.
    pub shape_path: Option<ResidentPath>,
    /// Bounding rectangle cover, present for fills.
    pub draw_hull: Option<ResidentPath>,
    /// Demoted cover of the stroke patches, present for strokes.
    pub stroke_hull: Option<ResidentPath>,
}

impl ResidentPathset {
    const EMPTY: Self = Self {
        shape_path: None,
        draw_hull: None,
        stroke_hull: None,
    };

    /// Bounds of the stencil geometry, `None` when nothing tessellated.
    pub fn bounding_box(&self) -> Option<Rect> {
        self.shape_path.map(|path| path.bounding_box)
    }
}

/// Reserves texel ranges in the vertex buffer texture.
///
/// The production allocator is a block heap that grows the texture on
/// demand; [`LinearAllocator`] is a fixed-capacity stand-in.
pub trait VertexAllocator {
    /// Reserves `texels` consecutive texels, returning the first address,
    /// or `None` when the space is exhausted.
    fn allocate(&mut self, texels: u32) -> Option<u32>;

    /// Releases a reservation made by [`allocate`](VertexAllocator::allocate).
    fn free(&mut self, address: u32, texels: u32);
}

/// Receives staged texel writes destined for the vertex buffer texture.
pub trait VertexStore {
    fn write_vertices(&mut self, address: u32, vertices: &[DrawVertex]);
    fn write_descriptors(&mut self, address: u32, descriptors: &[f32]);
}

/// Bump allocator over a fixed texel capacity.
///
/// `free` is a no-op, so invalidated paths do not return their space.
#[derive(Clone, Debug)]
pub struct LinearAllocator {
    next: u32,
    capacity: u32,
}

impl LinearAllocator {
    pub fn new(capacity: u32) -> Self {
        Self { next: 0, capacity }
    }

    /// Texels handed out so far.
    pub fn used(&self) -> u32 {
        self.next
    }
}

impl VertexAllocator for LinearAllocator {
    fn allocate(&mut self, texels: u32) -> Option<u32> {
        let address = self.next;
        let end = address.checked_add(texels)?;
        if end > self.capacity {
            return None;
        }
        self.next = end;
        Some(address)
    }

    fn free(&mut self, _address: u32, _texels: u32) {}
}

/// In-memory texel mirror of the vertex buffer texture, four floats per
/// texel, ready for an uploader to copy to the GPU.
///
/// Writes land at addresses handed out by an allocator bounded by the same
/// capacity, so they are in range by construction.
#[derive(Clone, Debug)]
pub struct TexelBuffer {
    data: Vec<f32>,
}

impl TexelBuffer {
    pub fn new(texels: u32) -> Self {
        Self {
            data: vec![0.0; texels as usize * 4],
        }
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    fn write(&mut self, address: u32, floats: &[f32]) {
        let start = address as usize * 4;
        self.data[start..start + floats.len()].copy_from_slice(floats);
    }
}

impl VertexStore for TexelBuffer {
    fn write_vertices(&mut self, address: u32, vertices: &[DrawVertex]) {
        self.write(address, bytemuck::cast_slice(vertices));
    }

    fn write_descriptors(&mut self, address: u32, descriptors: &[f32]) {
        self.write(address, descriptors);
    }
}

struct Entry {
    pathset: ResidentPathset,
    allocs: Vec<(u32, u32)>,
}

/// Makes compiled paths resident and keeps them resident until their path
/// or stroke style is invalidated.
///
/// Descriptor texels are allocated before the vertices that point at them;
/// the descriptor addresses are patched into a staged copy of the
/// vertices, leaving the cached compilation untouched.
pub struct ResidencyManager<A, S> {
    allocator: A,
    store: S,
    resident: HashMap<(PathId, Option<StrokeStyleId>), Entry>,
}

impl<A: VertexAllocator, S: VertexStore> ResidencyManager<A, S> {
    pub fn new(allocator: A, store: S) -> Self {
        Self {
            allocator,
            store,
            resident: HashMap::new(),
        }
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the resident geometry for `path`, stroked with `stroke` if
    /// given, compiling and uploading it on first use.
    ///
    /// A path that tessellates to nothing is resident as an empty pathset.
    /// Exhausted vertex space surfaces as [`Error::OutOfVertexSpace`] and
    /// leaves nothing allocated.
    pub fn resident_pathset(
        &mut self,
        cache: &mut PathCache,
        path: &Path,
        stroke: Option<&StrokeStyle>,
    ) -> Result<ResidentPathset, Error> {
        let key = (path.id(), stroke.map(StrokeStyle::id));
        if let Some(entry) = self.resident.get(&key) {
            return Ok(entry.pathset);
        }

        let mut allocs = Vec::new();
        let pathset = match cache.compile(path, stroke) {
            Some(set) => match self.stage(&set, &mut allocs) {
                Ok(pathset) => pathset,
                Err(err) => {
                    for (address, texels) in allocs {
                        self.allocator.free(address, texels);
                    }
                    return Err(err);
                }
            },
            None => ResidentPathset::EMPTY,
        };

        log::trace!(
            "made {key:?} resident in {} texels",
            allocs.iter().map(|(_, texels)| texels).sum::<u32>()
        );
        self.resident.insert(key, Entry { pathset, allocs });
        Ok(pathset)
    }

    /// Releases the residencies built on `id`.
    pub fn invalidate_path(&mut self, id: PathId) {
        self.release(|key| key.0 == id);
    }

    /// Releases the residencies built on the given stroke style.
    pub fn invalidate_stroke_style(&mut self, id: StrokeStyleId) {
        self.release(|key| key.1 == Some(id));
    }

    fn stage(
        &mut self,
        set: &CompiledPathset,
        allocs: &mut Vec<(u32, u32)>,
    ) -> Result<ResidentPathset, Error> {
        Ok(ResidentPathset {
            shape_path: self.make_resident(&set.shape_path, allocs)?,
            draw_hull: match &set.draw_hull {
                Some(hull) => self.make_resident(hull, allocs)?,
                None => None,
            },
            stroke_hull: match &set.stroke_hull {
                Some(hull) => self.make_resident(hull, allocs)?,
                None => None,
            },
        })
    }

    fn make_resident(
        &mut self,
        compiled: &CompiledPath,
        allocs: &mut Vec<(u32, u32)>,
    ) -> Result<Option<ResidentPath>, Error> {
        if compiled.is_empty() {
            return Ok(None);
        }

        let mut staged;
        let vertices = if compiled.qbezier_descs.is_empty() {
            &compiled.vertices
        } else {
            let desc_texels = compiled.qbezier_descs.len() as u32 / 4;
            let desc_address = self.allocate(desc_texels, allocs)?;
            self.store
                .write_descriptors(desc_address, &compiled.qbezier_descs);
            staged = compiled.vertices.clone();
            compiled.patch_qbezier_desc_address(desc_address, &mut staged);
            &staged
        };

        let num_vertices = vertices.len() as u32;
        let address = self.allocate(num_vertices * VERTEX_TEXELS, allocs)?;
        self.store.write_vertices(address, vertices);
        Ok(Some(ResidentPath {
            address,
            num_vertices,
            bounding_box: compiled.bounding_box.unwrap_or_default(),
        }))
    }

    fn allocate(&mut self, texels: u32, allocs: &mut Vec<(u32, u32)>) -> Result<u32, Error> {
        let address = self
            .allocator
            .allocate(texels)
            .ok_or(Error::OutOfVertexSpace)?;
        allocs.push((address, texels));
        Ok(address)
    }

    fn release(&mut self, mut dead: impl FnMut(&(PathId, Option<StrokeStyleId>)) -> bool) {
        let allocator = &mut self.allocator;
        self.resident.retain(|key, entry| {
            if dead(key) {
                for (address, texels) in entry.allocs.drain(..) {
                    allocator.free(address, texels);
                }
                false
            } else {
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use fresco_encoding::{Cap, Join, Path, PathBuilder, PathCache, PathUsage, StrokeStyle};

    use super::{LinearAllocator, ResidencyManager, TexelBuffer, VertexAllocator};
    use crate::Error;

    fn triangle() -> Path {
        let mut builder = PathBuilder::new();
        builder.move_to((0.0, 0.0));
        builder.line_to((100.0, 0.0));
        builder.line_to((0.0, 80.0));
        builder.close();
        builder.build(PathUsage::Static)
    }

    fn quad() -> Path {
        let mut builder = PathBuilder::new();
        builder.move_to((0.0, 0.0));
        builder.quad_to((50.0, 50.0), (100.0, 0.0));
        builder.build(PathUsage::Static)
    }

    fn manager(texels: u32) -> ResidencyManager<LinearAllocator, TexelBuffer> {
        ResidencyManager::new(LinearAllocator::new(texels), TexelBuffer::new(texels))
    }

    #[test]
    fn fill_residency_is_memoized_and_laid_out_in_order() {
        let mut cache = PathCache::new();
        let mut manager = manager(4096);
        let path = triangle();

        let set = manager.resident_pathset(&mut cache, &path, None).unwrap();
        let shape = set.shape_path.unwrap();
        let hull = set.draw_hull.unwrap();
        assert_eq!((shape.address, shape.num_vertices), (0, 3));
        assert_eq!((hull.address, hull.num_vertices), (6, 6));
        assert!(set.stroke_hull.is_none());
        assert_eq!(manager.allocator().used(), 18);

        let again = manager.resident_pathset(&mut cache, &path, None).unwrap();
        assert_eq!(set, again);
        assert_eq!(manager.allocator().used(), 18);
    }

    #[test]
    fn stroke_residency_patches_staged_descriptor_pointers() {
        let mut cache = PathCache::new();
        let mut manager = manager(4096);
        let style = StrokeStyle::new(30.0, Join::Bevel, Cap::Butt, 4.0);

        // Push the heap pointer away from zero so patched addresses are
        // visible in the store.
        manager
            .resident_pathset(&mut cache, &triangle(), None)
            .unwrap();
        assert_eq!(manager.allocator().used(), 18);

        let path = quad();
        let set = manager
            .resident_pathset(&mut cache, &path, Some(&style))
            .unwrap();
        let shape = set.shape_path.unwrap();
        assert_eq!(shape.address, 22);
        assert_eq!(shape.num_vertices, 15);
        assert!(set.draw_hull.is_none());
        assert!(set.stroke_hull.is_some());

        // Descriptors sit at texel 18 and every staged stroke vertex
        // points at them.
        let data = manager.store().data();
        for vertex in 0..shape.num_vertices {
            let base = (shape.address + vertex * 2) as usize * 4;
            assert_eq!(data[base + 7], 18.0);
        }
        // The cached compilation stays unpatched.
        let compiled = cache.compile(&path, Some(&style)).unwrap();
        assert!(compiled.shape_path.vertices.iter().all(|v| v.params[3] == 0.0));
    }

    #[test]
    fn exhaustion_frees_partial_allocations() {
        #[derive(Default)]
        struct CountingAllocator {
            next: u32,
            freed: Vec<(u32, u32)>,
        }

        impl VertexAllocator for CountingAllocator {
            fn allocate(&mut self, texels: u32) -> Option<u32> {
                if self.next + texels > 10 {
                    return None;
                }
                let address = self.next;
                self.next += texels;
                Some(address)
            }

            fn free(&mut self, address: u32, texels: u32) {
                self.freed.push((address, texels));
            }
        }

        let mut cache = PathCache::new();
        let mut manager =
            ResidencyManager::new(CountingAllocator::default(), TexelBuffer::new(4096));

        // The 6 texel shape fits, the 12 texel draw hull does not.
        let result = manager.resident_pathset(&mut cache, &triangle(), None);
        assert!(matches!(result, Err(Error::OutOfVertexSpace)));
        assert_eq!(manager.allocator().freed, vec![(0, 6)]);
    }

    #[test]
    fn invalidation_releases_the_named_residency() {
        #[derive(Default)]
        struct RecordingAllocator {
            next: u32,
            freed: Vec<(u32, u32)>,
        }

        impl VertexAllocator for RecordingAllocator {
            fn allocate(&mut self, texels: u32) -> Option<u32> {
                let address = self.next;
                self.next += texels;
                Some(address)
            }

            fn free(&mut self, address: u32, texels: u32) {
                self.freed.push((address, texels));
            }
        }

        let mut cache = PathCache::new();
        let mut manager =
            ResidencyManager::new(RecordingAllocator::default(), TexelBuffer::new(4096));
        let style = StrokeStyle::new(30.0, Join::Bevel, Cap::Butt, 4.0);
        let filled = triangle();
        let stroked = quad();

        manager
            .resident_pathset(&mut cache, &filled, None)
            .unwrap();
        manager
            .resident_pathset(&mut cache, &stroked, Some(&style))
            .unwrap();

        manager.invalidate_path(filled.id());
        let mut freed = manager.allocator().freed.clone();
        freed.sort_unstable();
        assert_eq!(freed, vec![(0, 6), (6, 12)]);

        manager.invalidate_stroke_style(style.id());
        assert_eq!(manager.allocator().freed.len(), 5);
    }

    #[test]
    fn a_path_without_subpaths_is_resident_as_empty() {
        let mut cache = PathCache::new();
        let mut manager = manager(64);
        let empty = PathBuilder::new().build(PathUsage::Static);
        let set = manager.resident_pathset(&mut cache, &empty, None).unwrap();
        assert!(set.shape_path.is_none());
        assert!(set.bounding_box().is_none());
        assert_eq!(manager.allocator().used(), 0);
    }
}
