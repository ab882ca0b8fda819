// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Residency must hand out stable texel addresses and release them on
//! invalidation.

// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
// Feel free to send a PR that solves one or more of these.
#![allow(
    clippy::missing_assert_message,
    clippy::allow_attributes_without_reason
)]

use fresco::{
    Cap, Error, Join, LinearAllocator, PathBuilder, PathCache, PathUsage, ResidencyManager,
    StrokeStyle, TexelBuffer,
};
use fresco_tests::rect_path;

fn manager(texels: u32) -> ResidencyManager<LinearAllocator, TexelBuffer> {
    ResidencyManager::new(LinearAllocator::new(texels), TexelBuffer::new(texels))
}

#[test]
fn paths_receive_consecutive_texel_addresses() {
    let mut cache = PathCache::new();
    let mut residency = manager(1 << 12);
    let first = rect_path(0.0, 0.0, 10.0, 10.0);
    let second = rect_path(20.0, 0.0, 30.0, 10.0);

    let set = residency.resident_pathset(&mut cache, &first, None).unwrap();
    let shape = set.shape_path.unwrap();
    let hull = set.draw_hull.unwrap();
    assert_eq!((shape.address, shape.num_vertices), (0, 6));
    assert_eq!((hull.address, hull.num_vertices), (12, 6));
    assert!(set.stroke_hull.is_none());

    let set = residency.resident_pathset(&mut cache, &second, None).unwrap();
    assert_eq!(set.shape_path.unwrap().address, 24);
    assert_eq!(residency.allocator().used(), 48);
}

#[test]
fn repeated_requests_reuse_the_resident_copy() {
    let mut cache = PathCache::new();
    let mut residency = manager(1 << 12);
    let path = rect_path(0.0, 0.0, 10.0, 10.0);

    let set = residency.resident_pathset(&mut cache, &path, None).unwrap();
    let again = residency.resident_pathset(&mut cache, &path, None).unwrap();
    assert_eq!(set.shape_path.unwrap().address, again.shape_path.unwrap().address);
    assert_eq!(residency.allocator().used(), 24);
}

#[test]
fn invalidating_a_path_releases_its_residency() {
    let mut cache = PathCache::new();
    let mut residency = manager(1 << 12);
    let path = rect_path(0.0, 0.0, 10.0, 10.0);

    let set = residency.resident_pathset(&mut cache, &path, None).unwrap();
    residency.invalidate_path(path.id());
    cache.invalidate_path(path.id());
    let fresh = residency.resident_pathset(&mut cache, &path, None).unwrap();

    assert_ne!(set.shape_path.unwrap().address, fresh.shape_path.unwrap().address);
}

#[test]
fn invalidating_a_stroke_style_keeps_the_fill_resident() {
    let mut cache = PathCache::new();
    let mut residency = manager(1 << 12);
    let path = rect_path(0.0, 0.0, 10.0, 10.0);
    let style = StrokeStyle::new(4.0, Join::Bevel, Cap::Butt, 4.0);

    let fill = residency.resident_pathset(&mut cache, &path, None).unwrap();
    let stroked = residency.resident_pathset(&mut cache, &path, Some(&style)).unwrap();
    residency.invalidate_stroke_style(style.id());
    cache.invalidate_stroke_style(style.id());

    let fill_again = residency.resident_pathset(&mut cache, &path, None).unwrap();
    let restroked = residency.resident_pathset(&mut cache, &path, Some(&style)).unwrap();
    assert_eq!(fill.shape_path.unwrap().address, fill_again.shape_path.unwrap().address);
    assert_ne!(stroked.shape_path.unwrap().address, restroked.shape_path.unwrap().address);
}

#[test]
fn exhausted_vertex_space_surfaces_as_an_error() {
    let mut cache = PathCache::new();
    let mut residency = manager(20);
    let path = rect_path(0.0, 0.0, 10.0, 10.0);

    // the shape fits but its cover does not
    let result = residency.resident_pathset(&mut cache, &path, None);
    assert!(matches!(result, Err(Error::OutOfVertexSpace)));
}

#[test]
fn uploaded_descriptors_precede_their_vertices() {
    let mut cache = PathCache::new();
    let mut residency = manager(1 << 12);
    residency.resident_pathset(&mut cache, &rect_path(0.0, 0.0, 10.0, 10.0), None).unwrap();

    let mut builder = PathBuilder::new();
    builder.move_to((0.0, 0.0));
    builder.quad_to((50.0, 50.0), (100.0, 0.0));
    let path = builder.build(PathUsage::Static);
    let style = StrokeStyle::new(30.0, Join::Bevel, Cap::Butt, 4.0);
    let set = residency.resident_pathset(&mut cache, &path, Some(&style)).unwrap();

    // one descriptor texel block lands at 24, the patch fan after it
    let shape = set.shape_path.unwrap();
    assert_eq!((shape.address, shape.num_vertices), (28, 15));
    assert_eq!(set.stroke_hull.unwrap().address, 58);
    assert_eq!(residency.allocator().used(), 88);

    let data = residency.store().data();
    // the staged vertices point at the resident descriptor
    for vertex in 0..shape.num_vertices as usize {
        let base = (shape.address as usize + vertex * 2) * 4;
        assert_eq!(data[base + 7], 24.0);
    }
    // stroke position and span of the single segment
    assert_eq!(data[24 * 4 + 6], 0.0);
    assert_eq!(data[24 * 4 + 7], 1.0);
}
