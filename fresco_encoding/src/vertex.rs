// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vertex and descriptor formats shared with the GPU pipeline.

use bytemuck::{Pod, Zeroable};
use peniko::kurbo::Point;

/// Primitive classification evaluated by the fragment shader.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum DrawPrimitive {
    /// Fully covered triangle.
    Simple = 0,
    /// Fill patch of one quadratic segment; params carry the canonical UV
    /// for the implicit `u^2 < v` test.
    QuadraticFill = 1,
    /// Round join or cap patch; params carry circle-space coordinates.
    Circle = 2,
    /// Stroke patch of one quadratic segment; params carry the per-vertex
    /// nearest-point equation coefficients.
    QuadraticStroke = 3,
}

impl DrawPrimitive {
    pub(crate) fn tag(self) -> f32 {
        self as u8 as f32
    }
}

/// One tessellated vertex, 8 floats (2 RGBA32F texels).
///
/// `command` holds the command descriptor texel address and is patched at
/// draw time. `QuadraticStroke` vertices also use `params[3]` for the
/// quadratic descriptor texel address, patched through the compiled path's
/// descriptor ranges once the descriptors are resident.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct DrawVertex {
    pub point: [f32; 2],
    pub primitive: f32,
    pub command: f32,
    pub params: [f32; 4],
}

static_assertions::const_assert_eq!(std::mem::size_of::<DrawVertex>(), 32);

/// Texels occupied by one vertex in the vertex buffer texture.
pub const VERTEX_TEXELS: u32 = 2;

/// Floats in one quadratic stroke descriptor.
pub const QBEZIER_DESC_FLOATS: usize = 16;

/// Texels occupied by one quadratic stroke descriptor.
pub const QBEZIER_DESC_TEXELS: u32 = QBEZIER_DESC_FLOATS as u32 / 4;

impl DrawVertex {
    pub(crate) fn new(point: Point, primitive: DrawPrimitive, params: [f32; 4]) -> Self {
        Self {
            point: [point.x as f32, point.y as f32],
            primitive: primitive.tag(),
            command: 0.0,
            params,
        }
    }

    /// A vertex of an interior triangle, params untouched.
    pub(crate) fn simple(point: Point) -> Self {
        Self::new(point, DrawPrimitive::Simple, [0.0; 4])
    }
}
