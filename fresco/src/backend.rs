// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The command stream contract between the scheduler and an executor.

use bytemuck::{Pod, Zeroable};
use peniko::kurbo::{Affine, Point};
use peniko::{Color, Fill};

use crate::paint::Paint;
use crate::residency::ResidentPath;

/// Floats in one packed command descriptor.
pub const COMMAND_DESC_FLOATS: usize = 24;

/// Texels occupied by one command descriptor in the descriptor texture.
pub const COMMAND_DESC_TEXELS: u32 = COMMAND_DESC_FLOATS as u32 / 4;

/// Depth step between adjacent clip layers.
///
/// Clip layer `n` tests and writes fragment depth `n * LAYER_DEPTH_STEP`,
/// giving 8192 addressable nesting levels.
pub const LAYER_DEPTH_STEP: f32 = 1.0 / 8192.0;

/// State accompanying a single backend command.
///
/// The scheduler assembles one of these immediately before each command it
/// emits. The paint is borrowed from the scene graph; a backend that
/// outlives the call must copy what it needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommandParameter<'a> {
    /// Transform from path space to canvas space.
    pub world_matrix: Affine,
    /// Upper-left corner of the scissor rectangle in canvas space.
    pub scissor_min: Point,
    /// Lower-right corner of the scissor rectangle in canvas space.
    pub scissor_max: Point,
    /// Clip layer the command renders into. Layer 0 is the unclipped root.
    pub clipping_layer: u32,
    /// Paint for cover passes, `None` for pure stencil work.
    pub paint: Option<&'a Paint>,
}

/// Receiver of the scheduler's ordered command stream.
///
/// Content renders stencil-and-cover style. [`stencil`] accumulates the
/// winding of a path into the stencil buffer, [`draw`] covers the stenciled
/// region with paint while zeroing the stencil it passes over, and
/// [`unstencil`] zeroes whatever a cover pass did not visit. Nested clips
/// are depth encoded instead of consuming stencil bits: [`clip`] converts a
/// stenciled mask into a depth write at the child layer, and [`unclip`]
/// restores the parent layer's depth across a bounding box, so arbitrarily
/// deep nesting needs one depth attachment and no stencil stack.
///
/// Implementations are free to merge consecutive commands of the same kind
/// whose parameter blocks are equal and whose vertex ranges are contiguous
/// into a single draw.
///
/// [`stencil`]: RenderBackend::stencil
/// [`draw`]: RenderBackend::draw
/// [`unstencil`]: RenderBackend::unstencil
/// [`clip`]: RenderBackend::clip
/// [`unclip`]: RenderBackend::unclip
pub trait RenderBackend {
    /// Resets color, depth and stencil to a blank target cleared to
    /// `color`, dropping any commands recorded for the current frame.
    fn clear(&mut self, color: Color);

    /// Accumulates the winding of `path` into the stencil buffer,
    /// incrementing on front faces and decrementing on back faces with
    /// wraparound. `fill` selects the significant stencil bits, the low
    /// bit for even-odd and all eight for non-zero.
    fn stencil(&mut self, path: ResidentPath, fill: Fill, params: &CommandParameter<'_>);

    /// Covers the stenciled region under `path` with `params.paint`,
    /// blending `ONE / ONE_MINUS_SRC_ALPHA` and zeroing the stencil bits
    /// it consumes.
    ///
    /// Panics if `params.paint` is `None`.
    fn draw(&mut self, path: ResidentPath, params: &CommandParameter<'_>);

    /// Zeroes stencil left under `path` by a cover pass that did not visit
    /// every stenciled fragment.
    fn unstencil(&mut self, path: ResidentPath, params: &CommandParameter<'_>);

    /// Consumes the stenciled mask under `path`, writing the depth of
    /// `params.clipping_layer` wherever the mask is set.
    fn clip(&mut self, path: ResidentPath, params: &CommandParameter<'_>);

    /// Restores the depth of `params.clipping_layer` across `path`,
    /// reclaiming fragments a deeper layer had claimed.
    fn unclip(&mut self, path: ResidentPath, params: &CommandParameter<'_>);
}

/// A packed command descriptor, six RGBA32F texels fetched by the vertex
/// shader through the per-vertex descriptor pointer.
///
/// Texels 0 and 1 carry the world matrix with the quantized clip layer
/// depth in the final float, texel 2 the scissor-normalizing scale and
/// offset, and texels 3 onward the paint data. Paint encoding lives with
/// the executor, so [`CommandDescriptor::pack`] leaves those slots zeroed.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(transparent)]
pub struct CommandDescriptor(pub [f32; COMMAND_DESC_FLOATS]);

static_assertions::const_assert_eq!(std::mem::size_of::<CommandDescriptor>(), 96);

impl CommandDescriptor {
    /// Packs the transform, clip layer and scissor of `params`.
    ///
    /// The scissor rectangle must be non-degenerate; shapes with an empty
    /// scissor are dropped before any command referencing them is emitted.
    pub fn pack(params: &CommandParameter<'_>) -> Self {
        let mut data = [0.0_f32; COMMAND_DESC_FLOATS];
        let matrix = params.world_matrix.as_coeffs().map(|c| c as f32);
        data[..6].copy_from_slice(&matrix);
        data[7] = params.clipping_layer as f32 * LAYER_DEPTH_STEP;
        let scale_x = 1.0 / (params.scissor_max.x - params.scissor_min.x);
        let scale_y = 1.0 / (params.scissor_max.y - params.scissor_min.y);
        data[8] = scale_x as f32;
        data[9] = scale_y as f32;
        data[10] = (-params.scissor_min.x * scale_x) as f32;
        data[11] = (-params.scissor_min.y * scale_y) as f32;
        Self(data)
    }
}
