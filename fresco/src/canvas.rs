// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drawing surface tying scene assembly to command scheduling.

use fresco_encoding::{Path, PathBuilder, PathCache, PathUsage, StrokeStyle};
use peniko::kurbo::{Affine, Rect};
use peniko::{Color, Fill};
use smallvec::SmallVec;

use crate::Error;
use crate::backend::RenderBackend;
use crate::paint::Paint;
use crate::residency::{LinearAllocator, ResidencyManager, TexelBuffer};
use crate::scene::{NodeId, SceneArena, Shape};
use crate::schedule::CommandScheduler;

/// Texel capacity of the vertex buffer texture, one 2048 by 2048 RGBA32F
/// image.
const VERTEX_SPACE_TEXELS: u32 = 1 << 22;

/// One open clip scope: the canvas-space region it reveals and the scene
/// node collecting its content. `None` marks a fully clipped scope whose
/// submissions are dropped.
struct ClippingLayer {
    bounds: Rect,
    node: Option<NodeId>,
}

/// A render target assembling one frame at a time.
///
/// Drawing calls append to a per-frame scene graph;
/// [`resolve`](Canvas::resolve) schedules the graph into backend commands
/// and resets the frame. Paths and stroke styles are compiled and made
/// resident on first use and stay resident across frames; scene nodes live
/// only until resolve.
pub struct Canvas {
    width: u32,
    height: u32,
    transform: Affine,
    cache: PathCache,
    residency: ResidencyManager<LinearAllocator, TexelBuffer>,
    arena: SceneArena,
    scheduler: CommandScheduler,
    layers: Vec<ClippingLayer>,
    top: usize,
    working_masks: SmallVec<[NodeId; 2]>,
    clear_color: Option<Color>,
}

impl Canvas {
    /// Creates a canvas of `width` by `height` pixels.
    ///
    /// Errors with [`Error::InvalidCanvasSize`] when either dimension is
    /// zero.
    pub fn new(width: u32, height: u32) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidCanvasSize);
        }

        let mut cache = PathCache::new();
        let mut residency = ResidencyManager::new(
            LinearAllocator::new(VERTEX_SPACE_TEXELS),
            TexelBuffer::new(VERTEX_SPACE_TEXELS),
        );
        let mut builder = PathBuilder::new();
        builder.move_to((0.0, 0.0));
        builder.line_to((1.0, 0.0));
        builder.line_to((1.0, 1.0));
        builder.line_to((0.0, 1.0));
        let unit_rect = builder.build(PathUsage::Static);
        let resident = residency.resident_pathset(&mut cache, &unit_rect, None)?;
        let Some(unit_rect) = resident.shape_path else {
            unreachable!("the unit rectangle always tessellates");
        };

        let mut canvas = Self {
            width,
            height,
            transform: Affine::IDENTITY,
            cache,
            residency,
            arena: SceneArena::new(),
            scheduler: CommandScheduler::new(f64::from(width), f64::from(height), unit_rect),
            layers: Vec::new(),
            top: 0,
            working_masks: SmallVec::new(),
            clear_color: None,
        };
        canvas.reset_frame();
        Ok(canvas)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The transform applied to subsequently submitted shapes.
    pub fn transform(&self) -> Affine {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    /// Fills `path` with `paint` under the current transform and clip.
    pub fn fill(&mut self, paint: &Paint, fill_rule: Fill, path: &Path) -> Result<(), Error> {
        self.add_shape(Some(paint), fill_rule, None, path)
    }

    /// Strokes `path` with `paint` under the current transform and clip.
    pub fn stroke(&mut self, paint: &Paint, style: &StrokeStyle, path: &Path) -> Result<(), Error> {
        self.add_shape(Some(paint), Fill::NonZero, Some(style), path)
    }

    /// Adds a filled mask to the clip scope being assembled.
    pub fn fill_clip_mask(&mut self, fill_rule: Fill, path: &Path) -> Result<(), Error> {
        self.add_shape(None, fill_rule, None, path)
    }

    /// Adds a stroked mask to the clip scope being assembled.
    pub fn stroke_clip_mask(&mut self, style: &StrokeStyle, path: &Path) -> Result<(), Error> {
        self.add_shape(None, Fill::NonZero, Some(style), path)
    }

    /// Closes the working mask set and opens the clip scope revealing only
    /// the area its masks cover.
    ///
    /// Without any working masks, or when the masks cover no area, the
    /// scope is fully clipped and everything submitted under it is dropped
    /// until the matching [`pop_clip_mask`](Canvas::pop_clip_mask).
    pub fn apply_clip_mask(&mut self) {
        self.top += 1;
        if self.layers.len() <= self.top {
            self.layers.push(ClippingLayer {
                bounds: Rect::ZERO,
                node: None,
            });
        } else {
            self.layers[self.top].node = None;
        }

        let Some(parent) = self.layers[self.top - 1].node else {
            self.working_masks.clear();
            return;
        };
        let Some(bounds) = self.mask_bounds() else {
            self.working_masks.clear();
            return;
        };

        let masks = std::mem::take(&mut self.working_masks);
        let node = self.arena.push_clip(masks);
        self.arena.clip_mut(parent).children.push(node);
        self.layers[self.top] = ClippingLayer {
            bounds,
            node: Some(node),
        };
    }

    /// Closes the current clip scope, restoring its parent.
    ///
    /// A scope that collected no content is dropped from the scene, so no
    /// commands are spent establishing its mask. Errors with
    /// [`Error::UnbalancedClip`] when only the root scope is open.
    pub fn pop_clip_mask(&mut self) -> Result<(), Error> {
        if self.top == 0 {
            return Err(Error::UnbalancedClip);
        }
        let node = self.layers[self.top].node;
        let parent = self.layers[self.top - 1].node;
        self.top -= 1;

        let (Some(node), Some(parent)) = (node, parent) else {
            return Ok(());
        };
        if self.arena.clip(node).children.is_empty() {
            let siblings = &mut self.arena.clip_mut(parent).children;
            if siblings.last() == Some(&node) {
                siblings.pop();
            }
        }
        Ok(())
    }

    /// Schedules a clear of the entire canvas, dropping the frame content
    /// submitted so far. Clipping does not apply.
    pub fn clear(&mut self, color: Color) {
        self.clear_color = Some(color);
        self.reset_frame();
    }

    /// Renders the assembled frame into `backend` and resets the canvas
    /// for the next one.
    ///
    /// Clip scopes left open are abandoned; the next frame starts from the
    /// root scope. The current transform persists across frames.
    pub fn resolve<B: RenderBackend>(&mut self, backend: &mut B) {
        if let Some(color) = self.clear_color.take() {
            backend.clear(color);
        }
        if let Some(root) = self.layers[0].node {
            self.scheduler.render(&mut self.arena, root, backend);
        }
        self.reset_frame();
    }

    /// Compiles `path`, clips its bounds and files the shape under the
    /// current clip scope, or into the working mask set when paintless.
    ///
    /// Shapes that tessellate to nothing or fall outside the scope are
    /// dropped here, before any scene node exists for them.
    fn add_shape(
        &mut self,
        paint: Option<&Paint>,
        fill_rule: Fill,
        stroke: Option<&StrokeStyle>,
        path: &Path,
    ) -> Result<(), Error> {
        let set = self.residency.resident_pathset(&mut self.cache, path, stroke)?;
        let Some(shape_path) = set.shape_path else {
            return Ok(());
        };
        let layer = &self.layers[self.top];
        let Some(node) = layer.node else {
            return Ok(());
        };
        let bounds = self
            .transform
            .transform_rect_bbox(shape_path.bounding_box)
            .intersect(layer.bounds);
        if bounds.x0 >= bounds.x1 || bounds.y0 >= bounds.y1 {
            return Ok(());
        }

        let (stencil_path, draw_path, unstencil_path) = if stroke.is_some() {
            let Some(hull) = set.stroke_hull else {
                return Ok(());
            };
            (hull, shape_path, Some(hull))
        } else {
            let Some(hull) = set.draw_hull else {
                return Ok(());
            };
            (shape_path, hull, None)
        };
        let shape = self.arena.push_shape(Shape {
            stencil_path,
            draw_path,
            unstencil_path,
            fill_rule,
            paint: paint.cloned(),
            matrix: self.transform,
            bounds,
            rendering_layer: 0,
        });
        match paint {
            Some(_) => self.arena.clip_mut(node).children.push(shape),
            None => self.working_masks.push(shape),
        }
        Ok(())
    }

    /// Union of the working masks' clipped bounds, `None` when the union
    /// covers no area.
    fn mask_bounds(&self) -> Option<Rect> {
        let mut bounds: Option<Rect> = None;
        for &mask in &self.working_masks {
            let mask = self.arena.shape(mask).bounds;
            bounds = Some(bounds.map_or(mask, |united| united.union(mask)));
        }
        let bounds = bounds?;
        (bounds.x0 < bounds.x1 && bounds.y0 < bounds.y1).then_some(bounds)
    }

    /// Drops the frame's scene and reopens the root clip scope.
    fn reset_frame(&mut self) {
        self.arena.reset();
        let root = self.arena.push_clip(SmallVec::new());
        self.layers.clear();
        self.layers.push(ClippingLayer {
            bounds: Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height)),
            node: Some(root),
        });
        self.top = 0;
        self.working_masks.clear();
    }
}
