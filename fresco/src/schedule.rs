// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clip-tree walking and command emission.

use peniko::kurbo::{Affine, Point, Rect};

use crate::backend::{CommandParameter, RenderBackend};
use crate::compress::LayerCompressor;
use crate::residency::ResidentPath;
use crate::scene::{NodeId, SceneArena, SceneNode, Shape};

fn shape_params(shape: &Shape, layer: u32) -> CommandParameter<'_> {
    CommandParameter {
        world_matrix: shape.matrix,
        scissor_min: Point::new(shape.bounds.x0, shape.bounds.y0),
        scissor_max: Point::new(shape.bounds.x1, shape.bounds.y1),
        clipping_layer: layer,
        paint: None,
    }
}

/// Scratch for one clip depth: the nodes active in the current round, the
/// flattened next-level node list, and the batcher splitting that level
/// into rounds.
struct RenderDepth {
    active: Vec<NodeId>,
    all: Vec<NodeId>,
    batcher: LayerCompressor<NodeId>,
}

impl RenderDepth {
    fn new(width: f64, height: f64) -> Self {
        Self {
            active: Vec::new(),
            all: Vec::new(),
            batcher: LayerCompressor::new(width, height, true),
        }
    }
}

/// Walks a prepared scene tree and emits backend commands in visual
/// order.
///
/// Every clip nesting level is one depth. Content under a depth is split
/// into rounds whose clips share a single mask pass; an unclip between
/// rounds restores the parent region so the next round starts from the
/// parent's coverage.
pub struct CommandScheduler {
    width: f64,
    height: f64,
    depths: Vec<RenderDepth>,
    shape_batcher: LayerCompressor<NodeId>,
    unit_rect: ResidentPath,
}

impl CommandScheduler {
    /// `unit_rect` is the resident fill geometry of the unit square,
    /// which unclip stretches over each region it restores.
    pub fn new(width: f64, height: f64, unit_rect: ResidentPath) -> Self {
        Self {
            width,
            height,
            depths: Vec::new(),
            shape_batcher: LayerCompressor::new(width, height, false),
            unit_rect,
        }
    }

    /// Emits the command stream for a frame rooted at the clip node
    /// `root`.
    ///
    /// The scheduler appends grouping nodes to the arena while it runs;
    /// the caller resets the arena once the frame is done.
    pub fn render<B: RenderBackend>(
        &mut self,
        arena: &mut SceneArena,
        root: NodeId,
        backend: &mut B,
    ) {
        arena.prepare(root);
        if self.depths.is_empty() {
            self.depths.push(RenderDepth::new(self.width, self.height));
        }
        let bottom = &mut self.depths[0];
        bottom.active.clear();
        bottom.active.push(root);
        self.render_depth(arena, 0, backend);
    }

    fn render_depth<B: RenderBackend>(
        &mut self,
        arena: &mut SceneArena,
        depth: usize,
        backend: &mut B,
    ) {
        if self.depths.len() <= depth + 1 {
            self.depths.push(RenderDepth::new(self.width, self.height));
        }
        let (head, tail) = self.depths.split_at_mut(depth + 1);
        let current = &mut head[depth];
        let next = &mut tail[0];
        next.all.clear();

        let mut has_clips = false;
        for &active in &current.active {
            match arena.node(active) {
                SceneNode::Clip(_) => {
                    let children = arena.clip(active).children.clone();
                    for child in children {
                        match arena.node(child) {
                            SceneNode::Clip(_) => has_clips = true,
                            SceneNode::Shape(_) => {
                                arena.shape_mut(child).rendering_layer = depth as u32;
                            }
                            SceneNode::Group(_) => panic!("a group cannot be a clip child"),
                        }
                        next.all.push(child);
                    }
                }
                SceneNode::Group(_) => next.all.push(active),
                SceneNode::Shape(_) => panic!("a bare shape cannot be active"),
            }
        }

        if !has_clips {
            let level = std::mem::take(&mut next.all);
            self.draw(arena, &level, backend);
            self.depths[depth + 1].all = level;
            return;
        }

        for &node in &next.all {
            let joinable = !matches!(arena.node(node), SceneNode::Clip(_));
            current.batcher.place(node, arena.bounds(node), joinable);
        }
        let rounds = current.batcher.take_groups();
        log::trace!("depth {depth}: {} clip round(s)", rounds.len());

        for (index, round) in rounds.iter().enumerate() {
            let mut masks = Vec::new();
            for &node in round {
                if let SceneNode::Clip(clip) = arena.node(node) {
                    masks.extend(clip.masks.iter().copied());
                }
            }
            self.clip(arena, &masks, depth as u32 + 1, backend);

            // Runs of neighboring shapes become groups so the next depth
            // can carry them as single nodes.
            let mut actives = Vec::new();
            let mut run = Vec::new();
            for &node in round {
                match arena.node(node) {
                    SceneNode::Clip(_) | SceneNode::Group(_) => {
                        if !run.is_empty() {
                            actives.push(arena.push_group(std::mem::take(&mut run)));
                        }
                        actives.push(node);
                    }
                    SceneNode::Shape(_) => run.push(node),
                }
            }
            if !run.is_empty() {
                actives.push(arena.push_group(std::mem::take(&mut run)));
            }
            self.depths[depth + 1].active = actives;
            self.render_depth(arena, depth + 1, backend);

            if index + 1 == rounds.len() {
                continue;
            }
            for &node in round {
                if matches!(arena.node(node), SceneNode::Clip(_)) {
                    self.unclip(arena.bounds(node), depth as u32, backend);
                }
            }
        }
        self.depths[depth].batcher.reset();
    }

    /// Draws a clip-free level: per batch, stencil every shape, cover
    /// every shape, then wipe the stencils strokes leave behind.
    fn draw<B: RenderBackend>(&mut self, arena: &SceneArena, level: &[NodeId], backend: &mut B) {
        for &node in level {
            match arena.node(node) {
                SceneNode::Shape(shape) => {
                    self.shape_batcher.place(node, shape.bounds, true);
                }
                SceneNode::Group(group) => {
                    for &child in &group.children {
                        self.shape_batcher.place(child, arena.shape(child).bounds, true);
                    }
                }
                SceneNode::Clip(_) => panic!("a clip cannot reach the leaf level"),
            }
        }

        for batch in self.shape_batcher.groups() {
            for &id in batch {
                let shape = arena.shape(id);
                backend.stencil(
                    shape.stencil_path,
                    shape.fill_rule,
                    &shape_params(shape, shape.rendering_layer),
                );
            }
            for &id in batch {
                let shape = arena.shape(id);
                let params = CommandParameter {
                    paint: shape.paint.as_ref(),
                    ..shape_params(shape, shape.rendering_layer)
                };
                backend.draw(shape.draw_path, &params);
            }
            for &id in batch {
                let shape = arena.shape(id);
                let Some(unstencil) = shape.unstencil_path else {
                    continue;
                };
                backend.unstencil(unstencil, &shape_params(shape, shape.rendering_layer));
            }
        }
        self.shape_batcher.reset();
    }

    /// Establishes the clip masks for one round at `depth`.
    ///
    /// Masks are stenciled and wiped at the parent depth, where they are
    /// still visible; the clip write in between converts the stencil
    /// coverage into depth `depth`.
    fn clip<B: RenderBackend>(
        &mut self,
        arena: &SceneArena,
        masks: &[NodeId],
        depth: u32,
        backend: &mut B,
    ) {
        let parent = depth - 1;
        for &id in masks {
            self.shape_batcher.place(id, arena.shape(id).bounds, true);
        }

        for batch in self.shape_batcher.groups() {
            for &id in batch {
                let shape = arena.shape(id);
                backend.stencil(shape.stencil_path, shape.fill_rule, &shape_params(shape, parent));
            }
            for &id in batch {
                let shape = arena.shape(id);
                backend.clip(shape.draw_path, &shape_params(shape, depth));
            }
            for &id in batch {
                let shape = arena.shape(id);
                let Some(unstencil) = shape.unstencil_path else {
                    continue;
                };
                backend.unstencil(unstencil, &shape_params(shape, parent));
            }
        }
        self.shape_batcher.reset();
    }

    /// Restores the parent clip depth over `bounds` by drawing the unit
    /// rectangle stretched across it.
    fn unclip<B: RenderBackend>(&self, bounds: Rect, layer: u32, backend: &mut B) {
        let params = CommandParameter {
            world_matrix: Affine::new([
                bounds.width(),
                0.0,
                0.0,
                bounds.height(),
                bounds.x0,
                bounds.y0,
            ]),
            scissor_min: Point::new(bounds.x0, bounds.y0),
            scissor_max: Point::new(bounds.x1, bounds.y1),
            clipping_layer: layer,
            paint: None,
        };
        backend.unclip(self.unit_rect, &params);
    }
}

#[cfg(test)]
mod tests {
    use peniko::kurbo::{Affine, Rect};
    use peniko::{Color, Fill};
    use smallvec::smallvec;

    use super::CommandScheduler;
    use crate::paint::Paint;
    use crate::recording::{Command, Recording};
    use crate::residency::ResidentPath;
    use crate::scene::{NodeId, SceneArena, Shape};

    fn resident(address: u32) -> ResidentPath {
        ResidentPath {
            address,
            num_vertices: 6,
            bounding_box: Rect::ZERO,
        }
    }

    fn fill_shape(bounds: Rect, stencil_at: u32, draw_at: u32, paint: Option<Paint>) -> Shape {
        Shape {
            stencil_path: resident(stencil_at),
            draw_path: resident(draw_at),
            unstencil_path: None,
            fill_rule: Fill::NonZero,
            paint,
            matrix: Affine::IDENTITY,
            bounds,
            rendering_layer: 0,
        }
    }

    fn solid(r: u8, g: u8, b: u8) -> Option<Paint> {
        Some(Paint::Solid(Color::rgb8(r, g, b)))
    }

    fn scheduler() -> CommandScheduler {
        CommandScheduler::new(640.0, 480.0, resident(480))
    }

    fn kinds(recording: &Recording) -> Vec<(&'static str, u32)> {
        recording
            .commands
            .iter()
            .map(|command| match command {
                Command::Clear(_) => ("clear", 0),
                Command::Stencil(call, _) => ("stencil", call.address),
                Command::Draw(call) => ("draw", call.address),
                Command::Unstencil(call) => ("unstencil", call.address),
                Command::Clip(call) => ("clip", call.address),
                Command::Unclip(call) => ("unclip", call.address),
            })
            .collect()
    }

    fn root_of(arena: &mut SceneArena, children: &[NodeId]) -> NodeId {
        let root = arena.push_clip(smallvec![]);
        arena.clip_mut(root).children.extend_from_slice(children);
        root
    }

    #[test]
    fn disjoint_shapes_batch_and_overlaps_keep_their_order() {
        let mut arena = SceneArena::new();
        let a = arena.push_shape(fill_shape(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            0,
            100,
            solid(255, 0, 0),
        ));
        let b = arena.push_shape(fill_shape(
            Rect::new(50.0, 50.0, 150.0, 150.0),
            12,
            112,
            solid(0, 0, 255),
        ));
        let c = arena.push_shape(fill_shape(
            Rect::new(300.0, 300.0, 400.0, 400.0),
            24,
            124,
            solid(0, 255, 0),
        ));
        let root = root_of(&mut arena, &[a, b, c]);

        let mut recording = Recording::default();
        scheduler().render(&mut arena, root, &mut recording);

        // A and C share a batch; B overlaps A and must cover it later.
        assert_eq!(
            kinds(&recording),
            [
                ("stencil", 0),
                ("stencil", 24),
                ("draw", 100),
                ("draw", 124),
                ("stencil", 12),
                ("draw", 112),
            ]
        );
        for command in &recording.commands {
            let (Command::Stencil(call, _) | Command::Draw(call)) = command else {
                panic!("unexpected command kind");
            };
            assert_eq!(call.state.clipping_layer, 0);
        }
    }

    #[test]
    fn nested_clips_stencil_masks_at_the_parent_depth() {
        let mut arena = SceneArena::new();
        let a = arena.push_shape(fill_shape(
            Rect::new(0.0, 0.0, 200.0, 200.0),
            0,
            100,
            solid(255, 0, 0),
        ));
        let mask = arena.push_shape(fill_shape(Rect::new(0.0, 0.0, 100.0, 100.0), 24, 124, None));
        let inner = arena.push_shape(fill_shape(
            Rect::new(20.0, 20.0, 80.0, 80.0),
            48,
            148,
            solid(0, 255, 0),
        ));
        let clip = arena.push_clip(smallvec![mask]);
        arena.clip_mut(clip).children.push(inner);
        // A later shape overlapping only earlier shapes rejoins their
        // round instead of stacking above the clip.
        let e = arena.push_shape(fill_shape(
            Rect::new(10.0, 10.0, 90.0, 90.0),
            72,
            172,
            solid(0, 0, 255),
        ));
        let root = root_of(&mut arena, &[a, clip, e]);

        let mut recording = Recording::default();
        scheduler().render(&mut arena, root, &mut recording);

        assert_eq!(
            kinds(&recording),
            [
                ("stencil", 0),
                ("draw", 100),
                ("stencil", 72),
                ("draw", 172),
                ("stencil", 24),
                ("clip", 124),
                ("stencil", 48),
                ("draw", 148),
            ]
        );
        let Command::Stencil(mask_stencil, _) = &recording.commands[4] else {
            panic!("expected the mask stencil");
        };
        assert_eq!(mask_stencil.state.clipping_layer, 0);
        let Command::Clip(clip_write) = &recording.commands[5] else {
            panic!("expected the clip write");
        };
        assert_eq!(clip_write.state.clipping_layer, 1);
        // The mask was cut down to the content it reveals.
        assert_eq!(clip_write.state.scissor_min, (20.0, 20.0).into());
        assert_eq!(clip_write.state.scissor_max, (80.0, 80.0).into());
        let Command::Draw(inner_draw) = &recording.commands[7] else {
            panic!("expected the clipped draw");
        };
        assert_eq!(inner_draw.state.clipping_layer, 1);
    }

    #[test]
    fn overlapping_sibling_clips_unclip_between_rounds() {
        let mut arena = SceneArena::new();
        let mask_1 = arena.push_shape(fill_shape(Rect::new(0.0, 0.0, 100.0, 100.0), 0, 100, None));
        let inner_1 = arena.push_shape(fill_shape(
            Rect::new(10.0, 10.0, 90.0, 90.0),
            12,
            112,
            solid(255, 0, 0),
        ));
        let clip_1 = arena.push_clip(smallvec![mask_1]);
        arena.clip_mut(clip_1).children.push(inner_1);

        let mask_2 =
            arena.push_shape(fill_shape(Rect::new(50.0, 50.0, 150.0, 150.0), 24, 124, None));
        let inner_2 = arena.push_shape(fill_shape(
            Rect::new(60.0, 60.0, 140.0, 140.0),
            36,
            136,
            solid(0, 0, 255),
        ));
        let clip_2 = arena.push_clip(smallvec![mask_2]);
        arena.clip_mut(clip_2).children.push(inner_2);

        let root = root_of(&mut arena, &[clip_1, clip_2]);

        let mut recording = Recording::default();
        scheduler().render(&mut arena, root, &mut recording);

        assert_eq!(
            kinds(&recording),
            [
                ("stencil", 0),
                ("clip", 100),
                ("stencil", 12),
                ("draw", 112),
                ("unclip", 480),
                ("stencil", 24),
                ("clip", 124),
                ("stencil", 36),
                ("draw", 136),
            ]
        );
        let Command::Unclip(unclip) = &recording.commands[4] else {
            panic!("expected the unclip");
        };
        // The restore covers the first clip's content box at the parent
        // depth.
        assert_eq!(unclip.state.clipping_layer, 0);
        assert_eq!(
            unclip.state.world_matrix,
            Affine::new([80.0, 0.0, 0.0, 80.0, 10.0, 10.0])
        );
        assert_eq!(unclip.state.scissor_min, (10.0, 10.0).into());
        assert_eq!(unclip.state.scissor_max, (90.0, 90.0).into());
    }
}
