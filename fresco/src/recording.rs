// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command recording for deferred execution and for tests.

use fresco_encoding::VERTEX_TEXELS;
use peniko::kurbo::{Affine, Point};
use peniko::{Color, Fill};

use crate::backend::{CommandParameter, RenderBackend};
use crate::paint::Paint;
use crate::residency::ResidentPath;

/// Owned snapshot of the [`CommandParameter`] block a command was issued
/// with.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandState {
    pub world_matrix: Affine,
    pub scissor_min: Point,
    pub scissor_max: Point,
    pub clipping_layer: u32,
    pub paint: Option<Paint>,
}

impl CommandState {
    fn capture(params: &CommandParameter<'_>) -> Self {
        Self {
            world_matrix: params.world_matrix,
            scissor_min: params.scissor_min,
            scissor_max: params.scissor_max,
            clipping_layer: params.clipping_layer,
            paint: params.paint.cloned(),
        }
    }

    /// Reborrows the snapshot as a parameter block, for descriptor packing
    /// at execution time.
    pub fn as_parameter(&self) -> CommandParameter<'_> {
        CommandParameter {
            world_matrix: self.world_matrix,
            scissor_min: self.scissor_min,
            scissor_max: self.scissor_max,
            clipping_layer: self.clipping_layer,
            paint: self.paint.as_ref(),
        }
    }
}

/// One merged GPU draw: a vertex range plus the state it renders with.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    /// First vertex texel address.
    pub address: u32,
    /// Vertices covered, possibly spanning several merged commands.
    pub num_vertices: u32,
    pub state: CommandState,
}

impl DrawCall {
    fn capture(path: ResidentPath, params: &CommandParameter<'_>) -> Self {
        Self {
            address: path.address,
            num_vertices: path.num_vertices,
            state: CommandState::capture(params),
        }
    }
}

/// Single command inside a [`Recording`].
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Clears color, depth and stencil.
    Clear(Color),
    /// Accumulates stencil winding under the vertex range.
    Stencil(DrawCall, Fill),
    /// Covers stenciled fragments with the state's paint.
    Draw(DrawCall),
    /// Zeroes stencil a cover pass left behind.
    Unstencil(DrawCall),
    /// Converts a stenciled mask into a clip layer depth write.
    Clip(DrawCall),
    /// Restores a parent clip layer's depth across a box.
    Unclip(DrawCall),
}

impl Command {
    /// Extends `self` over `next`'s vertex range when both commands are the
    /// same kind, carry equal state and the ranges touch in the vertex
    /// texture.
    fn try_merge(&mut self, next: &Self) -> bool {
        let (call, next_call) = match (self, next) {
            (Self::Stencil(a, fill_a), Self::Stencil(b, fill_b)) if fill_a == fill_b => (a, b),
            (Self::Draw(a), Self::Draw(b)) => (a, b),
            (Self::Unstencil(a), Self::Unstencil(b)) => (a, b),
            (Self::Clip(a), Self::Clip(b)) => (a, b),
            (Self::Unclip(a), Self::Unclip(b)) => (a, b),
            _ => return false,
        };
        if call.state != next_call.state
            || call.address + call.num_vertices * VERTEX_TEXELS != next_call.address
        {
            return false;
        }
        call.num_vertices += next_call.num_vertices;
        true
    }
}

/// List of [`Command`]s for an executor to run in order.
///
/// `Recording` is the reference [`RenderBackend`]: it applies the merge
/// rule as commands arrive, so its command count equals the number of GPU
/// draws an executor would issue.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recording {
    pub commands: Vec<Command>,
}

impl Recording {
    fn merge_or_push(&mut self, cmd: Command) {
        if let Some(last) = self.commands.last_mut() {
            if last.try_merge(&cmd) {
                return;
            }
        }
        self.commands.push(cmd);
    }

    /// Number of draws an executor would issue, ignoring the frame clear.
    pub fn draw_calls(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| !matches!(cmd, Command::Clear(_)))
            .count()
    }

    /// Returns a [`Vec`] containing all the [`Command`]s in order.
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

impl RenderBackend for Recording {
    fn clear(&mut self, color: Color) {
        self.commands.clear();
        self.commands.push(Command::Clear(color));
    }

    fn stencil(&mut self, path: ResidentPath, fill: Fill, params: &CommandParameter<'_>) {
        self.merge_or_push(Command::Stencil(DrawCall::capture(path, params), fill));
    }

    fn draw(&mut self, path: ResidentPath, params: &CommandParameter<'_>) {
        assert!(params.paint.is_some(), "draw command requires a paint");
        self.merge_or_push(Command::Draw(DrawCall::capture(path, params)));
    }

    fn unstencil(&mut self, path: ResidentPath, params: &CommandParameter<'_>) {
        self.merge_or_push(Command::Unstencil(DrawCall::capture(path, params)));
    }

    fn clip(&mut self, path: ResidentPath, params: &CommandParameter<'_>) {
        self.merge_or_push(Command::Clip(DrawCall::capture(path, params)));
    }

    fn unclip(&mut self, path: ResidentPath, params: &CommandParameter<'_>) {
        self.merge_or_push(Command::Unclip(DrawCall::capture(path, params)));
    }
}
