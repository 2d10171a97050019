//! Draw Command Abstraction
//!
//! Explicit per-renderer draw commands recorded into command buffers, and
//! the pool those buffers are borrowed from.
//!
//! # Scoped buffers
//!
//! [`CommandBufferPool::get`] returns a [`PooledCommandBuffer`] guard. The
//! guard hands the buffer back to the pool when dropped, so every exit
//! path of the recording code (including `?`) releases it exactly once.
//!
//! ```ignore
//! let mut cmd = pool.get("shadow_volume");
//! cmd.draw_renderer(renderer, &material, 0, pass);
//! context.execute_command_buffer(&cmd)?;
//! // released here
//! ```

use core::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::caster::RendererId;
use crate::material::{Material, PassIndex};

/// A draw command ready for submission
#[derive(Clone, Debug)]
pub enum DrawCommand {
    /// Draw one submesh of a renderer with an explicit material pass
    Renderer {
        /// Renderer to draw
        renderer: RendererId,
        /// Material used instead of the renderer's own
        material: Arc<Material>,
        /// Submesh (material slot) index
        submesh_index: u32,
        /// Pass of `material` to draw with
        shader_pass: PassIndex,
    },
}

impl DrawCommand {
    /// Create a renderer draw command
    pub fn renderer(
        renderer: RendererId,
        material: Arc<Material>,
        submesh_index: u32,
        shader_pass: PassIndex,
    ) -> Self {
        Self::Renderer {
            renderer,
            material,
            submesh_index,
            shader_pass,
        }
    }

    /// Target renderer
    pub fn renderer_id(&self) -> RendererId {
        match self {
            Self::Renderer { renderer, .. } => *renderer,
        }
    }

    /// Material pass the command draws with
    pub fn shader_pass(&self) -> PassIndex {
        match self {
            Self::Renderer { shader_pass, .. } => *shader_pass,
        }
    }

    /// Submesh index
    pub fn submesh_index(&self) -> u32 {
        match self {
            Self::Renderer { submesh_index, .. } => *submesh_index,
        }
    }
}

/// A named list of recorded draw commands
#[derive(Clone, Debug, Default)]
pub struct CommandBuffer {
    name: String,
    commands: Vec<DrawCommand>,
}

impl CommandBuffer {
    /// Create an empty named buffer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
        }
    }

    /// Buffer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record a renderer draw
    pub fn draw_renderer(
        &mut self,
        renderer: RendererId,
        material: &Arc<Material>,
        submesh_index: u32,
        shader_pass: PassIndex,
    ) {
        self.commands.push(DrawCommand::renderer(
            renderer,
            Arc::clone(material),
            submesh_index,
            shader_pass,
        ));
    }

    /// Recorded commands in order
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of recorded commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop recorded commands, keeping capacity
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

/// Command buffer pool statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandBufferPoolStats {
    /// Buffers handed out since creation
    pub acquired: u64,
    /// Buffers returned since creation
    pub released: u64,
    /// Buffers currently idle in the pool
    pub pooled: usize,
}

impl CommandBufferPoolStats {
    /// Buffers currently handed out
    pub fn in_use(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

#[derive(Debug, Default)]
struct PoolState {
    free: Vec<CommandBuffer>,
    acquired: u64,
    released: u64,
}

/// Pool of reusable command buffers
#[derive(Debug, Default)]
pub struct CommandBufferPool {
    state: Mutex<PoolState>,
}

impl CommandBufferPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow a cleared buffer named `name`
    pub fn get(&self, name: &str) -> PooledCommandBuffer<'_> {
        let mut state = self.state.lock();
        state.acquired += 1;
        let buffer = match state.free.pop() {
            Some(mut buffer) => {
                buffer.name.clear();
                buffer.name.push_str(name);
                buffer
            }
            None => CommandBuffer::new(name),
        };
        PooledCommandBuffer { pool: self, buffer }
    }

    fn release(&self, mut buffer: CommandBuffer) {
        buffer.clear();
        let mut state = self.state.lock();
        state.released += 1;
        state.free.push(buffer);
    }

    /// Current statistics
    pub fn stats(&self) -> CommandBufferPoolStats {
        let state = self.state.lock();
        CommandBufferPoolStats {
            acquired: state.acquired,
            released: state.released,
            pooled: state.free.len(),
        }
    }
}

/// A command buffer on loan from a [`CommandBufferPool`]
pub struct PooledCommandBuffer<'a> {
    pool: &'a CommandBufferPool,
    buffer: CommandBuffer,
}

impl Deref for PooledCommandBuffer<'_> {
    type Target = CommandBuffer;

    fn deref(&self) -> &CommandBuffer {
        &self.buffer
    }
}

impl DerefMut for PooledCommandBuffer<'_> {
    fn deref_mut(&mut self) -> &mut CommandBuffer {
        &mut self.buffer
    }
}

impl Drop for PooledCommandBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(core::mem::take(&mut self.buffer));
    }
}
