//! Break-time contract: hardness and the held tool decide how fast a block is mined.

use crate::registry::BlockRegistry;
use crate::types::{BlockId, ToolProps};

/// Speed reported for zero-hardness blocks; any positive frame time finishes them.
pub const INSTANT_MINE_SPEED: f32 = 20.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MineSpeed {
    Unbreakable,
    /// Progress per second; mining completes when accumulated progress reaches 1.
    PerSecond(f32),
}

impl MineSpeed {
    #[inline]
    pub fn is_instant(self) -> bool {
        matches!(self, MineSpeed::PerSecond(s) if s >= INSTANT_MINE_SPEED)
    }
}

pub fn mine_speed(reg: &BlockRegistry, block: BlockId, held: Option<&ToolProps>) -> MineSpeed {
    let ty = reg.get(block);
    if ty.hardness < 0.0 {
        return MineSpeed::Unbreakable;
    }
    if ty.hardness == 0.0 {
        return MineSpeed::PerSecond(INSTANT_MINE_SPEED);
    }
    let multiplier = match (ty.best_tool, held) {
        (Some(best), Some(tool)) if tool.kind == best => 1.0 + 2.0 * tool.tier as f32,
        _ => 1.0,
    };
    MineSpeed::PerSecond(multiplier / ty.hardness)
}

/// Accumulates `speed · dt` for the block currently being mined.
#[derive(Clone, Debug, Default)]
pub struct MiningProgress {
    target: Option<(i32, i32, i32)>,
    progress: f32,
}

impl MiningProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn reset(&mut self) {
        self.target = None;
        self.progress = 0.0;
    }

    /// Advances mining of `pos`; switching targets restarts from zero.
    /// Returns true once the block breaks.
    pub fn advance(&mut self, pos: (i32, i32, i32), speed: MineSpeed, dt: f32) -> bool {
        if self.target != Some(pos) {
            self.target = Some(pos);
            self.progress = 0.0;
        }
        match speed {
            MineSpeed::Unbreakable => false,
            MineSpeed::PerSecond(s) => {
                self.progress += s * dt.max(0.0);
                if self.progress >= 1.0 {
                    self.reset();
                    true
                } else {
                    false
                }
            }
        }
    }
}
