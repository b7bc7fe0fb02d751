//! Function-pointer mode machine.
//!
//! Classic embedded FSM pattern, one row per control mode:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  ModeTable                                                     │
//! │  ┌────────────┬───────────┬──────────┬─────────────────────┐   │
//! │  │ ControlMode│ on_enter  │ on_exit  │ on_update           │   │
//! │  ├────────────┼───────────┼──────────┼─────────────────────┤   │
//! │  │ Manual     │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Command    │   │
//! │  │ Automatic  │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Command    │   │
//! │  │ Antifreeze │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Command    │   │
//! │  └────────────┴───────────┴──────────┴─────────────────────┘   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** mode, which
//! returns the command that mode wants.  Modes never switch themselves:
//! a transition only happens through [`Fsm::select`], which runs
//! `on_exit` for the current mode and `on_enter` for the next.

pub mod context;
pub mod modes;

use context::ModeContext;
use log::info;
use serde::{Deserialize, Serialize};

use crate::control::HeaterCommand;

// ---------------------------------------------------------------------------
// Mode identity
// ---------------------------------------------------------------------------

/// Enumeration of the control modes.
/// Must stay in sync with the table built in [`modes::build_mode_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControlMode {
    Manual = 0,
    Automatic = 1,
    Antifreeze = 2,
}

impl ControlMode {
    /// Total number of modes, used to size the table array.
    pub const COUNT: usize = 3;

    pub const ALL: [ControlMode; Self::COUNT] = [Self::Manual, Self::Automatic, Self::Antifreeze];

    /// Convert an index back to `ControlMode`.  Out-of-range indices fall
    /// back to `Manual`.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            1 => Self::Automatic,
            2 => Self::Antifreeze,
            _ => {
                debug_assert!(idx == 0, "invalid mode index: {idx}");
                Self::Manual
            }
        }
    }

    /// Option label used by the host's select entity.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "Manual",
            Self::Automatic => "Automatic",
            Self::Antifreeze => "Antifreeze",
        }
    }

    /// Parse a select option label (case-insensitive).
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(label.trim()))
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type ModeActionFn = fn(&mut ModeContext);

/// Signature for the per-tick update handler.
pub type ModeUpdateFn = fn(&mut ModeContext) -> HeaterCommand;

// ---------------------------------------------------------------------------
// Mode descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single mode.
pub struct ModeDescriptor {
    pub id: ControlMode,
    pub name: &'static str,
    pub on_enter: Option<ModeActionFn>,
    pub on_exit: Option<ModeActionFn>,
    pub on_update: ModeUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `ControlMode as usize`.
    table: [ModeDescriptor; ControlMode::COUNT],
    current: usize,
    tick_count: u64,
    mode_entry_tick: u64,
}

impl Fsm {
    pub fn new(table: [ModeDescriptor; ControlMode::COUNT], initial: ControlMode) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            mode_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter`.  Call once before the first `tick()`.
    pub fn start(&mut self, ctx: &mut ModeContext) {
        info!("mode machine starting in {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Run the current mode's update and store its command in
    /// `ctx.requested`.
    pub fn tick(&mut self, ctx: &mut ModeContext) -> HeaterCommand {
        self.tick_count += 1;
        ctx.ticks_in_mode = self.tick_count - self.mode_entry_tick;

        let command = (self.table[self.current].on_update)(ctx);
        ctx.requested = command;
        command
    }

    /// Switch to `next`.  Returns `false` if it is already active.
    pub fn select(&mut self, next: ControlMode, ctx: &mut ModeContext) -> bool {
        let next_idx = next as usize;
        if next_idx == self.current {
            return false;
        }

        info!(
            "mode transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.mode_entry_tick = self.tick_count;
        ctx.ticks_in_mode = 0;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
        true
    }

    pub fn current_mode(&self) -> ControlMode {
        self.table[self.current].id
    }
}
