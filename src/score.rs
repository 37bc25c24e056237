//! Shared score counter.
//!
//! The controller increments it, the play-loop effect reads it for every
//! frame. It survives Pause/Resume and is only reset on a fresh game.

use core::sync::atomic::{
    AtomicU32,
    Ordering,
};

pub struct Score {
    value: AtomicU32,
}

impl Score {
    pub const fn new() -> Self {
        Self {
            value: AtomicU32::new(0),
        }
    }

    /// Start a fresh game at zero.
    pub fn reset(&self) {
        self.value.store(0, Ordering::SeqCst);
    }

    /// Count one qualifying tap. Returns the new score.
    pub fn increment(&self) -> u32 {
        self.value.fetch_add(1, Ordering::SeqCst).saturating_add(1)
    }

    pub fn value(&self) -> u32 {
        self.value.load(Ordering::SeqCst)
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::new()
    }
}
