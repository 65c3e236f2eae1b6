use bevy::prelude::*;

/// Shared count of outstanding asynchronous file loads for the current venue
/// session. Initialized once to the venue's expected total, then decremented
/// exactly once per settled operation — success or handled failure alike.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadTracker {
    remaining: u32,
    total: u32,
}

impl LoadTracker {
    pub fn reset(&mut self, total: u32) {
        self.remaining = total;
        self.total = total;
    }

    /// Marks one logical load operation as settled.
    pub fn complete_one(&mut self) {
        if self.remaining == 0 {
            warn!("load tracker decremented past zero; an operation was counted twice");
            return;
        }
        self.remaining -= 1;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn is_settled(&self) -> bool {
        self.remaining == 0
    }
}
