//! Revision stamps for fail-fast cursors.
//!
//! Each container embeds a `Revision`. Structural mutations bump it; value
//! replacement does not. Cursors keep a `Stamp` taken when they were
//! created (or last refreshed by their own removal) and compare it by value
//! before every step. The owner id distinguishes containers so a cursor
//! cannot be fed a container that happens to sit at the same revision.

use crate::error::ContainerError;
use core::sync::atomic::{AtomicU64, Ordering};

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Per-instance structural mutation counter.
#[derive(Debug)]
pub(crate) struct Revision {
    owner: u64,
    count: u64,
}

impl Revision {
    pub(crate) fn new() -> Self {
        Self {
            owner: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
            count: 0,
        }
    }

    #[inline]
    pub(crate) fn bump(&mut self) {
        self.count = self.count.wrapping_add(1);
    }

    #[inline]
    pub(crate) fn stamp(&self) -> Stamp {
        Stamp {
            owner: self.owner,
            count: self.count,
        }
    }

    #[cfg(test)]
    pub(crate) fn count(&self) -> u64 {
        self.count
    }
}

impl Default for Revision {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of a `Revision`, compared by value.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Stamp {
    owner: u64,
    count: u64,
}

/// Lifecycle of a cursor.
///
/// `Fresh` until the first `next`, `Active` while elements are being
/// yielded, `Exhausted` once `next` ran out. `Invalidated` is terminal:
/// after a revision mismatch every further call fails with
/// `ContainerError::ConcurrentModification`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CursorState {
    Fresh,
    Active,
    Exhausted,
    Invalidated,
}

/// Stamp plus state, embedded in every cursor.
#[derive(Copy, Clone, Debug)]
pub(crate) struct FailFast {
    stamp: Stamp,
    state: CursorState,
}

impl FailFast {
    pub(crate) fn new(revision: &Revision) -> Self {
        Self {
            stamp: revision.stamp(),
            state: CursorState::Fresh,
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> CursorState {
        self.state
    }

    /// Run before every cursor operation. A mismatch invalidates the
    /// cursor permanently.
    pub(crate) fn check(&mut self, revision: &Revision) -> Result<(), ContainerError> {
        let current = revision.stamp();
        if current.owner != self.stamp.owner {
            return Err(ContainerError::ForeignContainer);
        }
        if self.state == CursorState::Invalidated {
            return Err(ContainerError::ConcurrentModification);
        }
        if current.count != self.stamp.count {
            tracing::trace!(
                expected = self.stamp.count,
                observed = current.count,
                "cursor invalidated by structural modification"
            );
            self.state = CursorState::Invalidated;
            return Err(ContainerError::ConcurrentModification);
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn yielded(&mut self) {
        self.state = CursorState::Active;
    }

    #[inline]
    pub(crate) fn exhausted(&mut self) {
        self.state = CursorState::Exhausted;
    }

    /// Accept the container's current revision after a removal made through
    /// this cursor.
    #[inline]
    pub(crate) fn refresh(&mut self, revision: &Revision) {
        self.stamp = revision.stamp();
    }
}
