//! Shared element counting for the containers.
//!
//! `ElementCount` is the single source of truth for a container's
//! logical length. Only insert/remove paths of the owning container call
//! `increase`/`decrease`; everything else reads it.

/// Capability shared by every container in this crate.
pub trait SizedContainer {
    /// Number of live elements.
    fn len(&self) -> usize;

    /// True when the container holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every element. Backing capacity is kept.
    fn clear(&mut self);
}

/// Logical element count owned by a container.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ElementCount {
    count: usize,
}

impl ElementCount {
    pub(crate) const fn new() -> Self {
        Self { count: 0 }
    }

    #[inline]
    pub(crate) fn get(&self) -> usize {
        self.count
    }

    #[inline]
    pub(crate) fn increase(&mut self) {
        self.count += 1;
    }

    #[inline]
    pub(crate) fn decrease(&mut self) {
        assert!(self.count > 0, "ElementCount underflow");
        self.count -= 1;
    }

    #[inline]
    pub(crate) fn reset(&mut self) {
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::{ElementCount, SizedContainer};

    #[test]
    fn increase_decrease_reset() {
        let mut c = ElementCount::new();
        assert_eq!(c.get(), 0);
        c.increase();
        c.increase();
        assert_eq!(c.get(), 2);
        c.decrease();
        assert_eq!(c.get(), 1);
        c.reset();
        assert_eq!(c.get(), 0);
    }

    #[test]
    #[should_panic(expected = "ElementCount underflow")]
    fn decrease_below_zero_panics() {
        let mut c = ElementCount::new();
        c.decrease();
    }

    /// The provided `is_empty` follows `len`.
    #[test]
    fn default_is_empty_follows_len() {
        struct Fixed(usize);
        impl SizedContainer for Fixed {
            fn len(&self) -> usize {
                self.0
            }
            fn clear(&mut self) {
                self.0 = 0;
            }
        }

        let mut f = Fixed(3);
        assert!(!f.is_empty());
        f.clear();
        assert!(f.is_empty());
    }
}
