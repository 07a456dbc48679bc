//! Identity types for dispatch loops.
//!
//! Ids are lightweight Copy newtypes drawn from a process-global counter, so
//! graphs built on different threads never collide.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one dispatch loop and of the self handle it owns.
///
/// Every graph construction allocates exactly one `LoopId`. It serves as the
/// owner tag of every callback created during that construction and as the
/// follow tag of signals that target this graph's body.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct LoopId(pub u64);

static LOOP_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

impl LoopId {
    /// Create a fresh unique LoopId.
    pub fn fresh() -> Self {
        LoopId(LOOP_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a LoopId with a specific value (for testing).
    pub fn from_raw(value: u64) -> Self {
        LoopId(value)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loop#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_are_unique() {
        let a = LoopId::fresh();
        let b = LoopId::fresh();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn test_raw_roundtrip_and_display() {
        let id = LoopId::from_raw(17);
        assert_eq!(id.raw(), 17);
        assert_eq!(id.to_string(), "loop#17");
    }
}
