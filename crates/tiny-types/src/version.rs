use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Process-wide source of version stamps.
static CLOCK: AtomicU64 = AtomicU64::new(1);

/// A mutation stamp.
///
/// Every stamp handed out by [`Version::next`] is strictly greater than every
/// stamp handed out before it, across all objects. A container can therefore
/// report the maximum of its own stamp and its children's stamps and still
/// observe every nested mutation as a strictly increasing version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// The version of an object that has never been stamped.
    pub const ZERO: Version = Version(0);

    /// Draw a fresh stamp from the process-wide clock.
    pub fn next() -> Self {
        Self(CLOCK.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn next_is_never_zero() {
        assert!(Version::next() > Version::ZERO);
    }

    #[test]
    fn display_format() {
        assert_eq!(Version::ZERO.to_string(), "v0");
    }

    proptest! {
        #[test]
        fn stamps_strictly_increase(n in 1usize..200) {
            let mut last = Version::next();
            for _ in 0..n {
                let v = Version::next();
                prop_assert!(v > last);
                last = v;
            }
        }
    }
}
