//! Send/receive modifier flags.

use std::ops::BitOr;

/// Modifier flags for send and receive operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(i32);

impl Flags {
    /// No modifiers: the operation blocks per the socket's timeout options.
    pub const NONE: Flags = Flags(0);

    /// Fail with a would-block error instead of waiting (`NN_DONTWAIT`).
    pub const DONTWAIT: Flags = Flags(1);

    #[must_use]
    pub const fn bits(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when the operation must not block.
    #[must_use]
    pub const fn dont_wait(self) -> bool {
        self.contains(Self::DONTWAIT)
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_bits() {
        assert_eq!(Flags::NONE.bits(), 0);
        assert_eq!(Flags::DONTWAIT.bits(), 1);
        assert!((Flags::NONE | Flags::DONTWAIT).dont_wait());
        assert!(!Flags::NONE.dont_wait());
    }
}
