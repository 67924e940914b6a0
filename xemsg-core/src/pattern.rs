//! Addressing domains and communication patterns.
//!
//! Numbering follows the nanomsg constants (`AF_SP`, `NN_PAIR`, ...) so the
//! symbol table can expose the familiar values.

use std::fmt;

/// Socket addressing domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Domain {
    /// Standard full-blown SP socket.
    Sp = 1,

    /// Raw SP socket, for use inside topology devices.
    SpRaw = 2,
}

impl Domain {
    pub const ALL: [Domain; 2] = [Domain::Sp, Domain::SpRaw];

    /// Numeric constant value for this domain.
    #[must_use]
    pub const fn value(self) -> i32 {
        self as i32
    }

    /// Look up a domain by its constant value.
    #[must_use]
    pub const fn from_value(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Sp),
            2 => Some(Self::SpRaw),
            _ => None,
        }
    }
}

/// Scalability-protocol communication patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Pattern {
    /// Exclusive one-to-one bidirectional channel.
    Pair = 16,

    /// Publisher side of pub/sub fan-out.
    Pub = 32,

    /// Subscriber side of pub/sub; filters by subscribed prefixes.
    Sub = 33,

    /// Request side of req/rep; alternates send and recv.
    Req = 48,

    /// Reply side of req/rep; alternates recv and send.
    Rep = 49,

    /// Sending side of a load-balanced pipeline.
    Push = 80,

    /// Receiving side of a pipeline; fair-queues from pushers.
    Pull = 81,

    /// Broadcasts a survey and gathers responses.
    Surveyor = 98,

    /// Answers surveys, one response per survey received.
    Respondent = 99,

    /// Many-to-many broadcast bus.
    Bus = 112,
}

impl Pattern {
    pub const ALL: [Pattern; 10] = [
        Pattern::Pair,
        Pattern::Pub,
        Pattern::Sub,
        Pattern::Req,
        Pattern::Rep,
        Pattern::Push,
        Pattern::Pull,
        Pattern::Surveyor,
        Pattern::Respondent,
        Pattern::Bus,
    ];

    /// Get the pattern as a string name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pair => "PAIR",
            Self::Pub => "PUB",
            Self::Sub => "SUB",
            Self::Req => "REQ",
            Self::Rep => "REP",
            Self::Push => "PUSH",
            Self::Pull => "PULL",
            Self::Surveyor => "SURVEYOR",
            Self::Respondent => "RESPONDENT",
            Self::Bus => "BUS",
        }
    }

    /// Numeric constant value for this pattern.
    #[must_use]
    pub const fn value(self) -> i32 {
        self as i32
    }

    /// Look up a pattern by its constant value.
    #[must_use]
    pub const fn from_value(value: i32) -> Option<Self> {
        match value {
            16 => Some(Self::Pair),
            32 => Some(Self::Pub),
            33 => Some(Self::Sub),
            48 => Some(Self::Req),
            49 => Some(Self::Rep),
            80 => Some(Self::Push),
            81 => Some(Self::Pull),
            98 => Some(Self::Surveyor),
            99 => Some(Self::Respondent),
            112 => Some(Self::Bus),
            _ => None,
        }
    }

    /// Check whether this pattern can connect to the given peer pattern.
    #[must_use]
    pub const fn is_compatible(self, peer: Pattern) -> bool {
        matches!(
            (self, peer),
            (Self::Pair, Self::Pair)
                | (Self::Pub, Self::Sub)
                | (Self::Sub, Self::Pub)
                | (Self::Req, Self::Rep)
                | (Self::Rep, Self::Req)
                | (Self::Push, Self::Pull)
                | (Self::Pull, Self::Push)
                | (Self::Surveyor, Self::Respondent)
                | (Self::Respondent, Self::Surveyor)
                | (Self::Bus, Self::Bus)
        )
    }

    /// Whether send is defined for this pattern.
    #[must_use]
    pub const fn can_send(self) -> bool {
        !matches!(self, Self::Pull | Self::Sub)
    }

    /// Whether recv is defined for this pattern.
    #[must_use]
    pub const fn can_recv(self) -> bool {
        !matches!(self, Self::Push | Self::Pub)
    }

    /// Broadcast patterns deliver to every eligible peer and never block on
    /// a slow one; unicast patterns pick a single target and apply
    /// backpressure.
    #[must_use]
    pub const fn fans_out(self) -> bool {
        matches!(self, Self::Pub | Self::Surveyor | Self::Bus)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_display() {
        assert_eq!(Pattern::Pair.to_string(), "PAIR");
        assert_eq!(Pattern::Surveyor.to_string(), "SURVEYOR");
    }

    #[test]
    fn test_pattern_values_round_trip() {
        for p in Pattern::ALL {
            assert_eq!(Pattern::from_value(p.value()), Some(p));
        }
        assert_eq!(Pattern::from_value(17), None);
    }

    #[test]
    fn test_compatibility() {
        assert!(Pattern::Push.is_compatible(Pattern::Pull));
        assert!(Pattern::Pull.is_compatible(Pattern::Push));
        assert!(Pattern::Pub.is_compatible(Pattern::Sub));
        assert!(Pattern::Req.is_compatible(Pattern::Rep));
        assert!(Pattern::Bus.is_compatible(Pattern::Bus));
        assert!(Pattern::Surveyor.is_compatible(Pattern::Respondent));

        // Incompatible pairs
        assert!(!Pattern::Push.is_compatible(Pattern::Push));
        assert!(!Pattern::Pub.is_compatible(Pattern::Pull));
        assert!(!Pattern::Req.is_compatible(Pattern::Req));
    }

    #[test]
    fn test_directionality() {
        assert!(!Pattern::Pull.can_send());
        assert!(!Pattern::Sub.can_send());
        assert!(!Pattern::Push.can_recv());
        assert!(!Pattern::Pub.can_recv());
        assert!(Pattern::Pair.can_send() && Pattern::Pair.can_recv());
        assert!(Pattern::Bus.can_send() && Pattern::Bus.can_recv());
    }
}
