//! Socket option descriptors and the per-socket option store.
//!
//! Two independent mappings govern option typing, on purpose:
//!
//! - **Get** dispatches presentation by option *name*: exactly one option
//!   ([`OptionName::SocketName`]) yields a string, every other readable
//!   option yields a 4-byte integer. See [`OptionName::read_kind`].
//! - **Set** dispatches by the representation of the *supplied value*: the
//!   caller hands in an [`OptionValue`], and a representation the option
//!   cannot accept is rejected as an invalid argument before any socket
//!   state is touched. See [`OptionName::write_kind`].
//!
//! Keeping the tables separate avoids silently coercing a wrong-typed value
//! for a known-integer option.

use crate::error::{Error, Result};
use crate::pattern::{Domain, Pattern};

/// Scope an option applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Generic socket-level options (`NN_SOL_SOCKET`).
    Socket,
    /// Pattern-specific options, e.g. subscriptions on a SUB socket.
    Pattern(Pattern),
}

impl Level {
    /// Numeric constant value for this level.
    #[must_use]
    pub const fn value(self) -> i32 {
        match self {
            Self::Socket => 0,
            Self::Pattern(p) => p.value(),
        }
    }
}

/// Option identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionName {
    // Socket-level options.
    Linger,
    SendBuffer,
    RecvBuffer,
    SendTimeout,
    RecvTimeout,
    ReconnectIvl,
    ReconnectIvlMax,
    SendPrio,
    RecvPrio,
    Domain,
    Protocol,
    Ipv4Only,
    SocketName,
    RecvMaxSize,
    MaxTtl,

    // SUB-pattern options (write-only).
    Subscribe,
    Unsubscribe,
}

/// Representation of an option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// 4-byte integer.
    Int,
    /// Length-at-query-time byte string.
    Str,
}

impl OptionName {
    /// Every option name, in constant-value order. Used by the symbol table
    /// and by option-enumeration tests.
    pub const ALL: [OptionName; 17] = [
        OptionName::Linger,
        OptionName::SendBuffer,
        OptionName::RecvBuffer,
        OptionName::SendTimeout,
        OptionName::RecvTimeout,
        OptionName::ReconnectIvl,
        OptionName::ReconnectIvlMax,
        OptionName::SendPrio,
        OptionName::RecvPrio,
        OptionName::Domain,
        OptionName::Protocol,
        OptionName::Ipv4Only,
        OptionName::SocketName,
        OptionName::RecvMaxSize,
        OptionName::MaxTtl,
        OptionName::Subscribe,
        OptionName::Unsubscribe,
    ];

    /// Numeric constant value (nanomsg numbering; pattern-level names have
    /// their own value space).
    #[must_use]
    pub const fn value(self) -> i32 {
        match self {
            Self::Linger => 1,
            Self::SendBuffer => 2,
            Self::RecvBuffer => 3,
            Self::SendTimeout => 4,
            Self::RecvTimeout => 5,
            Self::ReconnectIvl => 6,
            Self::ReconnectIvlMax => 7,
            Self::SendPrio => 8,
            Self::RecvPrio => 9,
            Self::Domain => 12,
            Self::Protocol => 13,
            Self::Ipv4Only => 14,
            Self::SocketName => 15,
            Self::RecvMaxSize => 16,
            Self::MaxTtl => 17,
            Self::Subscribe => 1,
            Self::Unsubscribe => 2,
        }
    }

    /// Level this option lives at.
    #[must_use]
    pub const fn level(self) -> Level {
        match self {
            Self::Subscribe | Self::Unsubscribe => Level::Pattern(Pattern::Sub),
            _ => Level::Socket,
        }
    }

    /// Representation a get returns, fixed by name. `None` means the option
    /// is write-only.
    #[must_use]
    pub const fn read_kind(self) -> Option<ValueKind> {
        match self {
            Self::SocketName => Some(ValueKind::Str),
            Self::Subscribe | Self::Unsubscribe => None,
            _ => Some(ValueKind::Int),
        }
    }

    /// Representation a set accepts. `None` means the option is read-only.
    #[must_use]
    pub const fn write_kind(self) -> Option<ValueKind> {
        match self {
            Self::SocketName | Self::Subscribe | Self::Unsubscribe => Some(ValueKind::Str),
            Self::Domain | Self::Protocol => None,
            _ => Some(ValueKind::Int),
        }
    }
}

/// Tagged option value: 32-bit integer or byte string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Int(i32),
    Str(String),
}

impl OptionValue {
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Str(_) => ValueKind::Str,
        }
    }

    /// Integer payload, if this value is an integer.
    #[must_use]
    pub const fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Str(_) => None,
        }
    }

    /// String payload, if this value is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Int(_) => None,
        }
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// Per-socket option store with nanomsg defaults.
#[derive(Debug, Clone)]
pub struct Opts {
    domain: Domain,
    pattern: Pattern,
    /// Milliseconds to keep flushing after close (advisory for inproc).
    pub linger: i32,
    /// Outbound buffer hint, bytes.
    pub send_buffer: i32,
    /// Inbound buffer hint, bytes.
    pub recv_buffer: i32,
    /// Send timeout in ms; -1 blocks indefinitely.
    pub send_timeout: i32,
    /// Receive timeout in ms; -1 blocks indefinitely.
    pub recv_timeout: i32,
    /// Initial reconnection delay, ms.
    pub reconnect_ivl: i32,
    /// Backoff cap for reconnection, ms; 0 disables backoff.
    pub reconnect_ivl_max: i32,
    /// Outbound priority, 1-16.
    pub send_prio: i32,
    /// Inbound priority, 1-16.
    pub recv_prio: i32,
    /// Restrict TCP to IPv4.
    pub ipv4_only: i32,
    /// Diagnostic socket name; the only string-valued readable option.
    pub socket_name: String,
    /// Largest message the socket accepts, bytes; -1 means unlimited.
    pub recv_max_size: i32,
    /// Hop cap for routed topologies.
    pub max_ttl: i32,
    /// Active subscription prefixes (SUB sockets only).
    pub subscriptions: Vec<Vec<u8>>,
}

impl Opts {
    /// Fresh option store for a newly created socket. The default socket
    /// name is the descriptor number rendered as a string.
    #[must_use]
    pub fn new(domain: Domain, pattern: Pattern, descriptor: i32) -> Self {
        Self {
            domain,
            pattern,
            linger: 1000,
            send_buffer: 128 * 1024,
            recv_buffer: 128 * 1024,
            send_timeout: -1,
            recv_timeout: -1,
            reconnect_ivl: 100,
            reconnect_ivl_max: 0,
            send_prio: 8,
            recv_prio: 8,
            ipv4_only: 1,
            socket_name: descriptor.to_string(),
            recv_max_size: 1024 * 1024,
            subscriptions: Vec::new(),
            max_ttl: 8,
        }
    }

    /// Read one option. Presentation is fixed by the name's read table.
    pub fn get(&self, level: Level, name: OptionName) -> Result<OptionValue> {
        if level != name.level() {
            return Err(Error::InvalidArgument(format!(
                "option {name:?} does not exist at level {}",
                level.value()
            )));
        }
        let value = match name {
            OptionName::Linger => OptionValue::Int(self.linger),
            OptionName::SendBuffer => OptionValue::Int(self.send_buffer),
            OptionName::RecvBuffer => OptionValue::Int(self.recv_buffer),
            OptionName::SendTimeout => OptionValue::Int(self.send_timeout),
            OptionName::RecvTimeout => OptionValue::Int(self.recv_timeout),
            OptionName::ReconnectIvl => OptionValue::Int(self.reconnect_ivl),
            OptionName::ReconnectIvlMax => OptionValue::Int(self.reconnect_ivl_max),
            OptionName::SendPrio => OptionValue::Int(self.send_prio),
            OptionName::RecvPrio => OptionValue::Int(self.recv_prio),
            OptionName::Domain => OptionValue::Int(self.domain.value()),
            OptionName::Protocol => OptionValue::Int(self.pattern.value()),
            OptionName::Ipv4Only => OptionValue::Int(self.ipv4_only),
            OptionName::SocketName => OptionValue::Str(self.socket_name.clone()),
            OptionName::RecvMaxSize => OptionValue::Int(self.recv_max_size),
            OptionName::MaxTtl => OptionValue::Int(self.max_ttl),
            OptionName::Subscribe | OptionName::Unsubscribe => {
                return Err(Error::InvalidArgument(format!(
                    "option {name:?} is write-only"
                )));
            }
        };
        Ok(value)
    }

    /// Write one option. The supplied value's representation must match the
    /// name's write table; mismatches are rejected without mutating anything.
    pub fn set(&mut self, level: Level, name: OptionName, value: OptionValue) -> Result<()> {
        if level != name.level() {
            if matches!(name, OptionName::Subscribe | OptionName::Unsubscribe) {
                return Err(Error::InvalidArgument(format!(
                    "option {name:?} only exists on SUB sockets"
                )));
            }
            return Err(Error::InvalidArgument(format!(
                "option {name:?} does not exist at level {}",
                level.value()
            )));
        }
        match name.write_kind() {
            None => {
                return Err(Error::InvalidArgument(format!(
                    "option {name:?} is read-only"
                )));
            }
            Some(kind) if kind != value.kind() => {
                return Err(Error::InvalidArgument(format!(
                    "option {name:?} expects a {kind:?} value, got {:?}",
                    value.kind()
                )));
            }
            Some(_) => {}
        }
        match (name, value) {
            (OptionName::Linger, OptionValue::Int(v)) => self.linger = v,
            (OptionName::SendBuffer, OptionValue::Int(v)) => {
                self.send_buffer = positive(name, v)?;
            }
            (OptionName::RecvBuffer, OptionValue::Int(v)) => {
                self.recv_buffer = positive(name, v)?;
            }
            (OptionName::SendTimeout, OptionValue::Int(v)) => {
                self.send_timeout = at_least(name, v, -1)?;
            }
            (OptionName::RecvTimeout, OptionValue::Int(v)) => {
                self.recv_timeout = at_least(name, v, -1)?;
            }
            (OptionName::ReconnectIvl, OptionValue::Int(v)) => {
                self.reconnect_ivl = positive(name, v)?;
            }
            (OptionName::ReconnectIvlMax, OptionValue::Int(v)) => {
                self.reconnect_ivl_max = at_least(name, v, 0)?;
            }
            (OptionName::SendPrio, OptionValue::Int(v)) => {
                self.send_prio = in_range(name, v, 1, 16)?;
            }
            (OptionName::RecvPrio, OptionValue::Int(v)) => {
                self.recv_prio = in_range(name, v, 1, 16)?;
            }
            (OptionName::Ipv4Only, OptionValue::Int(v)) => {
                self.ipv4_only = in_range(name, v, 0, 1)?;
            }
            (OptionName::SocketName, OptionValue::Str(s)) => self.socket_name = s,
            (OptionName::RecvMaxSize, OptionValue::Int(v)) => {
                self.recv_max_size = at_least(name, v, -1)?;
            }
            (OptionName::MaxTtl, OptionValue::Int(v)) => {
                self.max_ttl = positive(name, v)?;
            }
            (OptionName::Subscribe, OptionValue::Str(prefix)) => {
                let prefix = prefix.into_bytes();
                if !self.subscriptions.contains(&prefix) {
                    self.subscriptions.push(prefix);
                }
            }
            (OptionName::Unsubscribe, OptionValue::Str(prefix)) => {
                let prefix = prefix.into_bytes();
                let before = self.subscriptions.len();
                self.subscriptions.retain(|p| *p != prefix);
                if self.subscriptions.len() == before {
                    return Err(Error::InvalidArgument(
                        "no such subscription".to_string(),
                    ));
                }
            }
            // The kind table above already filtered representation
            // mismatches and read-only names.
            _ => unreachable!("option kind table out of sync"),
        }
        Ok(())
    }

    /// SUB-side delivery filter: true when any subscribed prefix matches.
    #[must_use]
    pub fn subscription_matches(&self, payload: &[u8]) -> bool {
        self.subscriptions.iter().any(|p| payload.starts_with(p))
    }
}

fn positive(name: OptionName, v: i32) -> Result<i32> {
    in_range(name, v, 1, i32::MAX)
}

fn at_least(name: OptionName, v: i32, min: i32) -> Result<i32> {
    in_range(name, v, min, i32::MAX)
}

fn in_range(name: OptionName, v: i32, min: i32, max: i32) -> Result<i32> {
    if v < min || v > max {
        return Err(Error::InvalidArgument(format!(
            "value {v} out of range for option {name:?}"
        )));
    }
    Ok(v)
}
