//! Enumerable constant symbol table.
//!
//! Exposes every domain, pattern, option, flag, poll bit and errno constant
//! by name and by value (the `nn_symbol` analog). Lookup works in both
//! directions; values are only unique within a class, so by-value lookup is
//! keyed on `(class, value)`.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Namespace a symbol's value is unique within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolClass {
    Domain,
    Pattern,
    OptionLevel,
    SocketOption,
    PatternOption,
    Flag,
    Poll,
    Errno,
}

/// One exported constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub name: &'static str,
    pub value: i32,
    pub class: SymbolClass,
}

const fn sym(name: &'static str, value: i32, class: SymbolClass) -> Symbol {
    Symbol { name, value, class }
}

/// The full constant table, in stable enumeration order.
pub static SYMBOLS: &[Symbol] = &[
    // Domains
    sym("AF_SP", 1, SymbolClass::Domain),
    sym("AF_SP_RAW", 2, SymbolClass::Domain),
    // Patterns
    sym("NN_PAIR", 16, SymbolClass::Pattern),
    sym("NN_PUB", 32, SymbolClass::Pattern),
    sym("NN_SUB", 33, SymbolClass::Pattern),
    sym("NN_REQ", 48, SymbolClass::Pattern),
    sym("NN_REP", 49, SymbolClass::Pattern),
    sym("NN_PUSH", 80, SymbolClass::Pattern),
    sym("NN_PULL", 81, SymbolClass::Pattern),
    sym("NN_SURVEYOR", 98, SymbolClass::Pattern),
    sym("NN_RESPONDENT", 99, SymbolClass::Pattern),
    sym("NN_BUS", 112, SymbolClass::Pattern),
    // Option levels
    sym("NN_SOL_SOCKET", 0, SymbolClass::OptionLevel),
    // Socket-level options
    sym("NN_LINGER", 1, SymbolClass::SocketOption),
    sym("NN_SNDBUF", 2, SymbolClass::SocketOption),
    sym("NN_RCVBUF", 3, SymbolClass::SocketOption),
    sym("NN_SNDTIMEO", 4, SymbolClass::SocketOption),
    sym("NN_RCVTIMEO", 5, SymbolClass::SocketOption),
    sym("NN_RECONNECT_IVL", 6, SymbolClass::SocketOption),
    sym("NN_RECONNECT_IVL_MAX", 7, SymbolClass::SocketOption),
    sym("NN_SNDPRIO", 8, SymbolClass::SocketOption),
    sym("NN_RCVPRIO", 9, SymbolClass::SocketOption),
    sym("NN_DOMAIN", 12, SymbolClass::SocketOption),
    sym("NN_PROTOCOL", 13, SymbolClass::SocketOption),
    sym("NN_IPV4ONLY", 14, SymbolClass::SocketOption),
    sym("NN_SOCKET_NAME", 15, SymbolClass::SocketOption),
    sym("NN_RCVMAXSIZE", 16, SymbolClass::SocketOption),
    sym("NN_MAXTTL", 17, SymbolClass::SocketOption),
    // SUB-pattern options
    sym("NN_SUB_SUBSCRIBE", 1, SymbolClass::PatternOption),
    sym("NN_SUB_UNSUBSCRIBE", 2, SymbolClass::PatternOption),
    // I/O flags
    sym("NN_DONTWAIT", 1, SymbolClass::Flag),
    // Poll bits
    sym("NN_POLLIN", 1, SymbolClass::Poll),
    sym("NN_POLLOUT", 2, SymbolClass::Poll),
    // Error codes
    sym("EIO", 5, SymbolClass::Errno),
    sym("EBADF", 9, SymbolClass::Errno),
    sym("EAGAIN", 11, SymbolClass::Errno),
    sym("EINVAL", 22, SymbolClass::Errno),
    sym("EMSGSIZE", 90, SymbolClass::Errno),
    sym("EPROTONOSUPPORT", 93, SymbolClass::Errno),
    sym("ENOTSUP", 95, SymbolClass::Errno),
    sym("EADDRINUSE", 98, SymbolClass::Errno),
    sym("ETIMEDOUT", 110, SymbolClass::Errno),
    sym("ECONNREFUSED", 111, SymbolClass::Errno),
    sym("ETERM", crate::error::codes::ETERM, SymbolClass::Errno),
    sym("EFSM", crate::error::codes::EFSM, SymbolClass::Errno),
];

static BY_NAME: Lazy<HashMap<&'static str, &'static Symbol>> =
    Lazy::new(|| SYMBOLS.iter().map(|s| (s.name, s)).collect());

static BY_VALUE: Lazy<HashMap<(SymbolClass, i32), &'static Symbol>> =
    Lazy::new(|| SYMBOLS.iter().map(|s| ((s.class, s.value), s)).collect());

/// Symbol at enumeration index `i`, or `None` past the end.
#[must_use]
pub fn symbol(i: usize) -> Option<&'static Symbol> {
    SYMBOLS.get(i)
}

/// Look a symbol up by its exported name.
#[must_use]
pub fn by_name(name: &str) -> Option<&'static Symbol> {
    BY_NAME.get(name).copied()
}

/// Look a symbol up by class and value.
#[must_use]
pub fn by_value(class: SymbolClass, value: i32) -> Option<&'static Symbol> {
    BY_VALUE.get(&(class, value)).copied()
}
