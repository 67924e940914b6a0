//! Option accessor tests over live sockets: the get-side type table, the
//! set-side representation rule, and pattern-level scoping.

use xemsg::{
    Domain, Error, Flags, Level, OptionName, OptionValue, Pattern, Socket, ValueKind,
};

#[test]
fn get_type_table_across_the_full_enumerated_set() {
    let s = Socket::new(Domain::Sp, Pattern::Sub).unwrap();
    for name in OptionName::ALL {
        let level = name.level();
        match name.read_kind() {
            None => {
                // Write-only options cannot be read.
                assert!(s.get_option(level, name).is_err(), "{name:?}");
            }
            Some(ValueKind::Str) => {
                assert_eq!(name, OptionName::SocketName);
                let v = s.get_option(level, name).unwrap();
                assert!(v.as_str().is_some(), "{name:?} must read as a string");
            }
            Some(ValueKind::Int) => {
                let v = s.get_option(level, name).unwrap();
                assert!(v.as_int().is_some(), "{name:?} must read as an integer");
            }
        }
    }
}

#[test]
fn domain_and_protocol_reflect_the_socket() {
    let s = Socket::new(Domain::Sp, Pattern::Surveyor).unwrap();
    assert_eq!(
        s.get_option(Level::Socket, OptionName::Domain).unwrap(),
        OptionValue::Int(Domain::Sp.value())
    );
    assert_eq!(
        s.get_option(Level::Socket, OptionName::Protocol).unwrap(),
        OptionValue::Int(Pattern::Surveyor.value())
    );
    // Both are read-only.
    assert!(s
        .set_option(Level::Socket, OptionName::Protocol, 1)
        .is_err());
}

#[test]
fn set_takes_the_representation_from_the_supplied_value() {
    let s = Socket::new(Domain::Sp, Pattern::Pair).unwrap();

    // Integer value for an integer option.
    s.set_option(Level::Socket, OptionName::Linger, 250).unwrap();
    assert_eq!(
        s.get_option(Level::Socket, OptionName::Linger).unwrap(),
        OptionValue::Int(250)
    );

    // String value for the string option.
    s.set_option(Level::Socket, OptionName::SocketName, "frontend")
        .unwrap();
    assert_eq!(
        s.get_option(Level::Socket, OptionName::SocketName).unwrap(),
        OptionValue::Str("frontend".to_string())
    );

    // A string supplied for a known-integer option is rejected locally.
    let err = s
        .set_option(Level::Socket, OptionName::Linger, "250")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(
        s.get_option(Level::Socket, OptionName::Linger).unwrap(),
        OptionValue::Int(250)
    );
}

#[test]
fn socket_name_length_is_whatever_was_stored() {
    let s = Socket::new(Domain::Sp, Pattern::Pair).unwrap();
    let long = "a-rather-long-diagnostic-socket-name-with-no-fixed-size-limit";
    s.set_option(Level::Socket, OptionName::SocketName, long)
        .unwrap();
    let v = s.get_option(Level::Socket, OptionName::SocketName).unwrap();
    assert_eq!(v.as_str(), Some(long));
}

#[test]
fn pattern_level_options_are_scoped_to_the_socket_pattern() {
    let sub = Socket::new(Domain::Sp, Pattern::Sub).unwrap();
    sub.set_option(Level::Pattern(Pattern::Sub), OptionName::Subscribe, "topic.")
        .unwrap();

    // A PAIR socket has no SUB-level options.
    let pair = Socket::new(Domain::Sp, Pattern::Pair).unwrap();
    assert!(pair
        .set_option(Level::Pattern(Pattern::Sub), OptionName::Subscribe, "topic.")
        .is_err());
}

#[test]
fn subscriptions_change_delivery() {
    let publisher = Socket::new(Domain::Sp, Pattern::Pub).unwrap();
    let subscriber = Socket::new(Domain::Sp, Pattern::Sub).unwrap();
    publisher.bind("inproc://options-sub-delivery").unwrap();
    subscriber.connect("inproc://options-sub-delivery").unwrap();
    let level = Level::Pattern(Pattern::Sub);

    subscriber
        .set_option(level, OptionName::Subscribe, "alpha.")
        .unwrap();
    publisher.send("alpha.one", Flags::NONE).unwrap();
    publisher.send("beta.one", Flags::NONE).unwrap();
    assert_eq!(&subscriber.recv(Flags::NONE).unwrap()[..], b"alpha.one");
    assert!(subscriber.recv(Flags::DONTWAIT).unwrap_err().is_would_block());

    subscriber
        .set_option(level, OptionName::Unsubscribe, "alpha.")
        .unwrap();
    publisher.send("alpha.two", Flags::NONE).unwrap();
    assert!(subscriber.recv(Flags::DONTWAIT).unwrap_err().is_would_block());
}

#[test]
fn timeout_options_accept_the_infinite_sentinel() {
    let s = Socket::new(Domain::Sp, Pattern::Pull).unwrap();
    s.set_option(Level::Socket, OptionName::RecvTimeout, -1)
        .unwrap();
    assert_eq!(
        s.get_option(Level::Socket, OptionName::RecvTimeout).unwrap(),
        OptionValue::Int(-1)
    );
    assert!(s
        .set_option(Level::Socket, OptionName::RecvTimeout, -2)
        .is_err());
}
