//! Integration tests: built-in fragments through resolution to the wire.

use mibget_core::builtins::{lookup_builtin, DEFAULT_FRAGMENTS};
use mibget_core::model::{FragmentDef, Oid, SymbolKind, SymbolTable};
use mibget_core::pdu::{Message, Pdu, Version};
use mibget_core::resolver::{Query, ResolveError, Resolver};

fn default_table() -> SymbolTable {
    let mut table = SymbolTable::new();
    for name in DEFAULT_FRAGMENTS {
        let def = lookup_builtin(name).unwrap().to_def();
        table.load(&def).unwrap();
    }
    table
}

fn oid(s: &str) -> Oid {
    Oid::parse(s).unwrap()
}

#[test]
fn test_default_fragments_resolve_common_objects() {
    let table = default_table();
    let resolver = Resolver::new(&table);

    let cases = [
        ("sysDescr", "1.3.6.1.2.1.1.1.0"),
        ("sysUpTime", "1.3.6.1.2.1.1.3.0"),
        ("sysName", "1.3.6.1.2.1.1.5.0"),
        ("hrSystemUptime", "1.3.6.1.2.1.25.1.1.0"),
        ("hrMemorySize", "1.3.6.1.2.1.25.2.2.0"),
    ];
    for (name, expected) in cases {
        let resolved = resolver.resolve(&Query::Name(name.into())).unwrap();
        assert_eq!(resolved.to_dotted(), expected, "{name}");
    }
}

#[test]
fn test_numeric_normalization() {
    let table = default_table();
    let resolver = Resolver::new(&table);

    let resolved = resolver
        .resolve(&Query::Numeric("1.3.6.1.2.1.1.1".into()))
        .unwrap();
    assert_eq!(resolved, oid("1.3.6.1.2.1.1.1.0"));

    let resolved = resolver
        .resolve(&Query::Numeric("1.3.6.1.2.1.1.1.0".into()))
        .unwrap();
    assert_eq!(resolved, oid("1.3.6.1.2.1.1.1.0"));
}

#[test]
fn test_unknown_name_is_not_guessed() {
    let table = default_table();
    let err = Resolver::new(&table)
        .resolve(&Query::Name("sysDescrr".into()))
        .unwrap_err();
    assert!(matches!(err, ResolveError::UnknownSymbol { ref name } if name == "sysDescrr"));
}

#[test]
fn test_vendor_fragment_after_defaults() {
    let mut table = default_table();
    let vendor = FragmentDef::new("ACME-MIB")
        .with("acmeUptime", oid("1.3.6.1.4.1.4242.1.1"), SymbolKind::Scalar)
        .with("sysDescr", oid("1.3.6.1.4.1.4242.1.2"), SymbolKind::Scalar);
    table.load(&vendor).unwrap();

    // The standard definition was loaded first and keeps the name.
    let sys_descr = table.find_by_name("sysDescr").unwrap();
    assert_eq!(sys_descr.fragment_name(), "SNMPv2-MIB");

    // The vendor copy stays reachable by OID and by qualified name.
    let shadowed = table.find_by_oid(&oid("1.3.6.1.4.1.4242.1.2")).unwrap();
    assert_eq!(shadowed.fragment_name(), "ACME-MIB");
    assert_eq!(
        table.find_qualified("ACME-MIB", "sysDescr").unwrap().oid(),
        oid("1.3.6.1.4.1.4242.1.2")
    );

    let enclosing = table.find_enclosing(&oid("1.3.6.1.4.1.4242.1.1.0")).unwrap();
    assert_eq!(enclosing.name(), "acmeUptime");
}

#[test]
fn test_resolved_oid_builds_a_wire_request() {
    let table = default_table();
    let oid = Resolver::new(&table)
        .resolve(&Query::Name("sysDescr".into()))
        .unwrap();

    let request = Message::new(Version::V1, "public", Pdu::get_request(1, oid.clone()));
    let bytes = request.encode().unwrap();

    // net-snmp: snmpget -v1 -c public host SNMPv2-MIB::sysDescr.0
    assert_eq!(
        bytes,
        [
            0x30, 0x26, 0x02, 0x01, 0x00, 0x04, 0x06, b'p', b'u', b'b', b'l', b'i', b'c', 0xA0,
            0x19, 0x02, 0x01, 0x01, 0x02, 0x01, 0x00, 0x02, 0x01, 0x00, 0x30, 0x0E, 0x30, 0x0C,
            0x06, 0x08, 0x2B, 0x06, 0x01, 0x02, 0x01, 0x01, 0x01, 0x00, 0x05, 0x00,
        ]
    );
    assert_eq!(Message::decode(&bytes).unwrap(), request);
}
