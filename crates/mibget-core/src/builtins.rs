//! Built-in fragments.
//!
//! The base SMI fragments are always needed to anchor well-known names, and a
//! tool that can fetch `sysDescr` without any files on disk is convenient.
//! A fragment file with the same name on disk takes precedence over these.
//!
//! # Built-in Fragments
//!
//! - **SNMPv2-SMI**: OID roots (iso, internet, enterprises, mib-2, ...)
//! - **SNMPv2-TC**: textual conventions only, so it binds no OIDs
//! - **SNMPv2-MIB**: the `system` and `snmp` groups plus the standard traps
//! - **HOST-RESOURCES-MIB**: the `hrSystem` group and `hrMemorySize`

use crate::model::{FragmentDef, Oid, SymbolKind};

/// One symbol of a built-in fragment.
#[derive(Clone, Copy, Debug)]
pub struct BuiltinSymbol {
    /// Symbol name.
    pub name: &'static str,
    /// Absolute OID.
    pub oid: &'static [u32],
    /// Classification.
    pub kind: SymbolKind,
}

/// A built-in fragment.
#[derive(Clone, Copy, Debug)]
pub struct BuiltinFragment {
    /// Fragment name.
    pub name: &'static str,
    /// Symbols in definition order.
    pub symbols: &'static [BuiltinSymbol],
}

impl BuiltinFragment {
    /// Materialize as a loadable fragment definition.
    #[must_use]
    pub fn to_def(&self) -> FragmentDef {
        let mut def = FragmentDef::new(self.name);
        for sym in self.symbols {
            def.push(sym.name, Oid::from_slice(sym.oid), sym.kind);
        }
        def
    }
}

/// Fragments loaded when none are configured, in load order.
pub const DEFAULT_FRAGMENTS: &[&str] = &[
    "SNMPv2-SMI",
    "SNMPv2-TC",
    "SNMPv2-MIB",
    "HOST-RESOURCES-MIB",
];

macro_rules! sym {
    ($name:literal, [$($arc:literal),+], $kind:ident) => {
        BuiltinSymbol {
            name: $name,
            oid: &[$($arc),+],
            kind: SymbolKind::$kind,
        }
    };
}

static SNMPV2_SMI: &[BuiltinSymbol] = &[
    sym!("iso", [1], Node),
    sym!("org", [1, 3], Node),
    sym!("dod", [1, 3, 6], Node),
    sym!("internet", [1, 3, 6, 1], Node),
    sym!("directory", [1, 3, 6, 1, 1], Node),
    sym!("mgmt", [1, 3, 6, 1, 2], Node),
    sym!("mib-2", [1, 3, 6, 1, 2, 1], Node),
    sym!("transmission", [1, 3, 6, 1, 2, 1, 10], Node),
    sym!("experimental", [1, 3, 6, 1, 3], Node),
    sym!("private", [1, 3, 6, 1, 4], Node),
    sym!("enterprises", [1, 3, 6, 1, 4, 1], Node),
    sym!("security", [1, 3, 6, 1, 5], Node),
    sym!("snmpV2", [1, 3, 6, 1, 6], Node),
    sym!("snmpDomains", [1, 3, 6, 1, 6, 1], Node),
    sym!("snmpProxys", [1, 3, 6, 1, 6, 2], Node),
    sym!("snmpModules", [1, 3, 6, 1, 6, 3], Node),
    // zeroDotZero is its own root, not under iso
    sym!("zeroDotZero", [0, 0], Node),
];

static SNMPV2_MIB: &[BuiltinSymbol] = &[
    sym!("system", [1, 3, 6, 1, 2, 1, 1], Node),
    sym!("sysDescr", [1, 3, 6, 1, 2, 1, 1, 1], Scalar),
    sym!("sysObjectID", [1, 3, 6, 1, 2, 1, 1, 2], Scalar),
    sym!("sysUpTime", [1, 3, 6, 1, 2, 1, 1, 3], Scalar),
    sym!("sysContact", [1, 3, 6, 1, 2, 1, 1, 4], Scalar),
    sym!("sysName", [1, 3, 6, 1, 2, 1, 1, 5], Scalar),
    sym!("sysLocation", [1, 3, 6, 1, 2, 1, 1, 6], Scalar),
    sym!("sysServices", [1, 3, 6, 1, 2, 1, 1, 7], Scalar),
    sym!("sysORLastChange", [1, 3, 6, 1, 2, 1, 1, 8], Scalar),
    sym!("sysORTable", [1, 3, 6, 1, 2, 1, 1, 9], Table),
    sym!("sysOREntry", [1, 3, 6, 1, 2, 1, 1, 9, 1], Row),
    sym!("sysORIndex", [1, 3, 6, 1, 2, 1, 1, 9, 1, 1], Column),
    sym!("sysORID", [1, 3, 6, 1, 2, 1, 1, 9, 1, 2], Column),
    sym!("sysORDescr", [1, 3, 6, 1, 2, 1, 1, 9, 1, 3], Column),
    sym!("sysORUpTime", [1, 3, 6, 1, 2, 1, 1, 9, 1, 4], Column),
    sym!("snmp", [1, 3, 6, 1, 2, 1, 11], Node),
    sym!("snmpInPkts", [1, 3, 6, 1, 2, 1, 11, 1], Scalar),
    sym!("snmpOutPkts", [1, 3, 6, 1, 2, 1, 11, 2], Scalar),
    sym!("snmpInBadVersions", [1, 3, 6, 1, 2, 1, 11, 3], Scalar),
    sym!("snmpInBadCommunityNames", [1, 3, 6, 1, 2, 1, 11, 4], Scalar),
    sym!("snmpInBadCommunityUses", [1, 3, 6, 1, 2, 1, 11, 5], Scalar),
    sym!("snmpInASNParseErrs", [1, 3, 6, 1, 2, 1, 11, 6], Scalar),
    sym!("snmpInTooBigs", [1, 3, 6, 1, 2, 1, 11, 8], Scalar),
    sym!("snmpInNoSuchNames", [1, 3, 6, 1, 2, 1, 11, 9], Scalar),
    sym!("snmpInBadValues", [1, 3, 6, 1, 2, 1, 11, 10], Scalar),
    sym!("snmpInReadOnlys", [1, 3, 6, 1, 2, 1, 11, 11], Scalar),
    sym!("snmpInGenErrs", [1, 3, 6, 1, 2, 1, 11, 12], Scalar),
    sym!("snmpInTotalReqVars", [1, 3, 6, 1, 2, 1, 11, 13], Scalar),
    sym!("snmpInTotalSetVars", [1, 3, 6, 1, 2, 1, 11, 14], Scalar),
    sym!("snmpInGetRequests", [1, 3, 6, 1, 2, 1, 11, 15], Scalar),
    sym!("snmpInGetNexts", [1, 3, 6, 1, 2, 1, 11, 16], Scalar),
    sym!("snmpInSetRequests", [1, 3, 6, 1, 2, 1, 11, 17], Scalar),
    sym!("snmpInGetResponses", [1, 3, 6, 1, 2, 1, 11, 18], Scalar),
    sym!("snmpInTraps", [1, 3, 6, 1, 2, 1, 11, 19], Scalar),
    sym!("snmpOutTooBigs", [1, 3, 6, 1, 2, 1, 11, 20], Scalar),
    sym!("snmpOutNoSuchNames", [1, 3, 6, 1, 2, 1, 11, 21], Scalar),
    sym!("snmpOutBadValues", [1, 3, 6, 1, 2, 1, 11, 22], Scalar),
    sym!("snmpOutGenErrs", [1, 3, 6, 1, 2, 1, 11, 24], Scalar),
    sym!("snmpOutGetRequests", [1, 3, 6, 1, 2, 1, 11, 25], Scalar),
    sym!("snmpOutGetNexts", [1, 3, 6, 1, 2, 1, 11, 26], Scalar),
    sym!("snmpOutSetRequests", [1, 3, 6, 1, 2, 1, 11, 27], Scalar),
    sym!("snmpOutGetResponses", [1, 3, 6, 1, 2, 1, 11, 28], Scalar),
    sym!("snmpOutTraps", [1, 3, 6, 1, 2, 1, 11, 29], Scalar),
    sym!("snmpEnableAuthenTraps", [1, 3, 6, 1, 2, 1, 11, 30], Scalar),
    sym!("snmpSilentDrops", [1, 3, 6, 1, 2, 1, 11, 31], Scalar),
    sym!("snmpProxyDrops", [1, 3, 6, 1, 2, 1, 11, 32], Scalar),
    sym!("snmpMIB", [1, 3, 6, 1, 6, 3, 1], Node),
    sym!("snmpMIBObjects", [1, 3, 6, 1, 6, 3, 1, 1], Node),
    sym!("snmpTraps", [1, 3, 6, 1, 6, 3, 1, 1, 5], Node),
    sym!("coldStart", [1, 3, 6, 1, 6, 3, 1, 1, 5, 1], Notification),
    sym!("warmStart", [1, 3, 6, 1, 6, 3, 1, 1, 5, 2], Notification),
    sym!("authenticationFailure", [1, 3, 6, 1, 6, 3, 1, 1, 5, 5], Notification),
    sym!("snmpMIBConformance", [1, 3, 6, 1, 6, 3, 1, 2], Node),
    sym!("snmpMIBGroups", [1, 3, 6, 1, 6, 3, 1, 2, 2], Node),
    sym!("snmpGroup", [1, 3, 6, 1, 6, 3, 1, 2, 2, 8], Group),
    sym!("systemGroup", [1, 3, 6, 1, 6, 3, 1, 2, 2, 6], Group),
];

static HOST_RESOURCES_MIB: &[BuiltinSymbol] = &[
    sym!("host", [1, 3, 6, 1, 2, 1, 25], Node),
    sym!("hrSystem", [1, 3, 6, 1, 2, 1, 25, 1], Node),
    sym!("hrSystemUptime", [1, 3, 6, 1, 2, 1, 25, 1, 1], Scalar),
    sym!("hrSystemDate", [1, 3, 6, 1, 2, 1, 25, 1, 2], Scalar),
    sym!("hrSystemInitialLoadDevice", [1, 3, 6, 1, 2, 1, 25, 1, 3], Scalar),
    sym!("hrSystemInitialLoadParameters", [1, 3, 6, 1, 2, 1, 25, 1, 4], Scalar),
    sym!("hrSystemNumUsers", [1, 3, 6, 1, 2, 1, 25, 1, 5], Scalar),
    sym!("hrSystemProcesses", [1, 3, 6, 1, 2, 1, 25, 1, 6], Scalar),
    sym!("hrSystemMaxProcesses", [1, 3, 6, 1, 2, 1, 25, 1, 7], Scalar),
    sym!("hrStorage", [1, 3, 6, 1, 2, 1, 25, 2], Node),
    sym!("hrMemorySize", [1, 3, 6, 1, 2, 1, 25, 2, 2], Scalar),
];

/// All built-in fragments.
pub static BUILTIN_FRAGMENTS: &[BuiltinFragment] = &[
    BuiltinFragment {
        name: "SNMPv2-SMI",
        symbols: SNMPV2_SMI,
    },
    BuiltinFragment {
        name: "SNMPv2-TC",
        symbols: &[],
    },
    BuiltinFragment {
        name: "SNMPv2-MIB",
        symbols: SNMPV2_MIB,
    },
    BuiltinFragment {
        name: "HOST-RESOURCES-MIB",
        symbols: HOST_RESOURCES_MIB,
    },
];

/// Look up a built-in fragment by name.
#[must_use]
pub fn lookup_builtin(name: &str) -> Option<&'static BuiltinFragment> {
    BUILTIN_FRAGMENTS.iter().find(|f| f.name == name)
}

/// Check if a fragment name has a built-in definition.
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    lookup_builtin(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SymbolTable;

    #[test]
    fn test_defaults_are_builtin() {
        for name in DEFAULT_FRAGMENTS {
            assert!(is_builtin(name), "{name}");
        }
        assert!(!is_builtin("IF-MIB"));
    }

    #[test]
    fn test_tc_binds_nothing() {
        assert!(lookup_builtin("SNMPv2-TC").unwrap().to_def().symbols.is_empty());
    }

    #[test]
    fn test_no_duplicate_names_within_fragment() {
        for fragment in BUILTIN_FRAGMENTS {
            let mut names: alloc::vec::Vec<_> = fragment.symbols.iter().map(|s| s.name).collect();
            names.sort_unstable();
            let before = names.len();
            names.dedup();
            assert_eq!(before, names.len(), "{}", fragment.name);
        }
    }

    #[test]
    fn test_all_instances_encodable() {
        for fragment in BUILTIN_FRAGMENTS {
            for sym in fragment.symbols {
                let oid = crate::resolver::normalize_instance(Oid::from_slice(sym.oid));
                assert!(oid.is_ber_encodable(), "{}", sym.name);
            }
        }
    }

    #[test]
    fn test_default_table() {
        let mut table = SymbolTable::new();
        for name in DEFAULT_FRAGMENTS {
            table.load(&lookup_builtin(name).unwrap().to_def()).unwrap();
        }
        assert_eq!(table.fragment_count(), 4);

        let sym = table.find_by_name("sysDescr").unwrap();
        assert_eq!(sym.oid().to_dotted(), "1.3.6.1.2.1.1.1");
        assert_eq!(sym.kind(), SymbolKind::Scalar);
        assert_eq!(sym.fragment_name(), "SNMPv2-MIB");

        let sym = table.find_by_name("hrMemorySize").unwrap();
        assert_eq!(sym.oid().to_dotted(), "1.3.6.1.2.1.25.2.2");

        let sym = table.find_by_name("zeroDotZero").unwrap();
        assert_eq!(sym.oid().to_dotted(), "0.0");
    }
}
