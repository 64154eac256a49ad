//! mibget-core: symbol table, resolver and SNMP codec
//!
//! This crate resolves symbolic names to OIDs against fragments loaded into a
//! [`model::SymbolTable`] and encodes/decodes the SNMPv1/v2c messages a GET
//! transaction exchanges. It is `no_std` compatible and IO-free; sockets,
//! timers and files live in `mibget-std`.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod ber;
pub mod builtins;
pub mod model;
pub mod pdu;
pub mod resolver;
pub mod value;

pub use model::{Oid, SymbolTable};
pub use pdu::{ErrorStatus, Message, Pdu, VarBind, Version};
pub use resolver::{Query, ResolveError, Resolver};
pub use value::Value;
