//! Contracts the storage collaborator implements.
//!
//! The crypto modules never persist anything; everything durable (file
//! records, grants, member identities, audit entries) lives behind the
//! provider traits defined here. Think of them as letting any data store
//! back the ledger: sqlite, a hash map, a remote service.
//!
//! Authorization is three rules, evaluated in [`authz`] as pure functions:
//! creating a child needs a grant on the parent, touching a file needs a
//! grant on that exact file, sharing/revoking/re-keying needs ownership.
//! A grant's existence is the *only* proof of access.

pub mod authz;
mod provider;

pub use provider::{
    AccessGrant, AccessLedger, AuditEntry, AuditLog, FileStore, LedgerError, MemberDirectory,
    MemberRecord,
};
