//! Cuentas client - offline-first orchestration over the cuentas engine.
//!
//! This crate owns everything the deterministic engine refuses to know
//! about: wall-clock time, identifier minting, the filesystem, the network
//! contract, and configuration. It provides:
//!
//! - [`Config`] - environment-driven configuration, including the
//!   remote-available capability flag
//! - [`FileStorage`] - the local persistence adapter (one JSON file per
//!   fixed key under a data directory)
//! - [`RemoteStore`] - the async contract of the hosted document store,
//!   with [`MemoryRemote`] as the in-process implementation used by tests
//!   and local development
//! - [`SyncEngine`] - the push / pull / merge synchronization pass
//! - [`Ledger`] - the application facade: mutations, CSV import/export,
//!   browsing, and sync, persisting after every change

pub mod config;
pub mod error;
pub mod ledger;
pub mod persist;
pub mod remote;
pub mod sync;

pub use config::{Config, ConfigError};
pub use error::{Result, SyncError};
pub use ledger::{Ledger, UuidGen};
pub use persist::FileStorage;
pub use remote::{MemoryRemote, RemoteError, RemoteStore};
pub use sync::{SyncEngine, SyncReport, SyncState, TOMBSTONE_RETENTION_MS};
