//! Ceph State Reconciler
//!
//! Reconciles declaratively described Ceph administrative objects
//! (placement pools, CRUSH rules, cluster users) against the Ceph
//! Dashboard REST API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Apply Driver                          │
//! │   create missing · update mutable drift · replace immutable  │
//! ├──────────────────────────────────────────────────────────────┤
//! │          Reconciler<C>  (one per resource kind)              │
//! │   ┌────────────┐   ┌────────────────┐   ┌────────────────┐   │
//! │   │ PoolCodec  │   │ CrushRuleCodec │   │   UserCodec    │   │
//! │   └────────────┘   └────────────────┘   └───────┬────────┘   │
//! │                                          keyring extractor   │
//! ├──────────────────────────────────────────────────────────────┤
//! │        Session (bearer token, versioned accept header)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The dashboard's write and read payloads are not symmetric: each
//! [`reconcile::WireCodec`] implementation enumerates its resource kind's
//! field renamings and type changes explicitly. The reconciler core never
//! deletes on its own: immutable drift is reported as a first-class
//! [`reconcile::UpdateOutcome::ReplaceRequired`] outcome, and only the
//! [`reconcile::apply`] driver turns it into delete-then-create.
//!
//! # Modules
//!
//! - [`session`]: authenticated dashboard session over a transport seam
//! - [`resources`]: canonical records, wire codecs, capability model,
//!   keyring extraction
//! - [`reconcile`]: the generic reconciler and the apply/destroy driver
//! - [`config`]: desired-state file model
//! - [`error`]: error types and classification

pub mod config;
pub mod error;
pub mod reconcile;
pub mod resources;
pub mod session;

// Re-export commonly used types
pub use error::{Error, Result};

pub use session::{Session, SessionConfig, Transport};

pub use reconcile::{apply, Drift, ReadStyle, Reconciler, UpdateOutcome, WireCodec};

pub use resources::{
    caps, cluster, crush_rule, derive_capabilities, export_key, extract_key, keyring, pool,
    pools_from_caps, user, Capability, CrushRule, CrushRuleCodec, Monitor, Pool, PoolCodec,
    QosLimits, User, UserCodec, UserReconciler,
};

pub use config::DesiredState;

pub use reconcile::apply::{Action, ApplyReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
