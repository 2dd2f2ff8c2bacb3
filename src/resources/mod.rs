//! Canonical resource records and per-kind wire codecs
//!
//! Each administrative object kind gets a canonical in-memory record,
//! independent of wire format, plus a [`crate::reconcile::WireCodec`]
//! implementation enumerating the write/read asymmetries of its endpoints.

pub mod caps;
pub mod cluster;
pub mod crush_rule;
pub mod keyring;
pub mod pool;
pub mod user;

pub use caps::{derive_capabilities, pools_from_caps, Capability};
pub use cluster::{cluster_fsid, monitors, Monitor};
pub use crush_rule::{CrushRule, CrushRuleCodec};
pub use keyring::extract_key;
pub use pool::{Pool, PoolCodec, QosLimits};
pub use user::{export_key, User, UserCodec, UserReconciler};
