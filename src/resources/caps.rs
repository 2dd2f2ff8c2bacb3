//! Capability model for cluster users
//!
//! Translates an ordered set of pool grants into the dashboard's capability
//! representations and back. The write shape is a list of `{entity, cap}`
//! pairs; the read shape is a map from entity to a comma-joined expression.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix of an osd grant expression carrying an rbd pool grant
pub const RBD_PROFILE_PREFIX: &str = "profile rbd pool=";

/// A single capability grant as the write payload carries it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub entity: String,
    pub cap: String,
}

/// Derive the capability sequence for a set of pool grants: a fixed
/// mon-read grant first, then one rbd-profile grant per pool in the
/// set's iteration order. Pure; no network.
pub fn derive_capabilities(pools: &IndexSet<String>) -> Vec<Capability> {
    let mut caps = vec![Capability {
        entity: "mon".to_string(),
        cap: "allow r".to_string(),
    }];
    for pool in pools {
        caps.push(Capability {
            entity: "osd".to_string(),
            cap: format!("{}{}", RBD_PROFILE_PREFIX, pool),
        });
    }
    caps
}

/// Recover the pool grants from a read-shape capability map.
///
/// Only `osd` expressions with the rbd-profile prefix are pool grants;
/// the dashboard joins multiple grants for one entity with commas, so
/// the expression is split before matching. Anything else a user holds
/// is ignored, not an error.
pub fn pools_from_caps(caps: &BTreeMap<String, String>) -> IndexSet<String> {
    let mut pools = IndexSet::new();
    if let Some(expr) = caps.get("osd") {
        for grant in expr.split(',') {
            let grant = grant.trim();
            if let Some(pool) = grant.strip_prefix(RBD_PROFILE_PREFIX) {
                pools.insert(pool.to_string());
            }
        }
    }
    pools
}

/// Group a capability sequence into the read shape the API produces:
/// entity -> comma-joined expression
pub fn caps_to_map(caps: &[Capability]) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for cap in caps {
        map.entry(cap.entity.clone())
            .and_modify(|expr| {
                expr.push_str(", ");
                expr.push_str(&cap.cap);
            })
            .or_insert_with(|| cap.cap.clone());
    }
    map
}
