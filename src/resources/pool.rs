//! Pool resource and wire codec
//!
//! The dashboard's pool endpoints are asymmetric: the create payload names
//! the identity `pool` while the read payload names it `pool_name`, the
//! autoscale flag is an `"on"`/`"off"` string on the wire, and the
//! application-tag set is a list on write but a keyed map on read. Each
//! divergence is handled explicitly below.

use crate::error::{Error, Result};
use crate::reconcile::{Drift, ReadStyle, WireCodec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

// =============================================================================
// Canonical Record
// =============================================================================

/// RBD QoS limits attached to a pool. Every limit is optional so that
/// "not set" and "set to zero" stay distinguishable, as the API
/// distinguishes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QosLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bps_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iops_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_bps_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_iops_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_bps_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_iops_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bps_burst: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iops_burst: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_bps_burst: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_iops_burst: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_bps_burst: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_iops_burst: Option<u64>,
}

impl QosLimits {
    pub fn is_empty(&self) -> bool {
        *self == QosLimits::default()
    }
}

/// Canonical pool record. `name` is the immutable identity; rename is
/// unsupported and must be modeled as replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub name: String,
    /// Pool data-protection scheme; immutable post-creation
    #[serde(default = "default_pool_type")]
    pub pool_type: String,
    /// Placement group count
    #[serde(default = "default_pg_num")]
    pub pg_num: u32,
    /// Replication size
    #[serde(default = "default_size")]
    pub size: u32,
    /// Placement-group autoscaler on/off
    #[serde(default = "default_true")]
    pub pg_autoscale: bool,
    /// CRUSH rule governing placement; immutable post-creation
    #[serde(default = "default_crush_rule")]
    pub crush_rule: String,
    /// Byte quota, 0 = unlimited
    #[serde(default)]
    pub quota_max_bytes: u64,
    /// Application tags (rbd, cephfs, rgw)
    #[serde(default = "default_applications")]
    pub applications: BTreeSet<String>,
    /// Enable RBD mirroring; write-only, not reported by GET
    #[serde(default)]
    pub rbd_mirroring: bool,
    /// RBD QoS limits; write-only, not reported by GET
    #[serde(default, skip_serializing_if = "QosLimits::is_empty")]
    pub qos: QosLimits,
    /// Numeric pool id assigned by the cluster; observational only
    #[serde(default, skip_serializing)]
    pub pool_id: Option<i64>,
}

impl Default for Pool {
    fn default() -> Self {
        Self {
            name: String::new(),
            pool_type: default_pool_type(),
            pg_num: default_pg_num(),
            size: default_size(),
            pg_autoscale: true,
            crush_rule: default_crush_rule(),
            quota_max_bytes: 0,
            applications: default_applications(),
            rbd_mirroring: false,
            qos: QosLimits::default(),
            pool_id: None,
        }
    }
}

fn default_pool_type() -> String {
    "replicated".to_string()
}

fn default_pg_num() -> u32 {
    16
}

fn default_size() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_crush_rule() -> String {
    "replicated_rule".to_string()
}

fn default_applications() -> BTreeSet<String> {
    BTreeSet::from(["rbd".to_string()])
}

fn autoscale_mode(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

// =============================================================================
// Wire Shapes
// =============================================================================

/// POST payload: identity travels as `pool`, the rule as `rule_name`
#[derive(Debug, Serialize)]
struct PoolCreatePayload<'a> {
    pool: &'a str,
    pool_type: &'a str,
    pg_autoscale_mode: &'static str,
    pg_num: u32,
    size: u32,
    rule_name: &'a str,
    quota_max_bytes: u64,
    application_metadata: Vec<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    rbd_mirroring: bool,
    #[serde(skip_serializing_if = "QosWirePayload::is_empty")]
    configuration: QosWirePayload,
}

/// QoS block as the write payload nests it, `rbd_qos_*` field names
#[derive(Debug, Serialize)]
struct QosWirePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    rbd_qos_bps_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rbd_qos_iops_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rbd_qos_read_bps_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rbd_qos_read_iops_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rbd_qos_write_bps_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rbd_qos_write_iops_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rbd_qos_bps_burst: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rbd_qos_iops_burst: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rbd_qos_read_bps_burst: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rbd_qos_read_iops_burst: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rbd_qos_write_bps_burst: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rbd_qos_write_iops_burst: Option<u64>,
}

impl QosWirePayload {
    fn is_empty(&self) -> bool {
        self.rbd_qos_bps_limit.is_none()
            && self.rbd_qos_iops_limit.is_none()
            && self.rbd_qos_read_bps_limit.is_none()
            && self.rbd_qos_read_iops_limit.is_none()
            && self.rbd_qos_write_bps_limit.is_none()
            && self.rbd_qos_write_iops_limit.is_none()
            && self.rbd_qos_bps_burst.is_none()
            && self.rbd_qos_iops_burst.is_none()
            && self.rbd_qos_read_bps_burst.is_none()
            && self.rbd_qos_read_iops_burst.is_none()
            && self.rbd_qos_write_bps_burst.is_none()
            && self.rbd_qos_write_iops_burst.is_none()
    }
}

impl From<&QosLimits> for QosWirePayload {
    fn from(qos: &QosLimits) -> Self {
        Self {
            rbd_qos_bps_limit: qos.bps_limit,
            rbd_qos_iops_limit: qos.iops_limit,
            rbd_qos_read_bps_limit: qos.read_bps_limit,
            rbd_qos_read_iops_limit: qos.read_iops_limit,
            rbd_qos_write_bps_limit: qos.write_bps_limit,
            rbd_qos_write_iops_limit: qos.write_iops_limit,
            rbd_qos_bps_burst: qos.bps_burst,
            rbd_qos_iops_burst: qos.iops_burst,
            rbd_qos_read_bps_burst: qos.read_bps_burst,
            rbd_qos_read_iops_burst: qos.read_iops_burst,
            rbd_qos_write_bps_burst: qos.write_bps_burst,
            rbd_qos_write_iops_burst: qos.write_iops_burst,
        }
    }
}

/// PUT payload: only the fields the API accepts as mutable
#[derive(Debug, Serialize)]
struct PoolUpdatePayload<'a> {
    pg_autoscale_mode: &'static str,
    pg_num: u32,
    size: u32,
    quota_max_bytes: u64,
    application_metadata: Vec<&'a str>,
}

/// GET payload: different field names and, for the application tags,
/// a different physical type than the write side
#[derive(Debug, Deserialize)]
struct PoolReadPayload {
    /// Numeric pool id; the read side reuses the name `pool` for it
    #[serde(default)]
    pool: Option<i64>,
    pool_name: String,
    #[serde(rename = "type", default)]
    pool_type: Option<String>,
    #[serde(default)]
    pg_autoscale_mode: Option<String>,
    #[serde(default)]
    pg_num: Option<u32>,
    #[serde(default)]
    size: Option<u32>,
    #[serde(default)]
    crush_rule: Option<String>,
    #[serde(default)]
    quota_max_bytes: Option<u64>,
    #[serde(default)]
    application_metadata: Option<AppMetadata>,
}

/// The tag set arrives as a plain list on older responses and as a map
/// keyed by application on newer ones
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AppMetadata {
    List(Vec<String>),
    Map(std::collections::BTreeMap<String, Value>),
}

impl AppMetadata {
    fn into_set(self) -> BTreeSet<String> {
        match self {
            AppMetadata::List(tags) => tags.into_iter().collect(),
            AppMetadata::Map(tags) => tags.into_keys().collect(),
        }
    }
}

// =============================================================================
// Codec
// =============================================================================

/// Wire codec for pools
pub struct PoolCodec;

impl WireCodec for PoolCodec {
    type Resource = Pool;

    const KIND: &'static str = "pool";

    fn identity(resource: &Pool) -> &str {
        &resource.name
    }

    fn collection_path() -> &'static str {
        "/api/pool"
    }

    fn read_style() -> ReadStyle {
        ReadStyle::Keyed
    }

    fn encode_create(pool: &Pool) -> Value {
        serde_json::to_value(PoolCreatePayload {
            pool: &pool.name,
            pool_type: &pool.pool_type,
            pg_autoscale_mode: autoscale_mode(pool.pg_autoscale),
            pg_num: pool.pg_num,
            size: pool.size,
            rule_name: &pool.crush_rule,
            quota_max_bytes: pool.quota_max_bytes,
            application_metadata: pool.applications.iter().map(String::as_str).collect(),
            rbd_mirroring: pool.rbd_mirroring,
            configuration: QosWirePayload::from(&pool.qos),
        })
        .unwrap_or(Value::Null)
    }

    fn encode_update(pool: &Pool) -> Option<Value> {
        serde_json::to_value(PoolUpdatePayload {
            pg_autoscale_mode: autoscale_mode(pool.pg_autoscale),
            pg_num: pool.pg_num,
            size: pool.size,
            quota_max_bytes: pool.quota_max_bytes,
            application_metadata: pool.applications.iter().map(String::as_str).collect(),
        })
        .ok()
    }

    fn decode(value: &Value) -> Result<Pool> {
        let read: PoolReadPayload = serde_json::from_value(value.clone())?;
        if read.pool_name.is_empty() {
            return Err(Error::UnexpectedShape {
                kind: Self::KIND.to_string(),
                detail: "empty pool_name".to_string(),
            });
        }
        Ok(Pool {
            name: read.pool_name,
            pool_type: read.pool_type.unwrap_or_else(default_pool_type),
            pg_autoscale: read.pg_autoscale_mode.as_deref() == Some("on"),
            pg_num: read.pg_num.unwrap_or(0),
            size: read.size.unwrap_or(0),
            crush_rule: read.crush_rule.unwrap_or_default(),
            quota_max_bytes: read.quota_max_bytes.unwrap_or(0),
            applications: read
                .application_metadata
                .map(AppMetadata::into_set)
                .unwrap_or_default(),
            // Not round-tripped by GET; see diff()
            rbd_mirroring: false,
            qos: QosLimits::default(),
            pool_id: read.pool,
        })
    }

    /// Mutable: pg_num, size, autoscale mode, quota, application tags.
    /// Immutable: pool_type, crush_rule (and the name identity itself).
    /// `rbd_mirroring` and QoS limits are intentionally not compared:
    /// the read payload never reports them, so there is no observed
    /// value to diff against.
    fn diff(desired: &Pool, observed: &Pool) -> Drift {
        let mut drift = Drift::default();
        if desired.pg_num != observed.pg_num {
            drift.mutable.push("pg_num");
        }
        if desired.size != observed.size {
            drift.mutable.push("size");
        }
        if desired.pg_autoscale != observed.pg_autoscale {
            drift.mutable.push("pg_autoscale");
        }
        if desired.quota_max_bytes != observed.quota_max_bytes {
            drift.mutable.push("quota_max_bytes");
        }
        if desired.applications != observed.applications {
            drift.mutable.push("applications");
        }
        if desired.pool_type != observed.pool_type {
            drift.immutable.push("pool_type");
        }
        if desired.crush_rule != observed.crush_rule {
            drift.immutable.push("crush_rule");
        }
        drift
    }

    fn merge_server_fields(desired: &mut Pool, observed: &Pool) {
        desired.pool_id = observed.pool_id;
    }
}

// =============================================================================
// Tests
// =============================================================================
