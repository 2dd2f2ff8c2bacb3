//! CRUSH rule resource and wire codec
//!
//! CRUSH rules are immutable by design: the API offers create, a full
//! listing (no per-name GET), and delete. The listing does not echo the
//! create fields back; root bucket, device class, and failure domain are
//! recovered from the rule's step program instead.

use crate::error::{Error, Result};
use crate::reconcile::{Drift, ReadStyle, WireCodec};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Canonical Record
// =============================================================================

/// Canonical placement rule. Every declared field is immutable
/// post-creation; `rule_id` is assigned by the cluster and purely
/// observational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrushRule {
    pub name: String,
    /// Root bucket the rule selects from (e.g. `default`)
    pub root: String,
    /// Failure domain type (e.g. `host`, `osd`)
    pub failure_domain: String,
    /// Device class restriction (`hdd`, `ssd`); `None` means all classes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(default, skip_serializing)]
    pub rule_id: Option<i64>,
}

// =============================================================================
// Wire Shapes
// =============================================================================

#[derive(Debug, Serialize)]
struct RuleCreatePayload<'a> {
    name: &'a str,
    root: &'a str,
    failure_domain: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_class: Option<&'a str>,
}

/// One entry of the rule's step program as the listing reports it
#[derive(Debug, Deserialize)]
struct RuleStep {
    op: String,
    #[serde(default)]
    item_name: Option<String>,
    #[serde(rename = "type", default)]
    bucket_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RuleReadPayload {
    rule_id: i64,
    rule_name: String,
    #[serde(default)]
    steps: Vec<RuleStep>,
}

// =============================================================================
// Codec
// =============================================================================

/// Wire codec for CRUSH rules
pub struct CrushRuleCodec;

impl WireCodec for CrushRuleCodec {
    type Resource = CrushRule;

    const KIND: &'static str = "crush_rule";

    fn identity(resource: &CrushRule) -> &str {
        &resource.name
    }

    fn collection_path() -> &'static str {
        "/api/crush_rule"
    }

    fn read_style() -> ReadStyle {
        ReadStyle::Listing
    }

    fn encode_create(rule: &CrushRule) -> Value {
        serde_json::to_value(RuleCreatePayload {
            name: &rule.name,
            root: &rule.root,
            failure_domain: &rule.failure_domain,
            device_class: rule.device_class.as_deref(),
        })
        .unwrap_or(Value::Null)
    }

    /// No update endpoint: every field change means replacement
    fn encode_update(_rule: &CrushRule) -> Option<Value> {
        None
    }

    fn decode(value: &Value) -> Result<CrushRule> {
        let read: RuleReadPayload = serde_json::from_value(value.clone())?;
        if read.rule_name.is_empty() {
            return Err(Error::UnexpectedShape {
                kind: Self::KIND.to_string(),
                detail: "empty rule_name".to_string(),
            });
        }

        // The take step names the root bucket, with an optional `~class`
        // suffix when the rule is restricted to one device class. The
        // chooseleaf step carries the failure domain.
        let mut root = String::new();
        let mut device_class = None;
        let mut failure_domain = String::new();
        for step in &read.steps {
            if step.op.starts_with("take") {
                if let Some(item) = &step.item_name {
                    match item.split_once('~') {
                        Some((bucket, class)) => {
                            root = bucket.to_string();
                            device_class = Some(class.to_string());
                        }
                        None => root = item.clone(),
                    }
                }
            } else if step.op.starts_with("chooseleaf") {
                if let Some(bucket_type) = &step.bucket_type {
                    failure_domain = bucket_type.clone();
                }
            }
        }

        Ok(CrushRule {
            name: read.rule_name,
            root,
            failure_domain,
            device_class,
            rule_id: Some(read.rule_id),
        })
    }

    /// All declared fields are immutable; any difference forces replacement
    fn diff(desired: &CrushRule, observed: &CrushRule) -> Drift {
        let mut drift = Drift::default();
        if desired.root != observed.root {
            drift.immutable.push("root");
        }
        if desired.failure_domain != observed.failure_domain {
            drift.immutable.push("failure_domain");
        }
        if desired.device_class != observed.device_class {
            drift.immutable.push("device_class");
        }
        drift
    }

    fn merge_server_fields(desired: &mut CrushRule, observed: &CrushRule) {
        desired.rule_id = observed.rule_id;
    }
}

// =============================================================================
// Tests
// =============================================================================
