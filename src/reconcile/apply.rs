//! Desired-state apply and destroy passes
//!
//! This is the policy layer above the reconciler core: it converts
//! immutable drift into delete-then-create, treats a missing object as
//! "create it", and treats deleting an already-absent object as success.
//! The core never makes those calls on its own.

use crate::config::DesiredState;
use crate::error::Result;
use crate::reconcile::{Reconciler, UpdateOutcome, WireCodec};
use crate::resources::crush_rule::CrushRuleCodec;
use crate::resources::pool::PoolCodec;
use crate::resources::user::{UserCodec, UserReconciler};
use crate::session::Session;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

// =============================================================================
// Report
// =============================================================================

/// What one reconciliation pass did to a single resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated,
    Replaced,
    Unchanged,
    Deleted,
}

/// Summary of one apply or destroy pass, `kind/name` per entry
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub replaced: Vec<String>,
    pub unchanged: Vec<String>,
    pub deleted: Vec<String>,
}

impl ApplyReport {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            created: Vec::new(),
            updated: Vec::new(),
            replaced: Vec::new(),
            unchanged: Vec::new(),
            deleted: Vec::new(),
        }
    }

    fn record(&mut self, kind: &str, name: &str, action: Action) {
        let entry = format!("{}/{}", kind, name);
        match action {
            Action::Created => self.created.push(entry),
            Action::Updated => self.updated.push(entry),
            Action::Replaced => self.replaced.push(entry),
            Action::Unchanged => self.unchanged.push(entry),
            Action::Deleted => self.deleted.push(entry),
        }
    }

    /// Total number of resources that changed on the remote
    pub fn changes(&self) -> usize {
        self.created.len() + self.updated.len() + self.replaced.len() + self.deleted.len()
    }
}

// =============================================================================
// Apply
// =============================================================================

async fn reconcile_one<C: WireCodec>(
    rec: &Reconciler<C>,
    desired: &C::Resource,
) -> Result<Action> {
    let name = C::identity(desired);
    match rec.update(desired).await {
        Ok(UpdateOutcome::Unchanged) => Ok(Action::Unchanged),
        Ok(UpdateOutcome::Updated) => Ok(Action::Updated),
        Ok(UpdateOutcome::ReplaceRequired { fields }) => {
            warn!(kind = C::KIND, name, ?fields, "immutable drift, replacing");
            rec.delete(name).await?;
            rec.create(desired).await?;
            Ok(Action::Replaced)
        }
        Err(e) if e.is_not_found() => {
            rec.create(desired).await?;
            Ok(Action::Created)
        }
        Err(e) => Err(e),
    }
}

/// Reconcile every declared resource against the remote cluster.
///
/// Rules are applied before pools (pools reference them by name), users
/// last. Fails on the first unrecoverable error; everything reconciled
/// up to that point stays reconciled.
pub async fn apply(session: Arc<Session>, state: &DesiredState) -> Result<ApplyReport> {
    let mut report = ApplyReport::new();

    let rules = Reconciler::<CrushRuleCodec>::new(session.clone());
    for rule in &state.crush_rules {
        let action = reconcile_one(&rules, rule).await?;
        report.record(CrushRuleCodec::KIND, &rule.name, action);
    }

    let pools = Reconciler::<PoolCodec>::new(session.clone());
    for pool in &state.pools {
        let action = reconcile_one(&pools, pool).await?;
        report.record(PoolCodec::KIND, &pool.name, action);
    }

    let users = UserReconciler::new(session.clone());
    for user in &state.users {
        let action = match users.update(user).await {
            Ok(UpdateOutcome::Unchanged) => Action::Unchanged,
            Ok(UpdateOutcome::Updated) => Action::Updated,
            Ok(UpdateOutcome::ReplaceRequired { fields }) => {
                warn!(kind = UserCodec::KIND, name = %user.entity, ?fields, "immutable drift, replacing");
                users.delete(&user.entity).await?;
                users.create(user).await?;
                Action::Replaced
            }
            Err(e) if e.is_not_found() => {
                users.create(user).await?;
                Action::Created
            }
            Err(e) => return Err(e),
        };
        report.record(UserCodec::KIND, &user.entity, action);
    }

    report.finished_at = Utc::now();
    info!(
        created = report.created.len(),
        updated = report.updated.len(),
        replaced = report.replaced.len(),
        unchanged = report.unchanged.len(),
        "apply pass finished"
    );
    Ok(report)
}

// =============================================================================
// Destroy
// =============================================================================

async fn delete_tolerant<C: WireCodec>(rec: &Reconciler<C>, id: &str) -> Result<bool> {
    match rec.delete(id).await {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => {
            info!(kind = C::KIND, name = id, "already absent");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Delete every declared resource, in reverse dependency order.
/// Already-absent objects count as success here, by policy.
pub async fn destroy(session: Arc<Session>, state: &DesiredState) -> Result<ApplyReport> {
    let mut report = ApplyReport::new();

    let users = Reconciler::<UserCodec>::new(session.clone());
    for user in &state.users {
        if delete_tolerant(&users, &user.entity).await? {
            report.record(UserCodec::KIND, &user.entity, Action::Deleted);
        }
    }

    let pools = Reconciler::<PoolCodec>::new(session.clone());
    for pool in &state.pools {
        if delete_tolerant(&pools, &pool.name).await? {
            report.record(PoolCodec::KIND, &pool.name, Action::Deleted);
        }
    }

    let rules = Reconciler::<CrushRuleCodec>::new(session.clone());
    for rule in &state.crush_rules {
        if delete_tolerant(&rules, &rule.name).await? {
            report.record(CrushRuleCodec::KIND, &rule.name, Action::Deleted);
        }
    }

    report.finished_at = Utc::now();
    info!(deleted = report.deleted.len(), "destroy pass finished");
    Ok(report)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::crush_rule::CrushRule;
    use crate::resources::pool::Pool;
    use crate::session::transport::testing::FakeTransport;
    use crate::session::SessionConfig;
    use serde_json::json;

    async fn session(transport: Arc<FakeTransport>) -> Arc<Session> {
        let cfg = SessionConfig {
            url: "https://ceph.example:8443".into(),
            ..Default::default()
        };
        Arc::new(Session::connect_with(&cfg, transport).await.unwrap())
    }

    fn rule_listing(root: &str) -> serde_json::Value {
        json!([{
            "rule_id": 1,
            "rule_name": "ssd_rule",
            "type": 1,
            "steps": [
                {"op": "take", "item": -1, "item_name": root},
                {"op": "chooseleaf_firstn", "num": 0, "type": "host"},
                {"op": "emit"}
            ]
        }])
    }

    fn state_with_rule(root: &str) -> DesiredState {
        DesiredState {
            crush_rules: vec![CrushRule {
                name: "ssd_rule".into(),
                root: root.into(),
                failure_domain: "host".into(),
                device_class: None,
                rule_id: None,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_apply_creates_missing_pool() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_status(404, "not found"); // read during update
        transport.push_status(201, ""); // create
        transport.push_json(
            200,
            json!({"pool": 1, "pool_name": "data", "pg_num": 16, "size": 3,
                   "pg_autoscale_mode": "on", "crush_rule": "replicated_rule",
                   "application_metadata": ["rbd"]}),
        ); // read-back
        let state = DesiredState {
            pools: vec![Pool {
                name: "data".into(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let report = apply(session(transport).await, &state).await.unwrap();
        assert_eq!(report.created, vec!["pool/data"]);
        assert_eq!(report.changes(), 1);
    }

    #[tokio::test]
    async fn test_apply_replaces_drifted_rule() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_json(200, rule_listing("default")); // read: observed root differs
        transport.push_status(204, ""); // delete
        transport.push_status(201, ""); // create
        transport.push_json(200, rule_listing("rack1")); // read-back
        let state = state_with_rule("rack1");

        let report = apply(session(transport.clone()).await, &state)
            .await
            .unwrap();
        assert_eq!(report.replaced, vec!["crush_rule/ssd_rule"]);

        let methods: Vec<String> = transport
            .requests()
            .iter()
            .map(|r| r.method.clone())
            .collect();
        assert_eq!(methods, vec!["GET", "DELETE", "POST", "GET"]);
    }

    #[tokio::test]
    async fn test_apply_leaves_matching_rule_alone() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_json(200, rule_listing("default"));
        let state = state_with_rule("default");

        let report = apply(session(transport.clone()).await, &state)
            .await
            .unwrap();
        assert_eq!(report.unchanged, vec!["crush_rule/ssd_rule"]);
        assert_eq!(report.changes(), 0);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_destroy_tolerates_absent_objects() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_status(404, "no such rule");
        let state = state_with_rule("default");

        let report = destroy(session(transport).await, &state).await.unwrap();
        assert!(report.deleted.is_empty());
    }

    #[tokio::test]
    async fn test_destroy_deletes_declared_resources() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_status(204, "");
        let state = state_with_rule("default");

        let report = destroy(session(transport.clone()).await, &state)
            .await
            .unwrap();
        assert_eq!(report.deleted, vec!["crush_rule/ssd_rule"]);
        assert_eq!(
            transport.requests()[0].url,
            "https://ceph.example:8443/api/crush_rule/ssd_rule"
        );
    }
}
