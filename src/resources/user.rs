//! Cluster user resource and wire codec
//!
//! Users are declared as an entity plus an ordered set of pool grants;
//! the capability sequence is derived deterministically from the pool set
//! (see [`crate::resources::caps`]). The secret key is never part of the
//! primary create/read payloads: it requires a dedicated export round-trip
//! whose result feeds the keyring extractor.

use crate::error::Result;
use crate::reconcile::{Drift, ReadStyle, Reconciler, UpdateOutcome, WireCodec};
use crate::resources::caps::{self, Capability};
use crate::resources::keyring;
use crate::session::Session;
use indexmap::IndexSet;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

// =============================================================================
// Canonical Record
// =============================================================================

/// Canonical cluster user. `entity` is the immutable identity
/// (e.g. `client.app`); `key` is read-only material recovered from the
/// export endpoint, never declared as input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub entity: String,
    /// Pools the user is granted rbd access to, in declaration order
    #[serde(default)]
    pub pools: IndexSet<String>,
    #[serde(default, skip_serializing)]
    pub key: Option<String>,
}

// =============================================================================
// Wire Shapes
// =============================================================================

/// POST payload: identity travels as `user_entity`, grants as a list
#[derive(Debug, Serialize)]
struct UserWritePayload<'a> {
    user_entity: &'a str,
    capabilities: Vec<Capability>,
}

/// PUT payload: the capability set is the only mutable attribute and
/// the identity already sits in the item path
#[derive(Debug, Serialize)]
struct UserUpdatePayload {
    capabilities: Vec<Capability>,
}

/// GET payload: identity is `entity`, grants collapse into a map
#[derive(Debug, Deserialize)]
struct UserReadPayload {
    entity: String,
    #[serde(default)]
    caps: BTreeMap<String, String>,
}

// =============================================================================
// Codec
// =============================================================================

/// Wire codec for cluster users
pub struct UserCodec;

impl WireCodec for UserCodec {
    type Resource = User;

    const KIND: &'static str = "user";

    fn identity(resource: &User) -> &str {
        &resource.entity
    }

    fn collection_path() -> &'static str {
        "/api/cluster/user"
    }

    fn read_style() -> ReadStyle {
        ReadStyle::Listing
    }

    fn encode_create(user: &User) -> Value {
        serde_json::to_value(UserWritePayload {
            user_entity: &user.entity,
            capabilities: caps::derive_capabilities(&user.pools),
        })
        .unwrap_or(Value::Null)
    }

    fn encode_update(user: &User) -> Option<Value> {
        serde_json::to_value(UserUpdatePayload {
            capabilities: caps::derive_capabilities(&user.pools),
        })
        .ok()
    }

    fn decode(value: &Value) -> Result<User> {
        let read: UserReadPayload = serde_json::from_value(value.clone())?;
        Ok(User {
            entity: read.entity,
            pools: caps::pools_from_caps(&read.caps),
            key: None,
        })
    }

    fn diff(desired: &User, observed: &User) -> Drift {
        let mut drift = Drift::default();
        if desired.pools != observed.pools {
            drift.mutable.push("pools");
        }
        drift
    }
}

// =============================================================================
// Key Export
// =============================================================================

/// Fetch and extract the secret key for one entity via the export
/// endpoint. The response body is a JSON string wrapping the keyring
/// document.
pub async fn export_key(session: &Session, entity: &str) -> Result<String> {
    let payload = serde_json::json!({ "entities": [entity] });
    let body = session
        .execute(Method::POST, "/api/cluster/user/export", Some(payload))
        .await?;
    debug!(entity, "exported keyring");
    keyring::extract_key(&String::from_utf8_lossy(&body), entity)
}

// =============================================================================
// User Reconciler
// =============================================================================

/// Reconciler wrapper adding the key-export step users require: create,
/// read, and import all finish with an export round-trip so the canonical
/// record carries the secret key.
pub struct UserReconciler {
    inner: Reconciler<UserCodec>,
    session: Arc<Session>,
}

impl UserReconciler {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            inner: Reconciler::new(session.clone()),
            session,
        }
    }

    pub async fn create(&self, desired: &User) -> Result<User> {
        let mut user = self.inner.create(desired).await?;
        user.key = Some(export_key(&self.session, &user.entity).await?);
        Ok(user)
    }

    pub async fn read(&self, entity: &str) -> Result<User> {
        let mut user = self.inner.read(entity).await?;
        user.key = Some(export_key(&self.session, entity).await?);
        Ok(user)
    }

    pub async fn import(&self, entity: &str) -> Result<User> {
        self.read(entity).await
    }

    pub async fn update(&self, desired: &User) -> Result<UpdateOutcome> {
        self.inner.update(desired).await
    }

    pub async fn delete(&self, entity: &str) -> Result<()> {
        self.inner.delete(entity).await
    }
}

// =============================================================================
// Tests
// =============================================================================
